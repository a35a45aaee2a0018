#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical parking site records.
//!
//! Every upstream feed, whatever its container format, ends up as either a
//! [`StaticSite`] (location metadata that changes rarely) or a
//! [`RealtimeSite`] (a timestamped occupancy snapshot). Both are only ever
//! built through their validating constructors, which check every field
//! before failing so a single [`ValidationError`] lists the complete set of
//! defects in a record.

pub mod input;
pub mod realtime_site;
pub mod static_site;
pub mod validation;
pub mod value;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, VariantNames};

pub use realtime_site::RealtimeSite;
pub use static_site::{ExternalIdentifier, StaticSite};
pub use validation::{FieldError, FieldViolation, ReasonCode, ValidationError};

/// What a parking site is meant to hold.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    VariantNames,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PurposeType {
    /// Car parking
    #[default]
    Car,
    /// Bicycle parking
    Bike,
    /// Lockers for luggage and other items
    Item,
}

/// Physical kind of a parking site.
///
/// The first group covers car parking, the second group the bike-parking
/// subtypes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    VariantNames,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ParkingSiteType {
    OnStreet,
    OffStreetParkingGround,
    Underground,
    CarPark,
    WallLoops,
    Stands,
    Lockers,
    Shed,
    TwoTier,
    Building,
    Other,
}

/// Park-and-ride classification tags.
///
/// [`Self::Yes`] and [`Self::No`] are absolute markers and never appear
/// together with any other tag.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    VariantNames,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ParkAndRideType {
    Carpool,
    Train,
    Bus,
    Tram,
    Yes,
    No,
}

impl ParkAndRideType {
    /// Whether this is one of the exclusive `YES`/`NO` markers.
    #[must_use]
    pub const fn is_absolute(self) -> bool {
        matches!(self, Self::Yes | Self::No)
    }
}

/// Kind of supervision present at a site.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    VariantNames,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SupervisionType {
    Yes,
    No,
    Video,
    Attended,
}

/// Opening status reported alongside realtime occupancy.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    VariantNames,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OpeningStatus {
    Open,
    Closed,
    #[default]
    Unknown,
}

/// Registry an [`ExternalIdentifier`] points into.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    VariantNames,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalIdentifierType {
    /// `OpenStreetMap` object id
    Osm,
    /// Global stop id (Germany)
    Dhid,
}

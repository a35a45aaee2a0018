//! Stadt Ulm car parks.
//!
//! Static data comes from the shared static template. Realtime counters are
//! scraped from the live counter section of the operator's homepage, one
//! card per car park with a `free / total` text.

use async_trait::async_trait;
use parkapi_parking_models::{RealtimeSite, StaticSite};
use parkapi_scraper::{HttpClient, ScrapeError, html};
use parkapi_source_models::{ImportBatch, SourceInfo};
use scraper::ElementRef;
use serde_json::Value;

use super::last_path_segment;
use crate::collect::{RecordInput, RecordOutcome, collect_records, now_timestamp};
use crate::static_template::load_static_sites;
use crate::{Config, ParkingSource, PullSource, SourceError};

const UID: &str = "ulm";
const DEFAULT_URL: &str = "https://www.parken-in-ulm.de";

/// Stadt Ulm pull source.
pub struct UlmSource {
    info: SourceInfo,
    config: Config,
    client: HttpClient,
    url: String,
}

impl UlmSource {
    #[must_use]
    pub fn new(config: Config, client: HttpClient) -> Self {
        let url = config.endpoint(UID, DEFAULT_URL);
        Self {
            info: SourceInfo::new(UID, "Stadt Ulm", true)
                .with_public_url(DEFAULT_URL)
                .with_attribution_contributor("Ulmer Parkbetriebs-GmbH")
                .with_attribution_url("https://www.parken-in-ulm.de/impressum.php"),
            config,
            client,
            url,
        }
    }
}

/// `(free, total)` from a counter text; a `?` means the free count is
/// unknown.
fn parse_counter(text: &str) -> Option<(Option<i64>, i64)> {
    let (free, total) = text.split_once('/')?;
    let total = total.trim().parse().ok()?;
    let free = match free.trim() {
        "?" => None,
        free => Some(free.parse().ok()?),
    };
    Some((free, total))
}

fn card_input(card: ElementRef<'_>) -> Result<RecordInput, ScrapeError> {
    let href = html::attribute(html::select_first(card, "a.stretched-link")?, "href")?;
    let uid = last_path_segment(href)
        .ok_or_else(|| ScrapeError::Parse(format!("no uid in link '{href}'")))?;
    let counter = html::select_text(card, "div.counter-text")?;
    let (free, total) = parse_counter(&counter)
        .ok_or_else(|| ScrapeError::Parse(format!("unreadable counter '{counter}'")))?;

    let mut input = RecordInput::new();
    input
        .set("uid", uid)
        .set("realtime_capacity", total)
        .set("realtime_free_capacity", free.map_or(Value::Null, Value::from))
        .set("realtime_data_updated_at", now_timestamp());
    Ok(input)
}

/// Extracts one realtime snapshot per counter card.
///
/// # Errors
///
/// Returns [`SourceError`] if the page has no live counter section.
pub fn parse_counters(page: &str) -> Result<ImportBatch<RealtimeSite>, SourceError> {
    let document = html::parse_document(page);
    let section_selector = html::selector("section.s_live_counter")?;
    let section = document
        .select(&section_selector)
        .next()
        .ok_or_else(|| SourceError::import(UID, "page has no live counter section"))?;
    let card_selector = html::selector("div.card-container")?;

    Ok(collect_records(UID, section.select(&card_selector), |card| {
        match card_input(card) {
            Ok(input) => input.into_realtime(UID),
            Err(e) => RecordOutcome::extraction_failure(UID, None, e.to_string()),
        }
    }))
}

impl ParkingSource for UlmSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }
}

#[async_trait]
impl PullSource for UlmSource {
    async fn get_static_sites(&self) -> Result<ImportBatch<StaticSite>, SourceError> {
        load_static_sites(UID, &self.config, &self.client).await
    }

    async fn get_realtime_sites(&self) -> Result<ImportBatch<RealtimeSite>, SourceError> {
        let page = self.client.get_text(&self.url).await?;
        parse_counters(&page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <section class="s_live_counter">
            <div class="card-container">
              <a class="stretched-link" href="/parkhaeuser/fischerviertel">Fischerviertel</a>
              <div class="counter-text"> 123 / 400 </div>
            </div>
            <div class="card-container">
              <a class="stretched-link" href="/parkhaeuser/deutschhaus">Deutschhaus</a>
              <div class="counter-text">? / 250</div>
            </div>
            <div class="card-container">
              <div class="counter-text">12 / 50</div>
            </div>
          </section>
        </body></html>
    "#;

    #[test]
    fn counters_become_snapshots() {
        let batch = parse_counters(PAGE).unwrap();
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.errors.len(), 1);

        let fischerviertel = &batch.items[0];
        assert_eq!(fischerviertel.uid, "fischerviertel");
        assert_eq!(fischerviertel.realtime_capacity, Some(400));
        assert_eq!(fischerviertel.realtime_free_capacity, Some(123));

        let deutschhaus = &batch.items[1];
        assert_eq!(deutschhaus.realtime_capacity, Some(250));
        assert_eq!(deutschhaus.realtime_free_capacity, None);
    }

    #[test]
    fn page_without_counters_is_rejected() {
        assert!(matches!(
            parse_counters("<html><body><p>Wartung</p></body></html>"),
            Err(SourceError::Import { .. })
        ));
    }

    #[test]
    fn counter_text() {
        assert_eq!(parse_counter("5 / 10"), Some((Some(5), 10)));
        assert_eq!(parse_counter("? / 10"), Some((None, 10)));
        assert_eq!(parse_counter("5 of 10"), None);
    }
}

//! Stadt Mannheim car parks.
//!
//! Static data comes from the shared static template. The realtime page
//! lists every car park as a link followed by its free count, and dates the
//! whole list in a trailing paragraph.

use async_trait::async_trait;
use parkapi_normalize::datetime;
use parkapi_parking_models::{RealtimeSite, StaticSite};
use parkapi_scraper::{HttpClient, ScrapeError, html};
use parkapi_source_models::{ImportBatch, SourceInfo};
use scraper::ElementRef;

use super::last_path_segment;
use crate::collect::{RecordInput, RecordOutcome, collect_records};
use crate::static_template::load_static_sites;
use crate::{Config, ParkingSource, PullSource, SourceError};

const UID: &str = "mannheim";
const DEFAULT_URL: &str = "https://www.parken-mannheim.de";
const UPDATED_AT_FORMAT: &str = "zuletzt aktualisiert am %d.%m.%Y, %H:%M Uhr";

/// Listed on the page but not a public car park.
const IGNORED_UIDS: &[&str] = &["b8874acd-39d9-424c-9405-1fc3307b7df8"];

/// Stadt Mannheim pull source.
pub struct MannheimSource {
    info: SourceInfo,
    config: Config,
    client: HttpClient,
    url: String,
}

impl MannheimSource {
    #[must_use]
    pub fn new(config: Config, client: HttpClient) -> Self {
        let url = config.endpoint(UID, DEFAULT_URL);
        Self {
            info: SourceInfo::new(UID, "Stadt Mannheim", true)
                .with_public_url(DEFAULT_URL)
                .with_attribution_contributor("Mannheimer Parkhausbetriebe GmbH")
                .with_attribution_url("https://www.parken-mannheim.de/impressum"),
            config,
            client,
            url,
        }
    }
}

fn link_outcome(link: ElementRef<'_>, updated_at: &str) -> RecordOutcome<RealtimeSite> {
    let extract = || -> Result<Option<RecordInput>, ScrapeError> {
        let href = html::attribute(link, "href")?;
        let uid = last_path_segment(href)
            .ok_or_else(|| ScrapeError::Parse(format!("no uid in link '{href}'")))?;
        if IGNORED_UIDS.contains(&uid) {
            return Ok(None);
        }
        let free = html::parent_element(link)
            .and_then(html::next_element_sibling)
            .map(html::element_text)
            .ok_or_else(|| ScrapeError::Parse(format!("no free count next to '{uid}'")))?;

        let mut input = RecordInput::new();
        input
            .set("uid", uid)
            .set("realtime_free_capacity", free)
            .set("realtime_data_updated_at", updated_at);
        Ok(Some(input))
    };

    match extract() {
        Ok(Some(input)) => input.into_realtime(UID),
        Ok(None) => RecordOutcome::Skip,
        Err(e) => RecordOutcome::extraction_failure(UID, None, e.to_string()),
    }
}

/// Extracts one realtime snapshot per car park link.
///
/// # Errors
///
/// Returns [`SourceError`] if the page carries no readable update time.
pub fn parse_page(page: &str) -> Result<ImportBatch<RealtimeSite>, SourceError> {
    let document = html::parse_document(page);
    let list_selector = html::selector("div#parkhausliste-ct")?;
    let list = document
        .select(&list_selector)
        .last()
        .ok_or_else(|| SourceError::import(UID, "page has no car park list"))?;
    let stamp = html::select_text(list, "p")?;
    let updated_at = datetime::parse_datetime(&stamp, UPDATED_AT_FORMAT)
        .map_err(|e| SourceError::import(UID, format!("unreadable update time '{stamp}': {e}")))?;
    let updated_at = datetime::to_canonical(updated_at);

    let link_selector = html::selector(".parkhaus-lnk")?;
    Ok(collect_records(UID, document.select(&link_selector), |link| {
        link_outcome(link, &updated_at)
    }))
}

impl ParkingSource for MannheimSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }
}

#[async_trait]
impl PullSource for MannheimSource {
    async fn get_static_sites(&self) -> Result<ImportBatch<StaticSite>, SourceError> {
        load_static_sites(UID, &self.config, &self.client).await
    }

    async fn get_realtime_sites(&self) -> Result<ImportBatch<RealtimeSite>, SourceError> {
        let page = self.client.get_text(&self.url).await?;
        parse_page(&page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div id="parkhausliste-ct">
            <div class="row">
              <div class="name"><a class="parkhaus-lnk" href="/parkhaeuser/n1">N1</a></div>
              <div class="frei">42</div>
            </div>
            <div class="row">
              <div class="name"><a class="parkhaus-lnk" href="/parkhaeuser/b8874acd-39d9-424c-9405-1fc3307b7df8">Intern</a></div>
              <div class="frei">3</div>
            </div>
            <div class="row">
              <div class="name"><a class="parkhaus-lnk" href="/parkhaeuser/d3">D3</a></div>
              <div class="frei">geschlossen</div>
            </div>
            <p>zuletzt aktualisiert am 01.04.2024, 10:15 Uhr</p>
          </div>
        </body></html>
    "#;

    #[test]
    fn links_become_snapshots() {
        let batch = parse_page(PAGE).unwrap();
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].record_uid.as_deref(), Some("d3"));

        let n1 = &batch.items[0];
        assert_eq!(n1.uid, "n1");
        assert_eq!(n1.realtime_free_capacity, Some(42));
        assert_eq!(
            n1.realtime_data_updated_at.to_rfc3339(),
            "2024-04-01T10:15:00+00:00"
        );
    }

    #[test]
    fn undated_page_is_rejected() {
        let page = r#"<div id="parkhausliste-ct"><p>heute</p></div>"#;
        assert!(matches!(parse_page(page), Err(SourceError::Import { .. })));
    }
}

//! CSS selection helpers over [`scraper::Html`] documents.

use scraper::{ElementRef, Html, Selector};

use crate::ScrapeError;

/// Parses a whole HTML page.
#[must_use]
pub fn parse_document(body: &str) -> Html {
    Html::parse_document(body)
}

/// Parses a CSS selector string, returning a [`ScrapeError`] on failure.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if `selector` is not valid CSS.
pub fn selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Parse(format!("invalid CSS selector '{selector}': {e}")))
}

/// All text below `element`, joined and trimmed.
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join("").trim().to_owned()
}

/// The first descendant of `element` matching `selector`.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if the selector is invalid or nothing
/// matches.
pub fn select_first<'a>(
    element: ElementRef<'a>,
    css: &str,
) -> Result<ElementRef<'a>, ScrapeError> {
    let sel = selector(css)?;
    element
        .select(&sel)
        .next()
        .ok_or_else(|| ScrapeError::Parse(format!("no element matching '{css}'")))
}

/// The text of the first descendant of `element` matching `css`.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if the selector is invalid or nothing
/// matches.
pub fn select_text(element: ElementRef<'_>, css: &str) -> Result<String, ScrapeError> {
    select_first(element, css).map(element_text)
}

/// The value of attribute `name` on `element`.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if the attribute is missing.
pub fn attribute<'a>(element: ElementRef<'a>, name: &str) -> Result<&'a str, ScrapeError> {
    element.value().attr(name).ok_or_else(|| {
        ScrapeError::Parse(format!(
            "<{}> has no '{name}' attribute",
            element.value().name()
        ))
    })
}

/// The next sibling of `element` that is itself an element.
#[must_use]
pub fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// The parent of `element`, if it is an element.
#[must_use]
pub fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

//! XML payloads as a small owned element tree.
//!
//! Namespace prefixes are dropped from element and attribute names, which
//! is all the feeds handled here need.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

/// Errors while reading an XML payload.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// The document is not well-formed.
    #[error("{0}")]
    Syntax(#[from] quick_xml::Error),

    /// The document has no root element.
    #[error("document has no root element")]
    Empty,
}

/// One element with its attributes, text and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<Self>,
}

impl XmlElement {
    /// Parses a document and returns its root element.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] if the document is malformed or empty.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Self> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(Self::open(&e)),
                Event::Empty(e) => attach(&mut stack, &mut root, Self::open(&e)),
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Event::Text(e) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.ok_or(XmlError::Empty)
    }

    fn open(e: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let attributes = e
            .attributes()
            .flatten()
            .map(|attr| {
                (
                    String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned(),
                    attr.unescape_value()
                        .map_or_else(
                            |_| String::from_utf8_lossy(attr.value.as_ref()).into_owned(),
                            std::borrow::Cow::into_owned,
                        ),
                )
            })
            .collect();
        Self {
            name,
            attributes,
            ..Self::default()
        }
    }

    /// The first child called `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All children called `name`.
    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Self> + use<'a, 'n> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// The element at a `/`-separated path of child names below `self`.
    /// An empty path is `self`.
    #[must_use]
    pub fn find_path(&self, path: &str) -> Option<&Self> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |element, segment| element.child(segment))
    }

    /// All elements at `path`: every child matching the last segment below
    /// the element the leading segments lead to.
    #[must_use]
    pub fn find_all(&self, path: &str) -> Vec<&Self> {
        let path = path.trim_matches('/');
        let (parent, last) = path.rsplit_once('/').unwrap_or(("", path));
        self.find_path(parent)
            .map(|parent| parent.children_named(last).collect())
            .unwrap_or_default()
    }

    /// The trimmed text of the element at `path`, if not empty. A trailing
    /// `@name` reads an attribute instead.
    #[must_use]
    pub fn value_at(&self, path: &str) -> Option<&str> {
        let (path, attribute) = match path.rsplit_once('@') {
            Some((path, attribute)) => (path.trim_end_matches('/'), Some(attribute)),
            None => (path, None),
        };
        let element = self.find_path(path)?;
        let value = match attribute {
            Some(attribute) => element.attributes.get(attribute)?.as_str(),
            None => element.text.as_str(),
        };
        let value = value.trim();
        if value.is_empty() { None } else { Some(value) }
    }

    /// Flattens the subtree into a mapping of `a/b` paths to text and
    /// `a/b@attr` paths to attribute values. For repeated elements the
    /// first occurrence wins.
    #[must_use]
    pub fn flatten(&self) -> Map<String, Value> {
        let mut map = Map::new();
        self.flatten_into("", &mut map);
        map
    }

    fn flatten_into(&self, prefix: &str, map: &mut Map<String, Value>) {
        for (key, value) in &self.attributes {
            map.entry(format!("{prefix}@{key}"))
                .or_insert_with(|| Value::String(value.clone()));
        }
        let text = self.text.trim();
        if !prefix.is_empty() && !text.is_empty() {
            map.entry(prefix.to_string())
                .or_insert_with(|| Value::String(text.to_string()));
        }
        for child in &self.children {
            let path = if prefix.is_empty() {
                child.name.clone()
            } else {
                format!("{prefix}/{}", child.name)
            };
            child.flatten_into(&path, map);
        }
    }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

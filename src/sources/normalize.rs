//! Mapping of provider records onto the common [`Paper`] shape.

use crate::models::{Paper, NO_ABSTRACT, NO_TITLE, NO_URL};

/// Fields pulled out of one provider record, before placeholder substitution.
///
/// Each provider fills this from its own payload format; a field the payload
/// does not carry stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub url: Option<String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn abstract_text(mut self, abstract_text: Option<String>) -> Self {
        self.abstract_text = abstract_text;
        self
    }

    pub fn url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }
}

/// Turn a raw record into a [`Paper`], substituting placeholders for missing fields.
///
/// A field counts as missing when it is absent or blank. Present fields are
/// passed through unchanged.
pub fn normalize(record: RawRecord) -> Paper {
    Paper {
        title: or_placeholder(record.title, NO_TITLE),
        r#abstract: or_placeholder(record.abstract_text, NO_ABSTRACT),
        url: or_placeholder(record.url, NO_URL),
    }
}

fn or_placeholder(value: Option<String>, placeholder: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => placeholder.to_string(),
    }
}

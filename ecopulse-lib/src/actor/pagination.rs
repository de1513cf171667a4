use regex::Regex;
use reqwest::header::{HeaderMap, LINK};
use serde_json::Value;
use std::sync::LazyLock;

static NEXT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).expect("next-link pattern is valid"));

/// One REST page: the decoded body plus the server-supplied link to the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub body: Value,
    pub next: Option<String>,
}

/// Result of [`Actor::fetch_all`](super::Actor::fetch_all).
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// `max_pages == 1`: the first page exactly as the server returned it.
    Single(Value),

    /// Items of every fetched page, concatenated.
    Many(Vec<Value>),
}

impl Fetched {
    /// Flatten into a list of items regardless of how it was fetched.
    #[must_use]
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Single(Value::Array(items)) | Self::Many(items) => items,
            Self::Single(Value::Null) => Vec::new(),
            Self::Single(other) => vec![other],
        }
    }
}

/// Cursor pair read from a GraphQL connection's `pageInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

impl Cursor {
    /// Read `pageInfo { endCursor hasNextPage }` from a connection object.
    #[must_use]
    pub fn from_connection(connection: &Value) -> Self {
        let info = connection.get("pageInfo");
        Self {
            end_cursor: info
                .and_then(|i| i.get("endCursor"))
                .and_then(Value::as_str)
                .map(ToString::to_string),
            has_next_page: info
                .and_then(|i| i.get("hasNextPage"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    /// The cursor to continue from, if there is another page.
    #[must_use]
    pub fn next(&self) -> Option<&str> {
        if self.has_next_page { self.end_cursor.as_deref() } else { None }
    }
}

/// Extract the `rel="next"` target from a `Link` header.
#[must_use]
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',')
        .find_map(|part| NEXT_LINK.captures(part))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Append the items of a page to the accumulated result.
pub fn extend_items(items: &mut Vec<Value>, body: Value) {
    match body {
        Value::Array(page_items) => items.extend(page_items),
        Value::Null => {}
        other => items.push(other),
    }
}

//! Entry id recovery for providers that omit the id from create responses.
//!
//! Order: the response body, then the `Location` header, then a unique
//! title match in the resource's listing, then a placeholder.

use replica_kernel::RemoteEntrySummary;
use serde::Serialize;
use uuid::Uuid;

pub const PLACEHOLDER_PREFIX: &str = "pending-";

/// Where an entry id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSource {
    Response,
    LocationHeader,
    Listing,
    Placeholder,
}

/// Last non-empty path segment of a `Location` value, query and fragment
/// stripped.
pub fn id_from_location(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
}

/// The id of the only entry whose title equals `title`, ignoring case and
/// surrounding whitespace. Zero or several matches give `None`.
pub fn match_unique_title(entries: &[RemoteEntrySummary], title: &str) -> Option<String> {
    let wanted = title.trim().to_lowercase();
    let mut matches = entries.iter().filter(|entry| {
        entry
            .title
            .as_deref()
            .is_some_and(|t| t.trim().to_lowercase() == wanted)
    });
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first.id.clone())
}

pub fn placeholder_id() -> String {
    format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4())
}

pub fn is_placeholder(entry_id: &str) -> bool {
    entry_id.starts_with(PLACEHOLDER_PREFIX)
}

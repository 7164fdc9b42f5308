use serde::{Deserialize, Serialize};

/// A normalized business listing as returned to callers and persisted.
///
/// Every field is optional, but a record that reaches a caller always has a
/// `title` or a `listing_url` (see [`BusinessRecord::has_identity`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRecord {
    pub title: Option<String>,
    pub listing_url: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub all_links: Vec<String>,
}

impl BusinessRecord {
    /// Returns `true` when the record carries at least one identifying field.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.title) || present(&self.listing_url)
    }
}

//! Static page content served by the pages endpoint.

use serde::{Deserialize, Serialize};

/// Rendered content of a static page (about, delivery terms, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub slug: String,
    pub title: String,
    /// Pre-rendered HTML body.
    pub content: String,
}

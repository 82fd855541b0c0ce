//! Static page content endpoint.

use tracing::instrument;

use blossom_core::PageContent;

use crate::error::ApiError;
use crate::gateway::RequestGateway;

/// Pages endpoint group.
#[derive(Clone)]
pub struct PagesApi {
    gateway: RequestGateway,
}

impl PagesApi {
    #[must_use]
    pub const fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Fetch one static page by slug.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the page is not found or the request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn page(&self, slug: &str) -> Result<PageContent, ApiError> {
        self.gateway.get(&format!("/pages/{slug}/")).await
    }
}

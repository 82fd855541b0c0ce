//! Typed endpoint groups over the request gateway.
//!
//! Each group owns its paths and wire shapes; all requests flow through
//! [`RequestGateway`](crate::gateway::RequestGateway) and inherit its
//! credential injection and 401 recovery.

mod favorites;
mod orders;
mod pages;
mod products;

pub use favorites::{
    FavoriteAction, FavoriteHistoryEntry, FavoriteMutation, FavoriteStatus, FavoritesApi,
    SyncSummary,
};
pub use orders::OrdersApi;
pub use pages::PagesApi;
pub use products::ProductsApi;

//! Favorites management.

use blossom_client::{ApiError, ShopClient};

/// Print the local favorites set.
#[allow(clippy::print_stdout)]
pub fn show(client: &ShopClient) {
    let items = client.favorites().items();
    if items.is_empty() {
        println!("no favorites");
        return;
    }
    for product in &items {
        println!("{:>6}  {:<32}  [{}]", product.id, product.title, product.slug);
    }
    let synced = if client.favorites().is_synced() {
        "synced"
    } else {
        "not yet synced"
    };
    println!("{} favorite(s), {synced}", items.len());
}

/// Flip membership for a product by slug.
#[allow(clippy::print_stdout)]
pub async fn toggle(client: &ShopClient, slug: &str) -> Result<(), ApiError> {
    let product = client.products().product(slug).await?;
    let title = product.title.clone();
    if client.favorites().toggle(product) {
        println!("added {title} to favorites");
    } else {
        println!("removed {title} from favorites");
    }
    Ok(())
}

/// Reconcile the local set with the server.
#[allow(clippy::print_stdout)]
pub async fn sync(client: &ShopClient) -> Result<(), ApiError> {
    client.favorites().sync_with_server().await?;
    println!(
        "synced; server holds {} favorite(s)",
        client.favorites().count()
    );
    Ok(())
}

//! Order history.

use blossom_client::{ApiError, ShopClient};

/// List the current user's orders.
#[allow(clippy::print_stdout)]
pub async fn list(client: &ShopClient) -> Result<(), ApiError> {
    let listing = client.orders().list().await?;
    if listing.results.is_empty() {
        println!("no orders yet");
        return Ok(());
    }
    for order in &listing.results {
        println!(
            "{:>6}  {:<12}  {:>10}  {}",
            order.id,
            format!("{:?}", order.status).to_lowercase(),
            order.total_amount,
            order.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("{} of {} orders", listing.results.len(), listing.count);
    Ok(())
}

//! Local cart management.

use blossom_core::ProductId;

use blossom_client::{ApiError, ShopClient};

/// Print cart lines and derived totals.
#[allow(clippy::print_stdout)]
pub fn show(client: &ShopClient) {
    let cart = client.cart();
    let items = cart.items();
    if items.is_empty() {
        println!("cart is empty");
        return;
    }
    for line in &items {
        println!(
            "{:>6}  {:<32}  {} x {} = {}",
            line.product_id,
            line.product.title,
            line.quantity,
            line.product.price,
            line.line_total()
        );
    }
    println!("subtotal: {}", cart.subtotal());
    if let Some(promo) = cart.promo() {
        println!("promo {}: -{}", promo.code, cart.discount());
    }
    println!("total:    {}", cart.total());
}

/// Fetch a product by slug and add it to the cart.
#[allow(clippy::print_stdout)]
pub async fn add(client: &ShopClient, slug: &str, quantity: u32) -> Result<(), ApiError> {
    let product = client.products().product(slug).await?;
    let product_id = product.id;
    client.cart().add_item(product, quantity);
    client.analytics().track_cart_add(product_id, quantity);
    println!("added; cart now holds {} item(s)", client.cart().item_count());
    Ok(())
}

/// Remove a line by product id.
#[allow(clippy::print_stdout)]
pub fn remove(client: &ShopClient, product_id: i64) {
    let product_id = ProductId::new(product_id);
    client.cart().remove_item(product_id);
    client.analytics().track_cart_remove(product_id);
    println!("removed; cart now holds {} item(s)", client.cart().item_count());
}

/// Empty the cart.
#[allow(clippy::print_stdout)]
pub fn clear(client: &ShopClient) {
    client.cart().clear();
    println!("cart cleared");
}

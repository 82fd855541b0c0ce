//! Catalog browsing.

use blossom_core::ProductFilter;

use blossom_client::{ApiError, ShopClient};

/// List products matching the given filter, one page.
#[allow(clippy::print_stdout)]
pub async fn list_products(
    client: &ShopClient,
    category: Option<String>,
    search: Option<String>,
    in_stock: bool,
    page: Option<u32>,
) -> Result<(), ApiError> {
    let filter = ProductFilter {
        category,
        search,
        in_stock,
        page,
        ..ProductFilter::default()
    };
    let listing = client.products().products(&filter).await?;

    for product in &listing.results {
        println!(
            "{:>6}  {:<32}  {:>10}  stock {:>4}  [{}]",
            product.id, product.title, product.price, product.stock, product.slug
        );
    }
    println!("{} of {} products", listing.results.len(), listing.count);
    if let Some(next) = listing.next_page() {
        println!("more: --page {next}");
    }
    Ok(())
}

/// Show one product in detail.
#[allow(clippy::print_stdout)]
pub async fn show_product(client: &ShopClient, slug: &str) -> Result<(), ApiError> {
    let product = client.products().product(slug).await?;
    client.analytics().track_product_view(product.id);

    println!("{}  (id {})", product.title, product.id);
    println!("price: {}   stock: {}", product.price, product.stock);
    if !product.description.is_empty() {
        println!("{}", product.description);
    }
    if client.favorites().is_favorite(product.id) {
        println!("in favorites");
    }
    Ok(())
}

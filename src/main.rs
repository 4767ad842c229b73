//! OpenSASE Storefront - command-line shell
//!
//! # Usage
//!
//! ```bash
//! storefront products --category laptop --sort price-low-high
//! storefront products --query "?category=mouse"
//! storefront show 3
//! storefront add 3
//! storefront decrease 0
//! storefront checkout buyer@example.com
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use opensase_storefront::domain::value_objects::format_amount;
use opensase_storefront::query::product_id_from_query;
use opensase_storefront::{
    CartEvent, CartStore, CartView, DomainEvent, FileStore, HttpApi, OrderEvent, Product, ProductFilter, ProductId,
    RefreshCause, SortOrder, Storefront, StorefrontConfig,
};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(author, version, about = "Browse the catalog, manage the cart and place orders")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List products, optionally filtered and sorted
    Products {
        #[arg(long, default_value = "all")]
        category: String,
        #[arg(long, default_value = "all")]
        brand: String,
        /// Inclusive price ceiling
        #[arg(long)]
        max_price: Option<Decimal>,
        /// `price-low-high`, `price-high-low` or `popularity`
        #[arg(long)]
        sort: Option<SortOrder>,
        /// Landing page query string; its `category` replaces --category
        #[arg(long)]
        query: Option<String>,
    },
    /// Show one product
    Show {
        id: Option<ProductId>,
        /// Detail page query string carrying `id`
        #[arg(long, conflicts_with = "id")]
        query: Option<String>,
    },
    /// Add one unit of a product to the cart
    Add { id: ProductId },
    /// Increase the quantity of the cart line at INDEX
    Increase { index: usize },
    /// Decrease the quantity of the cart line at INDEX, removing it at zero
    Decrease { index: usize },
    /// Remove the cart line at INDEX
    Remove { index: usize },
    /// Show the cart
    Cart,
    /// Empty the cart
    Clear,
    /// Place an order for the cart contents
    Checkout { email: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = StorefrontConfig::from_env()?;
    let api = HttpApi::new(&config.api_url, config.http_timeout)?;
    let cart_store = CartStore::new(FileStore::new(&config.state_dir), config.cart_key.clone());
    let mut storefront = Storefront::new(api, cart_store, config.pricing());
    storefront.on_refresh(|view| {
        if view.cause == RefreshCause::Cart {
            render_cart(view);
        }
    });

    let result = run(&mut storefront, cli.command).await;
    for event in storefront.take_events() {
        println!("{}", notification(&event));
    }
    result
}

async fn run(storefront: &mut Storefront<HttpApi, FileStore>, command: Command) -> Result<()> {
    match command {
        Command::Products { category, brand, max_price, sort, query } => {
            storefront.load_catalog().await?;
            let filter = match query {
                Some(query) => ProductFilter { brand, max_price, ..ProductFilter::from_query(&query) },
                None => ProductFilter { category, brand, max_price },
            };
            let products = storefront.products(&filter, sort);
            if products.is_empty() {
                println!("No products match.");
            }
            for product in products {
                println!("{}", listing(product));
            }
        }
        Command::Show { id, query } => {
            let id = match (id, query) {
                (Some(id), _) => id,
                (None, Some(query)) => product_id_from_query(&query).context("query has no numeric `id`")?,
                (None, None) => anyhow::bail!("pass a product id or --query"),
            };
            storefront.load_catalog().await?;
            print_detail(storefront.product_detail(id)?);
        }
        Command::Add { id } => {
            storefront.load_catalog().await?;
            storefront.add_item(id)?;
        }
        Command::Increase { index } => adjust(storefront, index, 1),
        Command::Decrease { index } => adjust(storefront, index, -1),
        Command::Remove { index } => {
            if !storefront.remove_item(index) {
                println!("No cart line at index {index}.");
            }
        }
        Command::Cart => render_cart(storefront.view()),
        Command::Clear => storefront.clear_cart(),
        Command::Checkout { email } => {
            let confirmation = storefront.checkout(&email).await?;
            println!("Order {} for {} ({} items, {})", confirmation.reference, confirmation.email, confirmation.item_count, format_amount(confirmation.total));
        }
    }
    Ok(())
}

fn adjust(storefront: &mut Storefront<HttpApi, FileStore>, index: usize, delta: i64) {
    if !storefront.adjust_quantity(index, delta) {
        println!("Cart line {index} was not changed.");
    }
}

fn listing(product: &Product) -> String {
    format!("{:>4}  {:<32} {:>10}  {} / {}", product.id, product.name, format_amount(product.price), product.category, product.brand)
}

fn print_detail(product: &Product) {
    println!("{}", product.name);
    println!("Price: {}", format_amount(product.price));
    if !product.availability.is_empty() {
        println!("Availability: {}", product.availability);
    }
    if !product.description.is_empty() {
        println!("{}", product.description);
    }
    if let Some(image) = product.primary_image() {
        println!("Image: {image}");
    }
    for image in &product.gallery {
        println!("  {image}");
    }
}

fn render_cart(view: CartView<'_>) {
    if view.lines.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for (index, line) in view.lines.iter().enumerate() {
        println!("[{index}] {:<32} {} x {} = {}", line.name(), format_amount(line.price()), line.quantity(), format_amount(line.line_total()));
    }
    println!("Subtotal: {}", format_amount(view.totals.subtotal));
    println!("Shipping: {}", format_amount(view.totals.shipping));
    println!("Tax: {}", format_amount(view.totals.tax));
    println!("Total: {} ({} items)", format_amount(view.totals.total), view.item_count);
}

fn notification(event: &DomainEvent) -> String {
    match event {
        DomainEvent::Cart(CartEvent::ItemAdded { name, .. }) => format!("{name} added to cart."),
        DomainEvent::Cart(CartEvent::QuantityAdjusted { quantity, .. }) => format!("Quantity updated to {quantity}."),
        DomainEvent::Cart(CartEvent::ItemRemoved { name, .. }) => format!("{name} removed from cart."),
        DomainEvent::Cart(CartEvent::Cleared) => "Cart emptied.".to_string(),
        DomainEvent::Order(OrderEvent::Placed { .. }) => "Order placed successfully! A confirmation email has been sent.".to_string(),
    }
}

//! # Seed Data Generator
//!
//! Creates a marketplace database populated with demo data.
//!
//! ## Usage
//! ```bash
//! # 10 users, 20 products (default)
//! cargo run -p agora-db --bin seed
//!
//! # Custom amounts
//! cargo run -p agora-db --bin seed -- --users 50 --products 60 --page-size 25
//!
//! # Specify database path
//! cargo run -p agora-db --bin seed -- --db ./data/agora.db
//! ```
//!
//! ## Environment
//! - `AGORA_DB_PATH` - database file (default `./agora_dev.db`)
//! - `AGORA_SECRET_KEY` - credential pepper (default is a development key)
//! - `RUST_LOG` - log filter (default `info,agora=debug,sqlx=warn`)
//!
//! ## Generated Data
//! - Users `user001`, `user002`, ... with password `haslo123`
//! - Products drawn from a fixed catalog across a handful of categories,
//!   sold by the first few users
//! - Purchases spread deterministically across users and products

use std::env;
use std::time::Instant;

use agora_core::validation::{
    validate_email, validate_pagination, validate_password, validate_product_name, validate_username,
};
use agora_core::{Fields, MAX_PAGE_SIZE};
use agora_db::migrations::migration_status;
use agora_db::{Database, DbConfig};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_PATH: &str = "./agora_dev.db";
const DEFAULT_SECRET_KEY: &str = "agora-dev-secret-change-in-production";
const DEFAULT_LOG_FILTER: &str = "info,agora=debug,sqlx=warn";

const DEMO_PASSWORD: &str = "haslo123";

/// Number of users that list products.
const SELLERS: usize = 3;

/// Demo catalog: (category, names).
const CATALOG: &[(&str, &[&str])] = &[
    ("Tools", &["Wiertarka", "Mlotek", "Obcegi", "Poziomica", "Pila reczna"]),
    ("Garden", &["Grabie", "Konewka", "Sekator", "Kosiarka"]),
    ("Books", &["Pan Tadeusz", "Lalka", "Quo Vadis", "Ferdydurke"]),
    ("Kitchen", &["Czajnik", "Patelnia", "Garnek", "Toster"]),
    ("Other", &["Parasol", "Latarka", "Plecak"]),
];

// =============================================================================
// Configuration
// =============================================================================

/// Seed configuration: environment first, then command-line flags.
#[derive(Debug, Clone)]
struct SeedConfig {
    db_path: String,
    secret_key: String,
    users: usize,
    products: usize,
    /// Catalog page printed after seeding.
    page_size: i64,
    show_help: bool,
}

impl SeedConfig {
    fn load() -> Result<Self, ConfigError> {
        let mut config = SeedConfig {
            db_path: env::var("AGORA_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            secret_key: env::var("AGORA_SECRET_KEY").unwrap_or_else(|_| DEFAULT_SECRET_KEY.to_string()),
            users: 10,
            products: 20,
            page_size: 10,
            show_help: false,
        };

        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" | "-d" => config.db_path = flag_value(&arg, args.next())?,
                "--users" | "-u" => config.users = parse_count(&arg, args.next())?,
                "--products" | "-p" => config.products = parse_count(&arg, args.next())?,
                "--page-size" => {
                    config.page_size = flag_value(&arg, args.next())?
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue(arg.clone()))?
                }
                "--help" | "-h" => config.show_help = true,
                other => return Err(ConfigError::UnknownFlag(other.to_string())),
            }
        }

        if config.secret_key.is_empty() {
            return Err(ConfigError::MissingRequired("AGORA_SECRET_KEY".to_string()));
        }
        if config.users < SELLERS {
            return Err(ConfigError::InvalidValue("--users".to_string()));
        }
        validate_pagination(config.page_size, 0)
            .map_err(|_| ConfigError::InvalidValue("--page-size".to_string()))?;

        Ok(config)
    }
}

fn flag_value(flag: &str, value: Option<String>) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn parse_count(flag: &str, value: Option<String>) -> Result<usize, ConfigError> {
    flag_value(flag, value)?
        .parse()
        .map_err(|_| ConfigError::InvalidValue(flag.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing value for {0}")]
    MissingValue(String),

    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

fn print_help() {
    println!("Agora Seed Data Generator");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>        Database file path (default: {DEFAULT_DB_PATH})");
    println!("  -u, --users <N>        Number of users to create (default: 10, min: {SELLERS})");
    println!("  -p, --products <N>     Number of products to create (default: 20)");
    println!("      --page-size <N>    Catalog entries to print (default: 10, max: {MAX_PAGE_SIZE})");
    println!("  -h, --help             Show this help message");
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = SeedConfig::load()?;
    if config.show_help {
        print_help();
        return Ok(());
    }

    info!(db = %config.db_path, users = config.users, products = config.products, "Seeding marketplace");

    let db = Database::new(DbConfig::new(&config.db_path).secret_key(config.secret_key.clone())).await?;

    let (total, applied) = migration_status(db.pool()).await?;
    info!(total, applied, "Schema ready");

    let existing = db.users().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has users, skipping seed");
        println!("Database already has {existing} users. Delete the file to regenerate.");
        return Ok(());
    }

    let start = Instant::now();

    let users = seed_users(&db, config.users).await?;
    let products = seed_products(&db, &users, config.products).await?;
    let purchases = seed_purchases(&db, &users, &products).await?;

    info!(
        users = users.len(),
        products = products.len(),
        purchases,
        elapsed = ?start.elapsed(),
        "Seed complete"
    );

    println!();
    println!("Top sellers:");
    for (rank, seller) in db.analytics().top_sellers(5).await?.iter().enumerate() {
        println!("  {}. {} ({} sold)", rank + 1, seller.product_name, seller.total_quantity);
    }

    let page = db.products().list(config.page_size, 0, None).await?;
    println!();
    println!("Catalog: {} products", page.total);
    for category in db.products().categories().await? {
        println!("  {}: {}", category.category, category.products);
    }
    for product in &page.items {
        let text = |key: &str| product[key].as_str().unwrap_or_default().to_string();
        println!("  - {} ({}, {})", text("name"), text("category"), text("price"));
    }

    db.close().await;
    Ok(())
}

/// Creates users and returns (uuid, username) pairs.
async fn seed_users(db: &Database, count: usize) -> Result<Vec<(String, String)>, Box<dyn std::error::Error>> {
    let repo = db.users();
    let mut users = Vec::with_capacity(count);

    for n in 1..=count {
        let username = format!("user{n:03}");
        let email = format!("{username}@agora.test");

        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(DEMO_PASSWORD)?;

        if !repo.credentials_unique(&username, &email).await? {
            warn!(username = %username, "User already exists, skipping");
            continue;
        }

        let mut fields = Fields::new();
        fields.insert("username".into(), json!(username));
        fields.insert("password".into(), json!(DEMO_PASSWORD));
        fields.insert("email".into(), json!(email));

        let uuid = repo.create(&fields).await?;
        users.push((uuid, username));
    }

    Ok(users)
}

/// Creates products sold by the first users and returns their uuids.
async fn seed_products(
    db: &Database,
    users: &[(String, String)],
    count: usize,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let repo = db.products();
    let entries: Vec<(&str, &str)> = CATALOG
        .iter()
        .flat_map(|(category, names)| names.iter().map(move |name| (*category, *name)))
        .collect();
    let mut products = Vec::with_capacity(count);

    for n in 0..count {
        let (category, base) = entries[n % entries.len()];
        let edition = n / entries.len();
        let name = if edition == 0 {
            base.to_string()
        } else {
            format!("{base} {}", edition + 1)
        };

        validate_product_name(&name)?;
        if !repo.name_unique(&name).await? {
            warn!(name = %name, "Product already exists, skipping");
            continue;
        }

        let (_, seller) = &users[n % SELLERS];
        let price = format!("{} PLN", 5 + (n * 13) % 200);

        let mut fields = Fields::new();
        fields.insert("name".into(), json!(name));
        fields.insert("description".into(), json!(format!("{name} in good condition")));
        fields.insert("price".into(), json!(price));
        fields.insert("category".into(), json!(category));

        products.push(repo.create(seller, &fields).await?);
    }

    Ok(products)
}

/// Records purchases and returns how many buys were recorded.
async fn seed_purchases(
    db: &Database,
    users: &[(String, String)],
    products: &[String],
) -> Result<usize, Box<dyn std::error::Error>> {
    let ledger = db.ledger();
    let mut recorded = 0;

    for (i, (user, _)) in users.iter().enumerate() {
        for (j, product) in products.iter().enumerate() {
            if (i + j) % 3 != 0 {
                continue;
            }
            let quantity = ((i * 7 + j * 3) % 10 + 1) as u32;
            if ledger.buy(quantity, user, product).await?.is_recorded() {
                recorded += 1;
            }
        }
    }

    Ok(recorded)
}

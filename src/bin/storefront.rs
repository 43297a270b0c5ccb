//! Storefront server binary
//!
//! Reads an optional YAML file (first argument or `STOREFRONT_CONFIG`), applies
//! environment overrides (a `.env` file is honoured), then serves the API on
//! the configured backend.

use anyhow::Result;
use rust_decimal::Decimal;
use storefront::config::{AppConfig, Backend};
use storefront::core::model::NewProduct;
use storefront::server::ServerBuilder;
use storefront::storage::InMemoryStore;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = load_config()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.log_filter.as_deref().unwrap_or("info,storefront=debug"))
    });
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    config.validate()?;

    let addr = config.server.bind_addr();
    let builder = ServerBuilder::new().with_config(&config);

    let builder = match config.database.backend {
        Backend::InMemory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            builder.with_store(InMemoryStore::new().with_products(demo_products()))
        }
        Backend::Mysql => mysql_store(builder, &config).await?,
        Backend::Postgres => postgres_store(builder, &config).await?,
    };

    builder.serve(&addr).await
}

fn load_config() -> Result<AppConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("STOREFRONT_CONFIG").ok());

    let config = match path {
        Some(path) => AppConfig::from_yaml_file(&path)?,
        None => AppConfig::default(),
    };
    config.with_env_overrides()
}

fn demo_products() -> Vec<NewProduct> {
    vec![
        NewProduct::new("Pen", Decimal::new(150, 2)).with_description("Blue ballpoint pen"),
        NewProduct::new("Notebook", Decimal::new(499, 2)).with_description("A5, 96 pages"),
        NewProduct::new("Backpack", Decimal::new(3999, 2)),
    ]
}

#[cfg(feature = "mysql")]
async fn mysql_store(builder: ServerBuilder, config: &AppConfig) -> Result<ServerBuilder> {
    use storefront::storage::{MysqlStore, mysql};

    let store = MysqlStore::connect(&config.database).await?;
    mysql::ensure_schema(store.pool()).await?;
    Ok(builder.with_store(store))
}

#[cfg(not(feature = "mysql"))]
async fn mysql_store(_builder: ServerBuilder, _config: &AppConfig) -> Result<ServerBuilder> {
    anyhow::bail!("MySQL backend requested but the `mysql` feature is not enabled")
}

#[cfg(feature = "postgres")]
async fn postgres_store(builder: ServerBuilder, config: &AppConfig) -> Result<ServerBuilder> {
    use storefront::storage::{PostgresStore, postgres};

    let store = PostgresStore::connect(&config.database).await?;
    postgres::ensure_schema(store.pool()).await?;
    Ok(builder.with_store(store))
}

#[cfg(not(feature = "postgres"))]
async fn postgres_store(_builder: ServerBuilder, _config: &AppConfig) -> Result<ServerBuilder> {
    anyhow::bail!("PostgreSQL backend requested but the `postgres` feature is not enabled")
}

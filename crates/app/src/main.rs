/// Marketplace Order Backend Application
///
/// This is the main entry point for the marketplace order lifecycle service.
/// The application exposes REST API endpoints for converting carts into
/// orders, advancing order status, cancelling orders, and listing orders for
/// customers and sellers.
///
/// # Architecture
///
/// The application follows a modular architecture with:
/// - Repository layer for data access
/// - Service layer for business logic (checkout, status machine, inventory)
/// - Policy and validation layers as pure, store-free crates
/// - API layer for HTTP endpoints
/// - Metrics for monitoring
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{error, info};

use app_config::AppConfig;
use identity::{PgRoleResolver, RoleResolver};
use repository::{
    PgCartItemsRepository, PgCartsRepository, PgOrderItemsRepository, PgOrdersRepository,
    PgPaymentsRepository, PgProductsRepository,
};
use server::Server;
use service::{OrderService, OrderServiceImpl};
use tokio_postgres::{Client, NoTls};

/// Initialize the tracing subscriber for logging
fn init_logger() -> Result<()> {
    tracing_subscriber::fmt::init();
    Ok(())
}

/// Opens a dedicated connection for a repository and drives it in the
/// background. tokio_postgres::Client does not implement Clone, so each
/// repository that reads outside of transactions gets its own connection.
async fn connect(dsn: &str, label: &'static str) -> Result<Client> {
    let (client, connection) = tokio_postgres::connect(dsn, NoTls)
        .await
        .with_context(|| format!("Failed to connect to database for {label}"))?;
    info!("Connected to database for {label}");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("{label} connection error: {e}");
        }
    });
    Ok(client)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    if let Err(err) = init_logger() {
        eprintln!("Failed to initialize logger: {}", err);
        return Err(anyhow::anyhow!("Failed to initialize logger"));
    }

    info!("Marketplace order backend starting...");

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize database pool and apply migrations
    let db_pool = match db::init_db_pool(&config).await {
        Ok(pool) => {
            info!("Database initialized successfully");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            error!("Database connection is required for application to function properly");
            return Err(anyhow::anyhow!("Failed to initialize database"));
        }
    };

    let dsn = format!(
        "host={} port={} user={} password={} dbname={} sslmode=disable",
        config.db_host, config.db_port, config.db_user, config.db_password, config.db_name
    );

    // Repositories that serve reads outside of transactions each hold a
    // dedicated connection; the purely transactional ones are stateless.
    let orders_repo = PgOrdersRepository::new(connect(&dsn, "orders repository").await?);
    let order_items_repo =
        PgOrderItemsRepository::new(connect(&dsn, "order items repository").await?);
    let payments_repo = PgPaymentsRepository::new(connect(&dsn, "payments repository").await?);
    let role_resolver: Arc<dyn RoleResolver> =
        Arc::new(PgRoleResolver::new(connect(&dsn, "role resolver").await?));

    let order_service: Arc<dyn OrderService> = Arc::new(OrderServiceImpl::new(
        db_pool.clone(),
        orders_repo,
        order_items_repo,
        PgCartsRepository::new(),
        PgCartItemsRepository::new(),
        PgProductsRepository::new(),
        payments_repo,
    ));

    // Create a JoinSet to manage all our tasks
    let mut tasks = JoinSet::new();

    let http_port = config.http_port.to_string();
    info!("Using HTTP port: {}", http_port);

    let http_server = Server::new(
        http_port,
        order_service,
        role_resolver,
        config.default_list_limit,
    );
    tasks.spawn(async move {
        if let Err(err) = http_server.start().await {
            error!("HTTP server error: {}", err);
            // Exit the application if the server fails to start
            std::process::exit(1);
        }
    });

    // Wait for all tasks to complete
    while let Some(res) = tasks.join_next().await {
        if let Err(err) = res {
            error!("Task error: {}", err);
        }
    }

    info!("Application stopped");
    Ok(())
}

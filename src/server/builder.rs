//! ServerBuilder for fluent API to build the HTTP server

use super::handlers::AppState;
use super::router::{build_api_routes, health_routes};
use crate::config::AppConfig;
use crate::core::auth::{AccountService, TokenSigner};
use crate::core::orders::{OrderIntake, OrderPolicy};
use crate::core::store::{OrderStore, ProductStore, UserStore};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the storefront HTTP server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_store(InMemoryStore::new())
///     .with_token_signer(TokenSigner::new("secret", 3600))
///     .build()?;
/// ```
pub struct ServerBuilder {
    order_store: Option<Arc<dyn OrderStore>>,
    user_store: Option<Arc<dyn UserStore>>,
    product_store: Option<Arc<dyn ProductStore>>,
    signer: Option<TokenSigner>,
    policy: OrderPolicy,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            order_store: None,
            user_store: None,
            product_store: None,
            signer: None,
            policy: OrderPolicy::default(),
            custom_routes: Vec::new(),
        }
    }

    /// Take the order policy and token settings from configuration
    pub fn with_config(self, config: &AppConfig) -> Self {
        self.with_policy(config.orders.clone())
            .with_token_signer(TokenSigner::new(
                config.auth.token_secret.as_bytes(),
                config.auth.token_ttl_secs,
            ))
    }

    pub fn with_policy(mut self, policy: OrderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use one backend for orders, users and products (required)
    pub fn with_store<S>(mut self, store: S) -> Self
    where
        S: OrderStore + UserStore + ProductStore + 'static,
    {
        let store = Arc::new(store);
        self.order_store = Some(store.clone());
        self.user_store = Some(store.clone());
        self.product_store = Some(store);
        self
    }

    /// Set the signer used for login tokens (required)
    pub fn with_token_signer(mut self, signer: TokenSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Assemble the shared handler state
    pub fn build_state(&mut self) -> Result<AppState> {
        let order_store = self
            .order_store
            .take()
            .ok_or_else(|| anyhow::anyhow!("A store is required. Call .with_store()"))?;
        let user_store = self
            .user_store
            .take()
            .ok_or_else(|| anyhow::anyhow!("A store is required. Call .with_store()"))?;
        let product_store = self
            .product_store
            .take()
            .ok_or_else(|| anyhow::anyhow!("A store is required. Call .with_store()"))?;
        let signer = self.signer.take().ok_or_else(|| {
            anyhow::anyhow!("A token signer is required. Call .with_token_signer()")
        })?;

        Ok(AppState {
            orders: Arc::new(OrderIntake::new(order_store).with_policy(self.policy.clone())),
            accounts: Arc::new(AccountService::new(user_store, signer)),
            products: product_store,
        })
    }

    /// Build the final router with tracing and CORS layers
    pub fn build(mut self) -> Result<Router> {
        let state = self.build_state()?;

        let mut app = health_routes().merge(build_api_routes(state));
        for custom_router in std::mem::take(&mut self.custom_routes) {
            app = app.merge(custom_router);
        }

        Ok(app
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Handles SIGTERM and SIGINT (Ctrl+C); in-flight requests are allowed to
    /// finish before the listener closes.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

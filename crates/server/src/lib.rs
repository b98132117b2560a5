//! Server crate provides HTTP server functionality.
//!
//! This module implements the public entry points of the order lifecycle:
//! thin authorization wrappers that resolve the caller's identity and role,
//! delegate to the [`OrderService`], and shape responses through the mapper.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use identity::RoleResolver;
use model::OrderStatus;
use policy::Viewer;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry};
use serde::Deserialize;
use serde_json::json;
use service::{CreateOrderRequest, OrderService, ServiceError};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server represents the HTTP entry-point layer for the order lifecycle.
pub struct Server {
    service: Arc<dyn OrderService>,
    roles: Arc<dyn RoleResolver>,
    port: String,
    default_list_limit: i64,
    metrics: Arc<Metrics>,
}

/// Metrics collects and exposes HTTP server metrics.
struct Metrics {
    registry: Registry,
    http_requests_total: CounterVec,
    http_request_duration_seconds: HistogramVec,
    errors_total: CounterVec,
    orders_created_total: IntCounter,
    orders_cancelled_total: IntCounter,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )
        .expect("Failed to create http_requests_total metric");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "endpoint"],
        )
        .expect("Failed to create http_request_duration_seconds metric");

        let errors_total = CounterVec::new(
            Opts::new("errors_total", "Total number of errors"),
            &["source", "endpoint"],
        )
        .expect("Failed to create errors_total metric");

        let orders_created_total = IntCounter::new(
            "orders_created_total",
            "Total number of orders created",
        )
        .expect("Failed to create orders_created_total metric");

        let orders_cancelled_total = IntCounter::new(
            "orders_cancelled_total",
            "Total number of orders cancelled",
        )
        .expect("Failed to create orders_cancelled_total metric");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("Failed to register http_requests_total metric");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("Failed to register http_request_duration_seconds metric");
        registry
            .register(Box::new(errors_total.clone()))
            .expect("Failed to register errors_total metric");
        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("Failed to register orders_created_total metric");
        registry
            .register(Box::new(orders_cancelled_total.clone()))
            .expect("Failed to register orders_cancelled_total metric");

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            errors_total,
            orders_created_total,
            orders_cancelled_total,
        }
    }

    fn record_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
    }

    fn record_error(&self, source: &str, endpoint: &str) {
        self.errors_total
            .with_label_values(&[source, endpoint])
            .inc();
    }
}

/// Maps a service error to the HTTP status its entry point responds with.
fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
        ServiceError::Forbidden => StatusCode::FORBIDDEN,
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::ValidationFailed(_) | ServiceError::InsufficientInventory(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServiceError::OrderNotModifiable | ServiceError::AlreadyExists => StatusCode::CONFLICT,
        ServiceError::Db(_) | ServiceError::Pool(_) | ServiceError::Unexpected(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: ServiceError) -> Response {
    let status = status_for(&err);
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        // Internals stay in the logs, not in the response body.
        error!("request failed: {err}");
        "internal error".to_string()
    } else {
        err.to_string()
    };
    (status, axum::Json(json!({ "error": message }))).into_response()
}

/// Query parameters accepted by the listing endpoints.
#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<String>,
    limit: Option<i64>,
}

/// Body of the status-update entry point.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStatusRequest {
    status: OrderStatus,
    #[serde(default)]
    tracking_number: Option<String>,
}

/// Body of the cancellation entry point.
#[derive(Debug, Default, Deserialize)]
struct CancelRequest {
    #[serde(default)]
    reason: Option<String>,
}

impl Server {
    /// Creates a new Server instance.
    ///
    /// # Arguments
    ///
    /// * `port` - The port on which the server will listen
    /// * `service` - The order service the entry points delegate to
    /// * `roles` - The role resolver for the identity collaborator
    /// * `default_list_limit` - Page size when a listing omits `limit`
    pub fn new(
        port: String,
        service: Arc<dyn OrderService>,
        roles: Arc<dyn RoleResolver>,
        default_list_limit: i64,
    ) -> Self {
        info!("Initializing HTTP server on port {}", port);

        Self {
            service,
            roles,
            port,
            default_list_limit,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Starts the server and blocks until it's shut down.
    pub async fn start(&self) -> Result<()> {
        let app = self.create_router();

        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .context("Failed to bind to port")?;

        info!("HTTP server listening on port {}", self.port);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("HTTP server shut down gracefully");
        Ok(())
    }

    fn create_router(&self) -> Router {
        let metrics = self.metrics.clone();

        Router::new()
            .route("/api/orders", post(Self::handle_create_order).get(Self::handle_get_user_orders))
            .route("/api/orders/{id}", get(Self::handle_get_order))
            .route("/api/orders/{id}/status", patch(Self::handle_update_status))
            .route("/api/orders/{id}/cancel", post(Self::handle_cancel_order))
            .route("/api/seller/orders", get(Self::handle_get_seller_orders))
            .route("/health", get(Self::handle_health))
            .route("/metrics", get(Self::handle_metrics))
            .layer(axum::middleware::from_fn_with_state(
                metrics.clone(),
                Self::metrics_middleware,
            ))
            .with_state(AppState {
                service: self.service.clone(),
                roles: self.roles.clone(),
                default_list_limit: self.default_list_limit,
                metrics,
            })
    }

    /// Middleware for collecting metrics on HTTP requests
    async fn metrics_middleware(
        State(metrics): State<Arc<Metrics>>,
        req: axum::extract::Request,
        next: axum::middleware::Next,
    ) -> Response {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let start = std::time::Instant::now();
        let response = next.run(req).await;
        let duration = start.elapsed();

        let status = response.status().as_u16();
        metrics.record_request(&method, &path, status, duration);
        if status >= 400 {
            metrics.record_error("http", &path);
        }

        response
    }

    /// Resolves the caller into a [`Viewer`]: identity from the `x-user-id`
    /// header (session validation is the auth collaborator's job), role from
    /// the identity collaborator — exactly once per request.
    async fn resolve_viewer(state: &AppState, headers: &HeaderMap) -> Result<Viewer, ServiceError> {
        let user_id = headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(ServiceError::Unauthenticated)?;
        let role = state
            .roles
            .resolve_user_role(user_id)
            .await
            .map_err(ServiceError::from)?;
        Ok(Viewer::new(user_id, role))
    }

    fn tenant_from(headers: &HeaderMap) -> Option<String> {
        headers
            .get("x-tenant-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn parse_status_filter(raw: Option<&str>) -> Result<Option<OrderStatus>, ServiceError> {
        raw.map(|s| {
            s.parse::<OrderStatus>()
                .map_err(|e| ServiceError::ValidationFailed(e.to_string()))
        })
        .transpose()
    }

    async fn handle_create_order(
        State(state): State<AppState>,
        headers: HeaderMap,
        axum::Json(request): axum::Json<CreateOrderRequest>,
    ) -> Response {
        let viewer = match Self::resolve_viewer(&state, &headers).await {
            Ok(viewer) => viewer,
            Err(err) => return error_response(err),
        };
        let tenant = Self::tenant_from(&headers);

        match state
            .service
            .create_order(&viewer, tenant.as_deref(), request)
            .await
        {
            Ok(created) => {
                state.metrics.orders_created_total.inc();
                (
                    StatusCode::CREATED,
                    axum::Json(json!({
                        "orderId": created.order_id,
                        "orderNumber": created.order_number,
                    })),
                )
                    .into_response()
            }
            Err(err) => error_response(err),
        }
    }

    async fn handle_get_order(
        State(state): State<AppState>,
        headers: HeaderMap,
        AxumPath(order_id): AxumPath<Uuid>,
    ) -> Response {
        let viewer = match Self::resolve_viewer(&state, &headers).await {
            Ok(viewer) => viewer,
            Err(err) => return error_response(err),
        };

        match state.service.get_order(&viewer, order_id).await {
            Ok(details) => {
                let view =
                    mapper::order_view(&details.order, &details.items, details.payment.as_ref());
                (StatusCode::OK, axum::Json(view)).into_response()
            }
            Err(err) => {
                warn!("get order {order_id} failed: {err}");
                error_response(err)
            }
        }
    }

    async fn handle_get_user_orders(
        State(state): State<AppState>,
        headers: HeaderMap,
        Query(query): Query<ListQuery>,
    ) -> Response {
        let viewer = match Self::resolve_viewer(&state, &headers).await {
            Ok(viewer) => viewer,
            Err(err) => return error_response(err),
        };
        let tenant = Self::tenant_from(&headers);
        let status = match Self::parse_status_filter(query.status.as_deref()) {
            Ok(status) => status,
            Err(err) => return error_response(err),
        };
        let limit = query.limit.unwrap_or(state.default_list_limit);

        match state
            .service
            .get_user_orders(&viewer, tenant.as_deref(), status, limit)
            .await
        {
            Ok(orders) => {
                let summaries: Vec<_> = orders.iter().map(mapper::order_summary).collect();
                (StatusCode::OK, axum::Json(summaries)).into_response()
            }
            Err(err) => error_response(err),
        }
    }

    async fn handle_get_seller_orders(
        State(state): State<AppState>,
        headers: HeaderMap,
        Query(query): Query<ListQuery>,
    ) -> Response {
        let viewer = match Self::resolve_viewer(&state, &headers).await {
            Ok(viewer) => viewer,
            Err(err) => return error_response(err),
        };
        let status = match Self::parse_status_filter(query.status.as_deref()) {
            Ok(status) => status,
            Err(err) => return error_response(err),
        };
        let limit = query.limit.unwrap_or(state.default_list_limit);

        match state.service.get_seller_orders(&viewer, status, limit).await {
            Ok(orders) => {
                let summaries: Vec<_> = orders.iter().map(mapper::order_summary).collect();
                (StatusCode::OK, axum::Json(summaries)).into_response()
            }
            Err(err) => error_response(err),
        }
    }

    async fn handle_update_status(
        State(state): State<AppState>,
        headers: HeaderMap,
        AxumPath(order_id): AxumPath<Uuid>,
        axum::Json(request): axum::Json<UpdateStatusRequest>,
    ) -> Response {
        let viewer = match Self::resolve_viewer(&state, &headers).await {
            Ok(viewer) => viewer,
            Err(err) => return error_response(err),
        };

        match state
            .service
            .update_order_status(&viewer, order_id, request.status, request.tracking_number)
            .await
        {
            Ok(updated) => {
                if request.status == OrderStatus::Cancelled {
                    state.metrics.orders_cancelled_total.inc();
                }
                (StatusCode::OK, axum::Json(json!({ "updated": updated }))).into_response()
            }
            Err(err) => error_response(err),
        }
    }

    async fn handle_cancel_order(
        State(state): State<AppState>,
        headers: HeaderMap,
        AxumPath(order_id): AxumPath<Uuid>,
        request: Option<axum::Json<CancelRequest>>,
    ) -> Response {
        let viewer = match Self::resolve_viewer(&state, &headers).await {
            Ok(viewer) => viewer,
            Err(err) => return error_response(err),
        };
        let reason = request.and_then(|axum::Json(body)| body.reason);

        match state.service.cancel_order(&viewer, order_id, reason).await {
            Ok(cancelled) => {
                state.metrics.orders_cancelled_total.inc();
                (StatusCode::OK, axum::Json(json!({ "cancelled": cancelled }))).into_response()
            }
            Err(err) => error_response(err),
        }
    }

    async fn handle_health() -> &'static str {
        "OK"
    }

    async fn handle_metrics(State(state): State<AppState>) -> Response {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();

        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&state.metrics.registry.gather(), &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
        }

        match String::from_utf8(buffer) {
            Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
            Err(e) => {
                error!("Failed to convert metrics to UTF-8: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Invalid metrics data").into_response()
            }
        }
    }
}

/// Application state shared between request handlers
#[derive(Clone)]
struct AppState {
    service: Arc<dyn OrderService>,
    roles: Arc<dyn RoleResolver>,
    default_list_limit: i64,
    metrics: Arc<Metrics>,
}

/// Waits for a shutdown signal (Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_for(&ServiceError::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for(&ServiceError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&ServiceError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&ServiceError::ValidationFailed("cart has no items".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&ServiceError::InsufficientInventory(Uuid::new_v4())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&ServiceError::OrderNotModifiable),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ServiceError::AlreadyExists),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ServiceError::Unexpected("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_status_filter_parsing() {
        assert_eq!(Server::parse_status_filter(None).unwrap(), None);
        assert_eq!(
            Server::parse_status_filter(Some("shipped")).unwrap(),
            Some(OrderStatus::Shipped)
        );
        assert!(Server::parse_status_filter(Some("nonsense")).is_err());
    }

    #[test]
    fn test_update_status_body_decodes() {
        let body: UpdateStatusRequest =
            serde_json::from_str(r#"{"status":"shipped","trackingNumber":"TRK-1"}"#).unwrap();
        assert_eq!(body.status, OrderStatus::Shipped);
        assert_eq!(body.tracking_number.as_deref(), Some("TRK-1"));

        let bare: UpdateStatusRequest = serde_json::from_str(r#"{"status":"confirmed"}"#).unwrap();
        assert!(bare.tracking_number.is_none());
    }
}

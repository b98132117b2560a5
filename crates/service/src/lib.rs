//! Business logic layer for the order lifecycle.
//!
//! This module defines the [`OrderService`] trait and its async implementation
//! [`OrderServiceImpl`]. The service coordinates cart checkout, the order
//! status machine, cancellation, and the inventory ledger, providing
//! transactional guarantees, business validation, and repository abstraction.
//!
//! # Features
//! - Atomic conversion of a cart into an [`Order`] with its line items in a
//!   single transaction, including the inventory decrement and cart reset.
//! - Status transitions checked against the policy adjacency map for both
//!   aggregate (admin/owner) and seller-scoped paths.
//! - Inventory restoration as a compensating action on cancellation.
//! - Dependency injection for testability and loose coupling.
//! - Well-typed error handling via [`ServiceError`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Pool, PoolError};
use model::{Address, Order, OrderItem, OrderStatus, Payment, Product, UserRole};
use policy::{TransitionAuthority, Viewer};
use repository::{
    CartItemsRepository, CartsRepository, InventoryAdjustment, OrderItemsRepository,
    OrdersRepository, PaymentsRepository, ProductsRepository, RepositoryError,
};
use serde::Deserialize;
use thiserror::Error;
use tokio_postgres::Transaction;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validation::ValidationError;

/// The main error type for all operations in [`OrderService`] and
/// [`OrderServiceImpl`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller is not authenticated.
    #[error("Authentication required")]
    Unauthenticated,
    /// The caller is authenticated but not allowed to perform the action.
    #[error("Forbidden")]
    Forbidden,
    /// The referenced record does not exist (or is not purchasable).
    #[error("Not found")]
    NotFound,
    /// The request violates a business rule.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    /// Tracked stock cannot cover the requested quantity.
    #[error("Insufficient inventory for product {0}")]
    InsufficientInventory(Uuid),
    /// The requested transition is not legal at the order's current stage.
    #[error("Order cannot be modified at this stage")]
    OrderNotModifiable,
    /// Order-number generation collided twice with existing orders.
    #[error("Order number already exists")]
    AlreadyExists,
    /// A repository (database) operation failed.
    #[error("Database error: {0}")]
    Db(RepositoryError),
    /// Failed to obtain a database connection from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
    /// Some unexpected or unhandled error.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ServiceError::NotFound,
            other => ServiceError::Db(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::EmptyCart | ValidationError::InvalidQuantity(_) => {
                ServiceError::ValidationFailed(e.to_string())
            }
            ValidationError::ProductNotFound(_) => ServiceError::NotFound,
            ValidationError::InsufficientInventory(id) => ServiceError::InsufficientInventory(id),
        }
    }
}

/// Input for creating an order from the caller's active cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedOrder {
    pub order_id: Uuid,
    pub order_number: String,
}

/// An order together with its line items and the read-only payment record.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
}

/// Trait describing business operations of the order lifecycle.
///
/// Service implementations are expected to guarantee atomicity and data
/// integrity: every multi-step use case runs inside one transaction, so a
/// failure anywhere leaves no partial effects.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Converts the caller's active cart into a durable order.
    ///
    /// # Errors
    /// [`ServiceError::NotFound`] when the caller has no cart (or a product
    /// is missing/not purchasable), [`ServiceError::ValidationFailed`] for an
    /// empty cart, [`ServiceError::InsufficientInventory`] when tracked stock
    /// cannot cover a line.
    async fn create_order(
        &self,
        viewer: &Viewer,
        tenant_id: Option<&str>,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, ServiceError>;

    /// Loads an order with items and payment, enforcing view access.
    async fn get_order(&self, viewer: &Viewer, order_id: Uuid)
        -> Result<OrderDetails, ServiceError>;

    /// Orders placed by the caller, newest first.
    async fn get_user_orders(
        &self,
        viewer: &Viewer,
        tenant_id: Option<&str>,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, ServiceError>;

    /// Orders containing at least one of the caller's items. Sellers only.
    async fn get_seller_orders(
        &self,
        viewer: &Viewer,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, ServiceError>;

    /// Applies a status transition, aggregate or seller-scoped depending on
    /// the caller's authority.
    async fn update_order_status(
        &self,
        viewer: &Viewer,
        order_id: Uuid,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<bool, ServiceError>;

    /// Cancels a pending/confirmed order and restores inventory.
    async fn cancel_order(
        &self,
        viewer: &Viewer,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<bool, ServiceError>;
}

/// Async implementation of [`OrderService`] using the repository pattern.
///
/// This struct wires together concrete repository implementations and a
/// Postgres connection pool to enable atomic, transactional operations on
/// the order lifecycle.
pub struct OrderServiceImpl<R1, R2, R3, R4, R5, R6> {
    db_pool: Pool,
    orders_repo: R1,
    order_items_repo: R2,
    carts_repo: R3,
    cart_items_repo: R4,
    products_repo: R5,
    payments_repo: R6,
}

/// Generates an externally addressable order number: UTC timestamp plus a
/// random 24-bit hex suffix. Uniqueness is still re-checked against the
/// store before insert.
fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = rand::random::<u32>() & 0x00FF_FFFF;
    format!("ORD-{}-{:06X}", now.format("%Y%m%d%H%M%S"), suffix)
}

/// Ledger entry for a sale, computed from the snapshot that validation has
/// already checked — never from a re-read.
fn sale_adjustment(product: &Product, quantity: i32) -> InventoryAdjustment {
    let quantity = i64::from(quantity);
    InventoryAdjustment {
        product_id: product.id,
        inventory: if product.track_inventory {
            Some(product.inventory.unwrap_or(0) - quantity)
        } else {
            None
        },
        sales_count: product.sales_count + quantity,
    }
}

/// Ledger entry reversing a sale. The snapshot here is a fresh read — a
/// compensating action works against current state, not the checkout-time
/// one. The sales counter is clamped at zero.
fn restock_adjustment(product: &Product, quantity: i32) -> InventoryAdjustment {
    let quantity = i64::from(quantity);
    InventoryAdjustment {
        product_id: product.id,
        inventory: if product.track_inventory {
            Some(product.inventory.unwrap_or(0) + quantity)
        } else {
            None
        },
        sales_count: (product.sales_count - quantity).max(0),
    }
}

/// Stamps the lifecycle timestamp belonging to `status`, at most once:
/// an already-set timestamp is never overwritten.
fn stamp_lifecycle(order: &mut Order, status: OrderStatus, now: DateTime<Utc>) {
    let slot = match status {
        OrderStatus::Confirmed => &mut order.paid_at,
        OrderStatus::Shipped => &mut order.shipped_at,
        OrderStatus::Delivered => &mut order.delivered_at,
        OrderStatus::Cancelled => &mut order.cancelled_at,
        OrderStatus::Refunded => &mut order.refunded_at,
        _ => return,
    };
    if slot.is_none() {
        *slot = Some(now);
    }
}

fn append_note(notes: &mut Option<String>, note: &str) {
    match notes {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(note);
        }
        None => *notes = Some(note.to_string()),
    }
}

impl<R1, R2, R3, R4, R5, R6> OrderServiceImpl<R1, R2, R3, R4, R5, R6>
where
    R1: OrdersRepository + Send + Sync,
    R2: OrderItemsRepository + Send + Sync,
    R3: CartsRepository + Send + Sync,
    R4: CartItemsRepository + Send + Sync,
    R5: ProductsRepository + Send + Sync,
    R6: PaymentsRepository + Send + Sync,
{
    /// Constructs a new [`OrderServiceImpl`] from the provided dependencies.
    ///
    /// This approach enables dependency injection and facilitates
    /// mocking/testing.
    pub fn new(
        db_pool: Pool,
        orders_repo: R1,
        order_items_repo: R2,
        carts_repo: R3,
        cart_items_repo: R4,
        products_repo: R5,
        payments_repo: R6,
    ) -> Self {
        Self {
            db_pool,
            orders_repo,
            order_items_repo,
            carts_repo,
            cart_items_repo,
            products_repo,
            payments_repo,
        }
    }

    /// Restores inventory for the given order items inside the transaction.
    ///
    /// Each product is re-read fresh; products whose rows have disappeared
    /// are skipped with a warning rather than failing the cancellation.
    async fn restore_inventory_tx(
        &self,
        tx: &Transaction<'_>,
        items: &[OrderItem],
    ) -> Result<(), ServiceError> {
        for item in items {
            match self.products_repo.get_by_id_tx(tx, item.product_id).await? {
                Some(product) => {
                    let adjustment = restock_adjustment(&product, item.quantity);
                    self.products_repo
                        .apply_adjustment_tx(tx, &adjustment)
                        .await?;
                }
                None => {
                    warn!(
                        product_id = %item.product_id,
                        "product missing during inventory restoration, skipping"
                    );
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R1, R2, R3, R4, R5, R6> OrderService for OrderServiceImpl<R1, R2, R3, R4, R5, R6>
where
    R1: OrdersRepository + Send + Sync,
    R2: OrderItemsRepository + Send + Sync,
    R3: CartsRepository + Send + Sync,
    R4: CartItemsRepository + Send + Sync,
    R5: ProductsRepository + Send + Sync,
    R6: PaymentsRepository + Send + Sync,
{
    /// Atomically converts the caller's cart into an order.
    ///
    /// Cart load, validation, totals, order + item inserts, the inventory
    /// decrement, and the cart reset all run in one transaction; a failure
    /// anywhere rolls everything back. The product snapshots read for
    /// validation are the same ones the ledger entries are computed from,
    /// which closes the stale-read oversell window.
    #[instrument(skip(self, request))]
    async fn create_order(
        &self,
        viewer: &Viewer,
        tenant_id: Option<&str>,
        request: CreateOrderRequest,
    ) -> Result<CreatedOrder, ServiceError> {
        let mut client = self.db_pool.get().await.map_err(ServiceError::from)?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let cart = self
            .carts_repo
            .get_active_tx(&tx, tenant_id, &viewer.user_id)
            .await?;
        let cart_items = self.cart_items_repo.get_by_cart_tx(&tx, cart.id).await?;
        if cart_items.is_empty() {
            return Err(ServiceError::ValidationFailed("cart has no items".into()));
        }

        // One read per product; the map feeds validation and the ledger.
        let mut products = HashMap::with_capacity(cart_items.len());
        for item in &cart_items {
            if let Some(product) = self.products_repo.get_by_id_tx(&tx, item.product_id).await? {
                products.insert(product.id, product);
            }
        }

        let lines = validation::validate_cart(&cart_items, &products)?;
        let totals = validation::calculate_order_totals(&lines);

        let now = Utc::now();
        let mut order_number = generate_order_number(now);
        if self
            .orders_repo
            .order_number_exists_tx(&tx, &order_number)
            .await?
        {
            order_number = generate_order_number(now);
            if self
                .orders_repo
                .order_number_exists_tx(&tx, &order_number)
                .await?
            {
                return Err(ServiceError::AlreadyExists);
            }
        }

        let order_id = Uuid::new_v4();
        let order = Order {
            id: order_id,
            order_number: order_number.clone(),
            tenant_id: tenant_id.map(str::to_string),
            user_id: viewer.user_id.clone(),
            status: OrderStatus::Pending,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            discount: totals.discount,
            total: totals.total,
            currency: cart.currency.clone(),
            shipping_address: request.shipping_address,
            billing_address: request.billing_address,
            notes: request.notes,
            tracking_number: None,
            created_at: now,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            refunded_at: None,
        };
        self.orders_repo.insert_tx(&tx, &order).await?;

        let items: Vec<OrderItem> = lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: line.product_id,
                seller_id: line.seller_id.clone(),
                name: line.name.clone(),
                sku: line.sku.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                subtotal: line.subtotal,
                status: OrderStatus::Pending,
            })
            .collect();
        self.order_items_repo.insert_tx(&tx, &items).await?;

        for line in &lines {
            let product = products.get(&line.product_id).ok_or_else(|| {
                ServiceError::Unexpected(format!("validated product {} missing", line.product_id))
            })?;
            let adjustment = sale_adjustment(product, line.quantity);
            self.products_repo
                .apply_adjustment_tx(&tx, &adjustment)
                .await?;
        }

        self.cart_items_repo.delete_by_cart_tx(&tx, cart.id).await?;
        self.carts_repo.reset_tx(&tx, cart.id).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        info!(%order_id, %order_number, "order created");
        Ok(CreatedOrder {
            order_id,
            order_number,
        })
    }

    /// Loads the order, its items, and the payment record, enforcing view
    /// access before returning anything.
    #[instrument(skip(self))]
    async fn get_order(
        &self,
        viewer: &Viewer,
        order_id: Uuid,
    ) -> Result<OrderDetails, ServiceError> {
        let order = self.orders_repo.get_by_id(order_id).await?;
        let items = self.order_items_repo.get_by_order_id(order_id).await?;
        if !policy::can_view_order(viewer, &order, &items) {
            return Err(ServiceError::Forbidden);
        }
        let payment = self.payments_repo.get_by_order_id(order_id).await?;
        Ok(OrderDetails {
            order,
            items,
            payment,
        })
    }

    #[instrument(skip(self))]
    async fn get_user_orders(
        &self,
        viewer: &Viewer,
        tenant_id: Option<&str>,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, ServiceError> {
        let limit = limit.clamp(1, 100);
        let orders = self
            .orders_repo
            .list_by_user(tenant_id, &viewer.user_id, status, limit)
            .await?;
        Ok(orders)
    }

    #[instrument(skip(self))]
    async fn get_seller_orders(
        &self,
        viewer: &Viewer,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, ServiceError> {
        if !matches!(viewer.role, UserRole::Seller | UserRole::Admin) {
            return Err(ServiceError::Forbidden);
        }
        let limit = limit.clamp(1, 100);
        let orders = self
            .orders_repo
            .list_by_seller(&viewer.user_id, status, limit)
            .await?;
        Ok(orders)
    }

    /// Applies a status transition.
    ///
    /// Aggregate authority (admin, or the owner's pending-cancel) updates the
    /// order, stamps the lifecycle timestamp once, cascades to every item,
    /// and restores inventory when the target is `cancelled`. Seller-scoped
    /// authority patches only that seller's items, checked against each
    /// item's own status mirror, and leaves the aggregate untouched.
    #[instrument(skip(self))]
    async fn update_order_status(
        &self,
        viewer: &Viewer,
        order_id: Uuid,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<bool, ServiceError> {
        let mut client = self.db_pool.get().await.map_err(ServiceError::from)?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let mut order = self.orders_repo.get_by_id_tx(&tx, order_id).await?;

        let authority = match policy::transition_authority(viewer, &order, status) {
            Some(authority) => authority,
            None if order.user_id == viewer.user_id => {
                // The owner may only cancel a pending order; anything else is
                // a stage problem, not an identity problem.
                return Err(ServiceError::OrderNotModifiable);
            }
            None => return Err(ServiceError::Forbidden),
        };

        match authority {
            TransitionAuthority::Aggregate => {
                if !policy::can_transition(order.status, status) {
                    return Err(ServiceError::OrderNotModifiable);
                }
                let now = Utc::now();
                order.status = status;
                stamp_lifecycle(&mut order, status, now);
                if let Some(tracking) = tracking_number {
                    order.tracking_number = Some(tracking);
                }
                self.orders_repo.update_lifecycle_tx(&tx, &order).await?;
                self.order_items_repo
                    .set_status_for_order_tx(&tx, order.id, status)
                    .await?;
                if status == OrderStatus::Cancelled {
                    let items = self.order_items_repo.get_by_order_id_tx(&tx, order.id).await?;
                    self.restore_inventory_tx(&tx, &items).await?;
                }
            }
            TransitionAuthority::SellerScoped { seller_id } => {
                let items = self.order_items_repo.get_by_order_id_tx(&tx, order.id).await?;
                let own: Vec<&OrderItem> = items
                    .iter()
                    .filter(|item| item.seller_id == seller_id)
                    .collect();
                if own.is_empty() {
                    return Err(ServiceError::Forbidden);
                }
                for item in &own {
                    if !policy::can_transition(item.status, status) {
                        return Err(ServiceError::OrderNotModifiable);
                    }
                }
                self.order_items_repo
                    .set_status_for_seller_tx(&tx, order.id, &seller_id, status)
                    .await?;
                if status == OrderStatus::Cancelled {
                    let own: Vec<OrderItem> = own.into_iter().cloned().collect();
                    self.restore_inventory_tx(&tx, &own).await?;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        info!(%order_id, status = %status, "order status updated");
        Ok(true)
    }

    /// Cancels the order: status, timestamp, items, and the compensating
    /// inventory restoration, all in one transaction.
    #[instrument(skip(self))]
    async fn cancel_order(
        &self,
        viewer: &Viewer,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<bool, ServiceError> {
        let mut client = self.db_pool.get().await.map_err(ServiceError::from)?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Begin transaction failed: {e}")))?;

        let mut order = self.orders_repo.get_by_id_tx(&tx, order_id).await?;
        if !policy::can_request_cancel(viewer, &order) {
            return Err(ServiceError::Forbidden);
        }
        if !policy::can_cancel(order.status) {
            return Err(ServiceError::OrderNotModifiable);
        }

        let now = Utc::now();
        order.status = OrderStatus::Cancelled;
        stamp_lifecycle(&mut order, OrderStatus::Cancelled, now);
        if let Some(reason) = reason {
            append_note(&mut order.notes, &format!("Cancelled: {reason}"));
        }
        self.orders_repo.update_lifecycle_tx(&tx, &order).await?;
        self.order_items_repo
            .set_status_for_order_tx(&tx, order.id, OrderStatus::Cancelled)
            .await?;

        let items = self.order_items_repo.get_by_order_id_tx(&tx, order.id).await?;
        self.restore_inventory_tx(&tx, &items).await?;

        tx.commit()
            .await
            .map_err(|e| ServiceError::Unexpected(format!("Commit failed: {e}")))?;

        info!(%order_id, "order cancelled");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ProductStatus;

    fn tracked_product(inventory: i64, sales_count: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            seller_id: "seller_1".to_string(),
            name: "Widget".to_string(),
            sku: "SKU-W".to_string(),
            price: 500,
            status: ProductStatus::Active,
            is_deleted: false,
            track_inventory: true,
            inventory: Some(inventory),
            sales_count,
        }
    }

    #[test]
    fn test_sale_adjustment_decrements_from_snapshot() {
        let product = tracked_product(10, 3);
        let adjustment = sale_adjustment(&product, 2);
        assert_eq!(adjustment.inventory, Some(8));
        assert_eq!(adjustment.sales_count, 5);
    }

    #[test]
    fn test_sale_adjustment_leaves_untracked_stock_alone() {
        let mut product = tracked_product(0, 0);
        product.track_inventory = false;
        product.inventory = None;
        let adjustment = sale_adjustment(&product, 4);
        assert_eq!(adjustment.inventory, None);
        assert_eq!(adjustment.sales_count, 4);
    }

    #[test]
    fn test_restock_reverses_sale_exactly() {
        let before = tracked_product(10, 3);
        let sold = sale_adjustment(&before, 2);

        // State as it would be after the sale committed.
        let mut after = before.clone();
        after.inventory = sold.inventory;
        after.sales_count = sold.sales_count;

        let restored = restock_adjustment(&after, 2);
        assert_eq!(restored.inventory, before.inventory);
        assert_eq!(restored.sales_count, before.sales_count);
    }

    #[test]
    fn test_restock_clamps_sales_count_at_zero() {
        let product = tracked_product(0, 1);
        let adjustment = restock_adjustment(&product, 5);
        assert_eq!(adjustment.inventory, Some(5));
        assert_eq!(adjustment.sales_count, 0);
    }

    #[test]
    fn test_order_number_shape() {
        let now = Utc::now();
        let number = generate_order_number(now);
        assert!(number.starts_with("ORD-"));
        // ORD- + 14 timestamp digits + '-' + 6 hex chars
        assert_eq!(number.len(), 4 + 14 + 1 + 6);
        let numbers: Vec<String> = (0..32).map(|_| generate_order_number(now)).collect();
        let unique: std::collections::HashSet<&String> = numbers.iter().collect();
        assert!(unique.len() > 1, "random suffix should vary");
    }

    #[test]
    fn test_stamp_lifecycle_sets_each_timestamp_once() {
        let now = Utc::now();
        let later = now + chrono::Duration::hours(1);
        let mut order = Order {
            id: Uuid::new_v4(),
            order_number: "ORD-TEST".to_string(),
            tenant_id: None,
            user_id: "alice".to_string(),
            status: OrderStatus::Shipped,
            subtotal: 1000,
            tax: 0,
            shipping: 0,
            discount: 0,
            total: 1000,
            currency: "USD".to_string(),
            shipping_address: Address {
                name: "Test".to_string(),
                line1: "Street 1".to_string(),
                line2: None,
                city: "City".to_string(),
                region: "Region".to_string(),
                postal_code: "0000".to_string(),
                country: "US".to_string(),
                phone: None,
            },
            billing_address: None,
            notes: None,
            tracking_number: None,
            created_at: now,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            refunded_at: None,
        };

        stamp_lifecycle(&mut order, OrderStatus::Shipped, now);
        assert_eq!(order.shipped_at, Some(now));

        stamp_lifecycle(&mut order, OrderStatus::Shipped, later);
        assert_eq!(order.shipped_at, Some(now), "timestamp must not move");

        // Transitions without a timestamp slot leave everything untouched.
        stamp_lifecycle(&mut order, OrderStatus::Processing, later);
        assert!(order.paid_at.is_none());
        assert!(order.delivered_at.is_none());
    }

    #[test]
    fn test_append_note() {
        let mut notes = None;
        append_note(&mut notes, "Cancelled: changed my mind");
        assert_eq!(notes.as_deref(), Some("Cancelled: changed my mind"));

        append_note(&mut notes, "second");
        assert_eq!(
            notes.as_deref(),
            Some("Cancelled: changed my mind\nsecond")
        );
    }
}

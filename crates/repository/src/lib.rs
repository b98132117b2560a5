//! # Data Repository Layer
//!
//! This module provides repository traits and PostgreSQL implementations
//! for all entities of the order lifecycle: carts, cart items, orders,
//! order items, products (stock counters), and payments.
//! Repositories hold no business logic; multi-step use cases run their
//! reads and writes through the `_tx` variants against a single
//! transaction so the service layer gets all-or-nothing semantics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{Cart, CartItem, Order, OrderItem, OrderStatus, Payment, Product};
use thiserror::Error;
use tokio_postgres::{Client, Row, Transaction};
use uuid::Uuid;

/// # RepositoryError
///
/// Error types that can occur during repository operations.
///
/// This enum represents the various error conditions that might arise
/// when interacting with the data storage layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database-related errors, wrapping the underlying PostgreSQL error
    #[error("Database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    /// No result found.
    #[error("Not found")]
    NotFound,
    /// A stored value could not be decoded into a domain type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// One entry of the inventory ledger: the absolute counter values a product
/// must take, computed by the caller from a snapshot it has already read.
///
/// Carrying absolutes rather than deltas forces every adjustment through a
/// snapshot the caller holds — there is no way to express "decrement by
/// whatever is there now" at this boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryAdjustment {
    pub product_id: Uuid,
    /// Target stock level; `None` leaves the column untouched (untracked).
    pub inventory: Option<i64>,
    /// Target sales counter, already clamped by the caller.
    pub sales_count: i64,
}

fn decode_status(value: &str) -> Result<OrderStatus, RepositoryError> {
    value
        .parse()
        .map_err(|e| RepositoryError::Corrupt(format!("{e}")))
}

fn order_from_row(row: &Row) -> Result<Order, RepositoryError> {
    let status: String = row.get("status");
    let shipping_address: serde_json::Value = row.get("shipping_address");
    let billing_address: Option<serde_json::Value> = row.get("billing_address");
    Ok(Order {
        id: row.get("id"),
        order_number: row.get("order_number"),
        tenant_id: row.get("tenant_id"),
        user_id: row.get("user_id"),
        status: decode_status(&status)?,
        subtotal: row.get("subtotal"),
        tax: row.get("tax"),
        shipping: row.get("shipping"),
        discount: row.get("discount"),
        total: row.get("total"),
        currency: row.get("currency"),
        shipping_address: serde_json::from_value(shipping_address)
            .map_err(|e| RepositoryError::Corrupt(format!("shipping_address: {e}")))?,
        billing_address: billing_address
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| RepositoryError::Corrupt(format!("billing_address: {e}")))?,
        notes: row.get("notes"),
        tracking_number: row.get("tracking_number"),
        created_at: row.get("created_at"),
        paid_at: row.get("paid_at"),
        shipped_at: row.get("shipped_at"),
        delivered_at: row.get("delivered_at"),
        cancelled_at: row.get("cancelled_at"),
        refunded_at: row.get("refunded_at"),
    })
}

fn order_item_from_row(row: &Row) -> Result<OrderItem, RepositoryError> {
    let status: String = row.get("status");
    Ok(OrderItem {
        id: row.get("id"),
        order_id: row.get("order_id"),
        product_id: row.get("product_id"),
        seller_id: row.get("seller_id"),
        name: row.get("name"),
        sku: row.get("sku"),
        unit_price: row.get("unit_price"),
        quantity: row.get("quantity"),
        subtotal: row.get("subtotal"),
        status: decode_status(&status)?,
    })
}

fn product_from_row(row: &Row) -> Result<Product, RepositoryError> {
    let status: String = row.get("status");
    Ok(Product {
        id: row.get("id"),
        seller_id: row.get("seller_id"),
        name: row.get("name"),
        sku: row.get("sku"),
        price: row.get("price"),
        status: status
            .parse()
            .map_err(|e| RepositoryError::Corrupt(format!("{e}")))?,
        is_deleted: row.get("is_deleted"),
        track_inventory: row.get("track_inventory"),
        inventory: row.get("inventory"),
        sales_count: row.get("sales_count"),
    })
}

/// # CartsRepository
///
/// Repository interface for the active cart of a (tenant, user) pair.
///
/// The order-creation use case reads the cart inside its transaction and
/// zeroes it there once the order exists, so no window remains in which
/// cart and order both claim the same items.
#[async_trait]
pub trait CartsRepository: Send + Sync {
    /// Get the active cart for a (tenant, user) pair inside a transaction.
    async fn get_active_tx(
        &self,
        tx: &Transaction<'_>,
        tenant_id: Option<&str>,
        user_id: &str,
    ) -> Result<Cart, RepositoryError>;

    /// Zero the cart's subtotal and item count inside a transaction.
    async fn reset_tx(&self, tx: &Transaction<'_>, cart_id: Uuid) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the CartsRepository trait.
pub struct PgCartsRepository;

impl PgCartsRepository {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PgCartsRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CartsRepository for PgCartsRepository {
    async fn get_active_tx(
        &self,
        tx: &Transaction<'_>,
        tenant_id: Option<&str>,
        user_id: &str,
    ) -> Result<Cart, RepositoryError> {
        let query = r#"
            SELECT id, tenant_id, user_id, currency, subtotal, item_count, expires_at
            FROM carts
            WHERE user_id = $1 AND tenant_id IS NOT DISTINCT FROM $2
        "#;
        let row = tx.query_opt(query, &[&user_id, &tenant_id]).await?;
        match row {
            Some(row) => Ok(Cart {
                id: row.get("id"),
                tenant_id: row.get("tenant_id"),
                user_id: row.get("user_id"),
                currency: row.get("currency"),
                subtotal: row.get("subtotal"),
                item_count: row.get("item_count"),
                expires_at: row.get("expires_at"),
            }),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn reset_tx(&self, tx: &Transaction<'_>, cart_id: Uuid) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE carts SET subtotal = 0, item_count = 0 WHERE id = $1
        "#;
        tx.execute(query, &[&cart_id]).await?;
        Ok(())
    }
}

/// # CartItemsRepository
///
/// Repository interface for the line items of a cart. Items are read for
/// validation and deleted wholesale when the cart turns into an order.
#[async_trait]
pub trait CartItemsRepository: Send + Sync {
    async fn get_by_cart_tx(
        &self,
        tx: &Transaction<'_>,
        cart_id: Uuid,
    ) -> Result<Vec<CartItem>, RepositoryError>;

    async fn delete_by_cart_tx(
        &self,
        tx: &Transaction<'_>,
        cart_id: Uuid,
    ) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the CartItemsRepository trait.
pub struct PgCartItemsRepository;

impl PgCartItemsRepository {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PgCartItemsRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CartItemsRepository for PgCartItemsRepository {
    async fn get_by_cart_tx(
        &self,
        tx: &Transaction<'_>,
        cart_id: Uuid,
    ) -> Result<Vec<CartItem>, RepositoryError> {
        let query = r#"
            SELECT id, cart_id, product_id, quantity, unit_price
            FROM cart_items WHERE cart_id = $1
        "#;
        let rows = tx.query(query, &[&cart_id]).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(CartItem {
                id: row.get("id"),
                cart_id: row.get("cart_id"),
                product_id: row.get("product_id"),
                quantity: row.get("quantity"),
                unit_price: row.get("unit_price"),
            });
        }
        Ok(items)
    }

    async fn delete_by_cart_tx(
        &self,
        tx: &Transaction<'_>,
        cart_id: Uuid,
    ) -> Result<(), RepositoryError> {
        tx.execute("DELETE FROM cart_items WHERE cart_id = $1", &[&cart_id])
            .await?;
        Ok(())
    }
}

/// # OrdersRepository
///
/// Repository interface for the durable order record.
///
/// Orders are inserted once at checkout and afterwards only patched: status,
/// lifecycle timestamps, tracking info, and notes. They are never deleted.
///
/// Implementations of this trait provide specific storage mechanisms,
/// such as PostgreSQL database access.
#[async_trait]
pub trait OrdersRepository: Send + Sync {
    /// Insert the order record in a transaction.
    async fn insert_tx(&self, tx: &Transaction<'_>, order: &Order) -> Result<(), RepositoryError>;

    /// Get an order by ID.
    async fn get_by_id(&self, order_id: Uuid) -> Result<Order, RepositoryError>;

    /// Get an order by ID in a transaction.
    async fn get_by_id_tx(
        &self,
        tx: &Transaction<'_>,
        order_id: Uuid,
    ) -> Result<Order, RepositoryError>;

    /// Whether an order number is already taken. Checked before insert so a
    /// generation collision surfaces as a typed error, not a constraint blow.
    async fn order_number_exists_tx(
        &self,
        tx: &Transaction<'_>,
        order_number: &str,
    ) -> Result<bool, RepositoryError>;

    /// Persist the order's mutable fields: status, lifecycle timestamps,
    /// notes, and tracking number.
    async fn update_lifecycle_tx(
        &self,
        tx: &Transaction<'_>,
        order: &Order,
    ) -> Result<(), RepositoryError>;

    /// Orders placed by a user, newest first, optionally filtered by status.
    async fn list_by_user(
        &self,
        tenant_id: Option<&str>,
        user_id: &str,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Orders containing at least one item of the seller, newest first.
    async fn list_by_seller(
        &self,
        seller_id: &str,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError>;
}

/// PostgreSQL implementation of the OrdersRepository trait.
///
/// This struct provides methods to store and retrieve orders using a
/// PostgreSQL database. Orders are the main aggregates of the lifecycle
/// engine.
pub struct PgOrdersRepository {
    /// PostgreSQL client for non-transactional reads
    db: Client,
}

impl PgOrdersRepository {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

const ORDER_COLUMNS: &str = r#"
    id, order_number, tenant_id, user_id, status,
    subtotal, tax, shipping, discount, total, currency,
    shipping_address, billing_address, notes, tracking_number,
    created_at, paid_at, shipped_at, delivered_at, cancelled_at, refunded_at
"#;

#[async_trait]
impl OrdersRepository for PgOrdersRepository {
    async fn insert_tx(&self, tx: &Transaction<'_>, order: &Order) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO orders (
                id, order_number, tenant_id, user_id, status,
                subtotal, tax, shipping, discount, total, currency,
                shipping_address, billing_address, notes, tracking_number, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
        "#;
        let shipping_address = serde_json::to_value(&order.shipping_address)
            .map_err(|e| RepositoryError::Corrupt(format!("shipping_address: {e}")))?;
        let billing_address = order
            .billing_address
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::Corrupt(format!("billing_address: {e}")))?;
        tx.execute(
            query,
            &[
                &order.id,
                &order.order_number,
                &order.tenant_id,
                &order.user_id,
                &order.status.as_str(),
                &order.subtotal,
                &order.tax,
                &order.shipping,
                &order.discount,
                &order.total,
                &order.currency,
                &shipping_address,
                &billing_address,
                &order.notes,
                &order.tracking_number,
                &order.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, order_id: Uuid) -> Result<Order, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = self.db.query_opt(&query, &[&order_id]).await?;
        match row {
            Some(row) => order_from_row(&row),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn get_by_id_tx(
        &self,
        tx: &Transaction<'_>,
        order_id: Uuid,
    ) -> Result<Order, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = tx.query_opt(&query, &[&order_id]).await?;
        match row {
            Some(row) => order_from_row(&row),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn order_number_exists_tx(
        &self,
        tx: &Transaction<'_>,
        order_number: &str,
    ) -> Result<bool, RepositoryError> {
        let row = tx
            .query_opt(
                "SELECT 1 FROM orders WHERE order_number = $1",
                &[&order_number],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn update_lifecycle_tx(
        &self,
        tx: &Transaction<'_>,
        order: &Order,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE orders SET
                status = $2, notes = $3, tracking_number = $4,
                paid_at = $5, shipped_at = $6, delivered_at = $7,
                cancelled_at = $8, refunded_at = $9
            WHERE id = $1
        "#;
        let updated = tx
            .execute(
                query,
                &[
                    &order.id,
                    &order.status.as_str(),
                    &order.notes,
                    &order.tracking_number,
                    &order.paid_at,
                    &order.shipped_at,
                    &order.delivered_at,
                    &order.cancelled_at,
                    &order.refunded_at,
                ],
            )
            .await?;
        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_by_user(
        &self,
        tenant_id: Option<&str>,
        user_id: &str,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE user_id = $1
              AND tenant_id IS NOT DISTINCT FROM $2
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4
        "#
        );
        let status = status.map(|s| s.as_str());
        let rows = self
            .db
            .query(&query, &[&user_id, &tenant_id, &status, &limit])
            .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn list_by_seller(
        &self,
        seller_id: &str,
        status: Option<OrderStatus>,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE id IN (SELECT order_id FROM order_items WHERE seller_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3
        "#
        );
        let status = status.map(|s| s.as_str());
        let rows = self
            .db
            .query(&query, &[&seller_id, &status, &limit])
            .await?;
        rows.iter().map(order_from_row).collect()
    }
}

/// # OrderItemsRepository
///
/// Repository interface for immutable order line-item snapshots.
///
/// Only the status mirror is ever patched after insert: either cascaded for
/// the whole order, or restricted to one seller's items.
#[async_trait]
pub trait OrderItemsRepository: Send + Sync {
    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        items: &[OrderItem],
    ) -> Result<(), RepositoryError>;

    async fn get_by_order_id(&self, order_id: Uuid) -> Result<Vec<OrderItem>, RepositoryError>;

    async fn get_by_order_id_tx(
        &self,
        tx: &Transaction<'_>,
        order_id: Uuid,
    ) -> Result<Vec<OrderItem>, RepositoryError>;

    /// Cascade a status to every item of the order. Returns rows touched.
    async fn set_status_for_order_tx(
        &self,
        tx: &Transaction<'_>,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<u64, RepositoryError>;

    /// Patch only the given seller's items on the order. Returns rows touched.
    async fn set_status_for_seller_tx(
        &self,
        tx: &Transaction<'_>,
        order_id: Uuid,
        seller_id: &str,
        status: OrderStatus,
    ) -> Result<u64, RepositoryError>;
}

/// PostgreSQL implementation of the OrderItemsRepository trait.
pub struct PgOrderItemsRepository {
    /// PostgreSQL client for non-transactional reads
    db: Client,
}

impl PgOrderItemsRepository {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderItemsRepository for PgOrderItemsRepository {
    async fn insert_tx(
        &self,
        tx: &Transaction<'_>,
        items: &[OrderItem],
    ) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO order_items (
                id, order_id, product_id, seller_id, name, sku,
                unit_price, quantity, subtotal, status
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        "#;
        for it in items {
            tx.execute(
                query,
                &[
                    &it.id,
                    &it.order_id,
                    &it.product_id,
                    &it.seller_id,
                    &it.name,
                    &it.sku,
                    &it.unit_price,
                    &it.quantity,
                    &it.subtotal,
                    &it.status.as_str(),
                ],
            )
            .await?;
        }
        Ok(())
    }

    async fn get_by_order_id(&self, order_id: Uuid) -> Result<Vec<OrderItem>, RepositoryError> {
        let query = r#"
            SELECT id, order_id, product_id, seller_id, name, sku,
                   unit_price, quantity, subtotal, status
            FROM order_items WHERE order_id = $1
        "#;
        let rows = self.db.query(query, &[&order_id]).await?;
        rows.iter().map(order_item_from_row).collect()
    }

    async fn get_by_order_id_tx(
        &self,
        tx: &Transaction<'_>,
        order_id: Uuid,
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let query = r#"
            SELECT id, order_id, product_id, seller_id, name, sku,
                   unit_price, quantity, subtotal, status
            FROM order_items WHERE order_id = $1
        "#;
        let rows = tx.query(query, &[&order_id]).await?;
        rows.iter().map(order_item_from_row).collect()
    }

    async fn set_status_for_order_tx(
        &self,
        tx: &Transaction<'_>,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<u64, RepositoryError> {
        let touched = tx
            .execute(
                "UPDATE order_items SET status = $2 WHERE order_id = $1",
                &[&order_id, &status.as_str()],
            )
            .await?;
        Ok(touched)
    }

    async fn set_status_for_seller_tx(
        &self,
        tx: &Transaction<'_>,
        order_id: Uuid,
        seller_id: &str,
        status: OrderStatus,
    ) -> Result<u64, RepositoryError> {
        let touched = tx
            .execute(
                "UPDATE order_items SET status = $3 WHERE order_id = $1 AND seller_id = $2",
                &[&order_id, &seller_id, &status.as_str()],
            )
            .await?;
        Ok(touched)
    }
}

/// # ProductsRepository
///
/// Narrow interface onto the catalog collaborator's product records: reads
/// for validation, and exactly one mutation entry point for the inventory
/// ledger. There is deliberately no other way to write stock counters.
#[async_trait]
pub trait ProductsRepository: Send + Sync {
    /// Fetch a product snapshot inside a transaction. `None` when absent —
    /// validation decides what absence means.
    async fn get_by_id_tx(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Apply one inventory-ledger entry. The single mutation entry point for
    /// `inventory` and `sales_count`.
    async fn apply_adjustment_tx(
        &self,
        tx: &Transaction<'_>,
        adjustment: &InventoryAdjustment,
    ) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of the ProductsRepository trait.
pub struct PgProductsRepository;

impl PgProductsRepository {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PgProductsRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductsRepository for PgProductsRepository {
    async fn get_by_id_tx(
        &self,
        tx: &Transaction<'_>,
        product_id: Uuid,
    ) -> Result<Option<Product>, RepositoryError> {
        let query = r#"
            SELECT id, seller_id, name, sku, price, status, is_deleted,
                   track_inventory, inventory, sales_count
            FROM products WHERE id = $1
        "#;
        let row = tx.query_opt(query, &[&product_id]).await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn apply_adjustment_tx(
        &self,
        tx: &Transaction<'_>,
        adjustment: &InventoryAdjustment,
    ) -> Result<(), RepositoryError> {
        let query = r#"
            UPDATE products
            SET sales_count = $2, inventory = COALESCE($3, inventory)
            WHERE id = $1
        "#;
        let touched = tx
            .execute(
                query,
                &[
                    &adjustment.product_id,
                    &adjustment.sales_count,
                    &adjustment.inventory,
                ],
            )
            .await?;
        if touched == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// # PaymentsRepository
///
/// Read-only interface onto the payment collaborator's records. This core
/// never initiates charges; it only folds payment status into order views.
#[async_trait]
pub trait PaymentsRepository: Send + Sync {
    async fn get_by_order_id(&self, order_id: Uuid) -> Result<Option<Payment>, RepositoryError>;
}

/// PostgreSQL implementation of the PaymentsRepository trait.
pub struct PgPaymentsRepository {
    /// PostgreSQL client for database operations
    db: Client,
}

impl PgPaymentsRepository {
    pub fn new(db: Client) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PaymentsRepository for PgPaymentsRepository {
    async fn get_by_order_id(&self, order_id: Uuid) -> Result<Option<Payment>, RepositoryError> {
        let query = r#"
            SELECT order_id, status, amount, currency, paid_at
            FROM payments WHERE order_id = $1
        "#;
        let row = self.db.query_opt(query, &[&order_id]).await?;
        Ok(row.map(|row| {
            let paid_at: Option<DateTime<Utc>> = row.get("paid_at");
            Payment {
                order_id: row.get("order_id"),
                status: row.get("status"),
                amount: row.get("amount"),
                currency: row.get("currency"),
                paid_at,
            }
        }))
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// OrderStatus — lifecycle state of an order (and the mirror on its items).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    PartiallyRefunded,
    Disputed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::PartiallyRefunded => "partially_refunded",
            OrderStatus::Disputed => "disputed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            "partially_refunded" => Ok(OrderStatus::PartiallyRefunded),
            "disputed" => Ok(OrderStatus::Disputed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Returned when a status string stored or supplied by a client is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for ParseStatusError {}

/// ProductStatus — publication state of a catalog product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    Active,
    Inactive,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Archived => "archived",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProductStatus::Draft),
            "active" => Ok(ProductStatus::Active),
            "inactive" => Ok(ProductStatus::Inactive),
            "archived" => Ok(ProductStatus::Archived),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// UserRole — marketplace role resolved from the user-profile collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Seller,
    Admin,
    Moderator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Seller => "seller",
            UserRole::Admin => "admin",
            UserRole::Moderator => "moderator",
        }
    }
}

impl FromStr for UserRole {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(UserRole::Customer),
            "seller" => Ok(UserRole::Seller),
            "admin" => Ok(UserRole::Admin),
            "moderator" => Ok(UserRole::Moderator),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Address — shipping or billing address attached to an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Cart — the single active cart of a (tenant, user) pair.
///
/// Mutable until checkout; emptied and zeroed atomically when an order is
/// created from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub user_id: String,
    pub currency: String,
    /// Running subtotal in integer minor-currency units.
    pub subtotal: i64,
    pub item_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// CartItem — a product + quantity entry with the price snapshotted at
/// add-time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

/// Product — the catalog record, owned by the catalog collaborator.
///
/// This core reads it for validation and patches only `inventory` and
/// `sales_count`. When `track_inventory` is set, `inventory` is present and
/// must never go negative; `sales_count` is clamped at zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub seller_id: String,
    pub name: String,
    pub sku: String,
    pub price: i64,
    pub status: ProductStatus,
    pub is_deleted: bool,
    pub track_inventory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<i64>,
    pub sales_count: i64,
}

impl Product {
    /// A product is purchasable only when it is active and not soft-deleted.
    pub fn is_purchasable(&self) -> bool {
        !self.is_deleted && self.status == ProductStatus::Active
    }
}

/// Order — the durable record of a completed checkout.
///
/// Created once, atomically, from a non-empty cart. Afterwards only status,
/// lifecycle timestamps, tracking info, and notes are mutated. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub user_id: String,
    pub status: OrderStatus,
    pub subtotal: i64,
    pub tax: i64,
    pub shipping: i64,
    pub discount: i64,
    /// Always `subtotal + tax + shipping - discount`.
    pub total: i64,
    pub currency: String,
    pub shipping_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<DateTime<Utc>>,
}

/// OrderItem — immutable line-item snapshot owned by exactly one order.
///
/// Name, SKU, and unit price are frozen at purchase time and never re-derived
/// from the live product record. Its status mirrors the order's except when a
/// seller patches only their own items on a multi-seller order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub seller_id: String,
    pub name: String,
    pub sku: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub subtotal: i64,
    pub status: OrderStatus,
}

/// Payment — the payment-provider record linked 1:1 to an order.
///
/// Read-only from this core; charges are initiated by the payment
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub order_id: Uuid,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_deserialize_order_from_json() {
        let json = r#"
        {
           "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
           "orderNumber": "ORD-20250612143015-A41C9F",
           "tenantId": "acme-market",
           "userId": "user_123",
           "status": "pending",
           "subtotal": 1000,
           "tax": 0,
           "shipping": 0,
           "discount": 0,
           "total": 1000,
           "currency": "USD",
           "shippingAddress": {
              "name": "Test Testov",
              "line1": "Ploshad Mira 15",
              "city": "Kiryat Mozkin",
              "region": "Kraiot",
              "postalCode": "2639809",
              "country": "IL",
              "phone": "+9720000000"
           },
           "createdAt": "2025-06-12T14:30:15Z"
        }
        "#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_number, "ORD-20250612143015-A41C9F");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, 1000);
        assert!(order.billing_address.is_none());
        assert!(order.cancelled_at.is_none());

        let expected = Utc.with_ymd_and_hms(2025, 6, 12, 14, 30, 15).unwrap();
        assert_eq!(order.created_at, expected);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
            OrderStatus::PartiallyRefunded,
            OrderStatus::Disputed,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped_maybe".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_serde_uses_snake_case() {
        let json = serde_json::to_string(&OrderStatus::PartiallyRefunded).unwrap();
        assert_eq!(json, "\"partially_refunded\"");
        let back: OrderStatus = serde_json::from_str("\"disputed\"").unwrap();
        assert_eq!(back, OrderStatus::Disputed);
    }

    #[test]
    fn test_product_purchasable() {
        let mut product = Product {
            id: Uuid::new_v4(),
            seller_id: "seller_1".to_string(),
            name: "Mascaras".to_string(),
            sku: "SKU-001".to_string(),
            price: 453,
            status: ProductStatus::Active,
            is_deleted: false,
            track_inventory: true,
            inventory: Some(10),
            sales_count: 0,
        };
        assert!(product.is_purchasable());

        product.status = ProductStatus::Inactive;
        assert!(!product.is_purchasable());

        product.status = ProductStatus::Active;
        product.is_deleted = true;
        assert!(!product.is_purchasable());
    }
}

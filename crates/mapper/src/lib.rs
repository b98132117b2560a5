//! Pure response shaping: projects internal records into client-facing
//! views. No store access happens here; field semantics survive unchanged
//! even where the shape differs between the list and detail projections.

use chrono::{DateTime, Utc};
use model::{Address, Order, OrderItem, OrderStatus, Payment};
use serde::Serialize;
use uuid::Uuid;

/// Detail view of a line item.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub product_id: Uuid,
    pub seller_id: String,
    pub name: String,
    pub sku: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub subtotal: i64,
    pub status: OrderStatus,
}

/// Detail view of an order: nested items, payment status folded in
/// read-only.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    pub subtotal: i64,
    pub tax: i64,
    pub shipping: i64,
    pub discount: i64,
    pub total: i64,
    pub currency: String,
    pub shipping_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemView>,
}

/// Flattened list view of an order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub total: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Projects an order with its items and payment into the detail view.
pub fn order_view(order: &Order, items: &[OrderItem], payment: Option<&Payment>) -> OrderView {
    OrderView {
        id: order.id,
        order_number: order.order_number.clone(),
        status: order.status,
        payment_status: payment.map(|p| p.status.clone()),
        subtotal: order.subtotal,
        tax: order.tax,
        shipping: order.shipping,
        discount: order.discount,
        total: order.total,
        currency: order.currency.clone(),
        shipping_address: order.shipping_address.clone(),
        billing_address: order.billing_address.clone(),
        notes: order.notes.clone(),
        tracking_number: order.tracking_number.clone(),
        created_at: order.created_at,
        paid_at: order.paid_at,
        shipped_at: order.shipped_at,
        delivered_at: order.delivered_at,
        cancelled_at: order.cancelled_at,
        refunded_at: order.refunded_at,
        items: items.iter().map(order_item_view).collect(),
    }
}

/// Projects a single line item into its detail view.
pub fn order_item_view(item: &OrderItem) -> OrderItemView {
    OrderItemView {
        product_id: item.product_id,
        seller_id: item.seller_id.clone(),
        name: item.name.clone(),
        sku: item.sku.clone(),
        unit_price: item.unit_price,
        quantity: item.quantity,
        subtotal: item.subtotal,
        status: item.status,
    }
}

/// Projects an order into the flattened list view.
pub fn order_summary(order: &Order) -> OrderSummary {
    OrderSummary {
        id: order.id,
        order_number: order.order_number.clone(),
        status: order.status,
        total: order.total,
        currency: order.currency.clone(),
        created_at: order.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_order() -> Order {
        Order {
            id: Uuid::new_v4(),
            order_number: "ORD-20250612143015-A41C9F".to_string(),
            tenant_id: Some("acme-market".to_string()),
            user_id: "alice".to_string(),
            status: OrderStatus::Confirmed,
            subtotal: 1000,
            tax: 0,
            shipping: 0,
            discount: 0,
            total: 1000,
            currency: "USD".to_string(),
            shipping_address: Address {
                name: "Alice".to_string(),
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
            created_at: Utc::now(),
            paid_at: Some(Utc::now()),
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            refunded_at: None,
        }
    }

    fn sample_items(order_id: Uuid) -> Vec<OrderItem> {
        vec![
            OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: Uuid::new_v4(),
                seller_id: "seller_1".to_string(),
                name: "Widget".to_string(),
                sku: "SKU-W".to_string(),
                unit_price: 500,
                quantity: 2,
                subtotal: 1000,
                status: OrderStatus::Confirmed,
            },
        ]
    }

    #[test]
    fn test_detail_view_preserves_money_and_items() {
        let order = sample_order();
        let items = sample_items(order.id);
        let payment = Payment {
            order_id: order.id,
            status: "succeeded".to_string(),
            amount: 1000,
            currency: "USD".to_string(),
            paid_at: order.paid_at,
        };

        let view = order_view(&order, &items, Some(&payment));
        assert_eq!(view.total, order.total);
        assert_eq!(
            view.total,
            view.subtotal + view.tax + view.shipping - view.discount
        );
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].subtotal, items[0].subtotal);
        assert_eq!(view.payment_status.as_deref(), Some("succeeded"));

        let item_sum: i64 = view.items.iter().map(|i| i.subtotal).sum();
        assert_eq!(item_sum, view.subtotal);
    }

    #[test]
    fn test_detail_view_without_payment() {
        let order = sample_order();
        let view = order_view(&order, &[], None);
        assert!(view.payment_status.is_none());
        assert!(view.items.is_empty());
    }

    #[test]
    fn test_summary_flattens_without_changing_semantics() {
        let order = sample_order();
        let summary = order_summary(&order);
        assert_eq!(summary.id, order.id);
        assert_eq!(summary.order_number, order.order_number);
        assert_eq!(summary.status, order.status);
        assert_eq!(summary.total, order.total);
        assert_eq!(summary.currency, order.currency);
    }
}

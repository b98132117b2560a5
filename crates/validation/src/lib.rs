//! Pure cart validation and order-total arithmetic.
//!
//! Nothing in this crate reads or writes the store. The caller fetches every
//! referenced product exactly once inside its transaction and passes the
//! snapshots in; [`validate_cart`] requiring that pre-read map is what closes
//! the window between stock validation and the inventory decrement — the
//! write phase reuses the same snapshots instead of re-reading.

use std::collections::HashMap;

use model::{CartItem, Product};
use thiserror::Error;
use uuid::Uuid;

/// Business-rule violations detected while validating a cart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The cart exists but holds no items.
    #[error("cart has no items")]
    EmptyCart,
    /// The referenced product is missing, soft-deleted, or not active.
    #[error("product {0} is not available")]
    ProductNotFound(Uuid),
    /// A line item requests a non-positive quantity.
    #[error("invalid quantity for product {0}")]
    InvalidQuantity(Uuid),
    /// Tracked stock cannot cover the requested quantity.
    #[error("insufficient inventory for product {0}")]
    InsufficientInventory(Uuid),
}

/// A validated, priced line ready to become an order item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub seller_id: String,
    pub name: String,
    pub sku: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub subtotal: i64,
}

/// Monetary breakdown of an order. All amounts are integer minor-currency
/// units, so the arithmetic carries no rounding ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub tax: i64,
    pub shipping: i64,
    pub discount: i64,
    pub total: i64,
}

/// Validates cart items against the pre-read product snapshots.
///
/// For each item the product must exist in `products`, be active and not
/// deleted, and — when `track_inventory` is set — have stock covering the
/// requested quantity. Lines are priced from the product's price at purchase
/// time; the cart's add-time snapshot is only a display value.
///
/// # Errors
/// [`ValidationError::EmptyCart`] for a cart with zero items, otherwise the
/// first per-item violation encountered.
pub fn validate_cart(
    items: &[CartItem],
    products: &HashMap<Uuid, Product>,
) -> Result<Vec<OrderLine>, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = products
            .get(&item.product_id)
            .filter(|p| p.is_purchasable())
            .ok_or(ValidationError::ProductNotFound(item.product_id))?;

        if item.quantity <= 0 {
            return Err(ValidationError::InvalidQuantity(item.product_id));
        }

        if product.track_inventory {
            let stock = product.inventory.unwrap_or(0);
            if stock < i64::from(item.quantity) {
                return Err(ValidationError::InsufficientInventory(item.product_id));
            }
        }

        lines.push(OrderLine {
            product_id: product.id,
            seller_id: product.seller_id.clone(),
            name: product.name.clone(),
            sku: product.sku.clone(),
            unit_price: product.price,
            quantity: item.quantity,
            subtotal: product.price * i64::from(item.quantity),
        });
    }
    Ok(lines)
}

/// Computes the order's monetary breakdown from validated lines.
///
/// Tax, shipping, and discount are fixed at zero for now — an extension
/// point, not a bug.
pub fn calculate_order_totals(lines: &[OrderLine]) -> OrderTotals {
    let subtotal: i64 = lines.iter().map(|line| line.subtotal).sum();
    let tax = 0;
    let shipping = 0;
    let discount = 0;
    OrderTotals {
        subtotal,
        tax,
        shipping,
        discount,
        total: subtotal + tax + shipping - discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ProductStatus;

    fn sample_product(id: Uuid, price: i64, inventory: Option<i64>) -> Product {
        Product {
            id,
            seller_id: "seller_1".to_string(),
            name: "Sample".to_string(),
            sku: "SKU-1".to_string(),
            price,
            status: ProductStatus::Active,
            is_deleted: false,
            track_inventory: inventory.is_some(),
            inventory,
            sales_count: 0,
        }
    }

    fn sample_item(product_id: Uuid, quantity: i32) -> CartItem {
        CartItem {
            id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            product_id,
            quantity,
            unit_price: 450,
        }
    }

    #[test]
    fn test_empty_cart_rejected() {
        let products = HashMap::new();
        assert_eq!(
            validate_cart(&[], &products),
            Err(ValidationError::EmptyCart)
        );
    }

    #[test]
    fn test_missing_product_rejected() {
        let product_id = Uuid::new_v4();
        let products = HashMap::new();
        let items = vec![sample_item(product_id, 1)];
        assert_eq!(
            validate_cart(&items, &products),
            Err(ValidationError::ProductNotFound(product_id))
        );
    }

    #[test]
    fn test_deleted_or_inactive_product_rejected() {
        let product_id = Uuid::new_v4();
        let items = vec![sample_item(product_id, 1)];

        let mut deleted = sample_product(product_id, 500, None);
        deleted.is_deleted = true;
        let products = HashMap::from([(product_id, deleted)]);
        assert_eq!(
            validate_cart(&items, &products),
            Err(ValidationError::ProductNotFound(product_id))
        );

        let mut draft = sample_product(product_id, 500, None);
        draft.status = ProductStatus::Draft;
        let products = HashMap::from([(product_id, draft)]);
        assert_eq!(
            validate_cart(&items, &products),
            Err(ValidationError::ProductNotFound(product_id))
        );
    }

    #[test]
    fn test_insufficient_inventory_rejected() {
        let product_id = Uuid::new_v4();
        let products = HashMap::from([(product_id, sample_product(product_id, 500, Some(1)))]);
        let items = vec![sample_item(product_id, 2)];
        assert_eq!(
            validate_cart(&items, &products),
            Err(ValidationError::InsufficientInventory(product_id))
        );
    }

    #[test]
    fn test_untracked_inventory_is_not_checked() {
        let product_id = Uuid::new_v4();
        let products = HashMap::from([(product_id, sample_product(product_id, 500, None))]);
        let items = vec![sample_item(product_id, 100)];
        let lines = validate_cart(&items, &products).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 100);
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let product_id = Uuid::new_v4();
        let products = HashMap::from([(product_id, sample_product(product_id, 500, Some(5)))]);
        let items = vec![sample_item(product_id, 0)];
        assert_eq!(
            validate_cart(&items, &products),
            Err(ValidationError::InvalidQuantity(product_id))
        );
    }

    #[test]
    fn test_lines_are_priced_from_product() {
        let product_id = Uuid::new_v4();
        let products = HashMap::from([(product_id, sample_product(product_id, 500, Some(10)))]);
        // Cart snapshot says 450, but purchase-time price is the product's.
        let items = vec![sample_item(product_id, 2)];
        let lines = validate_cart(&items, &products).unwrap();
        assert_eq!(lines[0].unit_price, 500);
        assert_eq!(lines[0].subtotal, 1000);
    }

    #[test]
    fn test_totals_for_two_units_at_500() {
        let lines = vec![OrderLine {
            product_id: Uuid::new_v4(),
            seller_id: "seller_1".to_string(),
            name: "A".to_string(),
            sku: "SKU-A".to_string(),
            unit_price: 500,
            quantity: 2,
            subtotal: 1000,
        }];
        let totals = calculate_order_totals(&lines);
        assert_eq!(totals.subtotal, 1000);
        assert_eq!(totals.tax, 0);
        assert_eq!(totals.shipping, 0);
        assert_eq!(totals.discount, 0);
        assert_eq!(totals.total, 1000);
    }

    #[test]
    fn test_total_reconciles_across_lines() {
        let mk = |price: i64, qty: i32| OrderLine {
            product_id: Uuid::new_v4(),
            seller_id: "seller_1".to_string(),
            name: "X".to_string(),
            sku: "SKU-X".to_string(),
            unit_price: price,
            quantity: qty,
            subtotal: price * i64::from(qty),
        };
        let lines = vec![mk(199, 3), mk(2500, 1), mk(75, 4)];
        let totals = calculate_order_totals(&lines);
        let expected: i64 = lines.iter().map(|line| line.subtotal).sum();
        assert_eq!(totals.subtotal, expected);
        assert_eq!(
            totals.total,
            totals.subtotal + totals.tax + totals.shipping - totals.discount
        );
    }
}

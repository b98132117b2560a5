//! Pure authorization and lifecycle policy for orders.
//!
//! This crate is the single source of truth for which status transitions are
//! legal, which statuses still admit cancellation, and who may view or
//! transition an order. Nothing here touches the store: callers resolve the
//! viewer's role once per request and pass it in.

use model::{Order, OrderItem, OrderStatus, UserRole};

/// Legal outgoing transitions for a status.
///
/// `cancelled` and `refunded` are terminal and have no outgoing edges. Every
/// transition path in the system must consult this map; role shortcuts are
/// layered on top of it, never instead of it.
pub fn next_states(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Pending => &[Confirmed, Processing, Cancelled],
        Confirmed => &[Processing, Shipped, Cancelled],
        Processing => &[Shipped, Cancelled],
        Shipped => &[Delivered, Cancelled],
        Delivered => &[Refunded, PartiallyRefunded, Disputed],
        PartiallyRefunded => &[Refunded, Disputed],
        Disputed => &[Refunded, Cancelled],
        Cancelled | Refunded => &[],
    }
}

/// True when `from -> to` is an edge in the transition map.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    next_states(from).contains(&to)
}

/// True only for statuses from which the order owner may still cancel.
pub fn can_cancel(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Pending | OrderStatus::Confirmed)
}

/// The authenticated caller, with the role resolved exactly once at the
/// entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub role: UserRole,
}

impl Viewer {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Who is allowed to apply a status transition, and how far it reaches.
///
/// An aggregate transition touches the whole order (status, lifecycle
/// timestamp, every item); a seller-scoped transition touches only that
/// seller's items and leaves the aggregate untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionAuthority {
    Aggregate,
    SellerScoped { seller_id: String },
}

/// Resolves how the viewer may transition this order, if at all.
///
/// - Admins get aggregate authority over any legal transition.
/// - The owner gets aggregate authority for `pending -> cancelled` only;
///   any other owner-attempted transition is rejected.
/// - A non-admin seller gets authority scoped to their own items.
/// - Everyone else gets nothing.
pub fn transition_authority(
    viewer: &Viewer,
    order: &Order,
    target: OrderStatus,
) -> Option<TransitionAuthority> {
    if viewer.is_admin() {
        return Some(TransitionAuthority::Aggregate);
    }
    if viewer.role == UserRole::Seller {
        return Some(TransitionAuthority::SellerScoped {
            seller_id: viewer.user_id.clone(),
        });
    }
    if order.user_id == viewer.user_id
        && order.status == OrderStatus::Pending
        && target == OrderStatus::Cancelled
    {
        return Some(TransitionAuthority::Aggregate);
    }
    None
}

/// True when the viewer owns at least one line item on the order.
pub fn owns_any_item(seller_id: &str, items: &[OrderItem]) -> bool {
    items.iter().any(|item| item.seller_id == seller_id)
}

/// View access: the order owner, an admin, or a seller with at least one
/// item on the order.
pub fn can_view_order(viewer: &Viewer, order: &Order, items: &[OrderItem]) -> bool {
    if order.user_id == viewer.user_id || viewer.is_admin() {
        return true;
    }
    viewer.role == UserRole::Seller && owns_any_item(&viewer.user_id, items)
}

/// Cancellation access: the order owner or an admin.
pub fn can_request_cancel(viewer: &Viewer, order: &Order) -> bool {
    order.user_id == viewer.user_id || viewer.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use model::{Address, Order, OrderItem, OrderStatus, UserRole};
    use uuid::Uuid;

    const ALL_STATUSES: [OrderStatus; 9] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
        OrderStatus::PartiallyRefunded,
        OrderStatus::Disputed,
    ];

    fn sample_order(user_id: &str, status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            order_number: "ORD-TEST".to_string(),
            tenant_id: None,
            user_id: user_id.to_string(),
            status,
            subtotal: 1000,
            tax: 0,
            shipping: 0,
            discount: 0,
            total: 1000,
            currency: "USD".to_string(),
            shipping_address: Address {
                name: "Test User".to_string(),
                line1: "Street 1".to_string(),
                line2: None,
                city: "Test City".to_string(),
                region: "Test Region".to_string(),
                postal_code: "0000".to_string(),
                country: "US".to_string(),
                phone: None,
            },
            billing_address: None,
            notes: None,
            tracking_number: None,
            created_at: Utc::now(),
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            refunded_at: None,
        }
    }

    fn sample_item(order_id: Uuid, seller_id: &str) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: Uuid::new_v4(),
            seller_id: seller_id.to_string(),
            name: "Item".to_string(),
            sku: "SKU".to_string(),
            unit_price: 500,
            quantity: 2,
            subtotal: 1000,
            status: OrderStatus::Pending,
        }
    }

    #[test]
    fn test_terminal_states_have_no_edges() {
        assert!(next_states(OrderStatus::Cancelled).is_empty());
        assert!(next_states(OrderStatus::Refunded).is_empty());
        for to in ALL_STATUSES {
            assert!(!can_transition(OrderStatus::Cancelled, to));
            assert!(!can_transition(OrderStatus::Refunded, to));
        }
    }

    #[test]
    fn test_every_legal_edge() {
        let legal = [
            (OrderStatus::Pending, OrderStatus::Confirmed),
            (OrderStatus::Pending, OrderStatus::Processing),
            (OrderStatus::Pending, OrderStatus::Cancelled),
            (OrderStatus::Confirmed, OrderStatus::Processing),
            (OrderStatus::Confirmed, OrderStatus::Shipped),
            (OrderStatus::Confirmed, OrderStatus::Cancelled),
            (OrderStatus::Processing, OrderStatus::Shipped),
            (OrderStatus::Processing, OrderStatus::Cancelled),
            (OrderStatus::Shipped, OrderStatus::Delivered),
            (OrderStatus::Shipped, OrderStatus::Cancelled),
            (OrderStatus::Delivered, OrderStatus::Refunded),
            (OrderStatus::Delivered, OrderStatus::PartiallyRefunded),
            (OrderStatus::Delivered, OrderStatus::Disputed),
            (OrderStatus::PartiallyRefunded, OrderStatus::Refunded),
            (OrderStatus::PartiallyRefunded, OrderStatus::Disputed),
            (OrderStatus::Disputed, OrderStatus::Refunded),
            (OrderStatus::Disputed, OrderStatus::Cancelled),
        ];
        for (from, to) in legal {
            assert!(can_transition(from, to), "{from} -> {to} should be legal");
        }
        // Exhaustive complement: every pair not listed above is illegal.
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    can_transition(from, to),
                    expected,
                    "unexpected legality for {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_can_cancel_only_pending_and_confirmed() {
        for status in ALL_STATUSES {
            let expected =
                matches!(status, OrderStatus::Pending | OrderStatus::Confirmed);
            assert_eq!(can_cancel(status), expected);
        }
    }

    #[test]
    fn test_view_access() {
        let order = sample_order("alice", OrderStatus::Pending);
        let items = vec![sample_item(order.id, "seller_1")];

        let owner = Viewer::new("alice", UserRole::Customer);
        let admin = Viewer::new("root", UserRole::Admin);
        let seller = Viewer::new("seller_1", UserRole::Seller);
        let other_seller = Viewer::new("seller_2", UserRole::Seller);
        let stranger = Viewer::new("bob", UserRole::Customer);

        assert!(can_view_order(&owner, &order, &items));
        assert!(can_view_order(&admin, &order, &items));
        assert!(can_view_order(&seller, &order, &items));
        assert!(!can_view_order(&other_seller, &order, &items));
        assert!(!can_view_order(&stranger, &order, &items));
    }

    #[test]
    fn test_owner_authority_is_cancel_only() {
        let order = sample_order("alice", OrderStatus::Pending);
        let owner = Viewer::new("alice", UserRole::Customer);

        assert_eq!(
            transition_authority(&owner, &order, OrderStatus::Cancelled),
            Some(TransitionAuthority::Aggregate)
        );
        assert_eq!(
            transition_authority(&owner, &order, OrderStatus::Shipped),
            None
        );

        // Owner may not cancel once the order has advanced past pending.
        let shipped = sample_order("alice", OrderStatus::Shipped);
        assert_eq!(
            transition_authority(&owner, &shipped, OrderStatus::Cancelled),
            None
        );
    }

    #[test]
    fn test_seller_authority_is_scoped() {
        let order = sample_order("alice", OrderStatus::Shipped);
        let seller = Viewer::new("seller_1", UserRole::Seller);

        assert_eq!(
            transition_authority(&seller, &order, OrderStatus::Delivered),
            Some(TransitionAuthority::SellerScoped {
                seller_id: "seller_1".to_string()
            })
        );
    }

    #[test]
    fn test_admin_authority_is_aggregate() {
        let order = sample_order("alice", OrderStatus::Processing);
        let admin = Viewer::new("root", UserRole::Admin);
        assert_eq!(
            transition_authority(&admin, &order, OrderStatus::Shipped),
            Some(TransitionAuthority::Aggregate)
        );
    }
}

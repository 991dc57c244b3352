//! Cross-type lifecycle tests for the domain model.

use chrono::{Duration, Utc};
use common::{AccountId, EventId, OrderId, TicketTypeId, UserId};
use domain::{Availability, Fulfillment, Money, Order, OrderError, OrderStatus, TicketType};

#[test]
fn late_payment_wins_over_session_expiry() {
    let now = Utc::now();
    let mut order = Order::new(
        OrderId::new(1),
        AccountId::new(1),
        Some(UserId::new(1)),
        now,
    );
    order.lock(2).unwrap();

    // the reaper sweeps the order out...
    order.timeout();
    assert_eq!(order.status, OrderStatus::Timeout);
    assert!(!order.status.holds_capacity());

    // ...and the payment provider confirms afterwards anyway
    order.purchase(now + Duration::minutes(12)).unwrap();
    assert_eq!(order.status, OrderStatus::Purchased);
    assert!(order.status.holds_capacity());
}

#[test]
fn anonymous_order_cannot_lock_until_checkout_binds_a_user() {
    let mut order = Order::new(OrderId::new(1), AccountId::new(1), None, Utc::now());
    assert_eq!(order.lock(1), Err(OrderError::NoUser));

    order.checkout(Some(UserId::new(42)), 1).unwrap();
    assert!(order.is_locked());
    assert_eq!(order.user_id, Some(UserId::new(42)));
}

#[test]
fn gifted_order_skips_availability_but_not_lock_rules() {
    let mut order = Order::new(OrderId::new(1), AccountId::new(1), None, Utc::now());
    order.meta.fulfillment = Fulfillment::Gifted;
    assert!(order.meta.fulfillment.skips_availability_check());

    // still cannot lock an empty order, gifted or not
    assert_eq!(order.checkout(Some(UserId::new(5)), 0), Err(OrderError::Empty));
}

#[test]
fn sell_out_and_restock_walks_the_full_state_machine() {
    let mut tt = TicketType::new(
        TicketTypeId::new(1),
        Some(EventId::new(1)),
        "General Admission",
        Money::from_cents(1800),
        10,
    );
    tt.publish();

    // 10 of 10 reserved, none paid: claim
    let next = tt.availability.next(0, 0, tt.units).unwrap();
    assert_eq!(next, Availability::Claimed);
    tt.availability = next;

    // all paid: sold
    let next = tt.availability.next(0, 10, tt.units).unwrap();
    assert_eq!(next, Availability::Sold);
    tt.availability = next;

    // a purchased order gets cancelled: restock re-opens sales
    let next = tt.availability.next(3, 7, tt.units).unwrap();
    assert_eq!(next, Availability::Available);
}

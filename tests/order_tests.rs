// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use sonabook::commands::invoices::{NewItem, PaymentReq};
use sonabook::commands::orders::{self, OrderDraft};
use sonabook::errors::SettleError;
use sonabook::models::{PaymentKind, PaymentMode, SplitParts};
use sonabook::pricing::LineItem;
use sonabook::utils::build_split;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    sonabook::db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO customers(name, phone) VALUES ('Asha', '9000000001')",
        [],
    )
    .unwrap();
    conn
}

fn pay(amount: &str, mode: PaymentMode) -> PaymentReq {
    PaymentReq {
        amount: d(amount),
        mode,
        parts: build_split(mode, d(amount), None, None, None).unwrap(),
    }
}

fn order_50k(advance: Option<PaymentReq>) -> OrderDraft {
    OrderDraft {
        customer_id: 1,
        items: vec![NewItem {
            product_id: None,
            description: "Bridal necklace".into(),
            line: LineItem::new(d("1000"), d("50")),
        }],
        expected: NaiveDate::from_ymd_opt(2025, 6, 20),
        advance,
        date: day(),
        performed_by: "test".into(),
    }
}

fn order_state(conn: &Connection, id: i64) -> (Decimal, Decimal, String, Option<i64>) {
    conn.query_row(
        "SELECT total_amount, paid_amount, status, invoice_id FROM orders WHERE id=?1",
        [id],
        |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<i64>>(3)?,
            ))
        },
    )
    .map(|(t, p, s, i)| (d(&t), d(&p), s, i))
    .unwrap()
}

#[test]
fn advance_then_delivery_generates_one_paid_invoice() {
    let mut conn = setup();
    let id = orders::create_order(&mut conn, order_50k(Some(pay("10000", PaymentMode::Cash))))
        .unwrap();

    let (total, paid, status, _) = order_state(&conn, id);
    assert_eq!(total, d("50000"));
    assert_eq!(paid, d("10000"));
    assert_eq!(status, "PARTIALLY_PAID");

    let invoice_id =
        orders::deliver_order(&mut conn, id, Some(pay("40000", PaymentMode::Upi)), day(), "test")
            .unwrap();

    let (_, paid, status, linked) = order_state(&conn, id);
    assert_eq!(paid, d("50000"));
    assert_eq!(status, "DELIVERED");
    assert_eq!(linked, Some(invoice_id));

    let (inv_total, inv_paid, inv_due, inv_status, inv_mode): (String, String, String, String, String) =
        conn.query_row(
            "SELECT total, paid_amount, due_amount, status, payment_mode FROM invoices WHERE id=?1",
            [invoice_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .unwrap();
    assert_eq!(d(&inv_total), d("50000"));
    assert_eq!(d(&inv_paid), d("50000"));
    assert_eq!(d(&inv_due), d("0"));
    assert_eq!(inv_status, "Paid");
    assert_eq!(inv_mode, "Split");

    // The advances already hit the ledger; delivery itself moves no cash.
    let advances: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM transactions WHERE category='ADVANCE'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    let total_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(advances, 2);
    assert_eq!(total_rows, 2);

    // Customer aggregate: fully settled purchase of 50000.
    let (due_s, purch_s): (String, String) = conn
        .query_row(
            "SELECT total_due, total_purchases FROM customers WHERE id=1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(d(&due_s), d("0"));
    assert_eq!(d(&purch_s), d("50000"));
}

#[test]
fn delivery_is_single_shot() {
    let mut conn = setup();
    let id = orders::create_order(&mut conn, order_50k(None)).unwrap();
    orders::deliver_order(&mut conn, id, Some(pay("50000", PaymentMode::Cash)), day(), "test")
        .unwrap();

    let err = orders::deliver_order(&mut conn, id, None, day(), "test").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Precondition(_))
    ));

    let invoices_n: i64 = conn
        .query_row("SELECT COUNT(*) FROM invoices", [], |r| r.get(0))
        .unwrap();
    assert_eq!(invoices_n, 1);
}

#[test]
fn delivery_stock_shortfall_rolls_everything_back() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO products(sku, name, weight, stock_qty) VALUES ('BNG1', 'Bangle', '10', 1)",
        [],
    )
    .unwrap();
    let mut line = LineItem::new(d("1000"), d("10"));
    line.quantity = 2;
    let id = orders::create_order(
        &mut conn,
        OrderDraft {
            customer_id: 1,
            items: vec![NewItem {
                product_id: Some(1),
                description: "Bangle".into(),
                line,
            }],
            expected: None,
            advance: None,
            date: day(),
            performed_by: "test".into(),
        },
    )
    .unwrap();

    let err = orders::deliver_order(&mut conn, id, Some(pay("20000", PaymentMode::Cash)), day(), "test")
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Precondition(_))
    ));

    // Rollback covers the final payment and the stock alike.
    let (_, paid, status, linked) = order_state(&conn, id);
    assert_eq!(paid, d("0"));
    assert_eq!(status, "PENDING");
    assert_eq!(linked, None);
    let stock: i64 = conn
        .query_row("SELECT stock_qty FROM products WHERE id=1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(stock, 1);
    let payments: i64 = conn
        .query_row("SELECT COUNT(*) FROM order_payments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(payments, 0);
}

#[test]
fn edit_item_recomputes_total_but_never_below_paid() {
    let mut conn = setup();
    let id = orders::create_order(&mut conn, order_50k(Some(pay("30000", PaymentMode::Cash))))
        .unwrap();

    // Shrinking below the collected 30000 is rejected outright.
    let err = orders::patch_order_item(
        &mut conn,
        id,
        1,
        None,
        Some(d("20")),
        None,
        None,
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Precondition(_))
    ));
    let (total, _, _, _) = order_state(&conn, id);
    assert_eq!(total, d("50000"));

    // A resize that still covers the paid amount goes through.
    let new_total = orders::patch_order_item(
        &mut conn,
        id,
        1,
        None,
        Some(d("40")),
        None,
        None,
        None,
        None,
    )
    .unwrap();
    assert_eq!(new_total, d("40000.00"));
    let (total, paid, status, _) = order_state(&conn, id);
    assert_eq!(total, d("40000.00"));
    assert_eq!(paid, d("30000"));
    assert_eq!(status, "PARTIALLY_PAID");
}

#[test]
fn terminal_orders_accept_no_payment() {
    let mut conn = setup();
    let id = orders::create_order(&mut conn, order_50k(None)).unwrap();
    orders::cancel_order(&mut conn, id).unwrap();

    let err = orders::apply_order_payment(
        &mut conn,
        id,
        d("1000"),
        PaymentMode::Cash,
        build_split(PaymentMode::Cash, d("1000"), None, None, None).unwrap(),
        PaymentKind::Partial,
        day(),
        "test",
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Precondition(_))
    ));
}

#[test]
fn order_payment_breakdown_must_sum_to_amount() {
    let mut conn = setup();
    let id = orders::create_order(&mut conn, order_50k(None)).unwrap();

    let err = orders::apply_order_payment(
        &mut conn,
        id,
        d("10000"),
        PaymentMode::Split,
        SplitParts {
            cash: d("6000"),
            upi: d("3000"),
            ..Default::default()
        },
        PaymentKind::Partial,
        day(),
        "test",
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Validation(_))
    ));

    let (_, paid, status, _) = order_state(&conn, id);
    assert_eq!(paid, d("0"));
    assert_eq!(status, "PENDING");
    let payments: i64 = conn
        .query_row("SELECT COUNT(*) FROM order_payments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(payments, 0);
}

#[test]
fn ready_status_is_sticky_across_payments() {
    let mut conn = setup();
    let id = orders::create_order(&mut conn, order_50k(Some(pay("10000", PaymentMode::Cash))))
        .unwrap();
    orders::mark_ready(&mut conn, id).unwrap();

    orders::apply_order_payment(
        &mut conn,
        id,
        d("5000"),
        PaymentMode::Upi,
        build_split(PaymentMode::Upi, d("5000"), None, None, None).unwrap(),
        PaymentKind::Partial,
        day(),
        "test",
    )
    .unwrap();

    let (_, paid, status, _) = order_state(&conn, id);
    assert_eq!(paid, d("15000"));
    assert_eq!(status, "READY");
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use sonabook::commands::invoices::{self, InvoiceDraft, NewItem, PaymentReq};
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

fn gold_item(weight: &str, rate: &str) -> NewItem {
    NewItem {
        product_id: None,
        description: "Gold chain".into(),
        line: LineItem::new(d(rate), d(weight)),
    }
}

fn draft(items: Vec<NewItem>, discount: &str, gst: &str, paid: Option<PaymentReq>) -> InvoiceDraft {
    InvoiceDraft {
        customer_id: 1,
        items,
        discount: d(discount),
        gst: d(gst),
        exchange: None,
        paid,
        date: day(),
        performed_by: "test".into(),
    }
}

fn invoice_state(conn: &Connection, id: i64) -> (Decimal, Decimal, Decimal, String) {
    conn.query_row(
        "SELECT total, paid_amount, due_amount, status FROM invoices WHERE id=?1",
        [id],
        |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        },
    )
    .map(|(t, p, due, s)| (d(&t), d(&p), d(&due), s))
    .unwrap()
}

fn customer_due(conn: &Connection) -> Decimal {
    d(&conn
        .query_row("SELECT total_due FROM customers WHERE id=1", [], |r| {
            r.get::<_, String>(0)
        })
        .unwrap())
}

#[test]
fn billing_with_partial_payment_then_settlement() {
    let mut conn = setup();
    let paid = PaymentReq {
        amount: d("4000"),
        mode: PaymentMode::Cash,
        parts: build_split(PaymentMode::Cash, d("4000"), None, None, None).unwrap(),
    };
    // 10g x 1000 = 10000, minus 500 discount plus 300 gst = 9800
    let id = invoices::create_invoice(
        &mut conn,
        draft(vec![gold_item("10", "1000")], "500", "300", Some(paid)),
    )
    .unwrap();

    let (total, paid_amt, due, status) = invoice_state(&conn, id);
    assert_eq!(total, d("9800"));
    assert_eq!(paid_amt, d("4000"));
    assert_eq!(due, d("5800"));
    assert_eq!(status, "Partial");
    assert_eq!(customer_due(&conn), d("5800"));

    invoices::apply_invoice_payment(
        &mut conn,
        id,
        d("5800"),
        PaymentMode::Upi,
        build_split(PaymentMode::Upi, d("5800"), None, None, None).unwrap(),
        PaymentKind::Customer,
        day(),
        "test",
    )
    .unwrap();

    let (_, paid_amt, due, status) = invoice_state(&conn, id);
    assert_eq!(paid_amt, d("9800"));
    assert_eq!(due, d("0"));
    assert_eq!(status, "Paid");
    assert_eq!(customer_due(&conn), d("0"));

    // One ledger row per payment, categorized by when the money arrived.
    let sales: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM transactions WHERE type='CREDIT' AND category='SALES'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    let settle: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM transactions WHERE type='CREDIT' AND category='CUSTOMER_PAYMENT'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!((sales, settle), (1, 1));
}

#[test]
fn overpayment_rejected_and_balances_untouched() {
    let mut conn = setup();
    let id = invoices::create_invoice(
        &mut conn,
        draft(vec![gold_item("10", "1000")], "0", "0", None),
    )
    .unwrap();

    let err = invoices::apply_invoice_payment(
        &mut conn,
        id,
        d("10001"),
        PaymentMode::Cash,
        SplitParts {
            cash: d("10001"),
            ..Default::default()
        },
        PaymentKind::Customer,
        day(),
        "test",
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Precondition(_))
    ));

    let (_, paid_amt, due, status) = invoice_state(&conn, id);
    assert_eq!(paid_amt, d("0"));
    assert_eq!(due, d("10000"));
    assert_eq!(status, "Pending");
    let payments: i64 = conn
        .query_row("SELECT COUNT(*) FROM invoice_payments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(payments, 0);
}

#[test]
fn split_parts_must_sum_exactly() {
    let err = build_split(
        PaymentMode::Split,
        d("100"),
        Some(d("40")),
        Some(d("30")),
        None,
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Validation(_))
    ));

    let parts = build_split(
        PaymentMode::Split,
        d("100"),
        Some(d("40")),
        Some(d("30")),
        Some(d("30")),
    )
    .unwrap();
    assert_eq!(parts.sum(), d("100"));
}

#[test]
fn mismatched_breakdown_is_rejected_before_persisting() {
    let mut conn = setup();
    let id = invoices::create_invoice(
        &mut conn,
        draft(vec![gold_item("10", "1000")], "0", "0", None),
    )
    .unwrap();

    // Parts that do not sum to the amount never reach the tables, even when
    // the caller skips the CLI parsing layer.
    let err = invoices::apply_invoice_payment(
        &mut conn,
        id,
        d("5000"),
        PaymentMode::Split,
        SplitParts {
            cash: d("400"),
            upi: d("500"),
            ..Default::default()
        },
        PaymentKind::Customer,
        day(),
        "test",
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Validation(_))
    ));

    // Money on a mode other than the declared one is just as invalid.
    let err = invoices::apply_invoice_payment(
        &mut conn,
        id,
        d("5000"),
        PaymentMode::Cash,
        SplitParts {
            upi: d("5000"),
            ..Default::default()
        },
        PaymentKind::Customer,
        day(),
        "test",
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Validation(_))
    ));

    let (_, paid_amt, due, _) = invoice_state(&conn, id);
    assert_eq!(paid_amt, d("0"));
    assert_eq!(due, d("10000"));
    let payments: i64 = conn
        .query_row("SELECT COUNT(*) FROM invoice_payments", [], |r| r.get(0))
        .unwrap();
    let txns: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!((payments, txns), (0, 0));
}

#[test]
fn invoice_snapshot_carries_all_three_rates() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO gold_rates(date, rate_24k, rate_22k, rate_18k)
         VALUES ('2025-06-01', '7000', '6500', '5200')",
        [],
    )
    .unwrap();
    let id = invoices::create_invoice(
        &mut conn,
        draft(vec![gold_item("10", "1000")], "0", "0", None),
    )
    .unwrap();

    let snap: String = conn
        .query_row(
            "SELECT rate_snapshot FROM invoices WHERE id=?1",
            [id],
            |r| r.get(0),
        )
        .unwrap();
    let v: serde_json::Value = serde_json::from_str(&snap).unwrap();
    assert_eq!(v["rate24K"], "7000");
    assert_eq!(v["rate22K"], "6500");
    assert_eq!(v["rate18K"], "5200");
}

#[test]
fn mixing_modes_marks_invoice_split() {
    let mut conn = setup();
    let id = invoices::create_invoice(
        &mut conn,
        draft(vec![gold_item("10", "1000")], "0", "0", None),
    )
    .unwrap();
    for (amount, mode) in [("4000", PaymentMode::Cash), ("6000", PaymentMode::Upi)] {
        invoices::apply_invoice_payment(
            &mut conn,
            id,
            d(amount),
            mode,
            build_split(mode, d(amount), None, None, None).unwrap(),
            PaymentKind::Customer,
            day(),
            "test",
        )
        .unwrap();
    }
    let mode: String = conn
        .query_row("SELECT payment_mode FROM invoices WHERE id=?1", [id], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(mode, "Split");
}

#[test]
fn cancel_releases_customer_dues() {
    let mut conn = setup();
    let id = invoices::create_invoice(
        &mut conn,
        draft(vec![gold_item("10", "1000")], "0", "0", None),
    )
    .unwrap();
    assert_eq!(customer_due(&conn), d("10000"));

    invoices::cancel_invoice(&mut conn, id).unwrap();
    assert_eq!(customer_due(&conn), d("0"));
    let (_, _, _, status) = invoice_state(&conn, id);
    assert_eq!(status, "Cancelled");

    // A cancelled invoice accepts no money.
    let err = invoices::apply_invoice_payment(
        &mut conn,
        id,
        d("100"),
        PaymentMode::Cash,
        SplitParts {
            cash: d("100"),
            ..Default::default()
        },
        PaymentKind::Customer,
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
fn stock_decrement_is_all_or_nothing() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO products(sku, name, weight, stock_qty) VALUES ('RING1', 'Ring', '5', 2)",
        [],
    )
    .unwrap();
    let mut line = LineItem::new(d("1000"), d("5"));
    line.quantity = 3;
    let err = invoices::create_invoice(
        &mut conn,
        draft(
            vec![NewItem {
                product_id: Some(1),
                description: "Ring".into(),
                line,
            }],
            "0",
            "0",
            None,
        ),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Precondition(_))
    ));

    let stock: i64 = conn
        .query_row("SELECT stock_qty FROM products WHERE id=1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(stock, 2);
    let invoices_n: i64 = conn
        .query_row("SELECT COUNT(*) FROM invoices", [], |r| r.get(0))
        .unwrap();
    assert_eq!(invoices_n, 0);
}

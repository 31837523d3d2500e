// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use sonabook::cli;
use sonabook::commands::invoices::{self, ExchangeReq, InvoiceDraft, NewItem};
use sonabook::commands::oldgold;
use sonabook::errors::SettleError;
use sonabook::models::PaymentMode;
use sonabook::pricing::LineItem;

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

/// 10g at 5500 and full purity, worth 55000.
fn pending_record(conn: &Connection) -> i64 {
    conn.execute(
        "INSERT INTO old_gold(customer_id, category, weight, purity, rate, total_value)
         VALUES (1, 'Gold', '10', '100', '5500', '55000')",
        [],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn open_invoice(conn: &mut Connection, weight: &str) -> i64 {
    invoices::create_invoice(
        conn,
        InvoiceDraft {
            customer_id: 1,
            items: vec![NewItem {
                product_id: None,
                description: "Gold chain".into(),
                line: LineItem::new(d("1000"), d(weight)),
            }],
            discount: d("0"),
            gst: d("0"),
            exchange: None,
            paid: None,
            date: day(),
            performed_by: "test".into(),
        },
    )
    .unwrap()
}

#[test]
fn add_values_record_via_cli() {
    let mut conn = setup();
    let matches = cli::build_cli().get_matches_from([
        "sonabook", "oldgold", "add", "--customer", "9000000001", "--weight", "10", "--purity",
        "100", "--rate", "5500",
    ]);
    if let Some(("oldgold", sub)) = matches.subcommand() {
        oldgold::handle(&mut conn, sub).unwrap();
    } else {
        panic!("no oldgold subcommand");
    }
    let (value, status): (String, String) = conn
        .query_row(
            "SELECT total_value, status FROM old_gold WHERE id=1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(d(&value), d("55000"));
    assert_eq!(status, "Pending");
}

#[test]
fn adjustment_shrinks_invoice_and_forfeits_remainder() {
    let mut conn = setup();
    let record = pending_record(&conn);
    let invoice = open_invoice(&mut conn, "40"); // total 40000, all due

    oldgold::adjust_old_gold(&mut conn, record, invoice, d("30000"), day(), "test").unwrap();

    let (exchange, total, due, status): (String, String, String, String) = conn
        .query_row(
            "SELECT exchange_amount, total, due_amount, status FROM invoices WHERE id=?1",
            [invoice],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!(d(&exchange), d("30000"));
    assert_eq!(d(&total), d("10000"));
    assert_eq!(d(&due), d("10000"));
    // Nothing has been paid in cash, so the smaller invoice is still Pending.
    assert_eq!(status, "Pending");

    let (rec_status, adjusted): (String, String) = conn
        .query_row(
            "SELECT status, adjusted_amount FROM old_gold WHERE id=?1",
            [record],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(rec_status, "Adjusted");
    assert_eq!(d(&adjusted), d("30000"));

    // Netting is not cash: the ledger row is an ADJUST, not a CREDIT.
    let (typ, cat): (String, String) = conn
        .query_row(
            "SELECT type, category FROM transactions WHERE ref_model='old_gold' AND ref_id=?1",
            [record],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!((typ.as_str(), cat.as_str()), ("ADJUST", "OLD_GOLD"));

    // Customer aggregate shrank on both axes.
    let (cust_due, cust_purch): (String, String) = conn
        .query_row(
            "SELECT total_due, total_purchases FROM customers WHERE id=1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(d(&cust_due), d("10000"));
    assert_eq!(d(&cust_purch), d("10000"));
}

#[test]
fn adjustment_is_single_shot() {
    let mut conn = setup();
    let record = pending_record(&conn);
    let invoice = open_invoice(&mut conn, "40");
    oldgold::adjust_old_gold(&mut conn, record, invoice, d("10000"), day(), "test").unwrap();

    // The 45000 remainder is forfeited, not re-usable.
    let err =
        oldgold::adjust_old_gold(&mut conn, record, invoice, d("5000"), day(), "test").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Precondition(_))
    ));
}

#[test]
fn adjustment_cannot_exceed_credit_or_due() {
    let mut conn = setup();
    let record = pending_record(&conn);
    let invoice = open_invoice(&mut conn, "40");

    let err = oldgold::adjust_old_gold(&mut conn, record, invoice, d("60000"), day(), "test")
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Precondition(_))
    ));

    let err = oldgold::adjust_old_gold(&mut conn, record, invoice, d("45000"), day(), "test")
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Precondition(_))
    ));

    // Both rejections left the record pending.
    let status: String = conn
        .query_row("SELECT status FROM old_gold WHERE id=?1", [record], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(status, "Pending");
}

#[test]
fn exchange_at_billing_nets_into_the_total() {
    let mut conn = setup();
    let record = pending_record(&conn);
    let invoice = invoices::create_invoice(
        &mut conn,
        InvoiceDraft {
            customer_id: 1,
            items: vec![NewItem {
                product_id: None,
                description: "Gold chain".into(),
                line: LineItem::new(d("1000"), d("10")),
            }],
            discount: d("0"),
            gst: d("0"),
            exchange: Some(ExchangeReq {
                record_id: record,
                amount: Some(d("4000")),
            }),
            paid: None,
            date: day(),
            performed_by: "test".into(),
        },
    )
    .unwrap();

    let (total, due): (String, String) = conn
        .query_row(
            "SELECT total, due_amount FROM invoices WHERE id=?1",
            [invoice],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(d(&total), d("6000"));
    assert_eq!(d(&due), d("6000"));

    let status: String = conn
        .query_row("SELECT status FROM old_gold WHERE id=?1", [record], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(status, "Adjusted");
}

#[test]
fn payout_moves_cash_out_once() {
    let mut conn = setup();
    let record = pending_record(&conn);

    let value = oldgold::payout_old_gold(&mut conn, record, PaymentMode::Cash, day(), "test")
        .unwrap();
    assert_eq!(value, d("55000"));

    let (typ, cat, amount): (String, String, String) = conn
        .query_row(
            "SELECT type, category, amount FROM transactions WHERE ref_model='old_gold' AND ref_id=?1",
            [record],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!((typ.as_str(), cat.as_str()), ("DEBIT", "OLD_GOLD"));
    assert_eq!(d(&amount), d("55000"));

    let err = oldgold::payout_old_gold(&mut conn, record, PaymentMode::Cash, day(), "test")
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SettleError>(),
        Some(SettleError::Precondition(_))
    ));
}

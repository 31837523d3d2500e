// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use sonabook::cli;
use sonabook::commands::invoices::{self, InvoiceDraft, NewItem, PaymentReq};
use sonabook::commands::{doctor, ledger, oldgold, reports, spend};
use sonabook::models::PaymentMode;
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

/// A sale paid in full, a shop expense, and an old-gold netting. Only the
/// first two are cash.
fn seed_activity(conn: &mut Connection) {
    let paid = PaymentReq {
        amount: d("9800"),
        mode: PaymentMode::Cash,
        parts: build_split(PaymentMode::Cash, d("9800"), None, None, None).unwrap(),
    };
    invoices::create_invoice(
        conn,
        InvoiceDraft {
            customer_id: 1,
            items: vec![NewItem {
                product_id: None,
                description: "Gold chain".into(),
                line: LineItem::new(d("1000"), d("10")),
            }],
            discount: d("500"),
            gst: d("300"),
            exchange: None,
            paid: Some(paid),
            date: day(),
            performed_by: "test".into(),
        },
    )
    .unwrap();

    spend::record_expense(conn, "Polishing supplies", d("500"), PaymentMode::Cash, day())
        .unwrap();

    conn.execute(
        "INSERT INTO old_gold(customer_id, category, weight, purity, rate, total_value)
         VALUES (1, 'Gold', '2', '100', '5000', '10000')",
        [],
    )
    .unwrap();
    let record = conn.last_insert_rowid();
    let invoice = invoices::create_invoice(
        conn,
        InvoiceDraft {
            customer_id: 1,
            items: vec![NewItem {
                product_id: None,
                description: "Ring".into(),
                line: LineItem::new(d("1000"), d("4")),
            }],
            discount: d("0"),
            gst: d("0"),
            exchange: None,
            paid: None,
            date: day(),
            performed_by: "test".into(),
        },
    )
    .unwrap();
    oldgold::adjust_old_gold(conn, record, invoice, d("3000"), day(), "test").unwrap();
}

/// Unpaid invoice for `weight` grams at 1000/g, billed on `day()`.
fn bill(conn: &mut Connection, customer_id: i64, weight: &str) -> i64 {
    invoices::create_invoice(
        conn,
        InvoiceDraft {
            customer_id,
            items: vec![NewItem {
                product_id: None,
                description: "Chain".into(),
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
fn cashbook_totals_and_adjust_exclusion() {
    let mut conn = setup();
    seed_activity(&mut conn);

    let book = ledger::project_cashbook(&conn, None, None).unwrap();
    assert_eq!(book.inflow_total, d("9800"));
    assert_eq!(book.outflow_total, d("500"));
    assert_eq!(book.net, d("9300"));
    // The netting is visible but never counted as cash.
    assert_eq!(book.adjustments, d("3000"));
    assert_eq!(book.inflows.get("SALES"), Some(&d("9800")));
    assert_eq!(book.outflows.get("EXPENSE"), Some(&d("500")));
    assert!(!book.inflows.contains_key("OLD_GOLD"));
}

#[test]
fn cashbook_date_range_filters() {
    let mut conn = setup();
    seed_activity(&mut conn);
    spend::record_expense(
        &mut conn,
        "Rent",
        d("2000"),
        PaymentMode::Cash,
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
    )
    .unwrap();

    let june = ledger::project_cashbook(
        &conn,
        NaiveDate::from_ymd_opt(2025, 6, 1),
        NaiveDate::from_ymd_opt(2025, 6, 30),
    )
    .unwrap();
    assert_eq!(june.outflow_total, d("500"));

    let all = ledger::project_cashbook(&conn, None, None).unwrap();
    assert_eq!(all.outflow_total, d("2500"));
}

#[test]
fn backfill_restores_missing_rows_then_goes_quiet() {
    let mut conn = setup();
    seed_activity(&mut conn);
    let before = ledger::project_cashbook(&conn, None, None).unwrap();

    conn.execute("DELETE FROM transactions", []).unwrap();
    let created = ledger::backfill(&mut conn).unwrap();
    assert!(created >= 3);

    let after = ledger::project_cashbook(&conn, None, None).unwrap();
    assert_eq!(after.inflow_total, before.inflow_total);
    assert_eq!(after.outflow_total, before.outflow_total);
    assert_eq!(after.adjustments, before.adjustments);

    // Re-running finds nothing to do.
    assert_eq!(ledger::backfill(&mut conn).unwrap(), 0);
}

#[test]
fn backfill_dates_old_gold_rows_at_settlement() {
    let mut conn = setup();
    // Both records taken in during May; settled on the June billing day.
    for _ in 0..2 {
        conn.execute(
            "INSERT INTO old_gold(customer_id, category, weight, purity, rate, total_value, created_at)
             VALUES (1, 'Gold', '2', '100', '5000', '10000', '2025-05-01 00:00:00')",
            [],
        )
        .unwrap();
    }
    let invoice = bill(&mut conn, 1, "4");
    oldgold::adjust_old_gold(&mut conn, 1, invoice, d("3000"), day(), "test").unwrap();
    oldgold::payout_old_gold(&mut conn, 2, PaymentMode::Cash, day(), "test").unwrap();

    conn.execute("DELETE FROM transactions", []).unwrap();
    ledger::backfill(&mut conn).unwrap();

    let adjust_date: String = conn
        .query_row(
            "SELECT date FROM transactions WHERE ref_model='old_gold' AND ref_id=1",
            [],
            |r| r.get(0),
        )
        .unwrap();
    let payout_date: String = conn
        .query_row(
            "SELECT date FROM transactions WHERE ref_model='old_gold' AND ref_id=2",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(adjust_date, "2025-06-01");
    assert_eq!(payout_date, "2025-06-01");
}

#[test]
fn export_writes_every_ledger_row_as_csv() {
    let mut conn = setup();
    seed_activity(&mut conn);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("ledger.csv");

    let matches = cli::build_cli().get_matches_from([
        "sonabook",
        "ledger",
        "export",
        "--format",
        "csv",
        "--out",
        out.to_str().unwrap(),
    ]);
    if let Some(("ledger", sub)) = matches.subcommand() {
        ledger::handle(&mut conn, sub).unwrap();
    } else {
        panic!("no ledger subcommand");
    }

    let body = std::fs::read_to_string(&out).unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    // Header line plus one line per ledger row.
    assert_eq!(body.lines().count() as i64, rows + 1);
    assert!(body.lines().next().unwrap().starts_with("date,type,category"));
}

#[test]
fn aging_buckets_open_dues_by_invoice_age() {
    let mut conn = setup();
    seed_activity(&mut conn);
    // Pin the clock 44 days past the billing date.
    conn.execute(
        "INSERT INTO settings(key, value) VALUES ('today_override', '2025-07-15')",
        [],
    )
    .unwrap();

    let buckets = reports::compute_aging(&conn).unwrap();
    assert_eq!(buckets.len(), 1);
    // Only the adjusted ring invoice still owes: 4000 - 3000.
    assert_eq!(buckets[0].d31_60, d("1000"));
    assert_eq!(buckets[0].total, d("1000"));
    assert_eq!(buckets[0].current, d("0"));

    let dash = reports::compute_dashboard(&conn).unwrap();
    assert_eq!(dash.total_receivable, d("1000"));
    assert_eq!(dash.open_invoices, 1);
    // Collections happened in June, not in the pinned July window.
    assert_eq!(dash.month_sales, d("0"));
}

#[test]
fn aging_keeps_same_named_customers_apart() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO customers(name, phone) VALUES ('Asha', '9000000002')",
        [],
    )
    .unwrap();
    // Interleave the two customers' invoices by creation order.
    bill(&mut conn, 1, "3");
    bill(&mut conn, 2, "7");
    bill(&mut conn, 1, "2");
    conn.execute(
        "INSERT INTO settings(key, value) VALUES ('today_override', '2025-06-10')",
        [],
    )
    .unwrap();

    let buckets = reports::compute_aging(&conn).unwrap();
    assert_eq!(buckets.len(), 2);
    let first = buckets.iter().find(|b| b.phone == "9000000001").unwrap();
    let second = buckets.iter().find(|b| b.phone == "9000000002").unwrap();
    assert_eq!(first.total, d("5000"));
    assert_eq!(second.total, d("7000"));
}

#[test]
fn doctor_is_clean_after_normal_activity() {
    let mut conn = setup();
    seed_activity(&mut conn);
    let issues = doctor::audit(&conn).unwrap();
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

#[test]
fn doctor_flags_a_tampered_balance() {
    let mut conn = setup();
    seed_activity(&mut conn);
    conn.execute("UPDATE invoices SET due_amount='1' WHERE id=1", [])
        .unwrap();

    let issues = doctor::audit(&conn).unwrap();
    assert!(issues.iter().any(|i| i.check == "invoice_balance"));
    // The customer aggregate no longer matches the invoice log either.
    assert!(issues.iter().any(|i| i.check == "customer_aggregate"));
}

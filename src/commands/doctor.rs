// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Consistency audit. Reports, never repairs: every check recomputes from
//! the underlying documents and compares against the materialized values.

use crate::commands::customers;
use crate::utils::{dec_col, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Issue {
    pub check: &'static str,
    pub detail: String,
}

fn issue(out: &mut Vec<Issue>, check: &'static str, detail: String) {
    out.push(Issue { check, detail });
}

pub fn handle(conn: &Connection) -> Result<()> {
    let issues = audit(conn)?;
    if issues.is_empty() {
        println!("doctor: no issues found");
        return Ok(());
    }
    let rows = issues
        .iter()
        .map(|i| vec![i.check.to_string(), i.detail.clone()])
        .collect();
    println!("{}", pretty_table(&["Check", "Detail"], rows));
    println!("doctor: {} issue(s) found", issues.len());
    Ok(())
}

pub fn audit(conn: &Connection) -> Result<Vec<Issue>> {
    let mut out = Vec::new();
    check_customer_aggregates(conn, &mut out)?;
    check_invoice_identities(conn, &mut out)?;
    check_invoice_payment_sums(conn, &mut out)?;
    check_split_sums(conn, &mut out)?;
    check_order_payment_sums(conn, &mut out)?;
    check_delivered_orders(conn, &mut out)?;
    check_ledger_coverage(conn, &mut out)?;
    Ok(out)
}

/// Materialized `total_due`/`total_purchases` against a fresh recomputation
/// from the invoice log.
fn check_customer_aggregates(conn: &Connection, out: &mut Vec<Issue>) -> Result<()> {
    let mut stmt = conn.prepare("SELECT id, total_due, total_purchases FROM customers")?;
    let mut rows = stmt.query([])?;
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let due = dec_col(&r.get::<_, String>(1)?, "customers.total_due")?;
        let purchases = dec_col(&r.get::<_, String>(2)?, "customers.total_purchases")?;
        let (exp_due, exp_purch) = customers::recompute_customer_totals(conn, id)?;
        if due != exp_due || purchases != exp_purch {
            issue(
                out,
                "customer_aggregate",
                format!(
                    "customer {}: stored due {} / purchases {}, recomputed {} / {}",
                    id, due, purchases, exp_due, exp_purch
                ),
            );
        }
    }
    Ok(())
}

/// `paid + due == total` and `total == subtotal − discount − exchange + gst`
/// on every non-cancelled invoice.
fn check_invoice_identities(conn: &Connection, out: &mut Vec<Issue>) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT id, subtotal, discount, exchange_amount, gst, total, paid_amount, due_amount
         FROM invoices WHERE status!='Cancelled'",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let subtotal = dec_col(&r.get::<_, String>(1)?, "invoices.subtotal")?;
        let discount = dec_col(&r.get::<_, String>(2)?, "invoices.discount")?;
        let exchange = dec_col(&r.get::<_, String>(3)?, "invoices.exchange_amount")?;
        let gst = dec_col(&r.get::<_, String>(4)?, "invoices.gst")?;
        let total = dec_col(&r.get::<_, String>(5)?, "invoices.total")?;
        let paid = dec_col(&r.get::<_, String>(6)?, "invoices.paid_amount")?;
        let due = dec_col(&r.get::<_, String>(7)?, "invoices.due_amount")?;
        if paid + due != total {
            issue(
                out,
                "invoice_balance",
                format!("invoice {}: paid {} + due {} != total {}", id, paid, due, total),
            );
        }
        let expected = crate::pricing::invoice_total(subtotal, discount, exchange, gst);
        if total != expected {
            issue(
                out,
                "invoice_total",
                format!("invoice {}: total {} != computed {}", id, total, expected),
            );
        }
    }
    Ok(())
}

/// `paid_amount` equals the sum of payment rows. Invoices generated by an
/// order delivery carry the order's collections instead, so those sum the
/// source order's payment rows.
fn check_invoice_payment_sums(conn: &Connection, out: &mut Vec<Issue>) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.paid_amount,
                IFNULL((SELECT SUM(CAST(p.amount AS REAL)) FROM invoice_payments p
                        WHERE p.invoice_id=i.id), 0),
                o.id
         FROM invoices i LEFT JOIN orders o ON o.invoice_id=i.id
         WHERE i.status!='Cancelled'",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let paid = dec_col(&r.get::<_, String>(1)?, "invoices.paid_amount")?;
        let source_order: Option<i64> = r.get(3)?;
        // REAL summation is only a screen; recompute exactly in Decimal.
        let mut expected = sum_payments(conn, "invoice_payments", "invoice_id", id)?;
        if let Some(order_id) = source_order {
            expected += sum_payments(conn, "order_payments", "order_id", order_id)?;
        }
        if paid != expected {
            issue(
                out,
                "invoice_paid_sum",
                format!("invoice {}: paid {} != payment rows {}", id, paid, expected),
            );
        }
    }
    Ok(())
}

fn sum_payments(conn: &Connection, table: &str, col: &str, id: i64) -> Result<Decimal> {
    let mut stmt = conn.prepare(&format!("SELECT amount FROM {} WHERE {}=?1", table, col))?;
    let mut rows = stmt.query([id])?;
    let mut sum = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        sum += dec_col(&r.get::<_, String>(0)?, "payment amount")?;
    }
    Ok(sum)
}

/// cash + upi + card parts must sum to the payment amount on every row.
fn check_split_sums(conn: &Connection, out: &mut Vec<Issue>) -> Result<()> {
    for table in ["invoice_payments", "order_payments"] {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, amount, cash_part, upi_part, card_part FROM {}",
            table
        ))?;
        let mut rows = stmt.query([])?;
        while let Some(r) = rows.next()? {
            let id: i64 = r.get(0)?;
            let amount = dec_col(&r.get::<_, String>(1)?, "payment amount")?;
            let cash = dec_col(&r.get::<_, String>(2)?, "cash_part")?;
            let upi = dec_col(&r.get::<_, String>(3)?, "upi_part")?;
            let card = dec_col(&r.get::<_, String>(4)?, "card_part")?;
            if cash + upi + card != amount {
                issue(
                    out,
                    "split_sum",
                    format!(
                        "{} {}: parts {}+{}+{} != amount {}",
                        table, id, cash, upi, card, amount
                    ),
                );
            }
        }
    }
    Ok(())
}

fn check_order_payment_sums(conn: &Connection, out: &mut Vec<Issue>) -> Result<()> {
    let mut stmt =
        conn.prepare("SELECT id, paid_amount FROM orders WHERE status!='CANCELLED'")?;
    let mut rows = stmt.query([])?;
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let paid = dec_col(&r.get::<_, String>(1)?, "orders.paid_amount")?;
        let expected = sum_payments(conn, "order_payments", "order_id", id)?;
        if paid != expected {
            issue(
                out,
                "order_paid_sum",
                format!("order {}: paid {} != payment rows {}", id, paid, expected),
            );
        }
    }
    Ok(())
}

fn check_delivered_orders(conn: &Connection, out: &mut Vec<Issue>) -> Result<()> {
    let mut stmt =
        conn.prepare("SELECT id FROM orders WHERE status='DELIVERED' AND invoice_id IS NULL")?;
    let mut rows = stmt.query([])?;
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        issue(
            out,
            "delivered_without_invoice",
            format!("order {} is DELIVERED but has no invoice", id),
        );
    }
    Ok(())
}

/// Every money-moving document should have its ledger row. These are the
/// same joins the backfill would fill in.
fn check_ledger_coverage(conn: &Connection, out: &mut Vec<Issue>) -> Result<()> {
    let probes: [(&str, &str); 5] = [
        (
            "invoice_payment",
            "SELECT p.id FROM invoice_payments p
             WHERE NOT EXISTS (SELECT 1 FROM transactions t
                 WHERE t.ref_model='invoice_payment' AND t.ref_id=p.id)",
        ),
        (
            "order_payment",
            "SELECT p.id FROM order_payments p
             WHERE NOT EXISTS (SELECT 1 FROM transactions t
                 WHERE t.ref_model='order_payment' AND t.ref_id=p.id)",
        ),
        (
            "old_gold",
            "SELECT g.id FROM old_gold g WHERE g.status!='Pending'
             AND NOT EXISTS (SELECT 1 FROM transactions t
                 WHERE t.ref_model='old_gold' AND t.ref_id=g.id)",
        ),
        (
            "purchase",
            "SELECT p.id FROM purchases p
             WHERE NOT EXISTS (SELECT 1 FROM transactions t
                 WHERE t.ref_model='purchase' AND t.ref_id=p.id)",
        ),
        (
            "expense",
            "SELECT e.id FROM expenses e
             WHERE NOT EXISTS (SELECT 1 FROM transactions t
                 WHERE t.ref_model='expense' AND t.ref_id=e.id)",
        ),
    ];
    for (model, sql) in probes {
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        while let Some(r) = rows.next()? {
            let id: i64 = r.get(0)?;
            issue(
                out,
                "missing_ledger_row",
                format!("{} {} has no ledger entry (run ledger backfill)", model, id),
            );
        }
    }
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Read-only reporting: the dashboard summary and receivables aging.

use crate::utils::{dec_col, fmt_money, maybe_print_json, parse_date, pretty_table, today};
use anyhow::Result;
use chrono::Datelike;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("dashboard", sub)) => dashboard(conn, sub)?,
        Some(("aging", sub)) => aging(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
pub struct Dashboard {
    pub customers: i64,
    pub open_invoices: i64,
    pub open_orders: i64,
    pub today_sales: Decimal,
    pub month_sales: Decimal,
    pub total_receivable: Decimal,
    pub pending_old_gold: i64,
}

pub fn compute_dashboard(conn: &Connection) -> Result<Dashboard> {
    let as_of = today(conn)?;
    let customers: i64 =
        conn.query_row("SELECT COUNT(*) FROM customers", [], |r| r.get(0))?;
    let open_invoices: i64 = conn.query_row(
        "SELECT COUNT(*) FROM invoices WHERE status IN ('Pending','Partial')",
        [],
        |r| r.get(0),
    )?;
    let open_orders: i64 = conn.query_row(
        "SELECT COUNT(*) FROM orders WHERE status NOT IN ('DELIVERED','CANCELLED')",
        [],
        |r| r.get(0),
    )?;
    let pending_old_gold: i64 = conn.query_row(
        "SELECT COUNT(*) FROM old_gold WHERE status='Pending'",
        [],
        |r| r.get(0),
    )?;

    // Sales figures come from the ledger, the source of truth for cash-in.
    let month_start = format!("{:04}-{:02}-01", as_of.year(), as_of.month());
    let today_sales = sum_sales(conn, &as_of.to_string(), &as_of.to_string())?;
    let month_sales = sum_sales(conn, &month_start, &as_of.to_string())?;

    let mut total_receivable = Decimal::ZERO;
    let mut stmt = conn.prepare(
        "SELECT due_amount FROM invoices WHERE status IN ('Pending','Partial')",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(r) = rows.next()? {
        total_receivable += dec_col(&r.get::<_, String>(0)?, "invoices.due_amount")?;
    }

    Ok(Dashboard {
        customers,
        open_invoices,
        open_orders,
        today_sales,
        month_sales,
        total_receivable,
        pending_old_gold,
    })
}

fn sum_sales(conn: &Connection, from: &str, to: &str) -> Result<Decimal> {
    let mut stmt = conn.prepare(
        "SELECT amount FROM transactions
         WHERE type='CREDIT' AND category IN ('SALES','CUSTOMER_PAYMENT','ADVANCE')
           AND date>=?1 AND date<=?2",
    )?;
    let mut rows = stmt.query(params![from, to])?;
    let mut sum = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        sum += dec_col(&r.get::<_, String>(0)?, "transactions.amount")?;
    }
    Ok(sum)
}

fn dashboard(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let d = compute_dashboard(conn)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &d)? {
        return Ok(());
    }
    println!(
        "{}",
        pretty_table(
            &["Metric", "Value"],
            vec![
                vec!["Customers".into(), d.customers.to_string()],
                vec!["Open invoices".into(), d.open_invoices.to_string()],
                vec!["Open orders".into(), d.open_orders.to_string()],
                vec!["Today's collections".into(), fmt_money(&d.today_sales)],
                vec!["This month's collections".into(), fmt_money(&d.month_sales)],
                vec!["Receivable".into(), fmt_money(&d.total_receivable)],
                vec!["Pending old gold".into(), d.pending_old_gold.to_string()],
            ]
        )
    );
    Ok(())
}

#[derive(Serialize, Default)]
pub struct CustomerAging {
    pub customer: String,
    pub phone: String,
    pub current: Decimal,
    pub d31_60: Decimal,
    pub d61_90: Decimal,
    pub over_90: Decimal,
    pub total: Decimal,
}

/// Per-customer open dues bucketed by invoice age, measured from the
/// billing date. Customers with nothing outstanding are omitted.
pub fn compute_aging(conn: &Connection) -> Result<Vec<CustomerAging>> {
    let as_of = today(conn)?;
    let mut stmt = conn.prepare(
        "SELECT c.name, c.phone, i.due_amount, substr(i.created_at,1,10)
         FROM invoices i JOIN customers c ON i.customer_id=c.id
         WHERE i.status IN ('Pending','Partial')
         ORDER BY c.name, c.phone, i.id",
    )?;
    let mut rows = stmt.query([])?;
    let mut out: Vec<CustomerAging> = Vec::new();
    while let Some(r) = rows.next()? {
        let name: String = r.get(0)?;
        let phone: String = r.get(1)?;
        let due = dec_col(&r.get::<_, String>(2)?, "invoices.due_amount")?;
        if due <= Decimal::ZERO {
            continue;
        }
        let created = parse_date(&r.get::<_, String>(3)?)?;
        let days = (as_of - created).num_days();

        if out.last().map(|a| a.phone != phone).unwrap_or(true) {
            out.push(CustomerAging {
                customer: name,
                phone,
                ..Default::default()
            });
        }
        if let Some(entry) = out.last_mut() {
            if days <= 30 {
                entry.current += due;
            } else if days <= 60 {
                entry.d31_60 += due;
            } else if days <= 90 {
                entry.d61_90 += due;
            } else {
                entry.over_90 += due;
            }
            entry.total += due;
        }
    }
    Ok(out)
}

fn aging(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let buckets = compute_aging(conn)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &buckets)? {
        return Ok(());
    }
    let rows = buckets
        .iter()
        .map(|a| {
            vec![
                a.customer.clone(),
                a.phone.clone(),
                format!("{:.2}", a.current),
                format!("{:.2}", a.d31_60),
                format!("{:.2}", a.d61_90),
                format!("{:.2}", a.over_90),
                format!("{:.2}", a.total),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Customer", "Phone", "0-30", "31-60", "61-90", "90+", "Total"],
            rows
        )
    );
    Ok(())
}

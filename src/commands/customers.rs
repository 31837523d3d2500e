// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Customers and the arrears aggregate. `total_due`/`total_purchases` are
//! materialized views over the invoice log: every invoice mutation updates
//! them in the same transaction, and `recompute_customer_totals` is the
//! independent recomputation used for auditing.

use crate::commands::invoices;
use crate::errors::SettleError;
use crate::models::{PaymentKind, PaymentMode, SplitParts};
use crate::utils::{
    dec_col, fmt_money, id_for_customer, maybe_print_json, parse_decimal, pretty_table, today,
};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("clear-dues", sub)) => clear_dues(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let phone = sub.get_one::<String>("phone").unwrap();
    let email = sub.get_one::<String>("email");
    let address = sub.get_one::<String>("address");
    let credit_limit = sub
        .get_one::<String>("credit-limit")
        .map(|s| parse_decimal(s))
        .transpose()?
        .unwrap_or(Decimal::ZERO);
    conn.execute(
        "INSERT INTO customers(name, phone, email, address, credit_limit) VALUES (?1,?2,?3,?4,?5)",
        params![name, phone, email, address, credit_limit.to_string()],
    )?;
    println!("Added customer '{}' ({})", name, phone);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT name, phone, total_due, total_purchases, credit_limit FROM customers ORDER BY name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(vec![
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ])
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        println!(
            "{}",
            pretty_table(
                &["Name", "Phone", "Due", "Purchases", "Credit limit"],
                data
            )
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = id_for_customer(conn, sub.get_one::<String>("customer").unwrap())?;
    let (name, phone, due_s, purch_s): (String, String, String, String) = conn.query_row(
        "SELECT name, phone, total_due, total_purchases FROM customers WHERE id=?1",
        params![id],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )?;
    println!("{} ({}): due {}, lifetime purchases {}", name, phone, due_s, purch_s);
    let mut stmt = conn.prepare(
        "SELECT invoice_no, total, paid_amount, due_amount, status, created_at
         FROM invoices WHERE customer_id=?1 ORDER BY id DESC",
    )?;
    let rows = stmt.query_map(params![id], |r| {
        Ok(vec![
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
        ])
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    println!(
        "{}",
        pretty_table(&["No", "Total", "Paid", "Due", "Status", "Created"], data)
    );
    Ok(())
}

/// Shift the materialized aggregates. Guarded against the values read in
/// this transaction so concurrent settlement cannot apply on a stale sum.
pub(crate) fn bump_customer_totals(
    tx: &Connection,
    customer_id: i64,
    due_delta: Decimal,
    purchases_delta: Decimal,
) -> Result<()> {
    let (due_s, purch_s): (String, String) = tx
        .query_row(
            "SELECT total_due, total_purchases FROM customers WHERE id=?1",
            params![customer_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Customer {} not found", customer_id))?;
    let due = dec_col(&due_s, "customers.total_due")?;
    let purchases = dec_col(&purch_s, "customers.total_purchases")?;
    let changed = tx.execute(
        "UPDATE customers SET total_due=?1, total_purchases=?2
         WHERE id=?3 AND total_due=?4 AND total_purchases=?5",
        params![
            (due + due_delta).to_string(),
            (purchases + purchases_delta).to_string(),
            customer_id,
            due_s,
            purch_s
        ],
    )?;
    if changed == 0 {
        return Err(SettleError::Conflict(format!(
            "customer {} aggregate changed underneath this update; retry",
            customer_id
        ))
        .into());
    }
    Ok(())
}

/// Independent recomputation of (total_due, total_purchases) from the
/// invoice log. Never writes; `doctor` and tests compare it against the
/// materialized columns.
pub fn recompute_customer_totals(conn: &Connection, customer_id: i64) -> Result<(Decimal, Decimal)> {
    let mut stmt = conn.prepare(
        "SELECT due_amount, total FROM invoices WHERE customer_id=?1 AND status!='Cancelled'",
    )?;
    let mut rows = stmt.query(params![customer_id])?;
    let mut due = Decimal::ZERO;
    let mut purchases = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        due += dec_col(&r.get::<_, String>(0)?, "invoices.due_amount")?;
        purchases += dec_col(&r.get::<_, String>(1)?, "invoices.total")?;
    }
    Ok((due, purchases))
}

/// Pay down a customer's arrears, oldest invoice first (by id, which is
/// creation order). One payment row and ledger entry per touched
/// invoice, plus a single audit record for the run. Returns the
/// (invoice_id, applied) distribution.
pub fn clear_arrears(
    conn: &mut Connection,
    customer_id: i64,
    amount: Decimal,
    mode: PaymentMode,
    parts: SplitParts,
    date: NaiveDate,
    performed_by: &str,
) -> Result<Vec<(i64, Decimal)>> {
    if amount <= Decimal::ZERO {
        return Err(SettleError::Validation("amount must be positive".into()).into());
    }
    let tx = conn.transaction()?;
    let due_s: String = tx
        .query_row(
            "SELECT total_due FROM customers WHERE id=?1",
            params![customer_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Customer {} not found", customer_id))?;
    let total_due = dec_col(&due_s, "customers.total_due")?;
    if amount > total_due {
        return Err(SettleError::Precondition(format!(
            "payment {} exceeds customer dues {}",
            amount, total_due
        ))
        .into());
    }

    let open: Vec<(i64, Decimal)> = {
        let mut stmt = tx.prepare(
            "SELECT id, due_amount FROM invoices
             WHERE customer_id=?1 AND status IN ('Pending','Partial') ORDER BY id ASC",
        )?;
        let mut rows = stmt.query(params![customer_id])?;
        let mut v = Vec::new();
        while let Some(r) = rows.next()? {
            let id: i64 = r.get(0)?;
            let due = dec_col(&r.get::<_, String>(1)?, "invoices.due_amount")?;
            if due > Decimal::ZERO {
                v.push((id, due));
            }
        }
        v
    };

    // Split parts are consumed greedily cash -> upi -> card across the
    // distribution so per-invoice rows still sum exactly.
    let mut left = amount;
    let mut pool = parts;
    let mut applied = Vec::new();
    for (invoice_id, due) in open {
        if left <= Decimal::ZERO {
            break;
        }
        let pay = due.min(left);
        let mut slice = SplitParts::default();
        let mut need = pay;
        let take_cash = pool.cash.min(need);
        slice.cash = take_cash;
        pool.cash -= take_cash;
        need -= take_cash;
        let take_upi = pool.upi.min(need);
        slice.upi = take_upi;
        pool.upi -= take_upi;
        need -= take_upi;
        slice.card = need;
        pool.card -= need;

        invoices::apply_payment_tx(
            &tx,
            invoice_id,
            pay,
            mode,
            slice,
            PaymentKind::Customer,
            date,
            performed_by,
        )?;
        applied.push((invoice_id, pay));
        left -= pay;
    }

    if left > Decimal::ZERO {
        // The aggregate said there was room; the invoice log disagreed.
        return Err(SettleError::Consistency(format!(
            "customer {} aggregate {} exceeds open invoice dues by {}",
            customer_id, total_due, left
        ))
        .into());
    }

    tx.execute(
        "INSERT INTO customer_payments(customer_id, amount, mode, date) VALUES (?1,?2,?3,?4)",
        params![customer_id, amount.to_string(), mode.as_str(), date.to_string()],
    )?;
    bump_customer_totals(&tx, customer_id, -amount, Decimal::ZERO)?;
    tx.commit()?;
    Ok(applied)
}

fn clear_dues(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let customer_id = id_for_customer(conn, sub.get_one::<String>("customer").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let req = invoices::payment_from_args(sub, amount)?;
    let date = today(conn)?;
    let applied = clear_arrears(conn, customer_id, amount, req.mode, req.parts, date, "shop")?;
    for (invoice_id, pay) in &applied {
        println!("Applied {} to invoice {}", fmt_money(pay), invoice_id);
    }
    println!("Cleared {} across {} invoice(s)", fmt_money(&amount), applied.len());
    Ok(())
}

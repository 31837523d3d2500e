// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The append-only transaction ledger: every money-moving document writes
//! exactly one row here, and the cashbook is a pure read over these rows.

use crate::models::{DocRef, TxnCategory, TxnType};
use crate::utils::{dec_col, maybe_print_json, parse_date, pretty_table};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("cashbook", sub)) => cashbook(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("backfill", _)) => {
            let n = backfill(conn)?;
            println!("Backfill complete: {} ledger row(s) created", n);
        }
        Some(("export", sub)) => export(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Append one ledger row. Call inside the same transaction that mutates the
/// source document so the two commit or roll back together.
pub(crate) fn record_txn(
    conn: &Connection,
    typ: TxnType,
    category: TxnCategory,
    amount: Decimal,
    mode: &str,
    reference: DocRef,
    date: NaiveDate,
    performed_by: &str,
) -> Result<i64> {
    let (model, id) = reference.as_parts();
    conn.execute(
        "INSERT INTO transactions(type, category, amount, mode, ref_model, ref_id, date, performed_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            typ.as_str(),
            category.as_str(),
            amount.to_string(),
            mode,
            model,
            id,
            date.to_string(),
            performed_by
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

#[derive(Debug, Serialize)]
pub struct Cashbook {
    pub inflows: BTreeMap<String, Decimal>,
    pub outflows: BTreeMap<String, Decimal>,
    pub inflow_total: Decimal,
    pub outflow_total: Decimal,
    /// Non-cash settlements (old-gold netting), reported but outside totals.
    pub adjustments: Decimal,
    pub net: Decimal,
}

/// Categorized sources/uses of cash for a date range. Read-only; totals
/// reconcile with the underlying documents because every document writes
/// exactly one ledger row.
pub fn project_cashbook(
    conn: &Connection,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Cashbook> {
    let mut sql =
        String::from("SELECT type, category, amount FROM transactions WHERE 1=1");
    let mut binds: Vec<String> = Vec::new();
    if let Some(f) = from {
        sql.push_str(" AND date>=?");
        binds.push(f.to_string());
    }
    if let Some(t) = to {
        sql.push_str(" AND date<=?");
        binds.push(t.to_string());
    }
    let mut stmt = conn.prepare(&sql)?;
    let bind_refs: Vec<&dyn rusqlite::ToSql> =
        binds.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(bind_refs))?;

    let mut book = Cashbook {
        inflows: BTreeMap::new(),
        outflows: BTreeMap::new(),
        inflow_total: Decimal::ZERO,
        outflow_total: Decimal::ZERO,
        adjustments: Decimal::ZERO,
        net: Decimal::ZERO,
    };
    while let Some(r) = rows.next()? {
        let typ: String = r.get(0)?;
        let cat: String = r.get(1)?;
        let amt = dec_col(&r.get::<_, String>(2)?, "transactions.amount")?;
        let typ: TxnType = typ.parse()?;
        match typ {
            TxnType::Credit => {
                *book.inflows.entry(cat).or_insert(Decimal::ZERO) += amt;
                book.inflow_total += amt;
            }
            TxnType::Debit => {
                *book.outflows.entry(cat).or_insert(Decimal::ZERO) += amt;
                book.outflow_total += amt;
            }
            TxnType::Adjust => book.adjustments += amt,
        }
    }
    book.net = book.inflow_total - book.outflow_total;
    Ok(book)
}

fn cashbook(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let from = sub.get_one::<String>("from").map(|s| parse_date(s)).transpose()?;
    let to = sub.get_one::<String>("to").map(|s| parse_date(s)).transpose()?;
    let book = project_cashbook(conn, from, to)?;
    if crate::utils::maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &book)? {
        return Ok(());
    }
    let mut rows = Vec::new();
    for (cat, amt) in &book.inflows {
        rows.push(vec!["IN".into(), cat.clone(), format!("{:.2}", amt)]);
    }
    for (cat, amt) in &book.outflows {
        rows.push(vec!["OUT".into(), cat.clone(), format!("{:.2}", amt)]);
    }
    println!("{}", pretty_table(&["Flow", "Category", "Amount"], rows));
    println!(
        "Inflows {:.2} | Outflows {:.2} | Net cash {:.2} | Non-cash adjustments {:.2}",
        book.inflow_total, book.outflow_total, book.net, book.adjustments
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let limit = *sub.get_one::<usize>("limit").unwrap_or(&50);
    let mut stmt = conn.prepare(
        "SELECT date, type, category, amount, mode, ref_model, ref_id, performed_by
         FROM transactions ORDER BY date DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], |r| {
        Ok(vec![
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            format!("{}#{}", r.get::<_, String>(5)?, r.get::<_, i64>(6)?),
            r.get::<_, String>(7)?,
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
                &["Date", "Type", "Category", "Amount", "Mode", "Ref", "By"],
                data
            )
        );
    }
    Ok(())
}

/// One-shot idempotent backfill: create the ledger row for any money-moving
/// document that lacks one. `INSERT OR IGNORE` against the
/// `(ref_model, ref_id, category)` uniqueness makes a re-run a no-op.
pub fn backfill(conn: &mut Connection) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut created = 0usize;

    // Invoice payments: billing-time rows are SALES, later settlements
    // CUSTOMER_PAYMENT.
    created += tx.execute(
        "INSERT OR IGNORE INTO transactions(type, category, amount, mode, ref_model, ref_id, date, performed_by)
         SELECT 'CREDIT',
                CASE kind WHEN 'SALE' THEN 'SALES' ELSE 'CUSTOMER_PAYMENT' END,
                amount, mode, 'invoice_payment', id, substr(paid_at,1,10), 'backfill'
         FROM invoice_payments",
        [],
    )?;

    created += tx.execute(
        "INSERT OR IGNORE INTO transactions(type, category, amount, mode, ref_model, ref_id, date, performed_by)
         SELECT 'CREDIT', 'ADVANCE', amount, mode, 'order_payment', id, substr(paid_at,1,10), 'backfill'
         FROM order_payments",
        [],
    )?;

    // Old gold: cash purchases are DEBITs; invoice adjustments are non-cash.
    // The ledger date is the settlement date, not intake.
    created += tx.execute(
        "INSERT OR IGNORE INTO transactions(type, category, amount, mode, ref_model, ref_id, date, performed_by)
         SELECT 'DEBIT', 'OLD_GOLD', total_value, IFNULL(payout_mode,'Cash'), 'old_gold', id,
                IFNULL(settled_at, substr(created_at,1,10)), 'backfill'
         FROM old_gold WHERE status='PaidOut'",
        [],
    )?;
    created += tx.execute(
        "INSERT OR IGNORE INTO transactions(type, category, amount, mode, ref_model, ref_id, date, performed_by)
         SELECT 'ADJUST', 'OLD_GOLD', adjusted_amount, 'Exchange', 'old_gold', id,
                IFNULL(settled_at, substr(created_at,1,10)), 'backfill'
         FROM old_gold WHERE status='Adjusted'",
        [],
    )?;

    created += tx.execute(
        "INSERT OR IGNORE INTO transactions(type, category, amount, mode, ref_model, ref_id, date, performed_by)
         SELECT 'DEBIT', 'PURCHASE', amount, mode, 'purchase', id, date, 'backfill' FROM purchases",
        [],
    )?;
    created += tx.execute(
        "INSERT OR IGNORE INTO transactions(type, category, amount, mode, ref_model, ref_id, date, performed_by)
         SELECT 'DEBIT', 'EXPENSE', amount, mode, 'expense', id, date, 'backfill' FROM expenses",
        [],
    )?;
    created += tx.execute(
        "INSERT OR IGNORE INTO transactions(type, category, amount, mode, ref_model, ref_id, date, performed_by)
         SELECT 'DEBIT', 'SUPPLIER_PAYMENT', amount, mode, 'supplier_payment', id, date, 'backfill'
         FROM supplier_payments",
        [],
    )?;

    tx.commit()?;
    Ok(created)
}

fn export(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let mut stmt = conn.prepare(
        "SELECT date, type, category, amount, mode, ref_model, ref_id, performed_by
         FROM transactions ORDER BY date, id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, i64>(6)?,
            r.get::<_, String>(7)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "date", "type", "category", "amount", "mode", "ref_model", "ref_id", "by",
            ])?;
            for row in rows {
                let (d, t, c, a, m, rm, ri, by) = row?;
                wtr.write_record([d, t, c, a, m, rm, ri.to_string(), by])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (d, t, c, a, m, rm, ri, by) = row?;
                items.push(serde_json::json!({
                    "date": d, "type": t, "category": c, "amount": a, "mode": m,
                    "ref": {"model": rm, "id": ri}, "by": by
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported ledger to {}", out);
    Ok(())
}

// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Old-metal exchange ledger. A record is valued once at intake and then
//! settled exactly once: netted against a single invoice (Adjusted) or
//! bought outright for cash (PaidOut). If an adjustment uses less than the
//! record's value the remainder is forfeited; adjustment is single-shot.

use crate::commands::{customers, ledger};
use crate::errors::SettleError;
use crate::models::{DocRef, OldGoldStatus, PaymentMode, TxnCategory, TxnType};
use crate::pricing;
use crate::utils::{
    dec_col, fmt_money, id_for_customer, id_for_invoice, maybe_print_json, parse_decimal,
    pretty_table, today,
};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("adjust", sub)) => {
            let record_id: i64 = sub.get_one::<String>("record").unwrap().parse()?;
            let invoice_id = id_for_invoice(conn, sub.get_one::<String>("invoice").unwrap())?;
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let date = today(conn)?;
            adjust_old_gold(conn, record_id, invoice_id, amount, date, "shop")?;
            println!(
                "Adjusted {} from record {} against invoice {}",
                fmt_money(&amount),
                record_id,
                invoice_id
            );
        }
        Some(("payout", sub)) => {
            let record_id: i64 = sub.get_one::<String>("record").unwrap().parse()?;
            let mode: PaymentMode = sub.get_one::<String>("mode").unwrap().parse()?;
            let date = today(conn)?;
            let value = payout_old_gold(conn, record_id, mode, date, "shop")?;
            println!("Paid out {} for record {}", fmt_money(&value), record_id);
        }
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let customer_id = id_for_customer(conn, sub.get_one::<String>("customer").unwrap())?;
    let category = sub.get_one::<String>("category").unwrap();
    let weight = parse_decimal(sub.get_one::<String>("weight").unwrap())?;
    let purity = parse_decimal(sub.get_one::<String>("purity").unwrap())?;
    let rate = parse_decimal(sub.get_one::<String>("rate").unwrap())?;
    let value = pricing::old_gold_value(weight, rate, purity)?;
    conn.execute(
        "INSERT INTO old_gold(customer_id, category, weight, purity, rate, total_value)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            customer_id,
            category,
            weight.to_string(),
            purity.to_string(),
            rate.to_string(),
            value.to_string()
        ],
    )?;
    println!(
        "Recorded old {} {}g @ {} (purity {}%), credit {}",
        category.to_lowercase(),
        weight,
        rate,
        purity,
        fmt_money(&value)
    );
    Ok(())
}

/// Flip a Pending record to Adjusted and write the non-cash ledger entry.
/// Runs inside the caller's transaction; the caller is responsible for the
/// invoice side. The CAS on status is the AlreadyAdjusted guard.
pub(crate) fn mark_adjusted_tx(
    tx: &Connection,
    record_id: i64,
    invoice_id: i64,
    amount: Decimal,
    date: NaiveDate,
    performed_by: &str,
) -> Result<()> {
    let changed = tx.execute(
        "UPDATE old_gold SET status='Adjusted', adjusted_invoice_id=?1, adjusted_amount=?2,
             settled_at=?3
         WHERE id=?4 AND status='Pending'",
        params![invoice_id, amount.to_string(), date.to_string(), record_id],
    )?;
    if changed == 0 {
        return Err(SettleError::Precondition(format!(
            "old-gold record {} is no longer pending",
            record_id
        ))
        .into());
    }
    ledger::record_txn(
        tx,
        TxnType::Adjust,
        TxnCategory::OldGold,
        amount,
        "Exchange",
        DocRef::OldGold(record_id),
        date,
        performed_by,
    )?;
    Ok(())
}

/// Net a pending record against an open invoice: shrinks the invoice's
/// total/due by `amount` (exchange settles a receivable, it does not move
/// cash) and forfeits any remainder of the record's value.
pub fn adjust_old_gold(
    conn: &mut Connection,
    record_id: i64,
    invoice_id: i64,
    amount: Decimal,
    date: NaiveDate,
    performed_by: &str,
) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(SettleError::Validation("adjustment amount must be positive".into()).into());
    }
    let tx = conn.transaction()?;

    let (status_s, value_s): (String, String) = tx
        .query_row(
            "SELECT status, total_value FROM old_gold WHERE id=?1",
            params![record_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Old-gold record {} not found", record_id))?;
    let status: OldGoldStatus = status_s.parse()?;
    if status != OldGoldStatus::Pending {
        return Err(SettleError::Precondition(format!(
            "old-gold record {} is already {}",
            record_id, status_s
        ))
        .into());
    }
    let value = dec_col(&value_s, "old_gold.total_value")?;
    if amount > value {
        return Err(SettleError::Precondition(format!(
            "adjustment {} exceeds old-gold credit {}",
            amount, value
        ))
        .into());
    }

    let (customer_id, subtotal_s, discount_s, exchange_s, gst_s, due_s, inv_status_s): (
        i64,
        String,
        String,
        String,
        String,
        String,
        String,
    ) = tx
        .query_row(
            "SELECT customer_id, subtotal, discount, exchange_amount, gst, due_amount, status
             FROM invoices WHERE id=?1",
            params![invoice_id],
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                    r.get(5)?,
                    r.get(6)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| anyhow!("Invoice {} not found", invoice_id))?;
    if inv_status_s == "Cancelled" {
        return Err(
            SettleError::Precondition(format!("invoice {} is cancelled", invoice_id)).into(),
        );
    }
    let due = dec_col(&due_s, "invoices.due_amount")?;
    if amount > due {
        return Err(SettleError::Precondition(format!(
            "adjustment {} exceeds invoice due {}",
            amount, due
        ))
        .into());
    }

    let subtotal = dec_col(&subtotal_s, "invoices.subtotal")?;
    let discount = dec_col(&discount_s, "invoices.discount")?;
    let exchange = dec_col(&exchange_s, "invoices.exchange_amount")?;
    let gst = dec_col(&gst_s, "invoices.gst")?;
    let new_exchange = exchange + amount;
    let new_total = pricing::invoice_total(subtotal, discount, new_exchange, gst);
    let new_due = due - amount;
    let new_status = pricing::derive_invoice_status(new_due, new_total);

    let changed = tx.execute(
        "UPDATE invoices SET exchange_amount=?1, total=?2, due_amount=?3, status=?4
         WHERE id=?5 AND due_amount=?6",
        params![
            new_exchange.to_string(),
            new_total.to_string(),
            new_due.to_string(),
            new_status.as_str(),
            invoice_id,
            due_s
        ],
    )?;
    if changed == 0 {
        return Err(SettleError::Conflict(format!(
            "invoice {} due changed underneath the adjustment; retry",
            invoice_id
        ))
        .into());
    }

    mark_adjusted_tx(&tx, record_id, invoice_id, amount, date, performed_by)?;
    // Both the due and the invoice total shrank by the netted amount.
    customers::bump_customer_totals(&tx, customer_id, -amount, -amount)?;

    tx.commit()?;
    Ok(())
}

/// Outright cash purchase of the metal: Pending -> PaidOut, one DEBIT
/// ledger row (this is the OLD_GOLD cash outflow the cashbook reports).
pub fn payout_old_gold(
    conn: &mut Connection,
    record_id: i64,
    mode: PaymentMode,
    date: NaiveDate,
    performed_by: &str,
) -> Result<Decimal> {
    if mode == PaymentMode::Credit || mode == PaymentMode::Split {
        return Err(
            SettleError::Validation("payout mode must be Cash, UPI, or Card".into()).into(),
        );
    }
    let tx = conn.transaction()?;
    let value_s: String = tx
        .query_row(
            "SELECT total_value FROM old_gold WHERE id=?1",
            params![record_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Old-gold record {} not found", record_id))?;
    let value = dec_col(&value_s, "old_gold.total_value")?;
    let changed = tx.execute(
        "UPDATE old_gold SET status='PaidOut', payout_mode=?1, settled_at=?2
         WHERE id=?3 AND status='Pending'",
        params![mode.as_str(), date.to_string(), record_id],
    )?;
    if changed == 0 {
        return Err(SettleError::Precondition(format!(
            "old-gold record {} is no longer pending",
            record_id
        ))
        .into());
    }
    ledger::record_txn(
        &tx,
        TxnType::Debit,
        TxnCategory::OldGold,
        value,
        mode.as_str(),
        DocRef::OldGold(record_id),
        date,
        performed_by,
    )?;
    tx.commit()?;
    Ok(value)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT o.id, c.name, o.category, o.weight, o.purity, o.total_value, o.status,
                o.adjusted_amount
         FROM old_gold o JOIN customers c ON o.customer_id=c.id ORDER BY o.id DESC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, Option<String>>(7)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (id, name, cat, w, p, value_s, status, adjusted) = row?;
        // Show what was forfeited when an adjustment used less than the value.
        let forfeited = match &adjusted {
            Some(a) => {
                let v = dec_col(&value_s, "old_gold.total_value")?;
                let a = dec_col(a, "old_gold.adjusted_amount")?;
                format!("{:.2}", v - a)
            }
            None => String::new(),
        };
        data.push(vec![
            id.to_string(),
            name,
            cat,
            w,
            p,
            value_s,
            status,
            adjusted.unwrap_or_default(),
            forfeited,
        ]);
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        println!(
            "{}",
            pretty_table(
                &["Id", "Customer", "Metal", "Weight", "Purity", "Value", "Status", "Adjusted", "Forfeited"],
                data
            )
        );
    }
    Ok(())
}

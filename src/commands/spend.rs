// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Outgoing money: stock purchases, shop expenses, supplier payments. Each
//! document and its DEBIT ledger row commit in the same transaction.

use crate::errors::SettleError;
use crate::models::{DocRef, PaymentMode, TxnCategory, TxnType};
use crate::utils::{
    dec_col, fmt_money, maybe_print_json, parse_date, parse_decimal, pretty_table, today,
};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use super::ledger;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("purchase", sub)) => {
            let supplier = sub.get_one::<String>("supplier").unwrap().clone();
            let description = sub.get_one::<String>("description").cloned();
            let (amount, mode, date) = money_args(conn, sub)?;
            record_purchase(conn, &supplier, description.as_deref(), amount, mode, date)?;
            println!("Recorded purchase {} from {}", fmt_money(&amount), supplier);
        }
        Some(("expense", sub)) => {
            let description = sub.get_one::<String>("description").unwrap().clone();
            let (amount, mode, date) = money_args(conn, sub)?;
            record_expense(conn, &description, amount, mode, date)?;
            println!("Recorded expense {} ({})", fmt_money(&amount), description);
        }
        Some(("supplier-payment", sub)) => {
            let supplier = sub.get_one::<String>("supplier").unwrap().clone();
            let (amount, mode, date) = money_args(conn, sub)?;
            record_supplier_payment(conn, &supplier, amount, mode, date)?;
            println!("Recorded supplier payment {} to {}", fmt_money(&amount), supplier);
        }
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn money_args(
    conn: &Connection,
    sub: &clap::ArgMatches,
) -> Result<(Decimal, PaymentMode, NaiveDate)> {
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let mode: PaymentMode = sub.get_one::<String>("mode").unwrap().parse()?;
    let date = match sub.get_one::<String>("date") {
        Some(s) => parse_date(s)?,
        None => today(conn)?,
    };
    Ok((amount, mode, date))
}

fn check_outflow(amount: Decimal, mode: PaymentMode) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(SettleError::Validation("amount must be positive".into()).into());
    }
    if mode == PaymentMode::Credit || mode == PaymentMode::Split {
        return Err(
            SettleError::Validation("outflow mode must be Cash, UPI, or Card".into()).into(),
        );
    }
    Ok(())
}

pub fn record_purchase(
    conn: &mut Connection,
    supplier: &str,
    description: Option<&str>,
    amount: Decimal,
    mode: PaymentMode,
    date: NaiveDate,
) -> Result<i64> {
    check_outflow(amount, mode)?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO purchases(supplier, description, amount, mode, date) VALUES (?1,?2,?3,?4,?5)",
        params![supplier, description, amount.to_string(), mode.as_str(), date.to_string()],
    )?;
    let id = tx.last_insert_rowid();
    ledger::record_txn(
        &tx,
        TxnType::Debit,
        TxnCategory::Purchase,
        amount,
        mode.as_str(),
        DocRef::Purchase(id),
        date,
        "shop",
    )?;
    tx.commit()?;
    Ok(id)
}

pub fn record_expense(
    conn: &mut Connection,
    description: &str,
    amount: Decimal,
    mode: PaymentMode,
    date: NaiveDate,
) -> Result<i64> {
    check_outflow(amount, mode)?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO expenses(description, amount, mode, date) VALUES (?1,?2,?3,?4)",
        params![description, amount.to_string(), mode.as_str(), date.to_string()],
    )?;
    let id = tx.last_insert_rowid();
    ledger::record_txn(
        &tx,
        TxnType::Debit,
        TxnCategory::Expense,
        amount,
        mode.as_str(),
        DocRef::Expense(id),
        date,
        "shop",
    )?;
    tx.commit()?;
    Ok(id)
}

pub fn record_supplier_payment(
    conn: &mut Connection,
    supplier: &str,
    amount: Decimal,
    mode: PaymentMode,
    date: NaiveDate,
) -> Result<i64> {
    check_outflow(amount, mode)?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO supplier_payments(supplier, amount, mode, date) VALUES (?1,?2,?3,?4)",
        params![supplier, amount.to_string(), mode.as_str(), date.to_string()],
    )?;
    let id = tx.last_insert_rowid();
    ledger::record_txn(
        &tx,
        TxnType::Debit,
        TxnCategory::SupplierPayment,
        amount,
        mode.as_str(),
        DocRef::SupplierPayment(id),
        date,
        "shop",
    )?;
    tx.commit()?;
    Ok(id)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut data = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT 'PURCHASE', date, supplier || IFNULL(': ' || description, ''), amount, mode
             FROM purchases
         UNION ALL
         SELECT 'EXPENSE', date, description, amount, mode FROM expenses
         UNION ALL
         SELECT 'SUPPLIER_PAYMENT', date, supplier, amount, mode FROM supplier_payments
         ORDER BY 2 DESC",
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
    let mut total = Decimal::ZERO;
    for row in rows {
        let row = row?;
        total += dec_col(&row[3], "spend amount")?;
        data.push(row);
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        println!(
            "{}",
            pretty_table(&["Kind", "Date", "Detail", "Amount", "Mode"], data)
        );
        println!("Total outgoing {}", fmt_money(&total));
    }
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Billing: invoice creation, payment application, cancellation.
//!
//! Every balance mutation runs inside one SQLite transaction and writes
//! through a guarded `UPDATE ... WHERE due_amount=?` so a stale read can
//! never apply against a balance that moved underneath it.

use crate::commands::{customers, ledger, oldgold};
use crate::errors::SettleError;
use crate::models::{InvoiceStatus, PaymentKind, PaymentMode, SplitParts, TxnCategory, TxnType};
use crate::pricing::{self, LineItem};
use crate::utils::{
    build_split, dec_col, fmt_money, id_for_customer, id_for_invoice, id_for_product,
    maybe_print_json, next_doc_number, parse_decimal, pretty_table, rate_snapshot_json,
    rates_on_or_before, today, verify_parts,
};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => create(conn, sub)?,
        Some(("pay", sub)) => pay(conn, sub)?,
        Some(("cancel", sub)) => {
            let id = id_for_invoice(conn, sub.get_one::<String>("invoice").unwrap())?;
            cancel_invoice(conn, id)?;
            println!("Invoice {} cancelled", id);
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub product_id: Option<i64>,
    pub description: String,
    pub line: LineItem,
}

#[derive(Debug, Clone, Copy)]
pub struct PaymentReq {
    pub amount: Decimal,
    pub mode: PaymentMode,
    pub parts: SplitParts,
}

#[derive(Debug, Clone, Copy)]
pub struct ExchangeReq {
    pub record_id: i64,
    /// Portion of the record's value to apply; defaults to everything usable.
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub customer_id: i64,
    pub items: Vec<NewItem>,
    pub discount: Decimal,
    pub gst: Decimal,
    pub exchange: Option<ExchangeReq>,
    pub paid: Option<PaymentReq>,
    pub date: NaiveDate,
    pub performed_by: String,
}

/// Creates the invoice, decrements stock for catalog-backed items
/// (all-or-nothing), applies an optional old-gold exchange and billing-time
/// payment, and updates the customer aggregate, all in one transaction.
pub fn create_invoice(conn: &mut Connection, draft: InvoiceDraft) -> Result<i64> {
    if draft.items.is_empty() {
        return Err(SettleError::Validation("invoice needs at least one item".into()).into());
    }
    if draft.discount < Decimal::ZERO || draft.gst < Decimal::ZERO {
        return Err(
            SettleError::Validation("discount and gst must be non-negative".into()).into(),
        );
    }

    let tx = conn.transaction()?;

    let mut subtotal = Decimal::ZERO;
    for it in &draft.items {
        subtotal += pricing::line_total(&it.line)?;
    }

    // Exchange is netted into the total up front; the record flips to
    // Adjusted inside this same transaction.
    let settable = subtotal - draft.discount + draft.gst;
    let exchange_amount = match draft.exchange {
        Some(ex) => {
            let row: Option<(i64, String, String)> = tx
                .query_row(
                    "SELECT customer_id, total_value, status FROM old_gold WHERE id=?1",
                    params![ex.record_id],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
                )
                .optional()?;
            let (rec_customer, value_s, status) = row
                .ok_or_else(|| anyhow!("Old-gold record {} not found", ex.record_id))?;
            if status != "Pending" {
                return Err(SettleError::Precondition(format!(
                    "old-gold record {} is already {}",
                    ex.record_id, status
                ))
                .into());
            }
            if rec_customer != draft.customer_id {
                return Err(SettleError::Precondition(format!(
                    "old-gold record {} belongs to another customer",
                    ex.record_id
                ))
                .into());
            }
            let value = dec_col(&value_s, "old_gold.total_value")?;
            let amount = ex.amount.unwrap_or_else(|| value.min(settable));
            if amount <= Decimal::ZERO {
                return Err(
                    SettleError::Validation("exchange amount must be positive".into()).into(),
                );
            }
            if amount > value {
                return Err(SettleError::Precondition(format!(
                    "exchange amount {} exceeds old-gold credit {}",
                    amount, value
                ))
                .into());
            }
            if amount > settable {
                return Err(SettleError::Precondition(format!(
                    "exchange amount {} exceeds invoice due {}",
                    amount, settable
                ))
                .into());
            }
            amount
        }
        None => Decimal::ZERO,
    };

    let total = pricing::invoice_total(subtotal, draft.discount, exchange_amount, draft.gst);

    decrement_stock(&tx, &draft.items)?;

    let rate_snapshot = rate_snapshot_json(&tx, draft.date)?;
    let (invoice_id, invoice_no) = insert_invoice_row(
        &tx,
        draft.customer_id,
        subtotal,
        draft.discount,
        exchange_amount,
        draft.gst,
        total,
        rate_snapshot,
        draft.date,
    )?;

    for it in &draft.items {
        let line_total = pricing::line_total(&it.line)?;
        tx.execute(
            "INSERT INTO invoice_items(invoice_id, product_id, description, weight, rate,
                 making_charge, wastage, discount, gst, quantity, line_total)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
            params![
                invoice_id,
                it.product_id,
                it.description,
                it.line.weight.to_string(),
                it.line.rate.to_string(),
                it.line.making_charge.to_string(),
                it.line.wastage.to_string(),
                it.line.discount.to_string(),
                it.line.gst.to_string(),
                it.line.quantity,
                line_total.to_string()
            ],
        )?;
    }

    if let Some(ex) = draft.exchange {
        oldgold::mark_adjusted_tx(
            &tx,
            ex.record_id,
            invoice_id,
            exchange_amount,
            draft.date,
            &draft.performed_by,
        )?;
    }

    if let Some(p) = draft.paid {
        apply_payment_tx(
            &tx,
            invoice_id,
            p.amount,
            p.mode,
            p.parts,
            PaymentKind::Sale,
            draft.date,
            &draft.performed_by,
        )?;
    }

    let due: Decimal = dec_col(
        &tx.query_row(
            "SELECT due_amount FROM invoices WHERE id=?1",
            params![invoice_id],
            |r| r.get::<_, String>(0),
        )?,
        "invoices.due_amount",
    )?;
    customers::bump_customer_totals(&tx, draft.customer_id, due, total)?;

    tx.commit()?;
    println!("Created invoice {} (id {})", invoice_no, invoice_id);
    Ok(invoice_id)
}

fn decrement_stock(tx: &Connection, items: &[NewItem]) -> Result<()> {
    for it in items {
        if let Some(pid) = it.product_id {
            let qty = it.line.quantity;
            let changed = tx.execute(
                "UPDATE products SET stock_qty = stock_qty - ?1 WHERE id=?2 AND stock_qty >= ?1",
                params![qty, pid],
            )?;
            if changed == 0 {
                return Err(SettleError::Precondition(format!(
                    "insufficient stock for product {} (need {})",
                    pid, qty
                ))
                .into());
            }
        }
    }
    Ok(())
}

/// Bare row insert shared with order delivery. Returns (id, invoice_no).
#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_invoice_row(
    tx: &Connection,
    customer_id: i64,
    subtotal: Decimal,
    discount: Decimal,
    exchange_amount: Decimal,
    gst: Decimal,
    total: Decimal,
    rate_snapshot: Option<String>,
    date: NaiveDate,
) -> Result<(i64, String)> {
    let invoice_no = next_doc_number(tx, "invoice_seq", "INV")?;
    tx.execute(
        "INSERT INTO invoices(invoice_no, customer_id, subtotal, discount, exchange_amount, gst,
             total, paid_amount, due_amount, payment_mode, status, rate_snapshot, created_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,'0',?7,'Credit',?8,?9,?10)",
        params![
            invoice_no,
            customer_id,
            subtotal.to_string(),
            discount.to_string(),
            exchange_amount.to_string(),
            gst.to_string(),
            total.to_string(),
            pricing::derive_invoice_status(total, total).as_str(),
            rate_snapshot,
            format!("{} 00:00:00", date)
        ],
    )?;
    Ok((tx.last_insert_rowid(), invoice_no))
}

/// Core of the payment application service. Runs inside the caller's
/// transaction; does NOT touch the customer aggregate (the caller batches
/// that). Returns (payment_id, customer_id).
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_payment_tx(
    tx: &Connection,
    invoice_id: i64,
    amount: Decimal,
    mode: PaymentMode,
    parts: SplitParts,
    kind: PaymentKind,
    date: NaiveDate,
    performed_by: &str,
) -> Result<(i64, i64)> {
    if amount <= Decimal::ZERO {
        return Err(SettleError::Validation("payment amount must be positive".into()).into());
    }
    verify_parts(mode, amount, parts)?;
    let (customer_id, total_s, paid_s, due_s, status_s, mode_s): (
        i64,
        String,
        String,
        String,
        String,
        String,
    ) = tx
        .query_row(
            "SELECT customer_id, total, paid_amount, due_amount, status, payment_mode
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
                ))
            },
        )
        .optional()?
        .ok_or_else(|| anyhow!("Invoice {} not found", invoice_id))?;

    let status: InvoiceStatus = status_s.parse()?;
    if status == InvoiceStatus::Cancelled {
        return Err(
            SettleError::Precondition(format!("invoice {} is cancelled", invoice_id)).into(),
        );
    }
    let total = dec_col(&total_s, "invoices.total")?;
    let paid = dec_col(&paid_s, "invoices.paid_amount")?;
    let due = dec_col(&due_s, "invoices.due_amount")?;
    if amount > due {
        return Err(SettleError::Precondition(format!(
            "payment {} exceeds due {} on invoice {}",
            amount, due, invoice_id
        ))
        .into());
    }

    let new_paid = paid + amount;
    let new_due = due - amount;
    let new_status = pricing::derive_invoice_status(new_due, total);
    let new_mode = if paid.is_zero() || mode_s == mode.as_str() {
        mode.as_str().to_string()
    } else {
        PaymentMode::Split.as_str().to_string()
    };

    let changed = tx.execute(
        "UPDATE invoices SET paid_amount=?1, due_amount=?2, status=?3, payment_mode=?4
         WHERE id=?5 AND due_amount=?6",
        params![
            new_paid.to_string(),
            new_due.to_string(),
            new_status.as_str(),
            new_mode,
            invoice_id,
            due_s
        ],
    )?;
    if changed == 0 {
        return Err(SettleError::Conflict(format!(
            "invoice {} due changed underneath this payment; retry",
            invoice_id
        ))
        .into());
    }

    tx.execute(
        "INSERT INTO invoice_payments(invoice_id, amount, mode, cash_part, upi_part, card_part, kind, paid_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            invoice_id,
            amount.to_string(),
            mode.as_str(),
            parts.cash.to_string(),
            parts.upi.to_string(),
            parts.card.to_string(),
            kind.as_str(),
            format!("{} 00:00:00", date)
        ],
    )?;
    let payment_id = tx.last_insert_rowid();

    let category = if kind == PaymentKind::Sale {
        TxnCategory::Sales
    } else {
        TxnCategory::CustomerPayment
    };
    ledger::record_txn(
        tx,
        TxnType::Credit,
        category,
        amount,
        mode.as_str(),
        crate::models::DocRef::InvoicePayment(payment_id),
        date,
        performed_by,
    )?;

    Ok((payment_id, customer_id))
}

/// Apply one payment to an invoice, atomically with the customer aggregate.
pub fn apply_invoice_payment(
    conn: &mut Connection,
    invoice_id: i64,
    amount: Decimal,
    mode: PaymentMode,
    parts: SplitParts,
    kind: PaymentKind,
    date: NaiveDate,
    performed_by: &str,
) -> Result<()> {
    let tx = conn.transaction()?;
    let (_pid, customer_id) = apply_payment_tx(
        &tx,
        invoice_id,
        amount,
        mode,
        parts,
        kind,
        date,
        performed_by,
    )?;
    customers::bump_customer_totals(&tx, customer_id, -amount, Decimal::ZERO)?;
    tx.commit()?;
    Ok(())
}

/// Cancellation marks the invoice and releases its due from the customer
/// aggregate; the row itself is never deleted.
pub fn cancel_invoice(conn: &mut Connection, invoice_id: i64) -> Result<()> {
    let tx = conn.transaction()?;
    let (customer_id, total_s, due_s, status_s): (i64, String, String, String) = tx
        .query_row(
            "SELECT customer_id, total, due_amount, status FROM invoices WHERE id=?1",
            params![invoice_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Invoice {} not found", invoice_id))?;
    let status: InvoiceStatus = status_s.parse()?;
    if status == InvoiceStatus::Cancelled {
        return Err(
            SettleError::Precondition(format!("invoice {} is already cancelled", invoice_id))
                .into(),
        );
    }
    let total = dec_col(&total_s, "invoices.total")?;
    let due = dec_col(&due_s, "invoices.due_amount")?;
    let changed = tx.execute(
        "UPDATE invoices SET status='Cancelled' WHERE id=?1 AND status=?2",
        params![invoice_id, status_s],
    )?;
    if changed == 0 {
        return Err(SettleError::Conflict(format!(
            "invoice {} changed underneath the cancellation; retry",
            invoice_id
        ))
        .into());
    }
    customers::bump_customer_totals(&tx, customer_id, -due, -total)?;
    tx.commit()?;
    Ok(())
}

// ---- CLI glue -------------------------------------------------------------

pub(crate) fn parse_free_item(spec: &str) -> Result<NewItem> {
    let parts: Vec<&str> = spec.split(',').map(|s| s.trim()).collect();
    if parts.len() < 3 {
        return Err(SettleError::Validation(format!(
            "item '{}' must be 'description,weight,rate[,making[,wastage]]'",
            spec
        ))
        .into());
    }
    let mut line = LineItem::new(parse_decimal(parts[2])?, parse_decimal(parts[1])?);
    if parts.len() > 3 {
        line.making_charge = parse_decimal(parts[3])?;
    }
    if parts.len() > 4 {
        line.wastage = parse_decimal(parts[4])?;
    }
    Ok(NewItem {
        product_id: None,
        description: parts[0].to_string(),
        line,
    })
}

pub(crate) fn parse_product_item(conn: &Connection, spec: &str, date: NaiveDate) -> Result<NewItem> {
    let parts: Vec<&str> = spec.split(',').map(|s| s.trim()).collect();
    if parts.len() < 2 {
        return Err(
            SettleError::Validation(format!("product item '{}' must be 'SKU,qty[,rate]'", spec))
                .into(),
        );
    }
    let product_id = id_for_product(conn, parts[0])?;
    let (name, weight_s): (String, String) = conn.query_row(
        "SELECT name, weight FROM products WHERE id=?1",
        params![product_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let qty: i64 = parts[1]
        .parse()
        .map_err(|_| SettleError::Validation(format!("bad quantity '{}'", parts[1])))?;
    let rate = if parts.len() > 2 {
        parse_decimal(parts[2])?
    } else {
        rates_on_or_before(conn, date)?
            .map(|(_, r22, _)| r22)
            .ok_or_else(|| {
                SettleError::Validation(
                    "no rate snapshot available; pass an explicit rate in the item".into(),
                )
            })?
    };
    let mut line = LineItem::new(rate, dec_col(&weight_s, "products.weight")?);
    line.quantity = qty;
    Ok(NewItem {
        product_id: Some(product_id),
        description: name,
        line,
    })
}

pub(crate) fn payment_from_args(
    sub: &clap::ArgMatches,
    amount: Decimal,
) -> Result<PaymentReq> {
    let mode: PaymentMode = sub.get_one::<String>("mode").unwrap().parse()?;
    let cash = sub.get_one::<String>("cash").map(|s| parse_decimal(s)).transpose()?;
    let upi = sub.get_one::<String>("upi").map(|s| parse_decimal(s)).transpose()?;
    let card = sub.get_one::<String>("card").map(|s| parse_decimal(s)).transpose()?;
    let parts = build_split(mode, amount, cash, upi, card)?;
    Ok(PaymentReq { amount, mode, parts })
}

fn create(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = today(conn)?;
    let customer_id = id_for_customer(conn, sub.get_one::<String>("customer").unwrap())?;
    let mut items = Vec::new();
    if let Some(vals) = sub.get_many::<String>("item") {
        for v in vals {
            items.push(parse_free_item(v)?);
        }
    }
    if let Some(vals) = sub.get_many::<String>("product-item") {
        for v in vals {
            items.push(parse_product_item(conn, v, date)?);
        }
    }
    let discount = parse_decimal(sub.get_one::<String>("discount").unwrap())?;
    let gst = parse_decimal(sub.get_one::<String>("gst").unwrap())?;
    let exchange = sub
        .get_one::<String>("exchange-record")
        .map(|s| -> Result<ExchangeReq> {
            Ok(ExchangeReq {
                record_id: s.parse::<i64>().map_err(|_| {
                    SettleError::Validation(format!("bad old-gold record id '{}'", s))
                })?,
                amount: sub
                    .get_one::<String>("exchange-amount")
                    .map(|a| parse_decimal(a))
                    .transpose()?,
            })
        })
        .transpose()?;
    let paid = sub
        .get_one::<String>("paid")
        .map(|s| -> Result<PaymentReq> { payment_from_args(sub, parse_decimal(s)?) })
        .transpose()?;

    create_invoice(
        conn,
        InvoiceDraft {
            customer_id,
            items,
            discount,
            gst,
            exchange,
            paid,
            date,
            performed_by: "shop".into(),
        },
    )?;
    Ok(())
}

fn pay(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let invoice_id = id_for_invoice(conn, sub.get_one::<String>("invoice").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let req = payment_from_args(sub, amount)?;
    let date = today(conn)?;
    apply_invoice_payment(
        conn,
        invoice_id,
        req.amount,
        req.mode,
        req.parts,
        PaymentKind::Customer,
        date,
        "shop",
    )?;
    println!("Recorded {} against invoice {}", fmt_money(&amount), invoice_id);
    Ok(())
}

#[derive(Serialize)]
pub struct InvoiceRow {
    pub invoice_no: String,
    pub customer: String,
    pub total: String,
    pub paid: String,
    pub due: String,
    pub mode: String,
    pub status: String,
    pub created: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<InvoiceRow>> {
    let mut sql = String::from(
        "SELECT i.invoice_no, c.name, i.total, i.paid_amount, i.due_amount, i.payment_mode,
                i.status, i.created_at
         FROM invoices i JOIN customers c ON i.customer_id=c.id WHERE 1=1",
    );
    let mut binds: Vec<String> = Vec::new();
    if let Some(cust) = sub.get_one::<String>("customer") {
        sql.push_str(" AND (c.name=? OR c.phone=?)");
        binds.push(cust.clone());
        binds.push(cust.clone());
    }
    if let Some(st) = sub.get_one::<String>("status") {
        sql.push_str(" AND i.status=?");
        binds.push(st.clone());
    }
    sql.push_str(" ORDER BY i.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        binds.push(limit.to_string());
    }
    let mut stmt = conn.prepare(&sql)?;
    let bind_refs: Vec<&dyn rusqlite::ToSql> =
        binds.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(bind_refs))?;
    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        data.push(InvoiceRow {
            invoice_no: r.get(0)?,
            customer: r.get(1)?,
            total: r.get(2)?,
            paid: r.get(3)?,
            due: r.get(4)?,
            mode: r.get(5)?,
            status: r.get(6)?,
            created: r.get(7)?,
        });
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.invoice_no.clone(),
                    r.customer.clone(),
                    r.total.clone(),
                    r.paid.clone(),
                    r.due.clone(),
                    r.mode.clone(),
                    r.status.clone(),
                    r.created.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["No", "Customer", "Total", "Paid", "Due", "Mode", "Status", "Created"],
                rows
            )
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = id_for_invoice(conn, sub.get_one::<String>("invoice").unwrap())?;
    let head: (String, String, String, String, String, String, String, String) = conn.query_row(
        "SELECT invoice_no, subtotal, discount, exchange_amount, gst, total, paid_amount, due_amount
         FROM invoices WHERE id=?1",
        params![id],
        |r| {
            Ok((
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                r.get(3)?,
                r.get(4)?,
                r.get(5)?,
                r.get(6)?,
                r.get(7)?,
            ))
        },
    )?;
    let mut stmt = conn.prepare(
        "SELECT description, weight, rate, making_charge, wastage, quantity, line_total
         FROM invoice_items WHERE invoice_id=?1 ORDER BY id",
    )?;
    let items = stmt.query_map(params![id], |r| {
        Ok(vec![
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, i64>(5)?.to_string(),
            r.get::<_, String>(6)?,
        ])
    })?;
    let mut rows = Vec::new();
    for it in items {
        rows.push(it?);
    }
    if sub.get_flag("json") || sub.get_flag("jsonl") {
        let v = serde_json::json!({
            "invoice_no": head.0, "subtotal": head.1, "discount": head.2,
            "exchange": head.3, "gst": head.4, "total": head.5,
            "paid": head.6, "due": head.7, "items": rows,
        });
        maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &v)?;
        return Ok(());
    }
    println!(
        "{}",
        pretty_table(
            &["Item", "Weight", "Rate", "Making", "Wastage", "Qty", "Line total"],
            rows
        )
    );
    println!(
        "{}: subtotal {} − discount {} − exchange {} + gst {} = total {} (paid {}, due {})",
        head.0, head.1, head.2, head.3, head.4, head.5, head.6, head.7
    );
    Ok(())
}

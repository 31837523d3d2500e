// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Custom orders: advances, readiness, and delivery. Delivery converts the
//! order into exactly one invoice and decrements stock all-or-nothing, in a
//! single SQLite transaction; a second delivery attempt is rejected, not
//! repeated.

use crate::commands::{customers, invoices, ledger};
use crate::errors::SettleError;
use crate::models::{
    DocRef, OrderStatus, PaymentKind, PaymentMode, SplitParts, TxnCategory, TxnType,
};
use crate::pricing;
use crate::utils::{
    dec_col, fmt_money, id_for_customer, id_for_order, maybe_print_json, next_doc_number,
    parse_date, parse_decimal, pretty_table, rate_snapshot_json, today, verify_parts,
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
        Some(("mark-ready", sub)) => {
            let id = id_for_order(conn, sub.get_one::<String>("order").unwrap())?;
            mark_ready(conn, id)?;
            println!("Order {} marked ready", id);
        }
        Some(("deliver", sub)) => deliver(conn, sub)?,
        Some(("edit-item", sub)) => edit_item(conn, sub)?,
        Some(("cancel", sub)) => {
            let id = id_for_order(conn, sub.get_one::<String>("order").unwrap())?;
            cancel_order(conn, id)?;
            println!("Order {} cancelled", id);
        }
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub customer_id: i64,
    pub items: Vec<invoices::NewItem>,
    pub expected: Option<NaiveDate>,
    pub advance: Option<invoices::PaymentReq>,
    pub date: NaiveDate,
    pub performed_by: String,
}

pub fn create_order(conn: &mut Connection, draft: OrderDraft) -> Result<i64> {
    if draft.items.is_empty() {
        return Err(SettleError::Validation("order needs at least one item".into()).into());
    }
    let tx = conn.transaction()?;

    let (name, phone, email): (String, String, Option<String>) = tx
        .query_row(
            "SELECT name, phone, email FROM customers WHERE id=?1",
            params![draft.customer_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Customer {} not found", draft.customer_id))?;

    let mut line_totals = Vec::new();
    for it in &draft.items {
        line_totals.push(pricing::line_total(&it.line)?);
    }
    let total = pricing::document_total(&line_totals, Decimal::ZERO, Decimal::ZERO);

    let order_no = next_doc_number(&tx, "order_seq", "ORD")?;
    tx.execute(
        "INSERT INTO orders(order_no, customer_id, customer_name, customer_phone, customer_email,
             total_amount, paid_amount, status, expected_delivery, created_at)
         VALUES (?1,?2,?3,?4,?5,?6,'0','PENDING',?7,?8)",
        params![
            order_no,
            draft.customer_id,
            name,
            phone,
            email,
            total.to_string(),
            draft.expected.map(|d| d.to_string()),
            format!("{} 00:00:00", draft.date)
        ],
    )?;
    let order_id = tx.last_insert_rowid();

    for (it, lt) in draft.items.iter().zip(&line_totals) {
        tx.execute(
            "INSERT INTO order_items(order_id, product_id, description, weight, rate,
                 making_charge, wastage, quantity, line_total)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                order_id,
                it.product_id,
                it.description,
                it.line.weight.to_string(),
                it.line.rate.to_string(),
                it.line.making_charge.to_string(),
                it.line.wastage.to_string(),
                it.line.quantity,
                lt.to_string()
            ],
        )?;
    }

    if let Some(p) = draft.advance {
        apply_order_payment_tx(
            &tx,
            order_id,
            p.amount,
            p.mode,
            p.parts,
            PaymentKind::Advance,
            draft.date,
            &draft.performed_by,
        )?;
    }

    tx.commit()?;
    println!("Created order {} (id {}), total {}", order_no, order_id, fmt_money(&total));
    Ok(order_id)
}

/// Core of order payment application. CAS against `paid_amount` so two
/// concurrent payments cannot both fit into the same remaining balance.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_order_payment_tx(
    tx: &Connection,
    order_id: i64,
    amount: Decimal,
    mode: PaymentMode,
    parts: SplitParts,
    kind: PaymentKind,
    date: NaiveDate,
    performed_by: &str,
) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(SettleError::Validation("payment amount must be positive".into()).into());
    }
    verify_parts(mode, amount, parts)?;
    let kind = match kind {
        PaymentKind::Advance | PaymentKind::Partial | PaymentKind::Final => kind,
        _ => PaymentKind::Partial,
    };
    let (total_s, paid_s, status_s): (String, String, String) = tx
        .query_row(
            "SELECT total_amount, paid_amount, status FROM orders WHERE id=?1",
            params![order_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Order {} not found", order_id))?;
    let status: OrderStatus = status_s.parse()?;
    if status.is_terminal() {
        return Err(SettleError::Precondition(format!(
            "order {} is {}",
            order_id, status_s
        ))
        .into());
    }
    let total = dec_col(&total_s, "orders.total_amount")?;
    let paid = dec_col(&paid_s, "orders.paid_amount")?;
    let remaining = total - paid;
    if amount > remaining {
        return Err(SettleError::Precondition(format!(
            "payment {} exceeds remaining {} on order {}",
            amount, remaining, order_id
        ))
        .into());
    }

    let new_paid = paid + amount;
    // READY is sticky; only the payment-driven states get re-derived.
    let new_status = match status {
        OrderStatus::Pending | OrderStatus::PartiallyPaid => {
            pricing::derive_order_payment_status(total - new_paid, total)
        }
        other => other,
    };
    let changed = tx.execute(
        "UPDATE orders SET paid_amount=?1, status=?2 WHERE id=?3 AND paid_amount=?4",
        params![new_paid.to_string(), new_status.as_str(), order_id, paid_s],
    )?;
    if changed == 0 {
        return Err(SettleError::Conflict(format!(
            "order {} balance changed underneath this payment; retry",
            order_id
        ))
        .into());
    }

    tx.execute(
        "INSERT INTO order_payments(order_id, kind, amount, mode, cash_part, upi_part, card_part, paid_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
        params![
            order_id,
            kind.as_str(),
            amount.to_string(),
            mode.as_str(),
            parts.cash.to_string(),
            parts.upi.to_string(),
            parts.card.to_string(),
            format!("{} 00:00:00", date)
        ],
    )?;
    let payment_id = tx.last_insert_rowid();
    ledger::record_txn(
        tx,
        TxnType::Credit,
        TxnCategory::Advance,
        amount,
        mode.as_str(),
        DocRef::OrderPayment(payment_id),
        date,
        performed_by,
    )?;
    Ok(payment_id)
}

pub fn apply_order_payment(
    conn: &mut Connection,
    order_id: i64,
    amount: Decimal,
    mode: PaymentMode,
    parts: SplitParts,
    kind: PaymentKind,
    date: NaiveDate,
    performed_by: &str,
) -> Result<()> {
    let tx = conn.transaction()?;
    apply_order_payment_tx(&tx, order_id, amount, mode, parts, kind, date, performed_by)?;
    tx.commit()?;
    Ok(())
}

pub fn mark_ready(conn: &mut Connection, order_id: i64) -> Result<()> {
    let tx = conn.transaction()?;
    let status_s: String = tx
        .query_row(
            "SELECT status FROM orders WHERE id=?1",
            params![order_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Order {} not found", order_id))?;
    let status: OrderStatus = status_s.parse()?;
    if status.is_terminal() {
        return Err(
            SettleError::Precondition(format!("order {} is {}", order_id, status_s)).into(),
        );
    }
    tx.execute(
        "UPDATE orders SET status='READY' WHERE id=?1 AND status=?2",
        params![order_id, status_s],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn cancel_order(conn: &mut Connection, order_id: i64) -> Result<()> {
    let tx = conn.transaction()?;
    let status_s: String = tx
        .query_row(
            "SELECT status FROM orders WHERE id=?1",
            params![order_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Order {} not found", order_id))?;
    let status: OrderStatus = status_s.parse()?;
    if status.is_terminal() {
        return Err(
            SettleError::Precondition(format!("order {} is {}", order_id, status_s)).into(),
        );
    }
    let changed = tx.execute(
        "UPDATE orders SET status='CANCELLED' WHERE id=?1 AND status=?2",
        params![order_id, status_s],
    )?;
    if changed == 0 {
        return Err(SettleError::Conflict(format!(
            "order {} changed underneath the cancellation; retry",
            order_id
        ))
        .into());
    }
    tx.commit()?;
    Ok(())
}

/// Deliver: optional final payment, all-or-nothing stock decrement, exactly
/// one generated invoice whose paid amount starts from the order's collected
/// payments, order -> DELIVERED. Returns the invoice id.
pub fn deliver_order(
    conn: &mut Connection,
    order_id: i64,
    final_payment: Option<invoices::PaymentReq>,
    date: NaiveDate,
    performed_by: &str,
) -> Result<i64> {
    let tx = conn.transaction()?;

    let (customer_id, status_s, existing_invoice): (i64, String, Option<i64>) = tx
        .query_row(
            "SELECT customer_id, status, invoice_id FROM orders WHERE id=?1",
            params![order_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Order {} not found", order_id))?;
    let status: OrderStatus = status_s.parse()?;
    if status.is_terminal() || existing_invoice.is_some() {
        return Err(SettleError::Precondition(format!(
            "order {} has already been {}",
            order_id,
            if existing_invoice.is_some() {
                "delivered"
            } else {
                status_s.as_str()
            }
        ))
        .into());
    }

    if let Some(p) = final_payment {
        apply_order_payment_tx(
            &tx,
            order_id,
            p.amount,
            p.mode,
            p.parts,
            PaymentKind::Final,
            date,
            performed_by,
        )?;
    }

    let (total_s, paid_s): (String, String) = tx.query_row(
        "SELECT total_amount, paid_amount FROM orders WHERE id=?1",
        params![order_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let total = dec_col(&total_s, "orders.total_amount")?;
    let paid = dec_col(&paid_s, "orders.paid_amount")?;

    struct Item {
        product_id: Option<i64>,
        description: String,
        weight: String,
        rate: String,
        making: String,
        wastage: String,
        quantity: i64,
        line_total: String,
    }
    let items: Vec<Item> = {
        let mut stmt = tx.prepare(
            "SELECT product_id, description, weight, rate, making_charge, wastage, quantity, line_total
             FROM order_items WHERE order_id=?1 ORDER BY id",
        )?;
        let mut rows = stmt.query(params![order_id])?;
        let mut v = Vec::new();
        while let Some(r) = rows.next()? {
            v.push(Item {
                product_id: r.get(0)?,
                description: r.get(1)?,
                weight: r.get(2)?,
                rate: r.get(3)?,
                making: r.get(4)?,
                wastage: r.get(5)?,
                quantity: r.get(6)?,
                line_total: r.get(7)?,
            });
        }
        v
    };

    // No partial inventory commit: any shortfall rolls the whole delivery
    // back, payments included.
    for it in &items {
        if let Some(pid) = it.product_id {
            let changed = tx.execute(
                "UPDATE products SET stock_qty = stock_qty - ?1 WHERE id=?2 AND stock_qty >= ?1",
                params![it.quantity, pid],
            )?;
            if changed == 0 {
                return Err(SettleError::Precondition(format!(
                    "insufficient stock for product {} (need {})",
                    pid, it.quantity
                ))
                .into());
            }
        }
    }

    let subtotal: Decimal = {
        let mut s = Decimal::ZERO;
        for it in &items {
            s += dec_col(&it.line_total, "order_items.line_total")?;
        }
        s
    };
    let rate_snapshot = rate_snapshot_json(&tx, date)?;
    let (invoice_id, invoice_no) = invoices::insert_invoice_row(
        &tx,
        customer_id,
        subtotal,
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        total,
        rate_snapshot,
        date,
    )?;

    for it in &items {
        tx.execute(
            "INSERT INTO invoice_items(invoice_id, product_id, description, weight, rate,
                 making_charge, wastage, discount, gst, quantity, line_total)
             VALUES (?1,?2,?3,?4,?5,?6,?7,'0','0',?8,?9)",
            params![
                invoice_id,
                it.product_id,
                it.description,
                it.weight,
                it.rate,
                it.making,
                it.wastage,
                it.quantity,
                it.line_total
            ],
        )?;
    }

    // Carry the order's collected payments onto the invoice. The money
    // movement already sits in the ledger as ADVANCE rows; emitting more
    // rows here would double-count it.
    let due = total - paid;
    let mode = collected_mode(&tx, order_id)?;
    let inv_status = pricing::derive_invoice_status(due, total);
    tx.execute(
        "UPDATE invoices SET paid_amount=?1, due_amount=?2, status=?3, payment_mode=?4 WHERE id=?5",
        params![
            paid.to_string(),
            due.to_string(),
            inv_status.as_str(),
            mode,
            invoice_id
        ],
    )?;

    // The final payment above may have moved the payment-driven status, so
    // the guard is on the terminal states and the invoice link only.
    let changed = tx.execute(
        "UPDATE orders SET status='DELIVERED', actual_delivery=?1, invoice_id=?2
         WHERE id=?3 AND status NOT IN ('DELIVERED','CANCELLED') AND invoice_id IS NULL",
        params![date.to_string(), invoice_id, order_id],
    )?;
    if changed == 0 {
        return Err(SettleError::Conflict(format!(
            "order {} changed underneath the delivery; retry",
            order_id
        ))
        .into());
    }

    customers::bump_customer_totals(&tx, customer_id, due, total)?;
    tx.commit()?;
    println!(
        "Delivered order {}: invoice {} (due {})",
        order_id,
        invoice_no,
        fmt_money(&due)
    );
    Ok(invoice_id)
}

/// Payment mode summary for the generated invoice: Credit when nothing was
/// collected, the single mode when uniform, otherwise Split.
fn collected_mode(tx: &Connection, order_id: i64) -> Result<String> {
    let mut stmt =
        tx.prepare("SELECT DISTINCT mode FROM order_payments WHERE order_id=?1")?;
    let rows = stmt.query_map(params![order_id], |r| r.get::<_, String>(0))?;
    let mut modes = Vec::new();
    for m in rows {
        modes.push(m?);
    }
    Ok(match modes.len() {
        0 => PaymentMode::Credit.as_str().to_string(),
        1 => modes.remove(0),
        _ => PaymentMode::Split.as_str().to_string(),
    })
}

/// Edit a line on a non-terminal order and recompute its total. Rejected if
/// the new total would drop below what the customer has already paid.
pub fn patch_order_item(
    conn: &mut Connection,
    order_id: i64,
    item_id: i64,
    description: Option<String>,
    weight: Option<Decimal>,
    rate: Option<Decimal>,
    making: Option<Decimal>,
    wastage: Option<Decimal>,
    quantity: Option<i64>,
) -> Result<Decimal> {
    let tx = conn.transaction()?;
    let (total_s, paid_s, status_s): (String, String, String) = tx
        .query_row(
            "SELECT total_amount, paid_amount, status FROM orders WHERE id=?1",
            params![order_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?
        .ok_or_else(|| anyhow!("Order {} not found", order_id))?;
    let status: OrderStatus = status_s.parse()?;
    if status.is_terminal() {
        return Err(
            SettleError::Precondition(format!("order {} is {}", order_id, status_s)).into(),
        );
    }

    let row: Option<(String, String, String, String, String, i64, String)> = tx
        .query_row(
            "SELECT description, weight, rate, making_charge, wastage, quantity, line_total
             FROM order_items WHERE id=?1 AND order_id=?2",
            params![item_id, order_id],
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
        .optional()?;
    let (old_desc, w_s, r_s, m_s, ws_s, old_qty, old_lt_s) =
        row.ok_or_else(|| anyhow!("Item {} not found on order {}", item_id, order_id))?;

    let mut line = pricing::LineItem::new(
        rate.unwrap_or(dec_col(&r_s, "order_items.rate")?),
        weight.unwrap_or(dec_col(&w_s, "order_items.weight")?),
    );
    line.making_charge = making.unwrap_or(dec_col(&m_s, "order_items.making_charge")?);
    line.wastage = wastage.unwrap_or(dec_col(&ws_s, "order_items.wastage")?);
    line.quantity = quantity.unwrap_or(old_qty);
    let new_line_total = pricing::line_total(&line)?;

    let old_total = dec_col(&total_s, "orders.total_amount")?;
    let old_line_total = dec_col(&old_lt_s, "order_items.line_total")?;
    let new_total = pricing::round_money(old_total - old_line_total + new_line_total);
    let paid = dec_col(&paid_s, "orders.paid_amount")?;
    if new_total < paid {
        return Err(SettleError::Precondition(format!(
            "new total {} is below the {} already collected on order {}",
            new_total, paid, order_id
        ))
        .into());
    }

    tx.execute(
        "UPDATE order_items SET description=?1, weight=?2, rate=?3, making_charge=?4,
             wastage=?5, quantity=?6, line_total=?7
         WHERE id=?8",
        params![
            description.unwrap_or(old_desc),
            line.weight.to_string(),
            line.rate.to_string(),
            line.making_charge.to_string(),
            line.wastage.to_string(),
            line.quantity,
            new_line_total.to_string(),
            item_id
        ],
    )?;
    let new_status = match status {
        OrderStatus::Pending | OrderStatus::PartiallyPaid => {
            pricing::derive_order_payment_status(new_total - paid, new_total)
        }
        other => other,
    };
    let changed = tx.execute(
        "UPDATE orders SET total_amount=?1, status=?2 WHERE id=?3 AND total_amount=?4",
        params![new_total.to_string(), new_status.as_str(), order_id, total_s],
    )?;
    if changed == 0 {
        return Err(SettleError::Conflict(format!(
            "order {} total changed underneath the edit; retry",
            order_id
        ))
        .into());
    }
    tx.commit()?;
    Ok(new_total)
}

// ---- CLI glue -------------------------------------------------------------

fn create(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = today(conn)?;
    let customer_id = id_for_customer(conn, sub.get_one::<String>("customer").unwrap())?;
    let mut items = Vec::new();
    if let Some(vals) = sub.get_many::<String>("item") {
        for v in vals {
            items.push(invoices::parse_free_item(v)?);
        }
    }
    if let Some(vals) = sub.get_many::<String>("product-item") {
        for v in vals {
            items.push(invoices::parse_product_item(conn, v, date)?);
        }
    }
    let expected = sub
        .get_one::<String>("expected")
        .map(|s| parse_date(s))
        .transpose()?;
    let advance = sub
        .get_one::<String>("advance")
        .map(|s| -> Result<invoices::PaymentReq> {
            invoices::payment_from_args(sub, parse_decimal(s)?)
        })
        .transpose()?;
    create_order(
        conn,
        OrderDraft {
            customer_id,
            items,
            expected,
            advance,
            date,
            performed_by: "shop".into(),
        },
    )?;
    Ok(())
}

fn pay(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let order_id = id_for_order(conn, sub.get_one::<String>("order").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let req = invoices::payment_from_args(sub, amount)?;
    let date = today(conn)?;
    apply_order_payment(
        conn,
        order_id,
        req.amount,
        req.mode,
        req.parts,
        PaymentKind::Partial,
        date,
        "shop",
    )?;
    println!("Recorded {} against order {}", fmt_money(&amount), order_id);
    Ok(())
}

fn deliver(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let order_id = id_for_order(conn, sub.get_one::<String>("order").unwrap())?;
    let final_payment = sub
        .get_one::<String>("amount")
        .map(|s| -> Result<invoices::PaymentReq> {
            invoices::payment_from_args(sub, parse_decimal(s)?)
        })
        .transpose()?;
    let date = today(conn)?;
    deliver_order(conn, order_id, final_payment, date, "shop")?;
    Ok(())
}

fn edit_item(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let order_id = id_for_order(conn, sub.get_one::<String>("order").unwrap())?;
    let item_id: i64 = sub.get_one::<String>("item-id").unwrap().parse()?;
    let new_total = patch_order_item(
        conn,
        order_id,
        item_id,
        sub.get_one::<String>("description").cloned(),
        sub.get_one::<String>("weight").map(|s| parse_decimal(s)).transpose()?,
        sub.get_one::<String>("rate").map(|s| parse_decimal(s)).transpose()?,
        sub.get_one::<String>("making").map(|s| parse_decimal(s)).transpose()?,
        sub.get_one::<String>("wastage").map(|s| parse_decimal(s)).transpose()?,
        sub.get_one::<i64>("qty").copied(),
    )?;
    println!("Order {} total is now {}", order_id, fmt_money(&new_total));
    Ok(())
}

#[derive(Serialize)]
pub struct OrderRow {
    pub order_no: String,
    pub customer: String,
    pub total: String,
    pub paid: String,
    pub remaining: String,
    pub status: String,
    pub expected: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<OrderRow>> {
    let mut sql = String::from(
        "SELECT order_no, customer_name, total_amount, paid_amount, status,
                IFNULL(expected_delivery,'') FROM orders WHERE 1=1",
    );
    let mut binds: Vec<String> = Vec::new();
    if let Some(st) = sub.get_one::<String>("status") {
        sql.push_str(" AND status=?");
        binds.push(st.clone());
    }
    sql.push_str(" ORDER BY id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let bind_refs: Vec<&dyn rusqlite::ToSql> =
        binds.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(bind_refs))?;
    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let total_s: String = r.get(2)?;
        let paid_s: String = r.get(3)?;
        let total = dec_col(&total_s, "orders.total_amount")?;
        let paid = dec_col(&paid_s, "orders.paid_amount")?;
        data.push(OrderRow {
            order_no: r.get(0)?,
            customer: r.get(1)?,
            total: total_s,
            paid: paid_s,
            remaining: (total - paid).to_string(),
            status: r.get(4)?,
            expected: r.get(5)?,
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
                    r.order_no.clone(),
                    r.customer.clone(),
                    r.total.clone(),
                    r.paid.clone(),
                    r.remaining.clone(),
                    r.status.clone(),
                    r.expected.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["No", "Customer", "Total", "Paid", "Remaining", "Status", "Expected"],
                rows
            )
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = id_for_order(conn, sub.get_one::<String>("order").unwrap())?;
    let head: (String, String, String, String, Option<i64>) = conn.query_row(
        "SELECT order_no, total_amount, paid_amount, status, invoice_id FROM orders WHERE id=?1",
        params![id],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
    )?;
    let mut stmt = conn.prepare(
        "SELECT id, description, weight, rate, making_charge, wastage, quantity, line_total
         FROM order_items WHERE order_id=?1 ORDER BY id",
    )?;
    let items = stmt.query_map(params![id], |r| {
        Ok(vec![
            r.get::<_, i64>(0)?.to_string(),
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, i64>(6)?.to_string(),
            r.get::<_, String>(7)?,
        ])
    })?;
    let mut rows = Vec::new();
    for it in items {
        rows.push(it?);
    }
    if sub.get_flag("json") || sub.get_flag("jsonl") {
        let v = serde_json::json!({
            "order_no": head.0, "total": head.1, "paid": head.2, "status": head.3,
            "invoice_id": head.4, "items": rows,
        });
        maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &v)?;
        return Ok(());
    }
    println!(
        "{}",
        pretty_table(
            &["Id", "Item", "Weight", "Rate", "Making", "Wastage", "Qty", "Line total"],
            rows
        )
    );
    println!(
        "{}: total {}, paid {}, status {}{}",
        head.0,
        head.1,
        head.2,
        head.3,
        head.4
            .map(|i| format!(", invoice id {}", i))
            .unwrap_or_default()
    );
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

pub fn fmt_money(d: &Decimal) -> String {
    format!("₹{:.2}", d)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

/// Look a customer up by phone first, then by exact name.
pub fn id_for_customer(conn: &Connection, key: &str) -> Result<i64> {
    let by_phone: Option<i64> = conn
        .query_row("SELECT id FROM customers WHERE phone=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    if let Some(id) = by_phone {
        return Ok(id);
    }
    let mut stmt = conn.prepare("SELECT id FROM customers WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![key], |r| r.get(0))
        .with_context(|| format!("Customer '{}' not found", key))?;
    Ok(id)
}

pub fn id_for_product(conn: &Connection, sku: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM products WHERE sku=?1")?;
    let id: i64 = stmt
        .query_row(params![sku], |r| r.get(0))
        .with_context(|| format!("Product '{}' not found", sku))?;
    Ok(id)
}

/// Accept a numeric row id or a human-readable document number.
pub fn id_for_invoice(conn: &Connection, key: &str) -> Result<i64> {
    if let Ok(id) = key.parse::<i64>() {
        return Ok(id);
    }
    let mut stmt = conn.prepare("SELECT id FROM invoices WHERE invoice_no=?1")?;
    let id: i64 = stmt
        .query_row(params![key], |r| r.get(0))
        .with_context(|| format!("Invoice '{}' not found", key))?;
    Ok(id)
}

pub fn id_for_order(conn: &Connection, key: &str) -> Result<i64> {
    if let Ok(id) = key.parse::<i64>() {
        return Ok(id);
    }
    let mut stmt = conn.prepare("SELECT id FROM orders WHERE order_no=?1")?;
    let id: i64 = stmt
        .query_row(params![key], |r| r.get(0))
        .with_context(|| format!("Order '{}' not found", key))?;
    Ok(id)
}

/// Validate the per-mode breakdown of one payment. For Split the parts must
/// sum to `amount` exactly; a mismatch is an error, never corrected.
pub fn build_split(
    mode: crate::models::PaymentMode,
    amount: Decimal,
    cash: Option<Decimal>,
    upi: Option<Decimal>,
    card: Option<Decimal>,
) -> Result<crate::models::SplitParts> {
    use crate::errors::SettleError;
    use crate::models::{PaymentMode, SplitParts};
    match mode {
        PaymentMode::Cash => Ok(SplitParts {
            cash: amount,
            ..Default::default()
        }),
        PaymentMode::Upi => Ok(SplitParts {
            upi: amount,
            ..Default::default()
        }),
        PaymentMode::Card => Ok(SplitParts {
            card: amount,
            ..Default::default()
        }),
        PaymentMode::Split => {
            let parts = SplitParts {
                cash: cash.unwrap_or(Decimal::ZERO),
                upi: upi.unwrap_or(Decimal::ZERO),
                card: card.unwrap_or(Decimal::ZERO),
            };
            if parts.cash < Decimal::ZERO || parts.upi < Decimal::ZERO || parts.card < Decimal::ZERO
            {
                return Err(
                    SettleError::Validation("split parts must be non-negative".into()).into(),
                );
            }
            if parts.sum() != amount {
                return Err(SettleError::Validation(format!(
                    "split parts {} do not sum to payment amount {}",
                    parts.sum(),
                    amount
                ))
                .into());
            }
            Ok(parts)
        }
        PaymentMode::Credit => {
            Err(SettleError::Validation("'Credit' is unpaid, not a payment mode".into()).into())
        }
    }
}

/// Guard on a payment's per-mode breakdown, enforced where the payment is
/// applied so programmatic callers cannot persist a row whose parts disagree
/// with its amount or mode.
pub fn verify_parts(
    mode: crate::models::PaymentMode,
    amount: Decimal,
    parts: crate::models::SplitParts,
) -> Result<()> {
    use crate::errors::SettleError;
    use crate::models::PaymentMode;
    if parts.cash < Decimal::ZERO || parts.upi < Decimal::ZERO || parts.card < Decimal::ZERO {
        return Err(SettleError::Validation("split parts must be non-negative".into()).into());
    }
    if parts.sum() != amount {
        return Err(SettleError::Validation(format!(
            "split parts {} do not sum to payment amount {}",
            parts.sum(),
            amount
        ))
        .into());
    }
    let off_mode = match mode {
        PaymentMode::Cash => parts.upi + parts.card,
        PaymentMode::Upi => parts.cash + parts.card,
        PaymentMode::Card => parts.cash + parts.upi,
        PaymentMode::Split => Decimal::ZERO,
        PaymentMode::Credit => {
            return Err(
                SettleError::Validation("'Credit' is unpaid, not a payment mode".into()).into(),
            )
        }
    };
    if !off_mode.is_zero() {
        return Err(SettleError::Validation(format!(
            "breakdown carries money outside the declared mode {}",
            mode.as_str()
        ))
        .into());
    }
    Ok(())
}

/// Parse a TEXT money/decimal column fetched from sqlite.
pub fn dec_col(s: &str, what: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid stored decimal '{}' for {}", s, what))
}

/// Next human-readable document number from a settings-table counter,
/// e.g. `INV-0042`. Must be called inside the caller's transaction so the
/// counter bump commits or rolls back with the document.
pub fn next_doc_number(conn: &Connection, key: &str, prefix: &str) -> Result<String> {
    let cur: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    let next: i64 = match cur {
        Some(s) => s
            .parse::<i64>()
            .with_context(|| format!("Invalid counter '{}' for {}", s, key))?
            + 1,
        None => 1,
    };
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, next.to_string()],
    )?;
    Ok(format!("{}-{:04}", prefix, next))
}

/// Latest rate snapshot on or before `date`: (24K, 22K, 18K).
pub fn rates_on_or_before(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Option<(Decimal, Decimal, Decimal)>> {
    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT rate_24k, rate_22k, rate_18k FROM gold_rates
             WHERE date<=?1 ORDER BY date DESC LIMIT 1",
            params![date.to_string()],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    match row {
        Some((a, b, c)) => Ok(Some((
            dec_col(&a, "rate_24k")?,
            dec_col(&b, "rate_22k")?,
            dec_col(&c, "rate_18k")?,
        ))),
        None => Ok(None),
    }
}

/// The day's rates serialized for storage on a document, so the snapshot is
/// self-describing: `{"rate24K":..,"rate22K":..,"rate18K":..}`.
pub fn rate_snapshot_json(conn: &Connection, date: NaiveDate) -> Result<Option<String>> {
    Ok(rates_on_or_before(conn, date)?.map(|(r24, r22, r18)| {
        serde_json::json!({
            "rate24K": r24.to_string(),
            "rate22K": r22.to_string(),
            "rate18K": r18.to_string(),
        })
        .to_string()
    }))
}

pub fn today(conn: &Connection) -> Result<NaiveDate> {
    // Test databases can pin the clock via settings.
    let pinned: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='today_override'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    match pinned {
        Some(s) => parse_date(&s),
        None => Ok(chrono::Utc::now().date_naive()),
    }
}

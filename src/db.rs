// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Sonabook", "sonabook"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("sonabook.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

/// Creates the full schema. Also used by the integration tests against an
/// in-memory connection.
pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS customers(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        phone TEXT NOT NULL UNIQUE,
        email TEXT,
        address TEXT,
        credit_limit TEXT NOT NULL DEFAULT '0',
        total_due TEXT NOT NULL DEFAULT '0',
        total_purchases TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS products(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sku TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT 'Gold',
        weight TEXT NOT NULL DEFAULT '0',
        stock_qty INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- Daily rate snapshots; documents copy the rate at creation and never
    -- re-read it.
    CREATE TABLE IF NOT EXISTS gold_rates(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL UNIQUE,
        rate_24k TEXT NOT NULL,
        rate_22k TEXT NOT NULL,
        rate_18k TEXT NOT NULL,
        silver_rate TEXT NOT NULL DEFAULT '0'
    );

    CREATE TABLE IF NOT EXISTS invoices(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        invoice_no TEXT NOT NULL UNIQUE,
        customer_id INTEGER NOT NULL,
        subtotal TEXT NOT NULL,
        discount TEXT NOT NULL DEFAULT '0',
        exchange_amount TEXT NOT NULL DEFAULT '0',
        gst TEXT NOT NULL DEFAULT '0',
        total TEXT NOT NULL,
        paid_amount TEXT NOT NULL DEFAULT '0',
        due_amount TEXT NOT NULL,
        payment_mode TEXT NOT NULL DEFAULT 'Credit',
        status TEXT NOT NULL DEFAULT 'Pending',
        rate_snapshot TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(customer_id) REFERENCES customers(id)
    );
    CREATE INDEX IF NOT EXISTS idx_invoices_customer ON invoices(customer_id);

    CREATE TABLE IF NOT EXISTS invoice_items(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        invoice_id INTEGER NOT NULL,
        product_id INTEGER,
        description TEXT NOT NULL,
        weight TEXT NOT NULL DEFAULT '0',
        rate TEXT NOT NULL DEFAULT '0',
        making_charge TEXT NOT NULL DEFAULT '0',
        wastage TEXT NOT NULL DEFAULT '0',
        discount TEXT NOT NULL DEFAULT '0',
        gst TEXT NOT NULL DEFAULT '0',
        quantity INTEGER NOT NULL DEFAULT 1,
        line_total TEXT NOT NULL,
        FOREIGN KEY(invoice_id) REFERENCES invoices(id) ON DELETE CASCADE,
        FOREIGN KEY(product_id) REFERENCES products(id)
    );

    -- kind: SALE (taken at billing), CUSTOMER (later settlement).
    CREATE TABLE IF NOT EXISTS invoice_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        invoice_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        mode TEXT NOT NULL,
        cash_part TEXT NOT NULL DEFAULT '0',
        upi_part TEXT NOT NULL DEFAULT '0',
        card_part TEXT NOT NULL DEFAULT '0',
        kind TEXT NOT NULL DEFAULT 'SALE',
        paid_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(invoice_id) REFERENCES invoices(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS orders(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_no TEXT NOT NULL UNIQUE,
        customer_id INTEGER NOT NULL,
        customer_name TEXT NOT NULL,
        customer_phone TEXT NOT NULL,
        customer_email TEXT,
        total_amount TEXT NOT NULL,
        paid_amount TEXT NOT NULL DEFAULT '0',
        status TEXT NOT NULL DEFAULT 'PENDING',
        expected_delivery TEXT,
        actual_delivery TEXT,
        invoice_id INTEGER,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(customer_id) REFERENCES customers(id),
        FOREIGN KEY(invoice_id) REFERENCES invoices(id)
    );

    CREATE TABLE IF NOT EXISTS order_items(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_id INTEGER NOT NULL,
        product_id INTEGER,
        description TEXT NOT NULL,
        weight TEXT NOT NULL DEFAULT '0',
        rate TEXT NOT NULL DEFAULT '0',
        making_charge TEXT NOT NULL DEFAULT '0',
        wastage TEXT NOT NULL DEFAULT '0',
        quantity INTEGER NOT NULL DEFAULT 1,
        line_total TEXT NOT NULL,
        FOREIGN KEY(order_id) REFERENCES orders(id) ON DELETE CASCADE,
        FOREIGN KEY(product_id) REFERENCES products(id)
    );

    CREATE TABLE IF NOT EXISTS order_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_id INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('ADVANCE','PARTIAL','FINAL')),
        amount TEXT NOT NULL,
        mode TEXT NOT NULL,
        cash_part TEXT NOT NULL DEFAULT '0',
        upi_part TEXT NOT NULL DEFAULT '0',
        card_part TEXT NOT NULL DEFAULT '0',
        paid_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(order_id) REFERENCES orders(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS old_gold(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL,
        category TEXT NOT NULL DEFAULT 'Gold',
        weight TEXT NOT NULL,
        purity TEXT NOT NULL,
        rate TEXT NOT NULL,
        total_value TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'Pending',
        adjusted_invoice_id INTEGER,
        adjusted_amount TEXT,
        payout_mode TEXT,
        -- Date the record was adjusted or paid out; intake is created_at.
        settled_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(customer_id) REFERENCES customers(id),
        FOREIGN KEY(adjusted_invoice_id) REFERENCES invoices(id)
    );

    CREATE TABLE IF NOT EXISTS purchases(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        supplier TEXT NOT NULL,
        description TEXT,
        amount TEXT NOT NULL,
        mode TEXT NOT NULL,
        date TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS expenses(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        amount TEXT NOT NULL,
        mode TEXT NOT NULL,
        date TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS supplier_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        supplier TEXT NOT NULL,
        amount TEXT NOT NULL,
        mode TEXT NOT NULL,
        date TEXT NOT NULL
    );

    -- One audit record per clear-dues run.
    CREATE TABLE IF NOT EXISTS customer_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        mode TEXT NOT NULL,
        date TEXT NOT NULL,
        FOREIGN KEY(customer_id) REFERENCES customers(id)
    );

    -- Append-only money ledger. type ADJUST marks non-cash settlements
    -- (old-gold netting) which cash totals must skip. The uniqueness on
    -- (ref_model, ref_id, category) is what makes backfill idempotent.
    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        type TEXT NOT NULL CHECK(type IN ('CREDIT','DEBIT','ADJUST')),
        category TEXT NOT NULL,
        amount TEXT NOT NULL,
        mode TEXT NOT NULL,
        ref_model TEXT NOT NULL,
        ref_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        performed_by TEXT NOT NULL DEFAULT 'shop',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(ref_model, ref_id, category)
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
    "#,
    )?;
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Catalog stock. Decrements happen inside the billing/delivery
//! transactions; this module only adds and replenishes.

use crate::errors::SettleError;
use crate::utils::{id_for_product, maybe_print_json, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::{params, Connection};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("restock", sub)) => restock(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let sku = sub.get_one::<String>("sku").unwrap();
    let name = sub.get_one::<String>("name").unwrap();
    let category = sub.get_one::<String>("category").unwrap();
    let weight = parse_decimal(sub.get_one::<String>("weight").unwrap())?;
    let stock: i64 = sub
        .get_one::<String>("stock")
        .unwrap()
        .parse()
        .map_err(|_| SettleError::Validation("stock must be a whole number".into()))?;
    if stock < 0 {
        return Err(SettleError::Validation("stock must be non-negative".into()).into());
    }
    conn.execute(
        "INSERT INTO products(sku, name, category, weight, stock_qty) VALUES (?1,?2,?3,?4,?5)",
        params![sku, name, category, weight.to_string(), stock],
    )?;
    println!("Added product {} '{}' (stock {})", sku, name, stock);
    Ok(())
}

fn restock(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = id_for_product(conn, sub.get_one::<String>("sku").unwrap())?;
    let qty: i64 = sub
        .get_one::<String>("qty")
        .unwrap()
        .parse()
        .map_err(|_| SettleError::Validation("qty must be a whole number".into()))?;
    if qty <= 0 {
        return Err(SettleError::Validation("restock qty must be positive".into()).into());
    }
    conn.execute(
        "UPDATE products SET stock_qty = stock_qty + ?1 WHERE id=?2",
        params![qty, id],
    )?;
    let now: i64 = conn.query_row(
        "SELECT stock_qty FROM products WHERE id=?1",
        params![id],
        |r| r.get(0),
    )?;
    println!("Restocked product {} (+{}, now {})", id, qty, now);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT sku, name, category, weight, stock_qty FROM products ORDER BY sku",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(vec![
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, i64>(4)?.to_string(),
        ])
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        println!(
            "{}",
            pretty_table(&["SKU", "Name", "Category", "Weight", "Stock"], data)
        );
    }
    Ok(())
}

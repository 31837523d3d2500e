// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Daily metal rate snapshots. Setting the same date twice overwrites; the
//! documents that copied an earlier rate keep their copy.

use crate::utils::{maybe_print_json, parse_date, parse_decimal, pretty_table, today};
use anyhow::Result;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = match sub.get_one::<String>("date") {
        Some(s) => parse_date(s)?,
        None => today(conn)?,
    };
    let r24 = parse_decimal(sub.get_one::<String>("rate-24k").unwrap())?;
    let r22 = parse_decimal(sub.get_one::<String>("rate-22k").unwrap())?;
    let r18 = parse_decimal(sub.get_one::<String>("rate-18k").unwrap())?;
    let silver = sub
        .get_one::<String>("silver")
        .map(|s| parse_decimal(s))
        .transpose()?
        .unwrap_or(Decimal::ZERO);
    conn.execute(
        "INSERT INTO gold_rates(date, rate_24k, rate_22k, rate_18k, silver_rate)
         VALUES (?1,?2,?3,?4,?5)
         ON CONFLICT(date) DO UPDATE SET
             rate_24k=excluded.rate_24k, rate_22k=excluded.rate_22k,
             rate_18k=excluded.rate_18k, silver_rate=excluded.silver_rate",
        params![
            date.to_string(),
            r24.to_string(),
            r22.to_string(),
            r18.to_string(),
            silver.to_string()
        ],
    )?;
    println!("Rates for {}: 24K {}, 22K {}, 18K {}", date, r24, r22, r18);
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT date, rate_24k, rate_22k, rate_18k, silver_rate
         FROM gold_rates ORDER BY date DESC LIMIT 30",
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
            pretty_table(&["Date", "24K", "22K", "18K", "Silver"], data)
        );
    }
    Ok(())
}

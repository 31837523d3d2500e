// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use sonabook::{cli, commands, db};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("customer", sub)) => commands::customers::handle(&mut conn, sub)?,
        Some(("product", sub)) => commands::products::handle(&mut conn, sub)?,
        Some(("rates", sub)) => commands::rates::handle(&mut conn, sub)?,
        Some(("invoice", sub)) => commands::invoices::handle(&mut conn, sub)?,
        Some(("order", sub)) => commands::orders::handle(&mut conn, sub)?,
        Some(("oldgold", sub)) => commands::oldgold::handle(&mut conn, sub)?,
        Some(("spend", sub)) => commands::spend::handle(&mut conn, sub)?,
        Some(("ledger", sub)) => commands::ledger::handle(&mut conn, sub)?,
        Some(("report", sub)) => commands::reports::handle(&mut conn, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}

// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

fn payment_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("mode").long("mode").default_value("Cash").help(
        "Payment mode: Cash|UPI|Card|Split",
    ))
    .arg(Arg::new("cash").long("cash").help("Cash part of a Split payment"))
    .arg(Arg::new("upi").long("upi").help("UPI part of a Split payment"))
    .arg(Arg::new("card").long("card").help("Card part of a Split payment"))
}

fn item_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("item")
            .long("item")
            .action(ArgAction::Append)
            .help("Free-form item: 'description,weight,rate[,making[,wastage]]' (repeatable)"),
    )
    .arg(
        Arg::new("product-item")
            .long("product-item")
            .action(ArgAction::Append)
            .help("Catalog item: 'SKU,qty[,rate]' (repeatable; rate defaults to latest 22K)"),
    )
}

pub fn build_cli() -> Command {
    Command::new("sonabook")
        .about("Jewellery shop billing, settlement, and cash ledger")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("customer")
                .about("Customers and arrears")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("phone").long("phone").required(true))
                        .arg(Arg::new("email").long("email"))
                        .arg(Arg::new("address").long("address"))
                        .arg(Arg::new("credit-limit").long("credit-limit")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("show")
                        .arg(Arg::new("customer").long("customer").required(true)),
                )
                .subcommand(payment_args(
                    Command::new("clear-dues")
                        .about("Pay down a customer's outstanding dues, oldest invoice first")
                        .arg(Arg::new("customer").long("customer").required(true))
                        .arg(Arg::new("amount").long("amount").required(true)),
                )),
        )
        .subcommand(
            Command::new("product")
                .about("Catalog stock")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("sku").long("sku").required(true))
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("category").long("category").default_value("Gold"))
                        .arg(Arg::new("weight").long("weight").default_value("0"))
                        .arg(Arg::new("stock").long("stock").default_value("0")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(
                    Command::new("restock")
                        .arg(Arg::new("sku").long("sku").required(true))
                        .arg(Arg::new("qty").long("qty").required(true)),
                ),
        )
        .subcommand(
            Command::new("rates")
                .about("Daily gold/silver rate snapshots")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("rate-24k").long("rate-24k").required(true))
                        .arg(Arg::new("rate-22k").long("rate-22k").required(true))
                        .arg(Arg::new("rate-18k").long("rate-18k").required(true))
                        .arg(Arg::new("silver").long("silver")),
                )
                .subcommand(json_flags(Command::new("show"))),
        )
        .subcommand(
            Command::new("invoice")
                .about("Billing and invoice settlement")
                .subcommand(payment_args(item_args(
                    Command::new("create")
                        .arg(Arg::new("customer").long("customer").required(true))
                        .arg(Arg::new("discount").long("discount").default_value("0"))
                        .arg(Arg::new("gst").long("gst").default_value("0"))
                        .arg(
                            Arg::new("exchange-record")
                                .long("exchange-record")
                                .help("Pending old-gold record to net against this invoice"),
                        )
                        .arg(
                            Arg::new("exchange-amount")
                                .long("exchange-amount")
                                .help("Portion of the record's value to apply (default: all usable)"),
                        )
                        .arg(Arg::new("paid").long("paid").help("Amount collected at billing")),
                )))
                .subcommand(payment_args(
                    Command::new("pay")
                        .arg(Arg::new("invoice").long("invoice").required(true))
                        .arg(Arg::new("amount").long("amount").required(true)),
                ))
                .subcommand(
                    Command::new("cancel")
                        .arg(Arg::new("invoice").long("invoice").required(true)),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(Arg::new("customer").long("customer"))
                        .arg(Arg::new("status").long("status"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(clap::value_parser!(usize)),
                        ),
                ))
                .subcommand(json_flags(
                    Command::new("show")
                        .arg(Arg::new("invoice").long("invoice").required(true)),
                )),
        )
        .subcommand(
            Command::new("order")
                .about("Custom orders: advances, delivery, conversion to invoice")
                .subcommand(payment_args(item_args(
                    Command::new("create")
                        .arg(Arg::new("customer").long("customer").required(true))
                        .arg(
                            Arg::new("expected")
                                .long("expected")
                                .help("Expected delivery date YYYY-MM-DD"),
                        )
                        .arg(Arg::new("advance").long("advance").help("Advance collected now")),
                )))
                .subcommand(payment_args(
                    Command::new("pay")
                        .arg(Arg::new("order").long("order").required(true))
                        .arg(Arg::new("amount").long("amount").required(true)),
                ))
                .subcommand(
                    Command::new("mark-ready")
                        .arg(Arg::new("order").long("order").required(true)),
                )
                .subcommand(payment_args(
                    Command::new("deliver")
                        .arg(Arg::new("order").long("order").required(true))
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .help("Final payment collected at delivery"),
                        ),
                ))
                .subcommand(
                    Command::new("edit-item")
                        .arg(Arg::new("order").long("order").required(true))
                        .arg(Arg::new("item-id").long("item-id").required(true))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("weight").long("weight"))
                        .arg(Arg::new("rate").long("rate"))
                        .arg(Arg::new("making").long("making"))
                        .arg(Arg::new("wastage").long("wastage"))
                        .arg(
                            Arg::new("qty")
                                .long("qty")
                                .value_parser(clap::value_parser!(i64)),
                        ),
                )
                .subcommand(
                    Command::new("cancel")
                        .arg(Arg::new("order").long("order").required(true)),
                )
                .subcommand(json_flags(
                    Command::new("list").arg(Arg::new("status").long("status")),
                ))
                .subcommand(json_flags(
                    Command::new("show").arg(Arg::new("order").long("order").required(true)),
                )),
        )
        .subcommand(
            Command::new("oldgold")
                .about("Old-metal exchange ledger")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("customer").long("customer").required(true))
                        .arg(Arg::new("category").long("category").default_value("Gold"))
                        .arg(Arg::new("weight").long("weight").required(true))
                        .arg(Arg::new("purity").long("purity").required(true))
                        .arg(Arg::new("rate").long("rate").required(true)),
                )
                .subcommand(
                    Command::new("adjust")
                        .about("Net a pending record against an open invoice (single-shot)")
                        .arg(Arg::new("record").long("record").required(true))
                        .arg(Arg::new("invoice").long("invoice").required(true))
                        .arg(Arg::new("amount").long("amount").required(true)),
                )
                .subcommand(
                    Command::new("payout")
                        .about("Buy the metal outright for cash")
                        .arg(Arg::new("record").long("record").required(true))
                        .arg(Arg::new("mode").long("mode").default_value("Cash")),
                )
                .subcommand(json_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("spend")
                .about("Outgoing money: stock purchases, expenses, supplier payments")
                .subcommand(
                    Command::new("purchase")
                        .arg(Arg::new("supplier").long("supplier").required(true))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("mode").long("mode").default_value("Cash"))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(
                    Command::new("expense")
                        .arg(Arg::new("description").long("description").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("mode").long("mode").default_value("Cash"))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(
                    Command::new("supplier-payment")
                        .arg(Arg::new("supplier").long("supplier").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("mode").long("mode").default_value("Cash"))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(json_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("ledger")
                .about("Append-only transaction ledger and cashbook projection")
                .subcommand(json_flags(
                    Command::new("cashbook")
                        .arg(Arg::new("from").long("from"))
                        .arg(Arg::new("to").long("to")),
                ))
                .subcommand(json_flags(
                    Command::new("list").arg(
                        Arg::new("limit")
                            .long("limit")
                            .value_parser(clap::value_parser!(usize)),
                    ),
                ))
                .subcommand(
                    Command::new("backfill")
                        .about("One-shot idempotent backfill of ledger rows from documents"),
                )
                .subcommand(
                    Command::new("export")
                        .arg(Arg::new("format").long("format").default_value("csv"))
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Dashboard stats and receivables aging")
                .subcommand(json_flags(Command::new("dashboard")))
                .subcommand(json_flags(Command::new("aging"))),
        )
        .subcommand(Command::new("doctor").about("Consistency audit; reports, never repairs"))
}

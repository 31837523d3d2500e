// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use sonabook::models::{InvoiceStatus, OrderStatus};
use sonabook::pricing;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn line_subtotal_formula() {
    let mut line = pricing::LineItem::new(d("1000"), d("10"));
    line.making_charge = d("500");
    line.wastage = d("200");
    line.discount = d("300");
    line.old_gold_adjustment = d("400");
    // 1000*10*1 + 500 + 200 - 300 - 400
    assert_eq!(pricing::line_subtotal(&line).unwrap(), d("10000"));
}

#[test]
fn line_total_adds_gst() {
    let mut line = pricing::LineItem::new(d("1000"), d("10"));
    line.gst = d("300");
    assert_eq!(pricing::line_total(&line).unwrap(), d("10300"));
}

#[test]
fn quantity_multiplies_metal_value_only() {
    let mut line = pricing::LineItem::new(d("100"), d("2"));
    line.quantity = 3;
    line.making_charge = d("50");
    // 100*2*3 + 50, making charge is per line not per unit
    assert_eq!(pricing::line_subtotal(&line).unwrap(), d("650"));
}

#[test]
fn negative_inputs_rejected() {
    assert!(pricing::line_subtotal(&pricing::LineItem::new(d("-1"), d("10"))).is_err());
    assert!(pricing::line_subtotal(&pricing::LineItem::new(d("1"), d("-10"))).is_err());
    let mut line = pricing::LineItem::new(d("1"), d("1"));
    line.quantity = 0;
    assert!(pricing::line_subtotal(&line).is_err());
}

#[test]
fn rounding_is_half_up() {
    assert_eq!(pricing::round_money(d("10.005")), d("10.01"));
    assert_eq!(pricing::round_money(d("10.004")), d("10.00"));
    assert_eq!(pricing::round_money(d("-10.005")), d("-10.01"));
}

#[test]
fn document_total_clamps_at_zero() {
    let lines = vec![d("100"), d("200")];
    assert_eq!(pricing::document_total(&lines, d("50"), d("0")), d("250"));
    assert_eq!(pricing::document_total(&lines, d("400"), d("0")), d("0"));
}

#[test]
fn invoice_total_identity() {
    // subtotal - discount - exchange + gst
    assert_eq!(
        pricing::invoice_total(d("10000"), d("500"), d("0"), d("300")),
        d("9800")
    );
    assert_eq!(
        pricing::invoice_total(d("100"), d("50"), d("100"), d("0")),
        d("0")
    );
}

#[test]
fn old_gold_value_uses_purity_fraction() {
    assert_eq!(
        pricing::old_gold_value(d("10"), d("5500"), d("100")).unwrap(),
        d("55000.00")
    );
    assert_eq!(
        pricing::old_gold_value(d("10"), d("6000"), d("91.6")).unwrap(),
        d("54960.00")
    );
}

#[test]
fn old_gold_value_validates_inputs() {
    assert!(pricing::old_gold_value(d("0"), d("5500"), d("100")).is_err());
    assert!(pricing::old_gold_value(d("10"), d("5500"), d("0")).is_err());
    assert!(pricing::old_gold_value(d("10"), d("5500"), d("101")).is_err());
}

#[test]
fn invoice_status_from_due() {
    assert_eq!(
        pricing::derive_invoice_status(d("0"), d("100")),
        InvoiceStatus::Paid
    );
    assert_eq!(
        pricing::derive_invoice_status(d("40"), d("100")),
        InvoiceStatus::Partial
    );
    assert_eq!(
        pricing::derive_invoice_status(d("100"), d("100")),
        InvoiceStatus::Pending
    );
}

#[test]
fn order_status_from_remaining() {
    assert_eq!(
        pricing::derive_order_payment_status(d("100"), d("100")),
        OrderStatus::Pending
    );
    assert_eq!(
        pricing::derive_order_payment_status(d("60"), d("100")),
        OrderStatus::PartiallyPaid
    );
}

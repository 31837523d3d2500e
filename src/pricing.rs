// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure pricing arithmetic. Everything monetary goes through `Decimal`;
//! stored amounts round to paise with round-half-up.

use crate::errors::SettleError;
use crate::models::{InvoiceStatus, OrderStatus};
use anyhow::Result;
use rust_decimal::{Decimal, RoundingStrategy};

/// Attributes of one line on an invoice or order.
#[derive(Debug, Clone, Default)]
pub struct LineItem {
    pub rate: Decimal,
    pub weight: Decimal,
    pub quantity: i64,
    pub making_charge: Decimal,
    pub wastage: Decimal,
    pub discount: Decimal,
    pub old_gold_adjustment: Decimal,
    pub gst: Decimal,
}

impl LineItem {
    pub fn new(rate: Decimal, weight: Decimal) -> Self {
        LineItem {
            rate,
            weight,
            quantity: 1,
            ..Default::default()
        }
    }
}

/// Round to the smallest currency unit, half away from zero.
pub fn round_money(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `rate×weight×qty + making + wastage − discount − old_gold_adjustment`.
pub fn line_subtotal(item: &LineItem) -> Result<Decimal> {
    if item.rate < Decimal::ZERO {
        return Err(SettleError::Validation(format!("negative rate {}", item.rate)).into());
    }
    if item.weight < Decimal::ZERO {
        return Err(SettleError::Validation(format!("negative weight {}", item.weight)).into());
    }
    if item.quantity <= 0 {
        return Err(SettleError::Validation(format!(
            "quantity must be positive, got {}",
            item.quantity
        ))
        .into());
    }
    let qty = Decimal::from(item.quantity);
    Ok(round_money(
        item.rate * item.weight * qty + item.making_charge + item.wastage
            - item.discount
            - item.old_gold_adjustment,
    ))
}

/// Line subtotal plus line GST.
pub fn line_total(item: &LineItem) -> Result<Decimal> {
    Ok(round_money(line_subtotal(item)? + item.gst))
}

/// Document total: `Σ(line_total) − discount − exchange_total`, clamped at
/// zero. The pre-clamp sum is what the invoice stores as `subtotal + gst`.
pub fn document_total(
    line_totals: &[Decimal],
    discount: Decimal,
    exchange_total: Decimal,
) -> Decimal {
    let sum: Decimal = line_totals.iter().copied().sum();
    let total = round_money(sum - discount - exchange_total);
    if total < Decimal::ZERO {
        Decimal::ZERO
    } else {
        total
    }
}

/// Invoice-level total: `subtotal − discount − exchange + gst`, clamped at
/// zero like `document_total`.
pub fn invoice_total(
    subtotal: Decimal,
    discount: Decimal,
    exchange_amount: Decimal,
    gst: Decimal,
) -> Decimal {
    let total = round_money(subtotal - discount - exchange_amount + gst);
    if total < Decimal::ZERO {
        Decimal::ZERO
    } else {
        total
    }
}

/// `weight × rate × purity/100`. Purity is a percentage in (0, 100].
pub fn old_gold_value(weight: Decimal, rate: Decimal, purity: Decimal) -> Result<Decimal> {
    if weight <= Decimal::ZERO || rate <= Decimal::ZERO {
        return Err(
            SettleError::Validation("old-gold weight and rate must be positive".into()).into(),
        );
    }
    if purity <= Decimal::ZERO || purity > Decimal::ONE_HUNDRED {
        return Err(SettleError::Validation(format!(
            "purity must be in (0, 100], got {}",
            purity
        ))
        .into());
    }
    Ok(round_money(weight * rate * purity / Decimal::ONE_HUNDRED))
}

/// The single authoritative invoice status derivation. Driven solely by the
/// due amount; the machine never regresses because payments only shrink it.
pub fn derive_invoice_status(due: Decimal, total: Decimal) -> InvoiceStatus {
    if due <= Decimal::ZERO {
        InvoiceStatus::Paid
    } else if due < total {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Pending
    }
}

/// Payment-driven part of the order machine. READY/DELIVERED/CANCELLED are
/// set explicitly and never overwritten here.
pub fn derive_order_payment_status(remaining: Decimal, total: Decimal) -> OrderStatus {
    if remaining < total {
        OrderStatus::PartiallyPaid
    } else {
        OrderStatus::Pending
    }
}

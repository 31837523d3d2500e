// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{anyhow, Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Cash,
    Upi,
    Card,
    Split,
    Credit,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "Cash",
            PaymentMode::Upi => "UPI",
            PaymentMode::Card => "Card",
            PaymentMode::Split => "Split",
            PaymentMode::Credit => "Credit",
        }
    }
}

impl FromStr for PaymentMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMode::Cash),
            "upi" => Ok(PaymentMode::Upi),
            "card" => Ok(PaymentMode::Card),
            "split" => Ok(PaymentMode::Split),
            "credit" => Ok(PaymentMode::Credit),
            other => Err(anyhow!(
                "Unknown payment mode '{}' (use Cash|UPI|Card|Split|Credit)",
                other
            )),
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Pending,
    Partial,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Partial => "Partial",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Cancelled)
    }
}

impl FromStr for InvoiceStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(InvoiceStatus::Pending),
            "Partial" => Ok(InvoiceStatus::Partial),
            "Paid" => Ok(InvoiceStatus::Paid),
            "Cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(anyhow!("Unknown invoice status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    PartiallyPaid,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::PartiallyPaid => "PARTIALLY_PAID",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl FromStr for OrderStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PARTIALLY_PAID" => Ok(OrderStatus::PartiallyPaid),
            "READY" => Ok(OrderStatus::Ready),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(anyhow!("Unknown order status '{}'", other)),
        }
    }
}

/// Tag on a payment row: where in the document's life the money came in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
    Sale,
    Customer,
    Advance,
    Partial,
    Final,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Sale => "SALE",
            PaymentKind::Customer => "CUSTOMER",
            PaymentKind::Advance => "ADVANCE",
            PaymentKind::Partial => "PARTIAL",
            PaymentKind::Final => "FINAL",
        }
    }
}

impl FromStr for PaymentKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SALE" => Ok(PaymentKind::Sale),
            "CUSTOMER" => Ok(PaymentKind::Customer),
            "ADVANCE" => Ok(PaymentKind::Advance),
            "PARTIAL" => Ok(PaymentKind::Partial),
            "FINAL" => Ok(PaymentKind::Final),
            other => Err(anyhow!("Unknown payment kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OldGoldStatus {
    Pending,
    Adjusted,
    PaidOut,
}

impl OldGoldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OldGoldStatus::Pending => "Pending",
            OldGoldStatus::Adjusted => "Adjusted",
            OldGoldStatus::PaidOut => "PaidOut",
        }
    }
}

impl FromStr for OldGoldStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(OldGoldStatus::Pending),
            "Adjusted" => Ok(OldGoldStatus::Adjusted),
            "PaidOut" => Ok(OldGoldStatus::PaidOut),
            other => Err(anyhow!("Unknown old-gold status '{}'", other)),
        }
    }
}

/// CREDIT/DEBIT move cash; ADJUST records a non-cash settlement and is
/// excluded from cash totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnType {
    Credit,
    Debit,
    Adjust,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Credit => "CREDIT",
            TxnType::Debit => "DEBIT",
            TxnType::Adjust => "ADJUST",
        }
    }
}

impl FromStr for TxnType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CREDIT" => Ok(TxnType::Credit),
            "DEBIT" => Ok(TxnType::Debit),
            "ADJUST" => Ok(TxnType::Adjust),
            other => Err(anyhow!("Unknown transaction type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnCategory {
    Sales,
    Purchase,
    Expense,
    SupplierPayment,
    CustomerPayment,
    OldGold,
    Advance,
}

impl TxnCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnCategory::Sales => "SALES",
            TxnCategory::Purchase => "PURCHASE",
            TxnCategory::Expense => "EXPENSE",
            TxnCategory::SupplierPayment => "SUPPLIER_PAYMENT",
            TxnCategory::CustomerPayment => "CUSTOMER_PAYMENT",
            TxnCategory::OldGold => "OLD_GOLD",
            TxnCategory::Advance => "ADVANCE",
        }
    }
}

impl FromStr for TxnCategory {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SALES" => Ok(TxnCategory::Sales),
            "PURCHASE" => Ok(TxnCategory::Purchase),
            "EXPENSE" => Ok(TxnCategory::Expense),
            "SUPPLIER_PAYMENT" => Ok(TxnCategory::SupplierPayment),
            "CUSTOMER_PAYMENT" => Ok(TxnCategory::CustomerPayment),
            "OLD_GOLD" => Ok(TxnCategory::OldGold),
            "ADVANCE" => Ok(TxnCategory::Advance),
            other => Err(anyhow!("Unknown transaction category '{}'", other)),
        }
    }
}

/// Typed reference from a ledger row to the document that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocRef {
    Invoice(i64),
    InvoicePayment(i64),
    OrderPayment(i64),
    OldGold(i64),
    Purchase(i64),
    Expense(i64),
    SupplierPayment(i64),
}

impl DocRef {
    pub fn as_parts(&self) -> (&'static str, i64) {
        match *self {
            DocRef::Invoice(id) => ("invoice", id),
            DocRef::InvoicePayment(id) => ("invoice_payment", id),
            DocRef::OrderPayment(id) => ("order_payment", id),
            DocRef::OldGold(id) => ("old_gold", id),
            DocRef::Purchase(id) => ("purchase", id),
            DocRef::Expense(id) => ("expense", id),
            DocRef::SupplierPayment(id) => ("supplier_payment", id),
        }
    }

    pub fn from_parts(model: &str, id: i64) -> Result<Self> {
        match model {
            "invoice" => Ok(DocRef::Invoice(id)),
            "invoice_payment" => Ok(DocRef::InvoicePayment(id)),
            "order_payment" => Ok(DocRef::OrderPayment(id)),
            "old_gold" => Ok(DocRef::OldGold(id)),
            "purchase" => Ok(DocRef::Purchase(id)),
            "expense" => Ok(DocRef::Expense(id)),
            "supplier_payment" => Ok(DocRef::SupplierPayment(id)),
            other => Err(anyhow!("Unknown ledger reference model '{}'", other)),
        }
    }
}

/// Per-mode breakdown of one payment. For single-mode payments the matching
/// column carries the full amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitParts {
    pub cash: Decimal,
    pub upi: Decimal,
    pub card: Decimal,
}

impl SplitParts {
    pub fn sum(&self) -> Decimal {
        self.cash + self.upi + self.card
    }
}

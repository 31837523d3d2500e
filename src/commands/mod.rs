// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod customers;
pub mod doctor;
pub mod invoices;
pub mod ledger;
pub mod oldgold;
pub mod orders;
pub mod products;
pub mod rates;
pub mod reports;
pub mod spend;

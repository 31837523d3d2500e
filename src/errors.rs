// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Failure classes for settlement operations. Commands surface these through
/// `anyhow`; tests downcast to assert the class.
#[derive(Debug, Error)]
pub enum SettleError {
    /// Malformed input, rejected before any write.
    #[error("validation: {0}")]
    Validation(String),

    /// The operation's precondition no longer holds (overpayment, terminal
    /// state, insufficient stock). No state was changed.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A balance changed under us between read and write. Retry with a
    /// fresh read.
    #[error("concurrency conflict: {0}")]
    Conflict(String),

    /// A materialized aggregate disagrees with its recomputation. Reported,
    /// never auto-corrected.
    #[error("consistency violation: {0}")]
    Consistency(String),
}

//! Ledger-facing data types shared by the yieldswap crates.
//!
//! Everything in this crate is pure: decoding loosely-typed instruction
//! records from HTTP services, bucketing them into instruction groups, and
//! validating base-unit amounts. Network I/O lives in `yieldswap-clients`.

#![allow(clippy::missing_errors_doc)]

pub mod amount;
pub mod codec;
pub mod error;
pub mod groups;

pub use amount::{require_positive, to_base_units, AmountUnit};
pub use codec::{decode, decode_all, encode, WireAccount, WireInstruction};
pub use error::CoreError;
pub use groups::{
  is_compute_budget, InstructionGroups, COMPUTE_BUDGET_PROGRAM_ID,
};

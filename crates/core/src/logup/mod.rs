// Copyright 2025 Irreducible Inc.

//! Log-derivative lookup compilation.
//!
//! An inclusion claim `S ⊂ T` is lowered into the cancellation identity
//!
//! ```text
//! Σ_k filter_k(i) / (S_k(i) + γ)  =  Σ_j M_j(i) / (T_j(i) + γ)
//! ```
//!
//! over a random offset γ: the prover commits one multiplicity column `M_j`
//! per table fragment, the fractions are accumulated in packed grand-sum `Z`
//! columns constrained row by row, and the verifier checks that the opened
//! final values of all `Z` columns add up to zero.
//!
//! Claims against the same table (same columns, same order) are compiled
//! once, sharing the table's multiplicities and coins.

mod capture;
mod compile;
mod error;
mod prover;
mod verify;
mod zctx;

pub use compile::{compile_lookups, LookupCompiler};
pub use error::Error;

#[cfg(test)]
mod tests;

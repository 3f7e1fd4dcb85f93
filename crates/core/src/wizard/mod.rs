// Copyright 2025 Irreducible Inc.

//! A minimal protocol-description layer: registries for committed columns,
//! verifier coins, polynomial constraints and local openings, plus prover and
//! verifier runtimes that play the registered rounds out over cleartext data.
//!
//! Compilation passes such as [`crate::logup`] consume the high-level queries
//! registered here and replace them with columns, constraints and actions.

mod coin;
mod column;
mod compiled;
mod error;
mod prover;
mod query;
mod validate;
mod verifier;

pub use coin::{Coin, CoinName};
pub use column::{Column, ColumnId, ColumnRef};
pub use compiled::{CompiledIop, ProverAction, VerifierAction};
pub use error::{Error, VerificationError};
pub use prover::{prove, ProverRuntime};
pub use query::{GlobalConstraint, Inclusion, LocalConstraint, LocalOpening, QueryId};
pub use validate::validate_witness;
pub use verifier::{verify, Proof, VerifierRuntime};

// Copyright 2025 Irreducible Inc.

//! Log-derivative lookup compiler for a polynomial-IOP ("wizard") pipeline.
//!
//! The [`wizard`] module carries the narrow runtime surface the compiler is
//! written against: column, coin and constraint registries, plus prover and
//! verifier runtimes. The [`logup`] module is the compiler itself: it lowers
//! inclusion claims into multiplicity columns, packed grand-sum columns and a
//! final cancellation check, following the log-derivative sum argument.

pub mod expression;
pub mod logup;
pub mod wizard;

#[cfg(test)]
mod expression_tests;

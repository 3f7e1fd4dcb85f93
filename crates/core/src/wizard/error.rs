// Copyright 2025 Irreducible Inc.

use crate::wizard::{CoinName, ColumnId, QueryId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("no column is registered under the id {0}")]
	ColumnNotRegistered(ColumnId),
	#[error("column {0} was assigned twice")]
	ColumnAlreadyAssigned(ColumnId),
	#[error("column {0} has no assignment")]
	ColumnNotAssigned(ColumnId),
	#[error("column {column} expects {expected} rows, got an assignment of {got}")]
	AssignmentSizeMismatch {
		column: ColumnId,
		expected: usize,
		got: usize,
	},
	#[error("coin {0} has not been sampled yet")]
	CoinNotSampled(CoinName),
	#[error("local opening {0} was assigned twice")]
	OpeningAlreadyAssigned(QueryId),
	#[error("local opening {0} has no assigned value")]
	OpeningNotAssigned(QueryId),
	#[error("constraint {name} is not satisfied at row {row}")]
	ConstraintNotSatisfied { name: QueryId, row: usize },
	#[error("local opening {name} disagrees with the column value at row {row}")]
	LocalOpeningMismatch { name: QueryId, row: usize },
	#[error("prover action at round {round} failed: {source}")]
	ProverAction {
		round: usize,
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},
}

/// Failures reported by verifier-side checks. These are returned to the
/// caller as values, never panicked: a bad proof is an expected input.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
	#[error("the proof carries no value for local opening {0}")]
	MissingOpening(QueryId),
	#[error("verifier check `{name}` failed: {reason}")]
	CheckFailed { name: String, reason: String },
}

// Copyright 2025 Irreducible Inc.

use crate::wizard::{self, ColumnId, QueryId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("inclusion {query} is malformed: {reason}")]
	MalformedInclusion { query: QueryId, reason: String },
	#[error("failed to sample collapsing randomness: {0}")]
	RandomnessSampling(String),
	#[error("filter column {column} is not binary at row {row}")]
	NonBinaryFilter { column: ColumnId, row: usize },
	#[error("row {row} of checked set {set} has no match in table {table}")]
	NotInTable {
		table: String,
		set: usize,
		row: usize,
	},
	#[error("prover task panicked: {0}")]
	TaskPanicked(String),
	#[error(transparent)]
	Wizard(#[from] wizard::Error),
}

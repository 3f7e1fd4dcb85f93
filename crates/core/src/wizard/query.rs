// Copyright 2025 Irreducible Inc.

use std::fmt::{self, Display};

use p3_field::Field;

use crate::{
	expression::Expression,
	wizard::{Column, ColumnRef},
};

/// Interned identifier of a query (constraint or opening).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryId(String);

impl QueryId {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Display for QueryId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for QueryId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for QueryId {
	fn from(s: String) -> Self {
		Self(s)
	}
}

/// Claim that every active row of `included` occurs in the `including` table.
///
/// The including table is a list of fragments of identical tuple width; each
/// fragment's columns share a row count, distinct fragments may differ. An
/// including-side filter (one 0/1 column per fragment) restricts which table
/// rows are usable; an included-side filter restricts which checked rows must
/// be found.
#[derive(Clone, Debug)]
pub struct Inclusion<F: Field> {
	pub name: QueryId,
	pub including: Vec<Vec<ColumnRef<F>>>,
	pub including_filters: Option<Vec<ColumnRef<F>>>,
	pub included: Vec<ColumnRef<F>>,
	pub included_filter: Option<ColumnRef<F>>,
	pub round: usize,
}

/// Polynomial identity holding on every row where no shifted leaf wraps.
#[derive(Debug)]
pub struct GlobalConstraint<F: Field> {
	pub name: QueryId,
	pub round: usize,
	pub size: usize,
	pub expr: Expression<F>,
}

/// Polynomial identity holding on row 0 only.
#[derive(Debug)]
pub struct LocalConstraint<F: Field> {
	pub name: QueryId,
	pub round: usize,
	pub size: usize,
	pub expr: Expression<F>,
}

/// Exposure of a single row of a committed column to the verifier.
#[derive(Clone, Debug)]
pub struct LocalOpening {
	pub name: QueryId,
	pub round: usize,
	pub column: Column,
	pub row: usize,
}

// Copyright 2025 Irreducible Inc.

use std::fmt::{self, Display};

use p3_field::Field;

/// Interned identifier of a registered column.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnId(String);

impl ColumnId {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Display for ColumnId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ColumnId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for ColumnId {
	fn from(s: String) -> Self {
		Self(s)
	}
}

/// Handle to a committed column: identity, commitment round and row count.
///
/// The physical storage and commitment of the column belong to the
/// surrounding runtime; this core only reads the shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
	id: ColumnId,
	round: usize,
	size: usize,
}

impl Column {
	pub(crate) fn new(id: ColumnId, round: usize, size: usize) -> Self {
		Self { id, round, size }
	}

	pub fn id(&self) -> &ColumnId {
		&self.id
	}

	pub fn round(&self) -> usize {
		self.round
	}

	pub fn size(&self) -> usize {
		self.size
	}
}

/// A column as referenced by an inclusion claim: either a committed column or
/// a constant column that exists only as a value repeated `size` times.
///
/// Constant columns let filter normalization prepend an all-ones column to a
/// checked tuple without committing anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnRef<F: Field> {
	Committed(Column),
	Constant { value: F, size: usize },
}

impl<F: Field> ColumnRef<F> {
	pub fn constant(value: F, size: usize) -> Self {
		Self::Constant { value, size }
	}

	pub fn size(&self) -> usize {
		match self {
			Self::Committed(column) => column.size(),
			Self::Constant { size, .. } => *size,
		}
	}

	pub fn round(&self) -> usize {
		match self {
			Self::Committed(column) => column.round(),
			Self::Constant { .. } => 0,
		}
	}

	/// A deterministic identifier, used for canonical table naming. Two
	/// constant columns with the same value and size get the same identifier.
	pub fn id(&self) -> ColumnId {
		match self {
			Self::Committed(column) => column.id().clone(),
			Self::Constant { value, size } => {
				ColumnId::from(format!("CONST_{value:?}_OVER_{size}"))
			}
		}
	}
}

impl<F: Field> From<Column> for ColumnRef<F> {
	fn from(column: Column) -> Self {
		Self::Committed(column)
	}
}

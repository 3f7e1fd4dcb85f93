// Copyright 2025 Irreducible Inc.

//! Symbolic expressions over committed columns and random coins.
//!
//! Expressions are immutable DAGs with reference-counted sharing: the lookup
//! compiler reuses the same table sub-expressions across many constraints, so
//! cloning an [`Expression`] only bumps an [`Arc`]. Evaluation is row-wise
//! against a [`WitnessSource`] and returns one field element per row.

use std::{
	fmt::{self, Display},
	ops::{Add, Mul, Neg, Sub},
	sync::Arc,
};

use p3_field::Field;

use crate::wizard::{Coin, Column, ColumnId, ColumnRef, Error};

/// Source of concrete witness data for expression evaluation.
///
/// Implemented by the prover runtime; tests may provide their own.
pub trait WitnessSource<F: Field> {
	fn column_values(&self, id: &ColumnId) -> Result<&[F], Error>;
	fn coin_value(&self, coin: &Coin) -> Result<F, Error>;
}

#[derive(Debug)]
enum Node<F: Field> {
	Constant(F),
	/// A committed column, cyclically shifted by `shift` rows.
	Column { column: Column, shift: isize },
	Coin(Coin),
	Add(Expression<F>, Expression<F>),
	Sub(Expression<F>, Expression<F>),
	Mul(Expression<F>, Expression<F>),
	Neg(Expression<F>),
}

/// A symbolic multivariate polynomial over columns and coins.
#[derive(Clone, Debug)]
pub struct Expression<F: Field> {
	node: Arc<Node<F>>,
}

impl<F: Field> Expression<F> {
	fn new(node: Node<F>) -> Self {
		Self {
			node: Arc::new(node),
		}
	}

	pub fn constant(value: F) -> Self {
		Self::new(Node::Constant(value))
	}

	pub fn zero() -> Self {
		Self::constant(F::ZERO)
	}

	pub fn one() -> Self {
		Self::constant(F::ONE)
	}

	pub fn column(column: &Column) -> Self {
		Self::new(Node::Column {
			column: column.clone(),
			shift: 0,
		})
	}

	/// The column rotated by `shift` rows, so that row `i` of the expression
	/// reads row `i + shift` of the column (cyclically).
	pub fn shifted(column: &Column, shift: isize) -> Self {
		Self::new(Node::Column {
			column: column.clone(),
			shift,
		})
	}

	pub fn coin(coin: &Coin) -> Self {
		Self::new(Node::Coin(coin.clone()))
	}

	/// Lifts a column reference: committed columns become variables, constant
	/// columns collapse to their constant value.
	pub fn from_ref(col_ref: &ColumnRef<F>) -> Self {
		match col_ref {
			ColumnRef::Committed(column) => Self::column(column),
			ColumnRef::Constant { value, .. } => Self::constant(*value),
		}
	}

	/// The total degree, counting every column leaf as degree 1 and coins as
	/// constants of the verifier.
	pub fn degree(&self) -> usize {
		match &*self.node {
			Node::Constant(_) | Node::Coin(_) => 0,
			Node::Column { .. } => 1,
			Node::Add(a, b) | Node::Sub(a, b) => a.degree().max(b.degree()),
			Node::Mul(a, b) => a.degree() + b.degree(),
			Node::Neg(a) => a.degree(),
		}
	}

	/// Minimum and maximum column shift appearing in the expression.
	///
	/// Constraint validation uses this to exclude the rows on which a shifted
	/// leaf wraps around the column boundary.
	pub fn shift_bounds(&self) -> (isize, isize) {
		match &*self.node {
			Node::Constant(_) | Node::Coin(_) => (0, 0),
			Node::Column { shift, .. } => (*shift, *shift),
			Node::Add(a, b) | Node::Sub(a, b) | Node::Mul(a, b) => {
				let (a_min, a_max) = a.shift_bounds();
				let (b_min, b_max) = b.shift_bounds();
				(a_min.min(b_min), a_max.max(b_max))
			}
			Node::Neg(a) => a.shift_bounds(),
		}
	}

	/// Evaluates the expression over `n_rows` rows.
	pub fn evaluate<S>(&self, n_rows: usize, src: &S) -> Result<Vec<F>, Error>
	where
		S: WitnessSource<F> + ?Sized,
	{
		let out = match &*self.node {
			Node::Constant(value) => vec![*value; n_rows],
			Node::Coin(coin) => vec![src.coin_value(coin)?; n_rows],
			Node::Column { column, shift } => {
				let values = src.column_values(column.id())?;
				if values.len() != n_rows {
					return Err(Error::AssignmentSizeMismatch {
						column: column.id().clone(),
						expected: n_rows,
						got: values.len(),
					});
				}
				if *shift == 0 {
					values.to_vec()
				} else {
					let n = n_rows as isize;
					(0..n)
						.map(|i| values[(i + shift).rem_euclid(n) as usize])
						.collect()
				}
			}
			Node::Add(a, b) => binary_op(a, b, n_rows, src, |x, y| x + y)?,
			Node::Sub(a, b) => binary_op(a, b, n_rows, src, |x, y| x - y)?,
			Node::Mul(a, b) => binary_op(a, b, n_rows, src, |x, y| x * y)?,
			Node::Neg(a) => {
				let mut vals = a.evaluate(n_rows, src)?;
				for v in vals.iter_mut() {
					*v = -*v;
				}
				vals
			}
		};
		Ok(out)
	}
}

fn binary_op<F: Field, S>(
	a: &Expression<F>,
	b: &Expression<F>,
	n_rows: usize,
	src: &S,
	op: impl Fn(F, F) -> F,
) -> Result<Vec<F>, Error>
where
	S: WitnessSource<F> + ?Sized,
{
	let mut lhs = a.evaluate(n_rows, src)?;
	let rhs = b.evaluate(n_rows, src)?;
	for (l, r) in lhs.iter_mut().zip(rhs) {
		*l = op(*l, r);
	}
	Ok(lhs)
}

impl<F: Field> Add for Expression<F> {
	type Output = Self;

	fn add(self, rhs: Self) -> Self {
		Self::new(Node::Add(self, rhs))
	}
}

impl<F: Field> Sub for Expression<F> {
	type Output = Self;

	fn sub(self, rhs: Self) -> Self {
		Self::new(Node::Sub(self, rhs))
	}
}

impl<F: Field> Mul for Expression<F> {
	type Output = Self;

	fn mul(self, rhs: Self) -> Self {
		Self::new(Node::Mul(self, rhs))
	}
}

impl<F: Field> Neg for Expression<F> {
	type Output = Self;

	fn neg(self) -> Self {
		Self::new(Node::Neg(self))
	}
}

impl<F: Field> Display for Expression<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &*self.node {
			Node::Constant(v) => write!(f, "{v:?}"),
			Node::Column { column, shift: 0 } => write!(f, "{}", column.id()),
			Node::Column { column, shift } => write!(f, "{}[{shift:+}]", column.id()),
			Node::Coin(coin) => write!(f, "{}", coin.name()),
			Node::Add(a, b) => write!(f, "({a} + {b})"),
			Node::Sub(a, b) => write!(f, "({a} - {b})"),
			Node::Mul(a, b) => write!(f, "({a} * {b})"),
			Node::Neg(a) => write!(f, "(-{a})"),
		}
	}
}

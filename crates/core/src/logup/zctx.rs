// Copyright 2025 Irreducible Inc.

use p3_field::Field;

use crate::{
	expression::Expression,
	logup::prover::ZAssignmentTask,
	wizard::{CompiledIop, QueryId},
};

/// One grand-sum bucket: every log-derivative term whose denominator coin is
/// sampled at `round` and whose column length is `size`.
///
/// `numerators[i] / denominators[i]` are parallel lists; terms from distinct
/// tables meet here, which is what makes a Z column shareable across lookups.
pub(super) struct ZCtx<F: Field> {
	pub round: usize,
	pub size: usize,
	pub numerators: Vec<Expression<F>>,
	pub denominators: Vec<Expression<F>>,
}

impl<F: Field> ZCtx<F> {
	pub fn new(round: usize, size: usize) -> Self {
		Self {
			round,
			size,
			numerators: Vec::new(),
			denominators: Vec::new(),
		}
	}

	pub fn push_term(&mut self, numerator: Expression<F>, denominator: Expression<F>) {
		self.numerators.push(numerator);
		self.denominators.push(denominator);
	}

	/// Packs the bucket's terms into groups of at most `arity` and registers
	/// one grand-sum column per group: a committed Z at `round + 1`, the row-0
	/// boundary constraint, the running-sum global constraint and a local
	/// opening of Z's last row.
	///
	/// Packing brings the terms of a group over a common denominator,
	///   `N = Σ_l num_l · Π_{m≠l} den_m`, `D = Π_l den_l`,
	/// so one Z accumulates `arity` fractions at the cost of one degree-`arity`
	/// constraint instead of `arity` columns.
	pub fn pack(
		&self,
		comp: &mut CompiledIop<F>,
		arity: usize,
	) -> (Vec<ZAssignmentTask<F>>, Vec<QueryId>) {
		let mut tasks = Vec::new();
		let mut openings = Vec::new();

		let chunks = self
			.numerators
			.chunks(arity)
			.zip(self.denominators.chunks(arity));
		for (index, (nums, dens)) in chunks.enumerate() {
			let mut numerator = Expression::zero();
			for (l, num) in nums.iter().enumerate() {
				let mut term = num.clone();
				for (m, den) in dens.iter().enumerate() {
					if m != l {
						term = term * den.clone();
					}
				}
				numerator = numerator + term;
			}
			let denominator = dens
				.iter()
				.cloned()
				.reduce(|acc, den| acc * den)
				.unwrap_or_else(Expression::one);

			let suffix = format!("{}_{}_{index}", self.round, self.size);
			let z = comp.insert_commit(self.round + 1, format!("LOGUP_Z_{suffix}"), self.size);
			let z_expr = Expression::column(&z);
			let z_prev = Expression::shifted(&z, -1);

			comp.insert_local(
				self.round + 1,
				format!("LOGUP_Z_BOUNDARY_{suffix}"),
				self.size,
				numerator.clone() - z_expr.clone() * denominator.clone(),
			);
			comp.insert_global(
				self.round + 1,
				format!("LOGUP_Z_GLOBAL_{suffix}"),
				self.size,
				numerator.clone() - (z_expr - z_prev) * denominator.clone(),
			);
			let opening = comp.insert_local_opening(
				self.round + 1,
				format!("LOGUP_Z_OPENING_{suffix}"),
				z.clone(),
				self.size - 1,
			);

			openings.push(opening.name.clone());
			tasks.push(ZAssignmentTask {
				z,
				numerator,
				denominator,
				opening: opening.name,
			});
		}

		(tasks, openings)
	}
}

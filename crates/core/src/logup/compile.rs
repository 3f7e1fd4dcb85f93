// Copyright 2025 Irreducible Inc.

use std::{collections::BTreeMap, hash::Hash};

use p3_field::Field;
use tracing::instrument;

use crate::{
	expression::Expression,
	logup::{
		capture::{capture_lookup_tables, TableGroup},
		prover::{LookupProverTask, MAssignmentTask, ProverTaskAtRound},
		verify::FinalSumCheck,
		zctx::ZCtx,
		Error,
	},
	wizard::{Coin, Column, ColumnRef, CompiledIop, QueryId},
};

/// Lowers every pending inclusion claim of `comp` into the log-derivative
/// argument, with the default packing arity.
pub fn compile_lookups<F: Field + Hash>(comp: &mut CompiledIop<F>) -> Result<(), Error> {
	LookupCompiler::default().compile(comp)
}

/// The lookup compilation pass.
///
/// `packing_arity` is the number of log-derivative fractions brought over a
/// common denominator per grand-sum column: higher arity means fewer
/// committed Z columns against higher-degree constraints.
#[derive(Clone, Copy, Debug)]
pub struct LookupCompiler {
	pub packing_arity: usize,
}

impl Default for LookupCompiler {
	fn default() -> Self {
		Self { packing_arity: 3 }
	}
}

impl LookupCompiler {
	/// Replaces the pending inclusion claims with multiplicity columns,
	/// packed grand-sum columns, their constraints and the final cancellation
	/// check, and schedules the prover tasks assigning the new columns.
	#[instrument(skip_all, name = "logup::compile", level = "debug")]
	pub fn compile<F: Field + Hash>(&self, comp: &mut CompiledIop<F>) -> Result<(), Error> {
		assert!(self.packing_arity >= 1, "packing arity must be positive");

		let groups = capture_lookup_tables(comp)?;
		if groups.is_empty() {
			return Ok(());
		}

		let mut buckets = BTreeMap::<(usize, usize), ZCtx<F>>::new();
		let mut tasks_by_round = BTreeMap::<usize, Vec<LookupProverTask<F>>>::new();

		for group in groups {
			let ctx = compile_table(comp, &group);
			let gamma = Expression::coin(&ctx.gamma);
			let gamma_round = ctx.gamma.round();

			for ((fragment, m), t_expr) in group.fragments.iter().zip(&ctx.m).zip(&ctx.t) {
				let size = fragment[0].size();
				buckets
					.entry((gamma_round, size))
					.or_insert_with(|| ZCtx::new(gamma_round, size))
					.push_term(-Expression::column(m), t_expr.clone() + gamma.clone());
			}
			for ((checked, s_expr), filter) in
				group.checked.iter().zip(&ctx.s).zip(&ctx.s_filters)
			{
				let numerator = filter.clone().unwrap_or_else(Expression::one);
				buckets
					.entry((gamma_round, checked.size))
					.or_insert_with(|| ZCtx::new(gamma_round, checked.size))
					.push_term(numerator, s_expr.clone() + gamma.clone());
			}

			tasks_by_round
				.entry(group.round)
				.or_default()
				.push(LookupProverTask::Multiplicity(MAssignmentTask {
					table_name: group.name,
					m: ctx.m,
					t: group.fragments,
					s: group.checked.iter().map(|c| c.tuple.clone()).collect(),
					s_filters: group.checked.into_iter().map(|c| c.filter).collect(),
				}));
		}

		let mut openings = Vec::<QueryId>::new();
		for zctx in buckets.values() {
			let (z_tasks, z_openings) = zctx.pack(comp, self.packing_arity);
			tasks_by_round
				.entry(zctx.round + 1)
				.or_default()
				.extend(z_tasks.into_iter().map(LookupProverTask::GrandSum));
			openings.extend(z_openings);
		}

		for (round, tasks) in tasks_by_round {
			comp.register_prover_action(round, Box::new(ProverTaskAtRound { round, tasks }));
		}
		let last_round = comp.num_rounds() - 1;
		comp.register_verifier_action(last_round, Box::new(FinalSumCheck { openings }));
		Ok(())
	}
}

struct SingleTableCtx<F: Field> {
	/// One collapsed expression per table fragment, without the γ offset.
	t: Vec<Expression<F>>,
	/// One collapsed expression per checked set.
	s: Vec<Expression<F>>,
	/// Checked-side filters, lifted to expressions; they become grand-sum
	/// numerators.
	s_filters: Vec<Option<Expression<F>>>,
	/// One multiplicity column per fragment, committed at the grouping round.
	m: Vec<Column>,
	gamma: Coin,
}

/// Registers the per-table artifacts: the collapsing coin α when tuples are
/// wider than one column, the offset coin γ, and one multiplicity column per
/// fragment. α is declared before γ so the sampling order is fixed.
fn compile_table<F: Field>(comp: &mut CompiledIop<F>, group: &TableGroup<F>) -> SingleTableCtx<F> {
	let width = group.fragments[0].len();
	let alpha = (width > 1)
		.then(|| comp.insert_coin(group.round + 1, format!("{}_LOGUP_ALPHA", group.name)));
	let gamma = comp.insert_coin(group.round + 1, format!("{}_LOGUP_GAMMA", group.name));

	let m = group
		.fragments
		.iter()
		.enumerate()
		.map(|(frag, fragment)| {
			comp.insert_commit(
				group.round,
				format!("{}_LOGUP_M_{frag}", group.name),
				fragment[0].size(),
			)
		})
		.collect();

	let t = group
		.fragments
		.iter()
		.map(|fragment| collapse_tuple(fragment, alpha.as_ref()))
		.collect();
	let s = group
		.checked
		.iter()
		.map(|checked| collapse_tuple(&checked.tuple, alpha.as_ref()))
		.collect();
	let s_filters = group
		.checked
		.iter()
		.map(|checked| checked.filter.as_ref().map(Expression::from_ref))
		.collect();

	SingleTableCtx {
		t,
		s,
		s_filters,
		m,
		gamma,
	}
}

/// Horner form of `Σ αⁱ · colᵢ`; a width-1 tuple stays the bare column.
fn collapse_tuple<F: Field>(tuple: &[ColumnRef<F>], alpha: Option<&Coin>) -> Expression<F> {
	match alpha {
		None => Expression::from_ref(&tuple[0]),
		Some(alpha) => {
			let alpha = Expression::coin(alpha);
			tuple
				.iter()
				.rev()
				.fold(Expression::zero(), |acc, col_ref| {
					acc * alpha.clone() + Expression::from_ref(col_ref)
				})
		}
	}
}

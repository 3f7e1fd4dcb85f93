// Copyright 2025 Irreducible Inc.

use std::{collections::HashMap, hash::Hash};

use p3_field::{batch_multiplicative_inverse, Field, PrimeCharacteristicRing};
use rand::{rngs::OsRng, RngCore};
use tracing::instrument;

use logup_utils::tasks::{join_all_capturing_panics, TaskOutcome};

use crate::{
	expression::Expression,
	logup::Error,
	wizard::{Column, ColumnId, ColumnRef, ProverAction, ProverRuntime, QueryId},
};

/// Columns and opening values produced by one prover task. Tasks never write
/// into the runtime themselves; the round orchestrator applies the outputs
/// after the full join, in task order.
pub(super) struct TaskOutput<F: Field> {
	columns: Vec<(ColumnId, Vec<F>)>,
	openings: Vec<(QueryId, F)>,
}

fn resolve_ref<F: Field>(
	run: &ProverRuntime<'_, F>,
	col_ref: &ColumnRef<F>,
) -> Result<Vec<F>, Error> {
	match col_ref {
		ColumnRef::Committed(column) => Ok(run.column(column.id())?.to_vec()),
		ColumnRef::Constant { value, size } => Ok(vec![*value; *size]),
	}
}

/// Horner-collapses one row of a tuple of resolved columns to a single field
/// element: `Σ xⁱ · colᵢ[row]`. With a single column this is the plain value.
fn collapse_row<F: Field>(columns: &[Vec<F>], row: usize, x: F) -> F {
	columns
		.iter()
		.rev()
		.fold(F::ZERO, |acc, col| acc * x + col[row])
}

/// Computes and assigns the multiplicity columns of one lookup table.
///
/// Collapses every concrete row of table and checked sets with a scalar drawn
/// from the local entropy source. This randomness never reaches the verifier:
/// it only keys the counting map, and the resulting multiplicities are
/// invariant to it (up to the astronomically unlikely collision, which would
/// only surface as a wrong count caught by witness validation).
pub(super) struct MAssignmentTask<F: Field> {
	pub table_name: String,
	pub m: Vec<Column>,
	pub t: Vec<Vec<ColumnRef<F>>>,
	pub s: Vec<Vec<ColumnRef<F>>>,
	pub s_filters: Vec<Option<ColumnRef<F>>>,
}

impl<F: Field + Hash> MAssignmentTask<F> {
	#[instrument(skip_all, name = "logup::assign_m", level = "debug", fields(table = %self.table_name))]
	fn run(&self, run: &ProverRuntime<'_, F>) -> Result<TaskOutput<F>, Error> {
		let mut bytes = [0u8; 8];
		OsRng
			.try_fill_bytes(&mut bytes)
			.map_err(|err| Error::RandomnessSampling(err.to_string()))?;
		let x = F::from_u64(u64::from_le_bytes(bytes));

		// Map from collapsed table row to its position. Later occurrences win
		// on duplicates; any occurrence gives a valid multiplicity split.
		let mut positions = HashMap::<F, (usize, usize)>::new();
		let mut counts: Vec<Vec<u64>> = Vec::with_capacity(self.t.len());
		for (frag, fragment) in self.t.iter().enumerate() {
			let columns = fragment
				.iter()
				.map(|col_ref| resolve_ref(run, col_ref))
				.collect::<Result<Vec<_>, _>>()?;
			let n_rows = columns[0].len();
			for row in 0..n_rows {
				positions.insert(collapse_row(&columns, row, x), (frag, row));
			}
			counts.push(vec![0u64; n_rows]);
		}

		for (set, tuple) in self.s.iter().enumerate() {
			let columns = tuple
				.iter()
				.map(|col_ref| resolve_ref(run, col_ref))
				.collect::<Result<Vec<_>, _>>()?;
			let filter = match &self.s_filters[set] {
				Some(col_ref) => Some((col_ref.id(), resolve_ref(run, col_ref)?)),
				None => None,
			};
			let n_rows = columns[0].len();
			for row in 0..n_rows {
				if let Some((filter_id, filter)) = &filter {
					if filter[row].is_zero() {
						continue;
					}
					if filter[row] != F::ONE {
						return Err(Error::NonBinaryFilter {
							column: filter_id.clone(),
							row,
						});
					}
				}
				match positions.get(&collapse_row(&columns, row, x)) {
					Some(&(frag, table_row)) => counts[frag][table_row] += 1,
					None => {
						return Err(Error::NotInTable {
							table: self.table_name.clone(),
							set,
							row,
						})
					}
				}
			}
		}

		let columns = self
			.m
			.iter()
			.zip(counts)
			.map(|(m, frag_counts)| {
				let values = frag_counts.into_iter().map(F::from_u64).collect();
				(m.id().clone(), values)
			})
			.collect();
		Ok(TaskOutput {
			columns,
			openings: Vec::new(),
		})
	}
}

/// Computes and assigns one packed grand-sum column together with its
/// final-row opening value.
pub(super) struct ZAssignmentTask<F: Field> {
	pub z: Column,
	pub numerator: Expression<F>,
	pub denominator: Expression<F>,
	pub opening: QueryId,
}

impl<F: Field> ZAssignmentTask<F> {
	#[instrument(skip_all, name = "logup::assign_z", level = "debug", fields(column = %self.z.id()))]
	fn run(&self, run: &ProverRuntime<'_, F>) -> Result<TaskOutput<F>, Error> {
		let size = self.z.size();
		let numerators = self.numerator.evaluate(size, run)?;
		let denominators = self.denominator.evaluate(size, run)?;
		let inverses = batch_multiplicative_inverse(&denominators);

		let mut values = Vec::with_capacity(size);
		let mut acc = F::ZERO;
		for (num, inv) in numerators.into_iter().zip(inverses) {
			acc += num * inv;
			values.push(acc);
		}

		Ok(TaskOutput {
			columns: vec![(self.z.id().clone(), values)],
			openings: vec![(self.opening.clone(), acc)],
		})
	}
}

pub(super) enum LookupProverTask<F: Field> {
	Multiplicity(MAssignmentTask<F>),
	GrandSum(ZAssignmentTask<F>),
}

impl<F: Field + Hash> LookupProverTask<F> {
	fn run(&self, run: &ProverRuntime<'_, F>) -> Result<TaskOutput<F>, Error> {
		match self {
			Self::Multiplicity(task) => task.run(run),
			Self::GrandSum(task) => task.run(run),
		}
	}
}

/// Round orchestrator: fans the round's tasks out over the rayon pool with
/// read-only access to the runtime, waits for every worker, then applies the
/// outputs in task order. The first captured failure or panic is surfaced
/// only after the full join, so no worker observes a half-written runtime.
pub(super) struct ProverTaskAtRound<F: Field> {
	pub round: usize,
	pub tasks: Vec<LookupProverTask<F>>,
}

impl<F: Field + Hash> ProverAction<F> for ProverTaskAtRound<F> {
	#[instrument(skip_all, name = "logup::prover_round", level = "debug", fields(round = self.round))]
	fn run(
		&self,
		run: &mut ProverRuntime<'_, F>,
	) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		let outcomes = {
			let shared = &*run;
			let jobs = self
				.tasks
				.iter()
				.map(|task| move || task.run(shared))
				.collect::<Vec<_>>();
			join_all_capturing_panics(jobs)
		};

		let mut outputs = Vec::with_capacity(outcomes.len());
		for outcome in outcomes {
			match outcome {
				TaskOutcome::Done(output) => outputs.push(output),
				TaskOutcome::Failed(err) => return Err(Box::new(err)),
				TaskOutcome::Panicked(msg) => return Err(Box::new(Error::TaskPanicked(msg))),
			}
		}

		for output in outputs {
			for (id, values) in output.columns {
				run.assign_column_by_id(&id, values)
					.map_err(Error::from)?;
			}
			for (name, value) in output.openings {
				run.assign_local_opening(&name, value)
					.map_err(Error::from)?;
			}
		}
		Ok(())
	}
}

// Copyright 2025 Irreducible Inc.

use std::{collections::HashMap, fmt};

use p3_field::{Field, PrimeCharacteristicRing};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use tracing::instrument;

use crate::{
	expression::WitnessSource,
	wizard::{Coin, CoinName, Column, ColumnId, CompiledIop, Error, Proof, QueryId},
};

/// Mutable prover state accumulated while the rounds of a compiled protocol
/// are played out: column assignments, sampled coins and opened values.
pub struct ProverRuntime<'a, F: Field> {
	comp: &'a CompiledIop<F>,
	assignments: HashMap<ColumnId, Vec<F>>,
	coins: HashMap<CoinName, F>,
	openings: HashMap<QueryId, F>,
}

impl<'a, F: Field> ProverRuntime<'a, F> {
	pub(crate) fn new(comp: &'a CompiledIop<F>) -> Self {
		Self {
			comp,
			assignments: HashMap::new(),
			coins: HashMap::new(),
			openings: HashMap::new(),
		}
	}

	pub fn compiled(&self) -> &'a CompiledIop<F> {
		self.comp
	}

	/// Assigns the witness values of a committed column. Each column is
	/// assigned exactly once and the row count must match the declaration.
	pub fn assign_column(&mut self, column: &Column, values: Vec<F>) -> Result<(), Error> {
		if self.comp.column(column.id()).is_none() {
			return Err(Error::ColumnNotRegistered(column.id().clone()));
		}
		if values.len() != column.size() {
			return Err(Error::AssignmentSizeMismatch {
				column: column.id().clone(),
				expected: column.size(),
				got: values.len(),
			});
		}
		if self.assignments.contains_key(column.id()) {
			return Err(Error::ColumnAlreadyAssigned(column.id().clone()));
		}
		self.assignments.insert(column.id().clone(), values);
		Ok(())
	}

	pub fn assign_column_by_id(&mut self, id: &ColumnId, values: Vec<F>) -> Result<(), Error> {
		let column = self
			.comp
			.column(id)
			.ok_or_else(|| Error::ColumnNotRegistered(id.clone()))?
			.clone();
		self.assign_column(&column, values)
	}

	pub fn column(&self, id: &ColumnId) -> Result<&[F], Error> {
		self.assignments
			.get(id)
			.map(Vec::as_slice)
			.ok_or_else(|| Error::ColumnNotAssigned(id.clone()))
	}

	pub fn coin(&self, coin: &Coin) -> Result<F, Error> {
		self.coins
			.get(coin.name())
			.copied()
			.ok_or_else(|| Error::CoinNotSampled(coin.name().clone()))
	}

	pub fn assign_local_opening(&mut self, name: &QueryId, value: F) -> Result<(), Error> {
		if self.openings.contains_key(name) {
			return Err(Error::OpeningAlreadyAssigned(name.clone()));
		}
		self.openings.insert(name.clone(), value);
		Ok(())
	}

	pub fn local_opening(&self, name: &QueryId) -> Result<F, Error> {
		self.openings
			.get(name)
			.copied()
			.ok_or_else(|| Error::OpeningNotAssigned(name.clone()))
	}

	fn sample_round_coins(&mut self, round: usize) {
		for (name, value) in derive_round_coins(self.comp, round) {
			self.coins.insert(name, value);
		}
	}
}

impl<F: Field> fmt::Debug for ProverRuntime<'_, F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProverRuntime")
			.field("assigned_columns", &self.assignments.len())
			.field("sampled_coins", &self.coins.len())
			.field("assigned_openings", &self.openings.len())
			.finish_non_exhaustive()
	}
}

impl<F: Field> WitnessSource<F> for ProverRuntime<'_, F> {
	fn column_values(&self, id: &ColumnId) -> Result<&[F], Error> {
		self.column(id)
	}

	fn coin_value(&self, coin: &Coin) -> Result<F, Error> {
		self.coin(coin)
	}
}

/// Stand-in transcript sampling: coins of a round are drawn from a PRNG
/// keyed on the protocol seed and the round index, in declaration order.
/// Prover and verifier run the same derivation and therefore agree.
pub(crate) fn derive_round_coins<F: Field>(
	comp: &CompiledIop<F>,
	round: usize,
) -> Vec<(CoinName, F)> {
	let seed = comp
		.challenge_seed()
		.wrapping_add((round as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
	let mut rng = StdRng::seed_from_u64(seed);
	comp.coins()
		.iter()
		.filter(|coin| coin.round() == round)
		.map(|coin| (coin.name().clone(), F::from_u64(rng.next_u64())))
		.collect()
}

/// Runs the prover side of a compiled protocol.
///
/// The `assign` closure provides the witness for the externally committed
/// columns; compiler-inserted columns are filled in by the prover actions
/// registered at each round. Returns the proof together with the final
/// runtime, so callers can inspect the full witness afterwards.
#[instrument(skip_all, name = "wizard::prove", level = "debug")]
pub fn prove<'a, F: Field>(
	comp: &'a CompiledIop<F>,
	assign: impl FnOnce(&mut ProverRuntime<'a, F>) -> Result<(), Error>,
) -> Result<(Proof<F>, ProverRuntime<'a, F>), Error> {
	let mut run = ProverRuntime::new(comp);
	assign(&mut run)?;

	for round in 0..comp.num_rounds() {
		run.sample_round_coins(round);
		for action in comp.prover_actions_at(round) {
			action.run(&mut run).map_err(|source| Error::ProverAction {
				round,
				source,
			})?;
		}
	}

	let mut openings = Vec::with_capacity(comp.local_openings().len());
	for opening in comp.local_openings() {
		let value = run.local_opening(&opening.name)?;
		openings.push((opening.name.clone(), value));
	}
	Ok((Proof { openings }, run))
}

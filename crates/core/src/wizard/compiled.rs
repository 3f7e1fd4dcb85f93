// Copyright 2025 Irreducible Inc.

use std::collections::{BTreeMap, HashMap};

use p3_field::Field;

use crate::{
	expression::Expression,
	wizard::{
		Coin, CoinName, Column, ColumnId, ColumnRef, GlobalConstraint, Inclusion, LocalConstraint,
		LocalOpening, ProverRuntime, QueryId, VerificationError, VerifierRuntime,
	},
};

/// A prover-side action scheduled at a fixed round. Actions run after the
/// coins of their round have been sampled.
pub trait ProverAction<F: Field>: Send + Sync {
	fn run(
		&self,
		run: &mut ProverRuntime<'_, F>,
	) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A verifier-side check scheduled at a fixed round.
pub trait VerifierAction<F: Field>: Send + Sync {
	fn verify(&self, run: &VerifierRuntime<'_, F>) -> Result<(), VerificationError>;
}

/// The under-compilation protocol description: registries of columns, coins,
/// constraints and queries, plus the actions the compiled protocol will run.
///
/// Compilation passes consume high-level queries (inclusion claims) and push
/// lower-level items back in. Registration order is part of the protocol
/// identity: two compilations of the same description must produce the same
/// listing, which is why every registry is a plain vector and the only maps
/// are id -> index lookups that never drive iteration.
pub struct CompiledIop<F: Field> {
	columns: Vec<Column>,
	column_index: HashMap<ColumnId, usize>,
	coins: Vec<Coin>,
	coin_index: HashMap<CoinName, usize>,
	inclusions: Vec<Inclusion<F>>,
	globals: Vec<GlobalConstraint<F>>,
	locals: Vec<LocalConstraint<F>>,
	local_openings: Vec<LocalOpening>,
	prover_actions: BTreeMap<usize, Vec<Box<dyn ProverAction<F>>>>,
	verifier_actions: BTreeMap<usize, Vec<Box<dyn VerifierAction<F>>>>,
	num_rounds: usize,
	challenge_seed: u64,
}

impl<F: Field> CompiledIop<F> {
	pub fn new() -> Self {
		Self {
			columns: Vec::new(),
			column_index: HashMap::new(),
			coins: Vec::new(),
			coin_index: HashMap::new(),
			inclusions: Vec::new(),
			globals: Vec::new(),
			locals: Vec::new(),
			local_openings: Vec::new(),
			prover_actions: BTreeMap::new(),
			verifier_actions: BTreeMap::new(),
			num_rounds: 1,
			challenge_seed: 0,
		}
	}

	/// Seed for the stand-in challenge sampler. The production system derives
	/// coins from a Fiat-Shamir transcript, which is outside this core; the
	/// seed exists so prover and verifier agree on the sampled values.
	pub fn with_challenge_seed(mut self, seed: u64) -> Self {
		self.challenge_seed = seed;
		self
	}

	pub(crate) fn challenge_seed(&self) -> u64 {
		self.challenge_seed
	}

	fn touch_round(&mut self, round: usize) {
		self.num_rounds = self.num_rounds.max(round + 1);
	}

	/// Number of interaction rounds the protocol spans.
	pub fn num_rounds(&self) -> usize {
		self.num_rounds
	}

	/// Declares a committed column. Panics on a duplicate id or an empty
	/// column, both of which are programming errors of the caller.
	pub fn insert_commit(
		&mut self,
		round: usize,
		name: impl Into<ColumnId>,
		size: usize,
	) -> Column {
		let id = name.into();
		assert!(size > 0, "column {id} would be empty");
		assert!(
			!self.column_index.contains_key(&id),
			"column {id} registered twice"
		);
		let column = Column::new(id.clone(), round, size);
		self.column_index.insert(id, self.columns.len());
		self.columns.push(column.clone());
		self.touch_round(round);
		column
	}

	/// Declares a random field-element coin at the given round.
	pub fn insert_coin(&mut self, round: usize, name: impl Into<CoinName>) -> Coin {
		let name = name.into();
		assert!(
			!self.coin_index.contains_key(&name),
			"coin {name} registered twice"
		);
		let coin = Coin::new(name.clone(), round);
		self.coin_index.insert(name, self.coins.len());
		self.coins.push(coin.clone());
		self.touch_round(round);
		coin
	}

	/// Registers an unconditional, single-fragment inclusion claim.
	pub fn insert_inclusion(
		&mut self,
		name: impl Into<QueryId>,
		including: Vec<ColumnRef<F>>,
		included: Vec<ColumnRef<F>>,
	) {
		self.insert_inclusion_query(Inclusion {
			name: name.into(),
			round: 0,
			including: vec![including],
			including_filters: None,
			included,
			included_filter: None,
		});
	}

	/// Registers an inclusion claim filtered on both sides.
	pub fn insert_inclusion_double_conditional(
		&mut self,
		name: impl Into<QueryId>,
		including: Vec<ColumnRef<F>>,
		included: Vec<ColumnRef<F>>,
		including_filter: ColumnRef<F>,
		included_filter: ColumnRef<F>,
	) {
		self.insert_inclusion_query(Inclusion {
			name: name.into(),
			round: 0,
			including: vec![including],
			including_filters: Some(vec![including_filter]),
			included,
			included_filter: Some(included_filter),
		});
	}

	/// Registers an inclusion claim against a fragmented table.
	pub fn insert_fragmented_inclusion(
		&mut self,
		name: impl Into<QueryId>,
		including: Vec<Vec<ColumnRef<F>>>,
		included: Vec<ColumnRef<F>>,
	) {
		self.insert_inclusion_query(Inclusion {
			name: name.into(),
			round: 0,
			including,
			including_filters: None,
			included,
			included_filter: None,
		});
	}

	/// Registers a fully general inclusion claim. The claim round is derived
	/// from the latest commitment round among the referenced columns.
	pub fn insert_inclusion_query(&mut self, mut inclusion: Inclusion<F>) {
		let round = inclusion
			.including
			.iter()
			.flatten()
			.chain(&inclusion.included)
			.chain(inclusion.including_filters.iter().flatten())
			.chain(&inclusion.included_filter)
			.map(|col_ref| col_ref.round())
			.max()
			.unwrap_or(0);
		inclusion.round = round;
		self.touch_round(round);
		self.inclusions.push(inclusion);
	}

	/// Hands the pending inclusion claims over to a compilation pass. The
	/// caller owns them afterwards; nothing stays behind to be re-compiled.
	pub fn take_inclusions(&mut self) -> Vec<Inclusion<F>> {
		std::mem::take(&mut self.inclusions)
	}

	pub fn insert_global(
		&mut self,
		round: usize,
		name: impl Into<QueryId>,
		size: usize,
		expr: Expression<F>,
	) {
		self.touch_round(round);
		self.globals.push(GlobalConstraint {
			name: name.into(),
			round,
			size,
			expr,
		});
	}

	pub fn insert_local(
		&mut self,
		round: usize,
		name: impl Into<QueryId>,
		size: usize,
		expr: Expression<F>,
	) {
		self.touch_round(round);
		self.locals.push(LocalConstraint {
			name: name.into(),
			round,
			size,
			expr,
		});
	}

	pub fn insert_local_opening(
		&mut self,
		round: usize,
		name: impl Into<QueryId>,
		column: Column,
		row: usize,
	) -> LocalOpening {
		assert!(row < column.size(), "opening row out of range");
		let opening = LocalOpening {
			name: name.into(),
			round,
			column,
			row,
		};
		self.touch_round(round);
		self.local_openings.push(opening.clone());
		opening
	}

	pub fn register_prover_action(&mut self, round: usize, action: Box<dyn ProverAction<F>>) {
		self.touch_round(round);
		self.prover_actions.entry(round).or_default().push(action);
	}

	pub fn register_verifier_action(&mut self, round: usize, action: Box<dyn VerifierAction<F>>) {
		self.touch_round(round);
		self.verifier_actions.entry(round).or_default().push(action);
	}

	pub fn columns(&self) -> &[Column] {
		&self.columns
	}

	pub fn column(&self, id: &ColumnId) -> Option<&Column> {
		self.column_index.get(id).map(|&i| &self.columns[i])
	}

	pub fn coins(&self) -> &[Coin] {
		&self.coins
	}

	pub fn global_constraints(&self) -> &[GlobalConstraint<F>] {
		&self.globals
	}

	pub fn local_constraints(&self) -> &[LocalConstraint<F>] {
		&self.locals
	}

	pub fn local_openings(&self) -> &[LocalOpening] {
		&self.local_openings
	}

	pub(crate) fn prover_actions_at(&self, round: usize) -> &[Box<dyn ProverAction<F>>] {
		self.prover_actions.get(&round).map_or(&[], Vec::as_slice)
	}

	pub(crate) fn verifier_actions_at(&self, round: usize) -> &[Box<dyn VerifierAction<F>>] {
		self.verifier_actions.get(&round).map_or(&[], Vec::as_slice)
	}

	/// Deterministic human-readable listing of everything registered, in
	/// registration order. Two runs compiling the same description must
	/// produce identical listings.
	pub fn registry_listing(&self) -> Vec<String> {
		let mut listing = Vec::new();
		for col in &self.columns {
			listing.push(format!(
				"column {} round={} size={}",
				col.id(),
				col.round(),
				col.size()
			));
		}
		for coin in &self.coins {
			listing.push(format!("coin {} round={}", coin.name(), coin.round()));
		}
		for global in &self.globals {
			listing.push(format!(
				"global {} round={} size={} expr={}",
				global.name, global.round, global.size, global.expr
			));
		}
		for local in &self.locals {
			listing.push(format!(
				"local {} round={} size={} expr={}",
				local.name, local.round, local.size, local.expr
			));
		}
		for opening in &self.local_openings {
			listing.push(format!(
				"opening {} column={} row={}",
				opening.name,
				opening.column.id(),
				opening.row
			));
		}
		listing
	}
}

impl<F: Field> Default for CompiledIop<F> {
	fn default() -> Self {
		Self::new()
	}
}

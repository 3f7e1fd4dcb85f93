// Copyright 2025 Irreducible Inc.

use std::collections::HashMap;

use p3_field::Field;
use tracing::instrument;

use crate::wizard::{
	prover::derive_round_coins, Coin, CoinName, CompiledIop, QueryId, VerificationError,
};

/// The values the prover sends in the clear: one field element per registered
/// local opening, in declaration order. Commitments and evaluation proofs
/// belong to the surrounding argument layer.
#[derive(Clone, Debug)]
pub struct Proof<F: Field> {
	pub openings: Vec<(QueryId, F)>,
}

/// Read-only verifier state: the sampled coins and the opened values carried
/// by the proof.
pub struct VerifierRuntime<'a, F: Field> {
	comp: &'a CompiledIop<F>,
	coins: HashMap<CoinName, F>,
	openings: HashMap<QueryId, F>,
}

impl<'a, F: Field> VerifierRuntime<'a, F> {
	pub fn compiled(&self) -> &'a CompiledIop<F> {
		self.comp
	}

	pub fn coin(&self, coin: &Coin) -> Result<F, VerificationError> {
		self.coins
			.get(coin.name())
			.copied()
			.ok_or_else(|| VerificationError::CheckFailed {
				name: coin.name().to_string(),
				reason: "coin was never sampled".to_string(),
			})
	}

	pub fn local_opening(&self, name: &QueryId) -> Result<F, VerificationError> {
		self.openings
			.get(name)
			.copied()
			.ok_or_else(|| VerificationError::MissingOpening(name.clone()))
	}
}

/// Runs the verifier side of a compiled protocol against a proof.
#[instrument(skip_all, name = "wizard::verify", level = "debug")]
pub fn verify<F: Field>(comp: &CompiledIop<F>, proof: &Proof<F>) -> Result<(), VerificationError> {
	let mut run = VerifierRuntime {
		comp,
		coins: HashMap::new(),
		openings: proof.openings.iter().cloned().collect(),
	};

	for round in 0..comp.num_rounds() {
		for (name, value) in derive_round_coins(comp, round) {
			run.coins.insert(name, value);
		}
		for action in comp.verifier_actions_at(round) {
			action.verify(&run)?;
		}
	}
	Ok(())
}

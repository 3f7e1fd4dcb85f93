// Copyright 2025 Irreducible Inc.

use std::fmt::{self, Display};

/// Interned identifier of a random coin.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoinName(String);

impl CoinName {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Display for CoinName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for CoinName {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for CoinName {
	fn from(s: String) -> Self {
		Self(s)
	}
}

/// A verifier challenge declared at a given round.
///
/// A coin sampled at round `r` only becomes available to columns committed at
/// rounds `>= r`; the surrounding runtime enforces that ordering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
	name: CoinName,
	round: usize,
}

impl Coin {
	pub(crate) fn new(name: CoinName, round: usize) -> Self {
		Self { name, round }
	}

	pub fn name(&self) -> &CoinName {
		&self.name
	}

	pub fn round(&self) -> usize {
		self.round
	}
}

// Copyright 2025 Irreducible Inc.

use std::collections::HashMap;

use p3_field::PrimeCharacteristicRing;
use p3_goldilocks::Goldilocks;

use crate::{
	expression::{Expression, WitnessSource},
	wizard::{Coin, Column, ColumnId, Error},
};

type F = Goldilocks;

struct FixedSource {
	columns: HashMap<ColumnId, Vec<F>>,
	coins: HashMap<String, F>,
}

impl WitnessSource<F> for FixedSource {
	fn column_values(&self, id: &ColumnId) -> Result<&[F], Error> {
		self.columns
			.get(id)
			.map(Vec::as_slice)
			.ok_or_else(|| Error::ColumnNotAssigned(id.clone()))
	}

	fn coin_value(&self, coin: &Coin) -> Result<F, Error> {
		self.coins
			.get(coin.name().as_str())
			.copied()
			.ok_or_else(|| Error::CoinNotSampled(coin.name().clone()))
	}
}

fn felts(values: &[u64]) -> Vec<F> {
	values.iter().map(|&v| F::from_u64(v)).collect()
}

#[test]
fn evaluation_is_rowwise() {
	let a = Column::new("A".into(), 0, 4);
	let b = Column::new("B".into(), 0, 4);
	let gamma = Coin::new("GAMMA".into(), 1);
	let src = FixedSource {
		columns: [
			(a.id().clone(), felts(&[1, 2, 3, 4])),
			(b.id().clone(), felts(&[10, 20, 30, 40])),
		]
		.into(),
		coins: [("GAMMA".to_string(), F::from_u64(100))].into(),
	};

	let expr = Expression::column(&a) * Expression::column(&b) + Expression::coin(&gamma);
	assert_eq!(expr.evaluate(4, &src).unwrap(), felts(&[110, 140, 190, 260]));
	assert_eq!(expr.degree(), 2);
}

#[test]
fn shifts_are_cyclic() {
	let a = Column::new("A".into(), 0, 4);
	let src = FixedSource {
		columns: [(a.id().clone(), felts(&[1, 2, 3, 4]))].into(),
		coins: HashMap::new(),
	};

	let prev = Expression::shifted(&a, -1);
	assert_eq!(prev.evaluate(4, &src).unwrap(), felts(&[4, 1, 2, 3]));
	assert_eq!(prev.shift_bounds(), (-1, -1));

	let next = Expression::shifted(&a, 1);
	assert_eq!(next.evaluate(4, &src).unwrap(), felts(&[2, 3, 4, 1]));
}

#[test]
fn missing_column_is_reported() {
	let a = Column::new("A".into(), 0, 4);
	let src = FixedSource {
		columns: HashMap::new(),
		coins: HashMap::new(),
	};
	assert!(matches!(
		Expression::column(&a).evaluate(4, &src),
		Err(Error::ColumnNotAssigned(_))
	));
}

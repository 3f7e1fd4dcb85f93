// Copyright 2025 Irreducible Inc.

use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use p3_field::PrimeCharacteristicRing;
use p3_goldilocks::Goldilocks;

use super::*;
use crate::wizard::{
	prove, validate_witness, verify, Coin, Column, ColumnId, ColumnRef, CompiledIop,
	Error as WizardError, Inclusion, Proof, ProverRuntime, VerificationError, VerifierAction,
	VerifierRuntime,
};

type F = Goldilocks;

fn felts(values: &[u64]) -> Vec<F> {
	values.iter().map(|&v| F::from_u64(v)).collect()
}

fn refs(columns: &[&Column]) -> Vec<ColumnRef<F>> {
	columns.iter().map(|&c| c.clone().into()).collect()
}

/// Proves with the given assignments, validates the full witness and runs the
/// verifier; returns the finished runtime for inspection.
fn prove_and_verify<'a>(
	comp: &'a CompiledIop<F>,
	assignments: &[(Column, Vec<F>)],
) -> (Proof<F>, ProverRuntime<'a, F>) {
	let (proof, run) = prove(comp, |run| {
		for (column, values) in assignments {
			run.assign_column(column, values.clone())?;
		}
		Ok(())
	})
	.unwrap();
	validate_witness(comp, &run).unwrap();
	verify(comp, &proof).unwrap();
	(proof, run)
}

fn multiplicities(run: &ProverRuntime<'_, F>, table: &str, frag: usize) -> Vec<F> {
	let id = ColumnId::from(format!("TABLE_{table}_LOGUP_M_{frag}"));
	run.column(&id).unwrap().to_vec()
}

#[test]
fn lookup_smoke() {
	let mut comp = CompiledIop::<F>::new();
	let t = comp.insert_commit(0, "T", 16);
	let s = comp.insert_commit(0, "S", 8);
	comp.insert_inclusion("LOOKUP_S_IN_T", refs(&[&t]), refs(&[&s]));
	compile_lookups(&mut comp).unwrap();

	let assignments = [
		(t, felts(&(0..16).collect::<Vec<_>>())),
		(s, felts(&[3, 3, 7, 0, 15, 1, 1, 9])),
	];
	prove_and_verify(&comp, &assignments);
}

#[test]
fn multiplicities_count_each_hit() {
	let mut comp = CompiledIop::<F>::new();
	let t = comp.insert_commit(0, "T", 4);
	let s = comp.insert_commit(0, "S", 16);
	comp.insert_inclusion("LOOKUP_S_IN_T", refs(&[&t]), refs(&[&s]));
	compile_lookups(&mut comp).unwrap();

	let assignments = [
		(t, felts(&[0, 1, 2, 3])),
		(s, felts(&[1, 1, 1, 2, 3, 0, 0, 1, 1, 1, 1, 2, 3, 0, 0, 1])),
	];
	let (_, run) = prove_and_verify(&comp, &assignments);

	assert_eq!(multiplicities(&run, "T", 0), felts(&[4, 8, 2, 2]));
}

#[test]
fn multiplicities_accumulate_across_checked_sets() {
	let mut comp = CompiledIop::<F>::new();
	let t = comp.insert_commit(0, "T", 4);
	let s1 = comp.insert_commit(0, "S1", 16);
	let s2 = comp.insert_commit(0, "S2", 16);
	comp.insert_inclusion("LOOKUP_S1", refs(&[&t]), refs(&[&s1]));
	comp.insert_inclusion("LOOKUP_S2", refs(&[&t]), refs(&[&s2]));
	compile_lookups(&mut comp).unwrap();

	let assignments = [
		(t, felts(&[0, 1, 2, 3])),
		(s1, felts(&[1, 1, 1, 2, 3, 0, 0, 1, 1, 1, 1, 2, 3, 0, 0, 1])),
		(s2, felts(&[2, 2, 2, 1, 0, 3, 3, 2, 2, 2, 2, 1, 0, 3, 3, 2])),
	];
	let (_, run) = prove_and_verify(&comp, &assignments);

	// Elementwise sum of the multiplicities each set would produce alone:
	// [4,8,2,2] + [2,2,8,4].
	assert_eq!(multiplicities(&run, "T", 0), felts(&[6, 10, 10, 6]));
}

#[test]
fn multi_column_xor_table() {
	let mut comp = CompiledIop::<F>::new();
	let xor_x = comp.insert_commit(0, "XOR_X", 16);
	let xor_y = comp.insert_commit(0, "XOR_Y", 16);
	let xor_xy = comp.insert_commit(0, "XOR_XY", 16);
	let wx = comp.insert_commit(0, "WX", 4);
	let wy = comp.insert_commit(0, "WY", 4);
	let wxy = comp.insert_commit(0, "WXY", 4);
	comp.insert_inclusion(
		"LOOKUP_XOR",
		refs(&[&xor_x, &xor_y, &xor_xy]),
		refs(&[&wx, &wy, &wxy]),
	);
	compile_lookups(&mut comp).unwrap();

	let (mut xs, mut ys, mut xys) = (Vec::new(), Vec::new(), Vec::new());
	for y in 0..4u64 {
		for x in 0..4u64 {
			xs.push(x);
			ys.push(y);
			xys.push(x ^ y);
		}
	}
	let assignments = [
		(xor_x, felts(&xs)),
		(xor_y, felts(&ys)),
		(xor_xy, felts(&xys)),
		(wx, felts(&[0, 3, 2, 1])),
		(wy, felts(&[1, 0, 3, 2])),
		(wxy, felts(&[1, 3, 1, 3])),
	];
	let (_, run) = prove_and_verify(&comp, &assignments);

	assert_eq!(
		multiplicities(&run, "XOR_X,XOR_Y,XOR_XY", 0),
		felts(&[0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0])
	);
}

#[test]
fn second_checked_set_on_xor_table() {
	let mut comp = CompiledIop::<F>::new();
	let xor_x = comp.insert_commit(0, "XOR_X", 16);
	let xor_y = comp.insert_commit(0, "XOR_Y", 16);
	let xor_xy = comp.insert_commit(0, "XOR_XY", 16);
	let wx = comp.insert_commit(0, "WX", 4);
	let wy = comp.insert_commit(0, "WY", 4);
	let wxy = comp.insert_commit(0, "WXY", 4);
	let w2x = comp.insert_commit(0, "W2X", 8);
	let w2y = comp.insert_commit(0, "W2Y", 8);
	let w2xy = comp.insert_commit(0, "W2XY", 8);
	let table = refs(&[&xor_x, &xor_y, &xor_xy]);
	comp.insert_inclusion("LOOKUP_XOR", table.clone(), refs(&[&wx, &wy, &wxy]));
	comp.insert_inclusion("LOOKUP_XOR_2", table, refs(&[&w2x, &w2y, &w2xy]));
	compile_lookups(&mut comp).unwrap();

	let (mut xs, mut ys, mut xys) = (Vec::new(), Vec::new(), Vec::new());
	for y in 0..4u64 {
		for x in 0..4u64 {
			xs.push(x);
			ys.push(y);
			xys.push(x ^ y);
		}
	}
	let assignments = [
		(xor_x, felts(&xs)),
		(xor_y, felts(&ys)),
		(xor_xy, felts(&xys)),
		(wx, felts(&[0, 3, 2, 1])),
		(wy, felts(&[1, 0, 3, 2])),
		(wxy, felts(&[1, 3, 1, 3])),
		(w2x, felts(&xs[..8])),
		(w2y, felts(&ys[..8])),
		(w2xy, felts(&xys[..8])),
	];
	let (_, run) = prove_and_verify(&comp, &assignments);

	assert_eq!(
		multiplicities(&run, "XOR_X,XOR_Y,XOR_XY", 0),
		felts(&[1, 1, 1, 2, 2, 1, 1, 1, 0, 1, 0, 0, 0, 0, 1, 0])
	);
}

#[test]
fn double_conditional_lookup() {
	let mut comp = CompiledIop::<F>::new();
	let t = comp.insert_commit(0, "T", 4);
	let filter_b = comp.insert_commit(0, "FILTER_B", 4);
	let s = comp.insert_commit(0, "S", 16);
	let filter_a = comp.insert_commit(0, "FILTER_A", 16);
	comp.insert_inclusion_double_conditional(
		"LOOKUP_COND",
		refs(&[&t]),
		refs(&[&s]),
		filter_b.clone().into(),
		filter_a.clone().into(),
	);
	compile_lookups(&mut comp).unwrap();

	let assignments = [
		(t, felts(&[0, 1, 2, 3])),
		(filter_b, felts(&[1, 1, 0, 1])),
		(s, felts(&[1, 1, 1, 2, 3, 3, 0, 1, 1, 1, 1, 2, 3, 0, 3, 1])),
		(
			filter_a,
			felts(&[1, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1]),
		),
	];
	let (_, run) = prove_and_verify(&comp, &assignments);

	// The table is extended by its filter column, so only filter-on rows are
	// matchable and the multiplicities live over the extended table.
	assert_eq!(
		multiplicities(&run, "FILTER_B,T", 0),
		felts(&[1, 2, 0, 4])
	);
}

#[test]
fn fragmented_table() {
	let mut comp = CompiledIop::<F>::new();
	let t0 = comp.insert_commit(0, "T0", 8);
	let t1 = comp.insert_commit(0, "T1", 8);
	let s = comp.insert_commit(0, "S", 8);
	comp.insert_fragmented_inclusion(
		"LOOKUP_FRAGMENTED",
		vec![refs(&[&t0]), refs(&[&t1])],
		refs(&[&s]),
	);
	compile_lookups(&mut comp).unwrap();

	let assignments = [
		(t0, felts(&(0..8).collect::<Vec<_>>())),
		(t1, felts(&(8..16).collect::<Vec<_>>())),
		(s, felts(&[0, 8, 15, 3, 3, 9, 9, 9])),
	];
	let (_, run) = prove_and_verify(&comp, &assignments);

	assert_eq!(multiplicities(&run, "T0;T1", 0), felts(&[1, 0, 0, 2, 0, 0, 0, 0]));
	assert_eq!(multiplicities(&run, "T0;T1", 1), felts(&[1, 3, 0, 0, 0, 0, 0, 1]));
}

#[test]
fn same_table_compiles_once() {
	let mut comp = CompiledIop::<F>::new();
	let t = comp.insert_commit(0, "T", 4);
	let s0 = comp.insert_commit(0, "S0", 4);
	let s1 = comp.insert_commit(0, "S1", 4);
	comp.insert_inclusion("LOOKUP_S0", refs(&[&t]), refs(&[&s0]));
	comp.insert_inclusion("LOOKUP_S1", refs(&[&t]), refs(&[&s1]));
	compile_lookups(&mut comp).unwrap();

	// One table group: one gamma coin, one multiplicity column.
	assert_eq!(comp.coins().len(), 1);
	let m_columns = comp
		.columns()
		.iter()
		.filter(|c| c.id().as_str().contains("_LOGUP_M_"))
		.count();
	assert_eq!(m_columns, 1);
}

#[test]
fn missing_value_fails_at_proving() {
	let mut comp = CompiledIop::<F>::new();
	let t = comp.insert_commit(0, "T", 4);
	let s = comp.insert_commit(0, "S", 4);
	comp.insert_inclusion("LOOKUP_S_IN_T", refs(&[&t]), refs(&[&s]));
	compile_lookups(&mut comp).unwrap();

	let err = prove(&comp, |run| {
		run.assign_column(&t, felts(&[0, 1, 2, 3]))?;
		run.assign_column(&s, felts(&[0, 1, 7, 3]))?;
		Ok(())
	})
	.unwrap_err();

	let source = match err {
		WizardError::ProverAction { source, .. } => source,
		other => panic!("expected a prover action failure, got {other}"),
	};
	assert_matches!(
		source.downcast_ref::<Error>(),
		Some(Error::NotInTable { set: 0, row: 2, .. })
	);
}

#[test]
fn non_binary_filter_fails_at_proving() {
	let mut comp = CompiledIop::<F>::new();
	let t = comp.insert_commit(0, "T", 4);
	let filter_b = comp.insert_commit(0, "FILTER_B", 4);
	let s = comp.insert_commit(0, "S", 4);
	let filter_a = comp.insert_commit(0, "FILTER_A", 4);
	comp.insert_inclusion_double_conditional(
		"LOOKUP_COND",
		refs(&[&t]),
		refs(&[&s]),
		filter_b.clone().into(),
		filter_a.clone().into(),
	);
	compile_lookups(&mut comp).unwrap();

	let err = prove(&comp, |run| {
		run.assign_column(&t, felts(&[0, 1, 2, 3]))?;
		run.assign_column(&filter_b, felts(&[1, 1, 1, 1]))?;
		run.assign_column(&s, felts(&[0, 1, 2, 3]))?;
		run.assign_column(&filter_a, felts(&[1, 2, 0, 1]))?;
		Ok(())
	})
	.unwrap_err();

	let source = match err {
		WizardError::ProverAction { source, .. } => source,
		other => panic!("expected a prover action failure, got {other}"),
	};
	assert_matches!(
		source.downcast_ref::<Error>(),
		Some(Error::NonBinaryFilter { row: 1, .. })
	);
}

#[test]
fn tampered_opening_fails_verification() {
	let mut comp = CompiledIop::<F>::new();
	let t = comp.insert_commit(0, "T", 4);
	let s = comp.insert_commit(0, "S", 4);
	comp.insert_inclusion("LOOKUP_S_IN_T", refs(&[&t]), refs(&[&s]));
	compile_lookups(&mut comp).unwrap();

	let assignments = [(t, felts(&[0, 1, 2, 3])), (s, felts(&[3, 2, 1, 0]))];
	let (mut proof, _) = prove_and_verify(&comp, &assignments);

	proof.openings[0].1 += F::ONE;
	assert_matches!(
		verify(&comp, &proof),
		Err(VerificationError::CheckFailed { .. })
	);

	proof.openings.clear();
	assert_matches!(
		verify(&comp, &proof),
		Err(VerificationError::MissingOpening(_))
	);
}

#[test]
fn registries_are_deterministic() {
	let build = || {
		let mut comp = CompiledIop::<F>::new();
		let t = comp.insert_commit(0, "T", 4);
		let u = comp.insert_commit(0, "U", 8);
		let s0 = comp.insert_commit(0, "S0", 4);
		let s1 = comp.insert_commit(0, "S1", 8);
		comp.insert_inclusion("LOOKUP_S0", refs(&[&t]), refs(&[&s0]));
		comp.insert_inclusion("LOOKUP_S1", refs(&[&u]), refs(&[&s1]));
		compile_lookups(&mut comp).unwrap();
		comp.registry_listing()
	};
	assert_eq!(build(), build());
}

#[test]
fn packing_arity_one_matches_default() {
	let build = |arity: usize| {
		let mut comp = CompiledIop::<F>::new();
		let t = comp.insert_commit(0, "T", 4);
		let s0 = comp.insert_commit(0, "S0", 16);
		let s1 = comp.insert_commit(0, "S1", 16);
		let s2 = comp.insert_commit(0, "S2", 16);
		comp.insert_inclusion("LOOKUP_S0", refs(&[&t]), refs(&[&s0]));
		comp.insert_inclusion("LOOKUP_S1", refs(&[&t]), refs(&[&s1]));
		comp.insert_inclusion("LOOKUP_S2", refs(&[&t]), refs(&[&s2]));
		LookupCompiler {
			packing_arity: arity,
		}
		.compile(&mut comp)
		.unwrap();

		let assignments = [
			(t, felts(&[0, 1, 2, 3])),
			(s0, felts(&[1u64; 16])),
			(s1, felts(&[2u64; 16])),
			(s2, felts(&[0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3])),
		];
		let (_, run) = prove_and_verify(&comp, &assignments);
		multiplicities(&run, "T", 0)
	};

	// Arity only changes how many fractions share a Z column; the
	// multiplicities and the final cancellation are unaffected.
	assert_eq!(build(1), build(3));
	assert_eq!(build(1), felts(&[4, 20, 20, 4]));
}

#[test]
fn multiplicities_invariant_across_runs() {
	let mut comp = CompiledIop::<F>::new();
	let t_key = comp.insert_commit(0, "T_KEY", 4);
	let t_val = comp.insert_commit(0, "T_VAL", 4);
	let s_key = comp.insert_commit(0, "S_KEY", 8);
	let s_val = comp.insert_commit(0, "S_VAL", 8);
	comp.insert_inclusion("LOOKUP_PAIRS", refs(&[&t_key, &t_val]), refs(&[&s_key, &s_val]));
	compile_lookups(&mut comp).unwrap();

	let assignments = [
		(t_key, felts(&[0, 1, 2, 3])),
		(t_val, felts(&[10, 11, 12, 13])),
		(s_key, felts(&[0, 0, 1, 2, 2, 2, 3, 3])),
		(s_val, felts(&[10, 10, 11, 12, 12, 12, 13, 13])),
	];
	// Multi-column rows are collapsed with a scalar resampled on every run;
	// the counts must not depend on it.
	let (_, run_a) = prove_and_verify(&comp, &assignments);
	let (_, run_b) = prove_and_verify(&comp, &assignments);
	assert_eq!(
		multiplicities(&run_a, "T_KEY,T_VAL", 0),
		felts(&[2, 1, 3, 2])
	);
	assert_eq!(
		multiplicities(&run_a, "T_KEY,T_VAL", 0),
		multiplicities(&run_b, "T_KEY,T_VAL", 0)
	);
}

struct CoinRecorder {
	coin: Coin,
	seen: Arc<Mutex<Option<F>>>,
}

impl VerifierAction<F> for CoinRecorder {
	fn verify(&self, run: &VerifierRuntime<'_, F>) -> Result<(), VerificationError> {
		*self.seen.lock().unwrap() = Some(run.coin(&self.coin)?);
		Ok(())
	}
}

#[test]
fn verifier_sees_the_prover_coins() {
	let mut comp = CompiledIop::<F>::new();
	let t = comp.insert_commit(0, "T", 4);
	let s = comp.insert_commit(0, "S", 4);
	comp.insert_inclusion("LOOKUP_S_IN_T", refs(&[&t]), refs(&[&s]));
	compile_lookups(&mut comp).unwrap();

	let gamma = comp.coins()[0].clone();
	let seen = Arc::new(Mutex::new(None));
	comp.register_verifier_action(
		gamma.round(),
		Box::new(CoinRecorder {
			coin: gamma.clone(),
			seen: Arc::clone(&seen),
		}),
	);

	let assignments = [(t, felts(&[0, 1, 2, 3])), (s, felts(&[2, 0, 3, 1]))];
	let (_, run) = prove_and_verify(&comp, &assignments);

	let observed = seen.lock().unwrap().expect("the verifier action ran");
	assert_eq!(observed, run.coin(&gamma).unwrap());
}

#[test]
fn ragged_fragment_width_is_rejected() {
	let mut comp = CompiledIop::<F>::new();
	let t0 = comp.insert_commit(0, "T0", 4);
	let t1a = comp.insert_commit(0, "T1A", 4);
	let t1b = comp.insert_commit(0, "T1B", 4);
	let s = comp.insert_commit(0, "S", 4);
	comp.insert_fragmented_inclusion(
		"LOOKUP_RAGGED",
		vec![refs(&[&t0]), refs(&[&t1a, &t1b])],
		refs(&[&s]),
	);

	assert_matches!(
		compile_lookups(&mut comp),
		Err(Error::MalformedInclusion { .. })
	);
}

#[test]
fn mismatched_tuple_sizes_are_rejected() {
	let mut comp = CompiledIop::<F>::new();
	let ta = comp.insert_commit(0, "TA", 4);
	let tb = comp.insert_commit(0, "TB", 8);
	let sa = comp.insert_commit(0, "SA", 4);
	let sb = comp.insert_commit(0, "SB", 4);
	comp.insert_inclusion("LOOKUP_MISMATCHED", refs(&[&ta, &tb]), refs(&[&sa, &sb]));

	assert_matches!(
		compile_lookups(&mut comp),
		Err(Error::MalformedInclusion { .. })
	);
}

#[test]
fn no_claims_is_a_no_op() {
	let mut comp = CompiledIop::<F>::new();
	comp.insert_commit(0, "T", 4);
	compile_lookups(&mut comp).unwrap();

	assert!(comp.coins().is_empty());
	assert!(comp.global_constraints().is_empty());
	assert!(comp.local_openings().is_empty());
}

#[test]
fn included_filter_only() {
	let mut comp = CompiledIop::<F>::new();
	let t = comp.insert_commit(0, "T", 4);
	let s = comp.insert_commit(0, "S", 8);
	let filter = comp.insert_commit(0, "FILTER", 8);
	comp.insert_inclusion_query(Inclusion {
		name: "LOOKUP_FILTERED".into(),
		round: 0,
		including: vec![refs(&[&t])],
		including_filters: None,
		included: refs(&[&s]),
		included_filter: Some(filter.clone().into()),
	});
	compile_lookups(&mut comp).unwrap();

	let assignments = [
		(t, felts(&[0, 1, 2, 3])),
		// Filtered-out rows may hold out-of-table junk.
		(s, felts(&[0, 99, 1, 1, 99, 3, 99, 2])),
		(filter, felts(&[1, 0, 1, 1, 0, 1, 0, 1])),
	];
	let (_, run) = prove_and_verify(&comp, &assignments);

	assert_eq!(multiplicities(&run, "T", 0), felts(&[1, 2, 1, 1]));
}

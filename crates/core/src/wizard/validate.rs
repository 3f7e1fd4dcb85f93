// Copyright 2025 Irreducible Inc.

use p3_field::Field;
use tracing::instrument;

use crate::wizard::{CompiledIop, Error, ProverRuntime};

/// Checks the full witness of a finished prover run against every registered
/// constraint and opening.
///
/// This is a sanity pass over cleartext data, not an argument: it replaces
/// the commitment and quotient machinery that would enforce the same
/// identities cryptographically. Debugging aid and test oracle.
#[instrument(skip_all, name = "wizard::validate_witness", level = "debug")]
pub fn validate_witness<F: Field>(
	comp: &CompiledIop<F>,
	run: &ProverRuntime<'_, F>,
) -> Result<(), Error> {
	for column in comp.columns() {
		let values = run.column(column.id())?;
		if values.len() != column.size() {
			return Err(Error::AssignmentSizeMismatch {
				column: column.id().clone(),
				expected: column.size(),
				got: values.len(),
			});
		}
	}

	for global in comp.global_constraints() {
		let values = global.expr.evaluate(global.size, run)?;
		// Rows on which a shifted leaf wraps around the column boundary are
		// out of the constraint's domain.
		let (shift_min, shift_max) = global.expr.shift_bounds();
		let start = (-shift_min).max(0) as usize;
		let end = global.size - shift_max.max(0) as usize;
		for (row, value) in values.iter().enumerate().take(end).skip(start) {
			if !value.is_zero() {
				return Err(Error::ConstraintNotSatisfied {
					name: global.name.clone(),
					row,
				});
			}
		}
	}

	for local in comp.local_constraints() {
		let values = local.expr.evaluate(local.size, run)?;
		if !values[0].is_zero() {
			return Err(Error::ConstraintNotSatisfied {
				name: local.name.clone(),
				row: 0,
			});
		}
	}

	for opening in comp.local_openings() {
		let opened = run.local_opening(&opening.name)?;
		let values = run.column(opening.column.id())?;
		if values[opening.row] != opened {
			return Err(Error::LocalOpeningMismatch {
				name: opening.name.clone(),
				row: opening.row,
			});
		}
	}

	Ok(())
}

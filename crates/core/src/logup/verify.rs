// Copyright 2025 Irreducible Inc.

use p3_field::{Field, PrimeCharacteristicRing};

use crate::wizard::{QueryId, VerificationError, VerifierAction, VerifierRuntime};

/// Final cancellation check: the opened last rows of every grand-sum column
/// add up to zero exactly when, table by table, the filtered checked-row mass
/// matches the multiplicity-weighted table mass.
pub(super) struct FinalSumCheck {
	pub openings: Vec<QueryId>,
}

impl<F: Field> VerifierAction<F> for FinalSumCheck {
	fn verify(&self, run: &VerifierRuntime<'_, F>) -> Result<(), VerificationError> {
		let mut sum = F::ZERO;
		for opening in &self.openings {
			sum += run.local_opening(opening)?;
		}
		if !sum.is_zero() {
			return Err(VerificationError::CheckFailed {
				name: "LOGUP_FINAL_SUM".to_string(),
				reason: format!("the grand sums add up to {sum:?}, expected zero"),
			});
		}
		Ok(())
	}
}

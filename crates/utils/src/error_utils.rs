// Copyright 2025 Irreducible Inc.

/// Returns early with the given error, converting it with `Into` on the way out.
#[macro_export]
macro_rules! bail {
	($err:expr) => {
		return Err($err.into());
	};
}

/// Bails with the given error unless the condition holds.
#[macro_export]
macro_rules! ensure {
	($cond:expr, $err:expr) => {
		if !$cond {
			$crate::bail!($err);
		}
	};
}

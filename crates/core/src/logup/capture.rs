// Copyright 2025 Irreducible Inc.

use std::collections::BTreeMap;

use itertools::Itertools;
use logup_utils::{bail, ensure};
use p3_field::{Field, PrimeCharacteristicRing};

use crate::{
	logup::Error,
	wizard::{ColumnRef, CompiledIop, Inclusion, QueryId},
};

/// One checked table: the tuple whose rows must occur in the lookup table,
/// with an optional 0/1 filter restricting which rows are claimed.
pub(super) struct CheckedTable<F: Field> {
	pub tuple: Vec<ColumnRef<F>>,
	pub filter: Option<ColumnRef<F>>,
	pub size: usize,
}

/// A lookup table after grouping: all inclusion claims naming the same
/// canonical table, merged.
pub(super) struct TableGroup<F: Field> {
	pub name: String,
	pub fragments: Vec<Vec<ColumnRef<F>>>,
	/// Max declaration round over all merged claims.
	pub round: usize,
	pub checked: Vec<CheckedTable<F>>,
}

/// Canonical table name: fragment-wise column identities in declaration
/// order. Two claims against the same columns in the same order always land
/// in the same group; claim registration order never changes the name.
fn table_name<F: Field>(fragments: &[Vec<ColumnRef<F>>]) -> String {
	let body = fragments
		.iter()
		.map(|fragment| fragment.iter().map(ColumnRef::id).join(","))
		.join(";");
	format!("TABLE_{body}")
}

fn malformed(query: &QueryId, reason: impl Into<String>) -> Error {
	Error::MalformedInclusion {
		query: query.clone(),
		reason: reason.into(),
	}
}

fn check_uniform_size<F: Field>(
	query: &QueryId,
	what: &str,
	tuple: &[ColumnRef<F>],
) -> Result<usize, Error> {
	let size = tuple[0].size();
	for col_ref in tuple {
		ensure!(
			col_ref.size() == size,
			malformed(query, format!("columns of {what} have mismatched sizes"))
		);
	}
	Ok(size)
}

fn validate<F: Field>(inclusion: &Inclusion<F>) -> Result<(), Error> {
	let query = &inclusion.name;
	ensure!(
		!inclusion.included.is_empty(),
		malformed(query, "the checked tuple is empty")
	);
	ensure!(
		!inclusion.including.is_empty(),
		malformed(query, "the table has no fragments")
	);
	let width = inclusion.included.len();
	let included_size = check_uniform_size(query, "the checked tuple", &inclusion.included)?;
	if let Some(filter) = &inclusion.included_filter {
		ensure!(
			filter.size() == included_size,
			malformed(query, "the checked-side filter size mismatches")
		);
	}
	if let Some(filters) = &inclusion.including_filters {
		ensure!(
			filters.len() == inclusion.including.len(),
			malformed(query, "one table-side filter per fragment is required")
		);
	}
	for (frag, fragment) in inclusion.including.iter().enumerate() {
		if fragment.len() != width {
			bail!(malformed(
				query,
				format!(
					"fragment {frag} has width {}, the checked tuple has width {width}",
					fragment.len()
				),
			));
		}
		let size = check_uniform_size(query, &format!("fragment {frag}"), fragment)?;
		if let Some(filters) = &inclusion.including_filters {
			ensure!(
				filters[frag].size() == size,
				malformed(query, format!("the filter of fragment {frag} size mismatches"))
			);
		}
	}
	Ok(())
}

/// Drains the pending inclusion claims of `comp` and groups them by canonical
/// table, normalizing table-side filters away.
///
/// A claim with table-side filters is rewritten over the extended table whose
/// fragment tuples carry the filter column in front, and the checked tuple
/// gets a constant-1 column in the same position: a filtered-out table row can
/// then never match a checked row. The checked-side filter survives as is and
/// is handled by the grand-sum numerator.
///
/// Groups come back sorted by canonical name, so downstream registration
/// order is independent of claim order.
pub(super) fn capture_lookup_tables<F: Field>(
	comp: &mut CompiledIop<F>,
) -> Result<Vec<TableGroup<F>>, Error> {
	let mut groups = BTreeMap::<String, TableGroup<F>>::new();

	for inclusion in comp.take_inclusions() {
		validate(&inclusion)?;

		let Inclusion {
			including,
			including_filters,
			mut included,
			included_filter,
			round,
			..
		} = inclusion;

		let fragments = match including_filters {
			None => including,
			Some(filters) => {
				included.insert(0, ColumnRef::constant(F::ONE, included[0].size()));
				including
					.into_iter()
					.zip(filters)
					.map(|(fragment, filter)| {
						let mut extended = Vec::with_capacity(fragment.len() + 1);
						extended.push(filter);
						extended.extend(fragment);
						extended
					})
					.collect()
			}
		};

		let size = included[0].size();
		let checked = CheckedTable {
			tuple: included,
			filter: included_filter,
			size,
		};

		let table_name = table_name(&fragments);
		groups
			.entry(table_name.clone())
			.and_modify(|group| {
				group.round = group.round.max(round);
			})
			.or_insert_with(|| TableGroup {
				name: table_name,
				fragments,
				round,
				checked: Vec::new(),
			})
			.checked
			.push(checked);
	}

	Ok(groups.into_values().collect())
}

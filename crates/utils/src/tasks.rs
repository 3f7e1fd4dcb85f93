// Copyright 2025 Irreducible Inc.

//! Fan-out helper for batches of independent fallible tasks.
//!
//! Workers run on the rayon pool; a panicking worker must not take the whole
//! process down with it, so each task is wrapped in [`std::panic::catch_unwind`]
//! and its outcome is reported back to the caller once every sibling task has
//! finished.

use std::{
	cell::RefCell,
	panic::{self, AssertUnwindSafe},
	sync::Once,
};

use rayon::prelude::*;

/// Outcome of a single task joined by [`join_all_capturing_panics`].
#[derive(Debug)]
pub enum TaskOutcome<T, E> {
	Done(T),
	Failed(E),
	/// The task panicked; the payload is rendered as a message for diagnosis.
	Panicked(String),
}

thread_local! {
	static LAST_PANIC_MESSAGE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static CAPTURE_HOOK: Once = Once::new();

/// Installs a process-wide panic hook that records the rendered panic message
/// in a thread-local slot before deferring to the previous hook.
///
/// Formatted panic payloads are not guaranteed to downcast to `&str` or
/// `String`, so the payload alone is not enough to recover the message; the
/// hook sees the rendered form and runs on the panicking worker thread, which
/// is the same thread that later reads the slot back.
fn install_capture_hook() {
	CAPTURE_HOOK.call_once(|| {
		let previous = panic::take_hook();
		panic::set_hook(Box::new(move |info| {
			LAST_PANIC_MESSAGE.with(|slot| *slot.borrow_mut() = Some(info.to_string()));
			previous(info);
		}));
	});
}

/// Runs every task on the rayon pool and waits for all of them, panics
/// included.
///
/// Outcomes are returned in task order, so callers can deterministically apply
/// results or pick the first failure after the full join.
pub fn join_all_capturing_panics<T, E, Task>(tasks: Vec<Task>) -> Vec<TaskOutcome<T, E>>
where
	Task: FnOnce() -> Result<T, E> + Send,
	T: Send,
	E: Send,
{
	install_capture_hook();
	tasks
		.into_par_iter()
		.map(|task| match panic::catch_unwind(AssertUnwindSafe(task)) {
			Ok(Ok(out)) => TaskOutcome::Done(out),
			Ok(Err(err)) => TaskOutcome::Failed(err),
			Err(payload) => TaskOutcome::Panicked(panic_message(&payload)),
		})
		.collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		(*msg).to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else if let Some(msg) = LAST_PANIC_MESSAGE.with(|slot| slot.borrow_mut().take()) {
		msg
	} else {
		"opaque panic payload".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn outcomes_keep_task_order() {
		let tasks: Vec<Box<dyn FnOnce() -> Result<usize, String> + Send>> = vec![
			Box::new(|| Ok(0)),
			Box::new(|| Err("boom".to_string())),
			Box::new(|| panic!("worker {} gave up", 2)),
			Box::new(|| Ok(3)),
		];

		let outcomes = join_all_capturing_panics(tasks);

		assert!(matches!(outcomes[0], TaskOutcome::Done(0)));
		assert!(matches!(outcomes[1], TaskOutcome::Failed(ref e) if e == "boom"));
		assert!(matches!(outcomes[2], TaskOutcome::Panicked(ref m) if m.contains("gave up")));
		assert!(matches!(outcomes[3], TaskOutcome::Done(3)));
	}

	#[test]
	fn static_payloads_pass_through() {
		let tasks: Vec<Box<dyn FnOnce() -> Result<(), String> + Send>> =
			vec![Box::new(|| panic!("fixed message"))];

		let outcomes = join_all_capturing_panics(tasks);

		assert!(matches!(outcomes[0], TaskOutcome::Panicked(ref m) if m.contains("fixed message")));
	}
}

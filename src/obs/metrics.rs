// self
use crate::obs::{CallKind, CallOutcome};

/// Bumps `mealforge_client_call_total{call, outcome}` on the installed recorder.
///
/// Without the `metrics` feature this does nothing.
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"mealforge_client_call_total",
		"call" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records the exit of an operation from its result.
pub fn record_call_result<T, E>(kind: CallKind, result: &Result<T, E>) {
	record_call_outcome(kind, CallOutcome::of(result));
}

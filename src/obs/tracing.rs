// self
use crate::{_prelude::*, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by client operations.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("mealforge_client.call", call = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Flags that a refresh was triggered by the gateway's 500-wrapped 401 instead of a real 401.
pub(crate) fn warn_gateway_auth_marker(status: u16) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			status,
			"Treating a gateway error that wraps an upstream 401 as an authentication failure."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = status;
	}
}

/// Notes that a caller reused a refresh completed by another caller.
pub(crate) fn debug_refresh_coalesced() {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!("Reusing the outcome of a refresh completed by a concurrent caller.");
	}
}

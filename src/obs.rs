//! Observability helpers shared by the coordinator and the acquisition protocol.
//!
//! # Feature Flags
//!
//! - Spans named `tokenflight.operation` carry the `operation` and `stage` fields and are always
//!   emitted through `tracing`.
//! - Enable `metrics` to increment the `tokenflight_operation_total` counter for every recorded
//!   outcome, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// [`TokenCoordinator::get`](crate::TokenCoordinator::get) calls.
	Get,
	/// Refreshes the coordinator runs under its mutex.
	Refresh,
	/// Bounded acquisition attempts against the external source.
	Acquire,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Get => "get",
			Operation::Refresh => "refresh",
			Operation::Acquire => "acquire",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded per operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Served from a valid cached credential.
	CacheHit,
	/// Bound to a refresh that settled while the caller waited.
	Coalesced,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::CacheHit => "cache_hit",
			Outcome::Coalesced => "coalesced",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

//! Crate-level error types shared by the coordinator, the acquisition protocol, and the boundary.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shareable boxed error; refresh outcomes are cloned to every waiter bound to them.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every variant is `Clone` because one refresh outcome is handed to all callers that waited on
/// it.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The external session could not be started.
	#[error("External session could not be started.")]
	SessionUnavailable {
		/// Collaborator-specific launch failure.
		#[source]
		source: SharedError,
	},
	/// Surface setup or navigation failed before the token exchange was observed.
	#[error("Interaction with the source failed before the token exchange was observed.")]
	InteractionFailed {
		/// Collaborator-specific interaction failure.
		#[source]
		source: SharedError,
	},
	/// The token exchange was observed but its response cannot be used.
	#[error("Invalid response from source.")]
	UpstreamInvalidResponse(
		#[from]
		#[source]
		InvalidResponse,
	),
	/// No token exchange was observed before the deadline elapsed.
	#[error("Fetch exceeded deadline of {}ms.", .deadline.as_millis())]
	DeadlineExceeded {
		/// Deadline that elapsed.
		deadline: Duration,
	},
}
impl Error {
	/// Wraps a launch failure inside [`Error::SessionUnavailable`].
	pub fn session_unavailable(src: impl Into<BoxError>) -> Self {
		Self::SessionUnavailable { source: Arc::from(src.into()) }
	}

	/// Wraps a setup or navigation failure inside [`Error::InteractionFailed`].
	pub fn interaction_failed(src: impl Into<BoxError>) -> Self {
		Self::InteractionFailed { source: Arc::from(src.into()) }
	}

	/// Stable label suitable for span or metric fields.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Config(_) => "config",
			Self::SessionUnavailable { .. } => "session_unavailable",
			Self::InteractionFailed { .. } => "interaction_failed",
			Self::UpstreamInvalidResponse(_) => "upstream_invalid_response",
			Self::DeadlineExceeded { .. } => "deadline_exceeded",
		}
	}
}

/// Reasons an observed token exchange was rejected.
#[derive(Clone, Debug, ThisError)]
pub enum InvalidResponse {
	/// The exchange completed without a response.
	#[error("Token exchange carried no response.")]
	Missing,
	/// The response status was outside the success range.
	#[error("Token exchange responded with HTTP status {status}.")]
	Status {
		/// HTTP status code reported by the surface.
		status: u16,
	},
	/// The response body was not a usable token payload.
	#[error("Token exchange returned a malformed payload.")]
	Malformed {
		/// Structured parsing failure including the offending JSON path.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
}

/// Configuration and validation failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// Target URL cannot be parsed.
	#[error("Target URL is invalid.")]
	InvalidTargetUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token path suffix must not be empty.
	#[error("Token path suffix must not be empty.")]
	EmptyTokenPathSuffix,
	/// Deadline must be positive.
	#[error("Acquisition deadline must be greater than zero.")]
	ZeroDeadline,
}

#[cfg(test)]
mod tests {
	// std
	use std::io::Error as IoError;
	// self
	use super::*;

	#[test]
	fn wrapped_collaborator_errors_keep_their_source() {
		let err = Error::interaction_failed(IoError::other("page crashed"));

		assert!(matches!(err, Error::InteractionFailed { .. }));
		assert_eq!(err.kind(), "interaction_failed");

		let source = StdError::source(&err)
			.expect("Interaction failures should expose the collaborator error as their source.");

		assert_eq!(source.to_string(), "page crashed");
	}

	#[test]
	fn clones_share_the_same_source() {
		let err = Error::session_unavailable("browser binary missing");
		let cloned = err.clone();

		match (&err, &cloned) {
			(
				Error::SessionUnavailable { source: left },
				Error::SessionUnavailable { source: right },
			) => assert!(Arc::ptr_eq(left, right)),
			_ => panic!("Clone should preserve the variant."),
		}
	}

	#[test]
	fn upstream_and_deadline_messages_are_stable() {
		let invalid = Error::from(InvalidResponse::Status { status: 503 });
		let deadline = Error::DeadlineExceeded { deadline: Duration::from_secs(15) };

		assert_eq!(invalid.to_string(), "Invalid response from source.");
		assert_eq!(
			StdError::source(&invalid).map(ToString::to_string).as_deref(),
			Some("Token exchange responded with HTTP status 503."),
		);
		assert_eq!(deadline.to_string(), "Fetch exceeded deadline of 15000ms.");
		assert_eq!(deadline.kind(), "deadline_exceeded");
	}
}

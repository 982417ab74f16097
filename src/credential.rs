//! Cached credential record and its validity rule.

pub mod secret;

pub use secret::TokenSecret;

// self
use crate::_prelude::*;

/// Access token plus its absolute expiry, as produced by one successful refresh.
///
/// `payload` is the source's response object (internal fields already stripped) and is what the
/// HTTP boundary returns to callers. `access_token` and `expires_at_ms` are extracted from it so
/// the coordinator never has to look inside the payload.
#[derive(Clone, PartialEq)]
pub struct Credential {
	/// Bearer string; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Absolute expiry in milliseconds since the Unix epoch.
	pub expires_at_ms: i64,
	/// Source payload returned verbatim to callers.
	pub payload: Map<String, Value>,
}
impl Credential {
	/// Creates a credential with an empty payload.
	pub fn new(access_token: impl Into<String>, expires_at_ms: i64) -> Self {
		Self { access_token: TokenSecret::new(access_token), expires_at_ms, payload: Map::new() }
	}

	/// Attaches the source payload.
	pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
		self.payload = payload;

		self
	}

	/// Returns `true` while `now_ms < expires_at_ms - safety_margin`.
	///
	/// The comparison is strict, so a credential exactly `safety_margin` away from expiry is
	/// already invalid.
	pub fn is_valid_at(&self, now_ms: i64, safety_margin: Duration) -> bool {
		let margin_ms = i64::try_from(safety_margin.as_millis()).unwrap_or(i64::MAX);

		now_ms < self.expires_at_ms.saturating_sub(margin_ms)
	}

	/// Expiry as a UTC instant, if the timestamp is within the supported range.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.expires_at_ms) * 1_000_000).ok()
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &self.access_token)
			.field("expires_at_ms", &self.expires_at_ms)
			.field("payload_keys", &self.payload.keys().collect::<Vec<_>>())
			.finish()
	}
}

//! Token payload extraction from an observed exchange.

// self
use crate::{
	_prelude::*,
	acquisition::session::CompletedExchange,
	credential::Credential,
	error::InvalidResponse,
};

/// Field the source uses for internal notes; never returned to callers.
pub const NOTES_FIELD: &str = "_notes";

#[derive(Deserialize)]
struct TokenFields {
	#[serde(rename = "accessToken", alias = "access_token")]
	access_token: String,
	#[serde(rename = "accessTokenExpirationTimestampMs", alias = "expires_at_ms")]
	expires_at_ms: i64,
}

/// Turns the target exchange into a credential or an [`InvalidResponse`] error.
pub(crate) fn credential_from_exchange(exchange: CompletedExchange) -> Result<Credential> {
	let response = exchange.response.ok_or(InvalidResponse::Missing)?;

	if !response.is_success() {
		return Err(InvalidResponse::Status { status: response.status }.into());
	}

	parse_payload(&response.body)
}

/// Parses a token payload, stripping [`NOTES_FIELD`].
pub fn parse_payload(body: &str) -> Result<Credential> {
	let mut payload: Map<String, Value> =
		serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_str(body))
			.map_err(malformed)?;

	payload.remove(NOTES_FIELD);

	let fields: TokenFields =
		serde_path_to_error::deserialize(Value::Object(payload.clone())).map_err(malformed)?;

	Ok(Credential::new(fields.access_token, fields.expires_at_ms).with_payload(payload))
}

fn malformed(source: serde_path_to_error::Error<serde_json::Error>) -> Error {
	InvalidResponse::Malformed { source: Arc::new(source) }.into()
}

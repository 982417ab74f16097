// std
use std::{net::SocketAddr, time::Instant};
// crates.io
use axum::{
	Json, Router,
	extract::{ConnectInfo, Query, Request, State},
	http::{HeaderMap, StatusCode, header::USER_AGENT},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::get,
};
// self
use crate::{_prelude::*, coordinator::TokenCoordinator};

/// Path the credential is served on.
pub const TOKEN_PATH: &str = "/token";

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
	force: Option<String>,
}

/// Builds the boundary router around a shared coordinator.
pub fn router(coordinator: TokenCoordinator) -> Router {
	Router::new()
		.route(TOKEN_PATH, get(serve_token))
		.layer(middleware::from_fn(log_request))
		.with_state(coordinator)
}

/// Returns `true` for `1`, `yes`, and `true`, ignoring case and surrounding whitespace.
pub fn parse_force_flag(raw: &str) -> bool {
	let raw = raw.trim();

	["1", "yes", "true"].iter().any(|truthy| raw.eq_ignore_ascii_case(truthy))
}

async fn serve_token(
	State(coordinator): State<TokenCoordinator>,
	Query(query): Query<TokenQuery>,
) -> Response {
	let force_refresh = query.force.as_deref().is_some_and(parse_force_flag);

	match coordinator.get(force_refresh).await {
		Ok(credential) => Json(credential.payload).into_response(),
		Err(e) => {
			let cause = StdError::source(&e).map(ToString::to_string);

			tracing::error!(
				error = %e,
				kind = e.kind(),
				cause = cause.as_deref(),
				force_refresh,
				"Token request failed."
			);

			(StatusCode::INTERNAL_SERVER_ERROR, Json(Map::new())).into_response()
		},
	}
}

async fn log_request(request: Request, next: Next) -> Response {
	let started = Instant::now();
	let method = request.method().clone();
	let path = request.uri().path().to_owned();
	let peer = request
		.extensions()
		.get::<ConnectInfo<SocketAddr>>()
		.map(|ConnectInfo(addr)| addr.to_string());
	let forwarded_for = header_value(request.headers(), "x-forwarded-for");
	let user_agent = header_value(request.headers(), USER_AGENT.as_str());
	let response = next.run(request).await;

	tracing::info!(
		method = %method,
		path = %path,
		status = response.status().as_u16(),
		elapsed_ms = started.elapsed().as_millis() as u64,
		peer = peer.as_deref(),
		forwarded_for = forwarded_for.as_deref(),
		user_agent = user_agent.as_deref(),
		"Request served."
	);

	response
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
	headers.get(name).and_then(|value| value.to_str().ok()).map(ToOwned::to_owned)
}

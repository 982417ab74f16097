//! HTTP boundary exposing a [`TokenCoordinator`] as `GET /token`.
//!
//! The boundary owns no caching logic. It maps the `force` query flag onto
//! [`TokenCoordinator::get`], returns the credential payload on success, and turns every error into
//! an opaque `500` after logging the cause.

mod config;
mod logging;
mod routes;

pub use config::*;
pub use logging::*;
pub use routes::*;

// std
use std::{io::Error as IoError, net::SocketAddr};
// crates.io
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	acquisition::{BoundedFetcher, HttpSessionLauncher},
	coordinator::TokenCoordinator,
};

/// Failures that stop the HTTP boundary.
#[derive(Debug, ThisError)]
pub enum ServeError {
	/// The coordinator or its fetcher could not be built from the supplied configuration.
	#[error(transparent)]
	Setup(#[from] Error),
	/// The listen address could not be bound.
	#[error("Failed to bind {addr}.")]
	Bind {
		/// Address that was requested.
		addr: SocketAddr,
		/// Underlying socket error.
		#[source]
		source: IoError,
	},
	/// The accept loop stopped with an I/O error.
	#[error("HTTP server stopped unexpectedly.")]
	Serve(#[source] IoError),
}

/// Builds the coordinator described by `args` and serves it until Ctrl-C.
///
/// Installs the global tracing subscriber first, so this is meant to be called once from `main`.
pub async fn run(args: Args) -> Result<(), ServeError> {
	logging::init_logging(args.log_level, args.log_format);

	let fetcher = BoundedFetcher::new(HttpSessionLauncher::default(), args.acquisition_config())?;
	let coordinator = TokenCoordinator::new(Arc::new(fetcher), args.coordinator_config());
	let listener = TcpListener::bind(args.listen)
		.await
		.map_err(|source| ServeError::Bind { addr: args.listen, source })?;

	tracing::info!(
		addr = %args.listen,
		target_url = %args.target_url,
		token_path_suffix = %args.token_path_suffix,
		deadline_ms = args.deadline_ms,
		safety_margin_ms = args.safety_margin_ms,
		"Token endpoint listening."
	);

	serve(listener, coordinator, shutdown_signal()).await
}

/// Serves [`router`] on `listener` until `shutdown` resolves.
pub async fn serve<F>(
	listener: TcpListener,
	coordinator: TokenCoordinator,
	shutdown: F,
) -> Result<(), ServeError>
where
	F: 'static + Future<Output = ()> + Send,
{
	axum::serve(listener, router(coordinator).into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(shutdown)
		.await
		.map_err(ServeError::Serve)
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::warn!(error = %e, "Ctrl-C handler unavailable. Serving until killed.");
		std::future::pending::<()>().await;
	}

	tracing::info!("Shutdown signal received.");
}

//! Bounded acquisition: fetch one credential from a headless session under a hard deadline.
//!
//! Each attempt launches a session, opens one interaction surface, attaches an observer, and
//! navigates to the target URL while a deadline timer runs. Three events race:
//!
//! - the observer sees an exchange whose path ends with the token suffix, which settles the
//!   attempt with the parsed credential or with [`Error::UpstreamInvalidResponse`];
//! - navigation fails first, which settles with [`Error::InteractionFailed`];
//! - the deadline elapses first, which settles with [`Error::DeadlineExceeded`].
//!
//! The race is a single `select!`, so exactly one of them settles the attempt. Afterwards the
//! observer is detached and the session is closed exactly once, whatever the outcome.
//!
//! Launching, opening the surface, and closing are each bounded by the same deadline on their own,
//! so a collaborator that never answers cannot hold the refresh lock indefinitely.

pub mod payload;
pub mod session;

#[cfg(feature = "reqwest")] mod direct;

#[cfg(feature = "reqwest")] pub use direct::HttpSessionLauncher;
pub use session::*;

// std
use std::sync::atomic::AtomicUsize;
// crates.io
use tokio::sync::mpsc::UnboundedReceiver;
// self
use crate::{
	_prelude::*,
	credential::Credential,
	error::ConfigError,
	fetcher::{FetchFuture, Fetcher},
	obs::{self, Operation, OperationSpan, Outcome},
};

/// Where and how long a single acquisition attempt looks for the token exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquisitionConfig {
	/// Page the surface navigates to.
	pub target_url: Url,
	/// Path suffix identifying the token exchange among everything the surface observes.
	pub token_path_suffix: String,
	/// Hard upper bound on one attempt.
	pub deadline: Duration,
}
impl AcquisitionConfig {
	/// Default hard deadline per attempt.
	pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(15_000);
	/// Default suffix of the token exchange path.
	pub const DEFAULT_TOKEN_PATH_SUFFIX: &str = "/api/token";

	/// Creates a config for `target_url` with the default suffix and deadline.
	pub fn new(target_url: Url) -> Self {
		Self {
			target_url,
			token_path_suffix: Self::DEFAULT_TOKEN_PATH_SUFFIX.into(),
			deadline: Self::DEFAULT_DEADLINE,
		}
	}

	/// Parses `target_url` and creates a config with the default suffix and deadline.
	pub fn parse(target_url: &str) -> Result<Self, ConfigError> {
		let url =
			Url::parse(target_url).map_err(|source| ConfigError::InvalidTargetUrl { source })?;

		Ok(Self::new(url))
	}

	/// Overrides the token path suffix.
	pub fn with_token_path_suffix(mut self, suffix: impl Into<String>) -> Self {
		self.token_path_suffix = suffix.into();

		self
	}

	/// Overrides the deadline.
	pub fn with_deadline(mut self, deadline: Duration) -> Self {
		self.deadline = deadline;

		self
	}

	/// Rejects configs that could never settle successfully.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.token_path_suffix.is_empty() {
			return Err(ConfigError::EmptyTokenPathSuffix);
		}
		if self.deadline.is_zero() {
			return Err(ConfigError::ZeroDeadline);
		}

		Ok(())
	}

	/// Returns `true` when `url` identifies the token exchange.
	pub fn is_target(&self, url: &Url) -> bool {
		url.path().ends_with(&self.token_path_suffix)
	}
}

/// [`Fetcher`] that runs the bounded acquisition protocol against a [`SessionLauncher`].
///
/// Stateless across calls: every attempt launches its own session and no attempt is retried.
pub struct BoundedFetcher<L>
where
	L: SessionLauncher,
{
	launcher: L,
	config: AcquisitionConfig,
}
impl<L> BoundedFetcher<L>
where
	L: SessionLauncher,
{
	/// Creates a fetcher after validating `config`.
	pub fn new(launcher: L, config: AcquisitionConfig) -> Result<Self> {
		config.validate()?;

		Ok(Self { launcher, config })
	}

	/// Active configuration.
	pub fn config(&self) -> &AcquisitionConfig {
		&self.config
	}

	/// Runs one attempt to settlement.
	pub async fn acquire(&self) -> Result<Credential> {
		let span = OperationSpan::new(Operation::Acquire, "bounded");

		obs::record_outcome(Operation::Acquire, Outcome::Attempt);

		let result = span.instrument(self.attempt()).await;

		match &result {
			Ok(_) => obs::record_outcome(Operation::Acquire, Outcome::Success),
			Err(e) => {
				tracing::debug!(error = %e, kind = e.kind(), "Acquisition attempt failed.");
				obs::record_outcome(Operation::Acquire, Outcome::Failure);
			},
		}

		result
	}

	async fn attempt(&self) -> Result<Credential> {
		let deadline = self.config.deadline;
		let mut session = match tokio::time::timeout(deadline, self.launcher.launch()).await {
			Ok(launched) => launched.map_err(Error::session_unavailable)?,
			Err(_) => return Err(Error::session_unavailable("session launch timed out")),
		};
		let opened = match tokio::time::timeout(deadline, session.open_surface()).await {
			Ok(opened) => opened.map_err(Error::interaction_failed),
			Err(_) => Err(Error::interaction_failed("interaction surface did not open in time")),
		};
		let mut surface = match opened {
			Ok(surface) => surface,
			Err(e) => {
				self.close(session).await;

				return Err(e);
			},
		};
		let (observer, exchanges) = session::observer_channel();

		surface.attach(observer);

		// Consumes the receiver, so every observer is detached once this returns.
		let result = self.race(surface.as_ref(), exchanges).await;

		drop(surface);
		self.close(session).await;

		result
	}

	async fn close(&self, session: Box<dyn BrowserSession>) {
		if tokio::time::timeout(self.config.deadline, session.close()).await.is_err() {
			tracing::warn!(
				deadline = ?self.config.deadline,
				"Session did not close before the deadline and was abandoned."
			);
		}
	}

	async fn race(
		&self,
		surface: &dyn InteractionSurface,
		mut exchanges: UnboundedReceiver<CompletedExchange>,
	) -> Result<Credential> {
		let config = &self.config;
		let ignored = AtomicUsize::new(0);
		let observation = async {
			while let Some(exchange) = exchanges.recv().await {
				if config.is_target(&exchange.url) {
					return payload::credential_from_exchange(exchange);
				}

				ignored.fetch_add(1, Ordering::Relaxed);
			}

			Err(Error::interaction_failed("interaction surface stopped reporting exchanges"))
		};
		let navigation = async {
			if let Err(e) = surface.navigate(&config.target_url).await {
				return Err(Error::interaction_failed(e));
			}

			std::future::pending::<Result<Credential>>().await
		};

		tokio::select! {
			biased;

			result = observation => result,
			result = navigation => result,
			() = tokio::time::sleep(config.deadline) => {
				tracing::warn!(
					target_url = %config.target_url,
					token_path_suffix = %config.token_path_suffix,
					ignored_exchanges = ignored.load(Ordering::Relaxed),
					hint = "the source endpoint may have changed shape",
					"Token exchange was not observed before the deadline."
				);

				Err(Error::DeadlineExceeded { deadline: config.deadline })
			},
		}
	}
}
impl<L> Fetcher for BoundedFetcher<L>
where
	L: SessionLauncher,
{
	fn fetch(&self) -> FetchFuture<'_> {
		Box::pin(self.acquire())
	}
}
impl<L> Debug for BoundedFetcher<L>
where
	L: SessionLauncher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BoundedFetcher").field("config", &self.config).finish()
	}
}

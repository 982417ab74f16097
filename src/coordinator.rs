//! Single-flight credential cache with a double-checked refresh path.
//!
//! [`TokenCoordinator::get`] serves a valid cached credential without touching the refresh
//! mutex. Otherwise the caller queues on a [`FifoMutex`], re-validates the slot once it holds the
//! lock, and only then delegates to the [`Fetcher`]. Callers that queued while a refresh was in
//! flight are bound to that refresh's outcome, so a burst of concurrent callers costs at most one
//! external fetch and all of them observe the same credential or the same error.
//!
//! The fetch runs in a spawned task that owns the mutex guard. A caller that stops waiting does
//! not cancel the refresh; it still settles, updates the slot, and releases the lock.

mod metrics;

pub use self::metrics::CoordinatorMetrics;

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	credential::Credential,
	fetcher::Fetcher,
	obs::{self, Operation, OperationSpan, Outcome},
	sync::FifoMutex,
};

/// Tunables for [`TokenCoordinator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
	/// A credential stops being served this long before its expiry.
	pub safety_margin: Duration,
}
impl CoordinatorConfig {
	/// Default safety margin applied to every cached credential.
	pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_millis(10_000);

	/// Overrides the safety margin.
	pub fn with_safety_margin(mut self, safety_margin: Duration) -> Self {
		self.safety_margin = safety_margin;

		self
	}
}
impl Default for CoordinatorConfig {
	fn default() -> Self {
		Self { safety_margin: Self::DEFAULT_SAFETY_MARGIN }
	}
}

/// Explicitly owned cache coordinator; clones share the same slot, mutex, and fetcher.
#[derive(Clone)]
pub struct TokenCoordinator {
	shared: Arc<Shared>,
}
impl TokenCoordinator {
	/// Creates a coordinator that reads time from the system clock.
	pub fn new(fetcher: Arc<dyn Fetcher>, config: CoordinatorConfig) -> Self {
		Self::with_clock(fetcher, config, Arc::new(SystemClock))
	}

	/// Creates a coordinator that reads time from the provided clock.
	pub fn with_clock(
		fetcher: Arc<dyn Fetcher>,
		config: CoordinatorConfig,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self {
			shared: Arc::new(Shared {
				fetcher,
				clock,
				config,
				mutex: Default::default(),
				slot: Default::default(),
				metrics: Default::default(),
			}),
		}
	}

	/// Returns a valid credential, refreshing it first when needed or when `force_refresh` is set.
	///
	/// Must be called from within a tokio runtime; the refresh runs on a spawned task.
	pub async fn get(&self, force_refresh: bool) -> Result<Credential> {
		let stage = if force_refresh { "forced" } else { "cached" };
		let span = OperationSpan::new(Operation::Get, stage);

		self.shared.metrics.record_request();
		obs::record_outcome(Operation::Get, Outcome::Attempt);

		let (outcome, result) = span.instrument(self.resolve(force_refresh)).await;

		obs::record_outcome(Operation::Get, outcome);

		result
	}

	/// Current slot content, whether or not it is still valid.
	pub fn cached(&self) -> Option<Credential> {
		self.shared.slot.read().credential.clone()
	}

	/// Returns `true` while a refresh holds the mutex.
	pub fn is_refreshing(&self) -> bool {
		self.shared.mutex.is_locked()
	}

	/// Number of callers queued behind the in-flight refresh.
	pub fn waiting(&self) -> usize {
		self.shared.mutex.waiters()
	}

	/// Counters describing how calls were served.
	pub fn metrics(&self) -> &CoordinatorMetrics {
		&self.shared.metrics
	}

	/// Active configuration.
	pub fn config(&self) -> &CoordinatorConfig {
		&self.shared.config
	}

	async fn resolve(&self, force_refresh: bool) -> (Outcome, Result<Credential>) {
		let shared = &self.shared;

		if !force_refresh {
			if let Some(credential) = shared.valid_cached() {
				shared.metrics.record_cache_hit();

				return (Outcome::CacheHit, Ok(credential));
			}
		}

		let observed = shared.slot.read().generation;
		let guard = shared.mutex.acquire_arc().await;

		match shared.decide(observed, force_refresh) {
			Decision::Adopt(result) => {
				shared.metrics.record_coalesced();

				return (Outcome::Coalesced, result);
			},
			Decision::Serve(credential) => {
				shared.metrics.record_cache_hit();

				return (Outcome::CacheHit, Ok(credential));
			},
			Decision::Refresh => (),
		}

		shared.metrics.record_refresh();

		let task_shared = shared.clone();
		let span = OperationSpan::new(Operation::Refresh, "fetch");
		let refresh = tokio::spawn(span.instrument(async move {
			let result = task_shared.fetcher.fetch().await;

			task_shared.settle(&result);
			guard.release();

			result
		}));
		// A join error means the fetcher panicked; unwinding dropped the guard.
		let result = refresh.await.unwrap_or_else(|e| Err(Error::interaction_failed(e)));

		match &result {
			Ok(_) => (Outcome::Success, result),
			Err(_) => (Outcome::Failure, result),
		}
	}
}
impl Debug for TokenCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCoordinator")
			.field("config", &self.shared.config)
			.field("mutex", &self.shared.mutex)
			.field("generation", &self.shared.slot.read().generation)
			.finish()
	}
}

struct Shared {
	fetcher: Arc<dyn Fetcher>,
	clock: Arc<dyn Clock>,
	config: CoordinatorConfig,
	mutex: Arc<FifoMutex>,
	slot: RwLock<CacheSlot>,
	metrics: CoordinatorMetrics,
}
impl Shared {
	fn valid_cached(&self) -> Option<Credential> {
		self.slot.read().valid_at(self.clock.now_ms(), self.config.safety_margin)
	}

	// Caller holds the mutex.
	fn decide(&self, observed: u64, force_refresh: bool) -> Decision {
		let slot = self.slot.read();

		if slot.generation != observed {
			if let Some(result) = slot.last_outcome.clone() {
				return Decision::Adopt(result);
			}
		}
		if !force_refresh {
			if let Some(credential) = slot.valid_at(self.clock.now_ms(), self.config.safety_margin)
			{
				return Decision::Serve(credential);
			}
		}

		Decision::Refresh
	}

	// Caller holds the mutex.
	fn settle(&self, result: &Result<Credential>) {
		match result {
			Ok(credential) => tracing::info!(
				fingerprint = %credential.access_token.fingerprint(),
				expires_at_ms = credential.expires_at_ms,
				"Credential refreshed."
			),
			Err(e) => {
				self.metrics.record_failure();
				tracing::warn!(error = %e, kind = e.kind(), "Credential refresh failed.");
			},
		}

		let mut slot = self.slot.write();

		if let Ok(credential) = result {
			slot.credential = Some(credential.clone());
		}

		slot.generation = slot.generation.wrapping_add(1);
		slot.last_outcome = Some(result.clone());
	}
}

/// Cache slot; mutated only by the mutex holder.
#[derive(Default)]
struct CacheSlot {
	credential: Option<Credential>,
	/// Number of settled refreshes.
	generation: u64,
	last_outcome: Option<Result<Credential>>,
}
impl CacheSlot {
	fn valid_at(&self, now_ms: i64, safety_margin: Duration) -> Option<Credential> {
		self.credential.as_ref().filter(|c| c.is_valid_at(now_ms, safety_margin)).cloned()
	}
}

enum Decision {
	Adopt(Result<Credential>),
	Serve(Credential),
	Refresh,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{clock::ManualClock, fetcher::FetchFuture};

	const NOW: i64 = 1_700_000_000_000;

	struct SequenceFetcher {
		calls: AtomicU64,
		expiries: Vec<i64>,
	}
	impl Fetcher for SequenceFetcher {
		fn fetch(&self) -> FetchFuture<'_> {
			Box::pin(async move {
				let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
				let expires_at_ms = self.expiries[call.min(self.expiries.len() - 1)];

				Ok(Credential::new(format!("token-{call}"), expires_at_ms))
			})
		}
	}

	fn coordinator(
		expiries: Vec<i64>,
	) -> (TokenCoordinator, Arc<SequenceFetcher>, Arc<ManualClock>) {
		let fetcher = Arc::new(SequenceFetcher { calls: AtomicU64::new(0), expiries });
		let clock = Arc::new(ManualClock::new(NOW));
		let coordinator = TokenCoordinator::with_clock(
			fetcher.clone(),
			CoordinatorConfig::default(),
			clock.clone(),
		);

		(coordinator, fetcher, clock)
	}

	#[tokio::test]
	async fn cached_credential_is_reused_until_the_margin() {
		let (coordinator, fetcher, clock) = coordinator(vec![NOW + 60_000, NOW + 120_000]);
		let first = coordinator.get(false).await.expect("Initial refresh should succeed.");

		assert_eq!(first.access_token.expose(), "token-0");

		clock.set(NOW + 49_999);

		let reused = coordinator.get(false).await.expect("Valid cache should be served.");

		assert_eq!(reused, first);
		assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

		clock.set(NOW + 50_000);

		let refreshed = coordinator.get(false).await.expect("Expired cache should be refreshed.");

		assert_eq!(refreshed.access_token.expose(), "token-1");
		assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
		assert_eq!(coordinator.metrics().requests(), 3);
		assert_eq!(coordinator.metrics().cache_hits(), 1);
		assert_eq!(coordinator.metrics().refreshes(), 2);
		assert!(!coordinator.is_refreshing());
	}

	#[tokio::test]
	async fn forced_refresh_bypasses_a_valid_cache() {
		let (coordinator, fetcher, _clock) = coordinator(vec![NOW + 3_600_000]);

		coordinator.get(false).await.expect("Initial refresh should succeed.");

		let forced = coordinator.get(true).await.expect("Forced refresh should succeed.");

		assert_eq!(forced.access_token.expose(), "token-1");
		assert_eq!(coordinator.cached(), Some(forced));
		assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn default_config_uses_a_ten_second_margin() {
		let config = CoordinatorConfig::default();

		assert_eq!(config.safety_margin, Duration::from_secs(10));
		assert_eq!(
			config.with_safety_margin(Duration::ZERO).safety_margin,
			Duration::ZERO,
		);
	}
}

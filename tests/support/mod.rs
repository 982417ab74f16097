//! Scripted collaborators shared by the integration suites.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Semaphore;
// self
use tokenflight::{
	Credential, Error, Fetcher,
	acquisition::{
		BoxError, BrowserSession, CloseFuture, CompletedExchange, ExchangeObserver,
		InteractionSurface, SessionFuture, SessionLauncher,
	},
	fetcher::FetchFuture,
	url::Url,
};

pub const NOW: i64 = 1_700_000_000_000;
pub const TARGET: &str = "https://open.example.com/";

pub fn url(raw: &str) -> Url {
	Url::parse(raw).expect("Fixture URL should parse.")
}

pub fn token_url() -> Url {
	url("https://open.example.com/api/token")
}

pub fn token_body(access_token: &str, expires_at_ms: i64) -> String {
	format!(
		r#"{{"clientId":"web-player","accessToken":"{access_token}","accessTokenExpirationTimestampMs":{expires_at_ms},"isAnonymous":true,"_notes":"internal"}}"#
	)
}

/// One step the scripted surface performs while navigating.
#[derive(Clone, Debug)]
pub enum Step {
	/// Sleep, then report the exchange.
	Report(Duration, CompletedExchange),
	/// Sleep, then fail navigation.
	Fail(Duration, &'static str),
	/// Drop every attached observer.
	DropObservers,
}

/// Everything the scripted collaborators observed.
#[derive(Debug, Default)]
pub struct SessionStats {
	pub launches: AtomicUsize,
	pub opens: AtomicUsize,
	pub navigations: AtomicUsize,
	pub closes: AtomicUsize,
	pub rejected_notifications: AtomicUsize,
	pub detached_before_close: AtomicBool,
}
impl SessionStats {
	pub fn launches(&self) -> usize {
		self.launches.load(Ordering::SeqCst)
	}

	pub fn opens(&self) -> usize {
		self.opens.load(Ordering::SeqCst)
	}

	pub fn navigations(&self) -> usize {
		self.navigations.load(Ordering::SeqCst)
	}

	pub fn closes(&self) -> usize {
		self.closes.load(Ordering::SeqCst)
	}

	pub fn rejected_notifications(&self) -> usize {
		self.rejected_notifications.load(Ordering::SeqCst)
	}

	pub fn detached_before_close(&self) -> bool {
		self.detached_before_close.load(Ordering::SeqCst)
	}
}

/// [`SessionLauncher`] that replays a fixed script on every attempt.
#[derive(Clone, Debug, Default)]
pub struct ScriptedLauncher {
	pub stats: Arc<SessionStats>,
	launch_error: Option<&'static str>,
	open_error: Option<&'static str>,
	hang_launch: bool,
	hang_close: bool,
	steps: Vec<Step>,
}
impl ScriptedLauncher {
	pub fn new(steps: Vec<Step>) -> Self {
		Self { steps, ..Default::default() }
	}

	pub fn failing_launch(message: &'static str) -> Self {
		Self { launch_error: Some(message), ..Default::default() }
	}

	pub fn failing_open(message: &'static str) -> Self {
		Self { open_error: Some(message), ..Default::default() }
	}

	/// Launches never complete.
	pub fn hanging_launch() -> Self {
		Self { hang_launch: true, ..Default::default() }
	}

	/// Sessions follow `steps` but never finish closing.
	pub fn hanging_close(steps: Vec<Step>) -> Self {
		Self { hang_close: true, steps, ..Default::default() }
	}
}
impl SessionLauncher for ScriptedLauncher {
	fn launch(&self) -> SessionFuture<'_, Box<dyn BrowserSession>> {
		Box::pin(async move {
			self.stats.launches.fetch_add(1, Ordering::SeqCst);

			if self.hang_launch {
				std::future::pending::<()>().await;
			}
			if let Some(message) = self.launch_error {
				return Err(BoxError::from(message));
			}

			let session: Box<dyn BrowserSession> = Box::new(ScriptedSession {
				stats: self.stats.clone(),
				open_error: self.open_error,
				hang_close: self.hang_close,
				steps: self.steps.clone(),
				observers_attached: Arc::new(AtomicBool::new(false)),
			});

			Ok(session)
		})
	}
}

struct ScriptedSession {
	stats: Arc<SessionStats>,
	open_error: Option<&'static str>,
	hang_close: bool,
	steps: Vec<Step>,
	observers_attached: Arc<AtomicBool>,
}
impl BrowserSession for ScriptedSession {
	fn open_surface(&mut self) -> SessionFuture<'_, Box<dyn InteractionSurface>> {
		Box::pin(async move {
			self.stats.opens.fetch_add(1, Ordering::SeqCst);

			if let Some(message) = self.open_error {
				return Err(BoxError::from(message));
			}

			self.observers_attached.store(true, Ordering::SeqCst);

			let surface: Box<dyn InteractionSurface> = Box::new(ScriptedSurface {
				stats: self.stats.clone(),
				steps: self.steps.clone(),
				observers: Mutex::new(Vec::new()),
				attached: self.observers_attached.clone(),
			});

			Ok(surface)
		})
	}

	fn close(self: Box<Self>) -> CloseFuture {
		let stats = self.stats.clone();
		let observers_attached = self.observers_attached.clone();
		let hang_close = self.hang_close;

		Box::pin(async move {
			if stats.closes.fetch_add(1, Ordering::SeqCst) == 0 {
				let detached = !observers_attached.load(Ordering::SeqCst);

				stats.detached_before_close.store(detached, Ordering::SeqCst);
			}
			if hang_close {
				std::future::pending::<()>().await;
			}
		})
	}
}

struct ScriptedSurface {
	stats: Arc<SessionStats>,
	steps: Vec<Step>,
	observers: Mutex<Vec<ExchangeObserver>>,
	attached: Arc<AtomicBool>,
}
impl InteractionSurface for ScriptedSurface {
	fn attach(&mut self, observer: ExchangeObserver) {
		self.observers.lock().push(observer);
	}

	fn navigate<'a>(&'a self, _: &'a Url) -> SessionFuture<'a, ()> {
		Box::pin(async move {
			self.stats.navigations.fetch_add(1, Ordering::SeqCst);

			for step in &self.steps {
				match step {
					Step::Report(delay, exchange) => {
						tokio::time::sleep(*delay).await;

						for observer in self.observers.lock().iter() {
							if !observer.notify(exchange.clone()) {
								self.stats.rejected_notifications.fetch_add(1, Ordering::SeqCst);
							}
						}
					},
					Step::Fail(delay, message) => {
						tokio::time::sleep(*delay).await;

						return Err(BoxError::from(*message));
					},
					Step::DropObservers => self.observers.lock().clear(),
				}
			}

			Ok(())
		})
	}
}
impl Drop for ScriptedSurface {
	fn drop(&mut self) {
		// Observers are expected to be detached before the surface goes away.
		let detached = self.observers.lock().iter().all(ExchangeObserver::is_detached);

		self.attached.store(!detached, Ordering::SeqCst);
	}
}

/// Outcome a [`GatedFetcher`] produces for one call.
pub enum Outcome {
	Ready(Result<Credential, Error>),
	Panic,
}

/// [`Fetcher`] whose calls block until the test opens the gate, then replay queued outcomes.
pub struct GatedFetcher {
	gate: Semaphore,
	calls: AtomicUsize,
	outcomes: Mutex<VecDeque<Outcome>>,
}
impl GatedFetcher {
	pub fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
		Arc::new(Self {
			gate: Semaphore::new(0),
			calls: AtomicUsize::new(0),
			outcomes: Mutex::new(outcomes.into_iter().collect()),
		})
	}

	/// Same as [`new`](Self::new) with the gate already open for every queued outcome.
	pub fn open(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
		let fetcher = Self::new(outcomes);

		fetcher.release(fetcher.outcomes.lock().len());

		fetcher
	}

	pub fn release(&self, permits: usize) {
		self.gate.add_permits(permits);
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl Fetcher for GatedFetcher {
	fn fetch(&self) -> FetchFuture<'_> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.gate.acquire().await.expect("Gate should never be closed.").forget();

			let outcome = self
				.outcomes
				.lock()
				.pop_front()
				.expect("Fetcher was called more often than scripted.");

			match outcome {
				Outcome::Ready(result) => result,
				Outcome::Panic => panic!("Scripted fetcher panic."),
			}
		})
	}
}

pub fn ok(access_token: &str, expires_at_ms: i64) -> Outcome {
	Outcome::Ready(Ok(Credential::new(access_token, expires_at_ms)))
}

pub fn deadline() -> Outcome {
	Outcome::Ready(Err(Error::DeadlineExceeded { deadline: Duration::from_secs(15) }))
}

/// Yields until `condition` holds, failing the test after a generous number of turns.
pub async fn settle_until(mut condition: impl FnMut() -> bool) {
	for _ in 0..10_000 {
		if condition() {
			return;
		}

		tokio::task::yield_now().await;
	}

	panic!("Condition was not reached.");
}

//! Headless interaction capability the acquisition protocol drives.
//!
//! The protocol depends only on these traits: launch a session, open one interaction surface on
//! it, attach an observer for completed exchanges, navigate to the target URL, and close the
//! session. Implementations wrap whatever actually talks to the source (a browser driver, a plain
//! HTTP client, a test script).
//!
//! [`BrowserSession::close`] consumes the session, so the protocol can release it only once.
//! Implementations should still free their resources on `Drop` in case the acquisition future
//! itself is dropped before it settles.

// crates.io
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
// self
use crate::_prelude::*;

/// Error type reported by collaborator implementations.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Boxed future returned by fallible collaborator calls.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BoxError>> + 'a + Send>>;

/// Boxed future returned by [`BrowserSession::close`].
pub type CloseFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Starts external sessions.
pub trait SessionLauncher
where
	Self: Send + Sync,
{
	/// Launches a fresh session. Sessions are never shared across attempts.
	///
	/// A launch still pending after the attempt deadline is dropped and reported as
	/// [`Error::SessionUnavailable`](crate::Error::SessionUnavailable).
	fn launch(&self) -> SessionFuture<'_, Box<dyn BrowserSession>>;
}

/// One launched session owning external resources.
pub trait BrowserSession
where
	Self: Send,
{
	/// Opens the interaction surface (a page or equivalent) the protocol navigates with.
	fn open_surface(&mut self) -> SessionFuture<'_, Box<dyn InteractionSurface>>;

	/// Releases the session and everything opened on it.
	///
	/// Abandoned with a warning if it has not finished within the attempt deadline.
	fn close(self: Box<Self>) -> CloseFuture;
}

/// Surface on which navigation happens and completed exchanges are reported.
pub trait InteractionSurface
where
	Self: Send + Sync,
{
	/// Registers an observer for completed exchanges.
	///
	/// Implementations report every completed exchange through
	/// [`ExchangeObserver::notify`] until it returns `false`.
	fn attach(&mut self, observer: ExchangeObserver);

	/// Starts navigating to `url`. Resolves once navigation finishes or fails; the token exchange
	/// may be reported before or after that.
	fn navigate<'a>(&'a self, url: &'a Url) -> SessionFuture<'a, ()>;
}

/// A request the surface issued and saw complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedExchange {
	/// Request target.
	pub url: Url,
	/// Response, if the request completed with one.
	pub response: Option<ExchangeResponse>,
}
impl CompletedExchange {
	/// Creates an exchange that completed with `status` and `body`.
	pub fn new(url: Url, status: u16, body: impl Into<String>) -> Self {
		Self { url, response: Some(ExchangeResponse { status, body: body.into() }) }
	}

	/// Creates an exchange that completed without a response.
	pub fn without_response(url: Url) -> Self {
		Self { url, response: None }
	}
}

/// Response half of a [`CompletedExchange`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body as text.
	pub body: String,
}
impl ExchangeResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Handle through which a surface reports completed exchanges.
///
/// The protocol detaches every observer once the attempt settles; after that
/// [`notify`](Self::notify) returns `false` and [`is_detached`](Self::is_detached) returns `true`.
#[derive(Clone, Debug)]
pub struct ExchangeObserver(UnboundedSender<CompletedExchange>);
impl ExchangeObserver {
	/// Reports a completed exchange. Returns `false` once the observer is detached.
	pub fn notify(&self, exchange: CompletedExchange) -> bool {
		self.0.send(exchange).is_ok()
	}

	/// Returns `true` once the attempt that attached this observer has settled.
	pub fn is_detached(&self) -> bool {
		self.0.is_closed()
	}
}

pub(crate) fn observer_channel() -> (ExchangeObserver, UnboundedReceiver<CompletedExchange>) {
	let (sender, receiver) = mpsc::unbounded_channel();

	(ExchangeObserver(sender), receiver)
}

//! Refresh contract the coordinator delegates to.

// self
use crate::{_prelude::*, credential::Credential};

/// Boxed future returned by [`Fetcher::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Credential>> + 'a + Send>>;

/// Produces a fresh [`Credential`] from the external source.
///
/// The coordinator calls `fetch` at most once per refresh and never concurrently with itself, so
/// implementations do not need their own deduplication. Each call is an independent attempt; any
/// retry policy belongs to the caller of the coordinator.
pub trait Fetcher
where
	Self: Send + Sync,
{
	/// Runs one refresh attempt to settlement.
	fn fetch(&self) -> FetchFuture<'_>;
}
impl<F> Fetcher for Arc<F>
where
	F: ?Sized + Fetcher,
{
	fn fetch(&self) -> FetchFuture<'_> {
		(**self).fetch()
	}
}

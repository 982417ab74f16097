//! Single-flight, deadline-bound access token cache. One refresh is in flight at a time, every
//! waiter is bound to its outcome, and external sessions are released on every path.
//!
//! The crate is layered so the core never depends on its outer surfaces:
//!
//! - [`sync`] provides the FIFO-fair async mutex that serializes refreshes.
//! - [`coordinator`] owns the cache slot and implements the double-check refresh protocol.
//! - [`fetcher`] defines the refresh contract the coordinator delegates to.
//! - [`acquisition`] implements that contract as a bounded race between a headless session, its
//!   observed exchanges, and a hard deadline.
//! - `server` (feature `server`) exposes the coordinator over HTTP.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod acquisition;
pub mod clock;
pub mod coordinator;
pub mod credential;
pub mod error;
pub mod fetcher;
pub mod obs;
#[cfg(feature = "server")] pub mod server;
pub mod sync;

mod _prelude {
	pub use std::{
		collections::VecDeque,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::{
			Arc,
			atomic::{AtomicI64, AtomicU64, Ordering},
		},
		time::Duration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::Client as ReqwestClient;
	pub use serde::Deserialize;
	pub use serde_json::{Map, Value};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use coordinator::{CoordinatorConfig, TokenCoordinator};
pub use credential::{Credential, TokenSecret};
pub use error::{Error, Result};
pub use fetcher::Fetcher;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

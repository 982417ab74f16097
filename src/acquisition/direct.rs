//! Session launcher backed by a plain reqwest client.
//!
//! Navigation issues a single `GET` and reports the completed exchange under the final URL,
//! after redirects. It suits sources whose target URL serves or redirects to the token endpoint
//! directly; sources that only issue the exchange from script need a browser-backed launcher.
//!
//! Observers are detached once the single exchange is reported, so a final URL that is not the
//! token endpoint settles the attempt immediately instead of waiting out the deadline.

// self
use crate::{_prelude::*, acquisition::session::*};

/// [`SessionLauncher`] whose sessions are cheap handles over a shared [`ReqwestClient`].
#[derive(Clone, Debug, Default)]
pub struct HttpSessionLauncher {
	client: ReqwestClient,
}
impl HttpSessionLauncher {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client }
	}
}
impl SessionLauncher for HttpSessionLauncher {
	fn launch(&self) -> SessionFuture<'_, Box<dyn BrowserSession>> {
		let session: Box<dyn BrowserSession> =
			Box::new(HttpSession { client: self.client.clone() });

		Box::pin(async move { Ok(session) })
	}
}

struct HttpSession {
	client: ReqwestClient,
}
impl BrowserSession for HttpSession {
	fn open_surface(&mut self) -> SessionFuture<'_, Box<dyn InteractionSurface>> {
		let surface: Box<dyn InteractionSurface> = Box::new(HttpSurface {
			client: self.client.clone(),
			observers: Mutex::new(Vec::new()),
		});

		Box::pin(async move { Ok(surface) })
	}

	fn close(self: Box<Self>) -> CloseFuture {
		Box::pin(async {})
	}
}

struct HttpSurface {
	client: ReqwestClient,
	observers: Mutex<Vec<ExchangeObserver>>,
}
impl HttpSurface {
	// No further exchange can follow, so observers are dropped after the report.
	fn report(&self, exchange: CompletedExchange) {
		let observers = std::mem::take(&mut *self.observers.lock());

		for observer in observers {
			observer.notify(exchange.clone());
		}
	}
}
impl InteractionSurface for HttpSurface {
	fn attach(&mut self, observer: ExchangeObserver) {
		self.observers.get_mut().push(observer);
	}

	fn navigate<'a>(&'a self, url: &'a Url) -> SessionFuture<'a, ()> {
		Box::pin(async move {
			let response = self.client.get(url.clone()).send().await?;
			let final_url = response.url().clone();
			let status = response.status().as_u16();

			tracing::debug!(url = %final_url, status, "Exchange completed.");

			match response.text().await {
				Ok(body) => self.report(CompletedExchange::new(final_url, status, body)),
				Err(e) => {
					tracing::debug!(
						url = %final_url,
						error = %e,
						"Response body could not be read."
					);

					self.report(CompletedExchange::without_response(final_url));
				},
			}

			Ok(())
		})
	}
}

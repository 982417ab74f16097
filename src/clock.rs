//! Wall-clock abstraction used for credential validity checks.

// self
use crate::_prelude::*;

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Current time in milliseconds since the Unix epoch.
	fn now_ms(&self) -> i64;
}

/// [`Clock`] backed by the system UTC clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now_ms(&self) -> i64 {
		let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;

		i64::try_from(millis).unwrap_or(i64::MAX)
	}
}

/// Manually driven [`Clock`] for deterministic expiry tests.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);
impl ManualClock {
	/// Creates a clock frozen at `now_ms`.
	pub fn new(now_ms: i64) -> Self {
		Self(AtomicI64::new(now_ms))
	}

	/// Moves the clock to `now_ms`.
	pub fn set(&self, now_ms: i64) {
		self.0.store(now_ms, Ordering::SeqCst);
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: Duration) {
		let delta_ms = i64::try_from(delta.as_millis()).unwrap_or(i64::MAX);

		self.0.fetch_add(delta_ms, Ordering::SeqCst);
	}
}
impl Clock for ManualClock {
	fn now_ms(&self) -> i64 {
		self.0.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn system_clock_reports_milliseconds() {
		let before = OffsetDateTime::now_utc().unix_timestamp() * 1_000;
		let now = SystemClock.now_ms();
		let after = OffsetDateTime::now_utc().unix_timestamp() * 1_000 + 1_000;

		assert!(now >= before && now <= after);
	}

	#[test]
	fn manual_clock_moves_only_when_told() {
		let clock = ManualClock::new(1_000);

		assert_eq!(clock.now_ms(), 1_000);

		clock.advance(Duration::from_millis(250));

		assert_eq!(clock.now_ms(), 1_250);

		clock.set(42);

		assert_eq!(clock.now_ms(), 42);
	}
}

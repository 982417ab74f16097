// crates.io
use clap::ValueEnum;
use tracing_subscriber::{
	EnvFilter, fmt, fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Default verbosity when `RUST_LOG` is unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
	/// Everything, including per-exchange details.
	Trace,
	/// Attempt failures and exchange summaries.
	Debug,
	/// Refreshes and served requests.
	Info,
	/// Failed refreshes and deadline drift.
	Warn,
	/// Boundary failures only.
	Error,
}
impl LogLevel {
	/// Directive understood by [`EnvFilter`].
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Trace => "trace",
			Self::Debug => "debug",
			Self::Info => "info",
			Self::Warn => "warn",
			Self::Error => "error",
		}
	}
}

/// Log line format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	/// Human-readable single-line output with ANSI colors.
	Compact,
	/// Flattened JSON objects without ANSI codes, for log collectors.
	Json,
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging(level: LogLevel, format: LogFormat) {
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
	let registry = tracing_subscriber::registry().with(env_filter);

	match format {
		LogFormat::Json => {
			let layer = fmt::layer()
				.json()
				.with_timer(UtcTime::rfc_3339())
				.flatten_event(true)
				.with_ansi(false);

			let _ = registry.with(layer).try_init();
		},
		LogFormat::Compact => {
			let layer = fmt::layer().compact().with_timer(UtcTime::rfc_3339()).with_ansi(true);

			let _ = registry.with(layer).try_init();
		},
	}
}

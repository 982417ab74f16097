// std
use std::net::SocketAddr;
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	acquisition::AcquisitionConfig,
	coordinator::CoordinatorConfig,
	server::{LogFormat, LogLevel},
};

/// Command-line and environment configuration for the token endpoint.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
	/// Address the HTTP boundary listens on.
	#[arg(long, env = "TOKENFLIGHT_LISTEN", default_value = "127.0.0.1:8080")]
	pub listen: SocketAddr,
	/// Page navigated to when acquiring a fresh token.
	#[arg(long, env = "TOKENFLIGHT_TARGET_URL")]
	pub target_url: Url,
	/// Path suffix identifying the token exchange.
	#[arg(
		long,
		env = "TOKENFLIGHT_TOKEN_PATH_SUFFIX",
		default_value = AcquisitionConfig::DEFAULT_TOKEN_PATH_SUFFIX
	)]
	pub token_path_suffix: String,
	/// Hard deadline for one acquisition attempt, in milliseconds.
	#[arg(long, env = "TOKENFLIGHT_DEADLINE_MS", default_value_t = 15_000)]
	pub deadline_ms: u64,
	/// Credentials stop being served this many milliseconds before they expire.
	#[arg(long, env = "TOKENFLIGHT_SAFETY_MARGIN_MS", default_value_t = 10_000)]
	pub safety_margin_ms: u64,
	/// Default log level; `RUST_LOG` takes precedence when set.
	#[arg(long, env = "TOKENFLIGHT_LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
	pub log_level: LogLevel,
	/// Log output format.
	#[arg(
		long,
		env = "TOKENFLIGHT_LOG_FORMAT",
		value_enum,
		default_value_t = LogFormat::Compact
	)]
	pub log_format: LogFormat,
}
impl Args {
	/// Acquisition settings; validated when the fetcher is built.
	pub fn acquisition_config(&self) -> AcquisitionConfig {
		AcquisitionConfig::new(self.target_url.clone())
			.with_token_path_suffix(self.token_path_suffix.clone())
			.with_deadline(Duration::from_millis(self.deadline_ms))
	}

	/// Coordinator settings.
	pub fn coordinator_config(&self) -> CoordinatorConfig {
		CoordinatorConfig::default()
			.with_safety_margin(Duration::from_millis(self.safety_margin_ms))
	}
}

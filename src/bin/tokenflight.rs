//! Token endpoint binary.

// crates.io
use clap::Parser;
use tokenflight::server::{self, Args, ServeError};

#[tokio::main]
async fn main() -> Result<(), ServeError> {
	server::run(Args::parse()).await
}

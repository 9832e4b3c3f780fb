//! dssync - keep Porkbun DS records in step with live DNSSEC keys.

use anyhow::Result;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dssync_cli::run().await
}

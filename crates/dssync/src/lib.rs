//! Keep registrar DS records in step with the keys a zone actually serves.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dssync::{DnsProbe, Engine, EngineOptions, PorkbunClient, ProbeConfig};
//!
//! #[tokio::main]
//! async fn main() -> dssync::Result<()> {
//!     let registrar = Arc::new(PorkbunClient::new("pk1_...", "sk1_...")?);
//!     let probe = Arc::new(DnsProbe::new(ProbeConfig::default())?);
//!     let engine = Engine::new(registrar, probe, EngineOptions::default());
//!
//!     let domains = vec!["example.com".parse()?];
//!     for report in engine.reconcile(&domains).await {
//!         println!("{}: {} change(s)", report.domain, report.outcomes.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The engine is driven through the [`Registrar`] and [`DnskeyProbe`]
//! traits; [`PorkbunClient`] and [`DnsProbe`] are the production
//! implementations.
//!
//! - [`reconcile`]: plan and apply DS creations and deletions
//! - [`audit`]: compare live KSKs with published DS records
//! - [`provision`]: bring up a new zone and delegate it
//! - [`batch`]: bounded, order-preserving fan-out over domains

pub mod audit;
pub mod batch;
mod engine;
mod failure;
pub mod provision;
pub mod reconcile;

#[cfg(test)]
mod testing;

pub use engine::{Engine, EngineOptions};
pub use failure::{Failure, FailureKind};

// Re-export core types
pub use dssync_core::*;

// Re-export production collaborators
pub use dssync_client::{PorkbunClient, PorkbunClientBuilder, RateLimit, RetryConfig};
pub use dssync_probe::{parse_server_addr, DnsProbe, ProbeConfig, ProbeError, Transport};

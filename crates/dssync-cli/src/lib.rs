//! # dssync-cli
//!
//! Command-line front end for the `dssync` engine.
//!
//! ## Commands
//!
//! - **list**: audit table of nameservers, live KSKs and published DS records
//! - **sync**: create missing and delete stale DS records at the registrar
//! - **provision**: bring up a zone locally and delegate it
//! - **ns**: registrar nameservers per domain
//! - **config**: show the config file path or its masked contents
//!
//! Output is a pretty table by default; JSON, CSV and YAML are available
//! with `--output`.

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;

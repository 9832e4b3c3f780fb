//! HTTP client for the Porkbun registrar API.
//!
//! This crate provides [`PorkbunClient`], a typed wrapper over the registrar
//! calls dssync needs: domain listing, nameserver delegation and DS record
//! management. It implements [`dssync_core::Registrar`].

mod client;
mod config;
pub mod api;
mod registrar;
mod wire;

pub use client::{PorkbunClient, PorkbunClientBuilder};
pub use config::*;
pub use dssync_core::{Result, SyncError};

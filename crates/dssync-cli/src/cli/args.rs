//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Keep Porkbun DS records in step with the DNSSEC keys your zones serve
///
/// Audits delegations, reconciles DS records against live KSKs and
/// provisions new zones on a BIND primary.
///
/// Credentials are read from the config file or from the
/// PORKBUN_API_KEY and PORKBUN_SECRET_API_KEY environment variables.
#[derive(Parser, Debug)]
#[command(name = "dssync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (TOML, or JSON by extension)
    #[arg(short, long, env = "DSSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Domains processed concurrently (1-20)
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit nameservers, live KSKs and published DS records
    List(ListArgs),

    /// Create missing and delete stale DS records
    Sync(SyncArgs),

    /// Create a zone, register it with the primary and delegate it
    Provision(ProvisionArgs),

    /// Show registrar nameservers
    Ns(NsArgs),

    /// Inspect CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// List command
// ============================================================================

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Domains to audit (default: every domain in the account)
    pub domains: Vec<String>,
}

// ============================================================================
// Sync command
// ============================================================================

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Domains to reconcile (default: every domain in the account)
    pub domains: Vec<String>,

    /// Show the plan without touching the registrar
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// DS digest type (1 = SHA-1, 2 = SHA-256, 4 = SHA-384)
    #[arg(long)]
    pub digest_type: Option<u8>,

    /// Exit with status 2 if any domain reported an error
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Provision command
// ============================================================================

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Domain to provision
    pub domain: String,

    /// Continue even if `rndc addzone` fails (zone already loaded)
    #[arg(short, long)]
    pub force: bool,

    /// Stop after verification; do not update the registrar
    #[arg(long)]
    pub skip_registrar: bool,
}

// ============================================================================
// Ns command
// ============================================================================

#[derive(Args, Debug)]
pub struct NsArgs {
    /// Domains to show (default: every domain in the account)
    pub domains: Vec<String>,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the config file path
    Path,

    /// Print the loaded configuration with secrets masked
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_is_counted() {
        let cli = Cli::parse_from(["dssync", "-vv", "list"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn sync_flags_parse() {
        let cli = Cli::parse_from([
            "dssync",
            "sync",
            "example.com",
            "example.net",
            "--dry-run",
            "--digest-type",
            "1",
            "--strict",
            "--jobs",
            "4",
        ]);
        assert_eq!(cli.jobs, Some(4));
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.domains, ["example.com", "example.net"]);
                assert!(args.dry_run);
                assert!(args.strict);
                assert_eq!(args.digest_type, Some(1));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn provision_requires_domain() {
        assert!(Cli::try_parse_from(["dssync", "provision"]).is_err());
    }
}

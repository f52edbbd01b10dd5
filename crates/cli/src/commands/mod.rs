//! CLI command definitions and execution
//!
//! Every command parses its arguments, opens a [`Session`] for the profile it
//! targets and hands the work to nav-core.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use nav_core::{ConfigManager, Defaults, Error, ObjectStore, ProfileManager};
use nav_s3::{MultipartConfig, S3Client};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod get;
mod job;
mod ls;
mod mb;
mod mkdir;
mod profile;
mod put;
mod rm;

/// s3nav - browse and transfer objects on S3-compatible storage
///
/// Remote paths have the form profile/bucket/key; folders end in '/'.
#[derive(Parser, Debug)]
#[command(name = "s3nav")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage connection profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// List buckets, folders and files
    Ls(ls::LsArgs),

    /// Download a file or folder
    Get(get::GetArgs),

    /// Upload a local file or directory
    Put(put::PutArgs),

    /// Remove a file, a folder or an empty bucket
    Rm(rm::RmArgs),

    /// Create a bucket
    Mb(mb::MbArgs),

    /// Create a folder
    Mkdir(mkdir::MkdirArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Profile(cmd) => profile::execute(cmd, output_config).await,
        Commands::Ls(args) => ls::execute(args, output_config).await,
        Commands::Get(args) => get::execute(args, output_config).await,
        Commands::Put(args) => put::execute(args, output_config).await,
        Commands::Rm(args) => rm::execute(args, output_config).await,
        Commands::Mb(args) => mb::execute(args, output_config).await,
        Commands::Mkdir(args) => mkdir::execute(args, output_config).await,
    }
}

/// Settings and a connected client for one profile
pub(crate) struct Session {
    pub defaults: Defaults,
    pub client: S3Client,
}

impl Session {
    /// Load `profile` and connect, signing for `bucket`'s region when given
    pub async fn open(profile: &str, bucket: Option<&str>) -> nav_core::Result<Self> {
        let config_manager = ConfigManager::new()?;
        let defaults = config_manager.load()?.defaults;
        let profile = ProfileManager::with_config_manager(config_manager).get(profile)?;

        let multipart = MultipartConfig::new().part_size(defaults.part_size_bytes());
        let client = S3Client::new(&profile).await?.with_multipart(multipart);
        let client = match bucket {
            Some(bucket) if !bucket.is_empty() => client.for_bucket(bucket).await,
            _ => client,
        };

        Ok(Self { defaults, client })
    }

    /// Shared handle for transfer jobs
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::new(self.client.clone())
    }
}

/// Report an engine error and pick the matching exit code
pub(crate) fn fail(formatter: &Formatter, error: &Error) -> ExitCode {
    formatter.error(&error.to_string());
    ExitCode::from_error(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["s3nav", "ls", "local/", "--json", "-q"]).unwrap();
        assert!(cli.json);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Ls(_)));
    }

    #[test]
    fn test_get_conflict_flags_are_exclusive() {
        let result = Cli::try_parse_from([
            "s3nav",
            "get",
            "p/b/k",
            "--overwrite",
            "--skip-existing",
        ]);
        assert!(result.is_err());
    }
}

//! Profile management commands
//!
//! A profile names an S3-compatible endpoint together with the credentials
//! and addressing options used to reach it.

use clap::Subcommand;
use nav_core::{Profile, ProfileManager};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

use super::fail;

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all configured profiles
    List(ListArgs),

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "local", "aws", "backup")
    pub name: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Endpoint URL; omit for AWS S3
    #[arg(long, default_value = "")]
    pub endpoint: String,

    /// Default region
    #[arg(long, default_value = nav_core::profile::DEFAULT_REGION)]
    pub region: String,

    /// Skip TLS certificate verification
    #[arg(long, default_value = "false")]
    pub no_verify_tls: bool,

    /// Address buckets as subdomains instead of path segments
    #[arg(long, default_value = "false")]
    pub virtual_host: bool,
}

/// Arguments for the `profile list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show region and addressing details
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

#[derive(Serialize)]
struct ProfileListOutput {
    profiles: Vec<ProfileInfo>,
}

/// Profile fields safe to print
#[derive(Serialize)]
struct ProfileInfo {
    name: String,
    endpoint: String,
    region: String,
    access_key: String,
    secret_key: String,
    verify_tls: bool,
    path_style: bool,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            endpoint: display_endpoint(profile).to_string(),
            region: profile.region.clone(),
            access_key: profile.access_key.clone(),
            secret_key: profile.masked_secret(),
            verify_tls: profile.verify_tls,
            path_style: profile.path_style,
        }
    }
}

#[derive(Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

fn display_endpoint(profile: &Profile) -> &str {
    if profile.endpoint.is_empty() {
        "(aws)"
    } else {
        &profile.endpoint
    }
}

/// Execute a profile subcommand
pub async fn execute(cmd: ProfileCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let manager = match ProfileManager::new() {
        Ok(manager) => manager,
        Err(e) => return fail(&formatter, &e),
    };

    match cmd {
        ProfileCommands::Set(args) => execute_set(args, &manager, &formatter),
        ProfileCommands::List(args) => execute_list(args, &manager, &formatter),
        ProfileCommands::Remove(args) => execute_remove(args, &manager, &formatter),
    }
}

fn profile_from_args(args: SetArgs) -> Profile {
    let mut profile = Profile::new(args.name, args.endpoint, args.access_key, args.secret_key);
    profile.region = args.region;
    profile.verify_tls = !args.no_verify_tls;
    profile.path_style = !args.virtual_host;
    profile
}

fn execute_set(args: SetArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let profile = profile_from_args(args);
    let name = profile.name.clone();

    match manager.set(profile) {
        Ok(()) => {
            let message = format!("Profile '{name}' configured successfully");
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => fail(formatter, &e),
    }
}

fn execute_list(args: ListArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let profiles = match manager.list() {
        Ok(profiles) => profiles,
        Err(e) => return fail(formatter, &e),
    };

    if formatter.is_json() {
        formatter.json(&ProfileListOutput {
            profiles: profiles.iter().map(ProfileInfo::from).collect(),
        });
    } else if profiles.is_empty() {
        formatter.println("No profiles configured.");
    } else {
        for profile in &profiles {
            formatter.println(&list_line(profile, args.long));
        }
    }
    ExitCode::Success
}

fn list_line(profile: &Profile, long: bool) -> String {
    if !long {
        return format!("{:<12} {}", profile.name, display_endpoint(profile));
    }
    format!(
        "{:<12} {} (region: {}, key: {}, secret: {}, tls: {}, style: {})",
        profile.name,
        display_endpoint(profile),
        profile.region,
        profile.access_key,
        profile.masked_secret(),
        if profile.verify_tls { "verified" } else { "unverified" },
        if profile.path_style { "path" } else { "virtual-host" },
    )
}

fn execute_remove(args: RemoveArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            let message = format!("Profile '{}' removed successfully", args.name);
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => fail(formatter, &e),
    }
}

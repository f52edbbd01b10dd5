//! put command - Upload a local file or directory
//!
//! A directory is uploaded under its own name, keeping its layout. Empty
//! directories become folder markers.

use std::path::PathBuf;

use clap::Args;
use nav_core::namespace::folder_prefix;
use nav_core::{Error, JobOptions, RemotePath, UploadPlan, parse_remote, spawn_upload};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Prompter};

use super::job::{drive, finish, plan_summary};
use super::{Session, fail};

/// Upload a file or directory
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file or directory
    pub source: PathBuf,

    /// Remote folder to upload into (profile/bucket[/prefix])
    pub target: String,

    /// Do not ask for confirmation before starting
    #[arg(short, long)]
    pub yes: bool,
}

/// Execute the put command
pub async fn execute(args: PutArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let target = match parse_remote(&args.target) {
        Ok(target) if !target.bucket.is_empty() => target,
        Ok(_) => {
            formatter.error("Choose a bucket to upload into: profile/bucket[/prefix]");
            return ExitCode::UsageError;
        }
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    let prefix = folder_prefix(&target.key);
    let plan = match UploadPlan::resolve(&target.bucket, &args.source, &prefix) {
        Ok(plan) => plan,
        Err(e) => return fail(&formatter, &e),
    };

    let session = match Session::open(&target.profile, Some(&target.bucket)).await {
        Ok(session) => session,
        Err(e) => return fail(&formatter, &e),
    };

    let total_bytes = plan.total_bytes();
    let prompter = Prompter::new(formatter.is_json());
    if needs_confirmation(&args, &plan) && prompter.is_interactive() {
        let summary =
            plan_summary("Upload", plan.object_count(), total_bytes, &destination(&target));
        match prompter.confirm(&summary) {
            Ok(true) => {}
            Ok(false) => {
                formatter.warning("Upload aborted");
                return ExitCode::Success;
            }
            Err(e) => return fail(&formatter, &Error::Io(e)),
        }
    }

    tracing::info!(source = %args.source.display(), target = %target, "starting upload");
    let options = JobOptions::default().progress_interval(session.defaults.progress_interval());
    let handle = spawn_upload(session.store(), plan, options);

    match drive(handle, total_bytes, &formatter).await {
        Ok(report) => finish(report, "Uploaded", &formatter),
        Err(e) => fail(&formatter, &e),
    }
}

/// A single file goes straight up; anything larger is confirmed first
fn needs_confirmation(args: &PutArgs, plan: &UploadPlan) -> bool {
    !args.yes && plan.object_count() > 1
}

fn destination(target: &RemotePath) -> String {
    format!("{}/{}/{}", target.profile, target.bucket, folder_prefix(&target.key))
}

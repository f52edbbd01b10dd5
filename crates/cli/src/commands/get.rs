//! get command - Download a file or folder to local disk
//!
//! Folders are downloaded with their whole subtree. Existing local files are
//! handled according to the conflict flags, or by asking.

use std::path::PathBuf;

use clap::Args;
use nav_core::namespace::{folder_prefix, list};
use nav_core::{
    ConflictMode, DownloadPlan, Entry, Error, JobOptions, Location, RemotePath, Result,
    StoreErrorKind, parse_remote, spawn_download,
};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Prompter};

use super::job::{drive, finish, plan_summary};
use super::{Session, fail};

/// Download a file or folder
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Remote file or folder (profile/bucket/key)
    pub source: String,

    /// Local directory to download into (defaults to the configured download directory)
    pub dest: Option<PathBuf>,

    /// Replace existing local files without asking
    #[arg(long, conflicts_with = "skip_existing")]
    pub overwrite: bool,

    /// Keep existing local files without asking
    #[arg(long)]
    pub skip_existing: bool,

    /// Do not ask for confirmation before starting
    #[arg(short, long)]
    pub yes: bool,
}

impl GetArgs {
    fn conflict_mode(&self) -> ConflictMode {
        if self.overwrite {
            ConflictMode::OverwriteAll
        } else if self.skip_existing {
            ConflictMode::SkipAll
        } else {
            ConflictMode::Ask
        }
    }
}

/// Execute the get command
pub async fn execute(args: GetArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let remote = match parse_remote(&args.source) {
        Ok(remote) if !remote.key.is_empty() => remote,
        Ok(_) => {
            formatter.error("Choose a file or folder inside a bucket: profile/bucket/key");
            return ExitCode::UsageError;
        }
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    let session = match Session::open(&remote.profile, Some(&remote.bucket)).await {
        Ok(session) => session,
        Err(e) => return fail(&formatter, &e),
    };

    let dest = match args.dest.clone() {
        Some(dest) => dest,
        None => match session.defaults.download_dir() {
            Ok(dest) => dest,
            Err(e) => return fail(&formatter, &e),
        },
    };

    let location = parent_location(&remote);
    let plan = match find_entry(&session, &remote).await {
        Ok(entry) => DownloadPlan::resolve(&session.client, &location, &entry, dest).await,
        Err(e) => Err(e),
    };
    let plan = match plan {
        Ok(plan) => plan,
        Err(e) => return fail(&formatter, &e),
    };

    if plan.object_count() == 0 {
        formatter.warning("Nothing to download");
        return ExitCode::Success;
    }

    let total_bytes = plan.total_bytes();
    let summary = plan_summary(
        "Download",
        plan.object_count(),
        total_bytes,
        &plan.dest_root.display().to_string(),
    );
    let prompter = Prompter::new(formatter.is_json());
    if !args.yes && prompter.is_interactive() {
        match prompter.confirm(&summary) {
            Ok(true) => {}
            Ok(false) => {
                formatter.warning("Download aborted");
                return ExitCode::Success;
            }
            Err(e) => return fail(&formatter, &Error::Io(e)),
        }
    }

    tracing::info!(source = %remote, dest = %plan.dest_root.display(), "starting download");
    let options = JobOptions::default()
        .conflict_mode(args.conflict_mode())
        .progress_interval(session.defaults.progress_interval());
    let handle = spawn_download(session.store(), plan, options);

    match drive(handle, total_bytes, &formatter).await {
        Ok(report) => finish(report, "Downloaded", &formatter),
        Err(e) => fail(&formatter, &e),
    }
}

/// Folder listing that holds the entry `remote` names
fn parent_location(remote: &RemotePath) -> Location {
    if remote.is_dir() {
        remote.location().up()
    } else {
        remote.location()
    }
}

/// Look up what `remote` names in its parent folder
///
/// A key ending in `/` is always a folder. Otherwise a file of that name wins
/// over a folder of the same name.
async fn find_entry(session: &Session, remote: &RemotePath) -> Result<Entry> {
    if remote.is_dir() {
        let prefix = folder_prefix(&remote.key);
        return Ok(Entry::folder(remote.name(), prefix));
    }

    let location = parent_location(remote);
    let entries = list(&session.client, &remote.bucket, &location.prefix).await?;
    let name = remote.name();

    entries
        .iter()
        .find(|e| e.is_file() && e.key == name)
        .or_else(|| entries.iter().find(|e| e.is_folder() && e.key == name))
        .cloned()
        .ok_or_else(|| {
            Error::store(
                "get",
                StoreErrorKind::NotFound,
                format!("no file or folder named {remote}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(overwrite: bool, skip_existing: bool) -> GetArgs {
        GetArgs {
            source: "local/bucket/key".to_string(),
            dest: None,
            overwrite,
            skip_existing,
            yes: false,
        }
    }

    #[test]
    fn test_parent_location() {
        let folder = parse_remote("local/bucket/docs/photos/").unwrap();
        assert_eq!(parent_location(&folder).prefix, "docs/");

        let file = parse_remote("local/bucket/docs/a.txt").unwrap();
        assert_eq!(parent_location(&file).prefix, "docs/");

        let top = parse_remote("local/bucket/photos/").unwrap();
        let location = parent_location(&top);
        assert_eq!(location.bucket.as_deref(), Some("bucket"));
        assert_eq!(location.prefix, "");
    }

    #[test]
    fn test_conflict_mode_from_flags() {
        assert_eq!(args(false, false).conflict_mode(), ConflictMode::Ask);
        assert_eq!(args(true, false).conflict_mode(), ConflictMode::OverwriteAll);
        assert_eq!(args(false, true).conflict_mode(), ConflictMode::SkipAll);
    }
}

//! rm command - Remove a file, a folder or an empty bucket
//!
//! Folders are removed with everything under them, in batches of at most
//! 1000 keys.

use clap::Args;
use nav_core::namespace::folder_prefix;
use nav_core::{Entry, Error, Location, ObjectRecord, RemotePath, delete_entry, parse_remote};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Prompter};

use super::{Session, fail};

/// Remove a file, folder or bucket
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Path to remove (profile/bucket, profile/bucket/key or profile/bucket/prefix/)
    pub path: String,

    /// Remove a folder and everything under it
    #[arg(short, long)]
    pub recursive: bool,

    /// Force removal without confirmation
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    target: String,
    deleted: usize,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let remote = match parse_remote(&args.path) {
        Ok(remote) => remote,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    let (location, entry) = match target_entry(&remote, args.recursive) {
        Ok(target) => target,
        Err(e) => return fail(&formatter, &e),
    };

    let prompter = Prompter::new(formatter.is_json());
    if !args.force && prompter.is_interactive() {
        match prompter.confirm(&format!("Remove {remote}?")) {
            Ok(true) => {}
            Ok(false) => {
                formatter.warning("Nothing removed");
                return ExitCode::Success;
            }
            Err(e) => return fail(&formatter, &Error::Io(e)),
        }
    }

    let session = match Session::open(&remote.profile, Some(&remote.bucket)).await {
        Ok(session) => session,
        Err(e) => return fail(&formatter, &e),
    };

    let deleted = match delete_entry(&session.client, &location, &entry).await {
        Ok(deleted) => deleted,
        Err(e) => return fail(&formatter, &e),
    };

    if formatter.is_json() {
        formatter.json(&RmOutput {
            status: "success",
            target: remote.to_string(),
            deleted,
        });
    } else if entry.is_bucket() {
        formatter.success(&format!("Removed bucket {}", remote.bucket));
    } else {
        formatter.success(&format!("Removed {deleted} object(s) from {remote}"));
    }
    ExitCode::Success
}

/// Entry and listing location that `remote` refers to
fn target_entry(remote: &RemotePath, recursive: bool) -> nav_core::Result<(Location, Entry)> {
    if remote.bucket.is_empty() {
        return Err(Error::InvalidPath(
            "Choose what to remove: profile/bucket[/key]".into(),
        ));
    }
    if remote.key.is_empty() {
        return Ok((Location::root(), Entry::bucket(&remote.bucket, None)));
    }

    let location = Location::in_bucket(&remote.bucket);
    if recursive {
        let prefix = folder_prefix(&remote.key);
        return Ok((location, Entry::folder(remote.name(), prefix)));
    }
    if remote.is_dir() {
        return Err(Error::InvalidPath(format!(
            "{remote} is a folder; pass -r to remove it with its contents"
        )));
    }

    let record = ObjectRecord::new(&remote.key, 0);
    Ok((location, Entry::file(remote.name(), &record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_core::EntryKind;

    fn target(path: &str, recursive: bool) -> nav_core::Result<(Location, Entry)> {
        target_entry(&parse_remote(path).unwrap(), recursive)
    }

    #[test]
    fn test_target_bucket() {
        let (location, entry) = target("local/archive", false).unwrap();
        assert!(location.is_root());
        assert_eq!(entry.kind, EntryKind::Bucket);
        assert_eq!(entry.key, "archive");
    }

    #[test]
    fn test_target_file() {
        let (location, entry) = target("local/archive/docs/a.txt", false).unwrap();
        assert_eq!(location.bucket.as_deref(), Some("archive"));
        assert!(entry.is_file());
        assert_eq!(entry.full_path.as_deref(), Some("docs/a.txt"));
    }

    #[test]
    fn test_target_folder_needs_recursive() {
        let err = target("local/archive/docs/", false).unwrap_err();
        assert!(err.to_string().contains("pass -r"));

        let (_, entry) = target("local/archive/docs", true).unwrap();
        assert!(entry.is_folder());
        assert_eq!(entry.full_path.as_deref(), Some("docs/"));
    }

    #[test]
    fn test_target_requires_bucket() {
        assert!(target("local", false).is_err());
    }
}

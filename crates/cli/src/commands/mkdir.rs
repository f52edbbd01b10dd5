//! mkdir command - Create a folder
//!
//! Folders are zero-byte marker objects whose key ends in '/'.

use clap::Args;
use nav_core::namespace::folder_prefix;
use nav_core::{ObjectStore as _, parse_remote};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

use super::{Session, fail};

/// Create a folder
#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Folder to create (profile/bucket/path)
    pub target: String,
}

#[derive(Debug, Serialize)]
struct MkdirOutput {
    status: &'static str,
    bucket: String,
    key: String,
}

/// Execute the mkdir command
pub async fn execute(args: MkdirArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let target = match parse_remote(&args.target) {
        Ok(target) if !target.key.trim_matches('/').is_empty() => target,
        Ok(_) => {
            formatter.error("Choose a folder inside a bucket: profile/bucket/path");
            return ExitCode::UsageError;
        }
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    let session = match Session::open(&target.profile, Some(&target.bucket)).await {
        Ok(session) => session,
        Err(e) => return fail(&formatter, &e),
    };

    let key = folder_prefix(&target.key);
    if let Err(e) = session.client.create_folder_marker(&target.bucket, &key).await {
        return fail(&formatter, &e);
    }

    if formatter.is_json() {
        formatter.json(&MkdirOutput {
            status: "success",
            bucket: target.bucket,
            key,
        });
    } else {
        formatter.success(&format!("Folder '{}/{}/{key}' created.", target.profile, target.bucket));
    }
    ExitCode::Success
}

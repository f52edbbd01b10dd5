//! mb command - Make bucket
//!
//! Creates a private bucket, optionally in a given region and with a public
//! read policy.

use clap::Args;
use nav_core::{ObjectStore as _, RemotePath, parse_remote};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

use super::{Session, fail};

/// Create a bucket
#[derive(Args, Debug)]
pub struct MbArgs {
    /// Target path (profile/bucket)
    pub target: String,

    /// Region for the bucket (overrides the profile region)
    #[arg(long)]
    pub region: Option<String>,

    /// Allow anonymous reads of every object in the bucket
    #[arg(long)]
    pub public: bool,
}

#[derive(Debug, Serialize)]
struct MbOutput {
    status: &'static str,
    bucket: String,
    public: bool,
}

/// Execute the mb command
pub async fn execute(args: MbArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let target = match parse_mb_path(&args.target) {
        Ok(target) => target,
        Err(e) => {
            formatter.error(&e);
            return ExitCode::UsageError;
        }
    };

    let session = match Session::open(&target.profile, None).await {
        Ok(session) => session,
        Err(e) => return fail(&formatter, &e),
    };

    if let Err(e) = session
        .client
        .create_bucket(&target.bucket, args.region.as_deref(), args.public)
        .await
    {
        return fail(&formatter, &e);
    }

    if formatter.is_json() {
        formatter.json(&MbOutput {
            status: "success",
            bucket: target.bucket,
            public: args.public,
        });
    } else {
        formatter.success(&format!("Bucket '{target}' created successfully."));
    }
    ExitCode::Success
}

/// Parse and check a `profile/bucket` target
fn parse_mb_path(path: &str) -> Result<RemotePath, String> {
    let target = parse_remote(path.trim_end_matches('/')).map_err(|e| e.to_string())?;

    if target.bucket.is_empty() {
        return Err("Bucket name cannot be empty".to_string());
    }
    if !target.key.is_empty() {
        return Err(format!("Invalid path format: '{path}'. Expected: profile/bucket"));
    }
    if target.bucket.len() < 3 || target.bucket.len() > 63 {
        return Err("Bucket name must be between 3 and 63 characters".to_string());
    }

    Ok(target)
}

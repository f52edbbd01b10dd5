//! ls command - List buckets, folders and files
//!
//! Lists buckets when given a profile only, or one folder level of a bucket
//! otherwise. Folders are listed before files.

use clap::Args;
use nav_core::namespace::{folder_prefix, list_location};
use nav_core::{Entry, EntryKind, Location, parse_remote};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

use super::{Session, fail};

/// List buckets or one folder level
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Remote path (profile/ or profile/bucket[/prefix])
    pub path: String,

    /// Summarize output (show totals)
    #[arg(long)]
    pub summarize: bool,
}

#[derive(Debug, Serialize)]
struct LsOutput {
    location: String,
    items: Vec<Entry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    folders: usize,
    files: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

impl Summary {
    fn of(entries: &[Entry]) -> Self {
        let total_size_bytes = entries.iter().filter_map(|e| e.size).sum();
        Self {
            folders: entries.iter().filter(|e| !e.is_file()).count(),
            files: entries.iter().filter(|e| e.is_file()).count(),
            total_size_bytes,
            total_size_human: humansize::format_size(total_size_bytes, humansize::BINARY),
        }
    }
}

/// Execute the ls command
pub async fn execute(args: LsArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let remote = match parse_remote(&args.path) {
        Ok(remote) => remote,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::UsageError;
        }
    };

    let location = if remote.bucket.is_empty() {
        Location::root()
    } else {
        Location {
            bucket: Some(remote.bucket.clone()),
            prefix: folder_prefix(&remote.key),
        }
    };

    let session = match Session::open(&remote.profile, location.bucket.as_deref()).await {
        Ok(session) => session,
        Err(e) => return fail(&formatter, &e),
    };

    let entries = match list_location(&session.client, &location).await {
        Ok(entries) => entries,
        Err(e) => return fail(&formatter, &e),
    };

    let summary = args.summarize.then(|| Summary::of(&entries));

    if formatter.is_json() {
        formatter.json(&LsOutput {
            location: location.to_string(),
            items: entries,
            summary,
        });
        return ExitCode::Success;
    }

    for entry in &entries {
        formatter.println(&entry_line(entry, &formatter));
    }
    if let Some(summary) = summary {
        formatter.println(&format!(
            "\nTotal: {} folders, {} files, {}",
            summary.folders, summary.files, summary.total_size_human
        ));
    }

    ExitCode::Success
}

fn entry_line(entry: &Entry, formatter: &Formatter) -> String {
    let date = entry
        .last_modified
        .map(|d| d.strftime("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| " ".repeat(19));

    match entry.kind {
        EntryKind::Bucket | EntryKind::Folder => {
            let name = formatter.dir_name(&format!("{}/", entry.key));
            format!("[{date}] {:>10} {name}", "")
        }
        EntryKind::File => {
            let size = entry.size_human().unwrap_or_else(|| "0 B".to_string());
            format!("[{date}] {size:>10} {}", entry.key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_core::ObjectRecord;

    fn plain() -> Formatter {
        Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_entry_line_file() {
        let mut record = ObjectRecord::new("docs/report.pdf", 2048);
        record.last_modified = Some("2024-03-01T10:20:30Z".parse().unwrap());
        let entry = Entry::file("report.pdf", &record);

        insta::assert_snapshot!(
            entry_line(&entry, &plain()),
            @"[2024-03-01 10:20:30]      2 KiB report.pdf"
        );
    }

    #[test]
    fn test_entry_line_folder_without_date() {
        let entry = Entry::folder("photos", "docs/photos/");
        insta::assert_snapshot!(
            entry_line(&entry, &plain()),
            @"[                   ]            photos/"
        );
    }

    #[test]
    fn test_entry_line_bucket() {
        let entry = Entry::bucket("archive", Some("2023-12-24T00:00:00Z".parse().unwrap()));
        insta::assert_snapshot!(
            entry_line(&entry, &plain()),
            @"[2023-12-24 00:00:00]            archive/"
        );
    }

    #[test]
    fn test_summary_counts() {
        let entries = vec![
            Entry::folder("a", "a/"),
            Entry::file("b.txt", &ObjectRecord::new("b.txt", 100)),
            Entry::file("c.txt", &ObjectRecord::new("c.txt", 24)),
        ];
        let summary = Summary::of(&entries);
        assert_eq!(summary.folders, 1);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.total_size_bytes, 124);
        assert_eq!(summary.total_size_human, "124 B");
    }
}

//! Interactive prompts on the controlling terminal

use std::path::{Path, PathBuf};

use console::Term;
use nav_core::ConflictDecision;

/// Asks the user questions on stderr
#[derive(Debug, Clone)]
pub struct Prompter {
    term: Term,
    enabled: bool,
}

impl Prompter {
    /// Prompts are only shown on a terminal and never in JSON mode
    pub fn new(json: bool) -> Self {
        let term = Term::stderr();
        let enabled = !json && term.is_term();
        Self { term, enabled }
    }

    pub fn is_interactive(&self) -> bool {
        self.enabled
    }

    /// Yes/no question; anything but "y" or "yes" is a no
    pub fn confirm(&self, question: &str) -> std::io::Result<bool> {
        self.term.write_str(&format!("{question} [y/N] "))?;
        let answer = self.term.read_line()?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    /// Ask about an existing local file without blocking the runtime
    ///
    /// The terminal is read on a blocking thread; if the returned future is
    /// dropped before an answer arrives, that read is abandoned.
    pub async fn conflict_async(&self, local_path: PathBuf) -> ConflictDecision {
        let prompter = self.clone();
        tokio::task::spawn_blocking(move || prompter.conflict(&local_path))
            .await
            .unwrap_or(ConflictDecision::Cancel)
    }

    /// Ask what to do about an existing local file
    ///
    /// Read errors count as cancel.
    pub fn conflict(&self, local_path: &Path) -> ConflictDecision {
        let _ = self.term.clear_line();
        let question = format!(
            "{} already exists. [o]verwrite, [s]kip, overwrite [a]ll, s[k]ip all, [c]ancel? ",
            local_path.display()
        );
        loop {
            if self.term.write_str(&question).is_err() {
                return ConflictDecision::Cancel;
            }
            match self.term.read_line() {
                Ok(answer) => {
                    if let Some(decision) = parse_conflict_answer(&answer) {
                        return decision;
                    }
                }
                Err(_) => return ConflictDecision::Cancel,
            }
        }
    }
}

/// Map a typed answer to a conflict decision
pub fn parse_conflict_answer(answer: &str) -> Option<ConflictDecision> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "o" | "overwrite" => Some(ConflictDecision::Overwrite),
        "s" | "skip" => Some(ConflictDecision::Skip),
        "a" | "overwrite all" => Some(ConflictDecision::OverwriteAll),
        "k" | "skip all" => Some(ConflictDecision::SkipAll),
        "c" | "cancel" => Some(ConflictDecision::Cancel),
        _ => None,
    }
}

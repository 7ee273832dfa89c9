use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::WeaveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	Warning,
	Error,
}

impl Display for Severity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
		}
	}
}

/// One warning or error recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
	pub severity: Severity,
	/// The document or artifact the entry is about.
	pub file: PathBuf,
	/// 1-indexed line, when the entry points at one.
	pub line: Option<usize>,
	pub message: String,
	/// Stable diagnostic code for errors, e.g. `docweave::unmatched_directive`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
}

impl Display for LogEntry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.line {
			Some(line) => write!(f, "{}:{line}: {}", self.file.display(), self.message),
			None => write!(f, "{}: {}", self.file.display(), self.message),
		}
	}
}

/// A document or derived file whose composed content differs from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutdatedArtifact {
	pub path: PathBuf,
	/// The document that produced this artifact. Equal to `path` for
	/// documents.
	pub document: PathBuf,
	/// Current content on disk, `None` when the file does not exist.
	pub current: Option<String>,
	pub expected: String,
}

impl OutdatedArtifact {
	/// True for derived files, false for documents themselves.
	pub fn is_derived(&self) -> bool {
		self.path != self.document
	}
}

/// Everything a run found, created fresh per run and returned to the caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunLog {
	pub entries: Vec<LogEntry>,
	pub warning_count: usize,
	pub error_count: usize,
	/// Artifacts found out of date. In write mode these were written.
	pub outdated: Vec<OutdatedArtifact>,
	/// Paths written by this run.
	pub written: Vec<PathBuf>,
	/// Number of documents processed.
	pub document_count: usize,
}

impl RunLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn warn(&mut self, file: &Path, line: Option<usize>, message: impl Into<String>) {
		let message = message.into();
		match line {
			Some(line) => tracing::warn!(file = %file.display(), line, "{message}"),
			None => tracing::warn!(file = %file.display(), "{message}"),
		}

		self.warning_count += 1;
		self.entries.push(LogEntry {
			severity: Severity::Warning,
			file: file.to_path_buf(),
			line,
			message,
			code: None,
		});
	}

	pub fn error(&mut self, file: &Path, error: &WeaveError) {
		tracing::error!(file = %file.display(), "{error}");

		self.error_count += 1;
		self.entries.push(LogEntry {
			severity: Severity::Error,
			file: file.to_path_buf(),
			line: error.line(),
			message: error.to_string(),
			code: miette::Diagnostic::code(error).map(|code| code.to_string()),
		});
	}

	/// Record an out-of-date artifact together with its staleness warning.
	pub fn outdated(&mut self, artifact: OutdatedArtifact) {
		let message = if artifact.current.is_none() {
			"generated file is missing".to_string()
		} else if artifact.is_derived() {
			format!("generated file is out of date (from {})", artifact.document.display())
		} else {
			"document is out of date".to_string()
		};
		self.warn(&artifact.path, None, message);
		self.outdated.push(artifact);
	}

	/// Record an artifact that was out of date and has been written.
	pub fn updated(&mut self, artifact: OutdatedArtifact) {
		tracing::info!(path = %artifact.path.display(), "updated");
		self.written.push(artifact.path.clone());
		self.outdated.push(artifact);
	}

	pub fn has_warning_or_error(&self) -> bool {
		self.warning_count > 0 || self.error_count > 0
	}

	pub fn has_errors(&self) -> bool {
		self.error_count > 0
	}

	pub fn outdated_count(&self) -> usize {
		self.outdated.len()
	}

	pub fn errors(&self) -> impl Iterator<Item = &LogEntry> {
		self.entries
			.iter()
			.filter(|entry| entry.severity == Severity::Error)
	}

	pub fn warnings(&self) -> impl Iterator<Item = &LogEntry> {
		self.entries
			.iter()
			.filter(|entry| entry.severity == Severity::Warning)
	}
}

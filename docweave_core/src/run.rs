use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::ComposedDocument;
use crate::Document;
use crate::EngineConfig;
use crate::FileSystem;
use crate::HeaderIndex;
use crate::OutdatedArtifact;
use crate::RunLog;
use crate::WeaveError;
use crate::WeaveResult;
use crate::document::join_lines;
use crate::draft;
use crate::finish;
use crate::normalize_path;

/// Whether a run only reports divergence or also repairs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
	/// Read-only: never writes, reports outdated artifacts.
	Check,
	/// Writes every outdated document and derived file.
	Write,
}

/// The aggregated result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
	pub mode: RunMode,
	pub log: RunLog,
}

impl RunOutcome {
	/// A run fails when any error was recorded, or when a check run found
	/// outdated artifacts.
	pub fn is_success(&self) -> bool {
		!self.log.has_errors() && !(self.mode == RunMode::Check && self.log.outdated_count() > 0)
	}

	/// A one-line, actionable description of the verdict.
	pub fn summary(&self) -> String {
		let log = &self.log;

		if log.has_errors() {
			let errors = format!(
				"{} error(s) and {} warning(s) in {} document(s)",
				log.error_count, log.warning_count, log.document_count
			);
			return match self.mode {
				RunMode::Check if log.outdated_count() > 0 => {
					format!("{errors}; {}", outdated_hint(log.outdated_count()))
				}
				_ => errors,
			};
		}

		match self.mode {
			RunMode::Check if log.outdated_count() > 0 => outdated_hint(log.outdated_count()),
			RunMode::Check => format!("{} document(s) are up to date", log.document_count),
			RunMode::Write if log.written.is_empty() => {
				format!("{} document(s) were already up to date", log.document_count)
			}
			RunMode::Write => format!("updated {} artifact(s)", log.written.len()),
		}
	}
}

fn outdated_hint(count: usize) -> String {
	format!("{count} artifact(s) are out of date. Run `docweave update` to regenerate them.")
}

/// Run the engine over `documents`.
///
/// Documents are loaded and composed in parallel. Results are merged into
/// the log, compared against disk and, in write mode, written back
/// sequentially in path order. A document with a structural error is
/// reported and left untouched while the others continue.
pub fn run(config: &EngineConfig, documents: &[PathBuf], fs: &dyn FileSystem, mode: RunMode) -> RunOutcome {
	let mut paths: Vec<PathBuf> = documents
		.iter()
		.map(|path| normalize_path(&config.resolve(path)))
		.collect();
	paths.sort();
	paths.dedup();

	let drafts: Vec<(PathBuf, WeaveResult<_>)> = paths
		.par_iter()
		.map(|path| {
			let result = Document::load(fs, path).and_then(|document| draft(document, config, fs));
			(path.clone(), result)
		})
		.collect();

	let mut index = HeaderIndex::default();
	for (_, result) in &drafts {
		if let Ok(draft) = result {
			index.insert(draft);
		}
	}

	let composed: Vec<(PathBuf, WeaveResult<ComposedDocument>)> = drafts
		.into_par_iter()
		.map(|(path, result)| (path, result.map(|draft| finish(draft, &index, config))))
		.collect();

	let mut log = RunLog::new();
	log.document_count = paths.len();

	let conflicts = find_artifact_conflicts(&paths, &composed);

	for (path, result) in composed {
		let composed = match result {
			Ok(composed) => composed,
			Err(error) => {
				log.error(&path, &error);
				continue;
			}
		};

		for warning in &composed.warnings {
			log.warn(&path, warning.line, warning.message.clone());
		}

		if let Some(error) = conflicts.get(&path) {
			log.error(&path, error);
			continue;
		}

		let expected = composed.content(config.line_separator);
		reconcile(fs, mode, &mut log, path.clone(), path.clone(), expected);

		for artifact in composed.artifacts {
			let expected = join_lines(&artifact.lines, config.line_separator, true);
			reconcile(fs, mode, &mut log, artifact.path, artifact.document, expected);
		}
	}

	debug!(
		documents = log.document_count,
		outdated = log.outdated_count(),
		errors = log.error_count,
		warnings = log.warning_count,
		"run finished"
	);

	RunOutcome { mode, log }
}

/// Compare one artifact against disk and record or write the difference.
fn reconcile(
	fs: &dyn FileSystem,
	mode: RunMode,
	log: &mut RunLog,
	path: PathBuf,
	document: PathBuf,
	expected: String,
) {
	let current = match fs.read_optional(&path) {
		Ok(current) => current,
		Err(e) => {
			let error = WeaveError::Read {
				path: path.display().to_string(),
				reason: e.to_string(),
			};
			log.error(&document, &error);
			return;
		}
	};

	if current.as_deref() == Some(expected.as_str()) {
		return;
	}

	let artifact = OutdatedArtifact {
		path,
		document,
		current,
		expected,
	};

	match mode {
		RunMode::Check => log.outdated(artifact),
		RunMode::Write => {
			if let Err(e) = fs.write(&artifact.path, &artifact.expected) {
				let error = WeaveError::Write {
					path: artifact.path.display().to_string(),
					reason: e.to_string(),
				};
				log.error(&artifact.document, &error);
				return;
			}
			log.updated(artifact);
		}
	}
}

/// Documents whose derived files collide with a document or with another
/// derived file. Such documents are not written at all.
fn find_artifact_conflicts(
	paths: &[PathBuf],
	composed: &[(PathBuf, WeaveResult<ComposedDocument>)],
) -> BTreeMap<PathBuf, WeaveError> {
	let documents: BTreeSet<&PathBuf> = paths.iter().collect();
	let mut owners: BTreeMap<&PathBuf, &PathBuf> = BTreeMap::new();
	let mut conflicts = BTreeMap::new();

	for (path, result) in composed {
		let Ok(composed) = result else {
			continue;
		};

		for artifact in &composed.artifacts {
			let first = if documents.contains(&artifact.path) {
				Some(&artifact.path)
			} else {
				owners.get(&artifact.path).copied()
			};

			if let Some(first) = first {
				conflicts.entry(path.clone()).or_insert_with(|| {
					WeaveError::ArtifactConflict {
						path: artifact.path.display().to_string(),
						first: first.display().to_string(),
						second: path.display().to_string(),
					}
				});
				continue;
			}

			owners.insert(&artifact.path, path);
		}
	}

	conflicts
}

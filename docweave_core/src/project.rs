use std::path::Path;
use std::path::PathBuf;

use crate::DiscoveryOptions;
use crate::DiskFileSystem;
use crate::DocweaveConfig;
use crate::EngineConfig;
use crate::FileSystem;
use crate::RunMode;
use crate::RunOutcome;
use crate::WeaveResult;
use crate::discover_documents;
use crate::normalize_path;
use crate::run;

/// A project ready to run: its validated configuration and discovered
/// documents.
#[derive(Debug, Clone)]
pub struct ProjectContext {
	/// Normalized project root, the prefix of every reported path.
	pub root: PathBuf,
	/// Config file that was loaded, if any.
	pub config_path: Option<PathBuf>,
	pub config: EngineConfig,
	/// Normalized document paths in path order.
	pub documents: Vec<PathBuf>,
}

impl ProjectContext {
	/// Load the config discovered at `root`, validate it, and discover the
	/// project's documents. Configuration errors are returned before any
	/// document is read.
	pub fn load(root: &Path) -> WeaveResult<Self> {
		let config_path = DocweaveConfig::resolve_path(root);
		let raw = DocweaveConfig::load(root)?;
		let config = match &raw {
			Some(raw) => EngineConfig::from_config(root, raw)?,
			None => EngineConfig::new(root),
		};
		let options = DiscoveryOptions::from_config(raw.as_ref())?;
		let documents = discover_documents(root, &options)?
			.iter()
			.map(|path| normalize_path(path))
			.collect();

		Ok(Self {
			root: config.root.clone(),
			config_path,
			config,
			documents,
		})
	}

	pub fn run(&self, fs: &dyn FileSystem, mode: RunMode) -> RunOutcome {
		run(&self.config, &self.documents, fs, mode)
	}

	/// `path` relative to the project root, for display.
	pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
		path.strip_prefix(&self.root).unwrap_or(path)
	}
}

/// Check every document of the project at `root` without writing anything.
pub fn check_project(root: &Path) -> WeaveResult<RunOutcome> {
	let context = ProjectContext::load(root)?;
	Ok(context.run(&DiskFileSystem, RunMode::Check))
}

/// Regenerate every outdated document and derived file of the project at
/// `root`.
pub fn update_project(root: &Path) -> WeaveResult<RunOutcome> {
	let context = ProjectContext::load(root)?;
	Ok(context.run(&DiskFileSystem, RunMode::Write))
}

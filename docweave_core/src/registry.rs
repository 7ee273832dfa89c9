use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;

use crate::WeaveError;
use crate::WeaveResult;
use crate::config::ModuleConfig;
use crate::normalize_path;

/// A named group of files sharing a documentation root.
#[derive(Debug, Clone)]
pub struct Module {
	/// Name used by qualified link identifiers, e.g. `core` in `core/Widget`.
	pub name: String,
	/// Absolute (or root-joined) module directory.
	pub root: PathBuf,
	/// Base URL of the module's API documentation.
	pub docs_url: Option<String>,
	patterns: GlobSet,
	match_all: bool,
}

impl Module {
	/// Build a module matching every file under `root`.
	pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
		Self {
			name: name.into(),
			root: root.into(),
			docs_url: None,
			patterns: GlobSet::empty(),
			match_all: true,
		}
	}

	#[must_use]
	pub fn with_docs_url(mut self, url: impl Into<String>) -> Self {
		self.docs_url = Some(url.into());
		self
	}

	/// Restrict the module to files whose root-relative path matches one of
	/// `patterns`.
	pub fn with_patterns(mut self, patterns: &[String]) -> WeaveResult<Self> {
		if patterns.is_empty() {
			return Ok(self);
		}

		let mut builder = GlobSetBuilder::new();
		for pattern in patterns {
			let glob = Glob::new(pattern).map_err(|e| {
				WeaveError::InvalidModulePattern {
					module: self.name.clone(),
					pattern: pattern.clone(),
					reason: e.to_string(),
				}
			})?;
			builder.add(glob);
		}

		self.patterns = builder.build().map_err(|e| {
			WeaveError::InvalidModulePattern {
				module: self.name.clone(),
				pattern: patterns.join(", "),
				reason: e.to_string(),
			}
		})?;
		self.match_all = false;

		Ok(self)
	}

	/// Whether this module claims `path`.
	pub fn contains(&self, path: &Path) -> bool {
		let Ok(relative) = path.strip_prefix(&self.root) else {
			return false;
		};

		self.match_all || self.patterns.is_match(relative)
	}

	/// The documentation URL for a path inside this module, e.g. `Widget`
	/// becomes `<docs_url>/Widget`.
	pub fn url_for(&self, item: &str) -> Option<String> {
		let base = self.docs_url.as_deref()?;
		Some(format!(
			"{}/{}",
			base.trim_end_matches('/'),
			item.trim_start_matches('/')
		))
	}
}

/// Modules in attribution order. Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
	modules: Vec<Module>,
}

impl ModuleRegistry {
	pub fn new(modules: Vec<Module>) -> WeaveResult<Self> {
		let mut seen = HashSet::new();
		for module in &modules {
			if !seen.insert(module.name.as_str()) {
				return Err(WeaveError::DuplicateModule(module.name.clone()));
			}
		}

		Ok(Self { modules })
	}

	/// Build the registry from `[[modules]]` entries, resolving roots against
	/// the project root.
	pub fn from_config(root: &Path, configs: &[ModuleConfig]) -> WeaveResult<Self> {
		let mut modules = Vec::with_capacity(configs.len());

		for config in configs {
			let module_root = normalize_path(&root.join(&config.root));
			let name = config.name.clone().unwrap_or_else(|| {
				config
					.root
					.file_name()
					.map(|name| name.to_string_lossy().to_string())
					.unwrap_or_default()
			});

			let mut module = Module::new(name, module_root).with_patterns(&config.patterns)?;
			module.docs_url.clone_from(&config.docs_url);
			modules.push(module);
		}

		Self::new(modules)
	}

	/// The first module, in configured order, claiming `path`.
	pub fn module_for_path(&self, path: &Path) -> Option<&Module> {
		self.modules.iter().find(|module| module.contains(path))
	}

	pub fn get(&self, name: &str) -> Option<&Module> {
		self.modules.iter().find(|module| module.name == name)
	}

	pub fn modules(&self) -> &[Module] {
		&self.modules
	}
}

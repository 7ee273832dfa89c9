use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::DocweaveConfig;
use crate::WeaveError;
use crate::WeaveResult;
use crate::config::CONFIG_FILE_CANDIDATES;

/// Options controlling which files are treated as documents.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
	/// Gitignore-style patterns to skip.
	pub exclude_patterns: Vec<String>,
	/// Extra files to process, relative to the root.
	pub include_set: GlobSet,
	pub disable_gitignore: bool,
}

impl Default for DiscoveryOptions {
	fn default() -> Self {
		Self {
			exclude_patterns: Vec::new(),
			include_set: GlobSet::empty(),
			disable_gitignore: false,
		}
	}
}

impl DiscoveryOptions {
	pub fn from_config(config: Option<&DocweaveConfig>) -> WeaveResult<Self> {
		let Some(config) = config else {
			return Ok(Self::default());
		};

		Ok(Self {
			exclude_patterns: config.exclude.patterns.clone(),
			include_set: build_glob_set(&config.include.patterns)?,
			disable_gitignore: config.disable_gitignore,
		})
	}
}

fn build_glob_set(patterns: &[String]) -> WeaveResult<GlobSet> {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		let glob = Glob::new(pattern).map_err(|e| {
			WeaveError::ConfigParse(format!("invalid include pattern `{pattern}`: {e}"))
		})?;
		builder.add(glob);
	}
	builder
		.build()
		.map_err(|e| WeaveError::ConfigParse(format!("failed to build include patterns: {e}")))
}

/// Collect every document below `root` in sorted order: markdown files plus
/// files matching the include patterns, minus gitignored and excluded paths.
pub fn discover_documents(root: &Path, options: &DiscoveryOptions) -> WeaveResult<Vec<PathBuf>> {
	let gitignore = if options.disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(root)
	};
	let exclude = build_exclude_matcher(root, &options.exclude_patterns)?;

	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();
	let walker = Walker {
		root,
		gitignore: &gitignore,
		exclude: &exclude,
		include_set: &options.include_set,
	};
	walker.walk(root, &mut files, &mut visited_dirs)?;

	files.sort();
	files.dedup();
	Ok(files)
}

struct Walker<'a> {
	root: &'a Path,
	gitignore: &'a Gitignore,
	exclude: &'a Gitignore,
	include_set: &'a GlobSet,
}

impl Walker<'_> {
	fn walk(
		&self,
		dir: &Path,
		files: &mut Vec<PathBuf>,
		visited_dirs: &mut HashSet<PathBuf>,
	) -> WeaveResult<()> {
		if !dir.is_dir() {
			return Ok(());
		}

		let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
		if !visited_dirs.insert(canonical) {
			return Err(WeaveError::SymlinkCycle {
				path: dir.display().to_string(),
			});
		}

		for entry in std::fs::read_dir(dir)? {
			let path = entry?.path();

			if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
				if is_ignored_directory_name(name) {
					continue;
				}
			}

			let is_dir = path.is_dir();
			if self.gitignore.matched(&path, is_dir).is_ignore()
				|| self.exclude.matched(&path, is_dir).is_ignore()
			{
				continue;
			}

			if is_dir {
				// Nested projects own their documents.
				if has_project_config(&path) {
					continue;
				}
				self.walk(&path, files, visited_dirs)?;
			} else if is_markdown_file(&path) || self.is_included(&path) {
				files.push(path);
			}
		}

		Ok(())
	}

	fn is_included(&self, path: &Path) -> bool {
		path.strip_prefix(self.root)
			.is_ok_and(|relative| self.include_set.is_match(relative))
	}
}

/// `[exclude]` patterns follow `.gitignore` syntax relative to the root.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> WeaveResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			WeaveError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| WeaveError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

fn has_project_config(dir: &Path) -> bool {
	CONFIG_FILE_CANDIDATES
		.iter()
		.any(|candidate| dir.join(candidate).is_file())
}

fn is_markdown_file(path: &Path) -> bool {
	let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
		return false;
	};

	matches!(ext, "md" | "mdx" | "markdown")
}

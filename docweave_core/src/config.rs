use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::WeaveError;
use crate::WeaveResult;
use crate::normalize_path;
use crate::registry::ModuleRegistry;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"docweave.toml",
	".docweave.toml",
	".config/docweave.toml",
];

/// The line separator used when composing documents and derived files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSeparator {
	/// `\n`
	#[default]
	Unix,
	/// `\r\n`
	Windows,
}

impl LineSeparator {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Unix => "\n",
			Self::Windows => "\r\n",
		}
	}

	/// Parse a configured separator. Accepts the names `unix`/`lf` and
	/// `windows`/`crlf` as well as the literal separators.
	pub fn parse(value: &str) -> WeaveResult<Self> {
		match value {
			"unix" | "lf" | "\n" | "\\n" => Ok(Self::Unix),
			"windows" | "crlf" | "\r\n" | "\\r\\n" => Ok(Self::Windows),
			other => Err(WeaveError::InvalidLineSeparator(other.escape_debug().to_string())),
		}
	}

	/// Detect the separator of existing content from its first line break.
	/// Content without any line break is treated as unix.
	pub fn detect(content: &str) -> Self {
		match content.find('\n') {
			Some(index) if index > 0 && content.as_bytes()[index - 1] == b'\r' => Self::Windows,
			_ => Self::Unix,
		}
	}
}

impl Display for LineSeparator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Unix => write!(f, "unix"),
			Self::Windows => write!(f, "windows"),
		}
	}
}

/// Configuration loaded from a `docweave.toml` file.
///
/// ```toml
/// line_separator = "unix"
///
/// [[modules]]
/// name = "core"
/// root = "crates/core"
/// patterns = ["**/*.md", "src/**/*.rs"]
/// docs_url = "https://docs.rs/core/latest/core"
///
/// [toc]
/// min_depth = 2
/// max_depth = 4
/// scope = "document"
///
/// [samples.wrappers.rust]
/// header = "// Generated from {{ source }}. Do not edit."
/// prefix = "fn main() {"
/// suffix = "}"
/// indent = "    "
/// unless_contains = "fn main"
///
/// [include]
/// patterns = ["guide/**/*.txt"]
///
/// [exclude]
/// patterns = ["vendor/"]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct DocweaveConfig {
	/// `unix` or `windows`. Defaults to `unix`.
	#[serde(default)]
	pub line_separator: Option<String>,
	/// Modules in attribution order: a file belongs to the first module that
	/// claims it.
	#[serde(default)]
	pub modules: Vec<ModuleConfig>,
	#[serde(default)]
	pub toc: TocConfig,
	#[serde(default)]
	pub samples: SamplesConfig,
	/// Additional glob patterns for documents to process.
	#[serde(default)]
	pub include: IncludeConfig,
	/// Gitignore-style patterns to skip during discovery.
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// When true, `.gitignore` files are not used for filtering.
	#[serde(default)]
	pub disable_gitignore: bool,
}

/// A `[[modules]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
	/// Defaults to the last component of `root`.
	#[serde(default)]
	pub name: Option<String>,
	/// Module root, relative to the project root.
	pub root: PathBuf,
	/// Globs relative to `root` that attribute files to this module. Empty
	/// means every file below `root`.
	#[serde(default)]
	pub patterns: Vec<String>,
	/// Base URL of the module's published API documentation.
	#[serde(default)]
	pub docs_url: Option<String>,
}

/// Which documents a table of contents lists headers from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TocScope {
	/// Headers of the document holding the `TOC` anchor.
	#[default]
	Document,
	/// Headers of every document attributed to the same module.
	Module,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TocConfig {
	#[serde(default = "default_min_depth")]
	pub min_depth: u8,
	#[serde(default = "default_max_depth")]
	pub max_depth: u8,
	#[serde(default)]
	pub scope: TocScope,
}

impl Default for TocConfig {
	fn default() -> Self {
		Self {
			min_depth: default_min_depth(),
			max_depth: default_max_depth(),
			scope: TocScope::default(),
		}
	}
}

fn default_min_depth() -> u8 {
	2
}

fn default_max_depth() -> u8 {
	6
}

#[derive(Debug, Default, Deserialize)]
pub struct SamplesConfig {
	/// Wrappers keyed by language tag. These replace the built-in wrapper of
	/// the same language.
	#[serde(default)]
	pub wrappers: BTreeMap<String, SampleWrapper>,
}

/// Declarations placed around a sample body when it is materialized as a
/// standalone file. `header`, `prefix` and `suffix` are minijinja templates
/// with the variables `source`, `name` and `lang`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SampleWrapper {
	#[serde(default)]
	pub header: Option<String>,
	#[serde(default)]
	pub prefix: Option<String>,
	#[serde(default)]
	pub suffix: Option<String>,
	/// Indentation applied to each non-empty body line when wrapped.
	#[serde(default)]
	pub indent: String,
	/// Skip the prefix and suffix when the body already contains this text.
	#[serde(default)]
	pub unless_contains: Option<String>,
}

impl SampleWrapper {
	/// The wrapper used for `rust` samples unless configured otherwise.
	pub fn rust() -> Self {
		Self {
			header: Some(
				"// This file was automatically generated from {{ source }}. Do not edit.".into(),
			),
			prefix: Some("fn main() {".into()),
			suffix: Some("}".into()),
			indent: "    ".into(),
			unless_contains: Some("fn main".into()),
		}
	}
}

/// Configuration for including additional files in discovery.
#[derive(Debug, Default, Deserialize)]
pub struct IncludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// Configuration for excluding files and directories from discovery.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	/// Gitignore-style patterns relative to the project root, e.g. `"build/"`.
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl DocweaveConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> WeaveResult<Option<DocweaveConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		Self::from_toml(&content).map(Some)
	}

	pub fn from_toml(content: &str) -> WeaveResult<DocweaveConfig> {
		toml::from_str(content).map_err(|e| WeaveError::ConfigParse(e.to_string()))
	}
}

/// Table of contents settings after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocOptions {
	pub min_depth: u8,
	pub max_depth: u8,
	pub scope: TocScope,
}

impl Default for TocOptions {
	fn default() -> Self {
		Self {
			min_depth: default_min_depth(),
			max_depth: default_max_depth(),
			scope: TocScope::Document,
		}
	}
}

/// The validated, immutable configuration of one run. Every configuration
/// error is raised while building this value, before any document is touched.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Project root. Relative document and module paths resolve against it.
	pub root: PathBuf,
	pub line_separator: LineSeparator,
	pub registry: ModuleRegistry,
	pub toc: TocOptions,
	pub wrappers: BTreeMap<String, SampleWrapper>,
}

impl EngineConfig {
	/// A configuration with defaults and no modules. `root` is normalized
	/// the same way document paths are.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		let mut wrappers = BTreeMap::new();
		wrappers.insert("rust".to_string(), SampleWrapper::rust());

		Self {
			root: normalize_path(&root.into()),
			line_separator: LineSeparator::default(),
			registry: ModuleRegistry::default(),
			toc: TocOptions::default(),
			wrappers,
		}
	}

	/// Validate a loaded config file.
	pub fn from_config(root: &Path, config: &DocweaveConfig) -> WeaveResult<Self> {
		let mut engine = Self::new(root);

		if let Some(separator) = &config.line_separator {
			engine.line_separator = LineSeparator::parse(separator)?;
		}

		let TocConfig {
			min_depth,
			max_depth,
			scope,
		} = config.toc;
		if !(1..=6).contains(&min_depth) || !(1..=6).contains(&max_depth) || min_depth > max_depth
		{
			return Err(WeaveError::InvalidTocDepth {
				min: min_depth,
				max: max_depth,
			});
		}
		engine.toc = TocOptions {
			min_depth,
			max_depth,
			scope,
		};

		engine.registry = ModuleRegistry::from_config(root, &config.modules)?;

		for (lang, wrapper) in &config.samples.wrappers {
			engine.wrappers.insert(lang.clone(), wrapper.clone());
		}

		Ok(engine)
	}

	#[must_use]
	pub fn with_line_separator(mut self, separator: LineSeparator) -> Self {
		self.line_separator = separator;
		self
	}

	#[must_use]
	pub fn with_registry(mut self, registry: ModuleRegistry) -> Self {
		self.registry = registry;
		self
	}

	#[must_use]
	pub fn with_toc(mut self, toc: TocOptions) -> Self {
		self.toc = toc;
		self
	}

	/// Resolve a path against the project root.
	pub fn resolve(&self, path: &Path) -> PathBuf {
		if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.root.join(path)
		}
	}
}

use std::path::Path;
use std::path::PathBuf;

use minijinja::Environment;
use minijinja::UndefinedBehavior;
use minijinja::context;

use crate::Document;
use crate::EngineConfig;
use crate::FileSystem;
use crate::Region;
use crate::RegionKind;
use crate::SampleReference;
use crate::SampleSource;
use crate::SampleWrapper;
use crate::WeaveError;
use crate::WeaveResult;
use crate::document::split_lines;
use crate::normalize_path;
use crate::parser::fence_start;

/// A standalone file composed from a `SAMPLE` region with `emit=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedArtifact {
	/// Where the file lives, resolved against the document's directory.
	pub path: PathBuf,
	/// The document whose region produced this file.
	pub document: PathBuf,
	/// Content lines, joined with the run's separator plus a final one.
	pub lines: Vec<String>,
}

/// The canonical body of an `INCLUDE` or `SAMPLE` region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WovenRegion {
	/// Lines placed between the opening and closing directive.
	pub body: Vec<String>,
	pub artifact: Option<DerivedArtifact>,
}

/// Composes the replacement text of sample regions.
pub struct Weaver<'a> {
	fs: &'a dyn FileSystem,
	config: &'a EngineConfig,
}

impl<'a> Weaver<'a> {
	pub fn new(fs: &'a dyn FileSystem, config: &'a EngineConfig) -> Self {
		Self { fs, config }
	}

	/// Compose the canonical body of `region`. Regions that are not
	/// `INCLUDE` or `SAMPLE` keep their current body.
	pub fn weave(&self, document: &Document, region: &Region) -> WeaveResult<WovenRegion> {
		match &region.kind {
			RegionKind::Include(reference) => self.weave_include(document, region, reference),
			RegionKind::SampleTest(reference) => self.weave_sample(document, region, reference),
			_ => {
				Ok(WovenRegion {
					body: document.lines[region.body()].to_vec(),
					artifact: None,
				})
			}
		}
	}

	fn weave_include(
		&self,
		document: &Document,
		region: &Region,
		reference: &SampleReference,
	) -> WeaveResult<WovenRegion> {
		let extracted = self.read_reference(document, region, reference)?;
		let visible = hide_lines(&extracted, &reference.options.hide);

		let body = match &reference.options.lang {
			Some(lang) => fence(Some(lang), &visible),
			None => visible,
		};

		Ok(WovenRegion {
			body,
			artifact: None,
		})
	}

	fn weave_sample(
		&self,
		document: &Document,
		region: &Region,
		reference: &SampleReference,
	) -> WeaveResult<WovenRegion> {
		let (body, code, lang) = match &reference.source {
			SampleSource::External { path, .. } => {
				let extracted = self.read_reference(document, region, reference)?;
				let lang = reference
					.options
					.lang
					.clone()
					.or_else(|| language_for_path(path).map(String::from));
				let visible = hide_lines(&extracted, &reference.options.hide);
				(fence(lang.as_deref(), &visible), extracted, lang)
			}
			SampleSource::Inline => {
				let (block, lang) = inline_block(document, region)?;
				let lang = reference.options.lang.clone().or(lang);
				let code = block[1..block.len() - 1].to_vec();
				(block, code, lang)
			}
		};

		let artifact = match &reference.options.emit {
			Some(emit) => Some(self.compose_artifact(document, emit, &code, lang.as_deref())?),
			None => None,
		};

		Ok(WovenRegion { body, artifact })
	}

	/// Read the `START-<NAME>`/`END-<NAME>` range an external reference points
	/// at, dedented when requested.
	fn read_reference(
		&self,
		document: &Document,
		region: &Region,
		reference: &SampleReference,
	) -> WeaveResult<Vec<String>> {
		let SampleSource::External { path, range } = &reference.source else {
			return Ok(Vec::new());
		};

		let source_path = normalize_path(&document.directory().join(path));
		let content = self.fs.read_to_string(&source_path).map_err(|e| {
			WeaveError::MissingSourceFile {
				file: document.display_path(),
				line: region.opening_line(),
				source_file: source_path.display().to_string(),
				reason: e.to_string(),
			}
		})?;

		let lines = extract_range(&content, range, &source_path.display().to_string())?;

		Ok(if reference.options.dedent {
			dedent(&lines)
		} else {
			lines
		})
	}

	fn compose_artifact(
		&self,
		document: &Document,
		emit: &Path,
		code: &[String],
		lang: Option<&str>,
	) -> WeaveResult<DerivedArtifact> {
		let path = normalize_path(&document.directory().join(emit));
		let wrapper = lang.and_then(|lang| self.config.wrappers.get(lang));

		let lines = match wrapper {
			Some(wrapper) => {
				let source = relative_source(&document.path, &path);
				let name = path
					.file_stem()
					.map(|stem| stem.to_string_lossy().to_string())
					.unwrap_or_default();
				wrap_sample(wrapper, code, &source, &name, lang.unwrap_or_default())?
			}
			None => code.to_vec(),
		};

		Ok(DerivedArtifact {
			path,
			document: document.path.clone(),
			lines,
		})
	}
}

/// Extract the lines strictly between the `START-<name>` and `END-<name>`
/// marker lines of `content`. Markers must appear exactly once each.
pub fn extract_range(content: &str, name: &str, file: &str) -> WeaveResult<Vec<String>> {
	let (lines, _) = split_lines(content);
	let start_marker = format!("START-{name}");
	let end_marker = format!("END-{name}");

	let start = find_marker(&lines, &start_marker, file)?;
	let end = find_marker(&lines, &end_marker, file)?;

	if end <= start {
		return Err(WeaveError::InvertedRange {
			file: file.to_string(),
			name: name.to_string(),
		});
	}

	Ok(lines[start + 1..end].to_vec())
}

fn find_marker(lines: &[String], marker: &str, file: &str) -> WeaveResult<usize> {
	let mut found: Option<usize> = None;

	for (index, line) in lines.iter().enumerate() {
		if !contains_marker(line, marker) {
			continue;
		}
		if let Some(first) = found {
			return Err(WeaveError::DuplicateRangeMarker {
				file: file.to_string(),
				marker: marker.to_string(),
				first_line: first + 1,
				second_line: index + 1,
			});
		}
		found = Some(index);
	}

	found.ok_or_else(|| {
		WeaveError::MissingRangeMarker {
			file: file.to_string(),
			marker: marker.to_string(),
		}
	})
}

/// Whole-word match, so `START-A` does not match `START-AB`. Surrounding
/// comment punctuation such as `//`, `#` or `<!--` is ignored.
fn contains_marker(line: &str, marker: &str) -> bool {
	line.split_whitespace().any(|word| {
		word.trim_matches(|c: char| !(c.is_alphanumeric() || c == '_')) == marker
	})
}

/// Strip the common leading whitespace of all non-blank lines.
pub fn dedent(lines: &[String]) -> Vec<String> {
	let indent = lines
		.iter()
		.filter(|line| !line.trim().is_empty())
		.map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
		.min()
		.unwrap_or(0);

	lines
		.iter()
		.map(|line| {
			if line.trim().is_empty() {
				String::new()
			} else {
				line[indent..].to_string()
			}
		})
		.collect()
}

fn hide_lines(lines: &[String], hide: &[String]) -> Vec<String> {
	if hide.is_empty() {
		return lines.to_vec();
	}

	lines
		.iter()
		.filter(|line| !hide.iter().any(|needle| line.contains(needle.as_str())))
		.cloned()
		.collect()
}

/// Wrap `lines` in a fenced code block. The fence grows when the body itself
/// contains backtick fences.
pub fn fence(lang: Option<&str>, lines: &[String]) -> Vec<String> {
	let longest = lines
		.iter()
		.filter_map(|line| fence_start(line.trim_start()))
		.filter(|(fence_char, _)| *fence_char == '`')
		.map(|(_, len)| len)
		.max()
		.unwrap_or(0);
	let ticks = "`".repeat(longest.max(2) + 1);

	let mut result = Vec::with_capacity(lines.len() + 2);
	result.push(format!("{ticks}{}", lang.unwrap_or_default()));
	result.extend(lines.iter().cloned());
	result.push(ticks);
	result
}

/// The language tag for a source file, from its extension.
pub fn language_for_path(path: &Path) -> Option<&'static str> {
	let extension = path.extension()?.to_str()?;

	let lang = match extension {
		"rs" => "rust",
		"kt" | "kts" => "kotlin",
		"java" => "java",
		"py" => "python",
		"ts" | "tsx" => "typescript",
		"js" | "jsx" | "mjs" => "javascript",
		"go" => "go",
		"c" | "h" => "c",
		"cc" | "cpp" | "hpp" => "cpp",
		"toml" => "toml",
		"json" => "json",
		"yaml" | "yml" => "yaml",
		"sh" | "bash" => "bash",
		"md" => "markdown",
		_ => return None,
	};

	Some(lang)
}

/// The single fenced block inside an inline `SAMPLE` region, with trailing
/// whitespace trimmed per line, and the block's info-string language.
fn inline_block(document: &Document, region: &Region) -> WeaveResult<(Vec<String>, Option<String>)> {
	let body = &document.lines[region.body()];
	let missing = || {
		WeaveError::MissingFence {
			file: document.display_path(),
			line: region.opening_line(),
		}
	};

	let mut lines = body.iter();
	let mut block = Vec::new();
	let (fence_char, fence_len, info) = loop {
		let line = lines.next().ok_or_else(missing)?;
		let trimmed = line.trim_start();
		if let Some((fence_char, fence_len)) = fence_start(trimmed) {
			block.push(line.trim_end().to_string());
			break (fence_char, fence_len, trimmed[fence_len..].trim().to_string());
		}
	};

	for line in lines {
		block.push(line.trim_end().to_string());
		let trimmed = line.trim_start();
		let closing_len = trimmed.chars().take_while(|&c| c == fence_char).count();
		if closing_len >= fence_len && trimmed[closing_len..].trim().is_empty() {
			let lang = info.split_whitespace().next().map(String::from);
			return Ok((block, lang));
		}
	}

	Err(missing())
}

/// `document` relative to the directory of `artifact`, with `/` separators.
fn relative_source(document: &Path, artifact: &Path) -> String {
	let base = artifact.parent().unwrap_or_else(|| Path::new(""));
	let relative = pathdiff::diff_paths(document, base).unwrap_or_else(|| document.to_path_buf());

	relative
		.components()
		.map(|component| component.as_os_str().to_string_lossy())
		.collect::<Vec<_>>()
		.join("/")
}

/// Place `code` inside `wrapper`. The prefix and suffix are skipped when the
/// code already contains the wrapper's `unless_contains` text.
pub fn wrap_sample(
	wrapper: &SampleWrapper,
	code: &[String],
	source: &str,
	name: &str,
	lang: &str,
) -> WeaveResult<Vec<String>> {
	let mut env = Environment::new();
	env.set_undefined_behavior(UndefinedBehavior::Strict);
	let ctx = context! { source, name, lang };
	let render = |template: &str| -> WeaveResult<Vec<String>> {
		let rendered = env
			.render_str(template, &ctx)
			.map_err(|e| WeaveError::TemplateRender(e.to_string()))?;
		Ok(split_lines(&rendered).0)
	};

	let mut lines = Vec::new();
	if let Some(header) = &wrapper.header {
		lines.extend(render(header)?);
	}

	let already_wrapped = wrapper
		.unless_contains
		.as_deref()
		.is_some_and(|needle| code.iter().any(|line| line.contains(needle)));

	if already_wrapped {
		lines.extend(code.iter().cloned());
		return Ok(lines);
	}

	if let Some(prefix) = &wrapper.prefix {
		lines.extend(render(prefix)?);
	}
	lines.extend(code.iter().map(|line| {
		if line.is_empty() {
			String::new()
		} else {
			format!("{}{line}", wrapper.indent)
		}
	}));
	if let Some(suffix) = &wrapper.suffix {
		lines.extend(render(suffix)?);
	}

	Ok(lines)
}

use miette::Diagnostic;
use thiserror::Error;

use crate::DirectiveKind;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum WeaveError {
	#[error(transparent)]
	#[diagnostic(code(docweave::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to read `{path}`: {reason}")]
	#[diagnostic(code(docweave::read_error))]
	Read { path: String, reason: String },

	#[error("failed to write `{path}`: {reason}")]
	#[diagnostic(code(docweave::write_error))]
	Write { path: String, reason: String },

	#[error("failure to parse markdown: {0}")]
	#[diagnostic(code(docweave::markdown))]
	Markdown(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(docweave::config_parse),
		help("check that docweave.toml is valid TOML")
	)]
	ConfigParse(String),

	#[error("invalid line separator: `{0}`")]
	#[diagnostic(
		code(docweave::invalid_line_separator),
		help("use `unix` (\\n) or `windows` (\\r\\n)")
	)]
	InvalidLineSeparator(String),

	#[error("invalid pattern `{pattern}` for module `{module}`: {reason}")]
	#[diagnostic(code(docweave::invalid_module_pattern))]
	InvalidModulePattern {
		module: String,
		pattern: String,
		reason: String,
	},

	#[error("module `{0}` is declared more than once")]
	#[diagnostic(
		code(docweave::duplicate_module),
		help("give each `[[modules]]` entry a unique `name`")
	)]
	DuplicateModule(String),

	#[error("invalid table of contents depth range {min}..={max}")]
	#[diagnostic(
		code(docweave::invalid_toc_depth),
		help("`min_depth` and `max_depth` must be between 1 and 6 with min <= max")
	)]
	InvalidTocDepth { min: u8, max: u8 },

	#[error("{file}:{line}: malformed directive: {reason}")]
	#[diagnostic(
		code(docweave::malformed_directive),
		help("directives look like `<!--- KEYWORD args -->` on a line of their own")
	)]
	MalformedDirective {
		file: String,
		line: usize,
		reason: String,
	},

	#[error("{file}:{line}: unknown directive `{keyword}`")]
	#[diagnostic(
		code(docweave::unknown_directive),
		help("available directives: INCLUDE, SAMPLE, TOC, MODULE, LINKS and END")
	)]
	UnknownDirective {
		file: String,
		line: usize,
		keyword: String,
	},

	#[error("{file}:{line}: unknown option `{option}` for `{kind}`")]
	#[diagnostic(code(docweave::unknown_option))]
	UnknownOption {
		file: String,
		line: usize,
		kind: DirectiveKind,
		option: String,
	},

	#[error("{file}:{line}: `{kind}` cannot be opened inside the `{outer}` opened on line {outer_line}")]
	#[diagnostic(
		code(docweave::nested_directive),
		help("close the `{outer}` region with `<!--- END {outer} -->` first")
	)]
	NestedDirective {
		file: String,
		line: usize,
		kind: DirectiveKind,
		outer: DirectiveKind,
		outer_line: usize,
	},

	#[error("{file}:{line}: `END {found}` does not close the `{expected}` opened on line {opening_line}")]
	#[diagnostic(code(docweave::mismatched_closing))]
	MismatchedClosing {
		file: String,
		line: usize,
		expected: DirectiveKind,
		found: DirectiveKind,
		opening_line: usize,
	},

	#[error("{file}:{line}: `END {kind}` has no matching opening directive")]
	#[diagnostic(code(docweave::unmatched_closing))]
	UnmatchedClosing {
		file: String,
		line: usize,
		kind: DirectiveKind,
	},

	#[error("{file}:{line}: missing closing directive for `{kind}`")]
	#[diagnostic(
		code(docweave::unmatched_directive),
		help("add `<!--- END {kind} -->` to close this region")
	)]
	UnmatchedOpening {
		file: String,
		line: usize,
		kind: DirectiveKind,
	},

	#[error("{file}:{line}: cannot read referenced source `{source_file}`: {reason}")]
	#[diagnostic(code(docweave::missing_source))]
	MissingSourceFile {
		file: String,
		line: usize,
		source_file: String,
		reason: String,
	},

	#[error("marker `{marker}` not found in `{file}`")]
	#[diagnostic(
		code(docweave::missing_range_marker),
		help("wrap the range in `START-<NAME>` and `END-<NAME>` marker lines")
	)]
	MissingRangeMarker { file: String, marker: String },

	#[error("marker `{marker}` appears more than once in `{file}` (lines {first_line} and {second_line})")]
	#[diagnostic(code(docweave::duplicate_range_marker))]
	DuplicateRangeMarker {
		file: String,
		marker: String,
		first_line: usize,
		second_line: usize,
	},

	#[error("range `{name}` in `{file}` ends before it starts")]
	#[diagnostic(code(docweave::inverted_range))]
	InvertedRange { file: String, name: String },

	#[error("{file}:{line}: inline `SAMPLE` region does not contain a fenced code block")]
	#[diagnostic(
		code(docweave::missing_fence),
		help("put a fenced code block inside the region or reference a source range")
	)]
	MissingFence { file: String, line: usize },

	#[error("{file}:{line}: module `{second}` conflicts with module `{first}` declared earlier")]
	#[diagnostic(code(docweave::conflicting_module))]
	ConflictingModule {
		file: String,
		line: usize,
		first: String,
		second: String,
	},

	#[error("template rendering failed: {0}")]
	#[diagnostic(code(docweave::template_render))]
	TemplateRender(String),

	#[error("`{path}` is generated by both `{first}` and `{second}`")]
	#[diagnostic(
		code(docweave::artifact_conflict),
		help("every `emit=` path must be unique and must not point at a document")
	)]
	ArtifactConflict {
		path: String,
		first: String,
		second: String,
	},

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(docweave::symlink_cycle),
		help("remove the circular symlink or exclude this path")
	)]
	SymlinkCycle { path: String },
}

impl WeaveError {
	/// Returns true for errors that are caused by the contents of a single
	/// document. These abort that document only.
	pub fn is_structural(&self) -> bool {
		matches!(
			self,
			Self::MalformedDirective { .. }
				| Self::UnknownDirective { .. }
				| Self::UnknownOption { .. }
				| Self::NestedDirective { .. }
				| Self::MismatchedClosing { .. }
				| Self::UnmatchedClosing { .. }
				| Self::UnmatchedOpening { .. }
				| Self::MissingSourceFile { .. }
				| Self::MissingRangeMarker { .. }
				| Self::DuplicateRangeMarker { .. }
				| Self::InvertedRange { .. }
				| Self::MissingFence { .. }
				| Self::ConflictingModule { .. }
		)
	}

	/// Returns true for errors raised while validating configuration, before
	/// any document is processed.
	pub fn is_configuration(&self) -> bool {
		matches!(
			self,
			Self::ConfigParse(_)
				| Self::InvalidLineSeparator(_)
				| Self::InvalidModulePattern { .. }
				| Self::DuplicateModule(_)
				| Self::InvalidTocDepth { .. }
		)
	}

	/// The 1-indexed document line the error points at, when it has one.
	pub fn line(&self) -> Option<usize> {
		match self {
			Self::MalformedDirective { line, .. }
			| Self::UnknownDirective { line, .. }
			| Self::UnknownOption { line, .. }
			| Self::NestedDirective { line, .. }
			| Self::MismatchedClosing { line, .. }
			| Self::UnmatchedClosing { line, .. }
			| Self::UnmatchedOpening { line, .. }
			| Self::MissingSourceFile { line, .. }
			| Self::MissingFence { line, .. }
			| Self::ConflictingModule { line, .. } => Some(*line),
			_ => None,
		}
	}
}

pub type WeaveResult<T> = Result<T, WeaveError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;

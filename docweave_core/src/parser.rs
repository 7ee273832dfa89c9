use std::fmt::Display;
use std::ops::Range;
use std::path::PathBuf;

use derive_more::Deref;
use serde::Serialize;

use crate::Document;
use crate::WeaveError;
use crate::WeaveResult;
use crate::lexer::is_directive_line;
use crate::lexer::tokenize;
use crate::tokens::Token;
use crate::tokens::TokenGroup;

/// The kinds of directive a document can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
pub enum DirectiveKind {
	/// `<!--- INCLUDE path#NAME -->` … `<!--- END INCLUDE -->`
	Include,
	/// `<!--- SAMPLE [path#NAME] -->` … `<!--- END SAMPLE -->`
	Sample,
	/// `<!--- TOC -->` … `<!--- END TOC -->`
	Toc,
	/// `<!--- MODULE name -->` … `<!--- END MODULE -->`
	Module,
	/// `<!--- LINKS -->` … `<!--- END LINKS -->`
	Links,
}

impl DirectiveKind {
	pub fn keyword(self) -> &'static str {
		match self {
			Self::Include => "INCLUDE",
			Self::Sample => "SAMPLE",
			Self::Toc => "TOC",
			Self::Module => "MODULE",
			Self::Links => "LINKS",
		}
	}

	fn from_keyword(keyword: &str) -> Option<Self> {
		match keyword {
			"INCLUDE" => Some(Self::Include),
			"SAMPLE" => Some(Self::Sample),
			"TOC" => Some(Self::Toc),
			"MODULE" => Some(Self::Module),
			"LINKS" => Some(Self::Links),
			_ => None,
		}
	}
}

impl Display for DirectiveKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.keyword())
	}
}

/// Where the code of an `INCLUDE` or `SAMPLE` region comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SampleSource {
	/// A named `START-<NAME>`/`END-<NAME>` range of another file. `path` is
	/// relative to the document's directory.
	External { path: PathBuf, range: String },
	/// The fenced block already inside the region.
	Inline,
}

/// Formatting directives attached to a sample reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleOptions {
	/// Language tag of the produced fenced block.
	pub lang: Option<String>,
	/// Lines containing any of these strings are suppressed in the document.
	pub hide: Vec<String>,
	/// Strip the common leading whitespace of the extracted lines.
	pub dedent: bool,
	/// Materialize a standalone file at this path, relative to the document's
	/// directory.
	pub emit: Option<PathBuf>,
}

/// A parsed `INCLUDE` or `SAMPLE` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleReference {
	pub source: SampleSource,
	pub options: SampleOptions,
}

/// What a region is, together with anything its opening directive declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RegionKind {
	/// Plain document text between directives.
	Literal,
	Include(SampleReference),
	SampleTest(SampleReference),
	TocAnchor,
	ModuleAnchor { name: String },
	LinkAnchor,
}

impl RegionKind {
	pub fn directive(&self) -> Option<DirectiveKind> {
		match self {
			Self::Literal => None,
			Self::Include(_) => Some(DirectiveKind::Include),
			Self::SampleTest(_) => Some(DirectiveKind::Sample),
			Self::TocAnchor => Some(DirectiveKind::Toc),
			Self::ModuleAnchor { .. } => Some(DirectiveKind::Module),
			Self::LinkAnchor => Some(DirectiveKind::Links),
		}
	}
}

/// A classified, contiguous span of a document's lines. Directive regions
/// include their opening and closing lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
	pub kind: RegionKind,
	/// 0-indexed, end-exclusive line span in the document.
	pub lines: Range<usize>,
}

impl Region {
	/// 1-indexed line of the region's first line (the opening directive for
	/// directive regions).
	pub fn opening_line(&self) -> usize {
		self.lines.start + 1
	}

	/// The lines between the opening and closing directive. For literal
	/// regions this is the whole span.
	pub fn body(&self) -> Range<usize> {
		match self.kind {
			RegionKind::Literal => self.lines.clone(),
			_ => (self.lines.start + 1)..(self.lines.end - 1),
		}
	}

	pub fn is_literal(&self) -> bool {
		matches!(self.kind, RegionKind::Literal)
	}
}

/// The ordered regions of one document. They partition its lines with no gap
/// and no overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct Regions(Vec<Region>);

impl Regions {
	/// Concatenate the original lines of every region.
	pub fn reconstruct<'a>(&self, document: &'a Document) -> Vec<&'a str> {
		self.0
			.iter()
			.flat_map(|region| document.lines[region.lines.clone()].iter())
			.map(String::as_str)
			.collect()
	}
}

/// Tracks fenced code blocks (```` ``` ```` or `~~~`) line by line so that
/// directive lines shown inside code are treated as text.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
	open: Option<(char, usize)>,
}

impl FenceTracker {
	/// Feed the next line. Returns true when the line is a fence delimiter or
	/// lies inside a fenced block.
	pub(crate) fn observe(&mut self, line: &str) -> bool {
		let trimmed = line.trim_start();

		if let Some((fence_char, fence_len)) = self.open {
			// Closing fence: same char, at least the same length, no info
			// string.
			let closing_len = trimmed.chars().take_while(|&c| c == fence_char).count();
			if closing_len >= fence_len && trimmed[closing_len..].trim().is_empty() {
				self.open = None;
			}
			return true;
		}

		if let Some(fence) = fence_start(trimmed) {
			self.open = Some(fence);
			return true;
		}

		false
	}
}

/// The fence character and length if `trimmed` opens a fenced code block.
pub(crate) fn fence_start(trimmed: &str) -> Option<(char, usize)> {
	let backtick_len = trimmed.chars().take_while(|&c| c == '`').count();
	if backtick_len >= 3 {
		return Some(('`', backtick_len));
	}

	let tilde_len = trimmed.chars().take_while(|&c| c == '~').count();
	if tilde_len >= 3 {
		return Some(('~', tilde_len));
	}

	None
}

/// A single recognized directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Marker {
	Opening { kind: RegionKind, line: usize },
	Closing { kind: DirectiveKind, line: usize },
}

/// Scanner state: outside any region, or inside exactly one.
enum ScanState {
	Outside {
		literal_start: usize,
	},
	Inside {
		kind: RegionKind,
		start: usize,
	},
}

/// Scan a document into regions.
///
/// Lines are walked once. Opening directives move the scanner inside a
/// region, the matching `END` directive emits it. Nesting, mismatched or
/// unmatched directives are structural errors.
pub fn scan(document: &Document) -> WeaveResult<Regions> {
	let file = document.display_path();
	let mut regions = Vec::new();
	let mut state = ScanState::Outside { literal_start: 0 };
	let mut fences = FenceTracker::default();

	for (index, line) in document.lines.iter().enumerate() {
		if fences.observe(line) {
			continue;
		}

		let trimmed = line.trim();
		if !is_directive_line(trimmed) {
			continue;
		}

		let group = tokenize(trimmed, index + 1, &file)?;
		let marker = classify_group(&group, &file)?;

		state = match (state, marker) {
			(ScanState::Outside { literal_start }, Marker::Opening { kind, .. }) => {
				if literal_start < index {
					regions.push(Region {
						kind: RegionKind::Literal,
						lines: literal_start..index,
					});
				}
				ScanState::Inside { kind, start: index }
			}
			(ScanState::Outside { .. }, Marker::Closing { kind, line }) => {
				return Err(WeaveError::UnmatchedClosing { file, line, kind });
			}
			(ScanState::Inside { kind: outer, start }, Marker::Opening { kind, line }) => {
				return Err(WeaveError::NestedDirective {
					file,
					line,
					kind: directive_of(&kind),
					outer: directive_of(&outer),
					outer_line: start + 1,
				});
			}
			(ScanState::Inside { kind, start }, Marker::Closing { kind: found, line }) => {
				let expected = directive_of(&kind);
				if expected != found {
					return Err(WeaveError::MismatchedClosing {
						file,
						line,
						expected,
						found,
						opening_line: start + 1,
					});
				}
				regions.push(Region {
					kind,
					lines: start..index + 1,
				});
				ScanState::Outside {
					literal_start: index + 1,
				}
			}
		};
	}

	match state {
		ScanState::Outside { literal_start } => {
			if literal_start < document.lines.len() {
				regions.push(Region {
					kind: RegionKind::Literal,
					lines: literal_start..document.lines.len(),
				});
			}
		}
		ScanState::Inside { kind, start } => {
			return Err(WeaveError::UnmatchedOpening {
				file,
				line: start + 1,
				kind: directive_of(&kind),
			});
		}
	}

	Ok(Regions(regions))
}

fn directive_of(kind: &RegionKind) -> DirectiveKind {
	kind.directive().unwrap_or(DirectiveKind::Include)
}

/// A directive argument: a bare value or a `key=value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Argument {
	Positional(String),
	Pair(String, String),
}

fn parse_arguments(group: &TokenGroup, file: &str) -> WeaveResult<Vec<Argument>> {
	let malformed = |reason: String| {
		WeaveError::MalformedDirective {
			file: file.to_string(),
			line: group.line,
			reason,
		}
	};

	let mut arguments = Vec::new();
	let mut iter = group.arguments().iter().peekable();

	while let Some(token) = iter.next() {
		match token {
			Token::Word(word) if matches!(iter.peek(), Some(Token::Equals)) => {
				iter.next();
				match iter.next().and_then(Token::value) {
					Some(value) => arguments.push(Argument::Pair(word.clone(), value.to_string())),
					None => return Err(malformed(format!("missing value for `{word}`"))),
				}
			}
			Token::Word(value) | Token::String(value) => {
				arguments.push(Argument::Positional(value.clone()));
			}
			Token::Equals => return Err(malformed("unexpected `=`".to_string())),
		}
	}

	Ok(arguments)
}

fn classify_group(group: &TokenGroup, file: &str) -> WeaveResult<Marker> {
	let line = group.line;
	let keyword = group.keyword().unwrap_or_default();

	if keyword == "END" {
		let arguments = parse_arguments(group, file)?;
		let kind = match arguments.as_slice() {
			[Argument::Positional(name)] => DirectiveKind::from_keyword(name),
			_ => None,
		};
		let Some(kind) = kind else {
			return Err(WeaveError::MalformedDirective {
				file: file.to_string(),
				line,
				reason: "`END` must name the directive it closes, e.g. `<!--- END TOC -->`"
					.to_string(),
			});
		};
		return Ok(Marker::Closing { kind, line });
	}

	let Some(directive) = DirectiveKind::from_keyword(keyword) else {
		return Err(WeaveError::UnknownDirective {
			file: file.to_string(),
			line,
			keyword: keyword.to_string(),
		});
	};

	let arguments = parse_arguments(group, file)?;
	let unknown = |option: &str| {
		WeaveError::UnknownOption {
			file: file.to_string(),
			line,
			kind: directive,
			option: option.to_string(),
		}
	};
	let malformed = |reason: &str| {
		WeaveError::MalformedDirective {
			file: file.to_string(),
			line,
			reason: reason.to_string(),
		}
	};

	let kind = match directive {
		DirectiveKind::Toc | DirectiveKind::Links => {
			if let Some(argument) = arguments.first() {
				return Err(unknown(argument_name(argument)));
			}
			if directive == DirectiveKind::Toc {
				RegionKind::TocAnchor
			} else {
				RegionKind::LinkAnchor
			}
		}
		DirectiveKind::Module => {
			match arguments.as_slice() {
				[Argument::Positional(name)] => RegionKind::ModuleAnchor { name: name.clone() },
				[] => return Err(malformed("`MODULE` requires a module name")),
				[_, extra, ..] | [extra @ Argument::Pair(..)] => {
					return Err(unknown(argument_name(extra)));
				}
			}
		}
		DirectiveKind::Include | DirectiveKind::Sample => {
			let reference = parse_sample_reference(directive, &arguments, &unknown, &malformed)?;
			if directive == DirectiveKind::Include {
				if reference.source == SampleSource::Inline {
					return Err(malformed("`INCLUDE` requires a `path#NAME` reference"));
				}
				RegionKind::Include(reference)
			} else {
				RegionKind::SampleTest(reference)
			}
		}
	};

	Ok(Marker::Opening { kind, line })
}

fn argument_name(argument: &Argument) -> &str {
	match argument {
		Argument::Positional(name) | Argument::Pair(name, _) => name,
	}
}

fn parse_sample_reference(
	directive: DirectiveKind,
	arguments: &[Argument],
	unknown: &dyn Fn(&str) -> WeaveError,
	malformed: &dyn Fn(&str) -> WeaveError,
) -> WeaveResult<SampleReference> {
	let mut source = SampleSource::Inline;
	let mut options = SampleOptions::default();

	for argument in arguments {
		match argument {
			Argument::Positional(value) if value.contains('#') => {
				if source != SampleSource::Inline {
					return Err(malformed("only one `path#NAME` reference is allowed"));
				}
				let Some((path, range)) = value.split_once('#') else {
					continue;
				};
				if path.is_empty() || range.is_empty() {
					return Err(malformed("references look like `path/to/file#NAME`"));
				}
				source = SampleSource::External {
					path: PathBuf::from(path),
					range: range.to_string(),
				};
			}
			Argument::Positional(flag) if flag == "dedent" => options.dedent = true,
			Argument::Pair(key, value) if key == "lang" => options.lang = Some(value.clone()),
			Argument::Pair(key, value) if key == "hide" => options.hide.push(value.clone()),
			Argument::Pair(key, value) if key == "emit" && directive == DirectiveKind::Sample => {
				options.emit = Some(PathBuf::from(value));
			}
			other => return Err(unknown(argument_name(other))),
		}
	}

	if source == SampleSource::Inline && !options.hide.is_empty() {
		return Err(malformed("`hide` requires a `path#NAME` reference"));
	}

	Ok(SampleReference { source, options })
}

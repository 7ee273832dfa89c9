use std::path::Path;
use std::path::PathBuf;

use crate::FileSystem;
use crate::LineSeparator;
use crate::WeaveError;
use crate::WeaveResult;

/// A loaded document: its lines without separators plus the separator it was
/// written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
	pub path: PathBuf,
	pub lines: Vec<String>,
	/// Separator detected from the first line break on disk.
	pub separator: LineSeparator,
	/// Whether the content ended with a line break.
	pub trailing_newline: bool,
}

impl Document {
	pub fn load(fs: &dyn FileSystem, path: &Path) -> WeaveResult<Self> {
		let content = fs.read_to_string(path).map_err(|e| {
			WeaveError::Read {
				path: path.display().to_string(),
				reason: e.to_string(),
			}
		})?;

		Ok(Self::from_content(path, &content))
	}

	pub fn from_content(path: impl Into<PathBuf>, content: &str) -> Self {
		let (lines, trailing_newline) = split_lines(content);

		Self {
			path: path.into(),
			lines,
			separator: LineSeparator::detect(content),
			trailing_newline,
		}
	}

	/// The directory relative references in this document resolve against.
	pub fn directory(&self) -> &Path {
		self.path.parent().unwrap_or_else(|| Path::new(""))
	}

	/// Display form of the path used in diagnostics.
	pub fn display_path(&self) -> String {
		self.path.display().to_string()
	}

	/// Join `lines` the way this document ends: with `separator` between lines
	/// and after the last one when the original had a trailing line break.
	pub fn join(&self, lines: &[String], separator: LineSeparator) -> String {
		join_lines(lines, separator, self.trailing_newline)
	}
}

/// Split content into lines, dropping `\n` and `\r\n` terminators. Returns
/// the lines and whether the content ended with a line break.
pub fn split_lines(content: &str) -> (Vec<String>, bool) {
	if content.is_empty() {
		return (Vec::new(), false);
	}

	let trailing_newline = content.ends_with('\n');
	let body = if trailing_newline {
		&content[..content.len() - 1]
	} else {
		content
	};

	let lines = body
		.split('\n')
		.map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
		.collect();

	(lines, trailing_newline)
}

/// Join lines with `separator`, appending a final separator when
/// `trailing_newline` is set and there is at least one line.
pub fn join_lines(lines: &[String], separator: LineSeparator, trailing_newline: bool) -> String {
	let separator = separator.as_str();
	let mut result = lines.join(separator);
	if trailing_newline && !lines.is_empty() {
		result.push_str(separator);
	}
	result
}

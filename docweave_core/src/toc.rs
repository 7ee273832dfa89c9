use std::collections::HashMap;
use std::collections::HashSet;

use markdown::ParseOptions;
use markdown::mdast::Node;
use markdown::to_mdast;

use crate::TocOptions;
use crate::WeaveError;
use crate::WeaveResult;

/// A header found in a composed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
	pub depth: u8,
	pub text: String,
	/// Anchor slug, unique within the document.
	pub slug: String,
	/// 1-indexed line of the header in the composed document.
	pub line: usize,
}

/// Collect the headers of a markdown document in order, assigning each a
/// slug unique within the document. Headers inside fenced code are not
/// headers.
pub fn collect_headings(content: &str) -> WeaveResult<Vec<Heading>> {
	let options = ParseOptions::gfm();
	let mdast = to_mdast(content, &options).map_err(|e| WeaveError::Markdown(e.to_string()))?;

	let mut headings = Vec::new();
	let mut slugger = Slugger::default();
	collect_heading_nodes(&mdast, &mut slugger, &mut headings);

	Ok(headings)
}

fn collect_heading_nodes(node: &Node, slugger: &mut Slugger, headings: &mut Vec<Heading>) {
	match node {
		Node::Heading(heading) => {
			let text = node.to_string();
			let line = heading
				.position
				.as_ref()
				.map_or(0, |position| position.start.line);
			headings.push(Heading {
				depth: heading.depth,
				slug: slugger.slug(&text),
				text,
				line,
			});
		}
		_ => {
			if let Some(children) = node.children() {
				for child in children {
					collect_heading_nodes(child, slugger, headings);
				}
			}
		}
	}
}

/// The GitHub anchor for a header: lowercased, alphanumerics, `-` and `_`
/// kept, spaces turned into `-`, everything else dropped.
pub fn slugify(text: &str) -> String {
	text.trim()
		.chars()
		.flat_map(char::to_lowercase)
		.filter_map(|c| {
			if c.is_alphanumeric() || c == '-' || c == '_' {
				Some(c)
			} else if c == ' ' {
				Some('-')
			} else {
				None
			}
		})
		.collect()
}

/// Hands out unique slugs in order of first occurrence: the second `Usage`
/// becomes `usage-1`, the third `usage-2`.
#[derive(Debug, Default)]
pub struct Slugger {
	occurrences: HashMap<String, usize>,
	used: HashSet<String>,
}

impl Slugger {
	pub fn slug(&mut self, text: &str) -> String {
		let base = slugify(text);
		let mut slug = base.clone();
		let count = self.occurrences.entry(base.clone()).or_insert(0);

		while self.used.contains(&slug) {
			*count += 1;
			slug = format!("{base}-{count}");
		}

		self.used.insert(slug.clone());
		slug
	}
}

/// Headers of one document contributing to a table of contents.
#[derive(Debug, Clone, Copy)]
pub struct TocSource<'a> {
	/// Link target prefix: `None` for the anchor's own document, otherwise the
	/// document path relative to it.
	pub target: Option<&'a str>,
	pub headings: &'a [Heading],
}

/// A synthesized table of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
	pub lines: Vec<String>,
	/// Slugs listed by more than one source document.
	pub shared_slugs: Vec<String>,
}

/// Build the table of contents for `sources`, listing headers whose depth is
/// within the configured range. Entries are indented two spaces per level
/// below the shallowest listed header.
pub fn build_toc(sources: &[TocSource<'_>], options: &TocOptions) -> Toc {
	let in_range = |heading: &&Heading| {
		(options.min_depth..=options.max_depth).contains(&heading.depth)
	};

	let Some(shallowest) = sources
		.iter()
		.flat_map(|source| source.headings.iter().filter(in_range))
		.map(|heading| heading.depth)
		.min()
	else {
		return Toc::default();
	};

	let mut toc = Toc::default();
	let mut owners: HashMap<&str, usize> = HashMap::new();

	for (index, source) in sources.iter().enumerate() {
		for heading in source.headings.iter().filter(in_range) {
			let owner = *owners.entry(heading.slug.as_str()).or_insert(index);
			if owner != index && !toc.shared_slugs.contains(&heading.slug) {
				toc.shared_slugs.push(heading.slug.clone());
			}

			let indent = "  ".repeat(usize::from(heading.depth - shallowest));
			toc.lines.push(format!(
				"{indent}* [{}]({}#{})",
				escape_link_text(&heading.text),
				source.target.unwrap_or_default(),
				heading.slug
			));
		}
	}

	toc
}

fn escape_link_text(text: &str) -> String {
	text.replace('[', "\\[").replace(']', "\\]")
}

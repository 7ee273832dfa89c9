use std::collections::HashSet;

use crate::Document;
use crate::Module;
use crate::ModuleRegistry;
use crate::Region;
use crate::parser::FenceTracker;

/// A link identifier that no module could resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLink {
	pub id: String,
	/// 1-indexed document line the identifier was found on.
	pub line: usize,
}

/// Canonical bodies of a document's `LINKS` regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedLinks {
	/// One body per region, in region order.
	pub bodies: Vec<Vec<String>>,
	pub unresolved: Vec<UnresolvedLink>,
}

/// Resolves link identifiers against the module registry.
#[derive(Debug, Clone, Copy)]
pub struct LinkResolver<'a> {
	registry: &'a ModuleRegistry,
	/// The module the document belongs to, used for bare identifiers.
	module: Option<&'a Module>,
}

impl<'a> LinkResolver<'a> {
	pub fn new(registry: &'a ModuleRegistry, module: Option<&'a Module>) -> Self {
		Self { registry, module }
	}

	/// Resolve `module/Path` through the named module, or a bare `Path`
	/// through the document's own module. A document outside every module
	/// resolves nothing.
	pub fn resolve(&self, id: &str) -> Option<String> {
		let own = self.module?;
		match id.split_once('/') {
			Some((module, path)) => self.registry.get(module)?.url_for(path),
			None => own.url_for(id),
		}
	}

	/// Compose the body of every `LINKS` region of `document`.
	///
	/// Each region keeps its own definitions, rewritten to canonical URLs.
	/// Identifiers referenced in the text but not defined in any region are
	/// appended to the first region.
	pub fn weave(&self, document: &Document, regions: &[&Region], text_ids: &[(String, usize)]) -> ResolvedLinks {
		let mut resolved = ResolvedLinks::default();
		let mut defined: HashSet<String> = HashSet::new();

		for region in regions {
			let mut body = Vec::new();
			for index in region.body() {
				let line = &document.lines[index];
				let Some((id, _)) = parse_definition(line) else {
					continue;
				};
				if !defined.insert(id.to_string()) {
					continue;
				}

				match self.resolve(id) {
					Some(url) => body.push(format!("[{id}]: {url}")),
					None => {
						body.push(line.clone());
						resolved.unresolved.push(UnresolvedLink {
							id: id.to_string(),
							line: index + 1,
						});
					}
				}
			}
			resolved.bodies.push(body);
		}

		let Some(first) = resolved.bodies.first_mut() else {
			return resolved;
		};

		for (id, line) in text_ids {
			if defined.contains(id) {
				continue;
			}
			match self.resolve(id) {
				Some(url) => {
					first.push(format!("[{id}]: {url}"));
					defined.insert(id.clone());
				}
				None => {
					resolved.unresolved.push(UnresolvedLink {
						id: id.clone(),
						line: *line,
					});
				}
			}
		}

		resolved
	}
}

/// Parse a link reference definition `[id]: url`.
pub fn parse_definition(line: &str) -> Option<(&str, &str)> {
	let rest = line.trim().strip_prefix('[')?;
	let (id, url) = rest.split_once("]:")?;
	if id.is_empty() || id.contains(']') {
		return None;
	}
	Some((id, url.trim()))
}

/// Identifiers of full reference links `[text][id]` in `lines`, in order of
/// first occurrence with their 1-indexed line. Fenced code is skipped.
pub fn collect_reference_ids<'a>(lines: impl IntoIterator<Item = (usize, &'a str)>) -> Vec<(String, usize)> {
	let mut ids: Vec<(String, usize)> = Vec::new();
	let mut fences = FenceTracker::default();

	for (index, line) in lines {
		if fences.observe(line) {
			continue;
		}

		let mut rest = line;
		while let Some(position) = rest.find("][") {
			rest = &rest[position + 2..];
			let Some(end) = rest.find(']') else {
				break;
			};
			let id = &rest[..end];
			rest = &rest[end + 1..];

			if id.is_empty() || id.contains(char::is_whitespace) || id.contains('[') {
				continue;
			}
			if !ids.iter().any(|(existing, _)| existing == id) {
				ids.push((id.to_string(), index + 1));
			}
		}
	}

	ids
}

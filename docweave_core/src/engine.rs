use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::DerivedArtifact;
use crate::Document;
use crate::EngineConfig;
use crate::FileSystem;
use crate::Heading;
use crate::LineSeparator;
use crate::LinkResolver;
use crate::Module;
use crate::Region;
use crate::RegionKind;
use crate::TocScope;
use crate::TocSource;
use crate::WeaveError;
use crate::WeaveResult;
use crate::Weaver;
use crate::build_toc;
use crate::collect_headings;
use crate::collect_reference_ids;
use crate::scan;

/// A non-fatal problem found while composing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentWarning {
	/// 1-indexed line in the original document.
	pub line: Option<usize>,
	pub message: String,
}

/// A document with every region except tables of contents composed.
///
/// Tables of contents are filled in by [`finish`] once the headers of every
/// document they may list are known.
#[derive(Debug, Clone)]
pub struct Draft {
	pub document: Document,
	/// Name of the module the document belongs to.
	pub module: Option<String>,
	/// Composed lines with empty table of contents bodies.
	lines: Vec<String>,
	/// Insertion points, in `lines`, of each table of contents body.
	toc_slots: Vec<usize>,
	/// Headers of the composed document, with lines relative to `lines`.
	pub headings: Vec<Heading>,
	pub artifacts: Vec<DerivedArtifact>,
	pub warnings: Vec<DocumentWarning>,
}

/// The fully composed form of one document.
#[derive(Debug, Clone)]
pub struct ComposedDocument {
	pub document: Document,
	pub lines: Vec<String>,
	pub artifacts: Vec<DerivedArtifact>,
	pub warnings: Vec<DocumentWarning>,
}

impl ComposedDocument {
	/// The composed text joined with `separator`, keeping the original
	/// trailing line break.
	pub fn content(&self, separator: LineSeparator) -> String {
		self.document.join(&self.lines, separator)
	}
}

/// Headers of every drafted document, keyed by path, for module-scoped
/// tables of contents.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
	documents: BTreeMap<PathBuf, IndexedDocument>,
}

#[derive(Debug, Clone)]
struct IndexedDocument {
	module: Option<String>,
	headings: Vec<Heading>,
}

impl HeaderIndex {
	pub fn insert(&mut self, draft: &Draft) {
		self.documents.insert(
			draft.document.path.clone(),
			IndexedDocument {
				module: draft.module.clone(),
				headings: draft.headings.clone(),
			},
		);
	}

	/// Documents of `module` in path order.
	fn module_documents<'a>(
		&'a self,
		module: &'a str,
	) -> impl Iterator<Item = (&'a PathBuf, &'a [Heading])> + 'a {
		self.documents
			.iter()
			.filter(move |(_, indexed)| indexed.module.as_deref() == Some(module))
			.map(|(path, indexed)| (path, indexed.headings.as_slice()))
	}
}

/// First pass over a document: scan it, resolve its module, weave sample,
/// include and link regions, and collect the headers of the result.
pub fn draft(document: Document, config: &EngineConfig, fs: &dyn FileSystem) -> WeaveResult<Draft> {
	debug!(path = %document.path.display(), "composing document");

	let regions = scan(&document)?;
	let mut warnings = Vec::new();
	let module = resolve_module(&document, &regions, config, &mut warnings)?;

	let literal_lines = regions
		.iter()
		.filter(|region| region.is_literal())
		.flat_map(|region| region.lines.clone())
		.map(|index| (index, document.lines[index].as_str()));
	let text_ids = collect_reference_ids(literal_lines);
	let link_regions: Vec<&Region> = regions
		.iter()
		.filter(|region| matches!(region.kind, RegionKind::LinkAnchor))
		.collect();
	let links = LinkResolver::new(&config.registry, module).weave(&document, &link_regions, &text_ids);
	for unresolved in &links.unresolved {
		warnings.push(DocumentWarning {
			line: Some(unresolved.line),
			message: format!("unresolved link target `{}`", unresolved.id),
		});
	}

	let weaver = Weaver::new(fs, config);
	let mut link_bodies = links.bodies.into_iter();
	let mut lines = Vec::with_capacity(document.lines.len());
	let mut toc_slots = Vec::new();
	let mut artifacts = Vec::new();

	for region in regions.iter() {
		let opening = region.lines.start;
		let closing = region.lines.end.saturating_sub(1);

		match &region.kind {
			RegionKind::Literal | RegionKind::ModuleAnchor { .. } => {
				lines.extend(document.lines[region.lines.clone()].iter().cloned());
			}
			RegionKind::Include(_) | RegionKind::SampleTest(_) => {
				let woven = weaver.weave(&document, region)?;
				lines.push(document.lines[opening].clone());
				lines.extend(woven.body);
				lines.push(document.lines[closing].clone());
				artifacts.extend(woven.artifact);
			}
			RegionKind::TocAnchor => {
				lines.push(document.lines[opening].clone());
				toc_slots.push(lines.len());
				lines.push(document.lines[closing].clone());
			}
			RegionKind::LinkAnchor => {
				lines.push(document.lines[opening].clone());
				lines.extend(link_bodies.next().unwrap_or_default());
				lines.push(document.lines[closing].clone());
			}
		}
	}

	let headings = collect_headings(&lines.join("\n"))?;

	Ok(Draft {
		module: module.map(|module| module.name.clone()),
		document,
		lines,
		toc_slots,
		headings,
		artifacts,
		warnings,
	})
}

/// The module a document belongs to: declared by a `MODULE` anchor, else the
/// first configured module claiming its path.
fn resolve_module<'a>(
	document: &Document,
	regions: &[Region],
	config: &'a EngineConfig,
	warnings: &mut Vec<DocumentWarning>,
) -> WeaveResult<Option<&'a Module>> {
	let mut declared: Option<(&str, usize)> = None;

	for region in regions {
		let RegionKind::ModuleAnchor { name } = &region.kind else {
			continue;
		};
		match declared {
			Some((first, _)) if first != name.as_str() => {
				return Err(WeaveError::ConflictingModule {
					file: document.display_path(),
					line: region.opening_line(),
					first: first.to_string(),
					second: name.clone(),
				});
			}
			Some(_) => {}
			None => declared = Some((name.as_str(), region.opening_line())),
		}
	}

	match declared {
		Some((name, line)) => {
			let module = config.registry.get(name);
			if module.is_none() {
				warnings.push(DocumentWarning {
					line: Some(line),
					message: format!("unknown module `{name}`"),
				});
			}
			Ok(module)
		}
		None => Ok(config.registry.module_for_path(&config.resolve(&document.path))),
	}
}

/// Second pass: fill in the tables of contents of a draft.
pub fn finish(draft: Draft, index: &HeaderIndex, config: &EngineConfig) -> ComposedDocument {
	let Draft {
		document,
		module,
		mut lines,
		toc_slots,
		headings,
		artifacts,
		mut warnings,
	} = draft;

	let module = module.filter(|_| config.toc.scope == TocScope::Module);
	let mut bodies = Vec::with_capacity(toc_slots.len());

	for &slot in &toc_slots {
		// `slot` is the 0-indexed closing line, so headers after the anchor
		// have a 1-indexed line greater than it.
		let own: Vec<Heading> = headings
			.iter()
			.filter(|heading| heading.line > slot)
			.cloned()
			.collect();

		let toc = match module.as_deref() {
			Some(module) => {
				let documents: Vec<(&PathBuf, String, &[Heading])> = index
					.module_documents(module)
					.map(|(path, headings)| (path, relative_link(&document.path, path), headings))
					.collect();
				let mut sources = Vec::with_capacity(documents.len() + 1);
				if !documents.iter().any(|(path, ..)| **path == document.path) {
					sources.push(TocSource {
						target: None,
						headings: &own,
					});
				}
				for (path, target, headings) in &documents {
					if **path == document.path {
						sources.push(TocSource {
							target: None,
							headings: &own,
						});
					} else {
						sources.push(TocSource {
							target: Some(target.as_str()),
							headings,
						});
					}
				}
				build_toc(&sources, &config.toc)
			}
			None => {
				build_toc(
					&[TocSource {
						target: None,
						headings: &own,
					}],
					&config.toc,
				)
			}
		};

		for slug in &toc.shared_slugs {
			warnings.push(DocumentWarning {
				line: None,
				message: format!("slug `{slug}` is used by more than one document of the module"),
			});
		}
		bodies.push(toc.lines);
	}

	for (slot, body) in toc_slots.into_iter().zip(bodies).rev() {
		lines.splice(slot..slot, body);
	}

	ComposedDocument {
		document,
		lines,
		artifacts,
		warnings,
	}
}

/// Link from the directory of `from` to `to`, with `/` separators.
fn relative_link(from: &Path, to: &Path) -> String {
	let base = from.parent().unwrap_or_else(|| Path::new(""));
	let relative = pathdiff::diff_paths(to, base).unwrap_or_else(|| to.to_path_buf());

	relative
		.components()
		.map(|component| component.as_os_str().to_string_lossy())
		.collect::<Vec<_>>()
		.join("/")
}

/// Compose a single document on its own. Module-scoped tables of contents
/// only see this document.
pub fn compose(
	document: Document,
	config: &EngineConfig,
	fs: &dyn FileSystem,
) -> WeaveResult<ComposedDocument> {
	let draft = draft(document, config, fs)?;
	let mut index = HeaderIndex::default();
	index.insert(&draft);

	Ok(finish(draft, &index, config))
}

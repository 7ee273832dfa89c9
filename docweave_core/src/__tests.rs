use std::path::PathBuf;

use miette::Diagnostic;
use rstest::rstest;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::__fixtures::*;
use super::*;
use crate::lexer::tokenize;
use crate::tokens::Token;

// --- Lexer ---

#[test]
fn tokenize_sample_directive() -> WeaveResult<()> {
	let group = tokenize(
		r#"<!--- SAMPLE src/lib.rs#BASIC lang=rust hide="// hidden" -->"#,
		4,
		"readme.md",
	)?;

	assert_eq!(group.line, 4);
	assert_eq!(group.keyword(), Some("SAMPLE"));
	assert_eq!(
		group.arguments(),
		&[
			Token::Word("src/lib.rs#BASIC".into()),
			Token::Word("lang".into()),
			Token::Equals,
			Token::Word("rust".into()),
			Token::Word("hide".into()),
			Token::Equals,
			Token::String("// hidden".into()),
		]
	);

	Ok(())
}

#[rstest]
#[case::missing_close("<!--- TOC")]
#[case::only_delimiters("<!---  -->")]
#[case::unterminated_string(r#"<!--- SAMPLE hide="open -->"#)]
fn tokenize_rejects_malformed_lines(#[case] line: &str) {
	let result = tokenize(line, 1, "readme.md");
	assert!(matches!(
		result,
		Err(WeaveError::MalformedDirective { line: 1, .. })
	));
}

// --- Marker scanner ---

#[test]
fn scan_partitions_document_into_regions() -> WeaveResult<()> {
	let document = guide(
		"# Title\n<!--- TOC -->\n<!--- END TOC -->\ntext\n<!--- SAMPLE src/lib.rs#A -->\nold\n<!--- \
		 END SAMPLE -->\n",
	);
	let regions = scan(&document)?;

	let spans: Vec<_> = regions.iter().map(|region| region.lines.clone()).collect();
	assert_eq!(spans, vec![0..1, 1..3, 3..4, 4..7]);
	assert!(regions[0].is_literal());
	assert_eq!(regions[1].kind, RegionKind::TocAnchor);
	assert!(matches!(regions[3].kind, RegionKind::SampleTest(_)));
	assert_eq!(regions[3].body(), 5..6);
	assert_eq!(regions.reconstruct(&document), document.lines);

	Ok(())
}

#[rstest]
#[case::empty("")]
#[case::plain("just text\n\nmore text")]
#[case::adjacent("<!--- TOC -->\n<!--- END TOC -->\n<!--- LINKS -->\n<!--- END LINKS -->")]
#[case::module("<!--- MODULE core -->\nbody\n<!--- END MODULE -->\ntail\n")]
#[case::fenced("```markdown\n<!--- TOC -->\n```\n<!--- TOC -->\n<!--- END TOC -->\n")]
#[case::crlf("a\r\n<!--- TOC -->\r\n<!--- END TOC -->\r\nb\r\n")]
fn scan_regions_reconstruct_the_document(#[case] content: &str) -> WeaveResult<()> {
	let document = guide(content);
	let regions = scan(&document)?;

	assert_eq!(regions.reconstruct(&document), document.lines);
	for pair in regions.windows(2) {
		assert_eq!(pair[0].lines.end, pair[1].lines.start);
	}

	Ok(())
}

#[test]
fn scan_ignores_directives_inside_fenced_code() -> WeaveResult<()> {
	let document = guide("~~~markdown\n<!--- TOC -->\n~~~\n````\n<!--- END TOC -->\n````\n");
	let regions = scan(&document)?;

	assert_eq!(regions.len(), 1);
	assert!(regions[0].is_literal());

	Ok(())
}

#[test]
fn scan_parses_sample_reference_options() -> WeaveResult<()> {
	let document = guide(
		"<!--- SAMPLE ../src/lib.rs#BASIC lang=rust hide=\"// hidden\" hide='#[allow' dedent \
		 emit=out/basic.rs -->\n<!--- END SAMPLE -->",
	);
	let regions = scan(&document)?;

	let RegionKind::SampleTest(reference) = &regions[0].kind else {
		panic!("expected a sample region, found {:?}", regions[0].kind);
	};
	assert_eq!(
		reference,
		&SampleReference {
			source: SampleSource::External {
				path: PathBuf::from("../src/lib.rs"),
				range: "BASIC".into(),
			},
			options: SampleOptions {
				lang: Some("rust".into()),
				hide: vec!["// hidden".into(), "#[allow".into()],
				dedent: true,
				emit: Some(PathBuf::from("out/basic.rs")),
			},
		}
	);

	Ok(())
}

#[rstest]
#[case::unmatched_opening("a\nb\n<!--- TOC -->\nc", "docweave::unmatched_directive", 3)]
#[case::unmatched_closing("a\n<!--- END TOC -->", "docweave::unmatched_closing", 2)]
#[case::nested(
	"<!--- TOC -->\n<!--- LINKS -->\n<!--- END LINKS -->\n<!--- END TOC -->",
	"docweave::nested_directive",
	2
)]
#[case::same_kind_nested(
	"<!--- SAMPLE a.rs#A -->\n<!--- SAMPLE a.rs#B -->",
	"docweave::nested_directive",
	2
)]
#[case::mismatched("<!--- TOC -->\n\n<!--- END LINKS -->", "docweave::mismatched_closing", 3)]
#[case::unknown_keyword("<!--- FOO -->", "docweave::unknown_directive", 1)]
#[case::unknown_option("<!--- TOC depth=2 -->\n<!--- END TOC -->", "docweave::unknown_option", 1)]
#[case::emit_on_include(
	"<!--- INCLUDE a.rs#A emit=a.rs -->\n<!--- END INCLUDE -->",
	"docweave::unknown_option",
	1
)]
#[case::include_without_reference(
	"x\n<!--- INCLUDE -->\n<!--- END INCLUDE -->",
	"docweave::malformed_directive",
	2
)]
#[case::module_without_name("<!--- MODULE -->\n<!--- END MODULE -->", "docweave::malformed_directive", 1)]
#[case::bad_reference("<!--- SAMPLE #A -->\n<!--- END SAMPLE -->", "docweave::malformed_directive", 1)]
#[case::end_without_kind("<!--- TOC -->\n<!--- END -->", "docweave::malformed_directive", 2)]
#[case::hide_without_reference(
	"<!--- SAMPLE hide=x -->\n<!--- END SAMPLE -->",
	"docweave::malformed_directive",
	1
)]
#[case::missing_terminator("<!--- TOC\n<!--- END TOC -->", "docweave::malformed_directive", 1)]
fn scan_reports_structural_errors(#[case] content: &str, #[case] code: &str, #[case] line: usize) {
	let Err(error) = scan(&guide(content)) else {
		panic!("expected `{code}`");
	};

	assert!(error.is_structural());
	assert_eq!(error.code().map(|c| c.to_string()).as_deref(), Some(code));
	assert_eq!(error.line(), Some(line));
	assert!(error.to_string().contains("guide.md"));
}

// --- Sample extraction ---

#[test]
fn extract_range_returns_lines_between_markers() -> WeaveResult<()> {
	let source = "fn main() {\n    // START-A\n    let a = 1;\n    let b = 2;\n    let c = 3;\n    // \
	              END-A\n}\n";
	let lines = extract_range(source, "A", "src/lib.rs")?;

	assert_eq!(
		lines,
		vec!["    let a = 1;", "    let b = 2;", "    let c = 3;"]
	);

	Ok(())
}

#[test]
fn extract_range_matches_whole_marker_tokens() -> WeaveResult<()> {
	let source = "# START-AB\nwrong\n# END-AB\n<!-- START-A -->\nright\n<!-- END-A -->\n";
	let lines = extract_range(source, "A", "notes.md")?;

	assert_eq!(lines, vec!["right"]);

	Ok(())
}

#[test]
fn extract_range_without_end_marker_names_the_file() {
	let source = "// START-A\nlet a = 1;\n";
	let error = extract_range(source, "A", "src/lib.rs").unwrap_err();

	assert!(matches!(
		&error,
		WeaveError::MissingRangeMarker { file, marker } if file == "src/lib.rs" && marker == "END-A"
	));
	assert!(error.is_structural());
	insta::assert_snapshot!(error.to_string(), @"marker `END-A` not found in `src/lib.rs`");
}

#[test]
fn extract_range_rejects_duplicate_markers() {
	let source = "// START-A\na\n// END-A\n// START-A\n";
	let error = extract_range(source, "A", "src/lib.rs").unwrap_err();

	assert!(matches!(
		error,
		WeaveError::DuplicateRangeMarker {
			first_line: 1,
			second_line: 4,
			..
		}
	));
}

#[test]
fn extract_range_rejects_inverted_markers() {
	let source = "// END-A\na\n// START-A\n";
	let error = extract_range(source, "A", "src/lib.rs").unwrap_err();

	assert!(matches!(error, WeaveError::InvertedRange { .. }));
}

#[test]
fn dedent_strips_common_indentation() {
	let lines = vec![
		"        if ok {".to_string(),
		String::new(),
		"            run();".to_string(),
		"        }".to_string(),
	];

	assert_eq!(dedent(&lines), vec!["if ok {", "", "    run();", "}"]);
}

#[test]
fn fence_grows_around_nested_fences() {
	let lines = vec!["```rust".to_string(), "let a = 1;".to_string(), "```".to_string()];
	let fenced = fence(Some("markdown"), &lines);

	assert_eq!(fenced.first().map(String::as_str), Some("````markdown"));
	assert_eq!(fenced.last().map(String::as_str), Some("````"));
}

#[rstest]
#[case("src/lib.rs", Some("rust"))]
#[case("App.kt", Some("kotlin"))]
#[case("script.py", Some("python"))]
#[case("index.tsx", Some("typescript"))]
#[case("Cargo.toml", Some("toml"))]
#[case("install.sh", Some("bash"))]
#[case("notes.txt", None)]
#[case("Makefile", None)]
fn language_is_derived_from_extension(#[case] path: &str, #[case] expected: Option<&str>) {
	assert_eq!(language_for_path(std::path::Path::new(path)), expected);
}

// --- Weaving ---

#[test]
fn include_region_is_replaced_with_source_lines() -> WeaveResult<()> {
	let config = engine_config();
	let fs = memory_fs(&[(
		"docs/src/lib.rs",
		"fn main() {\n    // START-A\n    let a = 1;\n    let b = 2;\n    let c = 3;\n    // \
		 END-A\n}\n",
	)]);
	let document = guide("<!--- INCLUDE src/lib.rs#A -->\nstale\n<!--- END INCLUDE -->\n");

	let composed = compose(document, &config, &fs)?;
	assert_eq!(
		composed.lines,
		vec![
			"<!--- INCLUDE src/lib.rs#A -->",
			"    let a = 1;",
			"    let b = 2;",
			"    let c = 3;",
			"<!--- END INCLUDE -->",
		]
	);

	let windows = config.with_line_separator(LineSeparator::Windows);
	let document = guide("<!--- INCLUDE src/lib.rs#A lang=rust dedent -->\n<!--- END INCLUDE -->\n");
	let composed = compose(document, &windows, &fs)?;
	assert_eq!(
		composed.content(LineSeparator::Windows),
		"<!--- INCLUDE src/lib.rs#A lang=rust dedent -->\r\n```rust\r\nlet a = 1;\r\nlet b = \
		 2;\r\nlet c = 3;\r\n```\r\n<!--- END INCLUDE -->\r\n"
	);

	Ok(())
}

#[test]
fn missing_source_file_is_a_structural_error() {
	let config = engine_config();
	let fs = memory_fs(&[]);
	let document = guide("intro\n<!--- INCLUDE missing.rs#A -->\n<!--- END INCLUDE -->\n");

	let error = compose(document, &config, &fs).unwrap_err();
	assert!(matches!(
		&error,
		WeaveError::MissingSourceFile { line: 2, source_file, .. } if source_file.ends_with("missing.rs")
	));
	assert!(error.is_structural());
}

#[test]
fn sample_with_source_produces_fenced_block_and_artifact() -> WeaveResult<()> {
	let (config, fs) = guide_project();
	let document = Document::load(&fs, &path("docs/guide.md"))?;

	let composed = compose(document, &config, &fs)?;
	assert_eq!(composed.content(LineSeparator::Unix), GUIDE_COMPOSED);
	assert_eq!(composed.artifacts.len(), 1);

	let artifact = &composed.artifacts[0];
	assert_eq!(artifact.path, path("samples/basic.rs"));
	assert_eq!(artifact.document, path("docs/guide.md"));
	assert_eq!(
		join_lines(&artifact.lines, LineSeparator::Unix, true),
		BASIC_EMITTED
	);

	Ok(())
}

#[test]
fn hidden_lines_stay_in_the_emitted_file() -> WeaveResult<()> {
	let config = engine_config();
	let fs = memory_fs(&[(
		"docs/demo.rs",
		"// START-H\nuse std::fmt; // hidden\nlet x = 1;\n// END-H\n",
	)]);
	let document = guide(
		"<!--- SAMPLE demo.rs#H hide=\"// hidden\" emit=h.rs -->\n<!--- END SAMPLE -->\n",
	);

	let composed = compose(document, &config, &fs)?;
	assert_eq!(
		composed.lines,
		vec![
			"<!--- SAMPLE demo.rs#H hide=\"// hidden\" emit=h.rs -->",
			"```rust",
			"let x = 1;",
			"```",
			"<!--- END SAMPLE -->",
		]
	);
	assert_eq!(
		composed.artifacts[0].lines,
		vec![
			"// This file was automatically generated from guide.md. Do not edit.",
			"fn main() {",
			"    use std::fmt; // hidden",
			"    let x = 1;",
			"}",
		]
	);

	Ok(())
}

#[test]
fn inline_sample_keeps_its_fenced_block() -> WeaveResult<()> {
	let config = engine_config();
	let fs = memory_fs(&[]);
	let document = guide(
		"<!--- SAMPLE emit=out/inline.rs -->\nSome dropped text.\n```rust   \nfn main() {}   \n```\n<!--- \
		 END SAMPLE -->\n",
	);

	let composed = compose(document, &config, &fs)?;
	assert_eq!(
		composed.lines,
		vec![
			"<!--- SAMPLE emit=out/inline.rs -->",
			"```rust",
			"fn main() {}",
			"```",
			"<!--- END SAMPLE -->",
		]
	);

	// The body already declares `main`, so it is not wrapped.
	let artifact = &composed.artifacts[0];
	assert_eq!(artifact.path, path("docs/out/inline.rs"));
	assert_eq!(
		artifact.lines,
		vec![
			"// This file was automatically generated from ../guide.md. Do not edit.",
			"fn main() {}",
		]
	);

	Ok(())
}

#[test]
fn inline_sample_without_fence_is_an_error() {
	let config = engine_config();
	let fs = memory_fs(&[]);
	let document = guide("\n<!--- SAMPLE -->\nno code here\n<!--- END SAMPLE -->\n");

	let error = compose(document, &config, &fs).unwrap_err();
	assert!(matches!(error, WeaveError::MissingFence { line: 2, .. }));
}

#[test]
fn wrapper_templates_receive_source_name_and_lang() -> WeaveResult<()> {
	let wrapper = SampleWrapper {
		header: Some("# {{ name }} ({{ lang }}) from {{ source }}".into()),
		prefix: Some("def main():".into()),
		suffix: Some("main()".into()),
		indent: "    ".into(),
		unless_contains: None,
	};
	let code = vec!["print('hi')".to_string(), String::new()];

	let lines = wrap_sample(&wrapper, &code, "../guide.md", "basic", "python")?;
	assert_eq!(
		lines,
		vec![
			"# basic (python) from ../guide.md",
			"def main():",
			"    print('hi')",
			"",
			"main()",
		]
	);

	Ok(())
}

#[test]
fn wrapper_template_errors_are_reported() {
	let wrapper = SampleWrapper {
		header: Some("{{ missing }}".into()),
		..SampleWrapper::default()
	};

	let result = wrap_sample(&wrapper, &[], "a.md", "a", "rust");
	assert!(matches!(result, Err(WeaveError::TemplateRender(_))));
}

// --- Table of contents ---

#[rstest]
#[case("Getting Started", "getting-started")]
#[case("Hello, World!", "hello-world")]
#[case("snake_case-name", "snake_case-name")]
#[case("  Trim me  ", "trim-me")]
#[case("C++ & Rust", "c--rust")]
#[case("Ünïcödé", "ünïcödé")]
fn slugify_follows_github_rules(#[case] text: &str, #[case] expected: &str) {
	assert_eq!(slugify(text), expected);
}

#[test]
fn slugger_disambiguates_in_order_of_occurrence() {
	let mut slugger = Slugger::default();
	let slugs: Vec<String> = ["a", "a", "a-1", "a"]
		.iter()
		.map(|text| slugger.slug(text))
		.collect();

	assert_eq!(slugs, vec!["a", "a-1", "a-1-1", "a-2"]);
}

#[test]
fn collect_headings_skips_fenced_code() -> WeaveResult<()> {
	let headings = collect_headings("Setext Title\n------------\n\n```md\n## not a header\n```\n\n## `code` Heading\n")?;

	let summary: Vec<(u8, &str, &str, usize)> = headings
		.iter()
		.map(|heading| (heading.depth, heading.text.as_str(), heading.slug.as_str(), heading.line))
		.collect();
	assert_eq!(
		summary,
		vec![
			(2, "Setext Title", "setext-title", 1),
			(2, "code Heading", "code-heading", 8),
		]
	);

	Ok(())
}

#[test]
fn toc_lists_headers_after_the_anchor_within_depth_range() -> WeaveResult<()> {
	let config = engine_config().with_toc(TocOptions {
		min_depth: 2,
		max_depth: 3,
		..TocOptions::default()
	});
	let fs = memory_fs(&[]);
	let document = guide(
		"# Title\n## Before\n<!--- TOC -->\nstale entry\n<!--- END TOC -->\n## A\n### B\n#### C\n## \
		 [Linked] text\n",
	);

	let composed = compose(document, &config, &fs)?;
	assert_eq!(
		composed.lines[2..8].to_vec(),
		vec![
			"<!--- TOC -->",
			"* [A](#a)",
			"  * [B](#b)",
			"* [\\[Linked\\] text](#linked-text)",
			"<!--- END TOC -->",
			"## A",
		]
	);

	Ok(())
}

#[test]
fn toc_without_headers_is_empty() -> WeaveResult<()> {
	let config = engine_config();
	let fs = memory_fs(&[]);
	let document = guide("<!--- TOC -->\n* [Gone](#gone)\n<!--- END TOC -->\n");

	let composed = compose(document, &config, &fs)?;
	assert_eq!(composed.lines, vec!["<!--- TOC -->", "<!--- END TOC -->"]);

	Ok(())
}

#[test]
fn identical_headers_produce_identical_tocs() -> WeaveResult<()> {
	let config = engine_config();
	let fs = memory_fs(&[]);
	let content = "<!--- TOC -->\n<!--- END TOC -->\n## Usage\n## Usage\n## Hello, World!\n";

	let first = compose(Document::from_content(path("a/one.md"), content), &config, &fs)?;
	let second = compose(Document::from_content(path("b/two.md"), content), &config, &fs)?;

	assert_eq!(first.lines, second.lines);
	assert_eq!(
		first.lines[1..4].to_vec(),
		vec![
			"* [Usage](#usage)",
			"* [Usage](#usage-1)",
			"* [Hello, World!](#hello-world)",
		]
	);

	Ok(())
}

#[traced_test]
#[test]
fn module_scoped_toc_links_other_documents() {
	let config = engine_config()
		.with_registry(
			ModuleRegistry::new(vec![Module::new("guide", path("docs"))])
				.unwrap_or_else(|e| panic!("registry: {e}")),
		)
		.with_toc(TocOptions {
			scope: TocScope::Module,
			..TocOptions::default()
		});
	let fs = memory_fs(&[
		("docs/a.md", "<!--- TOC -->\n<!--- END TOC -->\n## Alpha\n## Shared\n"),
		("docs/b.md", "## Beta\n## Shared\n"),
	]);

	let outcome = run(
		&config,
		&[path("docs/a.md"), path("docs/b.md")],
		&fs,
		RunMode::Write,
	);

	assert!(outcome.is_success(), "{:?}", outcome.log);
	assert_eq!(
		fs.get(path("docs/a.md")).as_deref(),
		Some(
			"<!--- TOC -->\n* [Alpha](#alpha)\n* [Shared](#shared)\n* [Beta](b.md#beta)\n* \
			 [Shared](b.md#shared)\n<!--- END TOC -->\n## Alpha\n## Shared\n"
		)
	);
	assert_eq!(outcome.log.warning_count, 1);
	assert!(logs_contain("slug `shared` is used by more than one document"));
}

// --- Link resolution ---

#[test]
fn links_resolve_through_the_module_registry() -> WeaveResult<()> {
	let config = engine_config().with_registry(core_registry());
	let fs = memory_fs(&[]);
	let document = guide(
		"<!--- LINKS -->\n[core/Widget]: https://old.example\n\nnot a definition\n[unknown/Thing]: \
		 https://example.invalid/Thing\n<!--- END LINKS -->\n",
	);

	let composed = compose(document, &config, &fs)?;
	assert_eq!(
		composed.lines,
		vec![
			"<!--- LINKS -->",
			"[core/Widget]: https://docs.example/core/Widget",
			"[unknown/Thing]: https://example.invalid/Thing",
			"<!--- END LINKS -->",
		]
	);
	assert_eq!(
		composed.warnings,
		vec![DocumentWarning {
			line: Some(5),
			message: "unresolved link target `unknown/Thing`".into(),
		}]
	);

	Ok(())
}

#[test]
fn documents_outside_every_module_resolve_no_links() -> WeaveResult<()> {
	let config = engine_config().with_registry(core_registry());
	let fs = memory_fs(&[]);
	let document = Document::from_content(
		path("notes/todo.md"),
		"<!--- LINKS -->\n[core/Widget]: https://old.example\n<!--- END LINKS -->\n",
	);

	let composed = compose(document, &config, &fs)?;
	assert_eq!(composed.lines[1], "[core/Widget]: https://old.example");
	assert_eq!(
		composed.warnings,
		vec![DocumentWarning {
			line: Some(2),
			message: "unresolved link target `core/Widget`".into(),
		}]
	);

	Ok(())
}

#[test]
fn bare_link_ids_resolve_against_the_document_module() -> WeaveResult<()> {
	let config = engine_config().with_registry(core_registry());
	let fs = memory_fs(&[]);
	let document = Document::from_content(
		path("lib/core/readme.md"),
		"See [the widget][Widget] and [gadgets][unknown/Gadget].\n\n```md\n[x][NotALink]\n```\n\n<!--- \
		 LINKS -->\n<!--- END LINKS -->\n",
	);

	let composed = compose(document, &config, &fs)?;
	assert_eq!(
		composed.lines[6..].to_vec(),
		vec![
			"<!--- LINKS -->",
			"[Widget]: https://docs.example/core/Widget",
			"<!--- END LINKS -->",
		]
	);
	assert_eq!(
		composed.warnings,
		vec![DocumentWarning {
			line: Some(1),
			message: "unresolved link target `unknown/Gadget`".into(),
		}]
	);

	Ok(())
}

#[test]
fn module_anchor_overrides_path_attribution() -> WeaveResult<()> {
	let config = engine_config().with_registry(core_registry());
	let fs = memory_fs(&[]);
	let document = guide(
		"<!--- MODULE core -->\n<!--- END MODULE -->\n[a][Widget]\n<!--- LINKS -->\n<!--- END LINKS -->\n",
	);

	let composed = compose(document, &config, &fs)?;
	assert_eq!(composed.lines[4], "[Widget]: https://docs.example/core/Widget");

	Ok(())
}

#[test]
fn unknown_module_anchor_is_a_warning() -> WeaveResult<()> {
	let config = engine_config().with_registry(core_registry());
	let fs = memory_fs(&[]);
	let document = guide("<!--- MODULE nope -->\n<!--- END MODULE -->\n");

	let composed = compose(document, &config, &fs)?;
	assert_eq!(composed.warnings[0].message, "unknown module `nope`");
	assert_eq!(composed.warnings[0].line, Some(1));

	Ok(())
}

#[test]
fn conflicting_module_anchors_are_an_error() {
	let config = engine_config().with_registry(core_registry());
	let fs = memory_fs(&[]);
	let document = guide(
		"<!--- MODULE core -->\n<!--- END MODULE -->\n<!--- MODULE other -->\n<!--- END MODULE -->\n",
	);

	let error = compose(document, &config, &fs).unwrap_err();
	assert!(matches!(
		error,
		WeaveError::ConflictingModule { line: 3, .. }
	));
}

#[test]
fn parse_definition_extracts_id_and_url() {
	assert_eq!(
		parse_definition("  [core/Widget]: https://docs.example/core/Widget "),
		Some(("core/Widget", "https://docs.example/core/Widget"))
	);
	assert_eq!(parse_definition("[text](https://example.com)"), None);
	assert_eq!(parse_definition("[]: empty"), None);
}

// --- Module registry ---

#[test]
fn first_configured_module_claims_a_file() -> WeaveResult<()> {
	let registry = ModuleRegistry::new(vec![
		Module::new("all", path("")),
		Module::new("core", path("lib/core")),
	])?;

	let module = registry.module_for_path(&path("lib/core/readme.md"));
	assert_eq!(module.map(|module| module.name.as_str()), Some("all"));

	Ok(())
}

#[test]
fn module_patterns_restrict_membership() -> WeaveResult<()> {
	let module = Module::new("core", path("lib/core")).with_patterns(&["**/*.md".to_string()])?;

	assert!(module.contains(&path("lib/core/docs/readme.md")));
	assert!(!module.contains(&path("lib/core/src/lib.rs")));
	assert!(!module.contains(&path("lib/other/readme.md")));

	Ok(())
}

#[test]
fn module_url_joins_docs_root_and_path() {
	let module = Module::new("core", path("lib/core")).with_docs_url("https://docs.example/core/");

	assert_eq!(
		module.url_for("Widget").as_deref(),
		Some("https://docs.example/core/Widget")
	);
	assert_eq!(Module::new("bare", path("bare")).url_for("Widget"), None);
}

#[test]
fn duplicate_module_names_are_rejected() {
	let result = ModuleRegistry::new(vec![
		Module::new("core", path("a")),
		Module::new("core", path("b")),
	]);

	assert!(matches!(result, Err(WeaveError::DuplicateModule(name)) if name == "core"));
}

// --- Configuration ---

#[rstest]
#[case("unix", LineSeparator::Unix)]
#[case("lf", LineSeparator::Unix)]
#[case("\n", LineSeparator::Unix)]
#[case("windows", LineSeparator::Windows)]
#[case("crlf", LineSeparator::Windows)]
#[case("\r\n", LineSeparator::Windows)]
fn line_separator_parses_known_values(
	#[case] value: &str,
	#[case] expected: LineSeparator,
) -> WeaveResult<()> {
	assert_eq!(LineSeparator::parse(value)?, expected);

	Ok(())
}

#[rstest]
#[case("mac")]
#[case("\r")]
#[case("")]
fn line_separator_rejects_other_values(#[case] value: &str) {
	let error = LineSeparator::parse(value).unwrap_err();

	assert!(matches!(error, WeaveError::InvalidLineSeparator(_)));
	assert!(error.is_configuration());
}

#[test]
fn engine_config_from_toml() -> WeaveResult<()> {
	let raw = DocweaveConfig::from_toml(
		r#"
line_separator = "windows"

[[modules]]
root = "lib/core"
docs_url = "https://docs.example/core"

[[modules]]
name = "extras"
root = "lib/extras"
patterns = ["**/*.md"]

[toc]
min_depth = 1
max_depth = 3
scope = "module"

[samples.wrappers.python]
prefix = "def main():"
suffix = "main()"
indent = "    "
"#,
	)?;
	let config = EngineConfig::from_config(std::path::Path::new(ROOT), &raw)?;

	assert_eq!(config.line_separator, LineSeparator::Windows);
	let names: Vec<&str> = config
		.registry
		.modules()
		.iter()
		.map(|module| module.name.as_str())
		.collect();
	assert_eq!(names, vec!["core", "extras"]);
	assert_eq!(
		config.toc,
		TocOptions {
			min_depth: 1,
			max_depth: 3,
			scope: TocScope::Module,
		}
	);
	assert!(config.wrappers.contains_key("rust"));
	assert_eq!(
		config.wrappers.get("python").and_then(|w| w.prefix.as_deref()),
		Some("def main():")
	);

	Ok(())
}

#[rstest]
#[case::separator("line_separator = \"mac\"")]
#[case::toc_depth("[toc]\nmin_depth = 4\nmax_depth = 2")]
#[case::toc_zero("[toc]\nmin_depth = 0")]
#[case::duplicate_module("[[modules]]\nroot = \"a/core\"\n[[modules]]\nroot = \"b/core\"")]
#[case::bad_pattern("[[modules]]\nroot = \"core\"\npatterns = [\"[\"]")]
fn invalid_configuration_is_rejected_before_processing(#[case] toml: &str) -> WeaveResult<()> {
	let raw = DocweaveConfig::from_toml(toml)?;
	let error = EngineConfig::from_config(std::path::Path::new(ROOT), &raw).unwrap_err();

	assert!(error.is_configuration(), "{error:?}");

	Ok(())
}

// --- Documents ---

#[rstest]
#[case("", vec![], false)]
#[case("a", vec!["a"], false)]
#[case("a\n", vec!["a"], true)]
#[case("a\r\nb\r\n", vec!["a", "b"], true)]
#[case("a\n\nb", vec!["a", "", "b"], false)]
fn split_lines_drops_terminators(
	#[case] content: &str,
	#[case] lines: Vec<&str>,
	#[case] trailing: bool,
) {
	let (actual, actual_trailing) = split_lines(content);

	assert_eq!(actual, lines);
	assert_eq!(actual_trailing, trailing);
}

#[test]
fn document_detects_separator_and_trailing_newline() {
	let document = guide("a\r\nb");

	assert_eq!(document.separator, LineSeparator::Windows);
	assert!(!document.trailing_newline);
	assert_eq!(document.join(&document.lines, LineSeparator::Unix), "a\nb");
}

#[test]
fn normalize_path_resolves_parent_components() {
	assert_eq!(
		normalize_path(std::path::Path::new("/project/docs/../src/./lib.rs")),
		PathBuf::from("/project/src/lib.rs")
	);
}

// --- Run controller ---

#[test]
fn write_mode_reaches_a_fixed_point() {
	let (config, fs) = guide_project();
	let documents = [path("docs/guide.md")];

	let first = run(&config, &documents, &fs, RunMode::Write);
	assert!(first.is_success(), "{:?}", first.log);
	assert_eq!(
		first.log.written,
		vec![path("docs/guide.md"), path("samples/basic.rs")]
	);
	assert_eq!(fs.get(path("docs/guide.md")).as_deref(), Some(GUIDE_COMPOSED));
	assert_eq!(fs.get(path("samples/basic.rs")).as_deref(), Some(BASIC_EMITTED));

	let writes = fs.write_count();
	let second = run(&config, &documents, &fs, RunMode::Write);
	assert!(second.is_success());
	assert!(second.log.written.is_empty());
	assert_eq!(second.log.outdated_count(), 0);
	assert_eq!(fs.write_count(), writes);

	let check = run(&config, &documents, &fs, RunMode::Check);
	assert!(check.is_success());
	assert!(!check.log.has_warning_or_error());
	assert_eq!(check.summary(), "1 document(s) are up to date");
}

#[test]
fn check_mode_reports_outdated_artifacts_without_writing() {
	let (config, fs) = guide_project();
	let before = fs.snapshot();

	let outcome = run(&config, &[path("docs/guide.md")], &fs, RunMode::Check);

	assert!(!outcome.is_success());
	assert_eq!(outcome.log.outdated_count(), 2);
	assert_eq!(outcome.log.warning_count, 2);
	assert_eq!(outcome.log.error_count, 0);
	assert!(outcome.log.outdated[1].current.is_none());
	assert!(outcome.log.outdated[1].is_derived());
	assert_eq!(
		outcome.summary(),
		"2 artifact(s) are out of date. Run `docweave update` to regenerate them."
	);
	assert_eq!(fs.write_count(), 0);
	assert_eq!(fs.snapshot(), before);
}

#[test]
fn check_mode_never_writes_even_with_errors() {
	let config = engine_config();
	let fs = memory_fs(&[
		("a.md", "<!--- TOC -->\n## Unclosed\n"),
		("b.md", "<!--- TOC -->\n<!--- END TOC -->\n## Stale\n"),
		("c.md", "<!--- INCLUDE missing.rs#A -->\n<!--- END INCLUDE -->\n"),
	]);
	let before = fs.snapshot();

	let outcome = run(
		&config,
		&[path("a.md"), path("b.md"), path("c.md"), path("missing.md")],
		&fs,
		RunMode::Check,
	);

	assert!(!outcome.is_success());
	assert_eq!(outcome.log.error_count, 3);
	assert_eq!(outcome.log.outdated_count(), 1);
	assert_eq!(
		outcome.summary(),
		"3 error(s) and 1 warning(s) in 4 document(s); 1 artifact(s) are out of date. Run \
		 `docweave update` to regenerate them."
	);
	assert_eq!(fs.write_count(), 0);
	assert_eq!(fs.snapshot(), before);
}

#[test]
fn unmatched_directive_only_affects_its_document() {
	let config = engine_config();
	let broken = "# Broken\n\n<!--- TOC -->\n## Heading\n";
	let fs = memory_fs(&[
		("broken.md", broken),
		("fine.md", "<!--- TOC -->\n<!--- END TOC -->\n## Heading\n"),
	]);

	let outcome = run(&config, &[path("fine.md"), path("broken.md")], &fs, RunMode::Write);

	let errors: Vec<&LogEntry> = outcome.log.errors().collect();
	assert_eq!(errors.len(), 1);
	assert_eq!(errors[0].file, path("broken.md"));
	assert_eq!(errors[0].line, Some(3));
	assert_eq!(errors[0].code.as_deref(), Some("docweave::unmatched_directive"));
	assert_eq!(fs.get(path("broken.md")).as_deref(), Some(broken));
	assert_eq!(
		fs.get(path("fine.md")).as_deref(),
		Some("<!--- TOC -->\n* [Heading](#heading)\n<!--- END TOC -->\n## Heading\n")
	);
	assert!(!outcome.is_success());
}

#[test]
fn missing_range_end_fails_the_run_and_names_the_source() {
	let config = engine_config();
	let fs = memory_fs(&[
		("src/lib.rs", "// START-A\nlet a = 1;\n"),
		("readme.md", "<!--- INCLUDE src/lib.rs#A -->\n<!--- END INCLUDE -->\n"),
	]);

	let outcome = run(&config, &[path("readme.md")], &fs, RunMode::Write);

	assert!(!outcome.is_success());
	let errors: Vec<&LogEntry> = outcome.log.errors().collect();
	assert_eq!(errors.len(), 1);
	assert!(errors[0].message.contains("src/lib.rs"));
	assert!(errors[0].message.contains("END-A"));
	assert_eq!(fs.write_count(), 0);
}

#[traced_test]
#[test]
fn unresolved_links_are_logged_warnings() {
	let config = engine_config().with_registry(core_registry());
	let content = "<!--- LINKS -->\n[unknown/Thing]: https://example.invalid\n<!--- END LINKS -->\n";
	let fs = memory_fs(&[("api.md", content)]);

	let outcome = run(&config, &[path("api.md")], &fs, RunMode::Check);

	assert!(outcome.is_success());
	assert_eq!(outcome.log.warning_count, 1);
	let warning = &outcome.log.entries[0];
	assert_eq!(warning.severity, Severity::Warning);
	assert_eq!(warning.file, path("api.md"));
	assert_eq!(warning.line, Some(2));
	assert!(logs_contain("unresolved link target `unknown/Thing`"));
	assert_eq!(fs.get(path("api.md")).as_deref(), Some(content));
}

#[test]
fn dot_prefixed_root_keeps_module_attribution() -> WeaveResult<()> {
	let raw = DocweaveConfig::from_toml(
		"[[modules]]\nname = \"core\"\nroot = \"lib/core\"\ndocs_url = \"https://docs.example/core\"\n",
	)?;
	let config = EngineConfig::from_config(std::path::Path::new("./proj"), &raw)?;
	let fs = MemoryFileSystem::new();
	fs.insert(
		"proj/lib/core/readme.md",
		"See [the widget][Widget].\n\n<!--- LINKS -->\n<!--- END LINKS -->\n",
	);

	let documents = [PathBuf::from("./proj/lib/core/readme.md")];
	let outcome = run(&config, &documents, &fs, RunMode::Write);

	assert!(outcome.is_success(), "{:?}", outcome.log);
	assert_eq!(outcome.log.warning_count, 0);
	assert_eq!(
		fs.get("proj/lib/core/readme.md").as_deref(),
		Some(
			"See [the widget][Widget].\n\n<!--- LINKS -->\n[Widget]: \
			 https://docs.example/core/Widget\n<!--- END LINKS -->\n"
		)
	);

	Ok(())
}

#[test]
fn configured_separator_is_applied_to_written_files() {
	let config = engine_config().with_line_separator(LineSeparator::Windows);
	let fs = memory_fs(&[("readme.md", "# Title\n\ntext\n")]);

	let check = run(&config, &[path("readme.md")], &fs, RunMode::Check);
	assert_eq!(check.log.outdated_count(), 1);

	let write = run(&config, &[path("readme.md")], &fs, RunMode::Write);
	assert!(write.is_success());
	assert_eq!(
		fs.get(path("readme.md")).as_deref(),
		Some("# Title\r\n\r\ntext\r\n")
	);

	let again = run(&config, &[path("readme.md")], &fs, RunMode::Check);
	assert!(again.is_success());
}

#[test]
fn conflicting_emit_paths_are_errors() {
	let config = engine_config();
	let sample = "<!--- SAMPLE lang=rust emit=shared.rs -->\n```rust\nfn main() {}\n```\n<!--- END SAMPLE -->\n";
	let fs = memory_fs(&[("a.md", sample), ("b.md", sample)]);

	let outcome = run(&config, &[path("a.md"), path("b.md")], &fs, RunMode::Write);

	let errors: Vec<&LogEntry> = outcome.log.errors().collect();
	assert_eq!(errors.len(), 1);
	assert_eq!(errors[0].file, path("b.md"));
	assert_eq!(errors[0].code.as_deref(), Some("docweave::artifact_conflict"));
	assert_eq!(outcome.log.written, vec![path("shared.rs")]);
}

#[test]
fn emitting_over_a_document_is_an_error() {
	let config = engine_config();
	let fs = memory_fs(&[(
		"a.md",
		"<!--- SAMPLE emit=a.md -->\n```\ntext\n```\n<!--- END SAMPLE -->\n",
	)]);

	let outcome = run(&config, &[path("a.md")], &fs, RunMode::Write);

	assert_eq!(outcome.log.error_count, 1);
	assert_eq!(fs.write_count(), 0);
}

#[test]
fn run_log_serializes_for_reporting() -> AnyEmptyResult {
	let config = engine_config();
	let fs = memory_fs(&[("a.md", "<!--- END TOC -->\n")]);

	let outcome = run(&config, &[path("a.md")], &fs, RunMode::Check);
	let json = serde_json::to_value(&outcome)?;

	assert_eq!(json["mode"], "check");
	assert_eq!(json["log"]["error_count"], 1);
	assert_eq!(json["log"]["entries"][0]["severity"], "error");
	assert_eq!(json["log"]["entries"][0]["line"], 1);
	assert_eq!(
		json["log"]["entries"][0]["code"],
		"docweave::unmatched_closing"
	);

	Ok(())
}

// --- Project and discovery ---

#[test]
fn discover_documents_skips_ignored_paths() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	for dir in ["docs", "target", "node_modules", ".hidden", "ignored", "vendor"] {
		std::fs::create_dir_all(root.join(dir))?;
	}
	for file in [
		"readme.md",
		"docs/guide.md",
		"docs/notes.txt",
		"target/out.md",
		"node_modules/dep.md",
		".hidden/secret.md",
		"ignored/skip.md",
		"vendor/third.md",
	] {
		std::fs::write(root.join(file), "# Title\n")?;
	}
	std::fs::write(root.join(".gitignore"), "ignored/\n")?;

	let options = DiscoveryOptions {
		exclude_patterns: vec!["vendor/".into()],
		..DiscoveryOptions::default()
	};
	let documents = discover_documents(root, &options)?;
	assert_eq!(
		documents,
		vec![root.join("docs/guide.md"), root.join("readme.md")]
	);

	let raw = DocweaveConfig::from_toml("disable_gitignore = true\n[include]\npatterns = [\"**/*.txt\"]")?;
	let options = DiscoveryOptions::from_config(Some(&raw))?;
	let documents = discover_documents(root, &options)?;
	assert_eq!(
		documents,
		vec![
			root.join("docs/guide.md"),
			root.join("docs/notes.txt"),
			root.join("ignored/skip.md"),
			root.join("readme.md"),
			root.join("vendor/third.md"),
		]
	);

	Ok(())
}

#[test]
fn update_project_writes_to_disk_and_check_passes() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	std::fs::create_dir_all(root.join("docs"))?;
	std::fs::create_dir_all(root.join("src"))?;
	std::fs::write(root.join("docs/guide.md"), GUIDE)?;
	std::fs::write(root.join("src/lib.rs"), BASIC_SOURCE)?;
	std::fs::write(
		root.join("docweave.toml"),
		"[[modules]]\nname = \"core\"\nroot = \"lib/core\"\ndocs_url = \"https://docs.example/core\"\n\n[[modules]]\nroot = \"docs\"\n",
	)?;

	let outcome = check_project(root)?;
	assert!(!outcome.is_success());

	let outcome = update_project(root)?;
	assert!(outcome.is_success(), "{:?}", outcome.log);
	assert_eq!(std::fs::read_to_string(root.join("docs/guide.md"))?, GUIDE_COMPOSED);
	assert_eq!(
		std::fs::read_to_string(root.join("samples/basic.rs"))?,
		BASIC_EMITTED
	);

	let outcome = check_project(root)?;
	assert!(outcome.is_success(), "{:?}", outcome.log);

	Ok(())
}

#[test]
fn project_with_invalid_config_fails_before_processing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("docweave.toml"), "line_separator = \"mac\"\n")?;
	std::fs::write(tmp.path().join("readme.md"), "<!--- TOC -->\n")?;

	let error = ProjectContext::load(tmp.path()).unwrap_err();
	assert!(error.is_configuration());

	Ok(())
}

#[test]
fn project_config_is_found_in_dot_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join(".config"))?;
	std::fs::write(
		tmp.path().join(".config/docweave.toml"),
		"line_separator = \"windows\"\n",
	)?;

	let context = ProjectContext::load(tmp.path())?;
	assert_eq!(context.config.line_separator, LineSeparator::Windows);
	assert_eq!(
		context.config_path,
		Some(tmp.path().join(".config/docweave.toml"))
	);

	Ok(())
}

#[test]
fn disk_file_system_creates_parent_directories() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let target = tmp.path().join("a/b/c.rs");

	DiskFileSystem.write(&target, "fn main() {}\n")?;

	assert_eq!(std::fs::read_to_string(&target)?, "fn main() {}\n");
	assert_eq!(DiskFileSystem.read_optional(&tmp.path().join("nope.rs"))?, None);
	assert_eq!(std::fs::read_dir(tmp.path().join("a/b"))?.count(), 1);

	Ok(())
}

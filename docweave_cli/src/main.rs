use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use docweave_cli::Commands;
use docweave_cli::DocweaveCli;
use docweave_cli::OutputFormat;
use docweave_core::DiskFileSystem;
use docweave_core::Document;
use docweave_core::LogEntry;
use docweave_core::OutdatedArtifact;
use docweave_core::ProjectContext;
use docweave_core::RegionKind;
use docweave_core::RunMode;
use docweave_core::RunOutcome;
use docweave_core::SampleReference;
use docweave_core::SampleSource;
use docweave_core::Severity;
use docweave_core::WeaveError;
use docweave_core::scan;
use owo_colors::OwoColorize;
use serde::Serialize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
	let args = DocweaveCli::parse();

	// Respect NO_COLOR, --no-color and terminals without color support.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stderr).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Check {
			diff,
			format,
			watch,
		}) => run_check(&args, *diff, *format, *watch),
		Some(Commands::Update { dry_run, watch }) => run_update(&args, *dry_run, *watch),
		Some(Commands::List) => run_list(&args),
		None => {
			eprintln!("No subcommand specified. Run `docweave --help` for usage.");
			process::exit(2);
		}
	};

	if let Err(e) = result {
		match e.downcast::<WeaveError>() {
			Ok(error) => {
				let report: miette::Report = (*error).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Engine logs go to stderr. `DOCWEAVE_LOG` takes an `EnvFilter` directive;
/// without it logging is off unless `--verbose` is passed.
fn init_tracing(verbose: bool, use_color: bool) {
	let fallback = if verbose {
		"docweave=debug,docweave_core=debug"
	} else {
		"off"
	};
	let filter =
		EnvFilter::try_from_env("DOCWEAVE_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.init();
}

fn resolve_root(args: &DocweaveCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_project(args: &DocweaveCli) -> CliResult<ProjectContext> {
	let root = resolve_root(args);
	let context = ProjectContext::load(&root)?;
	debug!(
		root = %root.display(),
		config = ?context.config_path,
		documents = context.documents.len(),
		"project loaded"
	);
	Ok(context)
}

fn run_check(
	args: &DocweaveCli,
	show_diff: bool,
	format: OutputFormat,
	watch: bool,
) -> CliResult<()> {
	let passed = run_check_once(args, show_diff, format)?;

	if !watch {
		if !passed {
			process::exit(1);
		}
		return Ok(());
	}

	watch_project(&resolve_root(args), "checking", || {
		run_check_once(args, show_diff, format).map(|_| ())
	})
}

/// Run a single check and return whether it passed.
fn run_check_once(args: &DocweaveCli, show_diff: bool, format: OutputFormat) -> CliResult<bool> {
	let context = load_project(args)?;
	let outcome = context.run(&DiskFileSystem, RunMode::Check);
	let root = &context.root;

	match format {
		OutputFormat::Json => {
			println!("{}", serde_json::to_string(&JsonReport::new(&outcome, root))?);
		}
		OutputFormat::Github => {
			for entry in &outcome.log.entries {
				println!("{}", github_annotation(entry, root));
			}
			eprintln!("{}", outcome.summary());
		}
		OutputFormat::Text => {
			print_entries(&outcome.log.entries, root);

			if show_diff {
				for artifact in &outcome.log.outdated {
					print_artifact_diff(artifact, root);
				}
			}

			if outcome.is_success() {
				println!("Check passed: {}.", outcome.summary());
			} else {
				eprintln!();
				eprintln!("{} {}", colored!("Check failed:", red), outcome.summary());
			}
		}
	}

	Ok(outcome.is_success())
}

fn run_update(args: &DocweaveCli, dry_run: bool, watch: bool) -> CliResult<()> {
	let passed = run_update_once(args, dry_run)?;

	if !watch || dry_run {
		if !passed {
			process::exit(1);
		}
		return Ok(());
	}

	watch_project(&resolve_root(args), "updating", || {
		run_update_once(args, false).map(|_| ())
	})
}

/// Run a single update and return whether it finished without errors.
fn run_update_once(args: &DocweaveCli, dry_run: bool) -> CliResult<bool> {
	let context = load_project(args)?;
	let mode = if dry_run {
		RunMode::Check
	} else {
		RunMode::Write
	};
	let outcome = context.run(&DiskFileSystem, mode);
	let root = &context.root;
	let log = &outcome.log;

	print_entries(&log.entries, root);

	if log.has_errors() {
		eprintln!();
		eprintln!("{} {}", colored!("Update failed:", red), outcome.summary());
		if !log.written.is_empty() {
			eprintln!("Documents without errors were updated:");
			for path in &log.written {
				eprintln!("  {}", make_relative(path, root));
			}
		}
		return Ok(false);
	}

	if dry_run {
		if log.outdated.is_empty() {
			println!(
				"All {} document(s) are already up to date.",
				log.document_count
			);
		} else {
			println!("Dry run: would update {} file(s):", log.outdated_count());
			for artifact in &log.outdated {
				println!("  {}", make_relative(&artifact.path, root));
			}
		}
		return Ok(true);
	}

	if log.written.is_empty() {
		println!(
			"All {} document(s) are already up to date.",
			log.document_count
		);
		return Ok(true);
	}

	println!(
		"{} {} file(s).",
		colored!("Updated", green),
		log.written.len()
	);
	if args.verbose {
		for path in &log.written {
			println!("  {}", make_relative(path, root));
		}
	}

	Ok(true)
}

fn run_list(args: &DocweaveCli) -> CliResult<()> {
	let context = load_project(args)?;
	let root = &context.root;

	if context.documents.is_empty() {
		println!("No documents found.");
		return Ok(());
	}

	for path in &context.documents {
		let rel = make_relative(path, root);
		let document = match Document::load(&DiskFileSystem, path) {
			Ok(document) => document,
			Err(e) => {
				println!("{rel}");
				println!("  {} {e}", colored!("error:", red));
				continue;
			}
		};
		let regions = match scan(&document) {
			Ok(regions) => regions,
			Err(e) => {
				println!("{rel}");
				println!("  {} {e}", colored!("error:", red));
				continue;
			}
		};

		let declared = regions.iter().find_map(|region| {
			match &region.kind {
				RegionKind::ModuleAnchor { name } => Some(name.clone()),
				_ => None,
			}
		});
		let module = declared.or_else(|| {
			context
				.config
				.registry
				.module_for_path(path)
				.map(|module| module.name.clone())
		});

		match module {
			Some(module) => println!("{} (module {module})", colored!(rel, bold)),
			None => println!("{}", colored!(rel, bold)),
		}

		for region in regions.iter() {
			if let Some(description) = describe_region(&region.kind) {
				println!("  {:>4}  {description}", region.opening_line());
			}
		}
	}

	Ok(())
}

fn describe_region(kind: &RegionKind) -> Option<String> {
	let description = match kind {
		RegionKind::Literal => return None,
		RegionKind::Include(reference) => format!("INCLUDE {}", describe_reference(reference)),
		RegionKind::SampleTest(reference) => format!("SAMPLE {}", describe_reference(reference)),
		RegionKind::TocAnchor => "TOC".to_string(),
		RegionKind::ModuleAnchor { name } => format!("MODULE {name}"),
		RegionKind::LinkAnchor => "LINKS".to_string(),
	};

	Some(description)
}

fn describe_reference(reference: &SampleReference) -> String {
	let mut description = match &reference.source {
		SampleSource::External { path, range } => format!("{}#{range}", path.display()),
		SampleSource::Inline => "(inline)".to_string(),
	};
	if let Some(emit) = &reference.options.emit {
		description.push_str(&format!(" emit={}", emit.display()));
	}
	description
}

/// Re-run `run` whenever a file below `root` is created or modified.
fn watch_project(root: &Path, action: &str, mut run: impl FnMut() -> CliResult<()>) -> CliResult<()> {
	use notify::Watcher;

	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let (tx, rx) = mpsc::channel();
	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_) | notify::EventKind::Create(_)
				) {
					let _ = tx.send(());
				}
			}
		})?;
	watcher.watch(root, notify::RecursiveMode::Recursive)?;

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nFile change detected, {action}...");
		if let Err(e) = run() {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

fn print_entries(entries: &[LogEntry], root: &Path) {
	for entry in entries {
		let label = match entry.severity {
			Severity::Error => colored!("error:", red),
			Severity::Warning => colored!("warning:", yellow),
		};
		let location = match entry.line {
			Some(line) => format!("{}:{line}", make_relative(&entry.file, root)),
			None => make_relative(&entry.file, root),
		};

		match &entry.code {
			Some(code) => eprintln!("{label} {location}: {} [{code}]", entry.message),
			None => eprintln!("{label} {location}: {}", entry.message),
		}
	}
}

fn github_annotation(entry: &LogEntry, root: &Path) -> String {
	let level = match entry.severity {
		Severity::Error => "error",
		Severity::Warning => "warning",
	};
	let file = make_relative(&entry.file, root);
	match entry.line {
		Some(line) => format!("::{level} file={file},line={line}::{}", entry.message),
		None => format!("::{level} file={file}::{}", entry.message),
	}
}

fn print_artifact_diff(artifact: &OutdatedArtifact, root: &Path) {
	eprintln!();
	eprintln!("{}", colored!(make_relative(&artifact.path, root), bold));
	print_diff(artifact.current.as_deref().unwrap_or_default(), &artifact.expected);
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

/// Machine-readable form of a check run.
#[derive(Serialize)]
struct JsonReport {
	ok: bool,
	summary: String,
	documents: usize,
	errors: Vec<JsonEntry>,
	warnings: Vec<JsonEntry>,
	outdated: Vec<JsonOutdated>,
}

#[derive(Serialize)]
struct JsonEntry {
	file: String,
	line: Option<usize>,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	code: Option<String>,
}

#[derive(Serialize)]
struct JsonOutdated {
	file: String,
	document: String,
	missing: bool,
}

impl JsonReport {
	fn new(outcome: &RunOutcome, root: &Path) -> Self {
		let entry = |entry: &LogEntry| {
			JsonEntry {
				file: make_relative(&entry.file, root),
				line: entry.line,
				message: entry.message.clone(),
				code: entry.code.clone(),
			}
		};

		Self {
			ok: outcome.is_success(),
			summary: outcome.summary(),
			documents: outcome.log.document_count,
			errors: outcome.log.errors().map(entry).collect(),
			warnings: outcome.log.warnings().map(entry).collect(),
			outdated: outcome
				.log
				.outdated
				.iter()
				.map(|artifact| {
					JsonOutdated {
						file: make_relative(&artifact.path, root),
						document: make_relative(&artifact.document, root),
						missing: artifact.current.is_none(),
					}
				})
				.collect(),
		}
	}
}

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Keep the code samples, tables of contents and API links in your docs in sync.",
	long_about = "docweave keeps the derived parts of markdown documentation in sync with the \
	              sources they come from.\n\nDocuments mark regions with directives such as \
	              `<!--- SAMPLE src/lib.rs#BASIC -->` … `<!--- END SAMPLE -->`. docweave \
	              rebuilds the content of every region and either reports the drift or writes \
	              the result back.\n\nQuick start:\n  docweave check   Verify every document is \
	              up to date\n  docweave update  Regenerate outdated documents and samples\n  \
	              docweave list    Show the directives of every document"
)]
pub struct DocweaveCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output and debug logging.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Check that every document and generated sample is up to date.
	///
	/// Composes every document of the project and compares the result with
	/// the files on disk without writing anything. Exits with status 1 when a
	/// file is out of date or a document has an error.
	///
	/// Ideal for CI pipelines. Use `--diff` to see exactly what changed and
	/// `--format` to control the output style.
	Check {
		/// Show a diff between the file on disk and its expected content for
		/// each outdated file.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Output format for check results. Use `text` for human-readable
		/// output, `json` for programmatic consumption, or `github` for
		/// GitHub Actions annotations that appear inline on PRs.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Watch for file changes and re-run checks automatically.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// Regenerate every outdated document and generated sample.
	///
	/// Documents with errors are reported and left untouched. Use `--dry-run`
	/// to preview which files would change.
	Update {
		/// Print the files that would be written without writing them.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Watch for file changes and re-run updates automatically.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// List every document of the project with its module and directives.
	List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
	/// GitHub Actions annotation format. Emits `::warning` or `::error`
	/// annotations that appear inline on pull request diffs.
	Github,
}

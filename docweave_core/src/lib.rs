//! `docweave_core` is the engine behind [docweave](https://github.com/docweave/docweave). It keeps the code samples, tables of contents and API links embedded in markdown documentation in sync with the sources they come from, and reports every place where the files on disk have drifted.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Document paths
//!   → Document loader (lines + detected line separator)
//!   → Marker scanner (directive lines → ordered regions)
//!   → Weaver / link resolver (sample, include and link regions)
//!   → Table of contents builder (headers of the composed document or module)
//!   → Run controller (diff against disk, write or report, aggregate a RunLog)
//! ```
//!
//! ## Directives
//!
//! Directives are HTML comments with three dashes, each on a line of its own:
//!
//! ```markdown
//! <!--- SAMPLE ../src/lib.rs#BASIC emit=basic.rs -->
//! <!--- END SAMPLE -->
//! ```
//!
//! The available directives are `INCLUDE`, `SAMPLE`, `TOC`, `MODULE` and
//! `LINKS`, each closed by `<!--- END <KIND> -->`.
//!
//! ## Modules
//!
//! - [`config`] loads `docweave.toml` and validates it into an [`EngineConfig`].
//! - [`project`] discovers documents and runs the engine over a project on disk.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use docweave_core::project::check_project;
//!
//! let outcome = check_project(Path::new(".")).unwrap();
//! if !outcome.is_success() {
//!     eprintln!("{}", outcome.summary());
//! }
//! ```

pub use config::*;
pub use discovery::*;
pub use document::*;
pub use engine::*;
pub use error::*;
pub use fs::*;
pub use links::*;
pub use parser::*;
pub use project::*;
pub use registry::*;
pub use report::*;
pub use run::*;
pub use toc::*;
pub use weaver::*;

pub mod config;
mod discovery;
mod document;
mod engine;
#[allow(unused_assignments)]
mod error;
mod fs;
pub(crate) mod lexer;
mod links;
mod parser;
pub mod project;
mod registry;
mod report;
mod run;
mod toc;
pub(crate) mod tokens;
mod weaver;

#[cfg(test)]
mod __fixtures;
#[cfg(test)]
mod __tests;

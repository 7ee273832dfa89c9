use std::path::Path;
use std::path::PathBuf;

use crate::Document;
use crate::EngineConfig;
use crate::MemoryFileSystem;
use crate::Module;
use crate::ModuleRegistry;

pub const ROOT: &str = "/project";

/// An absolute path below the fixture project root.
pub fn path(relative: &str) -> PathBuf {
	Path::new(ROOT).join(relative)
}

/// A file system holding `files`, keyed by paths relative to [`ROOT`].
pub fn memory_fs(files: &[(&str, &str)]) -> MemoryFileSystem {
	let fs = MemoryFileSystem::new();
	for (relative, content) in files {
		fs.insert(path(relative), *content);
	}
	fs
}

pub fn engine_config() -> EngineConfig {
	EngineConfig::new(ROOT)
}

/// A registry with the `core` module rooted at `lib/core` and a `docs`
/// module, without documentation, claiming `docs/`.
pub fn core_registry() -> ModuleRegistry {
	ModuleRegistry::new(vec![
		Module::new("core", path("lib/core")).with_docs_url("https://docs.example/core"),
		Module::new("docs", path("docs")),
	])
	.unwrap_or_else(|e| panic!("registry: {e}"))
}

/// A document at `docs/guide.md`.
pub fn guide(content: &str) -> Document {
	Document::from_content(path("docs/guide.md"), content)
}

pub const BASIC_SOURCE: &str = "\
use docs::Widget;

fn main() {
    // START-BASIC
    let widget = Widget::new();
    println!(\"{widget:?}\");
    // END-BASIC
}
";

pub const GUIDE: &str = "\
# Guide

<!--- TOC -->
<!--- END TOC -->

## Install

Use the [Widget][core/Widget] type.

<!--- SAMPLE ../src/lib.rs#BASIC dedent emit=../samples/basic.rs -->
<!--- END SAMPLE -->

## Usage

### Details

<!--- LINKS -->
<!--- END LINKS -->
";

pub const GUIDE_COMPOSED: &str = "\
# Guide

<!--- TOC -->
* [Install](#install)
* [Usage](#usage)
  * [Details](#details)
<!--- END TOC -->

## Install

Use the [Widget][core/Widget] type.

<!--- SAMPLE ../src/lib.rs#BASIC dedent emit=../samples/basic.rs -->
```rust
let widget = Widget::new();
println!(\"{widget:?}\");
```
<!--- END SAMPLE -->

## Usage

### Details

<!--- LINKS -->
[core/Widget]: https://docs.example/core/Widget
<!--- END LINKS -->
";

pub const BASIC_EMITTED: &str = "\
// This file was automatically generated from ../docs/guide.md. Do not edit.
fn main() {
    let widget = Widget::new();
    println!(\"{widget:?}\");
}
";

/// A project with the guide document, its source file and the `core`
/// module.
pub fn guide_project() -> (EngineConfig, MemoryFileSystem) {
	let config = engine_config().with_registry(core_registry());
	let fs = memory_fs(&[("docs/guide.md", GUIDE), ("src/lib.rs", BASIC_SOURCE)]);
	(config, fs)
}

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn docweave_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("docweave"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("DOCWEAVE_LOG");
	cmd
}

/// A readme whose table of contents matches its headers.
#[allow(dead_code)]
pub const FRESH_README: &str = "# Readme\n\n<!--- TOC -->\n* [Usage](#usage)\n<!--- END TOC \
                                -->\n\n## Usage\n";

/// The same readme with an outdated table of contents.
#[allow(dead_code)]
pub const STALE_README: &str = "# Readme\n\n<!--- TOC -->\n* [Old](#old)\n<!--- END TOC \
                                -->\n\n## Usage\n";

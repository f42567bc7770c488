//! App path fixer CLI entrypoint.
//!
//! Writes `app_fixed.py` beside `app.py` with imports and example paths
//! anchored to the script's own directory. Always exits 0; the outcome is
//! reported on stderr.

use camino::Utf8Path;
use clap::Parser;
use std::io::Write;
use trellis_bootstrap::cli::FixPathsCli;
use trellis_bootstrap::normalize::{default_source_path, run_normalize};
use trellis_bootstrap::output::write_stderr_line;

fn main() {
    let cli = FixPathsCli::parse();
    let mut stderr = std::io::stderr();
    let source = cli.source.unwrap_or_else(|| {
        let executable = std::env::current_exe().ok();
        default_source_path(executable.as_deref())
    });
    run(&source, &mut stderr);
}

fn run(source: &Utf8Path, stderr: &mut dyn Write) -> bool {
    let fixed = run_normalize(source, stderr);
    let message = if fixed {
        "Successfully fixed app paths"
    } else {
        "Failed to fix app paths"
    };
    write_stderr_line(stderr, message);
    fixed
}

//! CLI argument definitions for the bootstrap binaries.
//!
//! Both binaries share this module so the argument surface can be tested
//! without spawning processes.

use camino::Utf8PathBuf;
use clap::Parser;

/// Download the model weights the application needs.
#[derive(Parser, Debug, Clone)]
#[command(name = "trellis-download-weights")]
#[command(version, about)]
#[command(long_about = concat!(
    "Download the model weights the application needs.\n\n",
    "Each artifact lists one or more variants. Variants are tried in order and ",
    "the first that downloads successfully wins. An artifact whose variants all ",
    "fail is reported and skipped; the remaining artifacts are still attempted.\n\n",
    "A Hugging Face token is read from HUGGINGFACE_TOKEN, which may be set in a ",
    ".env file in the project root. Public models download without a token.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  HUGGINGFACE_TOKEN   Access token for private or gated models\n",
    "  HF_ENDPOINT         Hugging Face endpoint [default: https://huggingface.co]\n",
    "  TORCH_HOME          Root of the hub cache [default: <cache dir>/torch]\n\n",
    "EXAMPLES:\n",
    "  Download everything into <project root>/weights:\n",
    "    $ trellis-download-weights\n\n",
    "  Preview the plan without downloading:\n",
    "    $ trellis-download-weights --dry-run\n\n",
    "  Use a custom manifest:\n",
    "    $ trellis-download-weights --manifest weights.toml",
))]
pub struct DownloadCli {
    /// Project root holding `.env` [default: parent of the binary's directory].
    #[arg(long, value_name = "DIR")]
    pub project_root: Option<Utf8PathBuf>,

    /// Directory for snapshot artifacts [default: <project root>/weights].
    #[arg(long, value_name = "DIR")]
    pub weights_dir: Option<Utf8PathBuf>,

    /// TOML manifest replacing the built-in artifact list.
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<Utf8PathBuf>,

    /// Show the plan and exit without downloading.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (failures and the summary are still shown).
    #[arg(short, long)]
    pub quiet: bool,
}

/// Create a copy of app.py whose paths resolve relative to its own directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "trellis-fix-app-paths")]
#[command(version, about)]
pub struct FixPathsCli {
    /// Path to app.py [default: app.py in the parent of the tool's directory].
    #[arg(value_name = "APP_PY")]
    pub source: Option<Utf8PathBuf>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

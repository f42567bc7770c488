//! Test support utilities for bootstrap behavioural tests.
//!
//! Provides temporary directory layouts and output capture helpers shared by
//! the behaviour test binaries.

use camino::Utf8PathBuf;
use tempfile::TempDir;
use trellis_bootstrap::config::Layout;

/// A directory layout rooted in a fresh temporary directory.
pub struct TempLayout {
    _dir: TempDir,
    /// The layout pointing into the temporary directory.
    pub layout: Layout,
}

/// Create a layout with `weights/` and `cache/torch/hub` under a temporary
/// project root.
pub fn temp_layout() -> TempLayout {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("UTF-8 temp dir");
    let layout = Layout {
        project_root: root.clone(),
        weights_dir: root.join("weights"),
        hub_cache_dir: root.join("cache").join("torch").join("hub"),
    };
    TempLayout { _dir: dir, layout }
}

/// Decode captured stderr bytes.
pub fn captured(stderr: &[u8]) -> String {
    String::from_utf8(stderr.to_vec()).expect("stderr was not UTF-8")
}

//! Platform directory resolution.
//!
//! Wraps `directories-next` behind a small trait so that tests can supply
//! fixed locations instead of the user's real cache directory.

use std::path::PathBuf;

/// Environment variable overriding the torch hub cache root.
pub const TORCH_HOME_ENV_VAR: &str = "TORCH_HOME";

/// Source of platform-specific base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The user's cache directory (for example `~/.cache` on Linux).
    fn cache_dir(&self) -> Option<PathBuf>;

    /// The explicit torch home override, if one is configured.
    fn torch_home(&self) -> Option<PathBuf>;
}

/// Root of the shared hub cache.
///
/// Resolves to `$TORCH_HOME/hub` when the override is set, otherwise to
/// `<cache dir>/torch/hub`.
pub fn hub_cache_dir(dirs: &dyn BaseDirs) -> Option<PathBuf> {
    dirs.torch_home()
        .or_else(|| dirs.cache_dir().map(|cache| cache.join("torch")))
        .map(|root| root.join("hub"))
}

/// [`BaseDirs`] backed by the running system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn cache_dir(&self) -> Option<PathBuf> {
        directories_next::BaseDirs::new().map(|dirs| dirs.cache_dir().to_path_buf())
    }

    fn torch_home(&self) -> Option<PathBuf> {
        std::env::var_os(TORCH_HOME_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_cache_prefers_torch_home() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_torch_home()
            .returning(|| Some(PathBuf::from("/opt/torch")));
        dirs.expect_cache_dir()
            .returning(|| Some(PathBuf::from("/home/user/.cache")));

        assert_eq!(hub_cache_dir(&dirs), Some(PathBuf::from("/opt/torch/hub")));
    }

    #[test]
    fn hub_cache_falls_back_to_platform_cache() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_torch_home().returning(|| None);
        dirs.expect_cache_dir()
            .returning(|| Some(PathBuf::from("/home/user/.cache")));

        assert_eq!(
            hub_cache_dir(&dirs),
            Some(PathBuf::from("/home/user/.cache/torch/hub"))
        );
    }

    #[test]
    fn hub_cache_is_none_without_any_base() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_torch_home().returning(|| None);
        dirs.expect_cache_dir().returning(|| None);

        assert!(hub_cache_dir(&dirs).is_none());
    }

    #[test]
    fn system_dirs_read_torch_home_from_environment() {
        temp_env::with_var(TORCH_HOME_ENV_VAR, Some("/srv/torch"), || {
            assert_eq!(
                SystemBaseDirs.torch_home(),
                Some(PathBuf::from("/srv/torch"))
            );
        });
    }

    #[test]
    fn system_dirs_ignore_empty_torch_home() {
        temp_env::with_var(TORCH_HOME_ENV_VAR, Some(""), || {
            assert!(SystemBaseDirs.torch_home().is_none());
        });
    }
}

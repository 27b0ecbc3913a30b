//! Resolved filesystem roots for the skill installer.
//!
//! The agent tool keeps all plugin state under a single base directory
//! (`~/.claude/plugins` by default). This crate resolves that base and
//! derives the per-namespace roots the installer works against. Paths are
//! always injected explicitly — there are no process-wide singletons, and
//! tests build a [`SkillPaths`] over a temporary directory.

use std::path::{Path, PathBuf};

use anyhow::Context;

/// Env var overriding the plugins base directory (used by tests and CI).
pub const PLUGINS_DIR_ENV: &str = "SKILLDOCK_PLUGINS_DIR";

/// File name of the install registry inside the plugins directory.
pub const REGISTRY_FILE_NAME: &str = "installed_plugins.json";

/// Resolve the plugins base directory.
///
/// `SKILLDOCK_PLUGINS_DIR` wins when set; otherwise `~/.claude/plugins`.
pub fn default_plugins_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var(PLUGINS_DIR_ENV)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    let base = directories::BaseDirs::new().context("cannot resolve home directory")?;
    Ok(base.home_dir().join(".claude").join("plugins"))
}

/// The three filesystem locations one installer instance operates on.
///
/// The marketplace root and cache root are mirrored destination trees; the
/// registry file is the single JSON document recording installed packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillPaths {
    /// Persistent mirror of installed package sources.
    pub marketplace_root: PathBuf,
    /// Secondary mirror, namespaced per package under a version sentinel.
    pub cache_root: PathBuf,
    /// The `installed_plugins.json` registry document.
    pub registry_file: PathBuf,
}

impl SkillPaths {
    /// Derive the roots for `namespace` under `plugins_dir`.
    ///
    /// Layout matches the agent tool's own:
    /// `<plugins>/marketplaces/<namespace>`, `<plugins>/cache/<namespace>`,
    /// `<plugins>/installed_plugins.json`.
    pub fn for_namespace(plugins_dir: &Path, namespace: &str) -> Self {
        Self {
            marketplace_root: plugins_dir.join("marketplaces").join(namespace),
            cache_root: plugins_dir.join("cache").join(namespace),
            registry_file: plugins_dir.join(REGISTRY_FILE_NAME),
        }
    }

    /// Same derivation against the default plugins directory.
    pub fn resolve(namespace: &str) -> anyhow::Result<Self> {
        Ok(Self::for_namespace(&default_plugins_dir()?, namespace))
    }

    /// Create the destination roots and the registry's parent directory.
    pub fn ensure_dirs(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.marketplace_root).with_context(|| {
            format!(
                "creating marketplace root {}",
                self.marketplace_root.display()
            )
        })?;
        std::fs::create_dir_all(&self.cache_root)
            .with_context(|| format!("creating cache root {}", self.cache_root.display()))?;
        if let Some(parent) = self.registry_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::debug!(
            marketplace = %self.marketplace_root.display(),
            cache = %self.cache_root.display(),
            "plugin directories ready"
        );
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_layout() {
        let paths = SkillPaths::for_namespace(Path::new("/data/plugins"), "acme-skills");
        assert_eq!(
            paths.marketplace_root,
            Path::new("/data/plugins/marketplaces/acme-skills")
        );
        assert_eq!(paths.cache_root, Path::new("/data/plugins/cache/acme-skills"));
        assert_eq!(
            paths.registry_file,
            Path::new("/data/plugins/installed_plugins.json")
        );
    }

    #[test]
    fn test_ensure_dirs_creates_roots() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = SkillPaths::for_namespace(tmp.path(), "ns");
        paths.ensure_dirs().unwrap();
        assert!(paths.marketplace_root.is_dir());
        assert!(paths.cache_root.is_dir());
        // Registry file itself is created lazily on first save.
        assert!(!paths.registry_file.exists());
    }

    #[test]
    fn test_ensure_dirs_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = SkillPaths::for_namespace(tmp.path(), "ns");
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();
    }
}

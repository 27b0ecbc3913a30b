use std::path::{Path, PathBuf};

use anyhow::Context;
use skilldock_config::SkillPaths;

use crate::{
    parse,
    registry::RegistryStore,
    types::{InstallOutcome, PluginKey, UninstallOutcome, VERSION_SENTINEL},
};

/// Synchronizes package installs across the marketplace and cache roots and
/// keeps the registry in step.
///
/// Install is replace-not-merge: a previous copy of the same package is
/// removed before the new one lands, so stale files never survive a
/// reinstall. Registration happens only after both copies succeed; a
/// mid-copy failure can leave a stale directory with no registry entry,
/// which the next install of that package cleans up.
pub struct InstallSync {
    paths: SkillPaths,
    store: RegistryStore,
}

impl InstallSync {
    pub fn new(paths: SkillPaths) -> Self {
        let store = RegistryStore::new(paths.registry_file.clone());
        Self { paths, store }
    }

    pub fn paths(&self) -> &SkillPaths {
        &self.paths
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Install one package directory. Returns the package name (the source
    /// directory's name) as confirmation.
    pub async fn install(&self, source: &Path) -> anyhow::Result<String> {
        let name = parse::dir_name(source);
        if !valid_package_name(&name) {
            anyhow::bail!(
                "source {} does not yield a usable package name",
                source.display()
            );
        }

        let marketplace_target = self.paths.marketplace_root.join(&name);
        replace_tree(source, &marketplace_target)
            .await
            .with_context(|| format!("copying '{name}' into the marketplace root"))?;

        let cache_target = self.paths.cache_root.join(&name).join(VERSION_SENTINEL);
        replace_tree(source, &cache_target)
            .await
            .with_context(|| format!("copying '{name}' into the cache root"))?;

        self.store.register(&name, &cache_target)?;
        tracing::info!(%name, "installed skill package");
        Ok(name)
    }

    /// Best-effort batch install: missing sources are skipped and a failed
    /// package never aborts the rest.
    pub async fn install_all(&self, sources: &[PathBuf]) -> Vec<InstallOutcome> {
        let mut outcomes = Vec::with_capacity(sources.len());
        for source in sources {
            if !source.exists() {
                tracing::debug!(source = %source.display(), "skipping missing install source");
                outcomes.push(InstallOutcome::SkippedMissing {
                    path: source.clone(),
                });
                continue;
            }
            match self.install(source).await {
                Ok(name) => outcomes.push(InstallOutcome::Installed { name }),
                Err(e) => {
                    tracing::warn!(source = %source.display(), %e, "install failed");
                    outcomes.push(InstallOutcome::Failed {
                        path: source.clone(),
                        reason: format!("{e:#}"),
                    });
                },
            }
        }
        outcomes
    }

    /// Uninstall by package key (`name`, `name@namespace`, or the registry
    /// view's `name@namespace::skillId`).
    ///
    /// Packages from a foreign namespace are refused before any filesystem
    /// mutation. Both mirror directories are removed best-effort and the
    /// registry entry is dropped unconditionally, keeping the registry
    /// consistent even when the directories were already cleaned up by hand.
    pub async fn uninstall(&self, package_key: &str) -> anyhow::Result<UninstallOutcome> {
        let key = PluginKey::parse(package_key);
        if !key.is_local() {
            let namespace = key.namespace.clone().unwrap_or_default();
            tracing::warn!(%package_key, %namespace, "refusing to uninstall foreign package");
            return Ok(UninstallOutcome::Forbidden { namespace });
        }
        // An empty or path-like name would resolve to the roots themselves
        // (or outside them) and must never reach remove_dir_all.
        if !valid_package_name(&key.name) {
            tracing::warn!(%package_key, "refusing uninstall for malformed package name");
            return Ok(UninstallOutcome::NotFound);
        }

        let mut found = false;
        for dir in [
            self.paths.marketplace_root.join(&key.name),
            self.paths.cache_root.join(&key.name),
        ] {
            if dir.exists() {
                tokio::fs::remove_dir_all(&dir)
                    .await
                    .with_context(|| format!("removing {}", dir.display()))?;
                found = true;
            }
        }

        self.store.unregister(&key.name)?;

        if found {
            tracing::info!(name = %key.name, "uninstalled skill package");
            Ok(UninstallOutcome::Removed { name: key.name })
        } else {
            Ok(UninstallOutcome::NotFound)
        }
    }
}

/// A package name must stay a single directory entry under the roots:
/// non-empty, no path separators, no current/parent-dir components.
fn valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

/// Delete `target` if present, then recursively copy `source` into it.
async fn replace_tree(source: &Path, target: &Path) -> anyhow::Result<()> {
    let source = source.to_path_buf();
    let target = target.to_path_buf();
    tokio::task::spawn_blocking(move || {
        if target.exists() {
            std::fs::remove_dir_all(&target)?;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        copy_dir_all(&source, &target)
    })
    .await??;
    Ok(())
}

/// Recursive copy of regular files and directories. Symlinks are skipped so
/// the mirrored roots only ever hold plain trees.
fn copy_dir_all(src: &Path, dst: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let dest = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_all(&entry.path(), &dest)?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &dest)?;
        } else {
            tracing::warn!(path = %entry.path().display(), "skipping symlink in package source");
        }
    }
    Ok(())
}

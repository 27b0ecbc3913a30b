use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::types::{InstallRecord, PluginKey, Registry};

/// Persistent store for the `installed_plugins.json` registry.
///
/// The store exclusively owns the file: no other component touches it
/// directly. A missing or corrupt document is silently repaired to an empty
/// registry (with a warning) rather than surfaced as an error. Each
/// read-modify-write sequence holds an advisory lock on a sibling lock file
/// so concurrent writers cannot lose updates.
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, resetting to an empty one when the file is missing
    /// or unparseable.
    pub fn load(&self) -> Registry {
        if !self.path.exists() {
            return Registry::default();
        }
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), %e, "unreadable registry, using empty");
                return Registry::default();
            },
        };
        match serde_json::from_str(&data) {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), %e, "corrupt registry, resetting to empty");
                Registry::default()
            },
        }
    }

    /// Save the full document via temp file + rename.
    pub fn save(&self, registry: &Registry) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(registry)?;
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Record an install for `package_name` under this tool's namespace,
    /// replacing any previous record sequence (last-install-wins).
    pub fn register(&self, package_name: &str, cache_path: &Path) -> anyhow::Result<()> {
        self.with_lock(|store| {
            let mut registry = store.load();
            let key = PluginKey::local(package_name).registry_key();
            registry
                .plugins
                .insert(key, vec![InstallRecord::local(cache_path.to_path_buf())]);
            store.save(&registry)
        })
    }

    /// Drop the record for `package_name`. A no-op when absent.
    pub fn unregister(&self, package_name: &str) -> anyhow::Result<()> {
        self.with_lock(|store| {
            let mut registry = store.load();
            let key = PluginKey::local(package_name).registry_key();
            if registry.plugins.remove(&key).is_some() {
                store.save(&registry)?;
            }
            Ok(())
        })
    }

    /// Run `f` while holding an exclusive advisory lock on the registry's
    /// sibling lock file. Scopes the whole load-modify-save sequence.
    fn with_lock<T>(&self, f: impl FnOnce(&Self) -> anyhow::Result<T>) -> anyhow::Result<T> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock_path = self.path.with_extension("json.lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("opening registry lock {}", lock_path.display()))?;
        let mut lock = fd_lock::RwLock::new(file);
        let guard = lock
            .write()
            .map_err(|e| anyhow::anyhow!("registry lock failed: {e}"))?;
        let result = f(self);
        drop(guard);
        result
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::types::REGISTRY_VERSION};

    fn store_in(dir: &Path) -> RegistryStore {
        RegistryStore::new(dir.join("installed_plugins.json"))
    }

    #[test]
    fn test_load_missing_returns_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = store_in(tmp.path()).load();
        assert_eq!(registry.version, REGISTRY_VERSION);
        assert!(registry.plugins.is_empty());
    }

    #[test]
    fn test_register_then_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let cache = tmp.path().join("cache/demo-skill/unknown");

        store.register("demo-skill", &cache).unwrap();

        let registry = store.load();
        assert_eq!(registry.plugins.len(), 1);
        let records = &registry.plugins["demo-skill@anthropic-agent-skills"];
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].install_path, cache);
        assert_eq!(records[0].scope, "user");
        assert_eq!(records[0].version, "unknown");
        assert!(records[0].is_local);
    }

    #[test]
    fn test_register_replaces_existing_record() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        store.register("demo-skill", &tmp.path().join("old")).unwrap();
        store.register("demo-skill", &tmp.path().join("new")).unwrap();

        let registry = store.load();
        let records = &registry.plugins["demo-skill@anthropic-agent-skills"];
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].install_path, tmp.path().join("new"));
    }

    #[test]
    fn test_unregister_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        store.register("demo-skill", &tmp.path().join("cache")).unwrap();
        store.unregister("demo-skill").unwrap();

        assert!(store.load().plugins.is_empty());
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.unregister("never-installed").unwrap();
        assert!(store.load().plugins.is_empty());
    }

    #[test]
    fn test_corrupt_registry_resets_to_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        std::fs::write(store.path(), "{not json at all").unwrap();

        let registry = store.load();
        assert_eq!(registry.version, REGISTRY_VERSION);
        assert!(registry.plugins.is_empty());

        // A subsequent save overwrites the corrupt content with valid JSON.
        store.save(&registry).unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 2);
    }

    #[test]
    fn test_register_over_corrupt_registry() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        std::fs::write(store.path(), "garbage").unwrap();

        store.register("demo-skill", &tmp.path().join("cache")).unwrap();
        let registry = store.load();
        assert!(registry
            .plugins
            .contains_key("demo-skill@anthropic-agent-skills"));
    }

    #[test]
    fn test_save_is_pretty_printed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.save(&Registry::default()).unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains('\n'));
    }
}

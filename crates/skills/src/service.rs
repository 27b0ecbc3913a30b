use std::path::{Path, PathBuf};

use {async_trait::async_trait, serde::Serialize, skilldock_config::SkillPaths};

use crate::{
    discover, extract,
    install::InstallSync,
    types::{InstallOutcome, PluginKey, SkillDescriptor, UninstallOutcome},
};

/// Operations exposed to the request layer.
#[async_trait]
pub trait SkillService: Send + Sync {
    /// Scan materialized upload files for skills. Zip uploads are extracted
    /// next to the archive and scanned recursively; anything else is
    /// ignored by policy.
    async fn discover_from_upload(&self, files: &[PathBuf]) -> anyhow::Result<Vec<SkillDescriptor>>;

    /// Best-effort batch install of package source directories.
    async fn install(&self, sources: &[PathBuf]) -> Vec<InstallOutcome>;

    /// Registry-driven view of everything installed.
    async fn list_installed(&self) -> anyhow::Result<Vec<SkillDescriptor>>;

    /// Uninstall by package key, enforcing the provenance boundary.
    async fn uninstall(&self, package_key: &str) -> anyhow::Result<UninstallOutcome>;

    /// The resolved filesystem roots, for diagnostics only.
    fn config(&self) -> ConfigView;
}

/// Diagnostic view of the resolved roots (`/config` wire format).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub skill_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub plugins_file: PathBuf,
}

/// Filesystem-backed service over one set of resolved roots.
pub struct LocalSkillService {
    sync: InstallSync,
}

impl LocalSkillService {
    /// Build the service and make sure the destination roots exist.
    pub fn new(paths: SkillPaths) -> anyhow::Result<Self> {
        paths.ensure_dirs()?;
        Ok(Self {
            sync: InstallSync::new(paths),
        })
    }

    pub fn sync(&self) -> &InstallSync {
        &self.sync
    }
}

#[async_trait]
impl SkillService for LocalSkillService {
    async fn discover_from_upload(&self, files: &[PathBuf]) -> anyhow::Result<Vec<SkillDescriptor>> {
        let files = files.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut skills = Vec::new();
            for file in &files {
                if !extract::is_zip(file) {
                    tracing::debug!(file = %file.display(), "ignoring non-zip upload");
                    continue;
                }
                let extract_dir = extraction_dir(file);
                if let Err(e) = extract::extract_archive(file, &extract_dir) {
                    tracing::warn!(file = %file.display(), %e, "failed to extract upload");
                    continue;
                }
                skills.extend(discover::scan_tree(&extract_dir));
            }
            Ok(skills)
        })
        .await?
    }

    async fn install(&self, sources: &[PathBuf]) -> Vec<InstallOutcome> {
        self.sync.install_all(sources).await
    }

    async fn list_installed(&self) -> anyhow::Result<Vec<SkillDescriptor>> {
        let registry = self.sync.store().load();
        let mut skills = Vec::new();

        for (plugin_key, records) in &registry.plugins {
            let Some(record) = records.first() else {
                continue;
            };
            if !record.install_path.exists() {
                tracing::debug!(%plugin_key, "registry entry points at a missing path");
                continue;
            }

            let key = PluginKey::parse(plugin_key);
            let found = discover::scan_tree(&record.install_path);

            if found.is_empty() {
                // No metadata-bearing subdirectory: show the plugin itself.
                skills.push(SkillDescriptor {
                    id: plugin_key.clone(),
                    name: key.name.clone(),
                    description: format!(
                        "Plugin from {}",
                        key.namespace.as_deref().unwrap_or("unknown")
                    ),
                    path: record.install_path.clone(),
                    is_valid: true,
                    is_installed: true,
                });
                continue;
            }

            for mut descriptor in found {
                descriptor.id = format!("{plugin_key}::{}", descriptor.id);
                descriptor.is_installed = true;
                skills.push(descriptor);
            }
        }

        Ok(skills)
    }

    async fn uninstall(&self, package_key: &str) -> anyhow::Result<UninstallOutcome> {
        self.sync.uninstall(package_key).await
    }

    fn config(&self) -> ConfigView {
        let paths = self.sync.paths();
        ConfigView {
            skill_dir: paths.marketplace_root.clone(),
            cache_dir: paths.cache_root.clone(),
            plugins_file: paths.registry_file.clone(),
        }
    }
}

/// Where a zip upload gets extracted: a sibling directory named after the
/// file stem (`demo.zip` → `demo/`).
fn extraction_dir(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    archive.with_file_name(stem)
}

use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Namespace recorded for every package installed through this tool.
/// Uninstall refuses to touch packages from any other namespace.
pub const SOURCE_NAMESPACE: &str = "anthropic-agent-skills";

/// Version sentinel used until real version resolution exists.
pub const VERSION_SENTINEL: &str = "unknown";

/// Schema version of the registry document.
pub const REGISTRY_VERSION: u32 = 2;

// ── Package identity ─────────────────────────────────────────────────────────

/// Composite package identity `<name>@<namespace>`.
///
/// Registry-view descriptor ids take the form `<name>@<namespace>::<skillId>`;
/// [`PluginKey::parse`] accepts both shapes. A bare name (no `@`) has no
/// namespace and is treated as local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginKey {
    pub name: String,
    pub namespace: Option<String>,
}

impl PluginKey {
    /// Key for a package installed by this tool.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(SOURCE_NAMESPACE.to_string()),
        }
    }

    /// Parse a raw key, stripping a trailing `::<skillId>` component first.
    pub fn parse(raw: &str) -> Self {
        let key = raw.split_once("::").map_or(raw, |(key, _)| key);
        match key.split_once('@') {
            Some((name, namespace)) if !namespace.is_empty() => Self {
                name: name.to_string(),
                namespace: Some(namespace.to_string()),
            },
            Some((name, _)) => Self {
                name: name.to_string(),
                namespace: None,
            },
            None => Self {
                name: key.to_string(),
                namespace: None,
            },
        }
    }

    /// True unless the key carries a foreign namespace.
    pub fn is_local(&self) -> bool {
        self.namespace
            .as_deref()
            .is_none_or(|ns| ns == SOURCE_NAMESPACE)
    }

    /// The string form used as the registry's primary key.
    pub fn registry_key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}@{}", self.name, ns),
            None => self.name.clone(),
        }
    }
}

// ── Descriptors ──────────────────────────────────────────────────────────────

/// One discoverable package, produced transiently per discovery call.
/// Field names follow the request-layer wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDescriptor {
    /// Directory name, or `<pluginKey>::<directoryName>` for registry views.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Absolute location of the package root.
    pub path: PathBuf,
    /// True iff a metadata file was present and readable.
    pub is_valid: bool,
    /// True iff the descriptor came from the registry view.
    #[serde(default)]
    pub is_installed: bool,
}

// ── Registry document ────────────────────────────────────────────────────────

/// The `installed_plugins.json` document.
///
/// Each key maps to a non-empty ordered record sequence. This tool only ever
/// writes single-element sequences (reinstall replaces), but tolerates longer
/// ones written by other processes and treats the first record as canonical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    pub version: u32,
    #[serde(default)]
    pub plugins: BTreeMap<String, Vec<InstallRecord>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION,
            plugins: BTreeMap::new(),
        }
    }
}

impl Registry {
    /// Canonical record for a key: the first element of its sequence.
    pub fn first_record(&self, key: &str) -> Option<&InstallRecord> {
        self.plugins.get(key).and_then(|records| records.first())
    }
}

/// One install record under a [`PluginKey`] in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRecord {
    /// Install scope; always `"user"` in this design.
    pub scope: String,
    /// Absolute path to the cache-root copy.
    pub install_path: PathBuf,
    /// Opaque version string; fixed to [`VERSION_SENTINEL`].
    pub version: String,
    /// UTC, millisecond-truncated ISO-8601.
    pub installed_at: String,
    pub last_updated: String,
    /// Sideloaded rather than fetched from a remote source.
    pub is_local: bool,
}

impl InstallRecord {
    /// Record for a freshly sideloaded package, timestamped now.
    pub fn local(install_path: PathBuf) -> Self {
        let now = utc_timestamp_millis();
        Self {
            scope: "user".to_string(),
            install_path,
            version: VERSION_SENTINEL.to_string(),
            installed_at: now.clone(),
            last_updated: now,
            is_local: true,
        }
    }
}

/// Current UTC time as millisecond-truncated ISO-8601 (`...T..:..:..\.123Z`).
pub fn utc_timestamp_millis() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

// ── Operation outcomes ───────────────────────────────────────────────────────

/// Per-item outcome of a batch install. Batches are best-effort: one failed
/// or missing source never aborts the rest.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum InstallOutcome {
    Installed { name: String },
    SkippedMissing { path: PathBuf },
    Failed { path: PathBuf, reason: String },
}

/// Outcome of an uninstall request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum UninstallOutcome {
    /// At least one mirrored directory was removed.
    Removed { name: String },
    /// Neither mirror existed (registry entry, if any, was still dropped).
    NotFound,
    /// The key carries a foreign namespace; nothing was touched.
    Forbidden { namespace: String },
}

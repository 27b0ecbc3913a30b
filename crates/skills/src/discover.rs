use std::path::{Path, PathBuf};

use crate::{
    parse::{self, SkillMetadata},
    types::SkillDescriptor,
};

/// Check a single candidate directory for a skill.
///
/// Produces one descriptor when the metadata file sits directly inside it,
/// nothing otherwise. An absent metadata file is not an error; the caller
/// may recurse into subdirectories separately via [`scan_tree`].
pub fn scan_dir(dir: &Path) -> Option<SkillDescriptor> {
    let meta = parse::read_metadata(dir)?;
    Some(descriptor(dir, meta))
}

/// Recursively walk `root` and return one descriptor per metadata-bearing
/// directory, keyed by that directory's name.
///
/// The root itself is included when it directly contains the metadata file.
/// Directories are visited depth-first in lexical order so repeated runs
/// over the same tree produce identical output.
pub fn scan_tree(root: &Path) -> Vec<SkillDescriptor> {
    let mut skills = Vec::new();
    if !root.is_dir() {
        return skills;
    }
    walk(root, &mut skills);
    skills
}

fn walk(dir: &Path, skills: &mut Vec<SkillDescriptor>) {
    if let Some(descriptor) = scan_dir(dir) {
        skills.push(descriptor);
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), %e, "failed to read directory during scan");
            return;
        },
    };

    let mut subdirs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();

    for subdir in subdirs {
        walk(&subdir, skills);
    }
}

fn descriptor(dir: &Path, meta: SkillMetadata) -> SkillDescriptor {
    let path = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    SkillDescriptor {
        id: parse::dir_name(dir),
        name: meta.name,
        description: meta.description,
        path,
        is_valid: true,
        is_installed: false,
    }
}

use std::path::Path;

use serde::Deserialize;

/// File identifying a directory as a skill package.
pub const METADATA_FILE: &str = "SKILL.md";

/// Placeholder used when a metadata file carries no description.
pub const DEFAULT_DESCRIPTION: &str = "No description found.";

/// Display metadata extracted from a skill's `SKILL.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillMetadata {
    pub name: String,
    pub description: String,
}

/// Well-formed YAML front-matter fields we care about. Everything else in
/// the front-matter is ignored.
#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Parse metadata from `SKILL.md` content.
///
/// YAML front-matter is used when present and well-formed; otherwise a
/// tolerant case-insensitive `key: value` line scan over the whole text.
/// Never fails: `name` falls back to `fallback_name` (the containing
/// directory) and `description` to [`DEFAULT_DESCRIPTION`].
pub fn parse_metadata(content: &str, fallback_name: &str) -> SkillMetadata {
    let mut parsed = front_matter(content)
        .map(parse_front_matter)
        .unwrap_or_default();

    // Fill anything the front-matter didn't provide from a line scan.
    if parsed.name.is_none() || parsed.description.is_none() {
        let scanned = scan_lines(content);
        parsed.name = parsed.name.or(scanned.name);
        parsed.description = parsed.description.or(scanned.description);
    }

    SkillMetadata {
        name: parsed.name.unwrap_or_else(|| fallback_name.to_string()),
        description: parsed
            .description
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
    }
}

/// Read and parse `<skill_dir>/SKILL.md`.
///
/// Returns `None` when the file is missing or unreadable; malformed content
/// is not an error and degrades to defaults via [`parse_metadata`].
pub fn read_metadata(skill_dir: &Path) -> Option<SkillMetadata> {
    let path = skill_dir.join(METADATA_FILE);
    if !path.is_file() {
        return None;
    }
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), %e, "failed to read SKILL.md");
            return None;
        },
    };
    Some(parse_metadata(&content, &dir_name(skill_dir)))
}

/// Directory name of a skill path, for descriptor ids and name fallback.
pub fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parse_front_matter(block: &str) -> FrontMatter {
    let parsed: FrontMatter = serde_yaml::from_str(block).unwrap_or_default();
    FrontMatter {
        name: parsed.name.filter(|v| !v.is_empty()),
        description: parsed.description.filter(|v| !v.is_empty()),
    }
}

/// Case-insensitive line scan for `name:` / `description:`; first match per
/// key wins.
fn scan_lines(content: &str) -> FrontMatter {
    let mut result = FrontMatter::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "name" if result.name.is_none() => result.name = Some(value.to_string()),
            "description" if result.description.is_none() => {
                result.description = Some(value.to_string());
            },
            _ => {},
        }
        if result.name.is_some() && result.description.is_some() {
            break;
        }
    }
    result
}

/// Extract the front-matter block from content delimited by `---` lines.
fn front_matter(content: &str) -> Option<&str> {
    let trimmed = content.trim_start();
    let after_open = trimmed.strip_prefix("---")?;
    let close = after_open.find("\n---")?;
    Some(after_open[..close].trim())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_front_matter() {
        let content = "---\nname: Demo\ndescription: A test.\n---\n# Body\n";
        let meta = parse_metadata(content, "demo-skill");
        assert_eq!(meta.name, "Demo");
        assert_eq!(meta.description, "A test.");
    }

    #[test]
    fn test_parse_without_front_matter() {
        let content = "# Demo skill\nName: Demo\nDescription: Does things.\n";
        let meta = parse_metadata(content, "demo-skill");
        assert_eq!(meta.name, "Demo");
        assert_eq!(meta.description, "Does things.");
    }

    #[test]
    fn test_parse_defaults_when_keys_missing() {
        let meta = parse_metadata("just some markdown\n", "demo-skill");
        assert_eq!(meta.name, "demo-skill");
        assert_eq!(meta.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_parse_malformed_front_matter_falls_back_to_scan() {
        // Unclosed bracket makes the YAML invalid; the line scan still finds
        // the keys.
        let content = "---\nname: Demo\ntags: [broken\ndescription: Still found.\n---\n";
        let meta = parse_metadata(content, "demo-skill");
        assert_eq!(meta.name, "Demo");
        assert_eq!(meta.description, "Still found.");
    }

    #[test]
    fn test_parse_case_insensitive_keys() {
        let content = "NAME: Loud\nDESCRIPTION: Shouty.\n";
        let meta = parse_metadata(content, "fallback");
        assert_eq!(meta.name, "Loud");
        assert_eq!(meta.description, "Shouty.");
    }

    #[test]
    fn test_parse_first_match_wins() {
        let content = "name: First\nname: Second\n";
        let meta = parse_metadata(content, "fallback");
        assert_eq!(meta.name, "First");
    }

    #[test]
    fn test_front_matter_missing_key_filled_from_body() {
        let content = "---\nname: Demo\n---\ndescription: From the body.\n";
        let meta = parse_metadata(content, "demo-skill");
        assert_eq!(meta.name, "Demo");
        assert_eq!(meta.description, "From the body.");
    }

    #[test]
    fn test_read_metadata_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(read_metadata(tmp.path()).is_none());
    }

    #[test]
    fn test_read_metadata_defaults_to_dir_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("my-skill");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(METADATA_FILE), "no keys here\n").unwrap();
        let meta = read_metadata(&dir).unwrap();
        assert_eq!(meta.name, "my-skill");
        assert_eq!(meta.description, DEFAULT_DESCRIPTION);
    }
}

//! Skill package installation: discovery, metadata parsing, the install
//! registry, and mirrored install/uninstall across the marketplace and
//! cache roots.
//!
//! Skills are directories identified by a `SKILL.md` metadata file. The
//! registry (`installed_plugins.json`) is the single source of truth for
//! what is installed; the two directory roots are best-effort mirrors.

pub mod discover;
pub mod extract;
pub mod install;
pub mod parse;
pub mod registry;
pub mod service;
pub mod types;

//! Registry of the JUnit artifacts the launcher knows by name.
//!
//! This module is the single source of truth for Maven coordinates: a stable identifier ([`GroupArtifact`]) plus a
//! const metadata table ([`ARTIFACTS`]) recording group, artifact, module name and version key of every entry.
//!
//! ## Notes
//! - The table is ordered like the [`GroupArtifact`] enum; [`info_for`] relies on that ordering.
//! - Version defaults mirror the JUnit release the launcher was last aligned with.
//!
//! ## Examples
//! ```rust
//! use junit_launch_core::artifacts::{self, GroupArtifact, VersionKey};
//!
//! assert_eq!(GroupArtifact::JupiterApi.identifier(), "org.junit.jupiter:junit-jupiter-api");
//! assert_eq!(artifacts::from_identifier("junit:junit"), Some(GroupArtifact::Junit4));
//! assert_eq!(VersionKey::Platform.key(), "junit.platform.version");
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier for every known artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupArtifact {
    // Jupiter
    JupiterApi,
    JupiterEngine,
    JupiterParams,
    JupiterMigrationSupport,
    /// `org.junit.jupiter:junit-jupiter`, the aggregate artifact.
    Jupiter,

    // Platform
    PlatformCommons,
    PlatformEngine,
    PlatformLauncher,
    PlatformConsole,
    PlatformReporting,

    // Vintage
    VintageEngine,
    /// `junit:junit`, the JUnit 3/4 API.
    Junit4,

    // Isolation
    IsolatorWorker,
}

/// Metadata for an artifact.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactInfo {
    pub id: GroupArtifact,
    pub group: &'static str,
    pub artifact: &'static str,
    /// Module name the artifact declares or is known by, if any.
    pub module: Option<&'static str>,
    /// Version key used to pick the artifact's version; `None` for artifacts the launcher never resolves itself.
    pub version: Option<VersionKey>,
}

pub const ARTIFACTS: &[ArtifactInfo] = &[
    // Jupiter
    info(
        GroupArtifact::JupiterApi,
        "org.junit.jupiter",
        "junit-jupiter-api",
        Some("org.junit.jupiter.api"),
        Some(VersionKey::Jupiter),
    ),
    info(
        GroupArtifact::JupiterEngine,
        "org.junit.jupiter",
        "junit-jupiter-engine",
        Some("org.junit.jupiter.engine"),
        Some(VersionKey::Jupiter),
    ),
    info(
        GroupArtifact::JupiterParams,
        "org.junit.jupiter",
        "junit-jupiter-params",
        Some("org.junit.jupiter.params"),
        Some(VersionKey::Jupiter),
    ),
    info(
        GroupArtifact::JupiterMigrationSupport,
        "org.junit.jupiter",
        "junit-jupiter-migrationsupport",
        Some("org.junit.jupiter.migrationsupport"),
        Some(VersionKey::Jupiter),
    ),
    info(
        GroupArtifact::Jupiter,
        "org.junit.jupiter",
        "junit-jupiter",
        Some("org.junit.jupiter"),
        Some(VersionKey::Jupiter),
    ),
    // Platform
    info(
        GroupArtifact::PlatformCommons,
        "org.junit.platform",
        "junit-platform-commons",
        Some("org.junit.platform.commons"),
        Some(VersionKey::Platform),
    ),
    info(
        GroupArtifact::PlatformEngine,
        "org.junit.platform",
        "junit-platform-engine",
        Some("org.junit.platform.engine"),
        Some(VersionKey::Platform),
    ),
    info(
        GroupArtifact::PlatformLauncher,
        "org.junit.platform",
        "junit-platform-launcher",
        Some("org.junit.platform.launcher"),
        Some(VersionKey::Platform),
    ),
    info(
        GroupArtifact::PlatformConsole,
        "org.junit.platform",
        "junit-platform-console",
        Some("org.junit.platform.console"),
        Some(VersionKey::Platform),
    ),
    info(
        GroupArtifact::PlatformReporting,
        "org.junit.platform",
        "junit-platform-reporting",
        Some("org.junit.platform.reporting"),
        Some(VersionKey::Platform),
    ),
    // Vintage
    info(
        GroupArtifact::VintageEngine,
        "org.junit.vintage",
        "junit-vintage-engine",
        Some("org.junit.vintage.engine"),
        Some(VersionKey::Vintage),
    ),
    info(GroupArtifact::Junit4, "junit", "junit", Some("junit"), None),
    // Isolation
    info(
        GroupArtifact::IsolatorWorker,
        "de.sormuras.junit",
        "junit-platform-isolator-worker",
        Some("de.sormuras.junit.platform.isolator.worker"),
        Some(VersionKey::Isolator),
    ),
];

/// Artifacts a patched main module is made to read, when present in the project.
pub const PATCH_READ_TARGETS: &[GroupArtifact] = &[
    GroupArtifact::JupiterApi,
    GroupArtifact::JupiterParams,
    GroupArtifact::JupiterMigrationSupport,
    GroupArtifact::Junit4,
];

/// Module every package of a patched main module is opened to.
pub const PATCH_OPENS_TARGET: &str = "org.junit.platform.commons";

impl GroupArtifact {
    pub fn info(self) -> &'static ArtifactInfo {
        info_for(self)
    }

    /// `group:artifact`, the key used by project artifact maps.
    pub fn identifier(self) -> String {
        let info = self.info();
        format!("{}:{}", info.group, info.artifact)
    }

    /// `group:artifact:version`.
    pub fn coordinates(self, version: &str) -> String {
        format!("{}:{}", self.identifier(), version)
    }

    pub fn module(self) -> Option<&'static str> {
        self.info().module
    }

    pub fn version_key(self) -> Option<VersionKey> {
        self.info().version
    }
}

impl fmt::Display for GroupArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.info();
        write!(f, "{}:{}", info.group, info.artifact)
    }
}

/// Metadata for an artifact.
///
/// ## Notes
/// - Indexing by discriminant is checked by the registry guard tests.
pub fn info_for(id: GroupArtifact) -> &'static ArtifactInfo {
    &ARTIFACTS[id as usize]
}

/// Lookup by `group:artifact` identifier.
pub fn from_identifier(identifier: &str) -> Option<GroupArtifact> {
    ARTIFACTS
        .iter()
        .find(|info| {
            identifier
                .split_once(':')
                .is_some_and(|(group, artifact)| group == info.group && artifact == info.artifact)
        })
        .map(|info| info.id)
}

/// Version property key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionKey {
    Jupiter,
    Platform,
    Vintage,
    Isolator,
}

pub const VERSION_KEYS: &[VersionKey] = &[
    VersionKey::Jupiter,
    VersionKey::Platform,
    VersionKey::Vintage,
    VersionKey::Isolator,
];

impl VersionKey {
    /// Property spelling, e.g. `junit.jupiter.version`.
    pub fn key(self) -> &'static str {
        match self {
            VersionKey::Jupiter => "junit.jupiter.version",
            VersionKey::Platform => "junit.platform.version",
            VersionKey::Vintage => "junit.vintage.version",
            VersionKey::Isolator => "junit.isolator.version",
        }
    }

    pub fn default_version(self) -> &'static str {
        match self {
            VersionKey::Jupiter => "5.3.1",
            VersionKey::Platform => "1.3.1",
            VersionKey::Vintage => "5.3.1",
            VersionKey::Isolator => "1.0.0-M10",
        }
    }

    /// Artifacts whose version, when known, determines this key; earlier entries win.
    pub fn detected_from(self) -> &'static [GroupArtifact] {
        match self {
            VersionKey::Jupiter => &[GroupArtifact::JupiterEngine, GroupArtifact::JupiterApi],
            VersionKey::Platform => &[GroupArtifact::PlatformCommons],
            VersionKey::Vintage => &[GroupArtifact::VintageEngine],
            VersionKey::Isolator => &[GroupArtifact::IsolatorWorker],
        }
    }

    /// Lookup by property spelling.
    pub fn lookup(key: &str) -> Option<VersionKey> {
        VERSION_KEYS.iter().copied().find(|k| k.key() == key)
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Build the version of every [`VersionKey`].
///
/// ## Parameters
/// - `lookup`: maps a `group:artifact` identifier to the version the project uses, if any.
///
/// ## Returns
/// - One entry per key: the version of the first [`VersionKey::detected_from`] artifact the lookup knows, else the
///   key's default.
pub fn artifact_version_map<F>(lookup: F) -> BTreeMap<VersionKey, String>
where
    F: Fn(&str) -> Option<String>,
{
    VERSION_KEYS
        .iter()
        .map(|key| {
            let version = key
                .detected_from()
                .iter()
                .find_map(|artifact| lookup(&artifact.identifier()))
                .unwrap_or_else(|| key.default_version().to_string());
            (*key, version)
        })
        .collect()
}

// --- helpers -----------------------------------------------------------------

const fn info(
    id: GroupArtifact,
    group: &'static str,
    artifact: &'static str,
    module: Option<&'static str>,
    version: Option<VersionKey>,
) -> ArtifactInfo {
    ArtifactInfo {
        id,
        group,
        artifact,
        module,
        version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_map_prefers_engine_over_api() {
        let map = artifact_version_map(|id| match id {
            "org.junit.jupiter:junit-jupiter-api" => Some("5.2.0".to_string()),
            "org.junit.jupiter:junit-jupiter-engine" => Some("5.3.0".to_string()),
            _ => None,
        });
        assert_eq!(map[&VersionKey::Jupiter], "5.3.0");
    }

    #[test]
    fn version_map_falls_back_to_defaults() {
        let map = artifact_version_map(|_| None);
        assert_eq!(map[&VersionKey::Jupiter], "5.3.1");
        assert_eq!(map[&VersionKey::Platform], "1.3.1");
        assert_eq!(map[&VersionKey::Vintage], "5.3.1");
        assert_eq!(map.len(), VERSION_KEYS.len());
    }

    #[test]
    fn coordinates_append_version() {
        assert_eq!(
            GroupArtifact::PlatformLauncher.coordinates("1.3.1"),
            "org.junit.platform:junit-platform-launcher:1.3.1"
        );
    }

    #[test]
    fn junit4_has_no_managed_version() {
        assert_eq!(GroupArtifact::Junit4.version_key(), None);
        assert_eq!(GroupArtifact::Junit4.module(), Some("junit"));
    }
}

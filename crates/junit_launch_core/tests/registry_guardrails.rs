use std::collections::HashMap;

use junit_launch_core::artifacts::{self, ARTIFACTS, GroupArtifact, VERSION_KEYS, VersionKey};
use junit_launch_core::isolation::{ALL_LAYERS, DEFAULT_PRECEDENCE, Isolation, LayerName};
use junit_launch_core::mode::{ALL_MODES, TestMode};

#[test]
fn artifact_table_is_indexed_by_discriminant() {
    for (index, info) in ARTIFACTS.iter().enumerate() {
        assert_eq!(
            info.id as usize, index,
            "artifact table out of order at {index}: {:?}",
            info.id
        );
        assert_eq!(artifacts::info_for(info.id).artifact, info.artifact);
    }
}

#[test]
fn artifact_identifiers_unique_and_resolvable() {
    let mut seen: HashMap<String, GroupArtifact> = HashMap::new();

    for info in ARTIFACTS {
        let identifier = info.id.identifier();
        assert_eq!(
            artifacts::from_identifier(&identifier),
            Some(info.id),
            "artifact identifier not resolvable: {identifier}"
        );
        if let Some(prev) = seen.insert(identifier.clone(), info.id) {
            panic!("duplicate artifact identifier {identifier:?}: {prev:?} and {:?}", info.id);
        }
    }
}

#[test]
fn artifact_module_names_unique() {
    let mut seen: HashMap<&'static str, GroupArtifact> = HashMap::new();

    for info in ARTIFACTS {
        let Some(module) = info.module else { continue };
        if let Some(prev) = seen.insert(module, info.id) {
            panic!("duplicate module name {module:?}: {prev:?} and {:?}", info.id);
        }
    }
}

#[test]
fn version_keys_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, VersionKey> = HashMap::new();

    for key in VERSION_KEYS {
        assert_eq!(VersionKey::lookup(key.key()), Some(*key));
        assert!(!key.default_version().is_empty(), "{key} has no default version");
        assert!(!key.detected_from().is_empty(), "{key} is detected from nothing");
        for artifact in key.detected_from() {
            assert_eq!(
                artifact.version_key(),
                Some(*key),
                "{artifact} detects {key} but is versioned by another key"
            );
        }
        if let Some(prev) = seen.insert(key.key(), *key) {
            panic!("duplicate version key {:?}: {prev:?} and {key:?}", key.key());
        }
    }
}

#[test]
fn mode_names_unique() {
    let mut seen: HashMap<&'static str, TestMode> = HashMap::new();

    for mode in ALL_MODES {
        if let Some(prev) = seen.insert(mode.as_str(), *mode) {
            panic!("duplicate mode name {:?}: {prev:?} and {mode:?}", mode.as_str());
        }
    }
    assert_eq!(seen.len(), 5);
}

#[test]
fn every_layer_has_a_precedence_rank() {
    for layer in ALL_LAYERS {
        assert!(DEFAULT_PRECEDENCE.contains(layer), "{layer} missing from default precedence");
    }
    for isolation in [Isolation::Absolute, Isolation::Almost, Isolation::Merged, Isolation::None] {
        for layer in isolation.layer_names() {
            assert!(DEFAULT_PRECEDENCE.contains(layer), "{isolation} produces unranked {layer}");
        }
    }
    assert_eq!(DEFAULT_PRECEDENCE.first(), Some(&LayerName::Main));
    assert_eq!(DEFAULT_PRECEDENCE.last(), Some(&LayerName::Isolator));
}

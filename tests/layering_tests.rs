//! Path layering against a fixed project and a static resolver.

use std::collections::BTreeMap;

use junit_launch::config::Tweaks;
use junit_launch::layering::{LayeringError, PathLayeringEngine, RuntimeComponents};
use junit_launch::project::{ArtifactRecord, Versions};
use junit_launch::resolver::{ResolvedArtifact, StaticResolver};
use junit_launch::{ExecutorKind, Isolation, LayerName, PathLayering, Precedence, ProjectModel};

const API: &str = "/m2/junit-jupiter-api-5.3.1.jar";
const LIB: &str = "/m2/lib-1.0.jar";

fn artifact(identifier: &str, file: &str) -> ResolvedArtifact {
    let (group, artifact) = identifier.split_once(':').unwrap();
    ResolvedArtifact {
        group_id: group.to_string(),
        artifact_id: artifact.to_string(),
        version: "1".to_string(),
        file: file.into(),
    }
}

fn project() -> ProjectModel {
    let mut project = ProjectModel::conventional("/p");
    project.compile_classpath = vec!["/p/target/classes".into(), LIB.into()];
    project.test_classpath = vec![
        "/p/target/test-classes".into(),
        "/p/target/classes".into(),
        LIB.into(),
        API.into(),
    ];
    project.artifacts.insert(
        "org.junit.jupiter:junit-jupiter-api".to_string(),
        ArtifactRecord {
            version: "5.3.1".to_string(),
            file: API.into(),
        },
    );
    project
}

fn resolver() -> StaticResolver {
    let mut resolver = StaticResolver::default();
    resolver.insert(
        "org.junit.platform:junit-platform-launcher",
        vec![artifact("org.junit.platform:junit-platform-launcher", "/m2/launcher.jar")],
    );
    resolver.insert(
        "org.junit.platform:junit-platform-console",
        vec![artifact("org.junit.platform:junit-platform-console", "/m2/console.jar")],
    );
    resolver.insert(
        "org.junit.jupiter:junit-jupiter-engine",
        vec![
            artifact("org.junit.jupiter:junit-jupiter-engine", "/m2/jupiter-engine.jar"),
            artifact("org.junit.platform:junit-platform-engine", "/m2/platform-engine.jar"),
            artifact("org.junit.jupiter:junit-jupiter-api", API),
        ],
    );
    resolver.insert(
        "de.sormuras.junit:junit-platform-isolator-worker",
        vec![artifact("de.sormuras.junit:junit-platform-isolator-worker", "/m2/worker.jar")],
    );
    resolver
}

fn build_with(
    project: &ProjectModel,
    resolver: &StaticResolver,
    tweaks: &Tweaks,
    isolation: Isolation,
    executor: ExecutorKind,
) -> Result<PathLayering, LayeringError> {
    let versions = Versions::resolve(project, &BTreeMap::new());
    PathLayeringEngine::new(project, &versions, resolver).build(
        tweaks,
        isolation,
        RuntimeComponents::for_executor(executor),
        &Precedence::default(),
    )
}

fn build(isolation: Isolation, executor: ExecutorKind) -> PathLayering {
    build_with(&project(), &resolver(), &Tweaks::default(), isolation, executor).unwrap()
}

fn paths(layering: &PathLayering, name: LayerName) -> Vec<String> {
    layering
        .get(name)
        .map(|set| set.iter().map(|p| p.display().to_string()).collect())
        .unwrap_or_default()
}

#[test]
fn absolute_isolation_keeps_four_disjoint_layers() {
    let layering = build(Isolation::Absolute, ExecutorKind::Java);
    assert_eq!(layering.names(), vec![LayerName::Main, LayerName::Test, LayerName::Launcher]);
    assert_eq!(paths(&layering, LayerName::Main), ["/p/target/classes", LIB]);
    assert_eq!(paths(&layering, LayerName::Test), ["/p/target/test-classes", API]);
    // the engine closure repeats the API jar, which `test` owns
    assert_eq!(
        paths(&layering, LayerName::Launcher),
        ["/m2/launcher.jar", "/m2/console.jar", "/m2/jupiter-engine.jar", "/m2/platform-engine.jar"]
    );
}

#[test]
fn direct_executor_resolves_the_worker_instead_of_the_console() {
    let layering = build(Isolation::Absolute, ExecutorKind::Direct);
    assert!(!paths(&layering, LayerName::Launcher).contains(&"/m2/console.jar".to_string()));
    assert_eq!(paths(&layering, LayerName::Isolator), ["/m2/worker.jar"]);
}

#[test]
fn almost_isolation_moves_main_output_into_test() {
    let layering = build(Isolation::Almost, ExecutorKind::Java);
    assert_eq!(paths(&layering, LayerName::Main), [LIB]);
    assert_eq!(
        paths(&layering, LayerName::Test),
        ["/p/target/test-classes", API, "/p/target/classes"]
    );
}

#[test]
fn merged_isolation_puts_test_before_main() {
    let layering = build(Isolation::Merged, ExecutorKind::Java);
    assert_eq!(layering.names(), vec![LayerName::Merged, LayerName::Launcher]);
    assert_eq!(
        paths(&layering, LayerName::Merged),
        ["/p/target/test-classes", API, "/p/target/classes", LIB]
    );
}

#[test]
fn no_isolation_is_the_union_of_all_layers() {
    let absolute = build(Isolation::Absolute, ExecutorKind::Direct);
    let none = build(Isolation::None, ExecutorKind::Direct);
    assert_eq!(none.names(), vec![LayerName::All]);
    let mut union: Vec<String> = absolute.all_paths().iter().map(|p| p.display().to_string()).collect();
    let mut all = paths(&none, LayerName::All);
    union.sort();
    all.sort();
    assert_eq!(all, union);
}

#[test]
fn excludes_remove_artifacts_from_every_layer() {
    let tweaks = Tweaks {
        dependency_excludes: vec![
            "org.junit.platform:junit-platform-console".to_string(),
            "org.junit.jupiter:junit-jupiter-api".to_string(),
        ],
        ..Tweaks::default()
    };
    let layering = build_with(&project(), &resolver(), &tweaks, Isolation::Absolute, ExecutorKind::Java).unwrap();
    let all: Vec<String> = layering.all_paths().iter().map(|p| p.display().to_string()).collect();
    assert!(!all.contains(&"/m2/console.jar".to_string()));
    assert!(!all.contains(&API.to_string()));
}

#[test]
fn components_in_the_project_are_not_resolved() {
    let mut project = project();
    project.artifacts.insert(
        "org.junit.platform:junit-platform-launcher".to_string(),
        ArtifactRecord {
            version: "1.3.1".to_string(),
            file: "/m2/own-launcher.jar".into(),
        },
    );
    let layering = build_with(&project, &resolver(), &Tweaks::default(), Isolation::Absolute, ExecutorKind::Java).unwrap();
    assert!(!paths(&layering, LayerName::Launcher).contains(&"/m2/launcher.jar".to_string()));
}

#[test]
fn extra_path_elements_and_dependencies_are_layered() {
    let mut resolver = resolver();
    resolver.insert("org.assertj:assertj-core:3.11.1", vec![artifact("org.assertj:assertj-core", "/m2/assertj.jar")]);
    let tweaks = Tweaks {
        additional_test_path_elements: vec!["/extra/test".into()],
        additional_launcher_path_elements: vec!["/extra/launcher".into()],
        additional_test_dependencies: vec!["org.assertj:assertj-core:3.11.1".to_string()],
        ..Tweaks::default()
    };
    let layering = build_with(&project(), &resolver, &tweaks, Isolation::Absolute, ExecutorKind::Java).unwrap();
    assert_eq!(
        paths(&layering, LayerName::Test),
        ["/p/target/test-classes", API, "/extra/test", "/m2/assertj.jar"]
    );
    assert_eq!(paths(&layering, LayerName::Launcher)[0], "/extra/launcher");
}

#[test]
fn unavailable_runtime_component_is_fatal() {
    let err = build_with(
        &project(),
        &StaticResolver::default(),
        &Tweaks::default(),
        Isolation::Absolute,
        ExecutorKind::Java,
    )
    .unwrap_err();
    match err {
        LayeringError::RuntimeUnavailable { layer, coordinates } => {
            assert_eq!(layer, LayerName::Launcher);
            assert_eq!(coordinates, "org.junit.platform:junit-platform-launcher:1.3.1");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_extra_dependency_is_a_resolution_error() {
    let tweaks = Tweaks {
        additional_launcher_dependencies: vec!["not-coordinates".to_string()],
        ..Tweaks::default()
    };
    let err = build_with(&project(), &resolver(), &tweaks, Isolation::Absolute, ExecutorKind::Java).unwrap_err();
    assert!(matches!(err, LayeringError::Resolution { layer: LayerName::Launcher, .. }));
}

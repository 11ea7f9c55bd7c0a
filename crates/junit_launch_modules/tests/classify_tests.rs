mod support;

use std::collections::BTreeSet;
use std::fs;

use junit_launch_modules::{ClassifyError, classify, classfile, find_modules};
use support::{ModuleInfo, manifest, write_classes, write_jar};
use tempfile::TempDir;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn parses_compiled_declaration() {
    let bytes = ModuleInfo::new("com.example.app")
        .requires("org.slf4j")
        .exports("com.example.app.api")
        .package("com.example.app.internal")
        .to_bytes();
    let descriptor = classfile::parse_module_info(&bytes).unwrap();

    assert_eq!(descriptor.name, "com.example.app");
    assert_eq!(descriptor.requires, vec!["java.base", "org.slf4j"]);
    assert_eq!(descriptor.packages, set(&["com.example.app.api", "com.example.app.internal"]));
    assert!(!descriptor.is_open);
    assert!(!descriptor.is_automatic);
}

#[test]
fn open_flag_is_read() {
    let descriptor = classfile::parse_module_info(&ModuleInfo::new("foo").open().to_bytes()).unwrap();
    assert!(descriptor.is_open);
}

#[test]
fn missing_directory_is_classic() {
    let temp = TempDir::new().unwrap();
    assert_eq!(classify(&temp.path().join("does-not-exist")).unwrap(), None);
}

#[test]
fn plain_class_output_is_classic() {
    let temp = TempDir::new().unwrap();
    write_classes(temp.path(), &["com.example.Foo", "com.example.util.Bar"]);
    assert_eq!(classify(temp.path()).unwrap(), None);
}

#[test]
fn exploded_module_reports_name_and_packages() {
    let temp = TempDir::new().unwrap();
    ModuleInfo::new("app").exports("app.api").write_exploded(temp.path(), &["app.api.Api", "app.internal.Impl"]);

    let descriptor = classify(temp.path()).unwrap().unwrap();
    assert_eq!(descriptor.name, "app");
    assert_eq!(descriptor.packages, set(&["app.api", "app.internal"]));
}

#[test]
fn automatic_name_from_manifest() {
    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("junit-platform-commons-1.2.0.jar");
    write_jar(
        &jar,
        &[
            ("META-INF/MANIFEST.MF", manifest(Some("org.junit.platform.commons"))),
            ("org/junit/platform/commons/util/Preconditions.class", vec![0xCA, 0xFE]),
        ],
    );

    let descriptor = classify(&jar).unwrap().unwrap();
    assert_eq!(descriptor.name, "org.junit.platform.commons");
    assert!(descriptor.is_automatic);
    assert_eq!(descriptor.packages, set(&["org.junit.platform.commons.util"]));
}

#[test]
fn automatic_name_from_file_name() {
    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("slf4j-api-1.7.25.jar");
    write_jar(&jar, &[("META-INF/MANIFEST.MF", manifest(None))]);

    let descriptor = classify(&jar).unwrap().unwrap();
    assert_eq!(descriptor.name, "slf4j.api");
    assert!(descriptor.is_automatic);
}

#[test]
fn explicit_module_in_jar() {
    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("slf4j-api-1.8.0-beta2.jar");
    write_jar(
        &jar,
        &[
            ("module-info.class", ModuleInfo::new("org.slf4j").exports("org.slf4j").to_bytes()),
            ("org/slf4j/Logger.class", vec![0xCA, 0xFE]),
        ],
    );

    let descriptor = classify(&jar).unwrap().unwrap();
    assert_eq!(descriptor.name, "org.slf4j");
    assert!(!descriptor.is_automatic);
}

#[test]
fn versioned_declaration_in_multi_release_jar() {
    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("multi.jar");
    write_jar(
        &jar,
        &[
            ("META-INF/versions/9/module-info.class", ModuleInfo::new("multi.nine").to_bytes()),
            ("META-INF/versions/11/module-info.class", ModuleInfo::new("multi.eleven").to_bytes()),
            ("multi/Main.class", vec![0xCA, 0xFE]),
        ],
    );

    assert_eq!(classify(&jar).unwrap().unwrap().name, "multi.eleven");
}

#[test]
fn broken_automatic_name_is_no_module() {
    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("broken-name_1.2.3-4.5.6.jar");
    write_jar(&jar, &[("META-INF/MANIFEST.MF", manifest(None))]);

    assert_eq!(classify(&jar).unwrap(), None);
}

#[test]
fn corrupt_declaration_is_no_module() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("module-info.class"), b"not a class file").unwrap();

    assert_eq!(classify(temp.path()).unwrap(), None);
}

#[test]
fn corrupt_jar_is_no_module() {
    let temp = TempDir::new().unwrap();
    let jar = temp.path().join("corrupt.jar");
    fs::write(&jar, b"PK\x03\x04 definitely not a zip").unwrap();

    assert_eq!(classify(&jar).unwrap(), None);
}

#[test]
fn directory_of_modules_with_one_entry() {
    let temp = TempDir::new().unwrap();
    write_jar(
        &temp.path().join("lib-1.0.jar"),
        &[("module-info.class", ModuleInfo::new("lib").to_bytes())],
    );
    fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

    assert_eq!(classify(temp.path()).unwrap().unwrap().name, "lib");
}

#[test]
fn two_modules_in_one_directory_are_ambiguous() {
    let temp = TempDir::new().unwrap();
    ModuleInfo::new("first").write_exploded(&temp.path().join("first"), &["first.A"]);
    write_jar(
        &temp.path().join("second.jar"),
        &[("module-info.class", ModuleInfo::new("second").to_bytes())],
    );

    let err = classify(temp.path()).unwrap_err();
    match err {
        ClassifyError::AmbiguousModule { modules, .. } => assert_eq!(modules, vec!["first", "second"]),
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn find_modules_skips_hidden_and_malformed_entries() {
    let temp = TempDir::new().unwrap();
    write_jar(&temp.path().join(".hidden.jar"), &[("module-info.class", ModuleInfo::new("hidden").to_bytes())]);
    fs::write(temp.path().join("broken.jar"), b"garbage").unwrap();
    write_jar(&temp.path().join("good.jar"), &[("module-info.class", ModuleInfo::new("good").to_bytes())]);

    let modules = find_modules(temp.path()).unwrap();
    let names: Vec<_> = modules.iter().map(|m| m.descriptor.name.as_str()).collect();
    assert_eq!(names, vec!["good"]);
    assert_eq!(modules[0].location, temp.path().join("good.jar"));
}

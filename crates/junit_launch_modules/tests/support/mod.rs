//! Fixture builders: compiled module declarations, jars and output directories.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use zip::ZipWriter;
use zip::write::FileOptions;

/// Builder for a `module-info.class`.
#[derive(Default)]
pub struct ModuleInfo {
    name: String,
    open: bool,
    requires: Vec<String>,
    exports: Vec<String>,
    packages: Vec<String>,
}

impl ModuleInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requires: vec!["java.base".to_string()],
            ..Self::default()
        }
    }

    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    pub fn requires(mut self, module: &str) -> Self {
        self.requires.push(module.to_string());
        self
    }

    pub fn exports(mut self, package: &str) -> Self {
        self.exports.push(package.to_string());
        self
    }

    /// Package listed in the `ModulePackages` attribute.
    pub fn package(mut self, package: &str) -> Self {
        self.packages.push(package.to_string());
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pool = Pool::default();
        let this_class = {
            let name = pool.utf8("module-info");
            pool.push(&tagged(7, name))
        };
        let module_attr = pool.utf8("Module");
        let packages_attr = pool.utf8("ModulePackages");
        let module = pool.module(&self.name);
        let requires: Vec<u16> = self.requires.iter().map(|r| pool.module(r)).collect();
        let exports: Vec<u16> = self.exports.iter().map(|p| pool.package(p)).collect();
        let packages: Vec<u16> = self.packages.iter().map(|p| pool.package(p)).collect();

        let mut body = Vec::new();
        u2(&mut body, module);
        u2(&mut body, if self.open { 0x0020 } else { 0 });
        u2(&mut body, 0);
        u2(&mut body, requires.len() as u16);
        for index in requires {
            u2(&mut body, index);
            u2(&mut body, 0);
            u2(&mut body, 0);
        }
        u2(&mut body, exports.len() as u16);
        for index in exports {
            u2(&mut body, index);
            u2(&mut body, 0);
            u2(&mut body, 0);
        }
        u2(&mut body, 0); // opens
        u2(&mut body, 0); // uses
        u2(&mut body, 0); // provides

        let mut packages_body = Vec::new();
        u2(&mut packages_body, packages.len() as u16);
        for index in packages {
            u2(&mut packages_body, index);
        }

        let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 53];
        u2(&mut out, pool.entries.len() as u16 + 1);
        for entry in &pool.entries {
            out.extend_from_slice(entry);
        }
        u2(&mut out, 0x8000);
        u2(&mut out, this_class);
        u2(&mut out, 0);
        u2(&mut out, 0); // interfaces
        u2(&mut out, 0); // fields
        u2(&mut out, 0); // methods
        u2(&mut out, 2);
        for (name, attribute) in [(module_attr, body), (packages_attr, packages_body)] {
            u2(&mut out, name);
            out.extend_from_slice(&(attribute.len() as u32).to_be_bytes());
            out.extend_from_slice(&attribute);
        }
        out
    }

    /// Write `module-info.class` plus one class per package into `directory`.
    pub fn write_exploded(&self, directory: &Path, classes: &[&str]) {
        fs::create_dir_all(directory).unwrap();
        fs::write(directory.join("module-info.class"), self.to_bytes()).unwrap();
        write_classes(directory, classes);
    }
}

#[derive(Default)]
struct Pool {
    entries: Vec<Vec<u8>>,
}

impl Pool {
    fn push(&mut self, entry: &[u8]) -> u16 {
        self.entries.push(entry.to_vec());
        self.entries.len() as u16
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let mut entry = vec![1];
        u2(&mut entry, value.len() as u16);
        entry.extend_from_slice(value.as_bytes());
        self.push(&entry)
    }

    fn module(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.push(&tagged(19, name))
    }

    fn package(&mut self, name: &str) -> u16 {
        let name = self.utf8(&name.replace('.', "/"));
        self.push(&tagged(20, name))
    }
}

fn tagged(tag: u8, index: u16) -> Vec<u8> {
    let mut entry = vec![tag];
    u2(&mut entry, index);
    entry
}

fn u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write empty `.class` files for fully-qualified class names such as `org.example.Foo`.
pub fn write_classes(directory: &Path, classes: &[&str]) {
    for class in classes {
        let path = directory.join(format!("{}.class", class.replace('.', "/")));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, [0xCA, 0xFE, 0xBA, 0xBE]).unwrap();
    }
}

/// Write a jar with the given `(entry name, content)` pairs.
pub fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

pub fn manifest(automatic_name: Option<&str>) -> Vec<u8> {
    let mut manifest = String::from("Manifest-Version: 1.0\r\n");
    if let Some(name) = automatic_name {
        manifest.push_str(&format!("Automatic-Module-Name: {name}\r\n"));
    }
    manifest.push_str("\r\n");
    manifest.into_bytes()
}

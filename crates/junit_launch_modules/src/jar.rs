//! Read module descriptors out of jars and exploded directories.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::automatic;
use crate::classfile::parse_module_info;
use crate::descriptor::ModuleDescriptor;
use crate::error::MalformedModule;

pub const MODULE_INFO: &str = "module-info.class";
const MANIFEST: &str = "META-INF/MANIFEST.MF";
const VERSIONS: &str = "META-INF/versions/";

/// Read the module a jar file defines.
///
/// ## Notes
/// - `module-info.class` is taken from the jar root or, for multi-release jars, from the highest
///   `META-INF/versions/N/` directory that carries one.
/// - Without a compiled declaration the jar is an automatic module, named by its manifest or its file name.
pub fn read_jar(path: &Path) -> Result<ModuleDescriptor, MalformedModule> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;

    let mut packages = BTreeSet::new();
    let mut module_info: Option<(u32, String)> = None;
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        let name = entry.name();
        let (release, relative) = match name.strip_prefix(VERSIONS) {
            Some(rest) => match rest.split_once('/') {
                Some((release, relative)) => match release.parse::<u32>() {
                    Ok(release) => (release, relative),
                    Err(_) => continue,
                },
                None => continue,
            },
            None if name.starts_with("META-INF/") => continue,
            None => (0, name),
        };
        if relative == MODULE_INFO {
            if module_info.as_ref().is_none_or(|(best, _)| release > *best) {
                module_info = Some((release, name.to_string()));
            }
        } else if let Some(package) = package_of(relative) {
            packages.insert(package);
        }
    }

    if let Some((_, entry)) = module_info {
        let mut bytes = Vec::new();
        archive.by_name(&entry)?.read_to_end(&mut bytes)?;
        let mut descriptor = parse_module_info(&bytes)?;
        descriptor.packages.extend(packages);
        return Ok(descriptor);
    }

    let from_manifest = match archive.by_name(MANIFEST) {
        Ok(mut entry) => {
            let mut manifest = String::new();
            entry.read_to_string(&mut manifest)?;
            automatic::name_from_manifest(&manifest)?
        }
        Err(zip::result::ZipError::FileNotFound) => None,
        Err(err) => return Err(err.into()),
    };
    let name = match from_manifest {
        Some(name) => name,
        None => {
            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            automatic::name_from_file_name(&file_name)?
        }
    };
    Ok(ModuleDescriptor::automatic(name, packages))
}

/// Read an exploded module: a directory with `module-info.class` at its root.
pub fn read_exploded(directory: &Path) -> Result<ModuleDescriptor, MalformedModule> {
    let bytes = fs::read(directory.join(MODULE_INFO))?;
    let mut descriptor = parse_module_info(&bytes)?;
    collect_packages(directory, directory, &mut descriptor.packages)?;
    Ok(descriptor)
}

fn collect_packages(root: &Path, directory: &Path, packages: &mut BTreeSet<String>) -> std::io::Result<()> {
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            if entry.file_name() != "META-INF" {
                collect_packages(root, &path, packages)?;
            }
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let relative: Vec<String> = relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
        if let Some(package) = package_of(&relative.join("/")) {
            packages.insert(package);
        }
    }
    Ok(())
}

/// Package of a `.class` entry given as a `/`-separated relative path; `None` for the unnamed package.
fn package_of(entry: &str) -> Option<String> {
    if !entry.ends_with(".class") {
        return None;
    }
    let (directory, _) = entry.rsplit_once('/')?;
    Some(directory.replace('/', "."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_of_class_entries() {
        assert_eq!(package_of("org/example/Foo.class").as_deref(), Some("org.example"));
        assert_eq!(package_of("Foo.class"), None);
        assert_eq!(package_of("org/example/readme.txt"), None);
    }
}

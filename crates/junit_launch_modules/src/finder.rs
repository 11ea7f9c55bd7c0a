use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::descriptor::{ModuleDescriptor, ModuleReference};
use crate::error::{ClassifyError, MalformedModule};
use crate::jar::{self, MODULE_INFO};

/// Classify a compiled output location.
///
/// ## Parameters
/// - `location`: an output directory, a directory of modules, or a single jar.
///
/// ## Returns
/// - `Ok(None)` when the location does not exist or holds no module.
/// - `Ok(Some(descriptor))` when it holds exactly one module.
///
/// ## Errors
/// - [`ClassifyError::AmbiguousModule`] when it holds more than one module.
/// - [`ClassifyError::Io`] when the location exists but cannot be listed.
#[tracing::instrument(skip_all, fields(location = %location.display()))]
pub fn classify(location: &Path) -> Result<Option<ModuleDescriptor>, ClassifyError> {
    let mut modules = find_modules(location)?;
    match modules.len() {
        0 => {
            debug!("no module found");
            Ok(None)
        }
        1 => {
            let module = modules.remove(0);
            debug!(module = %module.descriptor, "found module");
            Ok(Some(module.descriptor))
        }
        _ => Err(ClassifyError::AmbiguousModule {
            directory: location.to_path_buf(),
            modules: modules.into_iter().map(|m| m.descriptor.name).collect(),
        }),
    }
}

/// Find every module at a location.
///
/// Malformed artifacts are skipped with a warning.
pub fn find_modules(location: &Path) -> Result<Vec<ModuleReference>, ClassifyError> {
    let metadata = match fs::metadata(location) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(ClassifyError::io(location, err)),
    };

    if metadata.is_file() {
        return Ok(read_entry(location, true).into_iter().collect());
    }
    if location.join(MODULE_INFO).is_file() {
        return Ok(read_entry(location, false).into_iter().collect());
    }

    let mut entries: Vec<_> = fs::read_dir(location)
        .map_err(|err| ClassifyError::io(location, err))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(|err| ClassifyError::io(location, err))?;
    entries.sort();

    let mut modules = Vec::new();
    for path in entries {
        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_file() && is_jar(&path) {
            modules.extend(read_entry(&path, true));
        } else if path.is_dir() && path.join(MODULE_INFO).is_file() {
            modules.extend(read_entry(&path, false));
        }
    }
    Ok(modules)
}

fn is_jar(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
}

fn read_entry(path: &Path, is_file: bool) -> Option<ModuleReference> {
    let result: Result<ModuleDescriptor, MalformedModule> = if is_file {
        if !is_jar(path) {
            debug!(path = %path.display(), "not a jar, no module");
            return None;
        }
        jar::read_jar(path)
    } else {
        jar::read_exploded(path)
    };
    match result {
        Ok(descriptor) => Some(ModuleReference {
            descriptor,
            location: path.to_path_buf(),
        }),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring malformed module");
            None
        }
    }
}

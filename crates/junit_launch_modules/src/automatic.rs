//! Automatic module names: `Automatic-Module-Name` manifest entries and file-name inference.

use crate::error::MalformedModule;

/// Manifest attribute naming an automatic module.
pub const AUTOMATIC_MODULE_NAME: &str = "Automatic-Module-Name";

const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const", "continue",
    "default", "do", "double", "else", "enum", "extends", "final", "finally", "float", "for", "goto", "if",
    "implements", "import", "instanceof", "int", "interface", "long", "native", "new", "package", "private",
    "protected", "public", "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this",
    "throw", "throws", "transient", "try", "void", "volatile", "while", "true", "false", "null", "_",
];

/// Derive a module name from a jar file name.
///
/// ## Parameters
/// - `file_name`: the jar's file name, e.g. `junit-platform-commons-1.2.0.jar`.
///
/// ## Returns
/// - The derived name (`junit.platform.commons`), or [`MalformedModule::InvalidName`] when no legal module name
///   can be derived.
///
/// ## Notes
/// - The `.jar` suffix is dropped; everything from the first `-` followed by a digit and then `.` or the end of the
///   name is treated as the version and dropped too.
/// - Every non-alphanumeric character becomes `.`, repeated dots collapse, leading and trailing dots are trimmed.
///
/// ## Examples
/// ```rust
/// use junit_launch_modules::automatic::name_from_file_name;
///
/// assert_eq!(name_from_file_name("slf4j-api-1.7.25.jar").unwrap(), "slf4j.api");
/// assert!(name_from_file_name("broken-name_1.2.3-4.5.6.jar").is_err());
/// ```
pub fn name_from_file_name(file_name: &str) -> Result<String, MalformedModule> {
    let stem = file_name.strip_suffix(".jar").unwrap_or(file_name);
    let stem = &stem[..version_start(stem).unwrap_or(stem.len())];

    let mut name = String::with_capacity(stem.len());
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch);
        } else if !name.is_empty() && !name.ends_with('.') {
            name.push('.');
        }
    }
    let name = name.trim_end_matches('.').to_string();

    if is_module_name(&name) {
        Ok(name)
    } else {
        Err(MalformedModule::InvalidName(name))
    }
}

/// Byte offset of the version suffix: a `-` followed by digits and then `.` or the end of input.
fn version_start(stem: &str) -> Option<usize> {
    let bytes = stem.as_bytes();
    bytes.iter().enumerate().find_map(|(i, b)| {
        if *b != b'-' {
            return None;
        }
        let digits = bytes[i + 1..].iter().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        match bytes.get(i + 1 + digits) {
            None | Some(b'.') => Some(i),
            Some(_) => None,
        }
    })
}

/// Whether `name` is a legal module name: dot-separated Java identifiers, none of them reserved.
pub fn is_module_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !RESERVED.contains(&part)
}

/// Read the `Automatic-Module-Name` attribute from the main section of a manifest.
///
/// ## Returns
/// - `Ok(None)` when the attribute is absent.
/// - [`MalformedModule::InvalidName`] when it is present but not a legal module name.
pub fn name_from_manifest(manifest: &str) -> Result<Option<String>, MalformedModule> {
    let Some(value) = main_attribute(manifest, AUTOMATIC_MODULE_NAME) else {
        return Ok(None);
    };
    if is_module_name(&value) {
        Ok(Some(value))
    } else {
        Err(MalformedModule::InvalidName(value))
    }
}

/// Look up an attribute of the manifest's main section, joining continuation lines.
fn main_attribute(manifest: &str, key: &str) -> Option<String> {
    let mut current: Option<(String, String)> = None;
    let mut found = None;
    for line in manifest.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(continued) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(continued);
            }
            continue;
        }
        if let Some((name, value)) = current.take() {
            if name.eq_ignore_ascii_case(key) {
                found = Some(value);
            }
        }
        current = line
            .split_once(':')
            .map(|(name, value)| (name.trim().to_string(), value.trim_start().to_string()));
    }
    if let Some((name, value)) = current {
        if name.eq_ignore_ascii_case(key) {
            found = Some(value);
        }
    }
    found.map(|value| value.trim().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn strips_version_suffix() {
        assert_eq!(name_from_file_name("junit-platform-commons-1.2.0.jar").unwrap(), "junit.platform.commons");
        assert_eq!(name_from_file_name("foo-bar-1.jar").unwrap(), "foo.bar");
        assert!(name_from_file_name("foo-2x.jar").is_err());
    }

    #[test]
    fn non_alphanumerics_collapse_to_single_dots() {
        assert_eq!(name_from_file_name("..foo__bar--baz..jar").unwrap(), "foo.bar.baz");
    }

    #[test]
    fn broken_name_is_rejected() {
        let err = name_from_file_name("broken-name_1.2.3-4.5.6.jar").unwrap_err();
        assert!(matches!(err, MalformedModule::InvalidName(name) if name == "broken.name.1.2.3"));
    }

    #[test]
    fn reserved_words_are_rejected() {
        assert!(!is_module_name("com.example.class"));
        assert!(!is_module_name("a..b"));
        assert!(is_module_name("org.slf4j"));
    }

    #[test]
    fn manifest_attribute_lookup() {
        let manifest = "Manifest-Version: 1.0\r\nAutomatic-Module-Name: org.junit.platform\r\n .commons\r\nBuilt-By: ci\r\n\r\nName: x\r\nAutomatic-Module-Name: ignored\r\n";
        assert_eq!(name_from_manifest(manifest).unwrap().as_deref(), Some("org.junit.platform.commons"));
    }

    #[test]
    fn manifest_without_attribute() {
        assert_eq!(name_from_manifest("Manifest-Version: 1.0\n").unwrap(), None);
    }

    #[test]
    fn manifest_with_illegal_name() {
        assert!(name_from_manifest("Automatic-Module-Name: 1st.module\n").is_err());
    }
}

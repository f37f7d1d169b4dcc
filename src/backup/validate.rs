//! Validation functions for configuration values.
//!
//! Used both from `#[validate(custom(...))]` attributes and from manual
//! parsing of exclusion rules.

use validator::ValidationError;

use std::path::Path;
use std::result;

const MAX_NAME_LEN: usize = 255;

/// An exclusion rule name must be a single, non-empty path component.
///
/// Anything else the host filesystem accepts in a name is allowed, control
/// characters included (`Icon\r` is a real macOS file).
pub fn validate_rule_name<S: AsRef<str>>(name: S) -> result::Result<(), ValidationError> {
    let name = name.as_ref();
    if name.is_empty() {
        return Err(ValidationError::new("InvalidExclusionRule")
            .with_message("exclusion rule must not be empty".into()));
    }

    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(ValidationError::new("InvalidExclusionRule")
            .with_message(format!("{name:?} is not a single entry name").into()));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::new("InvalidExclusionRule").with_message(
            format!("{name:?} is longer than {MAX_NAME_LEN} bytes").into(),
        ));
    }

    Ok(())
}

/// Accepts a missing path (it is created at run time) or an existing
/// directory, rejects anything else.
pub fn validate_dir_or_absent<P: AsRef<Path>>(dir: P) -> result::Result<(), ValidationError> {
    let dir = dir.as_ref();
    if dir.as_os_str().is_empty() {
        return Err(ValidationError::new("InvalidDirectory")
            .with_message("backup directory must not be empty".into()));
    }

    match std::fs::metadata(dir) {
        Ok(md) if !md.is_dir() => Err(ValidationError::new("InvalidDirectory")
            .with_message(format!("{:?} exists but is not a directory", dir).into())),
        _ => Ok(()),
    }
}

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

#[mkt_derive::mkt_error]
pub enum PathGuardError {
    #[error("Path validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Validation for names and relative paths that end up on the file system.
#[derive(Debug)]
pub struct PathGuard;

impl PathGuard {
    /// Accepts a single path segment made of `[A-Za-z0-9._-]`, excluding `.` and `..`.
    ///
    /// Plugin slugs from requests go through this before they are joined onto
    /// a plugin directory or an upstream URL.
    ///
    /// # Errors
    /// Returns an error for empty, dotted or otherwise unsafe segments.
    pub fn segment(value: &str) -> Result<&str, PathGuardError> {
        let valid = !value.is_empty()
            && value != "."
            && value != ".."
            && value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

        if valid {
            Ok(value)
        } else {
            Err(PathGuardError::Validation {
                message: format!("{value:?} is not a valid name").into(),
                context: None,
            })
        }
    }

    /// Accepts a relative path without `..`, root or prefix components and
    /// returns it normalized (no `.` components).
    ///
    /// # Errors
    /// Returns an error for absolute paths, parent traversal, or an empty result.
    pub fn relative(value: &str) -> Result<PathBuf, PathGuardError> {
        let mut clean = PathBuf::new();
        for component in Path::new(value).components() {
            match component {
                Component::Normal(part) => clean.push(part),
                Component::CurDir => {},
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(PathGuardError::Validation {
                        message: format!("{value:?} escapes the target directory").into(),
                        context: None,
                    });
                },
            }
        }

        if clean.as_os_str().is_empty() {
            return Err(PathGuardError::Validation {
                message: format!("{value:?} is empty").into(),
                context: None,
            });
        }
        Ok(clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_accepts_plugin_slugs() {
        assert_eq!(PathGuard::segment("grafana-clock-panel").unwrap(), "grafana-clock-panel");
        assert_eq!(PathGuard::segment("marcusolsson-json-datasource").unwrap(), "marcusolsson-json-datasource");
        assert!(PathGuard::segment("v1.2_3").is_ok());
    }

    #[test]
    fn segment_rejects_traversal_and_separators() {
        for bad in ["", ".", "..", "a/b", "a\\b", "%2e%2e", "plugin name"] {
            assert!(PathGuard::segment(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn relative_normalizes_current_dir() {
        let path = PathGuard::relative("./grafana-clock-panel/./dist/module.js").unwrap();
        assert_eq!(path, PathBuf::from("grafana-clock-panel/dist/module.js"));
    }

    #[test]
    fn relative_rejects_escapes() {
        for bad in ["../evil", "plugin/../../evil", "/etc/passwd", "", "./"] {
            assert!(PathGuard::relative(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}

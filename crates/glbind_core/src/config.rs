//! Loader configuration from the process environment.
//!
//! # Responsibility
//! - Read the loader strategy override and library search directories.
//!
//! # Invariants
//! - Missing variables mean "use OS detection / default search path".
//! - An unknown strategy name is an error, never silently ignored.

use crate::loader::LoaderKind;
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Strategy override (`egl`, `unix`, `macos`, `windows`).
pub const ENV_LOADER: &str = "GLBIND_LOADER";
/// Platform path list of directories searched before the OS default.
pub const ENV_LIBRARY_PATH: &str = "GLBIND_LIBRARY_PATH";
/// EGL library name or path used by the EGL strategy.
pub const ENV_EGL_LIBRARY: &str = "GLBIND_EGL_LIBRARY";
/// Absolute directory for rolling log files; unset leaves logging off.
pub const ENV_LOG_DIR: &str = "GLBIND_LOG_DIR";

/// Log directory requested through `GLBIND_LOG_DIR`.
pub fn log_dir_from_env() -> Option<String> {
    log_dir_from_lookup(|name| std::env::var_os(name))
}

pub fn log_dir_from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Option<String> {
    lookup(ENV_LOG_DIR)
        .map(|raw| raw.to_string_lossy().trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderConfig {
    pub strategy: Option<LoaderKind>,
    pub search_dirs: Vec<PathBuf>,
    pub egl_library: Option<String>,
}

impl LoaderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self, ConfigError> {
        let strategy = match lookup(ENV_LOADER) {
            Some(raw) => {
                let value = raw.to_string_lossy();
                if value.trim().is_empty() {
                    None
                } else {
                    Some(
                        LoaderKind::parse(&value)
                            .ok_or_else(|| ConfigError::UnknownStrategy(value.to_string()))?,
                    )
                }
            }
            None => None,
        };

        let search_dirs = lookup(ENV_LIBRARY_PATH)
            .map(|raw| {
                std::env::split_paths(&raw)
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let egl_library = lookup(ENV_EGL_LIBRARY)
            .map(|raw| raw.to_string_lossy().trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(Self {
            strategy,
            search_dirs,
            egl_library,
        })
    }

    /// Forces the EGL-universal strategy.
    pub fn with_egl(mut self) -> Self {
        self.strategy = Some(LoaderKind::Egl);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownStrategy(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStrategy(value) => write!(
                f,
                "unknown {ENV_LOADER} value `{value}`; expected egl|unix|macos|windows"
            ),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{
        log_dir_from_lookup, ConfigError, LoaderConfig, ENV_EGL_LIBRARY, ENV_LIBRARY_PATH,
        ENV_LOADER, ENV_LOG_DIR,
    };
    use crate::loader::LoaderKind;
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, OsString)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_uses_detection() {
        let config = LoaderConfig::from_lookup(|_| None).expect("config");
        assert_eq!(config, LoaderConfig::default());
    }

    #[test]
    fn reads_override_and_search_dirs() {
        let joined = std::env::join_paths([PathBuf::from("/opt/mesa/lib"), PathBuf::from("/opt/gl")])
            .expect("join paths");
        let config = LoaderConfig::from_lookup(lookup_from(&[
            (ENV_LOADER, OsString::from("EGL")),
            (ENV_LIBRARY_PATH, joined),
            (ENV_EGL_LIBRARY, OsString::from("libEGL_mesa.so.0")),
        ]))
        .expect("config");
        assert_eq!(config.strategy, Some(LoaderKind::Egl));
        assert_eq!(
            config.search_dirs,
            vec![PathBuf::from("/opt/mesa/lib"), PathBuf::from("/opt/gl")]
        );
        assert_eq!(config.egl_library.as_deref(), Some("libEGL_mesa.so.0"));
    }

    #[test]
    fn rejects_unknown_strategy() {
        let err = LoaderConfig::from_lookup(lookup_from(&[(ENV_LOADER, OsString::from("glide"))]))
            .expect_err("unknown strategy must fail");
        assert_eq!(err, ConfigError::UnknownStrategy("glide".to_string()));
    }

    #[test]
    fn log_dir_is_optional_and_trimmed() {
        assert_eq!(log_dir_from_lookup(|_| None), None);
        assert_eq!(
            log_dir_from_lookup(lookup_from(&[(ENV_LOG_DIR, OsString::from("  "))])),
            None
        );
        assert_eq!(
            log_dir_from_lookup(lookup_from(&[(ENV_LOG_DIR, OsString::from(" /var/log/glbind "))])),
            Some("/var/log/glbind".to_string())
        );
    }
}

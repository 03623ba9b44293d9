//! Platform symbol loaders.
//!
//! # Responsibility
//! - Abstract OS-specific dynamic library loading and symbol lookup.
//! - Select one strategy per process from OS detection or configuration.
//!
//! # Invariants
//! - A missing symbol is `Ok(None)` for every strategy; only a failed
//!   library load is an error.
//! - Library handles are cached process wide and never unloaded.
//!
//! # See also
//! - `config::LoaderConfig` for environment overrides.

mod cache;
mod egl;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

pub use cache::LibraryCache;
pub use egl::{EglLoader, DEFAULT_EGL_LIBRARY};
#[cfg(target_os = "macos")]
pub use macos::{MacLoader, OPENGL_FRAMEWORK};
#[cfg(unix)]
pub use unix::UnixLoader;
#[cfg(windows)]
pub use windows::WindowsLoader;

use crate::config::LoaderConfig;
use log::info;
use std::error::Error;
use std::ffi::c_void;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// Non-null native function address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcAddress(NonNull<c_void>);

// SAFETY: the address names immutable code in a library that is never
// unloaded; it carries no thread affinity.
unsafe impl Send for ProcAddress {}
// SAFETY: see `Send`.
unsafe impl Sync for ProcAddress {}

impl ProcAddress {
    /// Wraps a raw symbol address; null yields `None`.
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl Display for ProcAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.addr())
    }
}

/// Loader strategy identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    Windows,
    Unix,
    MacOs,
    Egl,
}

impl LoaderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Unix => "unix",
            Self::MacOs => "macos",
            Self::Egl => "egl",
        }
    }

    /// Parses a strategy name as used by `GLBIND_LOADER`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "windows" | "win32" => Some(Self::Windows),
            "unix" | "linux" => Some(Self::Unix),
            "macos" | "osx" => Some(Self::MacOs),
            "egl" => Some(Self::Egl),
            _ => None,
        }
    }

    /// Strategy for the running OS when no override is configured.
    pub fn detect() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            Self::Egl
        } else if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Unix
        }
    }
}

impl Display for LoaderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dynamic symbol lookup strategy.
pub trait SymbolLoader: Send + Sync {
    fn kind(&self) -> LoaderKind;

    /// Adds a directory searched before the OS default search path.
    fn add_library_search_dir(&self, path: &Path);

    /// Looks up `function`, loading `library` on first use.
    ///
    /// An empty `library` means the strategy's default symbol space.
    ///
    /// # Errors
    /// - `LibraryLoadError` when the library cannot be loaded. A missing
    ///   symbol is `Ok(None)`.
    fn get_proc_address(
        &self,
        library: &str,
        function: &str,
    ) -> Result<Option<ProcAddress>, LibraryLoadError>;

    /// Loads `library` without failing; returns whether it is now loaded.
    ///
    /// Used for optional pre-loads of dependent shared objects.
    fn preload_library(&self, library: &str) -> bool;
}

/// Creates the loader selected by `config`, or by OS detection.
///
/// Configured search directories are registered on the new loader.
pub fn create_loader(config: &LoaderConfig) -> Result<Box<dyn SymbolLoader>, LoaderError> {
    let kind = config.strategy.unwrap_or_else(LoaderKind::detect);
    let loader: Box<dyn SymbolLoader> = match kind {
        LoaderKind::Egl => Box::new(EglLoader::new(
            config
                .egl_library
                .clone()
                .unwrap_or_else(|| DEFAULT_EGL_LIBRARY.to_string()),
        )),
        #[cfg(windows)]
        LoaderKind::Windows => Box::new(WindowsLoader::new()),
        #[cfg(target_os = "macos")]
        LoaderKind::MacOs => Box::new(MacLoader::new()),
        #[cfg(unix)]
        LoaderKind::Unix => Box::new(UnixLoader::new()),
        other => return Err(LoaderError::UnsupportedStrategy(other)),
    };
    for dir in &config.search_dirs {
        loader.add_library_search_dir(dir);
    }
    info!(
        "event=loader_select module=loader status=ok strategy={} search_dirs={}",
        kind,
        config.search_dirs.len()
    );
    Ok(loader)
}

/// Resolves a bare library name against `dirs`, first existing file wins.
///
/// Names containing a path separator are returned unchanged.
pub(crate) fn resolve_in_dirs(dirs: &[PathBuf], library: &str) -> PathBuf {
    let candidate = Path::new(library);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    dirs.iter()
        .map(|dir| dir.join(library))
        .find(|path| path.is_file())
        .unwrap_or_else(|| candidate.to_path_buf())
}

/// The OS failed to load a native library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLoadError {
    pub library: String,
    pub os_error_code: Option<i32>,
    pub message: String,
}

impl LibraryLoadError {
    pub(crate) fn new(library: &Path, os_error_code: Option<i32>, message: String) -> Self {
        Self {
            library: library.display().to_string(),
            os_error_code,
            message,
        }
    }
}

impl Display for LibraryLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to load library `{}`", self.library)?;
        if let Some(code) = self.os_error_code {
            write!(f, " (os error {code})")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl Error for LibraryLoadError {}

/// Loader construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    UnsupportedStrategy(LoaderKind),
}

impl Display for LoaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedStrategy(kind) => write!(
                f,
                "loader strategy `{kind}` is not available on {}",
                std::env::consts::OS
            ),
        }
    }
}

impl Error for LoaderError {}

#[cfg(test)]
mod tests {
    use super::{resolve_in_dirs, LoaderKind, ProcAddress};
    use std::ffi::c_void;
    use std::path::PathBuf;

    #[test]
    fn null_address_is_none() {
        assert!(ProcAddress::new(std::ptr::null_mut()).is_none());
        let address = ProcAddress::new(0x1000 as *mut c_void).expect("non-null");
        assert_eq!(address.to_string(), "0x1000");
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!(LoaderKind::parse(" EGL "), Some(LoaderKind::Egl));
        assert_eq!(LoaderKind::parse("linux"), Some(LoaderKind::Unix));
        assert_eq!(LoaderKind::parse("dos"), None);
    }

    #[test]
    fn detect_matches_target() {
        let kind = LoaderKind::detect();
        if cfg!(windows) {
            assert_eq!(kind, LoaderKind::Windows);
        } else if cfg!(target_os = "linux") {
            assert_eq!(kind, LoaderKind::Unix);
        }
    }

    #[test]
    fn paths_with_separators_are_kept() {
        let dirs = vec![PathBuf::from("/nonexistent")];
        assert_eq!(
            resolve_in_dirs(&dirs, "/usr/lib/libGL.so.1"),
            PathBuf::from("/usr/lib/libGL.so.1")
        );
        assert_eq!(resolve_in_dirs(&dirs, "libGL.so.1"), PathBuf::from("libGL.so.1"));
    }
}

//! `dlopen`/`dlsym` loader for Linux and other Unix systems.

use super::{resolve_in_dirs, LibraryCache, LibraryLoadError, LoaderKind, ProcAddress, SymbolLoader};
use libloading::os::unix::{Library, RTLD_LAZY};
use log::{error, info};
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

static LIBRARIES: LibraryCache<Library> = LibraryCache::new();

/// Unix strategy: `dlopen(RTLD_LAZY)` plus `dlsym`.
#[derive(Debug, Default)]
pub struct UnixLoader {
    search_dirs: RwLock<Vec<PathBuf>>,
}

impl UnixLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path handed to `dlopen` for `library` after search-dir resolution.
    pub fn resolve_library_path(&self, library: &str) -> PathBuf {
        let dirs = self
            .search_dirs
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        resolve_in_dirs(&dirs, library)
    }

    fn open(&self, library: &str) -> Result<&'static Library, LibraryLoadError> {
        if library.is_empty() {
            return LIBRARIES.get_or_load("", || Ok(Library::this()));
        }
        let path = self.resolve_library_path(library);
        let key = path.display().to_string();
        LIBRARIES.get_or_load(&key, || {
            // SAFETY: loading runs the library's initializers; callers name
            // native API libraries whose initializers are trusted.
            match unsafe { Library::open(Some(&path), RTLD_LAZY) } {
                Ok(handle) => {
                    info!(
                        "event=library_load module=loader status=ok strategy=unix library={}",
                        path.display()
                    );
                    Ok(handle)
                }
                Err(err) => {
                    error!(
                        "event=library_load module=loader status=error strategy=unix library={} error={}",
                        path.display(),
                        err
                    );
                    Err(LibraryLoadError::new(&path, None, err.to_string()))
                }
            }
        })
    }
}

impl SymbolLoader for UnixLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Unix
    }

    fn add_library_search_dir(&self, path: &Path) {
        self.search_dirs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());
    }

    fn get_proc_address(
        &self,
        library: &str,
        function: &str,
    ) -> Result<Option<ProcAddress>, LibraryLoadError> {
        let handle = self.open(library)?;
        Ok(lookup(handle, function))
    }

    fn preload_library(&self, library: &str) -> bool {
        self.open(library).is_ok()
    }
}

pub(super) fn lookup(handle: &Library, function: &str) -> Option<ProcAddress> {
    // SAFETY: the symbol is read as an untyped address; it is never called
    // here.
    let symbol = unsafe { handle.get::<*mut c_void>(function.as_bytes()) }.ok()?;
    ProcAddress::new(*symbol)
}

#[cfg(test)]
mod tests {
    use super::UnixLoader;
    use crate::loader::SymbolLoader;

    #[test]
    fn search_dirs_take_precedence_for_bare_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("libglbind-fake.so");
        std::fs::write(&file, b"not an elf").expect("write fake library");

        let loader = UnixLoader::new();
        assert_eq!(
            loader.resolve_library_path("libglbind-fake.so"),
            std::path::PathBuf::from("libglbind-fake.so")
        );
        loader.add_library_search_dir(dir.path());
        assert_eq!(loader.resolve_library_path("libglbind-fake.so"), file);
    }

    #[test]
    fn invalid_library_is_fatal_but_preload_is_not() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("libglbind-broken.so");
        std::fs::write(&file, b"not an elf").expect("write fake library");

        let loader = UnixLoader::new();
        let library = file.to_str().expect("utf-8 path");
        let err = loader
            .get_proc_address(library, "glClear")
            .expect_err("loading garbage must fail");
        assert!(err.library.contains("libglbind-broken.so"));
        assert!(!loader.preload_library(library));
    }

    #[test]
    fn global_symbol_space_resolves_process_symbols() {
        let loader = UnixLoader::new();
        let address = loader
            .get_proc_address("", "malloc")
            .expect("global space never fails to open");
        assert!(address.is_some());
        let missing = loader
            .get_proc_address("", "glbindDefinitelyMissingSymbol")
            .expect("global space never fails to open");
        assert!(missing.is_none());
    }
}

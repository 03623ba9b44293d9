//! EGL-universal loader delegating to `eglGetProcAddress`.
//!
//! `eglGetProcAddress` itself is resolved from the EGL library at first use.
//! This strategy is forced by configuration or selected on mobile targets.

use super::{resolve_in_dirs, LibraryCache, LibraryLoadError, LoaderKind, ProcAddress, SymbolLoader};
use libloading::Library;
use log::{error, info};
use once_cell::sync::OnceCell;
use std::ffi::{c_char, c_void, CString};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

#[cfg(windows)]
pub const DEFAULT_EGL_LIBRARY: &str = "libEGL.dll";
#[cfg(target_os = "android")]
pub const DEFAULT_EGL_LIBRARY: &str = "libEGL.so";
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub const DEFAULT_EGL_LIBRARY: &str = "libEGL.dylib";
#[cfg(not(any(
    windows,
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
)))]
pub const DEFAULT_EGL_LIBRARY: &str = "libEGL.so.1";

type EglGetProcAddress = unsafe extern "system" fn(*const c_char) -> *mut c_void;

static LIBRARIES: LibraryCache<Library> = LibraryCache::new();

/// EGL strategy; the `library` argument of lookups is ignored.
#[derive(Debug)]
pub struct EglLoader {
    egl_library: String,
    search_dirs: RwLock<Vec<PathBuf>>,
    get_proc_address: OnceCell<EglGetProcAddress>,
}

impl EglLoader {
    pub fn new(egl_library: impl Into<String>) -> Self {
        Self {
            egl_library: egl_library.into(),
            search_dirs: RwLock::new(Vec::new()),
            get_proc_address: OnceCell::new(),
        }
    }

    pub fn egl_library(&self) -> &str {
        &self.egl_library
    }

    fn open(&self, library: &str) -> Result<&'static Library, LibraryLoadError> {
        let path = {
            let dirs = self
                .search_dirs
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            resolve_in_dirs(&dirs, library)
        };
        let key = path.display().to_string();
        LIBRARIES.get_or_load(&key, || {
            // SAFETY: loading runs the EGL driver's initializers.
            match unsafe { Library::new(&path) } {
                Ok(handle) => {
                    info!(
                        "event=library_load module=loader status=ok strategy=egl library={}",
                        path.display()
                    );
                    Ok(handle)
                }
                Err(err) => {
                    error!(
                        "event=library_load module=loader status=error strategy=egl library={} error={}",
                        path.display(),
                        err
                    );
                    Err(LibraryLoadError::new(&path, None, err.to_string()))
                }
            }
        })
    }

    fn entry(&self) -> Result<EglGetProcAddress, LibraryLoadError> {
        self.get_proc_address
            .get_or_try_init(|| {
                let library = self.open(&self.egl_library)?;
                // SAFETY: `eglGetProcAddress` has this signature on every EGL
                // implementation; the library is never unloaded.
                let symbol = unsafe { library.get::<EglGetProcAddress>(b"eglGetProcAddress\0") }
                    .map_err(|err| {
                        LibraryLoadError::new(
                            Path::new(&self.egl_library),
                            None,
                            format!("eglGetProcAddress is not exported: {err}"),
                        )
                    })?;
                Ok(*symbol)
            })
            .copied()
    }
}

impl SymbolLoader for EglLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Egl
    }

    fn add_library_search_dir(&self, path: &Path) {
        self.search_dirs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());
    }

    fn get_proc_address(
        &self,
        _library: &str,
        function: &str,
    ) -> Result<Option<ProcAddress>, LibraryLoadError> {
        let get_proc_address = self.entry()?;
        let Ok(name) = CString::new(function) else {
            return Ok(None);
        };
        // SAFETY: `name` is a valid NUL-terminated string for the call.
        let address = unsafe { get_proc_address(name.as_ptr()) };
        Ok(ProcAddress::new(address))
    }

    fn preload_library(&self, library: &str) -> bool {
        self.open(library).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::EglLoader;
    use crate::loader::{LoaderKind, SymbolLoader};

    #[test]
    fn missing_egl_library_is_a_load_error() {
        let loader = EglLoader::new("/nonexistent/glbind/libEGL-missing.so");
        assert_eq!(loader.kind(), LoaderKind::Egl);
        let err = loader
            .get_proc_address("", "glClear")
            .expect_err("EGL library is missing");
        assert!(err.library.contains("libEGL-missing"));
        assert!(!loader.preload_library("/nonexistent/glbind/libEGL-missing.so"));
    }
}

//! `LoadLibrary`/`GetProcAddress` loader for Windows.
//!
//! An empty library name resolves against the executable module.

use super::{LibraryCache, LibraryLoadError, LoaderKind, ProcAddress, SymbolLoader};
use libloading::os::windows::Library;
use log::{error, info, warn};
use std::error::Error;
use std::ffi::c_void;
use std::path::{Path, PathBuf};

static LIBRARIES: LibraryCache<Library> = LibraryCache::new();

/// Windows strategy. Search directories are prepended to `PATH`, which
/// `LoadLibrary` consults after the application directory.
#[derive(Debug, Default)]
pub struct WindowsLoader;

impl WindowsLoader {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, library: &str) -> Result<&'static Library, LibraryLoadError> {
        LIBRARIES.get_or_load(library, || {
            let loaded = if library.is_empty() {
                Library::this()
            } else {
                // SAFETY: loading runs DllMain of a trusted native API library.
                unsafe { Library::new(library) }
            };
            match loaded {
                Ok(handle) => {
                    info!("event=library_load module=loader status=ok strategy=windows library={library}");
                    Ok(handle)
                }
                Err(err) => {
                    let code = os_error_code(&err);
                    error!(
                        "event=library_load module=loader status=error strategy=windows library={library} os_error={code:?} error={err}"
                    );
                    Err(LibraryLoadError::new(Path::new(library), code, err.to_string()))
                }
            }
        })
    }
}

/// OS error code carried by a failed `LoadLibraryExW`/`GetModuleHandleExW`.
fn os_error_code(err: &libloading::Error) -> Option<i32> {
    match err {
        libloading::Error::LoadLibraryExW { .. } | libloading::Error::GetModuleHandleExW { .. } => err
            .source()?
            .downcast_ref::<std::io::Error>()?
            .raw_os_error(),
        _ => None,
    }
}

impl SymbolLoader for WindowsLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Windows
    }

    fn add_library_search_dir(&self, path: &Path) {
        let mut dirs: Vec<PathBuf> = vec![path.to_path_buf()];
        if let Some(current) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&current).filter(|dir| dir != path));
        }
        match std::env::join_paths(dirs) {
            Ok(joined) => std::env::set_var("PATH", joined),
            Err(err) => warn!(
                "event=search_dir_add module=loader status=warn strategy=windows dir={} error={err}",
                path.display()
            ),
        }
    }

    fn get_proc_address(
        &self,
        library: &str,
        function: &str,
    ) -> Result<Option<ProcAddress>, LibraryLoadError> {
        let handle = self.open(library)?;
        // SAFETY: the symbol is read as an untyped address and never called
        // here.
        let symbol = match unsafe { handle.get::<*mut c_void>(function.as_bytes()) } {
            Ok(symbol) => symbol,
            Err(_) => return Ok(None),
        };
        Ok(ProcAddress::new(*symbol))
    }

    fn preload_library(&self, library: &str) -> bool {
        self.open(library).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::WindowsLoader;
    use crate::loader::SymbolLoader;

    #[test]
    fn missing_library_carries_os_error_code() {
        let err = WindowsLoader::new()
            .get_proc_address("glbind-definitely-missing.dll", "glClear")
            .expect_err("missing dll must fail");
        assert_eq!(err.os_error_code, Some(126));
    }

    #[test]
    fn empty_library_uses_executable_module() {
        let loader = WindowsLoader::new();
        let missing = loader
            .get_proc_address("", "glbindDefinitelyMissingSymbol")
            .expect("executable module always opens");
        assert!(missing.is_none());
        assert!(loader.preload_library(""));
    }
}

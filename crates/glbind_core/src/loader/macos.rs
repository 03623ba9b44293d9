//! macOS loader over the process-global symbol space.
//!
//! A named library (usually `OPENGL_FRAMEWORK`) is opened once with
//! `RTLD_GLOBAL` so its exports join the global image list. Lookups try that
//! handle first, then the global symbol space. An empty name skips the open.

use super::{LibraryCache, LibraryLoadError, LoaderKind, ProcAddress, SymbolLoader};
use libloading::os::unix::{Library, RTLD_GLOBAL, RTLD_LAZY};
use log::{debug, error, info};
use once_cell::sync::OnceCell;
use std::path::Path;

/// System OpenGL framework binary.
pub const OPENGL_FRAMEWORK: &str = "/System/Library/Frameworks/OpenGL.framework/OpenGL";

static FRAMEWORKS: LibraryCache<Library> = LibraryCache::new();
static GLOBAL_IMAGES: OnceCell<Library> = OnceCell::new();

/// macOS strategy: global symbol lookup by linker name.
#[derive(Debug, Default)]
pub struct MacLoader;

impl MacLoader {
    pub fn new() -> Self {
        Self
    }

    /// Linker-level name of `function` (C symbols carry a leading underscore).
    pub fn linker_name(function: &str) -> String {
        format!("_{function}")
    }

    fn open_framework(&self, library: &str) -> Result<&'static Library, LibraryLoadError> {
        FRAMEWORKS.get_or_load(library, || {
            // SAFETY: framework initializers are trusted system code.
            match unsafe { Library::open(Some(library), RTLD_LAZY | RTLD_GLOBAL) } {
                Ok(handle) => {
                    info!("event=library_load module=loader status=ok strategy=macos library={library}");
                    Ok(handle)
                }
                Err(err) => {
                    error!(
                        "event=library_load module=loader status=error strategy=macos library={library} error={err}"
                    );
                    Err(LibraryLoadError::new(Path::new(library), None, err.to_string()))
                }
            }
        })
    }
}

impl SymbolLoader for MacLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::MacOs
    }

    fn add_library_search_dir(&self, path: &Path) {
        debug!(
            "event=search_dir_ignored module=loader status=ok strategy=macos dir={}",
            path.display()
        );
    }

    fn get_proc_address(
        &self,
        library: &str,
        function: &str,
    ) -> Result<Option<ProcAddress>, LibraryLoadError> {
        let framework = if library.is_empty() {
            None
        } else {
            Some(self.open_framework(library)?)
        };
        let address = framework
            .and_then(|handle| super::unix::lookup(handle, function))
            .or_else(|| super::unix::lookup(GLOBAL_IMAGES.get_or_init(Library::this), function));
        if address.is_none() {
            debug!(
                "event=symbol_missing module=loader status=ok strategy=macos symbol={}",
                Self::linker_name(function)
            );
        }
        Ok(address)
    }

    fn preload_library(&self, library: &str) -> bool {
        library.is_empty() || self.open_framework(library).is_ok()
    }
}

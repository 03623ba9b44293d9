#![allow(dead_code)]

use glbind_core::{LibraryLoadError, LoaderKind, ProcAddress, SymbolLoader};
use std::collections::HashMap;
use std::ffi::c_void;
use std::path::Path;
use std::sync::Mutex;

/// In-memory loader exporting a fixed symbol set and recording lookups.
pub struct RecordingLoader {
    symbols: HashMap<String, ProcAddress>,
    broken_library: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingLoader {
    pub fn exporting(names: &[&str]) -> Self {
        let symbols = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let address = ProcAddress::new((0x1000 + index * 0x10) as *mut c_void)
                    .expect("fake address is non-null");
                (name.to_string(), address)
            })
            .collect();
        Self {
            symbols,
            broken_library: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, library: &str) -> Self {
        self.broken_library = Some(library.to_string());
        self
    }

    pub fn address(&self, name: &str) -> ProcAddress {
        self.symbols[name]
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl SymbolLoader for RecordingLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Unix
    }

    fn add_library_search_dir(&self, _path: &Path) {}

    fn get_proc_address(
        &self,
        library: &str,
        function: &str,
    ) -> Result<Option<ProcAddress>, LibraryLoadError> {
        if self.broken_library.as_deref() == Some(library) {
            return Err(LibraryLoadError {
                library: library.to_string(),
                os_error_code: Some(126),
                message: "module not found".to_string(),
            });
        }
        self.calls
            .lock()
            .expect("calls lock")
            .push(function.to_string());
        Ok(self.symbols.get(function).copied())
    }

    fn preload_library(&self, library: &str) -> bool {
        self.broken_library.as_deref() != Some(library)
    }
}

pub fn required(name: &str) -> glbind_core::RequiredFact {
    glbind_core::RequiredFact::from_feature(name).unwrap()
}

pub fn removed(name: &str) -> glbind_core::RemovedFact {
    glbind_core::RemovedFact::new(name).unwrap()
}

//! Feature-requirement resolution and dynamic symbol binding for Khronos APIs.
//!
//! Given a runtime context (API version/profile plus advertised extensions),
//! this crate decides which declared entry points are available and binds
//! them to native addresses through a platform loader.

pub mod binding;
pub mod config;
pub mod diagnostics;
pub mod evaluator;
pub mod extensions;
pub mod loader;
pub mod logging;
pub mod requirement;
pub mod version;

pub use binding::{
    bind_api, probe_api, ApiSurface, BindError, BindResult, BindingTable, BoundEntryPoint,
    ContextBindings,
};
pub use config::{log_dir_from_env, ConfigError, LoaderConfig};
pub use diagnostics::{check, DiagnosticReport, Finding};
pub use evaluator::{is_available, resolve, Resolution};
pub use extensions::{CapabilityDecl, ExtensionRegistry};
pub use loader::{
    create_loader, LibraryLoadError, LoaderError, LoaderKind, ProcAddress, SymbolLoader,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use requirement::{
    EntryPointDecl, ExtensionFact, NameFilter, RemovedFact, RequiredFact, RequirementError,
    VersionFact,
};
pub use version::{IncompatibleApiError, VersionError, VersionId};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

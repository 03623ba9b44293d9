//! Loader tests against the system C library.
#![cfg(all(target_os = "linux", target_env = "gnu"))]

use glbind_core::version::API_GL;
use glbind_core::{
    bind_api, create_loader, ApiSurface, EntryPointDecl, ExtensionRegistry, LoaderConfig,
    LoaderKind, RequiredFact, VersionId,
};

const LIBC: &str = "libc.so.6";

#[test]
fn detected_loader_resolves_and_misses_symbols() {
    let loader = create_loader(&LoaderConfig::default()).unwrap();
    assert_eq!(loader.kind(), LoaderKind::Unix);

    let strlen = loader.get_proc_address(LIBC, "strlen").unwrap();
    assert!(strlen.is_some());
    let again = loader.get_proc_address(LIBC, "strlen").unwrap();
    assert_eq!(strlen, again);

    assert!(loader
        .get_proc_address(LIBC, "glbindNoSuchSymbol")
        .unwrap()
        .is_none());
}

#[test]
fn missing_library_is_fatal_and_preload_is_not() {
    let loader = create_loader(&LoaderConfig::default()).unwrap();
    let err = loader
        .get_proc_address("libglbind-does-not-exist.so.9", "glClear")
        .unwrap_err();
    assert!(err.to_string().contains("libglbind-does-not-exist.so.9"));
    assert!(!loader.preload_library("libglbind-does-not-exist.so.9"));
    assert!(loader.preload_library(LIBC));
}

#[test]
fn binds_a_surface_from_a_real_library() {
    let surface = ApiSurface::new(
        API_GL,
        vec![
            EntryPointDecl::new("strlen"),
            EntryPointDecl::new("memcpy")
                .required_by(RequiredFact::from_feature("GL_VERSION_1_0").unwrap()),
            EntryPointDecl::new("glbindMissing")
                .required_by(
                    RequiredFact::from_feature("GL_EXT_libc")
                        .unwrap()
                        .with_entry_point("strchr"),
                ),
        ],
    );
    let loader = create_loader(&LoaderConfig::default()).unwrap();
    let extensions = ExtensionRegistry::from_extension_string("GL_EXT_libc");
    let table = bind_api(
        &surface,
        LIBC,
        loader.as_ref(),
        &VersionId::new(API_GL, 1, 0),
        &extensions,
    )
    .unwrap();

    assert_eq!(table.bound_count(), 3);
    assert_eq!(
        table.get("glbindMissing").unwrap().bound_symbol.as_deref(),
        Some("strchr")
    );
}

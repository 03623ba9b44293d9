mod support;

use glbind_core::version::{API_GL, API_GLES2};
use glbind_core::{is_available, resolve, EntryPointDecl, ExtensionRegistry, VersionId};
use support::{removed, required};

fn gl(major: u32, minor: u32) -> VersionId {
    VersionId::new(API_GL, major, minor)
}

#[test]
fn entry_point_without_facts_is_always_available() {
    let decl = EntryPointDecl::new("glGetError");
    let registries = [
        ExtensionRegistry::new(),
        ExtensionRegistry::from_extension_string("GL_ARB_foo GL_KHR_debug"),
    ];
    for version in [gl(1, 0), gl(4, 6), VersionId::new(API_GLES2, 3, 2)] {
        for extensions in &registries {
            assert!(is_available(&decl, &version, extensions).unwrap());
        }
    }
}

#[test]
fn version_only_availability_is_monotonic() {
    let decl = EntryPointDecl::new("glGenVertexArrays").required_by(required("GL_VERSION_3_0"));
    let extensions = ExtensionRegistry::new();
    let versions = [gl(1, 1), gl(2, 1), gl(3, 0), gl(3, 3), gl(4, 5)];

    let mut seen_available = false;
    for version in &versions {
        let available = is_available(&decl, version, &extensions).unwrap();
        if seen_available {
            assert!(available, "availability regressed at {version}");
        }
        seen_available |= available;
    }
    assert!(seen_available);
    assert!(!is_available(&decl, &gl(2, 1), &extensions).unwrap());
}

#[test]
fn later_required_version_resurrects_removed_entry_point() {
    let decl = EntryPointDecl::new("glLineWidth")
        .required_by(required("GL_VERSION_1_0"))
        .required_by(required("GL_VERSION_3_0"))
        .removed_by(removed("GL_VERSION_2_0"));
    let extensions = ExtensionRegistry::new();

    assert!(is_available(&decl, &gl(1, 5), &extensions).unwrap());
    assert!(!is_available(&decl, &gl(2, 5), &extensions).unwrap());

    let resolution = resolve(&decl, &gl(3, 0), &extensions).unwrap();
    assert!(resolution.removed);
    assert!(resolution.resurrected);
    assert!(resolution.is_available());
}

#[test]
fn extension_requirement_ignores_version_removal() {
    let decl = EntryPointDecl::new("glFooARB")
        .required_by(required("GL_ARB_foo"))
        .removed_by(removed("GL_VERSION_2_0"));

    let advertised = ExtensionRegistry::from_extension_string("GL_ARB_foo");
    assert!(is_available(&decl, &gl(5, 0), &advertised).unwrap());

    let silent = ExtensionRegistry::new();
    assert!(!is_available(&decl, &gl(5, 0), &silent).unwrap());
}

#[test]
fn api_filter_excludes_other_namespaces() {
    let decl = EntryPointDecl::new("glFooARB")
        .required_by(required("GL_ARB_foo").with_api("gl|glcore").unwrap());
    let extensions = ExtensionRegistry::from_extension_string("GL_ARB_foo");

    assert!(!is_available(&decl, &VersionId::new(API_GLES2, 3, 2), &extensions).unwrap());
    assert!(is_available(&decl, &gl(2, 1), &extensions).unwrap());
}

#[test]
fn version_fact_from_other_namespace_does_not_apply() {
    let decl = EntryPointDecl::new("glDrawBuffers")
        .required_by(required("GL_VERSION_2_0"))
        .required_by(required("GL_ES_VERSION_3_0"));
    let extensions = ExtensionRegistry::new();

    assert!(is_available(&decl, &VersionId::new(API_GLES2, 3, 0), &extensions).unwrap());
    assert!(!is_available(&decl, &VersionId::new(API_GLES2, 2, 0), &extensions).unwrap());
}

#[test]
fn profile_filter_requires_matching_context_profile() {
    let decl = EntryPointDecl::new("glCoreOnly")
        .required_by(required("GL_VERSION_3_2").with_profile("core").unwrap());
    let extensions = ExtensionRegistry::new();

    let core = gl(3, 3).with_profile("core");
    let compat = gl(3, 3).with_profile("compatibility");
    assert!(is_available(&decl, &core, &extensions).unwrap());
    assert!(!is_available(&decl, &compat, &extensions).unwrap());
    assert!(is_available(&decl, &gl(3, 3), &extensions).unwrap());
}

//! Advertised extension set and derived capability flags.
//!
//! # Responsibility
//! - Hold the extension names a native implementation advertises.
//! - Derive boolean capability flags from advertised names and version.
//!
//! # Invariants
//! - `advertised` is replaced wholesale on every re-query.
//! - Capability flags are a pure function of `(advertised, version)` and are
//!   only recomputed by `sync_members`.
//! - `enable_extension` is the only way to add a name outside a re-query.

use crate::evaluator::required_fact_satisfied;
use crate::requirement::RequiredFact;
use crate::version::{IncompatibleApiError, VersionId};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

/// Declaration of one derived capability flag.
///
/// A flag is set when any of its requirement facts is satisfied. Listing a
/// version fact marks the extension as promoted to core from that version.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityDecl {
    pub field: String,
    pub requirements: Vec<RequiredFact>,
}

impl CapabilityDecl {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            requirements: Vec::new(),
        }
    }

    pub fn requires(mut self, fact: RequiredFact) -> Self {
        self.requirements.push(fact);
        self
    }
}

/// Extension registry owned by one native context.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    advertised: BTreeSet<String>,
    promoted: BTreeSet<String>,
    declarations: Vec<CapabilityDecl>,
    capability_flags: BTreeMap<String, bool>,
    synced_version: Option<VersionId>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from a native space-separated extension string.
    pub fn from_extension_string(extensions: &str) -> Self {
        let mut registry = Self::new();
        registry.replace_advertised(extensions.split_whitespace());
        registry
    }

    /// Declares derived capability flags; all flags start unset.
    pub fn with_capabilities(mut self, declarations: Vec<CapabilityDecl>) -> Self {
        self.capability_flags = declarations
            .iter()
            .map(|decl| (decl.field.clone(), false))
            .collect();
        self.declarations = declarations;
        self
    }

    /// Replaces the advertised set with a fresh query result.
    ///
    /// Promotions from earlier diagnostic passes are dropped; flags keep their
    /// previous values until the next `sync_members`.
    pub fn replace_advertised<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.advertised = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        self.promoted.clear();
    }

    pub fn has(&self, name: &str) -> bool {
        self.advertised.contains(name)
    }

    pub fn advertised(&self) -> impl Iterator<Item = &str> {
        self.advertised.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.advertised.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advertised.is_empty()
    }

    /// Extensions added through `enable_extension` since the last re-query.
    pub fn promoted(&self) -> impl Iterator<Item = &str> {
        self.promoted.iter().map(String::as_str)
    }

    /// Marks `name` as supported although the implementation does not
    /// advertise it. Callers must re-run `sync_members` afterwards.
    pub fn enable_extension(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.advertised.contains(name) {
            return false;
        }
        info!("event=extension_enable module=extensions status=ok extension={name}");
        self.advertised.insert(name.to_string());
        self.promoted.insert(name.to_string());
        true
    }

    /// Recomputes every capability flag for `version`.
    pub fn sync_members(&mut self, version: &VersionId) -> Result<(), IncompatibleApiError> {
        let mut flags = BTreeMap::new();
        for decl in &self.declarations {
            let mut supported = false;
            for fact in &decl.requirements {
                if required_fact_satisfied(fact, version, self)? {
                    supported = true;
                    break;
                }
            }
            flags.insert(decl.field.clone(), supported);
        }
        debug!(
            "event=registry_sync module=extensions status=ok version={} advertised={} enabled_flags={}",
            version,
            self.advertised.len(),
            flags.values().filter(|value| **value).count()
        );
        self.capability_flags = flags;
        self.synced_version = Some(version.clone());
        Ok(())
    }

    /// Re-runs `sync_members` for the last synchronized version, if any.
    pub fn resync(&mut self) -> Result<(), IncompatibleApiError> {
        match self.synced_version.clone() {
            Some(version) => self.sync_members(&version),
            None => Ok(()),
        }
    }

    /// Returns one derived flag; undeclared fields read as `false`.
    pub fn flag(&self, field: &str) -> bool {
        self.capability_flags.get(field).copied().unwrap_or(false)
    }

    pub fn capability_flags(&self) -> &BTreeMap<String, bool> {
        &self.capability_flags
    }

    pub fn synced_version(&self) -> Option<&VersionId> {
        self.synced_version.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{CapabilityDecl, ExtensionRegistry};
    use crate::requirement::RequiredFact;
    use crate::version::{VersionId, API_GL};

    fn fbo_decl() -> CapabilityDecl {
        CapabilityDecl::new("framebuffer_object")
            .requires(RequiredFact::from_feature("GL_VERSION_3_0").expect("fact"))
            .requires(RequiredFact::from_feature("GL_ARB_framebuffer_object").expect("fact"))
    }

    #[test]
    fn splits_native_extension_string() {
        let registry = ExtensionRegistry::from_extension_string(
            "GL_ARB_foo  GL_EXT_bar\tGL_KHR_debug ",
        );
        assert_eq!(registry.len(), 3);
        assert!(registry.has("GL_EXT_bar"));
        assert!(!registry.has("GL_EXT"));
    }

    #[test]
    fn flags_follow_version_or_extension() {
        let mut registry = ExtensionRegistry::new().with_capabilities(vec![fbo_decl()]);
        registry
            .sync_members(&VersionId::new(API_GL, 2, 1))
            .expect("sync");
        assert!(!registry.flag("framebuffer_object"));

        registry
            .sync_members(&VersionId::new(API_GL, 3, 3))
            .expect("sync");
        assert!(registry.flag("framebuffer_object"));

        registry.replace_advertised(["GL_ARB_framebuffer_object"]);
        registry
            .sync_members(&VersionId::new(API_GL, 2, 1))
            .expect("sync");
        assert!(registry.flag("framebuffer_object"));
    }

    #[test]
    fn enable_extension_requires_resync_and_is_dropped_on_requery() {
        let mut registry = ExtensionRegistry::new().with_capabilities(vec![fbo_decl()]);
        let version = VersionId::new(API_GL, 2, 1);
        registry.sync_members(&version).expect("sync");

        assert!(registry.enable_extension("GL_ARB_framebuffer_object"));
        assert!(!registry.flag("framebuffer_object"));
        registry.resync().expect("resync");
        assert!(registry.flag("framebuffer_object"));
        assert_eq!(
            registry.promoted().collect::<Vec<_>>(),
            vec!["GL_ARB_framebuffer_object"]
        );

        registry.replace_advertised(Vec::<String>::new());
        assert_eq!(registry.promoted().count(), 0);
        assert!(!registry.has("GL_ARB_framebuffer_object"));
    }
}

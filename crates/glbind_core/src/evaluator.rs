//! Compatibility evaluation of requirement facts against a runtime context.
//!
//! # Responsibility
//! - Decide whether single facts apply to and are satisfied by a context.
//! - Resolve required/removed conflicts into net availability.
//!
//! # Invariants
//! - Pure: the same `(facts, version, extensions)` always yield the same
//!   resolution.
//! - Extension facts are never cancelled by removal facts.
//! - A later required version resurrects an entry point removed earlier.

use crate::extensions::ExtensionRegistry;
use crate::requirement::{
    EntryPointDecl, ExtensionFact, NameFilter, RemovedFact, RequiredFact, VersionFact,
};
use crate::version::{IncompatibleApiError, VersionId};

/// Outcome of resolving every fact declared for one entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Some version fact is satisfied (or no required facts are declared).
    pub required_by_version: bool,
    /// Some extension fact is satisfied.
    pub required_by_extension: bool,
    /// Some removal fact is satisfied.
    pub removed: bool,
    /// Removal was cancelled by a later required version.
    pub resurrected: bool,
    pub max_required_version: Option<VersionId>,
    pub max_removed_version: Option<VersionId>,
}

impl Resolution {
    /// Net availability of the entry point.
    pub fn is_available(&self) -> bool {
        self.version_available() || self.required_by_extension
    }

    /// Availability through core versions alone, after removal handling.
    pub fn version_available(&self) -> bool {
        self.required_by_version && !(self.removed && !self.resurrected)
    }
}

/// Returns whether a version fact applies to the context namespace/profile.
pub fn version_fact_applies(fact: &VersionFact, version: &VersionId) -> bool {
    version.api() == fact.version.api() && profile_matches(fact.profile_filter.as_ref(), version)
}

/// Returns whether an extension fact applies to the context API/profile.
pub fn extension_fact_applies(fact: &ExtensionFact, version: &VersionId) -> bool {
    fact.api_filter.matches(version.api()) && profile_matches(fact.profile_filter.as_ref(), version)
}

pub fn version_fact_satisfied(
    fact: &VersionFact,
    version: &VersionId,
) -> Result<bool, IncompatibleApiError> {
    if !version_fact_applies(fact, version) {
        return Ok(false);
    }
    version.ge(&fact.version)
}

pub fn extension_fact_satisfied(
    fact: &ExtensionFact,
    version: &VersionId,
    extensions: &ExtensionRegistry,
) -> bool {
    extension_fact_applies(fact, version) && extensions.has(&fact.name)
}

pub fn required_fact_satisfied(
    fact: &RequiredFact,
    version: &VersionId,
    extensions: &ExtensionRegistry,
) -> Result<bool, IncompatibleApiError> {
    match fact {
        RequiredFact::Version(fact) => version_fact_satisfied(fact, version),
        RequiredFact::Extension(fact) => Ok(extension_fact_satisfied(fact, version, extensions)),
    }
}

/// Removal holds from `fact.version` onward in the matching namespace.
pub fn removed_fact_satisfied(
    fact: &RemovedFact,
    version: &VersionId,
) -> Result<bool, IncompatibleApiError> {
    if version.api() != fact.version.api() || !fact.api_filter.matches(version.api()) {
        return Ok(false);
    }
    if !profile_matches(fact.profile_filter.as_ref(), version) {
        return Ok(false);
    }
    version.ge(&fact.version)
}

/// Resolves every required and removed fact of `decl`.
pub fn resolve(
    decl: &EntryPointDecl,
    version: &VersionId,
    extensions: &ExtensionRegistry,
) -> Result<Resolution, IncompatibleApiError> {
    let mut resolution = Resolution {
        required_by_version: decl.required.is_empty(),
        required_by_extension: false,
        removed: false,
        resurrected: false,
        max_required_version: None,
        max_removed_version: None,
    };

    for fact in &decl.required {
        match fact {
            RequiredFact::Version(fact) => {
                if version_fact_satisfied(fact, version)? {
                    resolution.required_by_version = true;
                    resolution.max_required_version =
                        max_version(resolution.max_required_version.take(), &fact.version)?;
                }
            }
            RequiredFact::Extension(fact) => {
                if extension_fact_satisfied(fact, version, extensions) {
                    resolution.required_by_extension = true;
                }
            }
        }
    }

    if !resolution.required_by_version && !resolution.required_by_extension {
        return Ok(resolution);
    }

    for fact in &decl.removed {
        if removed_fact_satisfied(fact, version)? {
            resolution.removed = true;
            resolution.max_removed_version =
                max_version(resolution.max_removed_version.take(), &fact.version)?;
        }
    }

    if let (Some(required), Some(removed)) = (
        &resolution.max_required_version,
        &resolution.max_removed_version,
    ) {
        resolution.resurrected = required.gt(removed)?;
    }

    Ok(resolution)
}

/// Net availability of `decl` under the given context.
pub fn is_available(
    decl: &EntryPointDecl,
    version: &VersionId,
    extensions: &ExtensionRegistry,
) -> Result<bool, IncompatibleApiError> {
    Ok(resolve(decl, version, extensions)?.is_available())
}

/// Selects the satisfied version fact with the greatest version.
///
/// Returns `None` when the entry point is not required by any version, or
/// when a removal applies without resurrection.
pub fn select_version_fact<'a>(
    decl: &'a EntryPointDecl,
    version: &VersionId,
) -> Result<Option<&'a VersionFact>, IncompatibleApiError> {
    let mut selected: Option<&VersionFact> = None;
    for fact in decl.version_facts() {
        if !version_fact_satisfied(fact, version)? {
            continue;
        }
        selected = match selected {
            Some(current) if !fact.version.gt(&current.version)? => Some(current),
            _ => Some(fact),
        };
    }
    let Some(fact) = selected else {
        return Ok(None);
    };

    let mut max_removed: Option<VersionId> = None;
    for removed in &decl.removed {
        if removed_fact_satisfied(removed, version)? {
            max_removed = max_version(max_removed, &removed.version)?;
        }
    }
    match max_removed {
        Some(removed) if !fact.version.gt(&removed)? => Ok(None),
        _ => Ok(Some(fact)),
    }
}

/// Satisfied extension facts of `decl`, in declaration order.
pub fn satisfied_extension_facts<'a>(
    decl: &'a EntryPointDecl,
    version: &'a VersionId,
    extensions: &'a ExtensionRegistry,
) -> impl Iterator<Item = &'a ExtensionFact> + 'a {
    decl.extension_facts()
        .filter(move |fact| extension_fact_satisfied(fact, version, extensions))
}

fn profile_matches(filter: Option<&NameFilter>, version: &VersionId) -> bool {
    match (filter, version.profile()) {
        (Some(filter), Some(profile)) => filter.matches(profile),
        _ => true,
    }
}

fn max_version(
    current: Option<VersionId>,
    candidate: &VersionId,
) -> Result<Option<VersionId>, IncompatibleApiError> {
    match current {
        Some(current) if current.ge(candidate)? => Ok(Some(current)),
        _ => Ok(Some(candidate.clone())),
    }
}

//! Diagnostic reconciliation of bound state against declared state.
//!
//! # Responsibility
//! - Report entry points whose bound state disagrees with declarations.
//! - Optionally promote fully bound hidden extensions into the registry.
//!
//! # Invariants
//! - Declared-but-unbound entry points are reported, never fixed.
//! - Only extensions with every declared entry point bound are enabled;
//!   partial extensions are reported and stay unsupported.
//! - Version and extension candidates are attributed independently, so a
//!   promoted extension can be reported as both hidden core and hidden
//!   extension.
//! - Capability flags are re-synced after any enable.

use crate::binding::{ApiSurface, BindingTable};
use crate::evaluator::{
    extension_fact_applies, extension_fact_satisfied, is_available, required_fact_satisfied,
    version_fact_applies, version_fact_satisfied,
};
use crate::extensions::ExtensionRegistry;
use crate::requirement::{EntryPointDecl, ExtensionFact, VersionFact};
use crate::version::{IncompatibleApiError, VersionId};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// One mismatch between bound and declared state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// Declared available but the symbol is not exported.
    BrokenDeclaration {
        entry_point: String,
        features: Vec<String>,
    },
    /// Bound although its only candidate core version is not reached.
    HiddenCore {
        entry_point: String,
        feature: String,
    },
    /// Bound although its only candidate extension is not advertised.
    HiddenExtension {
        entry_point: String,
        extension: String,
    },
    /// Bound, not declared, and not attributable to a single fact.
    Unattributed {
        entry_point: String,
        candidates: Vec<String>,
    },
    /// Hidden extension with only some of its entry points bound.
    PartialExtension {
        extension: String,
        bound: usize,
        declared: usize,
    },
}

impl Display for Finding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BrokenDeclaration {
                entry_point,
                features,
            } => write!(
                f,
                "{entry_point}: declared by {} but not exported (broken or partial driver)",
                features.join(", ")
            ),
            Self::HiddenCore {
                entry_point,
                feature,
            } => write!(f, "{entry_point}: exported ahead of {feature} (hidden core promotion)"),
            Self::HiddenExtension {
                entry_point,
                extension,
            } => write!(f, "{entry_point}: exported by unadvertised {extension} (hidden extension)"),
            Self::Unattributed {
                entry_point,
                candidates,
            } => write!(
                f,
                "{entry_point}: exported but not declared; candidates [{}]",
                candidates.join(", ")
            ),
            Self::PartialExtension {
                extension,
                bound,
                declared,
            } => write!(
                f,
                "{extension}: only {bound} of {declared} entry points exported (partial extension, not enabled)"
            ),
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    pub api: String,
    pub version: String,
    pub checked: usize,
    pub findings: Vec<Finding>,
    pub enabled_extensions: Vec<String>,
}

impl DiagnosticReport {
    pub fn is_consistent(&self) -> bool {
        self.findings.is_empty()
    }

    /// One human-readable line per finding.
    pub fn lines(&self) -> Vec<String> {
        self.findings.iter().map(ToString::to_string).collect()
    }

    pub fn partial_extensions(&self) -> impl Iterator<Item = &str> {
        self.findings.iter().filter_map(|finding| match finding {
            Finding::PartialExtension { extension, .. } => Some(extension.as_str()),
            _ => None,
        })
    }
}

/// Compares `table` with declared availability under `(version, extensions)`.
///
/// With `auto_enable`, hidden extensions whose every declared entry point is
/// bound are enabled in `extensions`, followed by a capability re-sync.
pub fn check(
    surface: &ApiSurface,
    table: &BindingTable,
    version: &VersionId,
    extensions: &mut ExtensionRegistry,
    auto_enable: bool,
) -> Result<DiagnosticReport, IncompatibleApiError> {
    let mut findings = Vec::new();
    let mut hidden_extensions = BTreeSet::new();

    for decl in surface.entry_points() {
        let name = decl.default_name();
        let bound = table.is_bound(name);
        let declared = is_available(decl, version, extensions)?;

        let entry_findings = match (bound, declared) {
            (true, true) | (false, false) => continue,
            (false, true) => vec![Finding::BrokenDeclaration {
                entry_point: name.to_string(),
                features: satisfied_features(decl, version, extensions)?,
            }],
            (true, false) => {
                let (core, extension) = unsatisfied_candidates(decl, version, extensions)?;
                let mut attributed = Vec::new();
                if let [fact] = core.as_slice() {
                    attributed.push(Finding::HiddenCore {
                        entry_point: name.to_string(),
                        feature: fact.feature_name.clone(),
                    });
                }
                if let [fact] = extension.as_slice() {
                    hidden_extensions.insert(fact.name.clone());
                    attributed.push(Finding::HiddenExtension {
                        entry_point: name.to_string(),
                        extension: fact.name.clone(),
                    });
                }
                if attributed.is_empty() {
                    attributed.push(Finding::Unattributed {
                        entry_point: name.to_string(),
                        candidates: core
                            .iter()
                            .map(|fact| fact.feature_name.clone())
                            .chain(extension.iter().map(|fact| fact.name.clone()))
                            .collect(),
                    });
                }
                attributed
            }
        };
        for finding in entry_findings {
            warn!("event=diagnostic_finding module=diagnostics status=warn {finding}");
            findings.push(finding);
        }
    }

    let mut enabled_extensions = Vec::new();
    for extension in hidden_extensions {
        let (bound, declared) = extension_coverage(surface, table, version, &extension);
        if bound < declared {
            let finding = Finding::PartialExtension {
                extension,
                bound,
                declared,
            };
            warn!("event=diagnostic_finding module=diagnostics status=warn {finding}");
            findings.push(finding);
        } else if auto_enable && extensions.enable_extension(&extension) {
            enabled_extensions.push(extension);
        }
    }
    if !enabled_extensions.is_empty() {
        extensions.sync_members(version)?;
    }

    info!(
        "event=diagnostic_check module=diagnostics status=ok api={} version={} checked={} findings={} enabled={}",
        surface.api(),
        version,
        surface.len(),
        findings.len(),
        enabled_extensions.len()
    );

    Ok(DiagnosticReport {
        api: surface.api().to_string(),
        version: version.to_string(),
        checked: surface.len(),
        findings,
        enabled_extensions,
    })
}

fn satisfied_features(
    decl: &EntryPointDecl,
    version: &VersionId,
    extensions: &ExtensionRegistry,
) -> Result<Vec<String>, IncompatibleApiError> {
    let mut features = Vec::new();
    for fact in &decl.required {
        if required_fact_satisfied(fact, version, extensions)? {
            features.push(fact.feature_name().to_string());
        }
    }
    if features.is_empty() {
        features.push(version.to_string());
    }
    Ok(features)
}

/// Applicable but unsatisfied facts, split into version and extension facts.
fn unsatisfied_candidates<'a>(
    decl: &'a EntryPointDecl,
    version: &VersionId,
    extensions: &ExtensionRegistry,
) -> Result<(Vec<&'a VersionFact>, Vec<&'a ExtensionFact>), IncompatibleApiError> {
    let mut core = Vec::new();
    for fact in decl.version_facts() {
        if version_fact_applies(fact, version) && !version_fact_satisfied(fact, version)? {
            core.push(fact);
        }
    }
    let extension = decl
        .extension_facts()
        .filter(|fact| {
            extension_fact_applies(fact, version) && !extension_fact_satisfied(fact, version, extensions)
        })
        .collect();
    Ok((core, extension))
}

/// `(bound, declared)` entry point counts for `extension` on this surface.
fn extension_coverage(
    surface: &ApiSurface,
    table: &BindingTable,
    version: &VersionId,
    extension: &str,
) -> (usize, usize) {
    let mut bound = 0;
    let mut declared = 0;
    for decl in surface.entry_points() {
        let declares = decl
            .extension_facts()
            .any(|fact| fact.name == extension && extension_fact_applies(fact, version));
        if declares {
            declared += 1;
            if table.is_bound(decl.default_name()) {
                bound += 1;
            }
        }
    }
    (bound, declared)
}

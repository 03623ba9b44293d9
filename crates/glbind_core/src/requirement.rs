//! Requirement declarations attached to entry points.
//!
//! # Responsibility
//! - Model "required by" facts as a version/extension tagged union.
//! - Model "removed by" facts, which are always version keyed.
//! - Group facts per entry point in declaration order.
//!
//! # Invariants
//! - A `VersionFact` always carries a parsed `VersionId`.
//! - An `ExtensionFact` never parses as a version token.
//! - API and profile filters are anchored regexes compiled at construction.

use crate::version::{VersionId, API_GL};
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default API filter for extension facts.
pub const DEFAULT_API_FILTER: &str = API_GL;

/// Anchored regex filter over API or profile identifiers.
///
/// `"gl|glcore"` matches `gl` and `glcore` but not `gles2`.
#[derive(Debug, Clone)]
pub struct NameFilter {
    source: String,
    pattern: Regex,
}

impl NameFilter {
    pub fn new(source: &str) -> Result<Self, RequirementError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(RequirementError::EmptyFilter);
        }
        let pattern = Regex::new(&format!("^(?:{source})$")).map_err(|err| {
            RequirementError::InvalidFilter {
                filter: source.to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self {
            source: source.to_string(),
            pattern,
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for NameFilter {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Requirement satisfied from a core version onward.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionFact {
    pub feature_name: String,
    pub version: VersionId,
    pub profile_filter: Option<NameFilter>,
    pub entry_point_override: Option<String>,
}

/// Requirement satisfied while an extension is advertised.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionFact {
    pub name: String,
    pub api_filter: NameFilter,
    pub profile_filter: Option<NameFilter>,
    pub entry_point_override: Option<String>,
}

/// One "required by" declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum RequiredFact {
    Version(VersionFact),
    Extension(ExtensionFact),
}

impl RequiredFact {
    /// Builds a fact from a registry feature name.
    ///
    /// Version tokens (`GL_VERSION_4_5`) produce `Version`; anything else is
    /// treated as an extension name filtered to the `gl` API.
    pub fn from_feature(name: &str) -> Result<Self, RequirementError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RequirementError::EmptyFeatureName);
        }
        match VersionId::parse_feature(name) {
            Some(version) => Ok(Self::Version(VersionFact {
                feature_name: name.to_string(),
                version,
                profile_filter: None,
                entry_point_override: None,
            })),
            None => Ok(Self::Extension(ExtensionFact {
                name: name.to_string(),
                api_filter: NameFilter::new(DEFAULT_API_FILTER)?,
                profile_filter: None,
                entry_point_override: None,
            })),
        }
    }

    /// Restricts an extension fact to APIs matching `filter`.
    ///
    /// Version facts are bound to their own namespace, so the filter is
    /// ignored for them.
    pub fn with_api(mut self, filter: &str) -> Result<Self, RequirementError> {
        if let Self::Extension(fact) = &mut self {
            fact.api_filter = NameFilter::new(filter)?;
        }
        Ok(self)
    }

    pub fn with_profile(mut self, filter: &str) -> Result<Self, RequirementError> {
        let filter = NameFilter::new(filter)?;
        match &mut self {
            Self::Version(fact) => fact.profile_filter = Some(filter),
            Self::Extension(fact) => fact.profile_filter = Some(filter),
        }
        Ok(self)
    }

    /// Uses `symbol` instead of the entry point's default name when this
    /// fact is the one chosen for binding (e.g. `glBindBufferARB`).
    pub fn with_entry_point(mut self, symbol: impl Into<String>) -> Self {
        let symbol = Some(symbol.into());
        match &mut self {
            Self::Version(fact) => fact.entry_point_override = symbol,
            Self::Extension(fact) => fact.entry_point_override = symbol,
        }
        self
    }

    pub fn feature_name(&self) -> &str {
        match self {
            Self::Version(fact) => &fact.feature_name,
            Self::Extension(fact) => &fact.name,
        }
    }

    pub fn entry_point_override(&self) -> Option<&str> {
        match self {
            Self::Version(fact) => fact.entry_point_override.as_deref(),
            Self::Extension(fact) => fact.entry_point_override.as_deref(),
        }
    }

    pub fn as_version(&self) -> Option<&VersionFact> {
        match self {
            Self::Version(fact) => Some(fact),
            Self::Extension(_) => None,
        }
    }

    pub fn as_extension(&self) -> Option<&ExtensionFact> {
        match self {
            Self::Version(_) => None,
            Self::Extension(fact) => Some(fact),
        }
    }
}

/// One "removed by" declaration. Extensions never remove entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedFact {
    pub feature_name: String,
    pub version: VersionId,
    pub api_filter: NameFilter,
    pub profile_filter: Option<NameFilter>,
}

impl RemovedFact {
    pub fn new(feature_name: &str) -> Result<Self, RequirementError> {
        let feature_name = feature_name.trim();
        let version = VersionId::parse_feature(feature_name)
            .ok_or_else(|| RequirementError::RemovalByExtension(feature_name.to_string()))?;
        let api_filter = NameFilter::new(&regex::escape(version.api()))?;
        Ok(Self {
            feature_name: feature_name.to_string(),
            version,
            api_filter,
            profile_filter: None,
        })
    }

    pub fn with_profile(mut self, filter: &str) -> Result<Self, RequirementError> {
        self.profile_filter = Some(NameFilter::new(filter)?);
        Ok(self)
    }
}

/// Declared metadata for one entry point slot of a generated surface.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPointDecl {
    slot: String,
    pub required: Vec<RequiredFact>,
    pub removed: Vec<RemovedFact>,
}

/// Internal marker prefixed to slot identifiers by the bindings generator.
pub const SLOT_PREFIX: &str = "p";

impl EntryPointDecl {
    /// Declares a slot for native symbol `symbol` (e.g. `glDrawArrays`).
    pub fn new(symbol: &str) -> Self {
        Self {
            slot: format!("{SLOT_PREFIX}{symbol}"),
            required: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn required_by(mut self, fact: RequiredFact) -> Self {
        self.required.push(fact);
        self
    }

    pub fn removed_by(mut self, fact: RemovedFact) -> Self {
        self.removed.push(fact);
        self
    }

    /// Generator-facing slot identifier, including the internal marker.
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Native symbol name: the slot id stripped of its internal marker.
    pub fn default_name(&self) -> &str {
        self.slot.strip_prefix(SLOT_PREFIX).unwrap_or(&self.slot)
    }

    /// Iterates extension facts in declaration order.
    pub fn extension_facts(&self) -> impl Iterator<Item = &ExtensionFact> {
        self.required.iter().filter_map(RequiredFact::as_extension)
    }

    pub fn version_facts(&self) -> impl Iterator<Item = &VersionFact> {
        self.required.iter().filter_map(RequiredFact::as_version)
    }
}

/// Requirement declaration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    EmptyFeatureName,
    EmptyFilter,
    InvalidFilter { filter: String, reason: String },
    RemovalByExtension(String),
}

impl Display for RequirementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFeatureName => write!(f, "feature name must not be empty"),
            Self::EmptyFilter => write!(f, "api/profile filter must not be empty"),
            Self::InvalidFilter { filter, reason } => {
                write!(f, "invalid api/profile filter `{filter}`: {reason}")
            }
            Self::RemovalByExtension(value) => write!(
                f,
                "removal must name a version feature, got extension `{value}`"
            ),
        }
    }
}

impl Error for RequirementError {}

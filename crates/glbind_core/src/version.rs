//! Version identity for Khronos API namespaces.
//!
//! # Responsibility
//! - Represent one point in one API's version space.
//! - Parse runtime version strings and registry feature tokens.
//!
//! # Invariants
//! - Ordering is only defined inside one `api` namespace; comparing across
//!   namespaces yields `IncompatibleApiError`, never a `false` answer.
//! - `profile` is a wildcard in equality: `None` matches any profile.
//! - Values are immutable after construction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Desktop OpenGL.
pub const API_GL: &str = "gl";
/// OpenGL core-only registry selector.
pub const API_GLCORE: &str = "glcore";
/// OpenGL ES 1.x.
pub const API_GLES1: &str = "gles1";
/// OpenGL ES 2.0 and later.
pub const API_GLES2: &str = "gles2";
/// OpenGL SC 2.0.
pub const API_GLSC2: &str = "glsc2";
/// Windows GL bindings.
pub const API_WGL: &str = "wgl";
/// X11 GL bindings.
pub const API_GLX: &str = "glx";
/// EGL.
pub const API_EGL: &str = "egl";

pub const PROFILE_CORE: &str = "core";
pub const PROFILE_COMPATIBILITY: &str = "compatibility";
/// OpenGL ES 1.x common profile (`ES-CM`).
pub const PROFILE_COMMON: &str = "common";
/// OpenGL ES 1.x common-lite profile (`ES-CL`).
pub const PROFILE_COMMON_LITE: &str = "common_lite";

static VERSION_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("version text pattern is valid")
});

static FEATURE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(GL_VERSION_ES_CM|GL_VERSION_ES_CL|GL_ES_VERSION|GLES_VERSION|GL_SC_VERSION|GLSC_VERSION|GL_VERSION|WGL_VERSION|GLX_VERSION|EGL_VERSION)_(\d+)_(\d+)$",
    )
    .expect("feature token pattern is valid")
});

/// One version of one API namespace, optionally qualified by a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionId {
    api: String,
    major: u32,
    minor: u32,
    revision: u32,
    profile: Option<String>,
}

impl VersionId {
    /// Creates a `major.minor` version in `api` without profile.
    pub fn new(api: impl Into<String>, major: u32, minor: u32) -> Self {
        Self {
            api: api.into(),
            major,
            minor,
            revision: 0,
            profile: None,
        }
    }

    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn api(&self) -> &str {
        &self.api
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Parses a version string as reported by a native implementation.
    ///
    /// Recognizes the first `<major>.<minor>(.<revision>)?` occurrence, so
    /// vendor strings such as `"4.6.0 NVIDIA 535.54"` or
    /// `"OpenGL ES 3.2 Mesa 23.1"` are accepted. A two-digit minor ending in
    /// zero is normalized (`"4.60"` is 4.6). Text containing `ES` selects the
    /// ES namespace instead of `default_api`.
    ///
    /// # Errors
    /// - `VersionError::Parse` when no version number is present or a
    ///   component overflows `u32`.
    pub fn parse(text: &str, default_api: &str) -> Result<Self, VersionError> {
        let captures = VERSION_TEXT
            .captures(text)
            .ok_or_else(|| VersionError::Parse(text.to_string()))?;

        let major = parse_component(&captures[1], text)?;
        let minor_text = &captures[2];
        let mut minor = parse_component(minor_text, text)?;
        if minor_text.len() == 2 && minor_text.ends_with('0') {
            minor /= 10;
        }
        let revision = match captures.get(3) {
            Some(value) => parse_component(value.as_str(), text)?,
            None => 0,
        };

        let mut version = Self::new(default_api, major, minor).with_revision(revision);
        if text.contains("ES") {
            version.api = if major < 2 { API_GLES1 } else { API_GLES2 }.to_string();
            if text.contains("ES-CM") {
                version.profile = Some(PROFILE_COMMON.to_string());
            } else if text.contains("ES-CL") {
                version.profile = Some(PROFILE_COMMON_LITE.to_string());
            }
        }
        Ok(version)
    }

    /// Parses a registry feature token such as `GL_VERSION_4_5`.
    ///
    /// Returns `None` when `name` is not a version feature, which means it
    /// names an extension.
    pub fn parse_feature(name: &str) -> Option<Self> {
        let captures = FEATURE_TOKEN.captures(name.trim())?;
        let (api, profile) = match &captures[1] {
            "GL_VERSION" => (API_GL, None),
            "GL_ES_VERSION" | "GLES_VERSION" => (API_GLES2, None),
            "GL_VERSION_ES_CM" => (API_GLES1, Some(PROFILE_COMMON)),
            "GL_VERSION_ES_CL" => (API_GLES1, Some(PROFILE_COMMON_LITE)),
            "GL_SC_VERSION" | "GLSC_VERSION" => (API_GLSC2, None),
            "WGL_VERSION" => (API_WGL, None),
            "GLX_VERSION" => (API_GLX, None),
            "EGL_VERSION" => (API_EGL, None),
            _ => return None,
        };
        let major = captures[2].parse().ok()?;
        let minor = captures[3].parse().ok()?;
        let mut version = Self::new(api, major, minor);
        version.profile = profile.map(str::to_string);
        Some(version)
    }

    /// Orders two versions of the same namespace by `(major, minor, revision)`.
    pub fn compare(&self, other: &Self) -> Result<Ordering, IncompatibleApiError> {
        if self.api != other.api {
            return Err(IncompatibleApiError {
                left: self.api.clone(),
                right: other.api.clone(),
            });
        }
        Ok(self.key().cmp(&other.key()))
    }

    pub fn lt(&self, other: &Self) -> Result<bool, IncompatibleApiError> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    pub fn le(&self, other: &Self) -> Result<bool, IncompatibleApiError> {
        Ok(self.compare(other)? != Ordering::Greater)
    }

    pub fn gt(&self, other: &Self) -> Result<bool, IncompatibleApiError> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    pub fn ge(&self, other: &Self) -> Result<bool, IncompatibleApiError> {
        Ok(self.compare(other)? != Ordering::Less)
    }

    /// Returns whether both profiles are concrete and different.
    pub fn profile_conflicts(&self, other: &Self) -> bool {
        matches!((&self.profile, &other.profile), (Some(a), Some(b)) if a != b)
    }

    fn key(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.revision)
    }
}

impl PartialEq for VersionId {
    fn eq(&self, other: &Self) -> bool {
        self.api == other.api && self.key() == other.key() && !self.profile_conflicts(other)
    }
}

impl Display for VersionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}.{}", self.api, self.major, self.minor)?;
        if self.revision != 0 {
            write!(f, ".{}", self.revision)?;
        }
        if let Some(profile) = &self.profile {
            write!(f, " ({profile})")?;
        }
        Ok(())
    }
}

fn parse_component(value: &str, text: &str) -> Result<u32, VersionError> {
    value
        .parse()
        .map_err(|_| VersionError::Parse(text.to_string()))
}

/// Raised when two versions from different API namespaces are ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompatibleApiError {
    pub left: String,
    pub right: String,
}

impl Display for IncompatibleApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot compare versions of incompatible APIs `{}` and `{}`",
            self.left, self.right
        )
    }
}

impl Error for IncompatibleApiError {}

/// Version parsing and comparison errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    Parse(String),
    IncompatibleApi(IncompatibleApiError),
}

impl Display for VersionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(value) => write!(f, "unrecognized version string: `{value}`"),
            Self::IncompatibleApi(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VersionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(_) => None,
            Self::IncompatibleApi(err) => Some(err),
        }
    }
}

impl From<IncompatibleApiError> for VersionError {
    fn from(value: IncompatibleApiError) -> Self {
        Self::IncompatibleApi(value)
    }
}

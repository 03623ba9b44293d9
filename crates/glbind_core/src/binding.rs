//! Binding engine: resolves and binds every entry point of an API surface.
//!
//! # Responsibility
//! - Choose the symbol name to load for each available entry point.
//! - Store the resulting addresses in a per-context `BindingTable`.
//!
//! # Invariants
//! - Every bind is a cold bind into a fresh table; nothing carries over from
//!   an earlier context.
//! - A failed bind returns an error and exposes no partial table.
//! - Unavailable or unresolved entry points are stored as `None`.
//!
//! # See also
//! - `evaluator` for the availability rules.

use crate::diagnostics::{check, DiagnosticReport};
use crate::evaluator::{resolve, satisfied_extension_facts, select_version_fact};
use crate::extensions::ExtensionRegistry;
use crate::loader::{LibraryLoadError, ProcAddress, SymbolLoader};
use crate::requirement::EntryPointDecl;
use crate::version::{IncompatibleApiError, VersionId};
use log::{debug, error, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Declared entry points of one API surface, in generator order.
#[derive(Debug, Clone)]
pub struct ApiSurface {
    api: String,
    entry_points: Vec<EntryPointDecl>,
    index: HashMap<String, usize>,
}

impl ApiSurface {
    pub fn new(api: impl Into<String>, entry_points: Vec<EntryPointDecl>) -> Self {
        let index = entry_points
            .iter()
            .enumerate()
            .map(|(position, decl)| (decl.default_name().to_string(), position))
            .collect();
        Self {
            api: api.into(),
            entry_points,
            index,
        }
    }

    pub fn api(&self) -> &str {
        &self.api
    }

    pub fn entry_points(&self) -> &[EntryPointDecl] {
        &self.entry_points
    }

    pub fn get(&self, name: &str) -> Option<&EntryPointDecl> {
        self.index.get(name).map(|position| &self.entry_points[*position])
    }

    pub fn len(&self) -> usize {
        self.entry_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_points.is_empty()
    }
}

/// One bound slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundEntryPoint {
    /// Native symbol name of the declared entry point.
    pub name: String,
    pub address: Option<ProcAddress>,
    /// Symbol actually resolved; differs from `name` for overrides.
    pub bound_symbol: Option<String>,
}

/// Per-context table of bound entry points.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindingTable {
    entries: Vec<BoundEntryPoint>,
    index: HashMap<String, usize>,
}

impl BindingTable {
    /// Table for `surface` with every slot cleared.
    pub fn unbound(surface: &ApiSurface) -> Self {
        let entries = surface
            .entry_points()
            .iter()
            .map(|decl| BoundEntryPoint {
                name: decl.default_name().to_string(),
                address: None,
                bound_symbol: None,
            })
            .collect::<Vec<_>>();
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.name.clone(), position))
            .collect();
        Self { entries, index }
    }

    pub fn entries(&self) -> &[BoundEntryPoint] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&BoundEntryPoint> {
        self.index.get(name).map(|position| &self.entries[*position])
    }

    pub fn address_of(&self, name: &str) -> Option<ProcAddress> {
        self.get(name).and_then(|entry| entry.address)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.address_of(name).is_some()
    }

    pub fn bound_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.address.is_some())
            .count()
    }

    pub fn bound_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.address.is_some())
            .map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn set(&mut self, position: usize, resolved: Option<(String, ProcAddress)>) {
        let entry = &mut self.entries[position];
        match resolved {
            Some((symbol, address)) => {
                entry.address = Some(address);
                entry.bound_symbol = Some(symbol);
            }
            None => {
                entry.address = None;
                entry.bound_symbol = None;
            }
        }
    }
}

/// Binds every entry point of `surface` from `library`.
///
/// Version facts are tried first (greatest satisfied version), then
/// satisfied extension facts in declaration order; the first non-null
/// address wins.
///
/// # Errors
/// - `BindError::LibraryLoad` when `library` cannot be loaded.
/// - `BindError::IncompatibleApi` when declarations mix namespaces
///   inconsistently.
pub fn bind_api(
    surface: &ApiSurface,
    library: &str,
    loader: &dyn SymbolLoader,
    version: &VersionId,
    extensions: &ExtensionRegistry,
) -> BindResult<BindingTable> {
    let started_at = Instant::now();
    let mut table = BindingTable::unbound(surface);

    for (position, decl) in surface.entry_points().iter().enumerate() {
        let resolved = match resolve_entry_point(decl, library, loader, version, extensions) {
            Ok(resolved) => resolved,
            Err(err) => {
                error!(
                    "event=bind_api module=binding status=error api={} library={} version={} duration_ms={} error={}",
                    surface.api(),
                    library,
                    version,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };
        table.set(position, resolved);
    }

    info!(
        "event=bind_api module=binding status=ok api={} library={} version={} extensions={} bound={} unbound={} duration_ms={}",
        surface.api(),
        library,
        version,
        extensions.len(),
        table.bound_count(),
        table.len() - table.bound_count(),
        started_at.elapsed().as_millis()
    );
    Ok(table)
}

/// Binds every entry point by name, ignoring requirement facts.
///
/// Each slot tries its default name, then every distinct override in
/// declaration order. The result reflects what the library actually exports
/// and feeds `diagnostics::check`; it must not be handed to call sites.
pub fn probe_api(
    surface: &ApiSurface,
    library: &str,
    loader: &dyn SymbolLoader,
) -> BindResult<BindingTable> {
    let mut table = BindingTable::unbound(surface);
    for (position, decl) in surface.entry_points().iter().enumerate() {
        let mut candidates = vec![decl.default_name()];
        for fact in &decl.required {
            if let Some(symbol) = fact.entry_point_override() {
                if !candidates.contains(&symbol) {
                    candidates.push(symbol);
                }
            }
        }
        let mut resolved = None;
        for symbol in candidates {
            if let Some(address) = loader.get_proc_address(library, symbol)? {
                resolved = Some((symbol.to_string(), address));
                break;
            }
        }
        table.set(position, resolved);
    }
    info!(
        "event=probe_api module=binding status=ok api={} library={} exported={} missing={}",
        surface.api(),
        library,
        table.bound_count(),
        table.len() - table.bound_count()
    );
    Ok(table)
}

fn resolve_entry_point(
    decl: &EntryPointDecl,
    library: &str,
    loader: &dyn SymbolLoader,
    version: &VersionId,
    extensions: &ExtensionRegistry,
) -> BindResult<Option<(String, ProcAddress)>> {
    let default_name = decl.default_name();

    let version_symbol = if decl.required.is_empty() {
        resolve(decl, version, extensions)?
            .version_available()
            .then_some(default_name)
    } else {
        select_version_fact(decl, version)?.map(|fact| {
            fact.entry_point_override
                .as_deref()
                .unwrap_or(default_name)
        })
    };
    if let Some(symbol) = version_symbol {
        if let Some(address) = loader.get_proc_address(library, symbol)? {
            return Ok(Some((symbol.to_string(), address)));
        }
        debug!("event=symbol_missing module=binding status=ok symbol={symbol} source=version");
    }

    for fact in satisfied_extension_facts(decl, version, extensions) {
        let symbol = fact.entry_point_override.as_deref().unwrap_or(default_name);
        if let Some(address) = loader.get_proc_address(library, symbol)? {
            return Ok(Some((symbol.to_string(), address)));
        }
        debug!(
            "event=symbol_missing module=binding status=ok symbol={symbol} source={}",
            fact.name
        );
    }

    Ok(None)
}

/// Version, extension registry and bound table of one native context.
///
/// Each thread that makes a native context current owns one of these and
/// rebinds it; tables are never shared across contexts.
#[derive(Debug, Clone)]
pub struct ContextBindings {
    version: VersionId,
    extensions: ExtensionRegistry,
    table: BindingTable,
}

impl ContextBindings {
    pub fn new(version: VersionId, extensions: ExtensionRegistry) -> Self {
        Self {
            version,
            extensions,
            table: BindingTable::default(),
        }
    }

    pub fn version(&self) -> &VersionId {
        &self.version
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    /// Switches to a new context; the table is cleared until the next bind.
    pub fn set_context(&mut self, version: VersionId, extensions: ExtensionRegistry) {
        self.version = version;
        self.extensions = extensions;
        self.table = BindingTable::default();
    }

    /// Syncs capability flags and rebinds `surface`.
    ///
    /// On error the previous table stays in place.
    pub fn rebind(
        &mut self,
        surface: &ApiSurface,
        library: &str,
        loader: &dyn SymbolLoader,
    ) -> BindResult<()> {
        self.extensions.sync_members(&self.version)?;
        let table = bind_api(surface, library, loader, &self.version, &self.extensions)?;
        self.table = table;
        Ok(())
    }

    /// Probes `library` and reconciles what it exports with this context.
    ///
    /// The bound table is left untouched; call `rebind` after enabling
    /// hidden extensions to pick them up.
    pub fn check(
        &mut self,
        surface: &ApiSurface,
        library: &str,
        loader: &dyn SymbolLoader,
        auto_enable: bool,
    ) -> BindResult<DiagnosticReport> {
        let exported = probe_api(surface, library, loader)?;
        let report = check(
            surface,
            &exported,
            &self.version,
            &mut self.extensions,
            auto_enable,
        )?;
        Ok(report)
    }
}

pub type BindResult<T> = Result<T, BindError>;

/// Fatal bind failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    IncompatibleApi(IncompatibleApiError),
    LibraryLoad(LibraryLoadError),
}

impl Display for BindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncompatibleApi(err) => write!(f, "{err}"),
            Self::LibraryLoad(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IncompatibleApi(err) => Some(err),
            Self::LibraryLoad(err) => Some(err),
        }
    }
}

impl From<IncompatibleApiError> for BindError {
    fn from(value: IncompatibleApiError) -> Self {
        Self::IncompatibleApi(value)
    }
}

impl From<LibraryLoadError> for BindError {
    fn from(value: LibraryLoadError) -> Self {
        Self::LibraryLoad(value)
    }
}

use std::cell::Cell;

use workflow::{Profiles, TxName};

use crate::{Error, SysInfo, TcType};

/// A physical executable for a logical transformation at one site.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationEntry {
    pub transformation: TxName,
    /// Site this entry applies to.
    pub site: String,
    /// Path (or URL, for stageable entries) of the executable.
    pub physical_path: String,
    pub ty: TcType,
    pub sys_info: SysInfo,
    pub profiles: Profiles,
}

impl TransformationEntry {
    /// Create an installed entry with default system info and no profiles.
    pub fn installed(transformation: TxName, site: &str, physical_path: &str) -> Self {
        Self {
            transformation,
            site: site.to_owned(),
            physical_path: physical_path.to_owned(),
            ty: TcType::Installed,
            sys_info: SysInfo::default(),
            profiles: Profiles::default(),
        }
    }

    /// true if this entry provides `tx` (namespace and version only compared when given).
    pub fn matches(&self, namespace: Option<&str>, name: &str, version: Option<&str>) -> bool {
        let mine = &self.transformation;
        mine.name == name
            && namespace.map_or(true, |ns| mine.namespace.as_deref() == Some(ns))
            && version.map_or(true, |v| mine.version.as_deref() == Some(v))
    }
}

/// Source of physical transformation entries.
pub trait TransformationCatalog {
    /// Return every entry for the given logical transformation.
    /// `site` and `ty` narrow the search when specified.
    /// An empty vec means "no such entry"; `Err` means the catalog could not be queried.
    fn lookup(
        &self,
        namespace: Option<&str>,
        name: &str,
        version: Option<&str>,
        site: Option<&str>,
        ty: Option<TcType>,
    ) -> Result<Vec<TransformationEntry>, Error>;

    /// Convenience wrapper around `lookup` for a `TxName`.
    fn lookup_tx(
        &self,
        tx: &TxName,
        site: Option<&str>,
        ty: Option<TcType>,
    ) -> Result<Vec<TransformationEntry>, Error> {
        self.lookup(
            tx.namespace.as_deref(),
            &tx.name,
            tx.version.as_deref(),
            site,
            ty,
        )
    }
}

/// Transformation catalog held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryTransformationCatalog {
    entries: Vec<TransformationEntry>,
    // lets callers simulate a backend outage:
    unavailable: Cell<bool>,
}

impl MemoryTransformationCatalog {
    pub fn new(entries: Vec<TransformationEntry>) -> Self {
        Self {
            entries,
            unavailable: Cell::new(false),
        }
    }

    pub fn add(&mut self, entry: TransformationEntry) {
        self.entries.push(entry);
    }

    /// Make every subsequent lookup fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TransformationCatalog for MemoryTransformationCatalog {
    fn lookup(
        &self,
        namespace: Option<&str>,
        name: &str,
        version: Option<&str>,
        site: Option<&str>,
        ty: Option<TcType>,
    ) -> Result<Vec<TransformationEntry>, Error> {
        if self.unavailable.get() {
            return Err(Error::Unavailable("in-memory catalog marked unavailable".to_owned()));
        }
        let found: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.matches(namespace, name, version))
            .filter(|e| site.map_or(true, |s| e.site == s))
            .filter(|e| ty.map_or(true, |t| e.ty == t))
            .cloned()
            .collect();
        log::trace!(
            "transformation lookup {name} at {site:?}: {} entries",
            found.len()
        );
        Ok(found)
    }
}

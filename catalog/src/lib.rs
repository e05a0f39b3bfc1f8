//!
//! Narrow interfaces to the catalogs the planner consults, plus simple
//! in-memory implementations of each.
//!
//! The transformation catalog answers "where is this executable installed?",
//! the site store answers "what do we know about this site?". Storage
//! backends and file formats for either are somebody else's problem.

/// Typed enums for catalog attributes.
mod types;
pub use types::{Arch, Os, SysInfo, TcType};

/// Transformation catalog interface and entries.
mod transformation;
pub use transformation::{MemoryTransformationCatalog, TransformationCatalog, TransformationEntry};

/// Site store interface and entries.
mod site;
pub use site::{GridGateway, MemorySiteStore, SiteEntry, SiteStore};

/// Name of the site that stands for the submit host.
pub const LOCAL_SITE: &str = "local";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid {kind} \"{value}\"")]
    InvalidValue { kind: &'static str, value: String },
}

//!
//! Site selectors assign an execution site to every job in a workflow.
//!
//! Most selectors decide job by job ([`PerJobSelector`]) and are driven over
//! the graph in parents-before-children order by [`map_each_job`].
//! Selectors that need the whole graph at once (HEFT, Group) implement
//! [`SiteSelector`] directly.
//!
//! A job the selector can't place is left with no site; deciding what to do
//! about that is up to the caller.

use std::path::PathBuf;

use catalog::{SiteStore, TransformationCatalog};
use workflow::{Graph, Job};

use crate::SiteOracle;

mod random;
pub use random::RandomSelector;

mod round_robin;
pub use round_robin::RoundRobinSelector;

mod group;
pub use group::GroupSelector;

/// Heterogeneous Earliest Finish Time scheduling
mod heft;
pub use heft::{HeftBag, HeftConfig, HeftSelector};

/// Callout to an executable via a temp file
mod external;
pub use external::{parse_solution, write_request, ExternalConfig, ExternalSelector};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unknown site selector \"{0}\" (known selectors: {1})")]
    UnknownSelector(String, String),
    #[error("Job \"{0}\" uses the reserved group name \"default\"")]
    ReservedGroup(String),
    #[error("No runnable site for job \"{0}\"")]
    NoRunnableSite(String),
    #[error("No executable specified for the External site selector")]
    MissingSelectorPath,
    #[error("Unable to write request file for job \"{0}\"")]
    RequestFile(String, #[source] std::io::Error),
    #[error("Unable to run external site selector {0:?}")]
    Spawn(PathBuf, #[source] std::io::Error),
    #[error(transparent)]
    Traverse(#[from] traverse::Error),
}

/// Identifies the workflow being mapped, for selectors that report it.
#[derive(Debug, Clone, Default)]
pub struct WorkflowInfo {
    pub label: String,
    pub index: u32,
}

impl WorkflowInfo {
    pub fn of(graph: &Graph) -> Self {
        Self {
            label: graph.label.clone(),
            index: graph.index,
        }
    }
}

/// A strategy that assigns execution sites to the jobs of a workflow.
pub trait SiteSelector {
    /// Short human-readable description, for logs.
    fn description(&self) -> &'static str;

    /// Set the execution site of every job in `graph` to one of `sites`,
    /// or to `None` for jobs that can't be placed.
    fn map_workflow(&mut self, graph: &mut Graph, sites: &[String]) -> Result<(), Error>;

    /// Makespan of the most recent schedule, for selectors that compute one.
    fn makespan(&self) -> Option<f64> {
        None
    }
}

/// A strategy that places one job at a time.
pub trait PerJobSelector {
    fn description(&self) -> &'static str;

    fn map_job(&mut self, job: &mut Job, sites: &[String], wf: &WorkflowInfo) -> Result<(), Error>;
}

/// Run `selector` on each job of `graph`, parents before children.
pub fn map_each_job<S: PerJobSelector + ?Sized>(
    selector: &mut S,
    graph: &mut Graph,
    sites: &[String],
) -> Result<(), Error> {
    let wf = WorkflowInfo::of(graph);
    for id in traverse::bfs_order(graph)? {
        let job = graph.job_mut(id);
        selector.map_job(job, sites, &wf)?;
        log::debug!("mapped {} to {:?}", job.name, job.site());
    }
    Ok(())
}

/// Everything a selector may need when it is constructed.
#[derive(Clone, Copy)]
pub struct SelectorContext<'a> {
    pub oracle: SiteOracle<'a>,
    pub site_store: &'a dyn SiteStore,
    pub external: &'a ExternalConfig,
    pub heft: &'a HeftConfig,
}

impl<'a> SelectorContext<'a> {
    pub fn new(
        tc: &'a dyn TransformationCatalog,
        site_store: &'a dyn SiteStore,
        external: &'a ExternalConfig,
        heft: &'a HeftConfig,
    ) -> Self {
        Self {
            oracle: SiteOracle::new(tc),
            site_store,
            external,
            heft,
        }
    }
}

pub type Constructor = for<'a> fn(&SelectorContext<'a>) -> Result<Box<dyn SiteSelector + 'a>, Error>;

fn new_random<'a>(ctx: &SelectorContext<'a>) -> Result<Box<dyn SiteSelector + 'a>, Error> {
    Ok(Box::new(RandomSelector::new(ctx.oracle)))
}

fn new_round_robin<'a>(ctx: &SelectorContext<'a>) -> Result<Box<dyn SiteSelector + 'a>, Error> {
    Ok(Box::new(RoundRobinSelector::new(ctx.oracle)))
}

fn new_group<'a>(ctx: &SelectorContext<'a>) -> Result<Box<dyn SiteSelector + 'a>, Error> {
    Ok(Box::new(GroupSelector::new(Box::new(RandomSelector::new(
        ctx.oracle,
    )))))
}

fn new_heft<'a>(ctx: &SelectorContext<'a>) -> Result<Box<dyn SiteSelector + 'a>, Error> {
    Ok(Box::new(HeftSelector::new(ctx.oracle, ctx.site_store, *ctx.heft)))
}

fn new_external<'a>(ctx: &SelectorContext<'a>) -> Result<Box<dyn SiteSelector + 'a>, Error> {
    Ok(Box::new(ExternalSelector::new(
        ctx.oracle,
        ctx.site_store,
        ctx.external.clone(),
    )?))
}

/// Every selector we know how to build, by name.
const SELECTORS: &[(&str, Constructor)] = &[
    ("Random", new_random),
    ("RoundRobin", new_round_robin),
    ("Group", new_group),
    ("Heft", new_heft),
    ("External", new_external),
];

/// Find a selector by name (case-insensitive).
/// Returns its canonical name and constructor.
pub fn lookup(name: &str) -> Result<(&'static str, Constructor), Error> {
    SELECTORS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .copied()
        .ok_or_else(|| {
            let known: Vec<_> = SELECTORS.iter().map(|(n, _)| *n).collect();
            Error::UnknownSelector(name.to_owned(), known.join(", "))
        })
}

/// Construct the selector registered under `name`.
pub fn load<'a>(name: &str, ctx: &SelectorContext<'a>) -> Result<Box<dyn SiteSelector + 'a>, Error> {
    let (name, constructor) = lookup(name)?;
    let selector = constructor(ctx)?;
    log::info!("using site selector {name}: {}", selector.description());
    Ok(selector)
}

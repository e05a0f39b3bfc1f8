//!
//! Synthesis of directory-creation jobs.
//!
//! Every site whose working directory some job relies on gets one job that
//! creates that directory. A [`DirectoryStrategy`] decides which edges tie
//! those jobs into the workflow, so that each job runs only after the
//! directory it needs exists. The payload of a directory job (what it
//! actually runs) comes from an [`Implementation`].
//!
//! Strategies work out all their edges on the original graph first, and only
//! then add the new jobs, so new jobs never show up in their own traversal.

use std::collections::BTreeSet;

use catalog::SiteStore;
use workflow::{Graph, Job, JobType, NodeId};

/// Default directory job payload
mod implementation;
pub use implementation::{DirManagerImplementation, DIRMANAGER_NAME, DIRMANAGER_NAMESPACE, HOME_PROFILE};

mod hourglass;
pub use hourglass::HourGlass;

mod tentacles;
pub use tentacles::Tentacles;

/// Bitset-based minimal edge set
mod minimal;
pub use minimal::{Minimal, SiteIndex};

/// Prefix of directory-creation job names.
pub const CREATE_DIR_PREFIX: &str = "create_dir_";
/// Prefix of the barrier job inserted by [`HourGlass`].
pub const CONCAT_PREFIX: &str = "concat_";
/// Legacy pseudo-site that never gets a directory.
pub const RESERVED_SITE: &str = "stork";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unknown directory strategy \"{0}\" (known strategies: {1})")]
    UnknownStrategy(String, String),
    #[error("Site \"{0}\" is not in the site store")]
    UnknownSite(String),
    #[error("Site \"{0}\" has no working directory")]
    NoWorkDir(String),
    #[error("Job {job} needs a directory on site \"{site}\", which has no directory job")]
    UnindexedSite { site: String, job: String },
    #[error("No dirmanager executable available for site \"{0}\"")]
    NoDirManager(String),
    #[error(transparent)]
    Catalog(#[from] catalog::Error),
    #[error(transparent)]
    Graph(#[from] workflow::Error),
    #[error(transparent)]
    Traverse(#[from] traverse::Error),
}

/// Builds the job that creates a directory.
pub trait Implementation {
    /// Make a job named `name` that creates `dir_url` at `site`.
    fn make_create_dir_job(&self, site: &str, name: &str, dir_url: &str) -> Result<Job, Error>;
}

/// What a strategy did to the graph.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkReport {
    /// The new directory jobs, in site order.
    pub dir_jobs: Vec<NodeId>,
    /// Barrier job, for strategies that add one.
    pub concat: Option<NodeId>,
    pub edges_added: usize,
}

/// Names, builds and adds directory jobs for one workflow.
pub struct DirJobFactory<'a> {
    implementation: &'a dyn Implementation,
    site_store: &'a dyn SiteStore,
    job_prefix: String,
}

impl<'a> DirJobFactory<'a> {
    pub fn new(
        implementation: &'a dyn Implementation,
        site_store: &'a dyn SiteStore,
        job_prefix: &str,
    ) -> Self {
        Self {
            implementation,
            site_store,
            job_prefix: job_prefix.to_owned(),
        }
    }

    /// Name of the directory job for `site`; unique for one workflow label and index.
    pub fn job_name(&self, graph: &Graph, site: &str) -> String {
        format!(
            "{CREATE_DIR_PREFIX}{}{}_{}_{site}",
            self.job_prefix, graph.label, graph.index
        )
    }

    /// Name of the barrier job.
    pub fn concat_name(&self, graph: &Graph) -> String {
        format!(
            "{CONCAT_PREFIX}{}{}_{}",
            self.job_prefix, graph.label, graph.index
        )
    }

    /// Build (but don't add) the directory job for `site`.
    pub fn make_job(&self, graph: &Graph, site: &str) -> Result<Job, Error> {
        let entry = self
            .site_store
            .lookup(site)
            .ok_or_else(|| Error::UnknownSite(site.to_owned()))?;
        let url = entry
            .work_dir_url()
            .ok_or_else(|| Error::NoWorkDir(site.to_owned()))?;
        let mut job = self
            .implementation
            .make_create_dir_job(site, &self.job_name(graph, site), &url)?;
        job.job_type = JobType::CreateDir;
        Ok(job)
    }

    /// Build the directory jobs for every site in `sites`, in order.
    pub fn make_jobs(&self, graph: &Graph, sites: &[String]) -> Result<Vec<Job>, Error> {
        sites.iter().map(|site| self.make_job(graph, site)).collect()
    }
}

/// Add a directory job for each of `sites`, then an edge from the directory job
/// of site `i` to `child` for each `(i, child)` in `links`.
fn add_linked(
    graph: &mut Graph,
    factory: &DirJobFactory,
    sites: &[String],
    links: Vec<(usize, NodeId)>,
) -> Result<LinkReport, Error> {
    let jobs = factory.make_jobs(graph, sites)?;
    let mut dir_jobs = Vec::with_capacity(jobs.len());
    for job in jobs {
        dir_jobs.push(graph.add_node(job)?);
    }
    let mut edges_added = 0;
    for (site, child) in links {
        if graph.add_edge(dir_jobs[site], child)? {
            edges_added += 1;
        }
    }
    Ok(LinkReport {
        dir_jobs,
        concat: None,
        edges_added,
    })
}

/// The site whose working directory job `id` needs, if any.
pub fn required_site(graph: &Graph, id: NodeId) -> Option<&str> {
    let job = graph.job(id);
    if job.noop {
        return None;
    }
    let site = match job.job_type {
        JobType::Compute | JobType::Chmod | JobType::SubWorkflow => job.work_site(),
        // a stage-out with nothing downstream doesn't need the directory to exist yet:
        JobType::StageOut if graph.node(id).is_leaf() => None,
        JobType::StageIn | JobType::StageOut | JobType::InterSite => job.non_tpt_site(),
        JobType::StageWorker | JobType::Registration | JobType::CreateDir | JobType::Cleanup => {
            None
        }
    };
    site.filter(|s| *s != RESERVED_SITE)
}

/// Every site some job of `graph` needs a directory on, sorted.
pub fn create_dir_sites(graph: &Graph) -> BTreeSet<String> {
    graph
        .ids()
        .filter_map(|id| required_site(graph, id))
        .map(str::to_owned)
        .collect()
}

/// A way of wiring directory jobs into a workflow.
pub trait DirectoryStrategy {
    fn description(&self) -> &'static str;

    /// Add one directory job per site that needs one, plus the edges that
    /// make every job depend on the directory it needs.
    fn add_create_dir_jobs(
        &self,
        graph: &mut Graph,
        factory: &DirJobFactory,
    ) -> Result<LinkReport, Error>;
}

pub type Constructor = fn() -> Box<dyn DirectoryStrategy>;

fn new_hourglass() -> Box<dyn DirectoryStrategy> {
    Box::new(HourGlass)
}

fn new_tentacles() -> Box<dyn DirectoryStrategy> {
    Box::new(Tentacles)
}

fn new_minimal() -> Box<dyn DirectoryStrategy> {
    Box::new(Minimal)
}

/// Every strategy we know how to build, by name.
const STRATEGIES: &[(&str, Constructor)] = &[
    ("HourGlass", new_hourglass),
    ("Tentacles", new_tentacles),
    ("Minimal", new_minimal),
];

/// Find a strategy by name (case-insensitive).
/// Returns its canonical name and constructor.
pub fn lookup(name: &str) -> Result<(&'static str, Constructor), Error> {
    STRATEGIES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .copied()
        .ok_or_else(|| {
            let known: Vec<_> = STRATEGIES.iter().map(|(n, _)| *n).collect();
            Error::UnknownStrategy(name.to_owned(), known.join(", "))
        })
}

/// Construct the strategy registered under `name`.
pub fn load(name: &str) -> Result<Box<dyn DirectoryStrategy>, Error> {
    let (name, constructor) = lookup(name)?;
    let strategy = constructor();
    log::info!("using directory strategy {name}: {}", strategy.description());
    Ok(strategy)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use catalog::{MemorySiteStore, SiteEntry};
    use workflow::TxName;

    /// Payload-free implementation for tests.
    pub struct EchoImplementation;

    impl Implementation for EchoImplementation {
        fn make_create_dir_job(&self, site: &str, name: &str, dir_url: &str) -> Result<Job, Error> {
            let mut job = Job::new(name, JobType::CreateDir, TxName::new(None, "mkdir", None));
            job.set_site(Some(site.to_owned()));
            job.executable = Some("/bin/mkdir".to_owned());
            job.arguments = Some(format!("-p {dir_url}"));
            Ok(job)
        }
    }

    pub fn site_store(sites: &[&str]) -> MemorySiteStore {
        sites
            .iter()
            .map(|id| {
                let mut entry = SiteEntry::new(id);
                entry.work_dir = Some(format!("/scratch/{id}"));
                entry.file_servers = vec![format!("gsiftp://{id}.org")];
                entry
            })
            .collect()
    }

    pub fn compute(graph: &mut Graph, name: &str, site: &str) -> NodeId {
        let mut job = Job::compute(name, TxName::new(None, name, None));
        job.set_site(Some(site.to_owned()));
        graph.add_node(job).unwrap()
    }

    pub fn transfer(graph: &mut Graph, name: &str, ty: JobType, site: Option<&str>) -> NodeId {
        let mut job = Job::new(name, ty, TxName::new(Some("transfer"), "copy", None));
        job.set_non_tpt_site(site.map(str::to_owned));
        graph.add_node(job).unwrap()
    }

    /// true if there's a path from `from` to `to`.
    pub fn reaches(graph: &Graph, from: NodeId, to: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.insert(id) {
                stack.extend(graph.children(id).iter().copied());
            }
        }
        false
    }

    /// a -> b (both on x), a -> c (stage-out from x, leaf), d on y, e stage-in to y -> d,
    /// s on the reserved site, w a worker package transfer.
    pub fn sample_graph() -> Graph {
        let mut graph = Graph::new("wf", 1);
        let a = compute(&mut graph, "a", "x");
        let b = compute(&mut graph, "b", "x");
        let c = transfer(&mut graph, "c", JobType::StageOut, Some("x"));
        let d = compute(&mut graph, "d", "y");
        let e = transfer(&mut graph, "e", JobType::StageIn, Some("y"));
        compute(&mut graph, "s", RESERVED_SITE);
        transfer(&mut graph, "w", JobType::StageWorker, Some("z"));
        graph.add_edge(a, b).unwrap();
        graph.add_edge(a, c).unwrap();
        graph.add_edge(e, d).unwrap();
        graph
    }

    #[test]
    fn test_required_site() {
        let mut graph = sample_graph();
        let find = |graph: &Graph, name| graph.find(name).unwrap();

        assert_eq!(Some("x"), required_site(&graph, find(&graph, "a")));
        assert_eq!(None, required_site(&graph, find(&graph, "c")));
        assert_eq!(Some("y"), required_site(&graph, find(&graph, "e")));
        assert_eq!(None, required_site(&graph, find(&graph, "s")));
        assert_eq!(None, required_site(&graph, find(&graph, "w")));

        // staging site wins over execution site:
        let b = find(&graph, "b");
        graph.job_mut(b).set_staging_site(Some("shared".to_owned()));
        assert_eq!(Some("shared"), required_site(&graph, b));

        // a stage-out with something downstream does need its directory:
        let c = find(&graph, "c");
        let reg = transfer(&mut graph, "reg", JobType::Registration, Some("x"));
        graph.add_edge(c, reg).unwrap();
        assert_eq!(Some("x"), required_site(&graph, c));
        assert_eq!(None, required_site(&graph, reg));

        let sites: Vec<_> = create_dir_sites(&graph).into_iter().collect();
        assert_eq!(vec!["shared", "x", "y"], sites);
    }

    #[test]
    fn test_factory() {
        let store = site_store(&["x"]);
        let factory = DirJobFactory::new(&EchoImplementation, &store, "pre_");
        let graph = Graph::new("diamond", 2);

        assert_eq!("create_dir_pre_diamond_2_x", factory.job_name(&graph, "x"));
        assert_eq!("concat_pre_diamond_2", factory.concat_name(&graph));

        let job = factory.make_job(&graph, "x").unwrap();
        assert_eq!(JobType::CreateDir, job.job_type);
        assert_eq!(Some("-p gsiftp://x.org/scratch/x"), job.arguments.as_deref());
        assert!(matches!(
            factory.make_job(&graph, "nowhere"),
            Err(Error::UnknownSite(_))
        ));
    }

    #[test]
    fn test_lookup() {
        assert_eq!("Minimal", lookup("minimal").unwrap().0);
        assert!(matches!(lookup("Pyramid"), Err(Error::UnknownStrategy(..))));
        for (name, _) in STRATEGIES {
            assert!(load(name).is_ok());
        }
    }
}

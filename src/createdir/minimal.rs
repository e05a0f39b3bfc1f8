use traverse::{bfs_order, describe_ancestry};
use util::{BitVec, Bitmask, HashMap, IdVec};
use workflow::{Graph, NodeId};

use super::{
    add_linked, create_dir_sites, required_site, DirJobFactory, DirectoryStrategy, Error,
    LinkReport,
};

/// Assigns each directory site a bit index.
#[derive(Debug, Default)]
pub struct SiteIndex {
    sites: Vec<String>,
    index: HashMap<String, usize>,
}

impl SiteIndex {
    pub fn new(sites: Vec<String>) -> Self {
        let index = sites
            .iter()
            .enumerate()
            .map(|(i, site)| (site.clone(), i))
            .collect();
        Self { sites, index }
    }

    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn get(&self, site: &str) -> Option<usize> {
        self.index.get(site).copied()
    }

    /// Index of `site`, which job `id` needs; an error naming the job and
    /// its ancestry if the site has no index.
    pub fn require(&self, graph: &Graph, id: NodeId, site: &str) -> Result<usize, Error> {
        self.get(site).ok_or_else(|| Error::UnindexedSite {
            site: site.to_owned(),
            job: describe_ancestry(graph, id),
        })
    }

    /// Make sure every site a job of `graph` needs has an index.
    pub fn validate(&self, graph: &Graph) -> Result<(), Error> {
        for id in graph.ids() {
            if let Some(site) = required_site(graph, id) {
                self.require(graph, id, site)?;
            }
        }
        Ok(())
    }
}

/// Adds only the edges needed for every job to have a path from
/// the directory job it needs.
///
/// A single pass over the original graph, parents before children, tracks
/// which directory jobs each job can already be reached from as a bitmask
/// (the union of its parents' masks). A job gets an edge from its site's
/// directory job only if that bit isn't set yet.
pub struct Minimal;

impl Minimal {
    /// The `(site, job)` pairs that need an edge.
    fn links<B: Bitmask>(graph: &Graph, index: &SiteIndex) -> Result<Vec<(usize, NodeId)>, Error> {
        let width = index.len();
        let mut masks: IdVec<NodeId, B> = IdVec::fill(B::empty(width), graph.len());
        let mut links = Vec::with_capacity(width);

        for id in bfs_order(graph)? {
            let mut mask = B::empty(width);
            for parent in graph.parents(id) {
                mask.union_with(masks.get(*parent));
            }
            if let Some(site) = required_site(graph, id) {
                let bit = index.require(graph, id, site)?;
                if !mask.get(bit) {
                    log::trace!("linking {site} directory to {}", graph.job(id).name);
                    links.push((bit, id));
                    mask.set(bit);
                }
            }
            *masks.get_mut(id) = mask;
        }
        Ok(links)
    }
}

impl DirectoryStrategy for Minimal {
    fn description(&self) -> &'static str {
        "Minimal: only the edges needed to reach every job"
    }

    fn add_create_dir_jobs(
        &self,
        graph: &mut Graph,
        factory: &DirJobFactory,
    ) -> Result<LinkReport, Error> {
        let index = SiteIndex::new(create_dir_sites(graph).into_iter().collect());
        index.validate(graph)?;

        let links = match index.len() {
            x if x <= 8 => Self::links::<u8>(graph, &index)?,
            x if x <= 16 => Self::links::<u16>(graph, &index)?,
            x if x <= 32 => Self::links::<u32>(graph, &index)?,
            x if x <= 64 => Self::links::<u64>(graph, &index)?,
            x if x <= 128 => Self::links::<u128>(graph, &index)?,
            _ => Self::links::<BitVec>(graph, &index)?,
        };
        add_linked(graph, factory, index.sites(), links)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::createdir::test::{compute, reaches, sample_graph, site_store, EchoImplementation};
    use crate::createdir::Tentacles;

    #[test]
    fn test_minimal() {
        let mut graph = sample_graph();
        let original: Vec<_> = graph.ids().collect();
        let store = site_store(&["x", "y"]);
        let factory = DirJobFactory::new(&EchoImplementation, &store, "");

        let report = Minimal.add_create_dir_jobs(&mut graph, &factory).unwrap();
        // only the top job of each site's subtree:
        assert_eq!(2, report.edges_added);
        let (dir_x, dir_y) = (report.dir_jobs[0], report.dir_jobs[1]);
        assert!(graph.has_edge(dir_x, graph.find("a").unwrap()));
        assert!(graph.has_edge(dir_y, graph.find("e").unwrap()));

        for id in original {
            match required_site(&graph, id) {
                Some("x") => assert!(reaches(&graph, dir_x, id)),
                Some("y") => assert!(reaches(&graph, dir_y, id)),
                _ => {}
            }
        }
    }

    /// A site change in the middle of a chain needs its own edge,
    /// and a join of two sites needs nothing new.
    #[test]
    fn test_minimal_never_more_than_tentacles() {
        let build = || {
            let mut graph = Graph::new("chain", 0);
            let a = compute(&mut graph, "a", "x");
            let b = compute(&mut graph, "b", "y");
            let c = compute(&mut graph, "c", "x");
            let d = compute(&mut graph, "d", "y");
            let e = compute(&mut graph, "e", "y");
            graph.add_edge(a, b).unwrap();
            graph.add_edge(b, c).unwrap();
            graph.add_edge(a, d).unwrap();
            graph.add_edge(c, e).unwrap();
            graph.add_edge(d, e).unwrap();
            graph
        };
        let store = site_store(&["x", "y"]);
        let factory = DirJobFactory::new(&EchoImplementation, &store, "");

        let mut minimal = build();
        let report = Minimal.add_create_dir_jobs(&mut minimal, &factory).unwrap();
        // a gets x, b and d each get y (neither is reachable from the other):
        assert_eq!(3, report.edges_added);

        let mut tentacles = build();
        let full = Tentacles
            .add_create_dir_jobs(&mut tentacles, &factory)
            .unwrap();
        assert_eq!(5, full.edges_added);
        assert!(report.edges_added <= full.edges_added);
    }

    #[test]
    fn test_wide_site_index() {
        // more sites than fit in a u128:
        let names: Vec<String> = (0..130).map(|i| format!("site{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut graph = Graph::new("wide", 0);
        let mut prev = None;
        for name in &names {
            let id = compute(&mut graph, &format!("job_{name}"), name);
            if let Some(prev) = prev {
                graph.add_edge(prev, id).unwrap();
            }
            prev = Some(id);
        }
        let store = site_store(&refs);
        let factory = DirJobFactory::new(&EchoImplementation, &store, "");

        let report = Minimal.add_create_dir_jobs(&mut graph, &factory).unwrap();
        assert_eq!(130, report.dir_jobs.len());
        assert_eq!(130, report.edges_added);
    }

    #[test]
    fn test_unindexed_site() {
        let graph = sample_graph();
        let index = SiteIndex::new(vec!["x".to_owned()]);
        match index.validate(&graph) {
            Err(Error::UnindexedSite { site, job }) => {
                assert_eq!("y", site);
                assert_eq!("d <- e", job);
            }
            other => panic!("expected unindexed site error, got {other:?}"),
        }
    }
}

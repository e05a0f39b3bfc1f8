//!
//! Heterogeneous Earliest Finish Time list scheduling.
//!
//! Every job gets an upward rank: its average runtime plus the longest
//! (communication + rank) path through its children. Jobs are then scheduled
//! in decreasing rank order, each on the runnable site where it would finish
//! earliest given processor availability and the cost of moving its parents'
//! outputs between sites.
//!
//! Communication cost is a single estimate (average data size / bandwidth)
//! shared by every edge, not derived from real file sizes.

use std::cmp::Ordering;

use catalog::SiteStore;
use colored::Colorize;
use util::{HashMap, IdVec};
use workflow::{Graph, Job, NodeId, RUNTIME_KEY};

use super::{Error, SiteSelector};
use crate::SiteOracle;

mod bag;
pub use bag::HeftBag;

mod site;
use site::HeftSite;

/// Processor count for sites that don't tell us how many nodes they have.
pub const DEFAULT_PROCESSORS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeftConfig {
    /// Bandwidth between sites, in MB/s.
    pub bandwidth: f64,
    /// Average amount of data passed from a job to its children, in MB.
    pub data_size: f64,
    /// Runtime in seconds for jobs with no runtime profile.
    pub default_runtime: u64,
}

impl Default for HeftConfig {
    fn default() -> Self {
        Self {
            bandwidth: 5.0,
            data_size: 2.0,
            default_runtime: 10,
        }
    }
}

impl HeftConfig {
    /// Seconds to move the average data size between two sites.
    pub fn communication_cost(&self) -> f64 {
        if self.bandwidth > 0.0 {
            self.data_size / self.bandwidth
        } else {
            0.0
        }
    }
}

pub struct HeftSelector<'a> {
    oracle: SiteOracle<'a>,
    site_store: &'a dyn SiteStore,
    config: HeftConfig,
    /// Annotations from the most recent run.
    bags: IdVec<NodeId, HeftBag>,
}

impl<'a> HeftSelector<'a> {
    pub fn new(oracle: SiteOracle<'a>, site_store: &'a dyn SiteStore, config: HeftConfig) -> Self {
        Self {
            oracle,
            site_store,
            config,
            bags: IdVec::default(),
        }
    }

    /// Per-job annotations from the most recent `map_workflow`.
    pub fn schedule(&self) -> &IdVec<NodeId, HeftBag> {
        &self.bags
    }

    pub fn bag(&self, id: NodeId) -> Option<&HeftBag> {
        self.bags.try_get(id)
    }

    /// Processors at `site`: its idle nodes, or else its total nodes, or else a default.
    fn processors(&self, site: &str) -> u32 {
        self.site_store
            .lookup(site)
            .and_then(|entry| entry.gateway.as_ref())
            .and_then(|gw| {
                gw.idle_nodes
                    .filter(|n| *n > 0)
                    .or(gw.total_nodes.filter(|n| *n > 0))
            })
            .unwrap_or(DEFAULT_PROCESSORS)
    }

    /// Expected runtime of `job` at `site`, in seconds (never less than 1).
    /// The catalog entry's runtime profile wins over the job's own.
    fn runtime(&self, job: &Job, site: &str) -> f64 {
        let from_catalog = match self.oracle.entries(&job.transformation, site) {
            Ok(entries) => entries
                .first()
                .and_then(|e| e.profiles.get_parsed::<f64>(RUNTIME_KEY)),
            Err(e) => {
                log::warn!("Unable to look up runtime of {} at {site}: {e}", job.name);
                None
            }
        };
        from_catalog
            .or_else(|| job.profiles.get_parsed::<f64>(RUNTIME_KEY))
            .unwrap_or(self.config.default_runtime as f64)
            .max(1.0)
    }

    /// Runnable sites, runtimes and average compute cost of one job.
    fn annotate(&self, job: &Job, sites: &[String]) -> Result<HeftBag, Error> {
        let runnable = self.oracle.sites_for(&job.transformation, sites);
        if runnable.is_empty() {
            return Err(Error::NoRunnableSite(job.name.clone()));
        }
        let runtimes: Vec<f64> = runnable.iter().map(|s| self.runtime(job, s)).collect();

        let mut total = 0.0;
        let mut weight = 0.0;
        for (site, runtime) in runnable.iter().zip(&runtimes) {
            let nodes = self.processors(site) as f64;
            total += runtime * nodes;
            weight += nodes;
        }

        Ok(HeftBag {
            avg_compute: total / weight,
            runnable,
            runtimes,
            ..Default::default()
        })
    }

    /// Time at which all of `id`'s parents' outputs can be at `site`.
    fn ready_time(&self, graph: &Graph, id: NodeId, site: &str, comm: f64) -> f64 {
        let mut ready: f64 = 0.0;
        for parent in graph.parents(id) {
            let bag = self.bags.get(*parent);
            debug_assert!(bag.is_scheduled(), "parent scheduled after child");
            let mut arrival = bag.finish;
            if bag.site.as_deref() != Some(site) {
                arrival += comm;
            }
            ready = ready.max(arrival);
        }
        ready
    }
}

impl SiteSelector for HeftSelector<'_> {
    fn description(&self) -> &'static str {
        "HEFT list scheduling"
    }

    fn map_workflow(&mut self, graph: &mut Graph, sites: &[String]) -> Result<(), Error> {
        let order = traverse::bfs_order(graph)?;
        let comm = self.config.communication_cost();

        let mut bags = IdVec::with_capacity(graph.len());
        for id in graph.ids() {
            bags.push(self.annotate(graph.job(id), sites)?);
        }
        self.bags = bags;

        // upward ranks, children before parents:
        for id in order.iter().rev() {
            let tail = graph
                .children(*id)
                .iter()
                .map(|child| comm + self.bags.get(*child).rank)
                .fold(0.0, f64::max);
            let bag = self.bags.get_mut(*id);
            bag.rank = bag.avg_compute + tail;
        }

        // runtimes are at least 1, so a parent always outranks its children
        // and this order is still parents-before-children.
        // stable sort keeps ties in bfs order.
        let mut ranked = order;
        ranked.sort_by(|a, b| {
            let (a, b) = (self.bags.get(*a).rank, self.bags.get(*b).rank);
            b.partial_cmp(&a).unwrap_or(Ordering::Equal)
        });

        let mut heft_sites: HashMap<&str, HeftSite> = sites
            .iter()
            .map(|s| (s.as_str(), HeftSite::new(self.processors(s))))
            .collect();

        for id in ranked {
            let bag = self.bags.get(id);
            let mut estimates = Vec::with_capacity(bag.runnable.len());
            let mut best: Option<(usize, f64, f64)> = None;
            for (i, site) in bag.runnable.iter().enumerate() {
                let ready = self.ready_time(graph, id, site, comm);
                let start = heft_sites
                    .get(site.as_str())
                    .map_or(ready, |s| s.available_time(ready));
                let finish = start + bag.runtimes[i];
                estimates.push(finish);
                if best.map_or(true, |(_, _, f)| finish < f) {
                    best = Some((i, start, finish));
                }
            }
            // annotate() guarantees at least one runnable site:
            let Some((i, start, finish)) = best else {
                return Err(Error::NoRunnableSite(graph.job(id).name.clone()));
            };

            let bag = self.bags.get_mut(id);
            let site = bag.runnable[i].clone();
            if let Some(s) = heft_sites.get_mut(site.as_str()) {
                s.schedule(start, finish);
            }
            log::debug!(
                "Scheduled job {} to site {} from {start:.1} till {finish:.1}",
                graph.job(id).name.cyan(),
                site.cyan()
            );
            bag.estimates = estimates;
            bag.start = start;
            bag.finish = finish;
            bag.site = Some(site);
        }

        for (id, bag) in self.bags.iter_enumerated() {
            graph.job_mut(id).set_site(bag.site.clone());
        }
        log::info!("HEFT makespan: {:.1}s", self.makespan().unwrap_or_default());
        Ok(())
    }

    /// Latest finish time over all jobs of the most recent schedule.
    fn makespan(&self) -> Option<f64> {
        self.bags
            .iter()
            .filter(|bag| bag.is_scheduled())
            .map(|bag| bag.finish)
            .reduce(f64::max)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use catalog::{
        GridGateway, MemorySiteStore, MemoryTransformationCatalog, SiteEntry, TransformationEntry,
    };
    use workflow::TxName;

    fn site(id: &str, idle: Option<u32>, total: Option<u32>) -> SiteEntry {
        let mut entry = SiteEntry::new(id);
        entry.gateway = Some(GridGateway {
            contact: format!("{id}/jobmanager"),
            idle_nodes: idle,
            total_nodes: total,
        });
        entry
    }

    fn near(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_processors_and_runtime() {
        let tx = TxName::new(None, "sim", None);
        let mut at_x = TransformationEntry::installed(tx.clone(), "x", "/bin/sim");
        at_x.profiles.insert(RUNTIME_KEY, "42");
        let tc = MemoryTransformationCatalog::new(vec![
            at_x,
            TransformationEntry::installed(tx.clone(), "y", "/bin/sim"),
            TransformationEntry::installed(tx.clone(), "z", "/bin/sim"),
        ]);
        let store: MemorySiteStore = vec![
            site("x", Some(4), Some(8)),
            site("y", Some(0), Some(8)),
            site("z", None, None),
        ]
        .into_iter()
        .collect();
        let config = HeftConfig {
            default_runtime: 0,
            ..Default::default()
        };
        let heft = HeftSelector::new(SiteOracle::new(&tc), &store, config);

        assert_eq!(4, heft.processors("x"));
        assert_eq!(8, heft.processors("y"));
        assert_eq!(DEFAULT_PROCESSORS, heft.processors("z"));
        assert_eq!(DEFAULT_PROCESSORS, heft.processors("unknown"));

        let mut job = Job::compute("j", tx.clone());
        // catalog profile wins:
        job.profiles.insert(RUNTIME_KEY, "7");
        assert_eq!(42.0, heft.runtime(&job, "x"));
        assert_eq!(7.0, heft.runtime(&job, "y"));
        // default, clamped to 1:
        let job = Job::compute("k", tx);
        assert_eq!(1.0, heft.runtime(&job, "y"));
    }

    #[test]
    fn test_heft_schedule() {
        let tx = TxName::new(None, "sim", None);
        let mut at_x = TransformationEntry::installed(tx.clone(), "x", "/bin/sim");
        at_x.profiles.insert(RUNTIME_KEY, "10");
        let tc = MemoryTransformationCatalog::new(vec![
            at_x,
            TransformationEntry::installed(tx.clone(), "y", "/bin/sim"),
        ]);
        let store: MemorySiteStore = vec![site("x", Some(1), None), site("y", Some(1), None)]
            .into_iter()
            .collect();

        let mut graph = Graph::new("wf", 0);
        let mut add = |name: &str| {
            let mut job = Job::compute(name, tx.clone());
            job.profiles.insert(RUNTIME_KEY, "10");
            graph.add_node(job).unwrap()
        };
        let (a, b, c) = (add("a"), add("b"), add("c"));
        graph.add_edge(a, b).unwrap();
        graph.add_edge(a, c).unwrap();

        // communication cost: 2 MB / 5 MB/s = 0.4s
        let mut heft = HeftSelector::new(SiteOracle::new(&tc), &store, HeftConfig::default());
        let sites = vec!["x".to_owned(), "y".to_owned()];
        heft.map_workflow(&mut graph, &sites).unwrap();

        assert!(near(20.4, heft.bag(a).unwrap().rank));
        assert!(near(10.0, heft.bag(b).unwrap().rank));

        assert_eq!(Some("x"), graph.job(a).site());
        assert_eq!(Some("x"), graph.job(b).site());
        // x is busy with b, so c is cheaper on y even after the transfer:
        assert_eq!(Some("y"), graph.job(c).site());
        assert!(near(10.4, heft.bag(c).unwrap().start));
        assert!(near(20.4, heft.makespan().unwrap()));

        // no child starts before its parent's data could have arrived:
        let comm = HeftConfig::default().communication_cost();
        for id in graph.ids() {
            let child = heft.bag(id).unwrap();
            for parent in graph.parents(id) {
                let parent = heft.bag(*parent).unwrap();
                let delay = if parent.site == child.site { 0.0 } else { comm };
                assert!(child.start + 1e-9 >= parent.finish + delay);
            }
        }
    }

    #[test]
    fn test_heft_no_runnable_site() {
        let tc = MemoryTransformationCatalog::default();
        let store = MemorySiteStore::new();
        let mut graph = Graph::new("wf", 0);
        graph
            .add_node(Job::compute("a", TxName::new(None, "sim", None)))
            .unwrap();
        let mut heft = HeftSelector::new(SiteOracle::new(&tc), &store, HeftConfig::default());
        let err = heft.map_workflow(&mut graph, &["x".to_owned()]).unwrap_err();
        assert!(matches!(err, Error::NoRunnableSite(name) if name == "a"));
        assert_eq!(None, heft.makespan());
    }
}

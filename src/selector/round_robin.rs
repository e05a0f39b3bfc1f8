use workflow::{Graph, Job};

use super::{map_each_job, Error, PerJobSelector, SiteSelector, WorkflowInfo};
use crate::SiteOracle;

/// A candidate site and the number of jobs given to it in the current level.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    site: String,
    count: u32,
}

/// Spreads the jobs of each level across the valid sites in turn.
///
/// Sites are kept ordered by how often they've been used in the current level,
/// and each job goes to the least-used site where it can run. Counts go back
/// to zero whenever the level of the job being mapped changes.
pub struct RoundRobinSelector<'a> {
    oracle: SiteOracle<'a>,
    slots: Vec<Slot>,
    level: Option<u32>,
}

impl<'a> RoundRobinSelector<'a> {
    pub fn new(oracle: SiteOracle<'a>) -> Self {
        Self {
            oracle,
            slots: Vec::with_capacity(0),
            level: None,
        }
    }

    /// (re)build our slots if we've been handed a different list of sites.
    fn ensure_slots(&mut self, sites: &[String]) {
        let same = self.slots.len() == sites.len()
            && sites.iter().all(|s| self.slots.iter().any(|slot| &slot.site == s));
        if !same {
            self.slots = sites
                .iter()
                .map(|site| Slot {
                    site: site.clone(),
                    count: 0,
                })
                .collect();
            self.level = None;
        }
    }

    fn reset_counts(&mut self) {
        for slot in &mut self.slots {
            slot.count = 0;
        }
    }

    /// Count one more use of the slot at `i`, and move it back past
    /// any slots that have been used as often or less.
    fn bump(&mut self, i: usize) {
        let mut slot = self.slots.remove(i);
        slot.count += 1;
        let mut pos = i;
        while pos < self.slots.len() && self.slots[pos].count <= slot.count {
            pos += 1;
        }
        self.slots.insert(pos, slot);
    }

    #[cfg(test)]
    fn counts(&self) -> Vec<(&str, u32)> {
        self.slots.iter().map(|s| (s.site.as_str(), s.count)).collect()
    }
}

impl PerJobSelector for RoundRobinSelector<'_> {
    fn description(&self) -> &'static str {
        "Round robin across valid sites, per level"
    }

    fn map_job(&mut self, job: &mut Job, sites: &[String], _wf: &WorkflowInfo) -> Result<(), Error> {
        self.ensure_slots(sites);
        if self.level != Some(job.level) {
            log::trace!("round robin: starting level {}", job.level);
            self.reset_counts();
            self.level = Some(job.level);
        }

        let found = self
            .slots
            .iter()
            .position(|slot| self.oracle.is_site_valid(&job.transformation, &slot.site));
        match found {
            Some(i) => {
                job.set_site(Some(self.slots[i].site.clone()));
                self.bump(i);
            }
            None => {
                log::debug!("no valid site for job {}", job.name);
                job.set_site(None);
            }
        }
        Ok(())
    }
}

impl SiteSelector for RoundRobinSelector<'_> {
    fn description(&self) -> &'static str {
        PerJobSelector::description(self)
    }

    fn map_workflow(&mut self, graph: &mut Graph, sites: &[String]) -> Result<(), Error> {
        map_each_job(self, graph, sites)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use catalog::{MemoryTransformationCatalog, TransformationEntry};
    use workflow::TxName;

    fn sites(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn catalog(tx: &TxName, sites: &[&str]) -> MemoryTransformationCatalog {
        MemoryTransformationCatalog::new(
            sites
                .iter()
                .map(|s| TransformationEntry::installed(tx.clone(), s, "/bin/sim"))
                .collect(),
        )
    }

    #[test]
    fn test_round_robin_within_level() {
        let tx = TxName::new(None, "sim", None);
        let tc = catalog(&tx, &["a", "b", "c"]);
        let mut selector = RoundRobinSelector::new(SiteOracle::new(&tc));
        let candidates = sites(&["a", "b", "c"]);
        let wf = WorkflowInfo::default();

        let mut chosen = Vec::new();
        for i in 0..7 {
            let mut job = Job::compute(&format!("j{i}"), tx.clone());
            job.level = 1;
            selector.map_job(&mut job, &candidates, &wf).unwrap();
            chosen.push(job.site().unwrap().to_owned());
        }
        assert_eq!(vec!["a", "b", "c", "a", "b", "c", "a"], chosen);

        // a new level starts from scratch:
        let mut job = Job::compute("next", tx.clone());
        job.level = 2;
        selector.map_job(&mut job, &candidates, &wf).unwrap();
        let counts = selector.counts();
        assert_eq!(1, counts.iter().map(|(_, c)| c).sum::<u32>());
        assert_eq!(1, counts.iter().filter(|(s, _)| *s == job.site().unwrap()).count());
    }

    #[test]
    fn test_round_robin_skips_invalid_sites() {
        let tx = TxName::new(None, "sim", None);
        let tc = catalog(&tx, &["a", "c"]);
        let mut selector = RoundRobinSelector::new(SiteOracle::new(&tc));
        let candidates = sites(&["a", "b", "c"]);
        let wf = WorkflowInfo::default();

        let mut chosen = Vec::new();
        for i in 0..4 {
            let mut job = Job::compute(&format!("j{i}"), tx.clone());
            selector.map_job(&mut job, &candidates, &wf).unwrap();
            chosen.push(job.site().unwrap().to_owned());
        }
        assert_eq!(vec!["a", "c", "a", "c"], chosen);

        let mut job = Job::compute("other", TxName::new(None, "plot", None));
        selector.map_job(&mut job, &candidates, &wf).unwrap();
        assert_eq!(None, job.site());
    }

    #[test]
    fn test_round_robin_balances_each_level() {
        let tx = TxName::new(None, "sim", None);
        let tc = catalog(&tx, &["a", "b", "c", "d"]);
        let mut selector = RoundRobinSelector::new(SiteOracle::new(&tc));
        let candidates = sites(&["a", "b", "c", "d"]);
        let wf = WorkflowInfo::default();

        for i in 0..10 {
            let mut job = Job::compute(&format!("j{i}"), tx.clone());
            job.level = 3;
            selector.map_job(&mut job, &candidates, &wf).unwrap();
            let counts: Vec<u32> = selector.counts().iter().map(|(_, c)| *c).collect();
            let max = counts.iter().max().unwrap();
            let min = counts.iter().min().unwrap();
            assert!(max - min <= 1, "unbalanced counts {counts:?}");
        }
    }
}

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use workflow::{Graph, Job};

use super::{map_each_job, Error, PerJobSelector, SiteSelector, WorkflowInfo};
use crate::SiteOracle;

/// Picks uniformly at random among the candidate sites where a job can run.
pub struct RandomSelector<'a, R = StdRng> {
    oracle: SiteOracle<'a>,
    rng: R,
}

impl<'a> RandomSelector<'a, StdRng> {
    /// Seeded from the OS, so repeated runs make different choices.
    pub fn new(oracle: SiteOracle<'a>) -> Self {
        Self::with_rng(oracle, StdRng::from_os_rng())
    }
}

impl<'a, R: Rng> RandomSelector<'a, R> {
    pub fn with_rng(oracle: SiteOracle<'a>, rng: R) -> Self {
        Self { oracle, rng }
    }
}

impl<R: Rng> PerJobSelector for RandomSelector<'_, R> {
    fn description(&self) -> &'static str {
        "Random selection among valid sites"
    }

    fn map_job(&mut self, job: &mut Job, sites: &[String], _wf: &WorkflowInfo) -> Result<(), Error> {
        let valid = self.oracle.sites_for(&job.transformation, sites);
        let chosen = valid.choose(&mut self.rng).cloned();
        if chosen.is_none() {
            log::debug!("no valid site for job {}", job.name);
        }
        job.set_site(chosen);
        Ok(())
    }
}

impl<R: Rng> SiteSelector for RandomSelector<'_, R> {
    fn description(&self) -> &'static str {
        PerJobSelector::description(self)
    }

    fn map_workflow(&mut self, graph: &mut Graph, sites: &[String]) -> Result<(), Error> {
        map_each_job(self, graph, sites)
    }
}

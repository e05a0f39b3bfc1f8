use anyhow::{Context, Result};
use colored::Colorize;

use catalog::{SiteStore, TransformationCatalog};
use traverse::Errors;
use util::Timer;
use workflow::{Graph, NodeId};

use crate::createdir::{self, DirJobFactory, DirManagerImplementation, Implementation};
use crate::selector::{self, SelectorContext};
use crate::settings::Settings;
use crate::SiteOracle;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Job {0} could not be mapped to any site")]
    Unmapped(String),
}

/// What one planning run did.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSummary {
    pub selector: String,
    pub dir_strategy: String,
    /// Number of jobs given a site.
    pub mapped_jobs: usize,
    pub dir_jobs: Vec<NodeId>,
    pub concat: Option<NodeId>,
    pub edges_added: usize,
    /// Estimated makespan, for selectors that schedule.
    pub makespan: Option<f64>,
}

/// Drives one planning run over a workflow:
/// site selection, then directory job synthesis.
pub struct Planner<'a> {
    settings: &'a Settings,
    tc: &'a dyn TransformationCatalog,
    site_store: &'a dyn SiteStore,
    implementation: Box<dyn Implementation + 'a>,
}

impl<'a> Planner<'a> {
    /// Create a planner that uses the dirmanager tool for directory jobs.
    pub fn new(
        settings: &'a Settings,
        tc: &'a dyn TransformationCatalog,
        site_store: &'a dyn SiteStore,
    ) -> Self {
        let implementation = DirManagerImplementation::new(SiteOracle::new(tc), site_store);
        Self {
            settings,
            tc,
            site_store,
            implementation: Box::new(implementation),
        }
    }

    /// Use a different payload for directory jobs.
    pub fn with_implementation(mut self, implementation: Box<dyn Implementation + 'a>) -> Self {
        self.implementation = implementation;
        self
    }

    /// Map every job of `graph` to a site and add its directory jobs.
    ///
    /// Fails without adding directory jobs if any job is left without a site.
    pub fn plan(&self, graph: &mut Graph) -> Result<PlanSummary> {
        let mut timer = Timer::now();

        // levels normally come with the workflow; fill them in if they didn't:
        if graph.jobs().all(|job| job.level == 0) {
            traverse::assign_levels(graph).context("Unable to assign job levels")?;
        }

        let ctx = SelectorContext::new(
            self.tc,
            self.site_store,
            &self.settings.external,
            &self.settings.heft,
        );
        let mut selector = selector::load(&self.settings.selector, &ctx)
            .context("Unable to load site selector")?;
        selector
            .map_workflow(graph, &self.settings.sites)
            .with_context(|| format!("Site selection failed for workflow {}", graph.label))?;
        timer.log_elapsed("site selection");

        let mapped_jobs = self.check_mapping(graph)?;
        log::info!(
            "{} {mapped_jobs} jobs of {}",
            "Mapped".green(),
            graph.label
        );

        timer.reset();
        let strategy = createdir::load(&self.settings.dir_strategy)?;
        let factory = DirJobFactory::new(
            self.implementation.as_ref(),
            self.site_store,
            &self.settings.job_prefix,
        );
        let report = strategy
            .add_create_dir_jobs(graph, &factory)
            .context("Unable to add directory creation jobs")?;
        timer.log_elapsed("directory job synthesis");
        log::info!(
            "Added {} directory jobs and {} edges",
            report.dir_jobs.len(),
            report.edges_added
        );

        Ok(PlanSummary {
            selector: self.settings.selector.clone(),
            dir_strategy: self.settings.dir_strategy.clone(),
            mapped_jobs,
            dir_jobs: report.dir_jobs,
            concat: report.concat,
            edges_added: report.edges_added,
            makespan: selector.makespan(),
        })
    }

    /// Fail with every job that has no site; otherwise default each job's
    /// staging site to its execution site, and return the number of jobs.
    fn check_mapping(&self, graph: &mut Graph) -> Result<usize> {
        let mut errors = Errors::default();
        for id in graph.ids() {
            let job = graph.job_mut(id);
            match job.site().map(str::to_owned) {
                None => errors.add(Error::Unmapped(job.name.clone()).into()),
                Some(site) => {
                    if job.staging_site().is_none() {
                        job.set_staging_site(Some(site));
                    }
                }
            }
        }
        errors.recap("site selection")?;
        Ok(graph.len())
    }
}

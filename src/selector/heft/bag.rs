/// Scheduling annotation HEFT keeps for each job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeftBag {
    /// Sites where the job can run, in candidate order.
    pub runnable: Vec<String>,
    /// Runtime on each runnable site, in seconds.
    pub runtimes: Vec<f64>,
    /// Processor-weighted average runtime over the runnable sites.
    pub avg_compute: f64,
    /// Upward rank: length of the critical path from this job to the end of the workflow.
    pub rank: f64,
    /// Estimated finish time on each runnable site, as computed when the job was scheduled.
    pub estimates: Vec<f64>,
    pub site: Option<String>,
    pub start: f64,
    pub finish: f64,
}

impl HeftBag {
    /// Runtime of this job on `site`, if it can run there.
    pub fn runtime_on(&self, site: &str) -> Option<f64> {
        self.runnable
            .iter()
            .position(|s| s == site)
            .map(|i| self.runtimes[i])
    }

    pub fn is_scheduled(&self) -> bool {
        self.site.is_some()
    }
}

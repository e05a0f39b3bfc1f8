/// Processor availability at one site.
///
/// Scheduling is non-insertion based: a job always goes to the processor
/// that frees up first, after everything already scheduled there.
#[derive(Debug, Clone)]
pub struct HeftSite {
    /// Time at which each processor becomes free.
    free_at: Vec<f64>,
}

impl HeftSite {
    pub fn new(processors: u32) -> Self {
        Self {
            free_at: vec![0.0; processors.max(1) as usize],
        }
    }

    pub fn processors(&self) -> usize {
        self.free_at.len()
    }

    /// Index of the processor that frees up first.
    fn earliest(&self) -> usize {
        let mut best = 0;
        for (i, t) in self.free_at.iter().enumerate() {
            if *t < self.free_at[best] {
                best = i;
            }
        }
        best
    }

    /// Earliest time a job that is ready at `ready` could start here.
    pub fn available_time(&self, ready: f64) -> f64 {
        ready.max(self.free_at[self.earliest()])
    }

    /// Book the first-free processor from `start` until `end`.
    pub fn schedule(&mut self, start: f64, end: f64) {
        let i = self.earliest();
        debug_assert!(start >= self.free_at[i]);
        self.free_at[i] = end;
    }
}

/// Definition of command-line args
mod args;
/// Validated planner settings
mod settings;
/// Transformation catalog queries on behalf of the selectors
mod oracle;
/// Site selection strategies
pub mod selector;
/// Directory-creation job synthesis
pub mod createdir;
/// Drives one planning run
mod planner;

// exported for tests:
pub use args::Args;
pub use oracle::SiteOracle;
pub use planner::{PlanSummary, Planner};
pub use settings::{KeepPolicy, Settings};

/// Install a stderr logger at a level matching `verbosity`
/// (0 = warnings only, 3 or more = everything).
pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    simple_logging::log_to_stderr(log_level);
}

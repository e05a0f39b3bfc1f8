use clap::Parser;

const CMD_NAME: &str = "siteplan";
const DEFAULT_SELECTOR: &str = "Random";
const DEFAULT_STRATEGY: &str = "HourGlass";
const DEFAULT_TIMEOUT: &str = "60";
const DEFAULT_KEEP: &str = "onerror";
const DEFAULT_ENV_PREFIX: &str = "SITEPLAN_SELECTOR_ENV_";

/// Planner configuration as command-line flags or `SITEPLAN_*` variables.
///
/// Tools embedding the planner parse this with `Args::parse` and convert it
/// into [`Settings`](crate::Settings).
#[derive(Parser, Debug)]
#[command(name = CMD_NAME, version, about = None, long_about = None)]
pub struct Args {
    /// Site selection strategy
    #[arg(short, long, value_name = "NAME", default_value = DEFAULT_SELECTOR)]
    #[arg(env = "SITEPLAN_SITE_SELECTOR")]
    pub site_selector: String,

    /// Strategy for wiring directory-creation jobs into the workflow
    #[arg(short, long, value_name = "NAME", default_value = DEFAULT_STRATEGY)]
    #[arg(env = "SITEPLAN_DIR_STRATEGY")]
    pub dir_strategy: String,

    /// Candidate execution sites
    #[arg(long, value_name = "SITE[,SITE...]", value_delimiter = ',')]
    #[arg(env = "SITEPLAN_SITES")]
    pub sites: Vec<String>,

    /// Prefix added to the names of generated jobs
    #[arg(long, value_name = "PREFIX")]
    #[arg(env = "SITEPLAN_JOB_PREFIX")]
    pub job_prefix: Option<String>,

    /// Workflow label
    #[arg(short, long, value_name = "LABEL", default_value = "workflow")]
    #[arg(env = "SITEPLAN_LABEL")]
    pub label: String,

    /// Workflow index
    #[arg(short, long, value_name = "N", default_value_t = 0)]
    #[arg(env = "SITEPLAN_INDEX")]
    pub index: u32,

    /// Executable used by the External site selector
    #[arg(long, value_name = "PATH")]
    #[arg(env = "SITEPLAN_SELECTOR_PATH")]
    pub selector_path: Option<String>,

    /// Seconds to wait for output from the external selector (0 or less: wait forever)
    #[arg(long, value_name = "SECS", default_value = DEFAULT_TIMEOUT, allow_negative_numbers = true)]
    #[arg(env = "SITEPLAN_SELECTOR_TIMEOUT")]
    pub selector_timeout: i64,

    /// When to keep the external selector's input file: always, never, or onerror
    #[arg(long, value_name = "POLICY", default_value = DEFAULT_KEEP)]
    #[arg(env = "SITEPLAN_SELECTOR_KEEP")]
    pub selector_keep: String,

    /// Environment variables with this prefix are passed on to the external selector
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_ENV_PREFIX)]
    #[arg(env = "SITEPLAN_SELECTOR_ENV_PREFIX")]
    pub selector_env_prefix: String,

    /// Inter-site bandwidth assumed by HEFT, in MB/s
    #[arg(long, value_name = "MBPS", default_value_t = 5.0)]
    #[arg(env = "SITEPLAN_HEFT_BANDWIDTH")]
    pub heft_bandwidth: f64,

    /// Average data size moved between dependent jobs assumed by HEFT, in MB
    #[arg(long, value_name = "MB", default_value_t = 2.0)]
    #[arg(env = "SITEPLAN_HEFT_DATA_SIZE")]
    pub heft_data_size: f64,

    /// Runtime assumed by HEFT for jobs without a runtime profile, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    #[arg(env = "SITEPLAN_HEFT_DEFAULT_RUNTIME")]
    pub heft_default_runtime: u64,

    /// Print additional debugging info (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            site_selector: DEFAULT_SELECTOR.to_owned(),
            dir_strategy: DEFAULT_STRATEGY.to_owned(),
            sites: Vec::with_capacity(0),
            job_prefix: None,
            label: "workflow".to_owned(),
            index: 0,
            selector_path: None,
            selector_timeout: 60,
            selector_keep: DEFAULT_KEEP.to_owned(),
            selector_env_prefix: DEFAULT_ENV_PREFIX.to_owned(),
            heft_bandwidth: 5.0,
            heft_data_size: 2.0,
            heft_default_runtime: 10,
            verbose: 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "siteplan",
            "--site-selector",
            "RoundRobin",
            "--sites",
            "x,y,z",
            "--selector-timeout",
            "-1",
            "-vv",
        ])
        .unwrap();
        assert_eq!("RoundRobin", args.site_selector);
        assert_eq!(vec!["x", "y", "z"], args.sites);
        assert_eq!(-1, args.selector_timeout);
        assert_eq!(2, args.verbose);
        assert_eq!(DEFAULT_STRATEGY, args.dir_strategy);
    }
}

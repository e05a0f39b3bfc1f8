use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use workflow::Graph;

use crate::args::Args;
use crate::createdir;
use crate::selector::{self, ExternalConfig, HeftConfig};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid selector keep policy \"{0}\" (should be one of 'always', 'never', 'onerror')")]
    InvalidKeepPolicy(String),
    #[error("HEFT bandwidth must be positive (got {0})")]
    InvalidBandwidth(f64),
    #[error("No candidate sites specified")]
    NoSites,
}

/// When the external selector's input file is kept around after the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeepPolicy {
    Always,
    Never,
    /// keep the file only if the call failed.
    #[default]
    OnError,
}

impl KeepPolicy {
    /// true if the input file of a call with the given outcome should be deleted.
    pub fn should_delete(&self, success: bool) -> bool {
        match self {
            Self::Always => false,
            Self::Never => true,
            Self::OnError => success,
        }
    }
}

impl FromStr for KeepPolicy {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            "onerror" => Ok(Self::OnError),
            _ => Err(Error::InvalidKeepPolicy(s.to_owned())),
        }
    }
}

/// Settings are like Args, except all the logic has
/// been applied so e.g. names are validated and the environment is read.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Registered name of the site selector.
    pub selector: String,
    /// Registered name of the directory strategy.
    pub dir_strategy: String,
    pub sites: Vec<String>,
    pub job_prefix: String,
    pub label: String,
    pub index: u32,
    pub external: ExternalConfig,
    pub heft: HeftConfig,
    pub verbose: u8,
}

impl Settings {
    /// Build settings for tests and library users: the given selector and
    /// strategy with every other value at its default.
    pub fn new(selector: &str, dir_strategy: &str, sites: &[&str]) -> anyhow::Result<Self> {
        let args = Args {
            site_selector: selector.to_owned(),
            dir_strategy: dir_strategy.to_owned(),
            sites: sites.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        args.try_into()
    }

    /// An empty workflow graph with our label and index.
    pub fn new_graph(&self) -> Graph {
        Graph::new(&self.label, self.index)
    }
}

/// Collect the variables in `vars` whose names start with `prefix`,
/// with the prefix stripped.
fn env_with_prefix(
    prefix: &str,
    vars: impl Iterator<Item = (String, String)>,
) -> Vec<(String, String)> {
    let mut found: Vec<_> = vars
        .filter_map(|(k, v)| match k.strip_prefix(prefix) {
            Some(name) if !name.is_empty() => Some((name.to_owned(), v)),
            _ => None,
        })
        .collect();
    found.sort();
    found
}

impl TryFrom<Args> for Settings {
    type Error = anyhow::Error;
    fn try_from(args: Args) -> Result<Self, Self::Error> {
        // fail at load time on names we don't know:
        let selector = selector::lookup(&args.site_selector)?.0.to_owned();
        let dir_strategy = createdir::lookup(&args.dir_strategy)?.0.to_owned();

        let sites: Vec<String> = args
            .sites
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        if sites.is_empty() {
            return Err(Error::NoSites.into());
        }

        let timeout = match args.selector_timeout {
            secs if secs <= 0 => None,
            secs => Some(Duration::from_secs(secs as u64)),
        };
        let external = ExternalConfig {
            path: args.selector_path.map(PathBuf::from),
            timeout,
            keep: args.selector_keep.parse()?,
            env: env_with_prefix(&args.selector_env_prefix, std::env::vars()),
        };

        if args.heft_bandwidth <= 0.0 || args.heft_bandwidth.is_nan() {
            return Err(Error::InvalidBandwidth(args.heft_bandwidth).into());
        }
        let heft = HeftConfig {
            bandwidth: args.heft_bandwidth,
            data_size: args.heft_data_size.max(0.0),
            default_runtime: args.heft_default_runtime.max(1),
        };

        Ok(Self {
            selector,
            dir_strategy,
            sites,
            job_prefix: args.job_prefix.unwrap_or_default(),
            label: args.label,
            index: args.index,
            external,
            heft,
            verbose: args.verbose,
        })
    }
}

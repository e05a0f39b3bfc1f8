//!
//! Site selection by an external executable.
//!
//! For every job we write a request file of `key=value` lines, run the
//! executable with the file's path as its only argument, and look for a line
//! `SOLUTION:<site>[:<jobmanager>]` on its stdout.
//!
//! The executable runs with a cleared environment: only a few basic variables
//! (`HOME`, `USER`, `LOGNAME`, `TMP`, `TZ`) and the variables from
//! [`ExternalConfig::env`] are set.

use std::fmt::Write as _;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use catalog::SiteStore;
use colored::Colorize;
use util::Timer;
use workflow::{Graph, Job};

use super::{map_each_job, Error, PerJobSelector, SiteSelector, WorkflowInfo};
use crate::settings::KeepPolicy;
use crate::SiteOracle;

/// Version of the request file format.
pub const PROTOCOL_VERSION: &str = "2.0";
pub const SOLUTION_PREFIX: &str = "SOLUTION:";
/// Written in place of missing values, and never accepted as a site.
const NONE: &str = "NONE";
const TEMP_PREFIX: &str = "siteplan";
/// Variables copied from our own environment into the selector's.
const BASE_ENV: &[&str] = &["HOME", "USER", "LOGNAME", "TMP", "TZ"];

#[derive(Debug, Clone, Default)]
pub struct ExternalConfig {
    /// The executable to call.
    pub path: Option<PathBuf>,
    /// How long to wait for the next line of output; `None` waits forever.
    pub timeout: Option<Duration>,
    pub keep: KeepPolicy,
    /// Extra environment for the executable.
    pub env: Vec<(String, String)>,
}

/// Format the request file for `job`.
pub fn write_request(
    job: &Job,
    sites: &[String],
    site_store: &dyn SiteStore,
    wf: &WorkflowInfo,
) -> String {
    let mut s = String::with_capacity(512);
    // writing to a String can't fail:
    let _ = write_request_into(&mut s, job, sites, site_store, wf);
    s
}

fn write_request_into(
    s: &mut String,
    job: &Job,
    sites: &[String],
    site_store: &dyn SiteStore,
    wf: &WorkflowInfo,
) -> std::fmt::Result {
    writeln!(s, "version={PROTOCOL_VERSION}")?;
    writeln!(s, "transformation={}", job.transformation)?;
    match &job.derivation {
        Some(dv) => writeln!(s, "derivation={dv}")?,
        None => writeln!(s, "derivation={NONE}")?,
    }
    writeln!(s, "job.level={}", job.level)?;
    writeln!(s, "job.id={}", job.logical_id)?;

    if sites.is_empty() {
        writeln!(s, "resource.id={NONE} {NONE}")?;
    }
    for site in sites {
        let Some(entry) = site_store.lookup(site) else {
            log::debug!("site {site} is not in the site store; no file servers to report");
            continue;
        };
        for server in &entry.file_servers {
            writeln!(s, "resource.id={site} {server}")?;
        }
    }

    for lfn in &job.input_files {
        writeln!(s, "input.lfn={lfn}")?;
    }

    if !wf.label.is_empty() {
        writeln!(s, "wf.name={}", wf.label)?;
        writeln!(s, "wf.index={}", wf.index)?;
        writeln!(s, "wf.manager=dagman")?;
    }

    writeln!(s, "vo.name={NONE}")?;
    writeln!(s, "vo.group={NONE}")?;
    Ok(())
}

/// Parse a `SOLUTION:<site>[:<jobmanager>]` line.
/// Anything else, including a solution naming no site, is `None`.
pub fn parse_solution(line: &str) -> Option<(String, Option<String>)> {
    let rest = line.trim().strip_prefix(SOLUTION_PREFIX)?;
    let (site, job_manager) = match rest.split_once(':') {
        Some((site, jm)) => (site.trim(), Some(jm.trim())),
        None => (rest.trim(), None),
    };
    if site.is_empty() || site == NONE {
        return None;
    }
    let job_manager = job_manager.filter(|jm| !jm.is_empty()).map(str::to_owned);
    Some((site.to_owned(), job_manager))
}

/// A line of output from the selector.
enum Output {
    Stdout(String),
    Stderr(String),
}

/// Forward every line of `stream` over `tx`.
fn forward<R: Read + Send + 'static>(
    stream: R,
    tx: Sender<Output>,
    wrap: fn(String) -> Output,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    })
}

/// What we learned from one call.
#[derive(Debug, Default)]
struct Outcome {
    solution: Option<(String, Option<String>)>,
    status: Option<ExitStatus>,
    timed_out: bool,
}

impl Outcome {
    fn success(&self) -> bool {
        !self.timed_out && self.status.is_some_and(|s| s.success()) && self.solution.is_some()
    }

    /// The solution, if the call succeeded.
    fn accepted(self) -> Option<(String, Option<String>)> {
        if self.success() {
            self.solution
        } else {
            None
        }
    }
}

/// Calls out to an executable to choose each job's site, one call per job.
pub struct ExternalSelector<'a> {
    oracle: SiteOracle<'a>,
    site_store: &'a dyn SiteStore,
    path: PathBuf,
    config: ExternalConfig,
    env: Vec<(String, String)>,
}

impl<'a> ExternalSelector<'a> {
    pub fn new(
        oracle: SiteOracle<'a>,
        site_store: &'a dyn SiteStore,
        config: ExternalConfig,
    ) -> Result<Self, Error> {
        let path = config.path.clone().ok_or(Error::MissingSelectorPath)?;
        let mut env: Vec<(String, String)> = BASE_ENV
            .iter()
            .filter_map(|k| std::env::var(k).ok().map(|v| (k.to_string(), v)))
            .collect();
        // configured variables override the basic ones:
        env.extend(config.env.iter().cloned());
        Ok(Self {
            oracle,
            site_store,
            path,
            config,
            env,
        })
    }

    /// Run the selector on `request` and collect its answer.
    fn call(&self, request: &Path) -> Result<Outcome, Error> {
        log::debug!("Calling out to site selector {:?} {request:?}", self.path);
        let timer = Timer::now();
        let mut idle = Timer::now();

        let mut child = Command::new(&self.path)
            .arg(request)
            .env_clear()
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Spawn(self.path.clone(), e))?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            readers.push(forward(out, tx.clone(), Output::Stdout));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(forward(err, tx.clone(), Output::Stderr));
        }
        // so the channel disconnects once both readers are done:
        drop(tx);

        let mut outcome = Outcome::default();
        loop {
            // the timeout bounds the wait for each line, not the whole call:
            let received = match self.config.timeout {
                Some(limit) => match idle.remaining(limit) {
                    Some(left) => rx.recv_timeout(left),
                    None => Err(RecvTimeoutError::Timeout),
                },
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            if received.is_ok() {
                idle.reset();
            }
            match received {
                Ok(Output::Stdout(line)) => {
                    log::debug!("site selector: {line}");
                    if outcome.solution.is_none() {
                        outcome.solution = parse_solution(&line);
                    }
                }
                Ok(Output::Stderr(line)) => log::error!("site selector: {line}"),
                Err(RecvTimeoutError::Timeout) => {
                    log::error!(
                        "{} after {:?}",
                        "External site selector timed out".red(),
                        self.config.timeout.unwrap_or_default()
                    );
                    if let Err(e) = child.kill() {
                        log::warn!("Unable to kill site selector: {e}");
                    }
                    outcome.timed_out = true;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let status = child
            .wait()
            .map_err(|e| Error::Spawn(self.path.clone(), e))?;
        log::debug!("site selector finished with {status}");
        outcome.status = Some(status);

        // after a timeout, a grandchild may still hold the pipes open;
        // leave those readers behind rather than block on them.
        if !outcome.timed_out {
            for reader in readers {
                let _ = reader.join();
            }
        }
        timer.log_elapsed("site selector call");
        Ok(outcome)
    }
}

impl PerJobSelector for ExternalSelector<'_> {
    fn description(&self) -> &'static str {
        "External site selector"
    }

    fn map_job(&mut self, job: &mut Job, sites: &[String], wf: &WorkflowInfo) -> Result<(), Error> {
        let valid = self.oracle.sites_for(&job.transformation, sites);
        let request = write_request(job, &valid, self.site_store, wf);

        let mut file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".in")
            .tempfile()
            .map_err(|e| Error::RequestFile(job.name.clone(), e))?;
        file.write_all(request.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| Error::RequestFile(job.name.clone(), e))?;

        let outcome = self.call(file.path())?;
        let success = outcome.success();
        if !success {
            log::warn!(
                "Site selector gave no usable answer for job {} (status {:?}, timed out: {})",
                job.name.cyan(),
                outcome.status.and_then(|s| s.code()),
                outcome.timed_out
            );
        }
        match outcome.accepted() {
            Some((site, job_manager)) => {
                job.set_site(Some(site));
                job.set_job_manager(job_manager);
            }
            None => {
                job.set_site(None);
                job.set_job_manager(None);
            }
        }

        if self.config.keep.should_delete(success) {
            if let Err(e) = file.close() {
                log::warn!("Unable to delete site selector request file: {e}");
            }
        } else {
            match file.keep() {
                Ok((_, path)) => log::info!("Kept site selector request file {path:?}"),
                Err(e) => log::warn!("Unable to keep site selector request file: {e}"),
            }
        }
        Ok(())
    }
}

impl SiteSelector for ExternalSelector<'_> {
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
    use catalog::{MemorySiteStore, MemoryTransformationCatalog, SiteEntry};
    use workflow::TxName;

    #[test]
    fn test_parse_solution() {
        assert_eq!(Some(("x".to_owned(), None)), parse_solution("SOLUTION:x"));
        assert_eq!(
            Some((
                "mysite".to_owned(),
                Some("host:2119/jobmanager-pbs".to_owned())
            )),
            parse_solution("  SOLUTION:mysite:host:2119/jobmanager-pbs\n")
        );
        assert_eq!(Some(("x".to_owned(), None)), parse_solution("SOLUTION:x:"));
        assert_eq!(None, parse_solution("SOLUTION:"));
        assert_eq!(None, parse_solution("SOLUTION:NONE"));
        assert_eq!(None, parse_solution("solution:x"));
        assert_eq!(None, parse_solution("x"));
    }

    #[test]
    fn test_write_request() {
        let mut x = SiteEntry::new("x");
        x.file_servers = vec!["gsiftp://x.org".to_owned(), "file://".to_owned()];
        let store: MemorySiteStore = vec![x, SiteEntry::new("y")].into_iter().collect();

        let mut job = Job::compute("j1", TxName::new(Some("ns"), "sim", Some("1.0")));
        job.logical_id = "ID000001".to_owned();
        job.level = 2;
        job.derivation = Some(TxName::new(Some("ns"), "sim_dv", None));
        job.input_files = vec!["f.a".to_owned(), "f.b".to_owned()];
        let wf = WorkflowInfo {
            label: "diamond".to_owned(),
            index: 3,
        };

        let sites = vec!["x".to_owned(), "y".to_owned()];
        let expected = "\
version=2.0
transformation=ns::sim:1.0
derivation=ns::sim_dv
job.level=2
job.id=ID000001
resource.id=x gsiftp://x.org
resource.id=x file://
input.lfn=f.a
input.lfn=f.b
wf.name=diamond
wf.index=3
wf.manager=dagman
vo.name=NONE
vo.group=NONE
";
        assert_eq!(expected, write_request(&job, &sites, &store, &wf));

        job.derivation = None;
        let request = write_request(&job, &[], &store, &WorkflowInfo::default());
        assert!(request.contains("resource.id=NONE NONE\n"));
        assert!(request.contains("\nderivation=NONE\n"));
        assert!(!request.contains("wf.name"));
    }

    #[test]
    fn test_requires_path() {
        let tc = MemoryTransformationCatalog::default();
        let store = MemorySiteStore::new();
        let result = ExternalSelector::new(SiteOracle::new(&tc), &store, ExternalConfig::default());
        assert!(matches!(result, Err(Error::MissingSelectorPath)));
    }
}

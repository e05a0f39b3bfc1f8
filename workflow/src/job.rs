use std::fmt;
use std::str::FromStr;

use crate::{Error, Profiles};

// separators used in fully-qualified transformation names e.g. "ns::name:1.0"
const NAMESPACE_DELIM: &str = "::";
const VERSION_DELIM: char = ':';

/// Logical name of a transformation (or derivation): `namespace::name:version`,
/// where namespace and version are optional.
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq)]
pub struct TxName {
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
}

impl TxName {
    pub fn new(namespace: Option<&str>, name: &str, version: Option<&str>) -> Self {
        Self {
            namespace: namespace.map(str::to_owned),
            name: name.to_owned(),
            version: version.map(str::to_owned),
        }
    }
}

impl fmt::Display for TxName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{ns}{NAMESPACE_DELIM}")?;
        }
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, "{VERSION_DELIM}{version}")?;
        }
        Ok(())
    }
}

impl FromStr for TxName {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, rest) = match s.split_once(NAMESPACE_DELIM) {
            Some((ns, rest)) => (Some(ns), rest),
            None => (None, s),
        };
        let (name, version) = match rest.split_once(VERSION_DELIM) {
            Some((name, version)) => (name, Some(version)),
            None => (rest, None),
        };
        if name.is_empty() || namespace == Some("") || version == Some("") {
            return Err(Error::InvalidTxName(s.to_owned()));
        }
        Ok(Self::new(namespace, name, version))
    }
}

/// What a job does, which determines where (if anywhere) it needs a working directory.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum JobType {
    /// Runs a user transformation.
    Compute,
    /// Moves input data onto the staging site.
    StageIn,
    /// Moves output data off the staging site.
    StageOut,
    /// Moves data between two staging sites.
    InterSite,
    /// Stages the planner's worker package to a site.
    StageWorker,
    /// Registers outputs in a replica catalog.
    Registration,
    /// Creates the working directory on a site.
    CreateDir,
    /// Removes files from a working directory.
    Cleanup,
    /// Sets the executable bit on staged executables.
    Chmod,
    /// Plans and runs a nested workflow.
    SubWorkflow,
}

impl JobType {
    const ALL: [JobType; 10] = [
        Self::Compute,
        Self::StageIn,
        Self::StageOut,
        Self::InterSite,
        Self::StageWorker,
        Self::Registration,
        Self::CreateDir,
        Self::Cleanup,
        Self::Chmod,
        Self::SubWorkflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::StageIn => "stage-in",
            Self::StageOut => "stage-out",
            Self::InterSite => "inter-site",
            Self::StageWorker => "stage-worker",
            Self::Registration => "registration",
            Self::CreateDir => "create-dir",
            Self::Cleanup => "cleanup",
            Self::Chmod => "chmod",
            Self::SubWorkflow => "sub-workflow",
        }
    }

    /// True for the job types that move files between sites.
    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            Self::StageIn | Self::StageOut | Self::InterSite | Self::StageWorker
        )
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidJobType(s.to_owned()))
    }
}

/// A single job in the workflow.
///
/// Identity and type are fixed once the job is created upstream;
/// planning only writes the site assignment fields.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique name of this job within its workflow.
    pub name: String,
    /// Id the job had in the abstract workflow.
    pub logical_id: String,
    pub transformation: TxName,
    pub derivation: Option<TxName>,
    pub job_type: JobType,
    /// Externally supplied grouping, usually depth in the workflow.
    pub level: u32,
    /// Logical names of the files this job reads.
    pub input_files: Vec<String>,
    pub profiles: Profiles,
    /// Set on synthesized jobs: the executable to run and its arguments.
    pub executable: Option<String>,
    pub arguments: Option<String>,
    /// Marker jobs that must never actually be dispatched.
    pub noop: bool,
    site: Option<String>,
    staging_site: Option<String>,
    job_manager: Option<String>,
    non_tpt_site: Option<String>,
}

impl Job {
    /// Create a new, unmapped job.
    pub fn new(name: &str, job_type: JobType, transformation: TxName) -> Self {
        Self {
            name: name.to_owned(),
            logical_id: name.to_owned(),
            transformation,
            derivation: None,
            job_type,
            level: 0,
            input_files: Vec::with_capacity(0),
            profiles: Profiles::default(),
            executable: None,
            arguments: None,
            noop: false,
            site: None,
            staging_site: None,
            job_manager: None,
            non_tpt_site: None,
        }
    }

    /// Convenience for a compute job running `transformation`.
    pub fn compute(name: &str, transformation: TxName) -> Self {
        Self::new(name, JobType::Compute, transformation)
    }

    /// Execution site, or `None` if the job is not (or could not be) mapped.
    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    pub fn set_site(&mut self, site: Option<String>) {
        self.site = site;
    }

    /// Site that holds this job's inputs and outputs while it runs.
    pub fn staging_site(&self) -> Option<&str> {
        self.staging_site.as_deref()
    }

    pub fn set_staging_site(&mut self, site: Option<String>) {
        self.staging_site = site;
    }

    /// Optional job manager hint that accompanies the execution site.
    pub fn job_manager(&self) -> Option<&str> {
        self.job_manager.as_deref()
    }

    pub fn set_job_manager(&mut self, job_manager: Option<String>) {
        self.job_manager = job_manager;
    }

    /// For transfer jobs: the endpoint whose filesystem the transfer runs against,
    /// or `None` if the transfer is third-party.
    pub fn non_tpt_site(&self) -> Option<&str> {
        self.non_tpt_site.as_deref()
    }

    pub fn set_non_tpt_site(&mut self, site: Option<String>) {
        self.non_tpt_site = site;
    }

    /// The site whose working directory this job runs against:
    /// the staging site if one is set, the execution site otherwise.
    pub fn work_site(&self) -> Option<&str> {
        self.staging_site().or_else(|| self.site())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tx_name_roundtrip() -> Result<(), Error> {
        let tx: TxName = "montage::mProject:3.3".parse()?;
        assert_eq!(Some("montage"), tx.namespace.as_deref());
        assert_eq!("mProject", tx.name);
        assert_eq!(Some("3.3"), tx.version.as_deref());
        assert_eq!("montage::mProject:3.3", tx.to_string());

        let bare: TxName = "ls".parse()?;
        assert_eq!(TxName::new(None, "ls", None), bare);
        assert_eq!("ls", bare.to_string());

        assert!("ns::".parse::<TxName>().is_err());
        assert!("::x".parse::<TxName>().is_err());
        Ok(())
    }

    #[test]
    fn test_job_type_parse() {
        assert_eq!(Ok(JobType::StageOut), "stage-out".parse());
        assert_eq!(Ok(JobType::Chmod), "CHMOD".parse());
        assert_eq!(
            Err(Error::InvalidJobType("teleport".to_owned())),
            "teleport".parse::<JobType>()
        );
    }

    #[test]
    fn test_work_site_prefers_staging() {
        let mut job = Job::compute("a", TxName::new(None, "a", None));
        assert_eq!(None, job.work_site());
        job.set_site(Some("exec".to_owned()));
        assert_eq!(Some("exec"), job.work_site());
        job.set_staging_site(Some("stage".to_owned()));
        assert_eq!(Some("stage"), job.work_site());
    }
}

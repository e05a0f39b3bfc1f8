mod id;
pub use id::NodeId;

mod job;
pub use job::{Job, JobType, TxName};

mod profiles;
pub use profiles::{Profiles, GROUP_KEY, RUNTIME_KEY};

mod graph;
pub use graph::{Graph, Node};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Job \"{0}\" is defined more than once")]
    DuplicateJob(String),
    #[error("Job \"{0}\" does not exist")]
    UnknownJob(String),
    #[error("Job \"{0}\" cannot depend on itself")]
    SelfEdge(String),
    #[error("Invalid job type \"{0}\"")]
    InvalidJobType(String),
    #[error("Invalid transformation name \"{0}\" (should be formatted 'namespace::name:version')")]
    InvalidTxName(String),
}

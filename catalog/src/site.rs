use util::{HashMap, Hasher};
use workflow::Profiles;

/// Compute gateway (job manager) of a site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridGateway {
    /// Contact string handed to the scheduler, e.g. `host/jobmanager-pbs`.
    pub contact: String,
    pub idle_nodes: Option<u32>,
    pub total_nodes: Option<u32>,
}

/// Everything the planner needs to know about one site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteEntry {
    pub id: String,
    /// Path of the shared scratch directory jobs run in.
    pub work_dir: Option<String>,
    /// URL prefixes of the file servers exposing `work_dir`, e.g. `gsiftp://host`.
    pub file_servers: Vec<String>,
    pub gateway: Option<GridGateway>,
    /// true if the submit host can see this site's filesystem directly.
    pub visible_to_local: bool,
    pub profiles: Profiles,
}

impl SiteEntry {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            ..Default::default()
        }
    }

    /// URL of the working directory on the first file server,
    /// or the bare path if the site has no file servers.
    pub fn work_dir_url(&self) -> Option<String> {
        let dir = self.work_dir.as_deref()?;
        match self.file_servers.first() {
            Some(prefix) => Some(format!("{}{}", prefix.trim_end_matches('/'), dir)),
            None => Some(dir.to_owned()),
        }
    }

    /// URL of the working directory on every file server that exposes it.
    pub fn work_dir_urls(&self) -> Vec<String> {
        match self.work_dir.as_deref() {
            Some(dir) => self
                .file_servers
                .iter()
                .map(|prefix| format!("{}{}", prefix.trim_end_matches('/'), dir))
                .collect(),
            None => Vec::with_capacity(0),
        }
    }
}

/// Source of site metadata.
pub trait SiteStore {
    fn lookup(&self, site: &str) -> Option<&SiteEntry>;

    fn contains(&self, site: &str) -> bool {
        self.lookup(site).is_some()
    }
}

/// Site store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemorySiteStore {
    sites: HashMap<String, SiteEntry>,
}

impl MemorySiteStore {
    pub fn new() -> Self {
        Self {
            sites: HashMap::with_capacity_and_hasher(8, Hasher::default()),
        }
    }

    /// Add a site, replacing any existing entry with the same id.
    pub fn add(&mut self, entry: SiteEntry) {
        self.sites.insert(entry.id.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl FromIterator<SiteEntry> for MemorySiteStore {
    fn from_iter<I: IntoIterator<Item = SiteEntry>>(iter: I) -> Self {
        let mut store = Self::new();
        for entry in iter {
            store.add(entry);
        }
        store
    }
}

impl SiteStore for MemorySiteStore {
    fn lookup(&self, site: &str) -> Option<&SiteEntry> {
        self.sites.get(site)
    }
}

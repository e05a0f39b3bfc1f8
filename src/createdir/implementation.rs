use catalog::SiteStore;
use colored::Colorize;
use workflow::{Job, JobType, TxName};

use super::{Error, Implementation};
use crate::SiteOracle;

pub const DIRMANAGER_NAMESPACE: &str = "siteplan";
pub const DIRMANAGER_NAME: &str = "dirmanager";
/// Site profile giving the install location of our tools on that site.
pub const HOME_PROFILE: &str = "SITEPLAN_HOME";

/// Creates directories with the `dirmanager` tool installed at the site.
///
/// The executable comes from the transformation catalog if it has an
/// installed entry at the site, or else from `$SITEPLAN_HOME/bin` as given
/// by the site's profiles.
pub struct DirManagerImplementation<'a> {
    oracle: SiteOracle<'a>,
    site_store: &'a dyn SiteStore,
}

impl<'a> DirManagerImplementation<'a> {
    pub fn new(oracle: SiteOracle<'a>, site_store: &'a dyn SiteStore) -> Self {
        Self { oracle, site_store }
    }

    pub fn transformation() -> TxName {
        TxName::new(Some(DIRMANAGER_NAMESPACE), DIRMANAGER_NAME, None)
    }

    fn executable(&self, tx: &TxName, site: &str) -> Result<String, Error> {
        if let Some(entry) = self.oracle.installed(tx, site)?.into_iter().next() {
            return Ok(entry.physical_path);
        }
        let home = self
            .site_store
            .lookup(site)
            .and_then(|entry| entry.profiles.get(HOME_PROFILE))
            .ok_or_else(|| Error::NoDirManager(site.to_owned()))?;
        log::debug!(
            "{} not in transformation catalog for {}; using {HOME_PROFILE}",
            tx,
            site.cyan()
        );
        Ok(format!("{}/bin/{DIRMANAGER_NAME}", home.trim_end_matches('/')))
    }
}

impl Implementation for DirManagerImplementation<'_> {
    fn make_create_dir_job(&self, site: &str, name: &str, dir_url: &str) -> Result<Job, Error> {
        let tx = Self::transformation();
        let executable = self.executable(&tx, site)?;

        let mut job = Job::new(name, JobType::CreateDir, tx);
        job.set_site(Some(site.to_owned()));
        job.executable = Some(executable);
        job.arguments = Some(format!("--create --dir {dir_url}"));
        Ok(job)
    }
}

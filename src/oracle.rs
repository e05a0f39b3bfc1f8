use catalog::{TcType, TransformationCatalog, TransformationEntry};
use colored::Colorize;
use workflow::TxName;

/// Answers "can this transformation run at that site?" from the transformation catalog.
///
/// [`SiteOracle::lookup`] keeps "no entry" (`Ok(false)`) apart from "the catalog
/// could not be queried" (`Err`). The convenience methods used by the selectors
/// log lookup failures and treat them as "no entry", so one flaky lookup only
/// leaves one job unmapped.
#[derive(Clone, Copy)]
pub struct SiteOracle<'a> {
    tc: &'a dyn TransformationCatalog,
}

impl<'a> SiteOracle<'a> {
    pub fn new(tc: &'a dyn TransformationCatalog) -> Self {
        Self { tc }
    }

    /// All catalog entries for `tx` at `site`, of any type.
    pub fn entries(
        &self,
        tx: &TxName,
        site: &str,
    ) -> Result<Vec<TransformationEntry>, catalog::Error> {
        self.tc.lookup_tx(tx, Some(site), None)
    }

    /// Entries for `tx` installed at `site`.
    pub fn installed(
        &self,
        tx: &TxName,
        site: &str,
    ) -> Result<Vec<TransformationEntry>, catalog::Error> {
        self.tc.lookup_tx(tx, Some(site), Some(TcType::Installed))
    }

    /// true if the catalog has at least one entry for `tx` at `site`.
    pub fn lookup(&self, tx: &TxName, site: &str) -> Result<bool, catalog::Error> {
        Ok(!self.entries(tx, site)?.is_empty())
    }

    /// Like [`SiteOracle::lookup`], but a failed lookup counts as "not valid".
    pub fn is_site_valid(&self, tx: &TxName, site: &str) -> bool {
        match self.lookup(tx, site) {
            Ok(valid) => valid,
            Err(e) => {
                log::warn!(
                    "{} {tx} at {}: {e}",
                    "Unable to look up".yellow(),
                    site.cyan()
                );
                false
            }
        }
    }

    /// The subset of `candidates` where `tx` can run, in candidate order.
    pub fn sites_for(&self, tx: &TxName, candidates: &[String]) -> Vec<String> {
        let valid: Vec<String> = candidates
            .iter()
            .filter(|site| self.is_site_valid(tx, site))
            .cloned()
            .collect();
        log::trace!("runnable sites for {tx}: {valid:?}");
        valid
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use catalog::MemoryTransformationCatalog;

    fn sites(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_oracle() {
        let tx = TxName::new(Some("ns"), "sim", Some("1.0"));
        let other = TxName::new(None, "plot", None);
        let tc = MemoryTransformationCatalog::new(vec![
            TransformationEntry::installed(tx.clone(), "z", "/bin/sim"),
            TransformationEntry::installed(tx.clone(), "x", "/bin/sim"),
            TransformationEntry::installed(other.clone(), "y", "/bin/plot"),
        ]);
        let oracle = SiteOracle::new(&tc);

        assert_eq!(Ok(true), oracle.lookup(&tx, "x"));
        assert_eq!(Ok(false), oracle.lookup(&tx, "y"));
        assert!(oracle.is_site_valid(&other, "y"));

        // candidate order wins over catalog order:
        assert_eq!(sites(&["x", "z"]), oracle.sites_for(&tx, &sites(&["x", "y", "z"])));
        assert!(oracle.sites_for(&tx, &sites(&["y"])).is_empty());

        tc.set_unavailable(true);
        assert!(matches!(
            oracle.lookup(&tx, "x"),
            Err(catalog::Error::Unavailable(_))
        ));
        assert!(!oracle.is_site_valid(&tx, "x"));
        assert!(oracle.sites_for(&tx, &sites(&["x", "z"])).is_empty());
    }
}

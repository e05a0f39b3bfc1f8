use util::HashMap;
use workflow::{Graph, NodeId, GROUP_KEY};

use super::{Error, PerJobSelector, SiteSelector, WorkflowInfo};

/// Name of the implicit group for jobs without a group profile.
pub const DEFAULT_GROUP: &str = "default";

/// Keeps jobs that share a group profile on the same site.
///
/// The first job of each group (in parents-before-children order) is placed
/// by the inner selector, and the rest of the group follows it. Followers
/// are not checked against the catalog. Jobs without a group are placed
/// one by one by the inner selector.
pub struct GroupSelector<'a> {
    inner: Box<dyn PerJobSelector + 'a>,
}

impl<'a> GroupSelector<'a> {
    pub fn new(inner: Box<dyn PerJobSelector + 'a>) -> Self {
        Self { inner }
    }
}

/// Jobs partitioned by group, each group in order of first appearance.
#[derive(Debug, Default)]
struct Groups {
    ungrouped: Vec<NodeId>,
    groups: Vec<(String, Vec<NodeId>)>,
}

impl Groups {
    fn collect(graph: &Graph) -> Result<Self, Error> {
        let mut partition = Self::default();
        let mut index: HashMap<String, usize> = HashMap::default();
        for id in traverse::bfs_order(graph)? {
            let job = graph.job(id);
            match job.profiles.get(GROUP_KEY) {
                None => partition.ungrouped.push(id),
                Some(DEFAULT_GROUP) => return Err(Error::ReservedGroup(job.name.clone())),
                Some(name) => match index.get(name) {
                    Some(i) => partition.groups[*i].1.push(id),
                    None => {
                        index.insert(name.to_owned(), partition.groups.len());
                        partition.groups.push((name.to_owned(), vec![id]));
                    }
                },
            }
        }
        Ok(partition)
    }
}

impl SiteSelector for GroupSelector<'_> {
    fn description(&self) -> &'static str {
        "Site selection by job group"
    }

    fn map_workflow(&mut self, graph: &mut Graph, sites: &[String]) -> Result<(), Error> {
        // validate everything before we touch any job:
        let partition = Groups::collect(graph)?;
        let wf = WorkflowInfo::of(graph);

        for (name, members) in &partition.groups {
            let Some((leader, followers)) = members.split_first() else {
                continue;
            };
            self.inner.map_job(graph.job_mut(*leader), sites, &wf)?;
            let site = graph.job(*leader).site().map(str::to_owned);
            let job_manager = graph.job(*leader).job_manager().map(str::to_owned);
            log::debug!(
                "group {name}: {} members follow {} to {site:?}",
                followers.len(),
                graph.job(*leader).name
            );
            for id in followers {
                let job = graph.job_mut(*id);
                job.set_site(site.clone());
                job.set_job_manager(job_manager.clone());
            }
        }

        for id in &partition.ungrouped {
            self.inner.map_job(graph.job_mut(*id), sites, &wf)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::selector::RoundRobinSelector;
    use crate::SiteOracle;
    use catalog::{MemoryTransformationCatalog, TransformationEntry};
    use workflow::{Job, TxName};

    fn grouped_job(name: &str, tx: &TxName, group: Option<&str>) -> Job {
        let mut job = Job::compute(name, tx.clone());
        if let Some(group) = group {
            job.profiles.insert(GROUP_KEY, group);
        }
        job
    }

    #[test]
    fn test_group_members_share_site() {
        let tx = TxName::new(None, "sim", None);
        let tc = MemoryTransformationCatalog::new(vec![
            TransformationEntry::installed(tx.clone(), "a", "/bin/sim"),
            TransformationEntry::installed(tx.clone(), "b", "/bin/sim"),
        ]);
        let mut graph = Graph::new("wf", 0);
        let g1 = graph.add_node(grouped_job("g1", &tx, Some("g"))).unwrap();
        let h1 = graph.add_node(grouped_job("h1", &tx, Some("h"))).unwrap();
        let g2 = graph.add_node(grouped_job("g2", &tx, Some("g"))).unwrap();
        let lone = graph.add_node(grouped_job("lone", &tx, None)).unwrap();
        let g3 = graph.add_node(grouped_job("g3", &tx, Some("g"))).unwrap();
        graph.add_edge(g1, g2).unwrap();
        graph.add_edge(h1, g3).unwrap();

        // round robin makes the leaders land on different sites:
        let inner = RoundRobinSelector::new(SiteOracle::new(&tc));
        let mut selector = GroupSelector::new(Box::new(inner));
        let sites = vec!["a".to_owned(), "b".to_owned()];
        selector.map_workflow(&mut graph, &sites).unwrap();

        assert_eq!(Some("a"), graph.job(g1).site());
        assert_eq!(Some("a"), graph.job(g2).site());
        assert_eq!(Some("a"), graph.job(g3).site());
        assert_eq!(Some("b"), graph.job(h1).site());
        assert_eq!(Some("a"), graph.job(lone).site());
    }

    #[test]
    fn test_reserved_group_name() {
        let tx = TxName::new(None, "sim", None);
        let tc = MemoryTransformationCatalog::new(vec![TransformationEntry::installed(
            tx.clone(),
            "a",
            "/bin/sim",
        )]);
        let mut graph = Graph::new("wf", 0);
        let ok = graph.add_node(grouped_job("ok", &tx, None)).unwrap();
        graph.add_node(grouped_job("bad", &tx, Some("default"))).unwrap();

        let inner = RoundRobinSelector::new(SiteOracle::new(&tc));
        let mut selector = GroupSelector::new(Box::new(inner));
        let err = selector
            .map_workflow(&mut graph, &["a".to_owned()])
            .unwrap_err();
        assert!(matches!(err, Error::ReservedGroup(name) if name == "bad"));
        // nothing was mapped:
        assert_eq!(None, graph.job(ok).site());
    }
}

use util::IdVec;
use workflow::{Graph, NodeId};

use super::{bfs_order, Error};

/// Set each job's level to its depth in the graph:
/// roots are at level 1, and every other job is one deeper than its deepest parent.
pub fn assign_levels(graph: &mut Graph) -> Result<(), Error> {
    let order = bfs_order(graph)?;
    let mut levels: IdVec<NodeId, u32> = IdVec::fill(0, graph.len());
    for id in order {
        let level = graph
            .parents(id)
            .iter()
            .map(|parent| *levels.get(*parent))
            .max()
            .unwrap_or(0)
            + 1;
        *levels.get_mut(id) = level;
        graph.job_mut(id).level = level;
    }
    Ok(())
}

/// Describe where a node sits in the graph for error messages:
/// the job's name followed by its chain of first parents up to a root,
/// e.g. `"c <- b <- a"`.
pub fn describe_ancestry(graph: &Graph, id: NodeId) -> String {
    let mut desc = graph.job(id).name.clone();
    let mut current = id;
    // bounded by the node count, in case we are handed a cyclic graph:
    for _ in 0..graph.len() {
        match graph.parents(current).first() {
            Some(parent) => {
                desc.push_str(" <- ");
                desc.push_str(&graph.job(*parent).name);
                current = *parent;
            }
            None => break,
        }
    }
    desc
}

#[cfg(test)]
mod test {
    use super::*;
    use workflow::{Job, TxName};

    #[test]
    fn test_levels_and_ancestry() {
        let mut graph = Graph::new("wf", 0);
        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d"] {
            ids.push(
                graph
                    .add_node(Job::compute(name, TxName::new(None, name, None)))
                    .unwrap(),
            );
        }
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        // a -> b -> c, a -> c, d alone
        graph.add_edge(a, b).unwrap();
        graph.add_edge(b, c).unwrap();
        graph.add_edge(a, c).unwrap();

        assign_levels(&mut graph).unwrap();
        let levels: Vec<u32> = graph.jobs().map(|job| job.level).collect();
        assert_eq!(vec![1, 2, 3, 1], levels);

        assert_eq!("c <- b <- a", describe_ancestry(&graph, c));
        assert_eq!("d", describe_ancestry(&graph, d));
    }
}

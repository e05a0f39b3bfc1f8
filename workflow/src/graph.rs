use colored::Colorize;

use util::{HashMap, Hasher, IdVec};

use crate::{Error, Job, NodeId};

/// A job plus its position in the graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub job: Job,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(job: Job) -> Self {
        Self {
            job,
            parents: Vec::with_capacity(2),
            children: Vec::with_capacity(2),
        }
    }

    /// Nodes this node depends on.
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Nodes that depend on this node.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// An executable workflow: jobs connected by dependency edges.
///
/// Nodes live in an arena and are never removed, so a `NodeId` stays valid
/// for the lifetime of the graph. Edges are kept symmetric:
/// if `a` is a parent of `b` then `b` is a child of `a`.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Workflow label, used to build unique names for synthesized jobs.
    pub label: String,
    /// Index of this workflow among the workflows planned from the same label.
    pub index: u32,
    nodes: IdVec<NodeId, Node>,
    names: HashMap<String, NodeId>,
}

impl Graph {
    /// Create an empty graph for the workflow with the given `label` and `index`.
    pub fn new(label: &str, index: u32) -> Self {
        Self {
            label: label.to_owned(),
            index,
            nodes: IdVec::with_capacity(64),
            names: HashMap::with_capacity_and_hasher(64, Hasher::default()),
        }
    }

    /// Add a job to the graph. Job names must be unique.
    pub fn add_node(&mut self, job: Job) -> Result<NodeId, Error> {
        if self.names.contains_key(&job.name) {
            return Err(Error::DuplicateJob(job.name));
        }
        let name = job.name.clone();
        let id = self.nodes.push(Node::new(job));
        log::trace!("added node {} {}", id, name.cyan());
        self.names.insert(name, id);
        Ok(id)
    }

    /// Add a dependency edge `parent -> child`.
    /// Returns false if the edge already existed.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) -> Result<bool, Error> {
        if parent == child {
            return Err(Error::SelfEdge(self.job(parent).name.clone()));
        }
        if self.has_edge(parent, child) {
            return Ok(false);
        }
        self.nodes.get_mut(parent).children.push(child);
        self.nodes.get_mut(child).parents.push(parent);
        log::trace!(
            "added edge {} -> {}",
            self.job(parent).name.cyan(),
            self.job(child).name.cyan()
        );
        Ok(true)
    }

    /// Add a dependency edge between two jobs identified by name.
    pub fn add_edge_by_name(&mut self, parent: &str, child: &str) -> Result<bool, Error> {
        let parent = self.require(parent)?;
        let child = self.require(child)?;
        self.add_edge(parent, child)
    }

    pub fn has_edge(&self, parent: NodeId, child: NodeId) -> bool {
        self.nodes.get(parent).children.contains(&child)
    }

    /// Look up a node by job name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<NodeId, Error> {
        self.find(name)
            .ok_or_else(|| Error::UnknownJob(name.to_owned()))
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(id)
    }

    /// Edges can't be changed through the returned node, only its job.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes.get_mut(id)
    }

    #[inline]
    pub fn job(&self, id: NodeId) -> &Job {
        &self.nodes.get(id).job
    }

    #[inline]
    pub fn job_mut(&mut self, id: NodeId) -> &mut Job {
        &mut self.nodes.get_mut(id).job
    }

    #[inline]
    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        &self.nodes.get(id).parents
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes.get(id).children
    }

    /// All node ids, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        self.nodes.ids()
    }

    /// All jobs, in insertion order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.nodes.iter().map(|node| &node.job)
    }

    /// Nodes without parents, in insertion order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter_enumerated()
            .filter(|(_, node)| node.is_root())
            .map(|(id, _)| id)
            .collect()
    }

    /// Nodes without children, in insertion order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes
            .iter_enumerated()
            .filter(|(_, node)| node.is_leaf())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.children.len()).sum()
    }
}

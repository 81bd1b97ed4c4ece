//! Task dependency graph.
//!
//! The workflow as a category `I`:
//!
//! - Objects: tasks
//! - Morphisms: dependency edges `from → to` (`from` runs first)
//! - Functors `F, G: I → Kl(D)`: each task's implementation and specification
//!
//! Backed by petgraph's `DiGraph` with an id index. The graph only grows;
//! every mutation either succeeds or leaves it exactly as it was.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::sync::Arc;

use compositional_kleisli::{
    verify_non_expansive, LipschitzReport, State, StateMetric, PROB_TOLERANCE,
};
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{Layer, WorkflowError};
use crate::task::{Certification, NewTask, Task};

/// Shared state metric.
pub type SharedMetric<S> = Arc<dyn StateMetric<S>>;

/// A directed acyclic graph of tasks.
pub struct TaskDag<S> {
    graph: DiGraph<Task<S>, ()>,
    index: HashMap<String, NodeIndex>,
    metric: Option<SharedMetric<S>>,
}

impl<S: State> TaskDag<S> {
    /// Empty graph without a metric. Tasks can be added but not verified.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            metric: None,
        }
    }

    /// Empty graph with the metric used for non-expansiveness verification.
    pub fn with_metric<M>(metric: M) -> Self
    where
        M: StateMetric<S> + 'static,
    {
        Self::with_shared_metric(Arc::new(metric))
    }

    pub fn with_shared_metric(metric: SharedMetric<S>) -> Self {
        Self {
            metric: Some(metric),
            ..Self::new()
        }
    }

    pub fn metric(&self) -> Option<&SharedMetric<S>> {
        self.metric.as_ref()
    }

    /// Insert a task with no incoming edges.
    ///
    /// Requested verification runs before anything is inserted.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::DuplicateTask`] if the id is taken
    /// - [`WorkflowError::MissingMetric`] / [`WorkflowError::EmptySample`] if
    ///   verification was requested without a metric or without samples
    /// - [`WorkflowError::RegularityViolation`] with the worst ratio seen if a
    ///   checked morphism expands distances
    pub fn add_task(&mut self, new: NewTask<S>) -> Result<(), WorkflowError> {
        if self.index.contains_key(&new.id) {
            return Err(WorkflowError::DuplicateTask { id: new.id });
        }

        let mut certification = Certification::default();

        if new.verify_implementation || new.verify_specification {
            let metric = self
                .metric
                .as_deref()
                .ok_or_else(|| WorkflowError::MissingMetric { id: new.id.clone() })?;
            if new.samples.is_empty() {
                return Err(WorkflowError::EmptySample { id: new.id });
            }

            let check = |layer: Layer| -> Result<LipschitzReport, WorkflowError> {
                let morphism = match layer {
                    Layer::Implementation => &new.implementation,
                    Layer::Specification => &new.specification,
                };
                let report =
                    verify_non_expansive(morphism.as_ref(), &new.samples, metric, PROB_TOLERANCE)?;
                if report.is_non_expansive {
                    Ok(report)
                } else {
                    Err(WorkflowError::RegularityViolation {
                        id: new.id.clone(),
                        layer,
                        ratio: report.max_ratio,
                    })
                }
            };

            if new.verify_implementation {
                certification.implementation = Some(check(Layer::Implementation)?);
            }
            if new.verify_specification {
                certification.specification = Some(check(Layer::Specification)?);
            }
        }

        let task = new.into_task(certification);
        let id = task.id().to_string();
        let node = self.graph.add_node(task);
        self.index.insert(id, node);
        Ok(())
    }

    /// Record that `to` depends on `from`.
    ///
    /// Adding an edge that already exists is a no-op.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::UnknownTask`] if either endpoint is absent
    /// - [`WorkflowError::CycleDetected`] if the edge would close a cycle;
    ///   the graph is left unchanged
    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<(), WorkflowError> {
        let from_node = self.node(from)?;
        let to_node = self.node(to)?;

        if self.graph.contains_edge(from_node, to_node) {
            return Ok(());
        }

        // The graph is acyclic, so `from → to` closes a cycle exactly when
        // `to` already reaches `from` (including `from == to`).
        if has_path_connecting(&self.graph, to_node, from_node, None) {
            return Err(WorkflowError::CycleDetected {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.graph.add_edge(from_node, to_node, ());
        self.graph[to_node].dependencies.push(from.to_string());
        Ok(())
    }

    /// Every task id, dependencies before dependents.
    ///
    /// Kahn's algorithm with a min-heap: among tasks whose predecessors are all
    /// scheduled, the lexicographically smallest id goes first, so identical
    /// graphs always produce identical orders.
    pub fn topological_order(&self) -> Vec<String> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Incoming).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<(&str, NodeIndex)>> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&n, _)| Reverse((self.graph[n].id(), n)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((id, node))) = ready.pop() {
            order.push(id.to_string());
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if let Some(deg) = in_degree.get_mut(&next) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push(Reverse((self.graph[next].id(), next)));
                    }
                }
            }
        }

        order
    }

    /// Direct predecessors of `id`, in the order their edges were added.
    pub fn dependencies(&self, id: &str) -> Result<Vec<String>, WorkflowError> {
        let node = self.node(id)?;
        Ok(self.graph[node].dependencies().to_vec())
    }

    /// Direct successors of `id`, in the order their edges were added.
    pub fn dependents(&self, id: &str) -> Result<Vec<String>, WorkflowError> {
        let node = self.node(id)?;
        // petgraph walks adjacency lists newest first.
        let mut dependents: Vec<String> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|n| self.graph[n].id().to_string())
            .collect();
        dependents.reverse();
        Ok(dependents)
    }

    pub fn task(&self, id: &str) -> Option<&Task<S>> {
        self.index.get(id).map(|&n| &self.graph[n])
    }

    /// Like [`task`](Self::task) but reports a missing id as an error.
    pub fn get(&self, id: &str) -> Result<&Task<S>, WorkflowError> {
        self.node(id).map(|n| &self.graph[n])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Task ids in insertion order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_weights().map(|t| t.id())
    }

    fn node(&self, id: &str) -> Result<NodeIndex, WorkflowError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| WorkflowError::UnknownTask { id: id.to_string() })
    }
}

impl<S: State> Default for TaskDag<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Display for TaskDag<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TaskDag(tasks={}, edges={})",
            self.graph.node_count(),
            self.graph.edge_count()
        )
    }
}

impl<S> fmt::Debug for TaskDag<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDag")
            .field("tasks", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("has_metric", &self.metric.is_some())
            .finish()
    }
}

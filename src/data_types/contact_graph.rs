
use log::trace;
use rustc_hash::FxHashMap as HashMap;

/// The phase label of a contig.
/// `Unphased` nodes neither support nor penalize any labeling they touch.
#[repr(i8)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord, strum_macros::Display, strum_macros::EnumIter, strum_macros::FromRepr)]
pub enum Partition {
    #[default]
    Unphased=-1,
    Haplotype0=0,
    Haplotype1=1
}

impl Partition {
    /// The labels a node can be phased into, in the order the search evaluates them
    pub const RESOLVED: [Partition; 2] = [Partition::Haplotype0, Partition::Haplotype1];

    /// Returns the raw label, -1, 0, or 1
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    pub fn is_resolved(self) -> bool {
        self != Partition::Unphased
    }

    /// Signed agreement between two labels: +1 if both are resolved and equal, -1 if both are resolved and different, 0 if either is unphased.
    pub fn agreement(self, other: Partition) -> i64 {
        match (self, other) {
            (Partition::Unphased, _) |
            (_, Partition::Unphased) => 0,
            (a, b) if a == b => 1,
            _ => -1
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("node {id} does not exist")]
    NodeNotFound { id: i32 },
    #[error("edge ({a}, {b}) does not exist")]
    EdgeNotFound { a: i32, b: i32 },
    #[error("node {id} already exists")]
    DuplicateNode { id: i32 },
    #[error("self-loop edges are not allowed (node {id})")]
    SelfLoop { id: i32 },
    #[error("weight of edge ({a}, {b}) would overflow")]
    WeightOverflow { a: i32, b: i32 },
    #[error("coverage of node {id} would overflow")]
    CoverageOverflow { id: i32 }
}

/// A contig in the contact graph
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Node {
    /// Current phase label
    partition: Partition,
    /// Number of observations supporting this contig, only ever incremented
    coverage: i32,
    /// Adjacent node id -> contact weight; mirrored on the other endpoint
    neighbors: HashMap<i32, i32>
}

impl Node {
    fn new(partition: Partition) -> Node {
        Node {
            partition,
            coverage: 0,
            neighbors: Default::default()
        }
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn coverage(&self) -> i32 {
        self.coverage
    }

    /// The number of edges incident to this node
    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }
}

/// Undirected weighted graph of contigs, where edge weights count the contacts observed between two contigs.
/// Node ids are issued externally (usually by an `IdRegistry`), and nodes/edges can be added or removed at any time.
/// Traversal borrows the graph, so it cannot be edited mid-iteration.
#[derive(Clone, Debug, Default)]
pub struct ContactGraph {
    /// All nodes, keyed by id
    nodes: HashMap<i32, Node>,
    /// Number of undirected edges
    num_edges: usize
}

impl ContactGraph {
    pub fn new() -> ContactGraph {
        Default::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.num_edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_node(&self, id: i32) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn has_edge(&self, a: i32, b: i32) -> bool {
        self.edge_weight(a, b).is_some()
    }

    pub fn get_node(&self, id: i32) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Returns the weight of edge `(a, b)`, or None if there is no such edge.
    pub fn edge_weight(&self, a: i32, b: i32) -> Option<i32> {
        self.nodes.get(&a)
            .and_then(|node| node.neighbors.get(&b))
            .copied()
    }

    /// Adds a new node with coverage 0.
    /// # Arguments
    /// * `id` - the node id, must not already exist
    /// * `partition` - the initial phase label
    /// # Errors
    /// * `DuplicateNode` if `id` already exists
    pub fn insert_node(&mut self, id: i32, partition: Partition) -> Result<(), GraphError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode { id });
        }
        self.nodes.insert(id, Node::new(partition));
        Ok(())
    }

    /// Same as `insert_node`, with the node starting out unphased.
    pub fn insert_unphased_node(&mut self, id: i32) -> Result<(), GraphError> {
        self.insert_node(id, Partition::Unphased)
    }

    /// Adds a node if it is absent, otherwise the existing node is left untouched.
    /// Returns true if a node was inserted.
    pub fn try_insert_node(&mut self, id: i32, partition: Partition) -> bool {
        if self.nodes.contains_key(&id) {
            false
        } else {
            self.nodes.insert(id, Node::new(partition));
            true
        }
    }

    /// Removes a node along with every edge touching it.
    /// # Errors
    /// * `NodeNotFound` if `id` does not exist
    pub fn remove_node(&mut self, id: i32) -> Result<(), GraphError> {
        let node = self.nodes.remove(&id)
            .ok_or(GraphError::NodeNotFound { id })?;

        for other in node.neighbors.keys() {
            if let Some(other_node) = self.nodes.get_mut(other) {
                other_node.neighbors.remove(&id);
            }
        }
        self.num_edges -= node.neighbors.len();
        trace!("Removed node {} and {} incident edges", id, node.neighbors.len());
        Ok(())
    }

    /// Adds an edge of weight 0 between two existing nodes if there is not one already.
    /// Returns true if an edge was created; an existing edge keeps its weight.
    /// # Errors
    /// * `SelfLoop` if `a == b`
    /// * `NodeNotFound` if either endpoint does not exist
    pub fn try_insert_edge(&mut self, a: i32, b: i32) -> Result<bool, GraphError> {
        self.try_insert_edge_with_weight(a, b, 0)
    }

    /// Same as `try_insert_edge`, but a newly created edge starts at `weight`.
    pub fn try_insert_edge_with_weight(&mut self, a: i32, b: i32, weight: i32) -> Result<bool, GraphError> {
        if a == b {
            return Err(GraphError::SelfLoop { id: a });
        }
        if !self.nodes.contains_key(&b) {
            return Err(GraphError::NodeNotFound { id: b });
        }

        let node_a = self.nodes.get_mut(&a)
            .ok_or(GraphError::NodeNotFound { id: a })?;
        if node_a.neighbors.contains_key(&b) {
            return Ok(false);
        }
        node_a.neighbors.insert(b, weight);

        // existence of b was checked above
        if let Some(node_b) = self.nodes.get_mut(&b) {
            node_b.neighbors.insert(a, weight);
        }

        self.num_edges += 1;
        Ok(true)
    }

    /// Removes the edge between `a` and `b`, returning false if there was no such edge.
    pub fn remove_edge(&mut self, a: i32, b: i32) -> bool {
        let removed = match self.nodes.get_mut(&a) {
            Some(node_a) => node_a.neighbors.remove(&b).is_some(),
            None => false
        };

        if removed {
            if let Some(node_b) = self.nodes.get_mut(&b) {
                node_b.neighbors.remove(&a);
            }
            self.num_edges -= 1;
        }
        removed
    }

    /// Adds `delta` to the weight of an existing edge. On failure the weight is unchanged.
    /// # Errors
    /// * `EdgeNotFound` if there is no edge between `a` and `b`
    /// * `WeightOverflow` if the new weight does not fit in an `i32`
    pub fn increment_edge_weight(&mut self, a: i32, b: i32, delta: i32) -> Result<(), GraphError> {
        let weight = self.edge_weight(a, b)
            .ok_or(GraphError::EdgeNotFound { a, b })?;
        let new_weight = weight.checked_add(delta)
            .ok_or(GraphError::WeightOverflow { a, b })?;

        // both directions carry the same weight
        for (from, to) in [(a, b), (b, a)] {
            if let Some(w) = self.nodes.get_mut(&from).and_then(|node| node.neighbors.get_mut(&to)) {
                *w = new_weight;
            }
        }
        Ok(())
    }

    /// Adds `delta` to the coverage of a node. On failure the coverage is unchanged.
    /// # Errors
    /// * `NodeNotFound` if `id` does not exist
    /// * `CoverageOverflow` if the new coverage does not fit in an `i32`
    pub fn increment_coverage(&mut self, id: i32, delta: i32) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id)
            .ok_or(GraphError::NodeNotFound { id })?;
        node.coverage = node.coverage.checked_add(delta)
            .ok_or(GraphError::CoverageOverflow { id })?;
        Ok(())
    }

    /// Returns the phase label of a node.
    /// # Errors
    /// * `NodeNotFound` if `id` does not exist
    pub fn get_partition(&self, id: i32) -> Result<Partition, GraphError> {
        self.nodes.get(&id)
            .map(|node| node.partition)
            .ok_or(GraphError::NodeNotFound { id })
    }

    /// Sets the phase label of a node.
    /// # Errors
    /// * `NodeNotFound` if `id` does not exist
    pub fn set_partition(&mut self, id: i32, partition: Partition) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id)
            .ok_or(GraphError::NodeNotFound { id })?;
        node.partition = partition;
        Ok(())
    }

    /// Bulk write of phase labels. All ids are checked before anything is written, so a failure leaves the graph unchanged.
    /// # Arguments
    /// * `partitions` - `(id, label)` pairs to apply
    /// # Errors
    /// * `NodeNotFound` for the first id that does not exist
    pub fn set_partitions(&mut self, partitions: &[(i32, Partition)]) -> Result<(), GraphError> {
        if let Some(&(id, _)) = partitions.iter().find(|(id, _)| !self.nodes.contains_key(id)) {
            return Err(GraphError::NodeNotFound { id });
        }
        for &(id, partition) in partitions.iter() {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.partition = partition;
            }
        }
        Ok(())
    }

    /// Bulk read of phase labels, sorted by node id.
    pub fn get_partitions(&self) -> Vec<(i32, Partition)> {
        let mut partitions: Vec<(i32, Partition)> = self.nodes.iter()
            .map(|(&id, node)| (id, node.partition))
            .collect();
        partitions.sort_unstable();
        partitions
    }

    /// All node ids in increasing order
    pub fn sorted_node_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterates over every node as `(id, node)`.
    pub fn nodes(&self) -> impl Iterator<Item = (i32, &Node)> + '_ {
        self.nodes.iter().map(|(&id, node)| (id, node))
    }

    /// Iterates over every undirected edge exactly once as `(a, b, weight)`, with `a < b`.
    pub fn edges(&self) -> impl Iterator<Item = (i32, i32, i32)> + '_ {
        self.nodes.iter().flat_map(|(&id, node)| {
            node.neighbors.iter()
                .filter(move |&(&other, _)| id < other)
                .map(move |(&other, &weight)| (id, other, weight))
        })
    }

    /// Iterates over the neighbors of a node as `(neighbor id, edge weight, neighbor node)`.
    /// # Errors
    /// * `NodeNotFound` if `id` does not exist
    pub fn neighbors(&self, id: i32) -> Result<impl Iterator<Item = (i32, i32, &Node)> + '_, GraphError> {
        let node = self.nodes.get(&id)
            .ok_or(GraphError::NodeNotFound { id })?;
        Ok(node.neighbors.iter().map(move |(&other, &weight)| (other, weight, &self.nodes[&other])))
    }

    /// Local score of a node: the sum over incident edges of `weight * agreement(partition(node), partition(neighbor))`.
    /// Higher means the node's label is better supported by its contacts.
    /// # Errors
    /// * `NodeNotFound` if `id` does not exist
    pub fn compute_consistency_score(&self, id: i32) -> Result<i64, GraphError> {
        let node = self.nodes.get(&id)
            .ok_or(GraphError::NodeNotFound { id })?;
        let score: i64 = node.neighbors.iter()
            .map(|(other, &weight)| {
                weight as i64 * node.partition.agreement(self.nodes[other].partition)
            })
            .sum();
        Ok(score)
    }

    /// Global score of the current labeling, each edge counted once.
    pub fn compute_total_consistency_score(&self) -> i64 {
        self.edges()
            .map(|(a, b, weight)| {
                weight as i64 * self.nodes[&a].partition.agreement(self.nodes[&b].partition)
            })
            .sum()
    }
}


use crate::data_types::contact_graph::{ContactGraph, GraphError, Partition};

use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap as HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use threadpool::ThreadPool;

/// Default number of greedy passes allowed per trial before it is cut off
pub const DEFAULT_MAX_PASSES: usize = 100;
/// Default base seed for trial RNGs
pub const DEFAULT_SEED: u64 = 0;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PhaseSearchError {
    #[error("phase search requires at least one iteration")]
    NoIterations,
    #[error("phase search requires at least one thread")]
    NoThreads,
    #[error("phase search requires at least one pass per trial")]
    NoPasses,
    #[error("{0}")]
    Graph(#[from] GraphError),
    #[error("a phase search worker panicked")]
    WorkerPanic
}

/// Controls for `random_phase_search_with_config`
#[derive(Clone, Debug)]
pub struct PhaseSearchConfig {
    /// Number of independent trials
    pub iterations: usize,
    /// Number of worker threads
    pub threads: usize,
    /// Trial `t` seeds its RNG with `seed + t`, so results only depend on this and the trial count
    pub seed: u64,
    /// Maximum number of greedy passes in a single trial
    pub max_passes: usize,
    /// Nodes with a fixed label; they are never randomized or moved
    pub pinned: HashMap<i32, Partition>
}

impl PhaseSearchConfig {
    pub fn new(iterations: usize, threads: usize) -> PhaseSearchConfig {
        PhaseSearchConfig {
            iterations,
            threads,
            seed: DEFAULT_SEED,
            max_passes: DEFAULT_MAX_PASSES,
            pinned: Default::default()
        }
    }
}

/// The best labeling found by a search
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseSearchResult {
    /// `(node id, label)` for every node, sorted by id
    pub partitions: Vec<(i32, Partition)>,
    /// Total consistency score of `partitions`
    pub score: i64,
    /// The first trial to report `score`
    pub trial_index: usize,
    /// How many trials completed
    pub trials_run: usize
}

impl PhaseSearchResult {
    /// Writes the labels back into the graph the search ran on.
    /// # Errors
    /// * `NodeNotFound` if the graph no longer contains one of the nodes
    pub fn apply(&self, contact_graph: &mut ContactGraph) -> Result<(), GraphError> {
        contact_graph.set_partitions(&self.partitions)
    }
}

/// Immutable, densely indexed copy of a contact graph shared by all workers
struct PhaseProblem {
    /// Dense index -> node id, sorted
    node_ids: Vec<i32>,
    /// Dense index -> (neighbor index, weight)
    adjacency: Vec<Vec<(usize, i64)>>,
    /// Each undirected edge once as (index, index, weight)
    edges: Vec<(usize, usize, i64)>,
    /// Dense index -> fixed label, if pinned
    pinned: Vec<Option<Partition>>
}

impl PhaseProblem {
    /// Freezes a graph for searching.
    /// # Errors
    /// * `NodeNotFound` if a pinned id is not in the graph
    fn new(contact_graph: &ContactGraph, pinned: &HashMap<i32, Partition>) -> Result<PhaseProblem, GraphError> {
        let node_ids: Vec<i32> = contact_graph.sorted_node_ids();
        let index_of: HashMap<i32, usize> = node_ids.iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let mut adjacency: Vec<Vec<(usize, i64)>> = vec![vec![]; node_ids.len()];
        let mut edges: Vec<(usize, usize, i64)> = Vec::with_capacity(contact_graph.edge_count());
        for (a, b, weight) in contact_graph.edges() {
            let index_a = index_of[&a];
            let index_b = index_of[&b];
            adjacency[index_a].push((index_b, weight as i64));
            adjacency[index_b].push((index_a, weight as i64));
            edges.push((index_a, index_b, weight as i64));
        }

        // hash iteration order is not meaningful, keep trials reproducible
        for neighbors in adjacency.iter_mut() {
            neighbors.sort_unstable();
        }
        edges.sort_unstable();

        let mut pinned_labels: Vec<Option<Partition>> = vec![None; node_ids.len()];
        for (id, &partition) in pinned.iter() {
            let index = *index_of.get(id)
                .ok_or(GraphError::NodeNotFound { id: *id })?;
            pinned_labels[index] = Some(partition);
        }

        Ok(PhaseProblem {
            node_ids,
            adjacency,
            edges,
            pinned: pinned_labels
        })
    }

    fn num_nodes(&self) -> usize {
        self.node_ids.len()
    }

    /// Score of node `index` if it carried `label`, given everyone else's current labels
    fn local_score(&self, index: usize, label: Partition, labels: &[Partition]) -> i64 {
        self.adjacency[index].iter()
            .map(|&(other, weight)| weight * label.agreement(labels[other]))
            .sum()
    }

    fn total_score(&self, labels: &[Partition]) -> i64 {
        self.edges.iter()
            .map(|&(a, b, weight)| weight * labels[a].agreement(labels[b]))
            .sum()
    }

    /// Runs a single trial: random initial labels followed by greedy single-node moves until nothing improves.
    /// Returns the trial score and labels.
    /// # Arguments
    /// * `seed` - the RNG seed for this trial
    /// * `max_passes` - maximum number of full passes over the nodes
    fn run_trial(&self, seed: u64, max_passes: usize) -> (i64, Vec<Partition>) {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut labels: Vec<Partition> = self.pinned.iter()
            .map(|opt_pin| match opt_pin {
                Some(partition) => *partition,
                None => Partition::RESOLVED[rng.gen_range(0..Partition::RESOLVED.len())]
            })
            .collect();

        let mut order: Vec<usize> = (0..self.num_nodes())
            .filter(|&i| self.pinned[i].is_none())
            .collect();

        let mut passes: usize = 0;
        let mut converged: bool = false;
        while passes < max_passes && !converged {
            passes += 1;
            order.shuffle(&mut rng);

            let mut changed: bool = false;
            for &index in order.iter() {
                let current = labels[index];
                let mut best_label = current;
                let mut best_score = self.local_score(index, current, &labels);

                // ties keep the current label so the pass can settle
                for &candidate in Partition::RESOLVED.iter() {
                    if candidate == current {
                        continue;
                    }
                    let candidate_score = self.local_score(index, candidate, &labels);
                    if candidate_score > best_score {
                        best_label = candidate;
                        best_score = candidate_score;
                    }
                }

                if best_label != current {
                    labels[index] = best_label;
                    changed = true;
                }
            }
            converged = !changed;
        }

        let score = self.total_score(&labels);
        trace!("Trial seed {} finished after {} passes (converged: {}) with score {}", seed, passes, converged, score);
        (score, labels)
    }
}

/// The best result published so far; score, labels, and trial index only ever change together
struct Champion {
    score: i64,
    labels: Vec<Partition>,
    trial_index: usize,
    /// Every finished trial, champion or not
    trials_run: usize
}

impl Champion {
    fn new() -> Champion {
        Champion {
            score: i64::MIN,
            labels: vec![],
            trial_index: 0,
            trials_run: 0
        }
    }

    /// Records a finished trial and keeps it only if it strictly beats the current score.
    /// Ties never replace the champion, so the first trial to report a score holds it.
    fn offer(&mut self, trial_index: usize, score: i64, labels: Vec<Partition>) -> bool {
        self.trials_run += 1;
        if score > self.score {
            self.score = score;
            self.labels = labels;
            self.trial_index = trial_index;
            true
        } else {
            false
        }
    }
}

/// Searches for a phase labeling of the contact graph with the default seed and pass limit.
/// See `random_phase_search_with_config` for details.
/// # Arguments
/// * `contact_graph` - the graph to phase, it is not modified
/// * `iterations` - the number of independent trials
/// * `threads` - the number of worker threads
pub fn random_phase_search(contact_graph: &ContactGraph, iterations: usize, threads: usize) -> Result<PhaseSearchResult, PhaseSearchError> {
    random_phase_search_with_config(contact_graph, &PhaseSearchConfig::new(iterations, threads))
}

/// Searches for the labeling that maximizes the total consistency score of the graph using randomized local search.
/// Each trial starts from random labels in {0, 1} and greedily moves single nodes until no move improves its local score.
/// Trials are claimed from a shared counter by a pool of workers and the best one (first reported on ties) is returned.
/// # Arguments
/// * `contact_graph` - the graph to phase, it is not modified; use `PhaseSearchResult::apply` to commit the result
/// * `config` - the search controls
/// # Errors
/// * `NoIterations`, `NoThreads`, or `NoPasses` if the respective control is 0
/// * `Graph` if a pinned node is not in the graph
/// * `WorkerPanic` if any worker panicked
pub fn random_phase_search_with_config(contact_graph: &ContactGraph, config: &PhaseSearchConfig) -> Result<PhaseSearchResult, PhaseSearchError> {
    if config.iterations == 0 {
        return Err(PhaseSearchError::NoIterations);
    }
    if config.threads == 0 {
        return Err(PhaseSearchError::NoThreads);
    }
    if config.max_passes == 0 {
        return Err(PhaseSearchError::NoPasses);
    }

    let start_time: Instant = Instant::now();
    let problem: Arc<PhaseProblem> = Arc::new(PhaseProblem::new(contact_graph, &config.pinned)?);
    debug!(
        "Phase search over {} nodes, {} edges, {} pinned with {} iterations on {} threads",
        problem.num_nodes(), problem.edges.len(), config.pinned.len(), config.iterations, config.threads
    );

    let job_index: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    let champion: Arc<Mutex<Champion>> = Arc::new(Mutex::new(Champion::new()));

    // no reason to spin up more workers than there are trials
    let num_workers: usize = config.threads.min(config.iterations);
    let pool = ThreadPool::new(num_workers);
    for _ in 0..num_workers {
        let problem = problem.clone();
        let job_index = job_index.clone();
        let champion = champion.clone();
        let iterations = config.iterations;
        let seed = config.seed;
        let max_passes = config.max_passes;

        pool.execute(move || {
            loop {
                let trial_index = job_index.fetch_add(1, Ordering::SeqCst);
                if trial_index >= iterations {
                    break;
                }

                let (score, labels) = problem.run_trial(seed.wrapping_add(trial_index as u64), max_passes);

                // a poisoned lock only means another worker died, the champion itself is always consistent
                let mut best = champion.lock().unwrap_or_else(|e| e.into_inner());
                if best.offer(trial_index, score, labels) {
                    debug!("Trial {} improved best score to {}", trial_index, score);
                }
            }
        });
    }
    pool.join();

    if pool.panic_count() > 0 {
        return Err(PhaseSearchError::WorkerPanic);
    }

    let mut best = champion.lock().unwrap_or_else(|e| e.into_inner());
    let labels: Vec<Partition> = std::mem::take(&mut best.labels);
    let partitions: Vec<(i32, Partition)> = problem.node_ids.iter()
        .copied()
        .zip(labels)
        .collect();

    info!(
        "Phase search finished {} trials in {:.4} seconds, best score {} from trial {}",
        best.trials_run, start_time.elapsed().as_secs_f64(), best.score, best.trial_index
    );

    Ok(PhaseSearchResult {
        partitions,
        score: best.score,
        trial_index: best.trial_index,
        trials_run: best.trials_run
    })
}

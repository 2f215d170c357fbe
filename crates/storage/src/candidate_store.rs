//! In-memory candidate store.
//!
//! Holds every candidate ever created together with its metrics and parent
//! links. Candidates are never removed, so lineage stays auditable for the
//! whole run.

use crate::lineage::Namer;
use promptevo_core::{
    Candidate, CandidateId, ConsistencyError, CreationMethod, CriteriaVector, OffspringScore,
    PerformanceMetrics, PersonaId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, ConsistencyError>;

/// Everything needed to insert an offspring.
#[derive(Debug, Clone)]
pub struct ChildSpec {
    /// One parent for mutation, one or two for crossover
    pub parents: Vec<CandidateId>,
    /// Offspring text
    pub text: String,
    /// Mutation or crossover
    pub method: CreationMethod,
    /// Generation the offspring belongs to
    pub generation: u32,
    /// Whether the text is a fallback
    pub fallback: bool,
    /// Advisory score computed by the operator
    pub advisory: Option<OffspringScore>,
}

#[derive(Default)]
struct Index {
    cells: HashMap<CandidateId, Arc<Mutex<Candidate>>>,
    order: Vec<CandidateId>,
}

/// Thread-safe store of all candidates.
///
/// Updates to one candidate are serialized by that candidate's own lock;
/// updates to different candidates only share a brief read lock on the index.
#[derive(Default)]
pub struct CandidateStore {
    index: RwLock<Index>,
    namer: Mutex<Namer>,
}

impl CandidateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a generation-0 seed.
    pub async fn create_seed(&self, text: impl Into<String>) -> Candidate {
        let name = self.namer.lock().await.seed();
        let candidate = Candidate::new(name, text, 0, Vec::new(), CreationMethod::Seed);
        self.insert(candidate.clone()).await;
        debug!("Created seed {} ({})", candidate.id, candidate.name);
        candidate
    }

    /// Insert an offspring of existing candidates.
    pub async fn create_child(&self, spec: ChildSpec) -> Result<Candidate> {
        let mut parents = spec.parents;
        parents.dedup();

        let count_ok = match spec.method {
            CreationMethod::Seed => false,
            CreationMethod::Mutation => parents.len() == 1,
            CreationMethod::Crossover => (1..=2).contains(&parents.len()),
        };
        if !count_ok {
            return Err(ConsistencyError::ParentCount {
                method: spec.method.to_string(),
                count: parents.len(),
            });
        }

        let mut parent_names = Vec::with_capacity(parents.len());
        for parent in &parents {
            let parent = self.get(*parent).await.ok_or(ConsistencyError::UnknownCandidate(*parent))?;
            parent_names.push(parent.name);
        }
        let names: Vec<&str> = parent_names.iter().map(String::as_str).collect();
        let name = self.namer.lock().await.offspring(spec.generation, spec.method, &names);

        let candidate = Candidate::new(name, spec.text, spec.generation, parents, spec.method)
            .with_fallback(spec.fallback)
            .with_advisory(spec.advisory);
        self.insert(candidate.clone()).await;
        debug!(
            "Created {} {} ({}){}",
            candidate.method,
            candidate.id,
            candidate.name,
            if candidate.fallback { " [fallback]" } else { "" }
        );
        Ok(candidate)
    }

    /// Fold one successful persona evaluation into a candidate's metrics.
    ///
    /// Increments `test_count` by exactly one.
    pub async fn record_evaluation(
        &self,
        id: CandidateId,
        persona: &PersonaId,
        improvement: &CriteriaVector,
    ) -> Result<PerformanceMetrics> {
        let cell = self.cell(id).await?;
        let mut candidate = cell.lock().await;
        candidate.metrics.fold(improvement);
        debug!(
            "Recorded evaluation of {} with {}: avg {:+.3} over {}",
            id, persona, candidate.metrics.avg_improvement, candidate.metrics.test_count
        );
        Ok(candidate.metrics.clone())
    }

    /// Account for a failed evaluation without touching the averages.
    pub async fn record_failure(&self, id: CandidateId) -> Result<PerformanceMetrics> {
        let cell = self.cell(id).await?;
        let mut candidate = cell.lock().await;
        candidate.metrics.record_failure();
        Ok(candidate.metrics.clone())
    }

    /// Snapshot of one candidate.
    pub async fn get(&self, id: CandidateId) -> Option<Candidate> {
        let cell = self.index.read().await.cells.get(&id).cloned()?;
        let candidate = cell.lock().await.clone();
        Some(candidate)
    }

    /// Snapshot of every candidate, in creation order.
    pub async fn all(&self) -> Vec<Candidate> {
        let cells: Vec<_> = {
            let index = self.index.read().await;
            index.order.iter().filter_map(|id| index.cells.get(id).cloned()).collect()
        };
        let mut out = Vec::with_capacity(cells.len());
        for cell in cells {
            out.push(cell.lock().await.clone());
        }
        out
    }

    /// Candidates created in generation `g`, in creation order.
    pub async fn by_generation(&self, g: u32) -> Vec<Candidate> {
        self.all().await.into_iter().filter(|c| c.generation == g).collect()
    }

    /// Direct children of a candidate.
    pub async fn children_of(&self, id: CandidateId) -> Vec<Candidate> {
        self.all().await.into_iter().filter(|c| c.parents.contains(&id)).collect()
    }

    /// Ids in creation order.
    pub async fn ids(&self) -> Vec<CandidateId> {
        self.index.read().await.order.clone()
    }

    /// Number of candidates ever created.
    pub async fn len(&self) -> usize {
        self.index.read().await.order.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn insert(&self, candidate: Candidate) {
        let mut index = self.index.write().await;
        index.order.push(candidate.id);
        index.cells.insert(candidate.id, Arc::new(Mutex::new(candidate)));
    }

    async fn cell(&self, id: CandidateId) -> Result<Arc<Mutex<Candidate>>> {
        self.index
            .read()
            .await
            .cells
            .get(&id)
            .cloned()
            .ok_or(ConsistencyError::UnknownCandidate(id))
    }
}

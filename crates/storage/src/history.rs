//! Append-only log of evaluation records.

use promptevo_core::{CandidateId, EvaluationRecord};
use tokio::sync::RwLock;

/// Ordered, append-only evaluation history.
///
/// Records are never mutated once appended. The log is for audit and lineage
/// queries; the scheduler never reads it for control flow.
#[derive(Default)]
pub struct OptimizationHistory {
    records: RwLock<Vec<EvaluationRecord>>,
}

impl OptimizationHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record.
    pub async fn append(&self, record: EvaluationRecord) {
        self.records.write().await.push(record);
    }

    /// Copy of every record, in append order.
    pub async fn snapshot(&self) -> Vec<EvaluationRecord> {
        self.records.read().await.clone()
    }

    /// Records for one candidate, in append order.
    pub async fn for_candidate(&self, id: CandidateId) -> Vec<EvaluationRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.candidate_id == id)
            .cloned()
            .collect()
    }

    /// Records appended during one generation.
    pub async fn for_generation(&self, generation: u32) -> Vec<EvaluationRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.generation == generation)
            .cloned()
            .collect()
    }

    /// Total records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether nothing has been appended yet.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptevo_core::{
        EvaluationOutcome, ExternalError, PersonaId, RecordId, Service,
    };

    fn failed(candidate_id: CandidateId, generation: u32) -> EvaluationRecord {
        let now = chrono::Utc::now();
        EvaluationRecord {
            id: RecordId::new(),
            candidate_id,
            persona_id: PersonaId::from("p1"),
            generation,
            outcome: EvaluationOutcome::Failed {
                error: ExternalError::transport(Service::Simulator, "connection reset"),
            },
            reflection: Vec::new(),
            attempts: 3,
            started_at: now,
            finished_at: now,
        }
    }

    #[tokio::test]
    async fn test_append_preserves_order_and_filters() {
        let history = OptimizationHistory::new();
        assert!(history.is_empty().await);

        let a = CandidateId::new();
        let b = CandidateId::new();
        history.append(failed(a, 0)).await;
        history.append(failed(b, 1)).await;
        history.append(failed(a, 1)).await;

        let all = history.snapshot().await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].candidate_id, a);
        assert_eq!(all[1].candidate_id, b);
        assert_eq!(history.for_candidate(a).await.len(), 2);
        assert_eq!(history.for_generation(1).await.len(), 2);
        assert!(!all[0].is_success());
    }
}

//! Contracts for the external collaborators the engine consumes.
//!
//! Implementations live outside this workspace (LLM-backed simulators,
//! assessment services, text generators). The engine only relies on these
//! narrow async traits.

use crate::error::ExternalError;
use crate::id::PersonaId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Options forwarded to the dialogue simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Conversation rounds to simulate
    pub rounds: u32,
    /// Scenario description
    pub scenario: String,
}

/// One message in a simulated conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke ("coach" or the persona)
    pub speaker: String,
    /// What was said
    pub message: String,
}

/// A checkpoint the simulator marked during the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Index of the turn the milestone belongs to
    pub turn: usize,
    /// Free-form note
    pub note: String,
}

/// Output of a simulated conversation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transcript {
    /// Conversation turns in order
    pub turns: Vec<Turn>,
    /// Zero or more milestones
    pub milestones: Vec<Milestone>,
}

/// What state of the persona the oracle should assess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContextSnapshot {
    /// The persona before any conversation
    Baseline,
    /// The persona after the conversation's effects are applied
    AfterConversation {
        /// The conversation that took place
        transcript: Transcript,
    },
}

/// Simulates a coaching conversation between a prompt and a persona.
#[async_trait]
pub trait DialogueSimulator: Send + Sync {
    /// Run one conversation.
    async fn simulate(
        &self,
        prompt_text: &str,
        persona: &PersonaId,
        options: &SimulationOptions,
    ) -> Result<Transcript, ExternalError>;
}

/// Scores a persona's 20 behavioral criteria.
#[async_trait]
pub trait AssessmentOracle: Send + Sync {
    /// Return one ordinal per criterion, in canonical criterion order.
    async fn assess(
        &self,
        persona: &PersonaId,
        snapshot: &ContextSnapshot,
    ) -> Result<Vec<u8>, ExternalError>;
}

/// Produces candidate prompt text from an instruction.
///
/// No format guarantee: callers must validate the output.
#[async_trait]
pub trait GenerativeMutator: Send + Sync {
    /// Generate text for the instruction.
    async fn generate(&self, instruction: &str) -> Result<String, ExternalError>;
}

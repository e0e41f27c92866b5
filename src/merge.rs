//! Incremental merging of streamed response chunks into one aggregate.
//!
//! Each chunk is a partial [`GenerateContentResponse`]; the aggregator folds
//! them with these rules:
//!
//! - Candidates match by `index`, not by array position. The first sighting
//!   of an index creates the accumulated candidate; later chunks extend it.
//! - Adjacent text parts concatenate (delta semantics). Structured parts are
//!   atomic — never split across chunks — and are appended as new elements,
//!   even when one looks like a repeat of an earlier part.
//! - Per-candidate metadata (`finish_reason`, `safety_ratings`,
//!   `citation_metadata`, `grounding_metadata`, `logprobs_result`) and the
//!   top-level `prompt_feedback` / `usage_metadata` are last-write-wins.

use tracing::warn;

use crate::content::Part;
use crate::response::{Candidate, GenerateContentResponse};

/// Folds a chunk sequence into one accumulated response.
///
/// Snapshots preserve first-seen candidate order; [`seal`] produces the
/// final aggregate with candidates sorted by index ascending, each index
/// exactly once.
///
/// [`seal`]: ResponseAggregator::seal
#[derive(Debug, Default)]
pub struct ResponseAggregator {
    /// Accumulated candidates in first-seen order
    candidates: Vec<Candidate>,
    aggregate: GenerateContentResponse,
}

impl ResponseAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one chunk into the accumulated state.
    pub fn ingest(&mut self, chunk: GenerateContentResponse) {
        for incoming in chunk.candidates {
            match self
                .candidates
                .iter_mut()
                .find(|existing| existing.index == incoming.index)
            {
                Some(existing) => merge_candidate(existing, incoming),
                None => self.candidates.push(incoming),
            }
        }
        if let Some(feedback) = chunk.prompt_feedback {
            self.aggregate.prompt_feedback = Some(feedback);
        }
        if let Some(usage) = chunk.usage_metadata {
            self.aggregate.usage_metadata = Some(usage);
        }
    }

    /// The cumulative state so far, one snapshot per ingested chunk.
    #[must_use]
    pub fn snapshot(&self) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: self.candidates.clone(),
            prompt_feedback: self.aggregate.prompt_feedback.clone(),
            usage_metadata: self.aggregate.usage_metadata.clone(),
        }
    }

    /// Seals the fold into the final immutable aggregate.
    pub fn seal(mut self) -> GenerateContentResponse {
        self.candidates.sort_by_key(|candidate| candidate.index);
        GenerateContentResponse {
            candidates: self.candidates,
            prompt_feedback: self.aggregate.prompt_feedback,
            usage_metadata: self.aggregate.usage_metadata,
        }
    }
}

fn merge_candidate(existing: &mut Candidate, incoming: Candidate) {
    for part in incoming.content.parts {
        match (existing.content.parts.last_mut(), &part) {
            (Some(Part::Text(accumulated)), Part::Text(delta)) => {
                accumulated.push_str(delta);
            }
            _ => existing.content.parts.push(part),
        }
    }
    if incoming.content.role.is_some() && existing.content.role != incoming.content.role {
        if existing.content.role.is_some() {
            warn!(
                index = existing.index,
                "candidate role changed across stream chunks"
            );
        }
        existing.content.role = incoming.content.role;
    }
    if let Some(reason) = incoming.finish_reason {
        existing.finish_reason = Some(reason);
    }
    if let Some(ratings) = incoming.safety_ratings {
        existing.safety_ratings = Some(ratings);
    }
    if let Some(citations) = incoming.citation_metadata {
        existing.citation_metadata = Some(citations);
    }
    if let Some(grounding) = incoming.grounding_metadata {
        existing.grounding_metadata = Some(grounding);
    }
    if let Some(logprobs) = incoming.logprobs_result {
        existing.logprobs_result = Some(logprobs);
    }
}

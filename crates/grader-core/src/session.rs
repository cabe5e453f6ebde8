//! # Session Module
//!
//! The single grading slot a front end holds.
//!
//! One image at a time. A new upload is refused while an inference is
//! pending, and a reset invalidates any inference still in flight so its
//! late result cannot overwrite the cleared slot.
//!
//! The session never runs inference itself: callers take a [`Ticket`] from
//! [`GradingSession::begin`], run the orchestrator, then hand the result back
//! through [`GradingSession::complete`].

use crate::types::{Explanation, GraderError, ImagePayload, Prediction};
use serde::Serialize;

/// Where the slot currently stands.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestState {
    #[default]
    Idle,
    Pending,
    Resolved(Prediction),
    Rejected { kind: String, message: String },
}

impl RequestState {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            Self::Resolved(prediction) => Some(prediction),
            _ => None,
        }
    }
}

/// Proof of which upload an inference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: RequestState,
    pub image_bytes: Option<usize>,
    pub explanation_visible: bool,
}

#[derive(Debug, Default)]
pub struct GradingSession {
    state: RequestState,
    image: Option<ImagePayload>,
    explanation_visible: bool,
    generation: u64,
}

impl GradingSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &RequestState {
        &self.state
    }

    #[must_use]
    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn explanation_visible(&self) -> bool {
        self.explanation_visible
    }

    /// Accept a new image and move to `Pending`.
    ///
    /// Fails with `SlotBusy` while a previous inference is outstanding.
    pub fn begin(&mut self, image: ImagePayload) -> Result<Ticket, GraderError> {
        if self.state.is_pending() {
            return Err(GraderError::SlotBusy);
        }
        self.generation = self.generation.wrapping_add(1);
        self.image = Some(image);
        self.state = RequestState::Pending;
        self.explanation_visible = false;
        Ok(Ticket {
            generation: self.generation,
        })
    }

    /// Apply an inference result.
    ///
    /// Returns `false` and leaves the session untouched when the ticket was
    /// superseded by a reset or a later upload.
    pub fn complete(&mut self, ticket: Ticket, result: Result<Prediction, GraderError>) -> bool {
        if ticket.generation != self.generation || !self.state.is_pending() {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding superseded result"
            );
            return false;
        }
        self.state = match result {
            Ok(prediction) => RequestState::Resolved(prediction),
            Err(e) => RequestState::Rejected {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        };
        true
    }

    /// Clear the slot for another image.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.state = RequestState::Idle;
        self.image = None;
        self.explanation_visible = false;
    }

    /// Flip the explanation panel. Only a resolved slot has one.
    ///
    /// Returns the new visibility, or `None` when there is nothing to show.
    pub fn toggle_explanation(&mut self) -> Option<bool> {
        self.state.prediction()?;
        self.explanation_visible = !self.explanation_visible;
        Some(self.explanation_visible)
    }

    /// Explanation of the stored prediction, if any.
    #[must_use]
    pub fn explanation(&self) -> Option<Explanation> {
        self.state.prediction().map(Prediction::explanation)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            image_bytes: self.image.as_ref().map(ImagePayload::len),
            explanation_visible: self.explanation_visible,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

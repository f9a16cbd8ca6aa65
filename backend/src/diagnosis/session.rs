use chrono::{DateTime, Utc};
use shared::{Diagnosis, EnhancementWarning, SelectionOutcome, SessionId};

use crate::imaging::Image;

/// Immutable record of one analysis request. A new analysis replaces the
/// whole value; nothing is edited in place.
#[derive(Debug, Clone)]
pub struct SessionResult {
    id: SessionId,
    created_at: DateTime<Utc>,
    input: Image,
    input_digest: String,
    enhanced_image: Option<Image>,
    original: Diagnosis,
    enhanced: Option<Diagnosis>,
    outcome: SelectionOutcome,
    warning: Option<EnhancementWarning>,
}

impl SessionResult {
    /// Enhancement was not requested.
    pub fn original_only(id: SessionId, input: Image, original: Diagnosis) -> Self {
        Self::build(id, input, None, original, None, SelectionOutcome::Original, None)
    }

    /// Both passes ran; the enhanced pass wins only on strictly higher confidence.
    pub fn compared(
        id: SessionId,
        input: Image,
        enhanced_image: Image,
        original: Diagnosis,
        enhanced: Diagnosis,
    ) -> Self {
        let outcome = if enhanced.confidence > original.confidence {
            SelectionOutcome::Enhanced
        } else {
            SelectionOutcome::Original
        };
        Self::build(
            id,
            input,
            Some(enhanced_image),
            original,
            Some(enhanced),
            outcome,
            None,
        )
    }

    /// The enhancement attempt was abandoned. `enhanced_image` is present
    /// when upscaling worked but re-classification did not.
    pub fn enhancement_failed(
        id: SessionId,
        input: Image,
        enhanced_image: Option<Image>,
        original: Diagnosis,
        warning: EnhancementWarning,
    ) -> Self {
        Self::build(
            id,
            input,
            enhanced_image,
            original,
            None,
            SelectionOutcome::EnhancementFailed,
            Some(warning),
        )
    }

    fn build(
        id: SessionId,
        input: Image,
        enhanced_image: Option<Image>,
        original: Diagnosis,
        enhanced: Option<Diagnosis>,
        outcome: SelectionOutcome,
        warning: Option<EnhancementWarning>,
    ) -> Self {
        let input_digest = input.digest();
        Self {
            id,
            created_at: Utc::now(),
            input,
            input_digest,
            enhanced_image,
            original,
            enhanced,
            outcome,
            warning,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn input(&self) -> &Image {
        &self.input
    }

    pub fn input_digest(&self) -> &str {
        &self.input_digest
    }

    pub fn enhanced_image(&self) -> Option<&Image> {
        self.enhanced_image.as_ref()
    }

    pub fn original(&self) -> &Diagnosis {
        &self.original
    }

    pub fn enhanced(&self) -> Option<&Diagnosis> {
        self.enhanced.as_ref()
    }

    pub fn outcome(&self) -> SelectionOutcome {
        self.outcome
    }

    pub fn warning(&self) -> Option<&EnhancementWarning> {
        self.warning.as_ref()
    }

    pub fn final_diagnosis(&self) -> &Diagnosis {
        match (self.outcome, &self.enhanced) {
            (SelectionOutcome::Enhanced, Some(enhanced)) => enhanced,
            _ => &self.original,
        }
    }
}

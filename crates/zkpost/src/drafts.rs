//! Per-reference drafts and their submission status.
//!
//! A draft is keyed by the message it replies to, or `""` for a top-level
//! post. Content is only cleared by a confirmed submission.
//!
//! ```text
//! Empty -> Editing -> Submitting -> Empty          (accepted)
//!                               \-> Failed -> Editing (next edit)
//! ```

use dashmap::DashMap;
use tracing::debug;

/// Where a draft is in its lifecycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Status {
    /// Nothing typed.
    #[default]
    Empty,
    /// Has content, not submitted.
    Editing,
    /// A submission is running.
    Submitting,
    /// The last submission failed; content is intact.
    Failed {
        /// Error shown to the user.
        reason: String,
    },
}

/// Draft content and status for one reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    /// Markdown content.
    pub content: String,
    /// Lifecycle status.
    pub status: Status,
}

/// All drafts, keyed by reference.
#[derive(Debug, Default)]
pub struct Book {
    drafts: DashMap<String, Draft>,
}

impl Book {
    /// An empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the draft content for `reference`.
    ///
    /// A running submission keeps its status; otherwise the draft becomes
    /// `Editing`, or `Empty` when the content is empty.
    pub fn set(&self, reference: &str, content: impl Into<String>) {
        let mut draft = self.drafts.entry(reference.to_owned()).or_default();
        draft.content = content.into();
        if draft.status != Status::Submitting {
            draft.status = if draft.content.is_empty() {
                Status::Empty
            } else {
                Status::Editing
            };
        }
    }

    /// Draft for `reference`; empty if never touched.
    #[must_use]
    pub fn get(&self, reference: &str) -> Draft {
        self.drafts
            .get(reference)
            .map(|draft| draft.value().clone())
            .unwrap_or_default()
    }

    /// Status for `reference`.
    #[must_use]
    pub fn status(&self, reference: &str) -> Status {
        self.get(reference).status
    }

    /// Mark `Submitting` and return the content being submitted.
    pub(crate) fn begin(&self, reference: &str) -> String {
        let mut draft = self.drafts.entry(reference.to_owned()).or_default();
        draft.status = Status::Submitting;
        draft.content.clone()
    }

    /// Clear the draft if it still holds what was submitted. Edits made
    /// while submitting survive as a new draft.
    pub(crate) fn succeed(&self, reference: &str, submitted: &str) {
        if let Some(mut draft) = self.drafts.get_mut(reference) {
            if draft.content == submitted {
                *draft = Draft::default();
            } else {
                draft.status = Status::Editing;
            }
        }
        debug!(reference, "draft submitted");
    }

    /// Record a failure. Content is left untouched.
    pub(crate) fn fail(&self, reference: &str, reason: String) {
        if let Some(mut draft) = self.drafts.get_mut(reference) {
            draft.status = Status::Failed { reason };
        }
    }

    /// Return an interrupted submission to `Editing`.
    pub(crate) fn abandon(&self, reference: &str) {
        if let Some(mut draft) = self.drafts.get_mut(reference) {
            if draft.status == Status::Submitting {
                debug!(reference, "submission abandoned");
                draft.status = if draft.content.is_empty() {
                    Status::Empty
                } else {
                    Status::Editing
                };
            }
        }
    }
}

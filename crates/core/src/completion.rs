//! Pending per-plan completion changes.
//!
//! The plan list lets users tick plans as completed and then save them all
//! at once. [`CompletionTracker`] keeps the toggles relative to each plan's
//! persisted value, so toggling back and forth leaves nothing to save.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::DbId;
use crate::writer::PlanWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    original: bool,
    desired: bool,
}

/// Outcome of [`CompletionTracker::save_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionSaveReport {
    /// Plans written, in the order they were written.
    pub saved: Vec<DbId>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    pending: BTreeMap<DbId, Pending>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `plan_id`, persisted as `original`, should become `desired`.
    ///
    /// Setting a plan back to its persisted value drops the pending entry.
    pub fn set(&mut self, plan_id: DbId, original: bool, desired: bool) {
        let original = self
            .pending
            .get(&plan_id)
            .map(|p| p.original)
            .unwrap_or(original);
        if original == desired {
            self.pending.remove(&plan_id);
        } else {
            self.pending.insert(plan_id, Pending { original, desired });
        }
    }

    pub fn is_pending(&self, plan_id: DbId) -> bool {
        self.pending.contains_key(&plan_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Write every pending change, one at a time, in plan id order.
    ///
    /// Issues exactly one write per pending change. Written entries leave the
    /// pending set as they succeed; on the first failure the loop stops and
    /// the remaining entries stay pending for a manual retry.
    pub async fn save_all<W: PlanWriter + ?Sized>(
        &mut self,
        writer: &W,
    ) -> Result<CompletionSaveReport, (CompletionSaveReport, W::Error)> {
        let queue: Vec<(DbId, bool)> = self
            .pending
            .iter()
            .map(|(id, p)| (*id, p.desired))
            .collect();
        let mut saved = Vec::with_capacity(queue.len());

        for (plan_id, completed) in queue {
            if let Err(e) = writer.write_completion(plan_id, completed).await {
                return Err((CompletionSaveReport { saved }, e));
            }
            self.pending.remove(&plan_id);
            saved.push(plan_id);
        }
        Ok(CompletionSaveReport { saved })
    }
}

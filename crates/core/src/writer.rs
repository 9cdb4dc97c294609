//! The seam between in-memory editing state and persistence.
//!
//! [`StoryboardEditor`](crate::editor::StoryboardEditor) and
//! [`CompletionTracker`](crate::completion::CompletionTracker) never talk to a
//! store directly; they commit through a [`PlanWriter`]. The `db` crate
//! implements it over a real store, tests implement it with a recorder.

use async_trait::async_trait;

use crate::storyboard::PlanDocument;
use crate::types::DbId;

#[async_trait]
pub trait PlanWriter: Send + Sync {
    type Error: Send;

    /// Persist the full editable content of a plan.
    async fn write_document(&self, plan_id: DbId, document: &PlanDocument)
        -> Result<(), Self::Error>;

    /// Persist a plan's completion flag.
    async fn write_completion(&self, plan_id: DbId, completed: bool) -> Result<(), Self::Error>;
}

/// A [`PlanWriter`] that records every call, for tests.
#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Document(DbId, PlanDocument),
        Completion(DbId, bool),
    }

    #[derive(Default)]
    pub struct RecordingWriter {
        pub calls: Mutex<Vec<Call>>,
        /// Fail the call with this (zero-based) index.
        pub fail_at: Option<usize>,
    }

    impl RecordingWriter {
        pub fn failing_at(index: usize) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_at: Some(index),
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) -> Result<(), String> {
            let mut calls = self.calls.lock().unwrap();
            if self.fail_at == Some(calls.len()) {
                calls.push(call);
                return Err("write failed".to_string());
            }
            calls.push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl PlanWriter for RecordingWriter {
        type Error = String;

        async fn write_document(
            &self,
            plan_id: DbId,
            document: &PlanDocument,
        ) -> Result<(), String> {
            self.record(Call::Document(plan_id, document.clone()))
        }

        async fn write_completion(&self, plan_id: DbId, completed: bool) -> Result<(), String> {
            self.record(Call::Completion(plan_id, completed))
        }
    }
}

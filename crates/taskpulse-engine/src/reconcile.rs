//! Reconciliation engine: merges the external card set into the local
//! mirror. The board is authoritative: external fields always win, and
//! cards that disappear from the board are hard-deleted locally.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use taskpulse_board::{BoardApi, CardDraft, CardSnapshot};
use taskpulse_core::error::{Error, Result};
use taskpulse_core::types::TaskRecord;
use taskpulse_store::MirrorDb;

use crate::scoring;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Tasks that transitioned into the done list this pass.
    pub completions: usize,
    /// Score folds performed this pass.
    pub scored: usize,
}

/// Diffs the external board against the local mirror and applies it.
pub struct Reconciler {
    board: Arc<dyn BoardApi>,
    store: Arc<MirrorDb>,
    done_list: String,
}

impl Reconciler {
    pub fn new(board: Arc<dyn BoardApi>, store: Arc<MirrorDb>, done_list: &str) -> Self {
        Self {
            board,
            store,
            done_list: done_list.to_string(),
        }
    }

    /// Run one full pass: fetch every card, upsert each, then delete local
    /// tasks no longer on the board. A card-list fetch failure aborts the
    /// pass before anything is touched; per-card enrichment failures only
    /// degrade that card.
    pub async fn run(&self) -> Result<ReconcileOutcome> {
        let cards = self.board.list_cards().await?;
        tracing::info!("Reconciling {} card(s) from the board", cards.len());

        let mut outcome = ReconcileOutcome::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(cards.len());

        for card in &cards {
            seen.insert(card.id.clone());
            if let Err(e) = self.apply_card(card, &mut outcome).await {
                tracing::warn!("Card '{}' degraded: {e}", card.name);
            }
        }

        // Deletion only after every upsert in the pass. A card missing
        // from a partial view must never be deleted.
        outcome.deleted = self.store.delete_missing(&seen)?;

        tracing::info!(
            "Reconcile done: {} created, {} updated, {} deleted, {} completed, {} scored",
            outcome.created,
            outcome.updated,
            outcome.deleted,
            outcome.completions,
            outcome.scored
        );
        Ok(outcome)
    }

    async fn apply_card(&self, card: &CardSnapshot, outcome: &mut ReconcileOutcome) -> Result<()> {
        let prior = self.store.get_by_card(&card.id)?;
        let (task_id, created) =
            self.store
                .upsert_snapshot(&card.id, &card.name, &card.desc, card.due)?;
        if created {
            outcome.created += 1;
        } else {
            outcome.updated += 1;
        }

        // Completion is derived from the card's containing list. A failed
        // list lookup leaves the completion state as it was.
        if let Some(list_id) = &card.list_id {
            match self.board.get_list(list_id).await {
                Ok(list) => {
                    let done = list.name.eq_ignore_ascii_case(&self.done_list);
                    let was_completed = prior.as_ref().map(|t| t.completed).unwrap_or(false);
                    if done && !was_completed {
                        self.store
                            .set_completion(task_id, true, Some(Utc::now().date_naive()))?;
                        outcome.completions += 1;
                    } else if !done && was_completed {
                        // Moved back out of done: completion resets, but
                        // any score already folded stays in the aggregate.
                        self.store.set_completion(task_id, false, None)?;
                    }
                }
                Err(e) => tracing::warn!("List lookup failed for {list_id}: {e}"),
            }
        }

        self.apply_assignment(card, task_id, prior.as_ref()).await?;

        // Pick up any scoring event this pass produced (or one left over
        // from an earlier degraded pass).
        if let Some(task) = self.store.get(task_id)? {
            if !task.score_counted && scoring::credit_task(&self.store, &task)? {
                outcome.scored += 1;
            }
        }
        Ok(())
    }

    async fn apply_assignment(
        &self,
        card: &CardSnapshot,
        task_id: i64,
        prior: Option<&TaskRecord>,
    ) -> Result<()> {
        match card.member_ids.first() {
            Some(member_id) => match self.board.get_member(member_id).await {
                Ok(profile) => {
                    self.store.set_assignment(
                        task_id,
                        member_id,
                        Some(&profile.full_name),
                        Some(&profile.username),
                    )?;
                    self.store
                        .upsert_member_profile(member_id, &profile.full_name, &profile.username)?;
                }
                Err(e) => {
                    // Still track the raw id; enrichment is retried on
                    // the next pass.
                    tracing::warn!("Member lookup failed for {member_id}: {e}");
                    self.store.set_assignment(task_id, member_id, None, None)?;
                }
            },
            None => {
                if prior.map(|t| t.member_id.is_some()).unwrap_or(false) {
                    self.store.clear_assignment(task_id)?;
                }
            }
        }
        Ok(())
    }

    /// Manually set or clear a task's score override, then credit the new
    /// value as a fresh fold event. The prior contribution is never
    /// subtracted from the aggregate. Returns whether a fold happened.
    pub fn apply_score_override(&self, task_id: i64, value: Option<f64>) -> Result<bool> {
        self.store.set_score_override(task_id, value)?;
        match self.store.get(task_id)? {
            Some(task) => scoring::credit_task(&self.store, &task),
            None => Ok(false),
        }
    }

    /// Push a local card edit out to the board and mirror the result.
    pub async fn push_task(&self, draft: &CardDraft) -> Result<TaskRecord> {
        let snapshot = self.board.upsert_card(draft).await?;
        let (task_id, _) = self.store.upsert_snapshot(
            &snapshot.id,
            &snapshot.name,
            &snapshot.desc,
            snapshot.due,
        )?;
        if let Some(member_id) = snapshot.member_ids.first() {
            self.store.set_assignment(task_id, member_id, None, None)?;
        }
        self.store
            .get(task_id)?
            .ok_or_else(|| Error::Store("pushed task missing from mirror".into()))
    }

    /// Delete a card on the board and drop it from the mirror.
    pub async fn remove_card(&self, card_id: &str) -> Result<bool> {
        let ok = self.board.delete_card(card_id).await?;
        if ok {
            self.store.delete_by_card(card_id)?;
        }
        Ok(ok)
    }
}

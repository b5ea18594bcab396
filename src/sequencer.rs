//! Drives one item through menu, delete, confirm and removal.

use std::fmt;

use tracing::{debug, warn};

use crate::config::SweepConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::profile::SweepProfile;
use crate::waiter::{WaitBudget, Waiter};

/// Progress of one item through the delete sequence. Only ever advances to
/// the next variant in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SequenceState {
    Idle,
    MenuOpened,
    DeleteTriggered,
    ConfirmPending,
    Confirmed,
    Verified,
}

impl SequenceState {
    pub fn next(self) -> Option<SequenceState> {
        use SequenceState::*;
        match self {
            Idle => Some(MenuOpened),
            MenuOpened => Some(DeleteTriggered),
            DeleteTriggered => Some(ConfirmPending),
            ConfirmPending => Some(Confirmed),
            Confirmed => Some(Verified),
            Verified => None,
        }
    }
}

/// How the delete sequence ended for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    SkippedNotFound,
    SkippedConfirmMissing,
    TimedOut,
    Failed(String),
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Completed => write!(f, "deleted"),
            ActionOutcome::SkippedNotFound => write!(f, "skipped, item no longer present"),
            ActionOutcome::SkippedConfirmMissing => write!(f, "skipped, no confirmation dialog"),
            ActionOutcome::TimedOut => write!(f, "confirmed but still present"),
            ActionOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

impl From<Error> for ActionOutcome {
    fn from(err: Error) -> Self {
        match err {
            Error::Timeout(_) => ActionOutcome::TimedOut,
            Error::Stale(_) => ActionOutcome::SkippedNotFound,
            Error::ElementNotFound(what) => ActionOutcome::Failed(what),
            other => ActionOutcome::Failed(other.to_string()),
        }
    }
}

/// Runs the delete sequence for a single item. Create one per item.
pub struct ActionSequencer<'a, D: Document> {
    doc: &'a D,
    profile: &'a SweepProfile,
    config: &'a SweepConfig,
    waiter: Waiter<'a, D>,
    state: SequenceState,
    trail: Vec<SequenceState>,
}

impl<'a, D: Document> ActionSequencer<'a, D> {
    pub fn new(doc: &'a D, profile: &'a SweepProfile, config: &'a SweepConfig) -> Self {
        Self {
            doc,
            profile,
            config,
            waiter: Waiter::new(doc, config.poll_interval),
            state: SequenceState::Idle,
            trail: vec![SequenceState::Idle],
        }
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn trail(&self) -> &[SequenceState] {
        &self.trail
    }

    /// Run the sequence against `item`. Every failure is folded into the
    /// returned outcome.
    pub async fn run(&mut self, item: &D::Node) -> ActionOutcome {
        match self.drive(item).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(state = ?self.state, error = %err, "delete sequence aborted");
                ActionOutcome::from(err)
            }
        }
    }

    fn advance(&mut self, to: SequenceState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(Error::Unclassified(format!(
                "illegal transition {:?} -> {:?}",
                self.state, to
            )));
        }
        debug!(from = ?self.state, ?to, "sequence advanced");
        self.state = to;
        self.trail.push(to);
        Ok(())
    }

    async fn drive(&mut self, item: &D::Node) -> Result<ActionOutcome> {
        if !self.doc.is_attached(item).await? {
            return Ok(ActionOutcome::SkippedNotFound);
        }

        let trigger = self
            .doc
            .query(Some(item), &self.profile.trigger)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ElementNotFound("trigger-control-not-found".into()))?;
        self.doc.scroll_into_view(&trigger).await?;
        self.doc.click(&trigger).await?;
        self.advance(SequenceState::MenuOpened)?;
        tokio::time::sleep(self.config.menu_settle).await;

        if !self.doc.is_attached(item).await? {
            return Ok(ActionOutcome::SkippedNotFound);
        }
        let profile = self.profile;
        let delete_match = &profile.delete_match;
        let option = match self
            .waiter
            .wait_for_appearance(
                None,
                &profile.delete_option,
                |info| delete_match.matches(info),
                &WaitBudget::new(self.config.menu_wait, "delete affordance"),
            )
            .await
        {
            Ok(option) => option,
            Err(err) if err.is_timeout() => {
                // The menu stays open; the next scan starts from scratch anyway.
                if !self.doc.is_attached(item).await? {
                    return Ok(ActionOutcome::SkippedNotFound);
                }
                return Ok(ActionOutcome::Failed("delete-affordance-not-found".into()));
            }
            Err(err) => return Err(err),
        };
        self.doc.click(&option).await?;
        self.advance(SequenceState::DeleteTriggered)?;
        tokio::time::sleep(self.config.delete_settle).await;

        let dialog = match self
            .waiter
            .wait_for_appearance(
                None,
                &self.profile.dialog,
                |_| true,
                &WaitBudget::new(self.config.confirm_wait, "confirmation dialog"),
            )
            .await
        {
            Ok(dialog) => dialog,
            Err(err) if err.is_timeout() => return Ok(ActionOutcome::SkippedConfirmMissing),
            Err(err) => return Err(err),
        };
        self.advance(SequenceState::ConfirmPending)?;

        let Some(confirm) = self.find_confirm(&dialog).await? else {
            return Ok(ActionOutcome::Failed("confirm-button-not-found".into()));
        };
        self.doc.click(&confirm).await?;
        self.advance(SequenceState::Confirmed)?;

        let budget = WaitBudget::new(self.config.removal_wait, "item removal");
        match self.waiter.wait_for_disappearance(Some(item), &budget).await {
            Ok(()) => {
                self.advance(SequenceState::Verified)?;
                Ok(ActionOutcome::Completed)
            }
            Err(err) if err.is_timeout() => Ok(ActionOutcome::TimedOut),
            Err(err) => Err(err),
        }
    }

    /// First button in the dialog accepted by the profile's confirm matcher.
    async fn find_confirm(&self, dialog: &D::Node) -> Result<Option<D::Node>> {
        for button in self
            .doc
            .query(Some(dialog), &self.profile.confirm_button)
            .await?
        {
            let info = self.doc.inspect(&button).await?;
            if self.profile.confirm_match.matches(&info) {
                return Ok(Some(button));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{self, ItemScript, MemoryDocument};
    use std::time::Duration;

    fn fast_config() -> SweepConfig {
        SweepConfig::builder()
            .menu_wait(Duration::from_secs(1))
            .confirm_wait(Duration::from_secs(1))
            .removal_wait(Duration::from_secs(5))
            .build()
    }

    #[test]
    fn states_form_a_single_chain() {
        let mut state = SequenceState::Idle;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            assert!(next > state);
            state = next;
            visited.push(state);
        }
        assert_eq!(visited.len(), 6);
        assert_eq!(state, SequenceState::Verified);
        assert_eq!(SequenceState::ConfirmPending.next(), Some(SequenceState::Confirmed));
    }

    #[test]
    fn errors_classify_into_outcomes() {
        assert_eq!(ActionOutcome::from(Error::Timeout("x".into())), ActionOutcome::TimedOut);
        assert_eq!(ActionOutcome::from(Error::Stale("x".into())), ActionOutcome::SkippedNotFound);
        assert_eq!(
            ActionOutcome::from(Error::ElementNotFound("trigger-control-not-found".into())),
            ActionOutcome::Failed("trigger-control-not-found".into())
        );
        assert!(matches!(
            ActionOutcome::from(Error::JsError("boom".into())),
            ActionOutcome::Failed(reason) if reason.contains("boom")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_visits_every_state_in_order() {
        let doc = MemoryDocument::new();
        let nodes = doc.add_item(ItemScript::default());
        let profile = memory::profile();
        let config = fast_config();

        let mut sequencer = ActionSequencer::new(&doc, &profile, &config);
        let outcome = sequencer.run(&nodes.item).await;

        assert_eq!(outcome, ActionOutcome::Completed);
        assert_eq!(
            sequencer.trail(),
            &[
                SequenceState::Idle,
                SequenceState::MenuOpened,
                SequenceState::DeleteTriggered,
                SequenceState::ConfirmPending,
                SequenceState::Confirmed,
                SequenceState::Verified,
            ]
        );
        assert_eq!(doc.clicks(), vec![nodes.trigger, nodes.option, nodes.confirm]);
    }

    #[tokio::test(start_paused = true)]
    async fn illegal_transition_is_rejected() {
        let doc = MemoryDocument::new();
        let profile = memory::profile();
        let config = fast_config();
        let mut sequencer = ActionSequencer::new(&doc, &profile, &config);

        sequencer.advance(SequenceState::MenuOpened).unwrap();
        sequencer.advance(SequenceState::DeleteTriggered).unwrap();
        sequencer.advance(SequenceState::ConfirmPending).unwrap();
        assert!(sequencer.advance(SequenceState::Verified).is_err());
        assert_eq!(sequencer.state(), SequenceState::ConfirmPending);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_dialog_is_a_skip() {
        let doc = MemoryDocument::new();
        let nodes = doc.add_item(ItemScript {
            shows_dialog: false,
            ..ItemScript::default()
        });
        let profile = memory::profile();
        let config = fast_config();

        let mut sequencer = ActionSequencer::new(&doc, &profile, &config);
        assert_eq!(sequencer.run(&nodes.item).await, ActionOutcome::SkippedConfirmMissing);
        assert_eq!(sequencer.state(), SequenceState::DeleteTriggered);
        assert!(doc.is_reachable(nodes.item));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_delete_option_fails_the_item() {
        let doc = MemoryDocument::new();
        let nodes = doc.add_item(ItemScript {
            shows_delete_option: false,
            ..ItemScript::default()
        });
        let profile = memory::profile();
        let config = fast_config();

        let outcome = ActionSequencer::new(&doc, &profile, &config)
            .run(&nodes.item)
            .await;
        assert_eq!(outcome, ActionOutcome::Failed("delete-affordance-not-found".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn item_removed_after_menu_open_is_skipped() {
        let doc = MemoryDocument::new();
        let nodes = doc.add_item(ItemScript {
            vanishes_on_open: true,
            ..ItemScript::default()
        });
        let profile = memory::profile();
        let config = fast_config();

        let mut sequencer = ActionSequencer::new(&doc, &profile, &config);
        assert_eq!(sequencer.run(&nodes.item).await, ActionOutcome::SkippedNotFound);
        assert_eq!(sequencer.state(), SequenceState::MenuOpened);
    }

    #[tokio::test(start_paused = true)]
    async fn already_detached_item_is_skipped_without_clicking() {
        let doc = MemoryDocument::new();
        let nodes = doc.add_item(ItemScript::default());
        doc.remove(nodes.item);
        let profile = memory::profile();
        let config = fast_config();

        let outcome = ActionSequencer::new(&doc, &profile, &config)
            .run(&nodes.item)
            .await;
        assert_eq!(outcome, ActionOutcome::SkippedNotFound);
        assert!(doc.clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_falls_back_to_primary_styling() {
        let doc = MemoryDocument::new();
        let nodes = doc.add_item(ItemScript {
            confirm_label: "Remove".into(),
            confirm_class: Some("primary".into()),
            ..ItemScript::default()
        });
        let profile = memory::profile();
        let config = fast_config();

        let outcome = ActionSequencer::new(&doc, &profile, &config)
            .run(&nodes.item)
            .await;
        assert_eq!(outcome, ActionOutcome::Completed);
        assert_eq!(doc.clicks().last(), Some(&nodes.confirm));
    }

    #[tokio::test(start_paused = true)]
    async fn unmatched_confirm_button_fails_the_item() {
        let doc = MemoryDocument::new();
        let nodes = doc.add_item(ItemScript {
            confirm_label: "Remove".into(),
            ..ItemScript::default()
        });
        let profile = memory::profile();
        let config = fast_config();

        let outcome = ActionSequencer::new(&doc, &profile, &config)
            .run(&nodes.item)
            .await;
        assert_eq!(outcome, ActionOutcome::Failed("confirm-button-not-found".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn lingering_item_times_out() {
        let doc = MemoryDocument::new();
        let nodes = doc.add_item(ItemScript {
            removable: false,
            ..ItemScript::default()
        });
        let profile = memory::profile();
        let config = fast_config();

        let mut sequencer = ActionSequencer::new(&doc, &profile, &config);
        assert_eq!(sequencer.run(&nodes.item).await, ActionOutcome::TimedOut);
        assert_eq!(sequencer.state(), SequenceState::Confirmed);
    }
}

//! Tab-switch guard

use std::collections::HashMap;

use tokio::sync::watch;

use crate::types::TaskType;

/// Outcome of a tab switch request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The requested tab is now active
    Switched,
    /// The requested tab was already active
    Unchanged,
    /// The active tab shows a result; call [`FeatureTabs::confirm_switch`]
    /// or [`FeatureTabs::cancel_switch`]
    NeedsConfirmation,
}

/// Active feature tab plus the guard that protects shown results
///
/// Each tab registers the "has active result" receiver of its orchestrator.
/// Switching away from a tab whose flag is set needs confirmation.
#[derive(Debug)]
pub struct FeatureTabs {
    active: TaskType,
    pending: Option<TaskType>,
    guards: HashMap<TaskType, watch::Receiver<bool>>,
}

impl FeatureTabs {
    /// Start on `initial` with no guards
    pub fn new(initial: TaskType) -> Self {
        Self {
            active: initial,
            pending: None,
            guards: HashMap::new(),
        }
    }

    /// Register the active-result flag of a tab's orchestrator
    pub fn with_guard(mut self, tab: TaskType, flag: watch::Receiver<bool>) -> Self {
        self.guards.insert(tab, flag);
        self
    }

    /// Replace the active-result flag of a tab
    pub fn set_guard(&mut self, tab: TaskType, flag: watch::Receiver<bool>) {
        self.guards.insert(tab, flag);
    }

    /// The active tab
    pub fn active(&self) -> TaskType {
        self.active
    }

    /// Tab waiting for confirmation
    pub fn pending(&self) -> Option<TaskType> {
        self.pending
    }

    /// Whether the active tab currently shows a result
    pub fn is_guarded(&self) -> bool {
        self.guards
            .get(&self.active)
            .is_some_and(|flag| *flag.borrow())
    }

    /// Ask to switch to `tab`
    pub fn request_switch(&mut self, tab: TaskType) -> SwitchOutcome {
        if tab == self.active {
            self.pending = None;
            return SwitchOutcome::Unchanged;
        }
        if self.is_guarded() {
            tracing::debug!(from = %self.active, to = %tab, "tab switch needs confirmation");
            self.pending = Some(tab);
            return SwitchOutcome::NeedsConfirmation;
        }
        self.active = tab;
        self.pending = None;
        SwitchOutcome::Switched
    }

    /// Switch to the pending tab, discarding the shown result
    pub fn confirm_switch(&mut self) -> Option<TaskType> {
        let tab = self.pending.take()?;
        self.active = tab;
        Some(tab)
    }

    /// Stay on the active tab
    pub fn cancel_switch(&mut self) -> Option<TaskType> {
        self.pending.take()
    }
}

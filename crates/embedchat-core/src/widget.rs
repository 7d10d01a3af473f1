use crate::config::WidgetConfig;
use crate::session::SessionIdentityManager;

/// Open / minimized state of the chat window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WidgetState {
    open: bool,
    minimized: bool,
}

impl WidgetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Returns `true` if the window was closed before
    pub fn open(&mut self) -> bool {
        !std::mem::replace(&mut self.open, true)
    }

    pub fn close(&mut self) -> bool {
        std::mem::replace(&mut self.open, false)
    }

    /// Flip minimized; returns the new value
    pub fn toggle_minimize(&mut self) -> bool {
        self.minimized = !self.minimized;
        self.minimized
    }

    /// A click on the header only restores a minimized window.
    /// Returns `true` if it did.
    pub fn header_activated(&mut self) -> bool {
        if self.minimized {
            self.minimized = false;
            true
        } else {
            false
        }
    }
}

/// The one-time automatic open
pub struct AutoTrigger;

impl AutoTrigger {
    /// Delay to schedule the automatic open with, or `None` if it already
    /// fired in this browsing session.
    pub fn pending_delay(session: &SessionIdentityManager, config: &WidgetConfig) -> Option<u32> {
        session
            .should_auto_trigger()
            .then_some(config.auto_trigger_delay_ms)
    }

    /// Open the window and record the trigger. Returns `false` without
    /// changing anything if it already fired.
    pub fn fire(session: &SessionIdentityManager, state: &mut WidgetState) -> bool {
        if !session.should_auto_trigger() {
            return false;
        }
        state.open();
        session.mark_auto_triggered();
        true
    }
}

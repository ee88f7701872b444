use crate::host::Host;
use crate::policy::{service_class, usable_state, UsableState};
use crate::types::{DisplayInfo, RegState, SignalStrength, SlotId};

/// Per-slot record of the signals feeding auto switch decisions.
#[derive(Debug, Clone)]
pub struct PhoneSignalStatus {
    slot: SlotId,
    reg_state: RegState,
    display_info: DisplayInfo,
    signal_strength: SignalStrength,
    listening: bool,
}

impl PhoneSignalStatus {
    /// Creates a tracker for `slot`. Registration starts out unknown;
    /// display info and signal strength are seeded from the host.
    pub(crate) fn new<H: Host>(slot: SlotId, host: &H) -> Self {
        Self {
            slot,
            reg_state: RegState::NotRegistered,
            display_info: host.display_info(slot).unwrap_or_default(),
            signal_strength: host.signal_strength(slot).unwrap_or_default(),
            listening: false,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn reg_state(&self) -> RegState {
        self.reg_state
    }

    /// Whether this slot's host event streams are currently subscribed.
    pub fn listening(&self) -> bool {
        self.listening
    }

    pub(crate) fn set_listening(&mut self, listening: bool) {
        self.listening = listening;
    }

    /// Updates the registration state, reporting whether the slot crossed
    /// the out-of-service / home / roaming partition. Transitions within a
    /// partition never affect a decision.
    pub(crate) fn set_reg_state(&mut self, reg_state: RegState) -> bool {
        let crossed = service_class(self.reg_state) != service_class(reg_state);
        self.reg_state = reg_state;
        crossed
    }

    /// Updates the display info, reporting whether it changed.
    pub(crate) fn set_display_info(&mut self, display_info: DisplayInfo) -> bool {
        let changed = self.display_info != display_info;
        self.display_info = display_info;
        changed
    }

    /// Updates the signal strength, reporting whether the level moved.
    pub(crate) fn set_signal_strength(&mut self, signal_strength: SignalStrength) -> bool {
        let changed = self.signal_strength.level() != signal_strength.level();
        self.signal_strength = signal_strength;
        changed
    }

    /// RAT/signal preference score. Zero whenever the slot is out of
    /// service.
    pub fn score<H: Host>(&self, host: &H) -> u32 {
        if !self.reg_state.in_service() {
            return 0;
        }
        host.auto_switch_score(self.display_info, self.signal_strength)
    }

    pub fn usable_state<H: Host>(&self, host: &H) -> UsableState {
        usable_state(self.reg_state, host.data_roaming_enabled(self.slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockHost;

    #[test]
    fn reg_updates_report_partition_crossings_only() {
        let host = MockHost::dual_sim();
        let mut status = PhoneSignalStatus::new(SlotId(0), &host);

        // NotRegistered and Other share the out-of-service partition.
        assert!(!status.set_reg_state(RegState::Other));
        assert!(status.set_reg_state(RegState::Home));
        assert!(!status.set_reg_state(RegState::Home));
        assert!(status.set_reg_state(RegState::Roaming));
        assert!(status.set_reg_state(RegState::NotRegistered));
    }

    #[test]
    fn score_is_zero_out_of_service() {
        let host = MockHost::dual_sim();
        let mut status = PhoneSignalStatus::new(SlotId(0), &host);
        assert_eq!(status.score(&host), 0);

        status.set_reg_state(RegState::Home);
        assert!(status.score(&host) > 0);

        status.set_reg_state(RegState::Other);
        assert_eq!(status.score(&host), 0);
    }

    #[test]
    fn signal_changes_are_detected_by_level() {
        let host = MockHost::dual_sim();
        let mut status = PhoneSignalStatus::new(SlotId(0), &host);
        status.set_reg_state(RegState::Home);

        let level = status.signal_strength.level();
        // Same level, different contents: no trigger, but the new value is
        // still what gets scored.
        assert!(!status.set_signal_strength(SignalStrength::new(level, 77)));
        assert_eq!(status.score(&host), 77);

        assert!(status.set_signal_strength(SignalStrength::new(level + 1, 78)));
    }

    #[test]
    fn display_info_changes_compare_by_equality() {
        let host = MockHost::dual_sim();
        let mut status = PhoneSignalStatus::new(SlotId(1), &host);

        let current = status.display_info;
        assert!(!status.set_display_info(current));
        assert!(status.set_display_info(DisplayInfo(current.0 + 1)));
    }

    #[test]
    fn usable_state_consults_roaming_opt_in() {
        let host = MockHost::dual_sim();
        let mut status = PhoneSignalStatus::new(SlotId(1), &host);

        status.set_reg_state(RegState::Roaming);
        assert_eq!(status.usable_state(&host), UsableState::NotUsable);

        host.state.borrow_mut().slots[1].data_roaming_enabled = true;
        assert_eq!(status.usable_state(&host), UsableState::RoamingEnabled);

        status.set_reg_state(RegState::Home);
        assert_eq!(status.usable_state(&host), UsableState::Home);
    }
}

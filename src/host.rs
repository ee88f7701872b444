use heapless::Vec;

use crate::types::{
    DisplayInfo, EvaluationReason, RegState, SignalStrength, SlotId, SubId, Subscription,
    SwitchTarget, MAX_SLOTS,
};

/// Telephony state the engine pulls from its host on demand.
///
/// The host outlives the engine; implementations are expected to be cheap,
/// non-blocking views onto host-owned state. Per-slot getters return `None`
/// for slots the host no longer knows about, which the engine treats as
/// log-and-drop.
pub trait Host {
    /// Snapshot of the currently active subscriptions.
    fn active_subscriptions(&self) -> Vec<Subscription, MAX_SLOTS>;
    /// The user-selected default data subscription.
    fn default_data_sub_id(&self) -> Option<SubId>;
    /// The slot currently carrying mobile data.
    fn preferred_data_slot(&self) -> Option<SlotId>;
    /// The subscription most recently selected by this engine, if that
    /// selection is still in effect.
    fn auto_selected_data_sub_id(&self) -> Option<SubId>;
    fn active_modem_count(&self) -> u8;

    fn registration_state(&self, slot: SlotId) -> Option<RegState>;
    fn display_info(&self, slot: SlotId) -> Option<DisplayInfo>;
    fn signal_strength(&self, slot: SlotId) -> Option<SignalStrength>;
    fn data_roaming_enabled(&self, slot: SlotId) -> bool;
    fn user_data_enabled(&self, slot: SlotId) -> bool;
    /// Whether policy (thermal, carrier, ...) currently permits data on the
    /// slot.
    fn data_allowed(&self, slot: SlotId) -> bool;
    /// Maps a display-info/signal pair to a preference score. Larger is
    /// better.
    fn auto_switch_score(&self, display_info: DisplayInfo, signal: SignalStrength) -> u32;

    /// Start delivering per-slot events for `slot`.
    fn register_slot_events(&self, slot: SlotId);
    /// Stop delivering per-slot events for `slot`. Matched one-to-one with
    /// [`register_slot_events`](Host::register_slot_events).
    fn unregister_slot_events(&self, slot: SlotId);
}

impl<T: Host> Host for &T {
    fn active_subscriptions(&self) -> Vec<Subscription, MAX_SLOTS> {
        (*self).active_subscriptions()
    }

    fn default_data_sub_id(&self) -> Option<SubId> {
        (*self).default_data_sub_id()
    }

    fn preferred_data_slot(&self) -> Option<SlotId> {
        (*self).preferred_data_slot()
    }

    fn auto_selected_data_sub_id(&self) -> Option<SubId> {
        (*self).auto_selected_data_sub_id()
    }

    fn active_modem_count(&self) -> u8 {
        (*self).active_modem_count()
    }

    fn registration_state(&self, slot: SlotId) -> Option<RegState> {
        (*self).registration_state(slot)
    }

    fn display_info(&self, slot: SlotId) -> Option<DisplayInfo> {
        (*self).display_info(slot)
    }

    fn signal_strength(&self, slot: SlotId) -> Option<SignalStrength> {
        (*self).signal_strength(slot)
    }

    fn data_roaming_enabled(&self, slot: SlotId) -> bool {
        (*self).data_roaming_enabled(slot)
    }

    fn user_data_enabled(&self, slot: SlotId) -> bool {
        (*self).user_data_enabled(slot)
    }

    fn data_allowed(&self, slot: SlotId) -> bool {
        (*self).data_allowed(slot)
    }

    fn auto_switch_score(&self, display_info: DisplayInfo, signal: SignalStrength) -> u32 {
        (*self).auto_switch_score(display_info, signal)
    }

    fn register_slot_events(&self, slot: SlotId) {
        (*self).register_slot_events(slot)
    }

    fn unregister_slot_events(&self, slot: SlotId) {
        (*self).unregister_slot_events(slot)
    }
}

/// Requests the engine makes of the phone switcher. These are the only ways
/// the engine ever asks for mobile data to move.
pub trait Switcher {
    /// Conditions were stable for the dwell window; switch to `target` if
    /// the switcher agrees, optionally ping-testing first.
    fn on_require_validation(&mut self, target: SwitchTarget, needs_validation: bool);
    /// Switch now; no dwell, no validation.
    fn on_require_immediate_switch(&mut self, target: SwitchTarget, reason: EvaluationReason);
    /// Drop any validation currently in flight on the engine's behalf.
    fn on_cancel_pending_validation(&mut self);
}

/// Side-effect sink for the one-time auto switch notification.
pub trait Notifier {
    fn show_switch_notification(&mut self, sub_id: SubId);
    fn cancel_switch_notification(&mut self);
}

//! Shared fakes for the engine tests: a scriptable host and recording
//! switcher/notifier sinks.

use core::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use crate::host::{Host, Notifier, Switcher};
use crate::types::{
    DisplayInfo, EvaluationReason, RegState, SignalStrength, SlotId, SubId, Subscription,
    SwitchTarget, MAX_SLOTS,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Simulated per-slot host state.
#[derive(Debug, Clone)]
pub struct SlotSim {
    pub reg_state: RegState,
    pub display_info: DisplayInfo,
    pub signal_strength: SignalStrength,
    pub data_roaming_enabled: bool,
    pub user_data_enabled: bool,
    pub data_allowed: bool,
}

impl SlotSim {
    /// A home-registered slot whose score is `score`. The mock score
    /// function adds the display info value to the raw signal contents.
    pub fn home(score: u32) -> Self {
        Self {
            reg_state: RegState::Home,
            display_info: DisplayInfo(0),
            signal_strength: SignalStrength::new(score as u8, score),
            data_roaming_enabled: false,
            user_data_enabled: true,
            data_allowed: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct HostState {
    pub subscriptions: Vec<Subscription>,
    pub default_data_sub: Option<SubId>,
    pub preferred_slot: Option<SlotId>,
    pub auto_selected_sub: Option<SubId>,
    pub modem_count: u8,
    pub slots: Vec<SlotSim>,
    /// `(slot, registered)` log of listener lifecycle calls.
    pub listeners: Vec<(SlotId, bool)>,
}

pub struct MockHost {
    pub state: RefCell<HostState>,
}

impl MockHost {
    /// Two visible home subscriptions, slot 0 default and preferred, equal
    /// scores of 3 on both slots.
    pub fn dual_sim() -> Self {
        Self {
            state: RefCell::new(HostState {
                subscriptions: vec![
                    Subscription {
                        sub_id: SubId(10),
                        slot: SlotId(0),
                        visible: true,
                        opportunistic: false,
                    },
                    Subscription {
                        sub_id: SubId(20),
                        slot: SlotId(1),
                        visible: true,
                        opportunistic: false,
                    },
                ],
                default_data_sub: Some(SubId(10)),
                preferred_slot: Some(SlotId(0)),
                auto_selected_sub: None,
                modem_count: 2,
                slots: vec![SlotSim::home(3), SlotSim::home(3)],
                listeners: Vec::new(),
            }),
        }
    }

    /// Like [`dual_sim`](MockHost::dual_sim), but mobile data currently
    /// runs on the backup slot 1, chosen by the engine.
    pub fn dual_sim_on_backup() -> Self {
        let host = Self::dual_sim();
        {
            let mut state = host.state.borrow_mut();
            state.preferred_slot = Some(SlotId(1));
            state.auto_selected_sub = Some(SubId(20));
        }
        host
    }
}

impl Host for MockHost {
    fn active_subscriptions(&self) -> heapless::Vec<Subscription, MAX_SLOTS> {
        let mut subscriptions = heapless::Vec::new();
        for sub in &self.state.borrow().subscriptions {
            subscriptions.push(*sub).ok();
        }
        subscriptions
    }

    fn default_data_sub_id(&self) -> Option<SubId> {
        self.state.borrow().default_data_sub
    }

    fn preferred_data_slot(&self) -> Option<SlotId> {
        self.state.borrow().preferred_slot
    }

    fn auto_selected_data_sub_id(&self) -> Option<SubId> {
        self.state.borrow().auto_selected_sub
    }

    fn active_modem_count(&self) -> u8 {
        self.state.borrow().modem_count
    }

    fn registration_state(&self, slot: SlotId) -> Option<RegState> {
        self.state.borrow().slots.get(slot.index()).map(|s| s.reg_state)
    }

    fn display_info(&self, slot: SlotId) -> Option<DisplayInfo> {
        self.state.borrow().slots.get(slot.index()).map(|s| s.display_info)
    }

    fn signal_strength(&self, slot: SlotId) -> Option<SignalStrength> {
        self.state
            .borrow()
            .slots
            .get(slot.index())
            .map(|s| s.signal_strength)
    }

    fn data_roaming_enabled(&self, slot: SlotId) -> bool {
        self.state
            .borrow()
            .slots
            .get(slot.index())
            .map_or(false, |s| s.data_roaming_enabled)
    }

    fn user_data_enabled(&self, slot: SlotId) -> bool {
        self.state
            .borrow()
            .slots
            .get(slot.index())
            .map_or(false, |s| s.user_data_enabled)
    }

    fn data_allowed(&self, slot: SlotId) -> bool {
        self.state
            .borrow()
            .slots
            .get(slot.index())
            .map_or(false, |s| s.data_allowed)
    }

    fn auto_switch_score(&self, display_info: DisplayInfo, signal: SignalStrength) -> u32 {
        display_info.0 + signal.raw()
    }

    fn register_slot_events(&self, slot: SlotId) {
        self.state.borrow_mut().listeners.push((slot, true));
    }

    fn unregister_slot_events(&self, slot: SlotId) {
        self.state.borrow_mut().listeners.push((slot, false));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitcherCall {
    RequireValidation(SwitchTarget, bool),
    ImmediateSwitch(SwitchTarget, EvaluationReason),
    CancelPendingValidation,
}

#[derive(Clone, Default)]
pub struct MockSwitcher {
    pub calls: Rc<RefCell<Vec<SwitcherCall>>>,
}

impl MockSwitcher {
    pub fn take_calls(&self) -> Vec<SwitcherCall> {
        core::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl Switcher for MockSwitcher {
    fn on_require_validation(&mut self, target: SwitchTarget, needs_validation: bool) {
        self.calls
            .borrow_mut()
            .push(SwitcherCall::RequireValidation(target, needs_validation));
    }

    fn on_require_immediate_switch(&mut self, target: SwitchTarget, reason: EvaluationReason) {
        self.calls
            .borrow_mut()
            .push(SwitcherCall::ImmediateSwitch(target, reason));
    }

    fn on_cancel_pending_validation(&mut self) {
        self.calls
            .borrow_mut()
            .push(SwitcherCall::CancelPendingValidation);
    }
}

#[derive(Clone, Default)]
pub struct MockNotifier {
    pub shown: Rc<RefCell<Vec<SubId>>>,
    pub cancelled: Rc<RefCell<usize>>,
}

impl Notifier for MockNotifier {
    fn show_switch_notification(&mut self, sub_id: SubId) {
        self.shown.borrow_mut().push(sub_id);
    }

    fn cancel_switch_notification(&mut self) {
        *self.cancelled.borrow_mut() += 1;
    }
}

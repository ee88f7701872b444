use core::cmp::Ordering;
use core::fmt;

use embassy_time::Instant;
use heapless::Vec;

use crate::config::Config;
use crate::events::Event;
use crate::host::{Host, Notifier, Switcher};
use crate::policy::{retry_backoff, UsableState};
use crate::tracker::PhoneSignalStatus;
use crate::types::{
    EvaluationReason, NetworkCapabilities, RegState, SlotId, SubId, SwitchTarget, MAX_SLOTS,
};

/// An armed stability one-shot. Identity is the `(target, needs_validation)`
/// pair; the deadline is not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StabilityCheck {
    target: SwitchTarget,
    needs_validation: bool,
    deadline: Instant,
}

/// Decision engine recommending which slot should carry the default mobile
/// data on a multi-SIM device.
///
/// The engine only classifies and requests: actual switching, ping
/// validation and notification presentation live behind the [`Switcher`] and
/// [`Notifier`] capabilities. All methods run on the host's serial event
/// loop; see [`Runner`](crate::runner::Runner).
pub struct AutoDataSwitchController<H: Host, S: Switcher, N: Notifier> {
    host: H,
    switcher: S,
    notifier: N,
    config: Config,

    phones: Vec<PhoneSignalStatus, MAX_SLOTS>,
    default_on_non_cellular: bool,
    displayed_first_notification: bool,
    /// The slot a stability timer, if any, is currently armed for.
    selected_target: Option<SlotId>,
    validation_failure_count: u8,
    stability: Option<StabilityCheck>,
    retry_at: Option<Instant>,
    pending_evaluation: Option<EvaluationReason>,
}

impl<H: Host, S: Switcher, N: Notifier> AutoDataSwitchController<H, S, N> {
    pub fn new(host: H, switcher: S, notifier: N, config: Config) -> Self {
        let mut phones: Vec<PhoneSignalStatus, MAX_SLOTS> = Vec::new();
        let count = (host.active_modem_count() as usize).min(MAX_SLOTS);
        for index in 0..count {
            let slot = SlotId(index as u8);
            let mut status = PhoneSignalStatus::new(slot, &host);
            // Listen on every slot until the first subscription change
            // prunes the set down to the active ones.
            host.register_slot_events(slot);
            status.set_listening(true);
            if phones.push(status).is_err() {
                break;
            }
        }

        Self {
            host,
            switcher,
            notifier,
            config,
            phones,
            default_on_non_cellular: false,
            displayed_first_notification: false,
            selected_target: None,
            validation_failure_count: 0,
            stability: None,
            retry_at: None,
            pending_evaluation: None,
        }
    }

    /// Routes one ingress event. Runs to completion without blocking.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::ServiceStateChanged(slot) => self.on_service_state_changed(slot),
            Event::DisplayInfoChanged(slot) => self.on_display_info_changed(slot),
            Event::SignalStrengthChanged(slot) => self.on_signal_strength_changed(slot),
            Event::DefaultNetworkChanged(capabilities) => {
                self.on_default_network_changed(capabilities)
            }
            Event::DataSettingsChanged => {
                self.request_evaluation(EvaluationReason::DataSettingsChanged)
            }
            Event::SimLoaded => self.request_evaluation(EvaluationReason::SimLoaded),
            Event::VoiceCallEnded => self.request_evaluation(EvaluationReason::VoiceCallEnded),
            Event::SubscriptionsChanged => self.on_subscriptions_changed(),
            Event::MultiSimConfigChanged(count) => self.on_multi_sim_config_changed(count),
            Event::ValidationFailed => self.on_validation_failed(),
        }
    }

    /// Runs the coalesced evaluation pass, if one is pending. Returns
    /// whether an evaluation ran.
    pub fn flush_evaluation(&mut self) -> bool {
        match self.pending_evaluation.take() {
            Some(reason) => {
                self.evaluate(reason);
                true
            }
            None => false,
        }
    }

    pub(crate) fn stability_deadline(&self) -> Option<Instant> {
        self.stability.map(|check| check.deadline)
    }

    pub(crate) fn retry_deadline(&self) -> Option<Instant> {
        self.retry_at
    }

    fn on_service_state_changed(&mut self, slot: SlotId) {
        let Some(reg_state) = self.host.registration_state(slot) else {
            warn!("Service state change for unknown slot {:?}, dropped", slot);
            return;
        };
        let Some(phone) = self.phones.get_mut(slot.index()) else {
            warn!("Service state change for untracked slot {:?}, dropped", slot);
            return;
        };
        if phone.set_reg_state(reg_state) {
            debug!("Slot {:?} registration is now {:?}", slot, reg_state);
            self.request_evaluation(EvaluationReason::RegistrationChanged);
        }
    }

    fn on_display_info_changed(&mut self, slot: SlotId) {
        let Some(display_info) = self.host.display_info(slot) else {
            warn!("Display info change for unknown slot {:?}, dropped", slot);
            return;
        };
        let Some(phone) = self.phones.get_mut(slot.index()) else {
            warn!("Display info change for untracked slot {:?}, dropped", slot);
            return;
        };
        if phone.set_display_info(display_info) {
            self.request_evaluation_if_candidate_changed(EvaluationReason::DisplayInfoChanged);
        }
    }

    fn on_signal_strength_changed(&mut self, slot: SlotId) {
        let Some(signal) = self.host.signal_strength(slot) else {
            warn!("Signal strength change for unknown slot {:?}, dropped", slot);
            return;
        };
        let Some(phone) = self.phones.get_mut(slot.index()) else {
            warn!("Signal strength change for untracked slot {:?}, dropped", slot);
            return;
        };
        if phone.set_signal_strength(signal) {
            self.request_evaluation_if_candidate_changed(EvaluationReason::SignalStrengthChanged);
        }
    }

    fn on_default_network_changed(&mut self, capabilities: Option<NetworkCapabilities>) {
        match capabilities {
            Some(capabilities) => {
                self.default_on_non_cellular = !capabilities.has_cellular();
                if self.default_on_non_cellular && self.host.auto_selected_data_sub_id().is_some() {
                    // The backup we picked no longer carries the default
                    // network; consider reverting.
                    self.request_evaluation(EvaluationReason::DefaultNetworkChanged);
                }
            }
            None => {
                self.default_on_non_cellular = false;
                self.request_evaluation(EvaluationReason::DefaultNetworkChanged);
            }
        }
    }

    fn on_subscriptions_changed(&mut self) {
        self.update_slot_listeners();
        self.request_evaluation(EvaluationReason::SubscriptionsChanged);
    }

    /// Matches per-slot event subscriptions to the set of active visible
    /// slots. With fewer than two visible subscriptions there is nothing to
    /// switch between, so everything is unsubscribed.
    fn update_slot_listeners(&mut self) {
        let subscriptions = self.host.active_subscriptions();
        let mut active: Vec<SlotId, MAX_SLOTS> = Vec::new();
        if subscriptions.iter().filter(|sub| sub.visible).count() >= 2 {
            for sub in subscriptions.iter().filter(|sub| sub.visible) {
                active.push(sub.slot).ok();
            }
        }

        for index in 0..self.phones.len() {
            let slot = self.phones[index].slot();
            let should_listen = active.contains(&slot);
            if should_listen && !self.phones[index].listening() {
                self.host.register_slot_events(slot);
                self.phones[index].set_listening(true);
            } else if !should_listen && self.phones[index].listening() {
                self.host.unregister_slot_events(slot);
                self.phones[index].set_listening(false);
            }
        }
    }

    fn on_multi_sim_config_changed(&mut self, active_modem_count: u8) {
        let count = (active_modem_count as usize).min(MAX_SLOTS);
        debug!("Active modem count is now {}", active_modem_count);

        while self.phones.len() > count {
            if let Some(phone) = self.phones.pop() {
                if phone.listening() {
                    self.host.unregister_slot_events(phone.slot());
                }
            }
        }
        if self.selected_target.map_or(false, |slot| slot.index() >= count) {
            // The armed decision pointed at a slot that no longer exists.
            self.cancel_any_pending_switch();
        }
        while self.phones.len() < count {
            let slot = SlotId(self.phones.len() as u8);
            let mut status = PhoneSignalStatus::new(slot, &self.host);
            self.host.register_slot_events(slot);
            status.set_listening(true);
            if self.phones.push(status).is_err() {
                break;
            }
        }

        self.request_evaluation(EvaluationReason::MultiSimConfigChanged);
    }

    /// Requests an evaluation pass. Requests coalesce: the first pending
    /// reason wins, later triggers fold into the same pass.
    fn request_evaluation(&mut self, reason: EvaluationReason) {
        if self.pending_evaluation.is_none() {
            self.pending_evaluation = Some(reason);
        }
    }

    /// Cheap gate for noisy display/signal updates: only evaluate when the
    /// best score-based candidate is no longer the slot a timer is armed
    /// for.
    fn request_evaluation_if_candidate_changed(&mut self, reason: EvaluationReason) {
        if self.higher_score_candidate() != self.selected_target {
            self.request_evaluation(reason);
        }
    }

    fn higher_score_candidate(&self) -> Option<SlotId> {
        if !self.config.score_switch_enabled() {
            return None;
        }
        let preferred = self.host.preferred_data_slot()?;
        let current = self.phones.get(preferred.index())?;
        let current_score = current.score(&self.host) as i64;
        let tolerance = self.config.score_tolerance as i64;
        self.phones
            .iter()
            .filter(|phone| phone.slot() != preferred)
            .find(|phone| phone.score(&self.host) as i64 - current_score > tolerance)
            .map(|phone| phone.slot())
    }

    pub(crate) fn evaluate(&mut self, reason: EvaluationReason) {
        if self.config.stability_dwell().is_none() {
            // Feature disabled; never emit anything.
            return;
        }

        let subscriptions = self.host.active_subscriptions();
        if subscriptions.iter().filter(|sub| sub.visible).count() < 2 {
            trace!("Fewer than two visible subscriptions, nothing to switch between");
            return;
        }
        let Some(default_slot) = self
            .host
            .default_data_sub_id()
            .and_then(|sub_id| subscriptions.iter().find(|sub| sub.sub_id == sub_id))
            .map(|sub| sub.slot)
        else {
            info!("Default data subscription has no slot, aborting evaluation");
            return;
        };
        let Some(preferred_slot) = self.host.preferred_data_slot() else {
            trace!("No slot currently carries data, aborting evaluation");
            return;
        };

        debug!("Evaluating auto data switch ({:?})", reason);

        if preferred_slot == default_slot {
            self.evaluate_on_default(default_slot);
        } else {
            self.evaluate_on_backup(default_slot, preferred_slot);
        }
    }

    /// Currently on the user-selected default; look for a sufficiently
    /// better backup slot.
    fn evaluate_on_default(&mut self, default_slot: SlotId) {
        match self.switch_candidate(default_slot) {
            Some(candidate) => {
                self.arm_stability_check(
                    candidate,
                    SwitchTarget::Slot(candidate),
                    self.config.require_ping,
                );
            }
            None => self.cancel_any_pending_switch(),
        }
    }

    fn switch_candidate(&self, default_slot: SlotId) -> Option<SlotId> {
        if !self.host.user_data_enabled(default_slot) || self.default_on_non_cellular {
            return None;
        }
        let default_phone = self.phones.get(default_slot.index())?;
        let score_switch = self.config.score_switch_enabled();
        let default_usable = default_phone.usable_state(&self.host);

        // Without score-based switching a default already in good standing
        // can never be beaten; skip the scan.
        if self.config.allow_roaming_switch {
            if !score_switch && default_usable == UsableState::Home {
                return None;
            }
        } else if !score_switch && default_phone.reg_state().in_service() {
            return None;
        }

        let default_score = default_phone.score(&self.host) as i64;
        let tolerance = self.config.score_tolerance as i64;

        self.phones
            .iter()
            .filter(|candidate| candidate.slot() != default_slot)
            .find(|candidate| {
                let sufficiently_better = if self.config.allow_roaming_switch {
                    let usable = candidate.usable_state(&self.host);
                    if usable > default_usable {
                        true
                    } else if score_switch
                        && usable == default_usable
                        && usable != UsableState::NotUsable
                    {
                        candidate.score(&self.host) as i64 - default_score > tolerance
                    } else {
                        false
                    }
                } else if candidate.usable_state(&self.host) != UsableState::Home {
                    false
                } else if default_phone.reg_state().in_service() {
                    score_switch && candidate.score(&self.host) as i64 - default_score > tolerance
                } else {
                    true
                };
                sufficiently_better && self.host.data_allowed(candidate.slot())
            })
            .map(|candidate| candidate.slot())
    }

    /// Currently on a backup slot; decide whether (and how urgently) to
    /// return to the default.
    fn evaluate_on_backup(&mut self, default_slot: SlotId, backup_slot: SlotId) {
        if !self.host.user_data_enabled(default_slot) || !self.host.data_allowed(backup_slot) {
            // The user or policy pulled the rug out; go home without dwell.
            self.clear_pending_switch();
            info!(
                "Backup slot {:?} no longer permitted, switching back immediately",
                backup_slot
            );
            self.switcher.on_require_immediate_switch(
                SwitchTarget::Default,
                EvaluationReason::DataSettingsChanged,
            );
            return;
        }

        let Some(backup) = self.phones.get(backup_slot.index()) else {
            warn!("No tracker for backup slot {:?}, aborting evaluation", backup_slot);
            return;
        };
        let Some(default_phone) = self.phones.get(default_slot.index()) else {
            warn!("No tracker for default slot {:?}, aborting evaluation", default_slot);
            return;
        };

        let score_switch = self.config.score_switch_enabled();
        let tolerance = self.config.score_tolerance as i64;
        let default_recovered = || {
            default_phone.score(&self.host) as i64 - backup.score(&self.host) as i64 > tolerance
        };

        // `Some(needs_validation)` means go back to the default.
        let decision = if self.default_on_non_cellular {
            // The default network moved off cellular entirely; the backup
            // no longer buys anything.
            Some(false)
        } else if self.config.allow_roaming_switch {
            let backup_usable = backup.usable_state(&self.host);
            match backup_usable.cmp(&default_phone.usable_state(&self.host)) {
                Ordering::Less => {
                    Some(backup_usable != UsableState::NotUsable && self.config.require_ping)
                }
                Ordering::Equal if backup_usable == UsableState::NotUsable => Some(false),
                Ordering::Equal if score_switch => {
                    default_recovered().then_some(self.config.require_ping)
                }
                Ordering::Equal => Some(self.config.require_ping),
                Ordering::Greater => None,
            }
        } else if backup.reg_state() != RegState::Home {
            Some(false)
        } else if score_switch {
            default_recovered().then_some(self.config.require_ping)
        } else if default_phone.reg_state().in_service() {
            Some(self.config.require_ping)
        } else {
            None
        };

        match decision {
            Some(needs_validation) => {
                self.arm_stability_check(default_slot, SwitchTarget::Default, needs_validation)
            }
            None => self.cancel_any_pending_switch(),
        }
    }

    /// Arms the stability one-shot for `target`. Re-requesting the same
    /// `(target, needs_validation)` identity keeps the earlier deadline; a
    /// different identity cancels and re-arms.
    fn arm_stability_check(
        &mut self,
        selected: SlotId,
        target: SwitchTarget,
        needs_validation: bool,
    ) {
        let Some(dwell) = self.config.stability_dwell() else {
            return;
        };
        self.selected_target = Some(selected);
        if let Some(check) = &self.stability {
            if check.target == target && check.needs_validation == needs_validation {
                return;
            }
        }
        debug!("Arming stability check for {:?}, validate {}", target, needs_validation);
        self.stability = Some(StabilityCheck {
            target,
            needs_validation,
            deadline: Instant::now() + dwell,
        });
    }

    /// Invoked when the stability deadline passes with the decision still
    /// standing.
    pub(crate) fn on_stability_check_passed(&mut self) {
        let Some(check) = self.stability.take() else {
            return;
        };
        self.selected_target = None;
        info!(
            "Conditions held, requesting switch to {:?} (validate {})",
            check.target, check.needs_validation
        );
        self.switcher
            .on_require_validation(check.target, check.needs_validation);
    }

    /// Drops all local pending-switch state without telling the switcher.
    fn clear_pending_switch(&mut self) {
        self.stability = None;
        self.retry_at = None;
        self.selected_target = None;
        self.validation_failure_count = 0;
    }

    /// Withdraws the current switch opportunity, including any validation
    /// the switcher may have in flight on our behalf.
    fn cancel_any_pending_switch(&mut self) {
        self.clear_pending_switch();
        self.switcher.on_cancel_pending_validation();
    }

    fn on_validation_failed(&mut self) {
        let Some(dwell) = self.config.stability_dwell() else {
            return;
        };
        if self.validation_failure_count < self.config.max_validation_retries {
            let delay = retry_backoff(dwell, self.validation_failure_count);
            debug!(
                "Switch validation failed ({} so far), retrying in {:?}",
                self.validation_failure_count, delay
            );
            self.retry_at = Some(Instant::now() + delay);
            self.validation_failure_count += 1;
        } else {
            warn!(
                "Switch validation failed {} consecutive times, giving up",
                self.validation_failure_count
            );
            self.validation_failure_count = 0;
            self.retry_at = None;
        }
    }

    /// Invoked when the retry backoff elapses. Retries bypass coalescing.
    pub(crate) fn on_retry_elapsed(&mut self) {
        self.retry_at = None;
        self.evaluate(EvaluationReason::RetryValidation);
    }

    /// Surfaces the one-time "switched mobile data" notification after the
    /// switcher reports a completed switch. Side effect only; this never
    /// feeds back into the engine.
    pub fn display_switch_notification(&mut self, sub_id: SubId, auto_switched: bool) {
        if self.displayed_first_notification {
            self.notifier.cancel_switch_notification();
            return;
        }
        if !auto_switched {
            return;
        }
        let subscriptions = self.host.active_subscriptions();
        let Some(subscription) = subscriptions.iter().find(|sub| sub.sub_id == sub_id) else {
            return;
        };
        if subscription.opportunistic {
            return;
        }
        self.displayed_first_notification = true;
        self.notifier.show_switch_notification(sub_id);
    }

    /// Writes an indented human-readable snapshot, for bug reports.
    pub fn dump<W: fmt::Write>(&self, w: &mut W) -> fmt::Result {
        writeln!(w, "AutoDataSwitchController:")?;
        writeln!(w, "  config: {:?}", self.config)?;
        writeln!(w, "  default_on_non_cellular: {}", self.default_on_non_cellular)?;
        writeln!(w, "  selected_target: {:?}", self.selected_target)?;
        writeln!(w, "  validation_failures: {}", self.validation_failure_count)?;
        writeln!(w, "  stability: {:?}", self.stability)?;
        writeln!(w, "  retry_at: {:?}", self.retry_at)?;
        for phone in &self.phones {
            writeln!(w, "  {:?}", phone)?;
        }
        Ok(())
    }
}

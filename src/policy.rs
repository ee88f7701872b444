use embassy_time::Duration;

use crate::types::RegState;

/// Qualitative ranking of a slot's service for carrying mobile data.
///
/// Home service is assumed unmetered and always preferred; roaming is usable
/// only when the user has enabled data roaming on the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i8)]
pub enum UsableState {
    NotUsable = -1,
    RoamingEnabled = 0,
    Home = 1,
}

pub fn usable_state(reg_state: RegState, data_roaming_enabled: bool) -> UsableState {
    match reg_state {
        RegState::Home => UsableState::Home,
        RegState::Roaming if data_roaming_enabled => UsableState::RoamingEnabled,
        _ => UsableState::NotUsable,
    }
}

/// Partition of registration states that matters for re-evaluation;
/// transitions within one class never change a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServiceClass {
    NotInService,
    Home,
    RoamingInService,
}

pub(crate) fn service_class(reg_state: RegState) -> ServiceClass {
    match reg_state {
        RegState::Home => ServiceClass::Home,
        RegState::Roaming => ServiceClass::RoamingInService,
        RegState::NotRegistered | RegState::Other => ServiceClass::NotInService,
    }
}

/// Ceiling for the exponential validation retry backoff.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60 * 60);

/// Delay before the next validation retry: the dwell window doubled per
/// consecutive failure, saturating at [`MAX_RETRY_BACKOFF`].
pub(crate) fn retry_backoff(dwell: Duration, failures: u8) -> Duration {
    let factor = 1u64.checked_shl(failures as u32).unwrap_or(u64::MAX);
    let millis = dwell.as_millis().saturating_mul(factor);
    Duration::from_millis(millis.min(MAX_RETRY_BACKOFF.as_millis()))
}

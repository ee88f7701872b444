use serde::{Deserialize, Serialize};

/// Maximum number of physical modem slots the engine tracks.
pub const MAX_SLOTS: usize = 4;

/// Physical modem/SIM slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(pub u8);

impl SlotId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Subscription identifier, as handed out by the host's subscription service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubId(pub u32);

/// Network registration state of a single slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegState {
    #[default]
    NotRegistered,
    Home,
    Roaming,
    Other,
}

impl RegState {
    /// Whether the slot is attached to a network at all.
    pub fn in_service(self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }
}

/// Opaque network-type override descriptor (e.g. NR display variants).
///
/// Compared only for equality; the contents are interpreted by the host's
/// score function alone.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayInfo(pub u32);

/// Signal strength snapshot of a slot.
///
/// The integer level drives change detection; the full value is handed to
/// the host's score function.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalStrength {
    level: u8,
    raw: u32,
}

impl SignalStrength {
    pub const fn new(level: u8, raw: u32) -> Self {
        Self { level, raw }
    }

    pub const fn level(self) -> u8 {
        self.level
    }

    pub const fn raw(self) -> u32 {
        self.raw
    }
}

/// Transport capabilities of the system default network.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkCapabilities {
    transports: u8,
}

impl NetworkCapabilities {
    pub const TRANSPORT_CELLULAR: u8 = 1 << 0;
    pub const TRANSPORT_WIFI: u8 = 1 << 1;
    pub const TRANSPORT_ETHERNET: u8 = 1 << 2;

    pub const fn new(transports: u8) -> Self {
        Self { transports }
    }

    pub const fn has_cellular(self) -> bool {
        self.transports & Self::TRANSPORT_CELLULAR != 0
    }
}

/// One active subscription as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub sub_id: SubId,
    pub slot: SlotId,
    /// Whether the subscription is visible to the user.
    pub visible: bool,
    /// Opportunistic subscriptions never surface notifications.
    pub opportunistic: bool,
}

/// Where the switcher is asked to move mobile data.
///
/// `Default` instructs the switcher to revert to the user-selected
/// default-data slot rather than selecting a slot explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SwitchTarget {
    Slot(SlotId),
    Default,
}

/// Why an evaluation pass (or an immediate switch) was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EvaluationReason {
    RegistrationChanged,
    SignalStrengthChanged,
    DisplayInfoChanged,
    DefaultNetworkChanged,
    DataSettingsChanged,
    SimLoaded,
    VoiceCallEnded,
    SubscriptionsChanged,
    MultiSimConfigChanged,
    RetryValidation,
}

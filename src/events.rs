use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};

use crate::types::{NetworkCapabilities, SlotId};

/// Depth of the ingress queue. Bursts beyond this are dropped with a
/// warning; the next evaluation observes current host state regardless.
pub const EVENT_QUEUE_DEPTH: usize = 16;

/// External events feeding the engine, dispatched in one place by the
/// serial run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Registration state of a slot may have changed.
    ServiceStateChanged(SlotId),
    DisplayInfoChanged(SlotId),
    SignalStrengthChanged(SlotId),
    /// The system default network changed capabilities (`Some`) or was lost
    /// (`None`).
    DefaultNetworkChanged(Option<NetworkCapabilities>),
    /// The user toggled mobile data or data roaming.
    DataSettingsChanged,
    SimLoaded,
    VoiceCallEnded,
    /// The set of active subscriptions changed.
    SubscriptionsChanged,
    /// The number of active modems changed.
    MultiSimConfigChanged(u8),
    /// The switcher could not validate the last requested switch.
    ValidationFailed,
}

/// Ingress queue feeding the engine. The sender side may be used from any
/// thread or interrupt context; everything downstream runs serially.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    pub fn sender(&self) -> EventSender<'_> {
        EventSender {
            channel: &self.channel,
        }
    }

    pub(crate) fn receiver(
        &self,
    ) -> Receiver<'_, CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH> {
        self.channel.receiver()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap, copyable handle for posting events into the queue.
#[derive(Clone, Copy)]
pub struct EventSender<'a> {
    channel: &'a Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH>,
}

impl EventSender<'_> {
    /// Posts an event without blocking. A full queue drops the event.
    pub fn send(&self, event: Event) {
        if self.channel.try_send(event).is_err() {
            warn!("Event queue full, dropping {:?}", event);
        }
    }
}

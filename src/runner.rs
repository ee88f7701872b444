use core::future::pending;

use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_time::{Instant, Timer};

use crate::config::Config;
use crate::controller::AutoDataSwitchController;
use crate::events::{Event, EventQueue, EVENT_QUEUE_DEPTH};
use crate::host::{Host, Notifier, Switcher};

/// Drives the engine from the ingress queue and its timers.
///
/// You must call [`run()`](Runner::run) in a background task for switch
/// decisions to be made.
pub struct Runner<'a, H: Host, S: Switcher, N: Notifier> {
    controller: AutoDataSwitchController<H, S, N>,
    events: Receiver<'a, CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH>,
}

impl<'a, H: Host, S: Switcher, N: Notifier> Runner<'a, H, S, N> {
    pub fn new(queue: &'a EventQueue, host: H, switcher: S, notifier: N, config: Config) -> Self {
        Self {
            controller: AutoDataSwitchController::new(host, switcher, notifier, config),
            events: queue.receiver(),
        }
    }

    pub fn controller_mut(&mut self) -> &mut AutoDataSwitchController<H, S, N> {
        &mut self.controller
    }

    pub async fn run(mut self) -> ! {
        loop {
            // Service everything already queued, then run the single
            // coalesced evaluation pass for the burst.
            while let Ok(event) = self.events.try_receive() {
                self.controller.handle_event(event);
            }
            self.controller.flush_evaluation();

            let stability = self.controller.stability_deadline();
            let retry = self.controller.retry_deadline();

            match select3(
                self.events.receive(),
                at_or_never(stability),
                at_or_never(retry),
            )
            .await
            {
                Either3::First(event) => self.controller.handle_event(event),
                Either3::Second(()) => self.controller.on_stability_check_passed(),
                Either3::Third(()) => self.controller.on_retry_elapsed(),
            }
        }
    }
}

async fn at_or_never(deadline: Option<Instant>) {
    match deadline {
        Some(at) => Timer::at(at).await,
        None => pending().await,
    }
}

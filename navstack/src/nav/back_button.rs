use std::sync::atomic::{AtomicBool, Ordering};

use crate::nav::{HardwareBackArgs, NavEvent, Navigator, Topic};

/// Admits one flight at a time; later attempts are turned away, not queued
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

/// Releases the flight on drop
#[derive(Debug)]
pub struct FlightGuard<'a> {
    flight: &'a SingleFlight,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Option<FlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { flight: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.busy.store(false, Ordering::Release);
    }
}

/// How a hardware back press was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareBackOutcome {
    /// Another press is still being handled
    AlreadyRunning,
    /// A listener cancelled the default handling
    Cancelled,
    /// Nothing to go back to; the app was asked to close
    AppClosed,
    /// Nothing to go back to and closing is disabled
    NothingToDo,
    PopupHidden,
    WentBack,
    /// Handling failed; the error was logged and surfaced
    Failed,
}

impl Navigator {
    /// Handle the physical back button.
    ///
    /// Order: listeners (may cancel), then the topmost popup, then the back
    /// stack, then the platform fallback. Never fails; errors are reported.
    pub async fn on_hardware_back(&self) -> HardwareBackOutcome {
        let Some(_flight) = self.inner.back_flight.try_begin() else {
            log::debug!("Hardware back ignored: already handling one");
            return HardwareBackOutcome::AlreadyRunning;
        };

        if self.inner.events.has_listeners(Topic::HardwareBack) {
            let event = NavEvent::HardwareBack(HardwareBackArgs::default());
            self.raise(&event);
            if let NavEvent::HardwareBack(args) = &event {
                if args.is_cancelled() {
                    log::info!("Hardware back cancelled by a listener");
                    return HardwareBackOutcome::Cancelled;
                }
            }
        }

        if !self.can_go_back() {
            if self.config().close_app_on_back {
                log::info!("👋 Nothing to go back to, closing app");
                self.inner.host.platform.close_app();
                return HardwareBackOutcome::AppClosed;
            }
            log::debug!("Nothing to go back to");
            return HardwareBackOutcome::NothingToDo;
        }

        let has_popup = !self.inner.popups.lock().stack.is_empty();
        let handled = if has_popup {
            self.hide_popup().await.map(|_| HardwareBackOutcome::PopupHidden)
        } else {
            self.back().await.map(|_| HardwareBackOutcome::WentBack)
        };

        handled.unwrap_or_else(|err| {
            self.report_failure(&err, "hardware back");
            HardwareBackOutcome::Failed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_flight_released_on_drop() {
        let flight = SingleFlight::new();

        let guard = flight.try_begin().unwrap();
        assert!(flight.is_busy());
        assert!(flight.try_begin().is_none());

        drop(guard);
        assert!(!flight.is_busy());
        assert!(flight.try_begin().is_some());
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-stream slider state shared by the output and input sliders.
//!
//! Maps the normalized slider position onto the raw volume range of the
//! attached endpoint, derives mute transitions, and decides the status icon.

use crate::audio::mixer::{MixerControl, MixerEndpoint};
use crate::audio::types::EndpointId;
use crate::message::SliderEvent;
use crate::slider::debounce::Debounce;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Status icon for a stream's volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeIcon {
    Muted,
    Low,
    Medium,
    High,
}

impl VolumeIcon {
    pub fn icon_name(self) -> &'static str {
        match self {
            Self::Muted => "audio-volume-muted-symbolic",
            Self::Low => "audio-volume-low-symbolic",
            Self::Medium => "audio-volume-medium-symbolic",
            Self::High => "audio-volume-high-symbolic",
        }
    }

    /// Bucket a non-muted volume into the three-step scale.
    pub fn for_volume(volume: u32, max_volume: u32) -> Self {
        if volume == 0 {
            return Self::Muted;
        }
        let n = (3.0 * volume as f64 / max_volume as f64).floor() + 1.0;
        if n < 2.0 {
            Self::Low
        } else if n >= 3.0 {
            Self::High
        } else {
            Self::Medium
        }
    }
}

/// Volume state of one slider and its attached endpoint.
pub struct StreamSliderState {
    control: Rc<dyn MixerControl>,
    /// The mixer client owns the endpoint; the slider only observes it.
    endpoint: Option<Weak<dyn MixerEndpoint>>,
    /// Endpoint whose notifications this slider follows.
    subscribed: Option<EndpointId>,
    value: f64,
    dragging: bool,
    /// Armed while a volume notification is pending.
    pending_notify: Debounce,
    amplification_allowed: bool,
    visible: bool,
    events: VecDeque<SliderEvent>,
}

impl StreamSliderState {
    pub fn new(control: Rc<dyn MixerControl>, notify_delay: Duration) -> Self {
        Self {
            control,
            endpoint: None,
            subscribed: None,
            value: 0.0,
            dragging: false,
            pending_notify: Debounce::new(notify_delay),
            amplification_allowed: false,
            visible: false,
            events: VecDeque::new(),
        }
    }

    pub fn control(&self) -> &dyn MixerControl {
        self.control.as_ref()
    }

    /// The attached endpoint, if it is still alive.
    pub fn endpoint(&self) -> Option<Rc<dyn MixerEndpoint>> {
        self.endpoint.as_ref().and_then(Weak::upgrade)
    }

    pub fn has_endpoint(&self) -> bool {
        self.endpoint().is_some()
    }

    pub fn is_attached_to(&self, id: EndpointId) -> bool {
        self.subscribed == Some(id)
    }

    /// Normalized slider position in `[0, 1]`.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn amplification_allowed(&self) -> bool {
        self.amplification_allowed
    }

    /// Allow or forbid volumes above the nominal maximum.
    pub fn set_amplification_allowed(&mut self, allowed: bool) {
        if self.amplification_allowed == allowed {
            return;
        }
        debug!("Amplified volume {}", if allowed { "allowed" } else { "disallowed" });
        self.amplification_allowed = allowed;
        if self.has_endpoint() {
            self.update_volume();
        }
    }

    /// Upper bound of the slider in raw volume units.
    pub fn max_volume(&self) -> u32 {
        if self.amplification_allowed {
            self.control.vol_max_amplified()
        } else {
            self.control.vol_max_norm()
        }
    }

    /// Drop the current endpoint and stop following its notifications.
    pub(crate) fn disconnect(&mut self) {
        if let Some(id) = self.subscribed.take() {
            debug!("Disconnecting from endpoint {}", id);
        }
        self.endpoint = None;
        self.pending_notify.cancel();
    }

    pub(crate) fn connect(&mut self, endpoint: &Rc<dyn MixerEndpoint>) {
        debug!("Connecting to endpoint {}", endpoint.id());
        self.subscribed = Some(endpoint.id());
        self.endpoint = Some(Rc::downgrade(endpoint));
    }

    /// Resynchronize the displayed value from the endpoint.
    pub(crate) fn update_volume(&mut self) {
        if let Some(endpoint) = self.endpoint() {
            self.value = if endpoint.is_muted() {
                0.0
            } else {
                (endpoint.volume() as f64 / self.max_volume() as f64).clamp(0.0, 1.0)
            };
        }
        self.emit(SliderEvent::StreamUpdated);
    }

    /// Apply a slider position chosen by the user.
    pub fn set_normalized_value(&mut self, value: f64) {
        self.set_normalized_value_at(value, Instant::now());
    }

    /// Apply a slider position, timing any notification from `now`.
    pub fn set_normalized_value_at(&mut self, value: f64, now: Instant) {
        if value.is_nan() {
            return;
        }
        self.value = value.clamp(0.0, 1.0);

        let Some(endpoint) = self.endpoint() else {
            return;
        };

        let volume = self.value * self.max_volume() as f64;
        let prev_muted = endpoint.is_muted();
        let prev_volume = endpoint.volume();

        if volume < 1.0 {
            endpoint.set_volume(0);
            if !prev_muted {
                endpoint.change_is_muted(true);
            }
        } else {
            endpoint.set_volume(volume as u32);
            if prev_muted {
                endpoint.change_is_muted(false);
            }
        }
        if let Err(e) = endpoint.push_volume() {
            warn!("Failed to push volume to endpoint {}: {}", endpoint.id(), e);
        }

        let volume_changed = endpoint.volume() != prev_volume;
        if volume_changed && !self.dragging && self.pending_notify.arm(now) {
            trace!("Volume notification armed for endpoint {}", endpoint.id());
        }
    }

    /// A continuous drag gesture started.
    pub fn begin_drag(&mut self) {
        self.dragging = true;
        self.pending_notify.cancel();
    }

    /// The drag gesture ended; announce the final value once.
    pub fn end_drag(&mut self) {
        if !self.dragging {
            return;
        }
        self.dragging = false;
        self.notify_volume_change();
    }

    /// Fire the pending notification if its deadline has passed.
    pub fn poll_timers(&mut self, now: Instant) {
        if self.pending_notify.fire_due(now) {
            self.notify_volume_change();
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_notify.deadline()
    }

    fn notify_volume_change(&mut self) {
        match self.current_level() {
            Some(level) => {
                debug!("Volume changed to {:.0}%", level);
                self.emit(SliderEvent::VolumeNotify { level });
            }
            None => trace!("Dropping volume notification for detached slider"),
        }
    }

    pub fn current_icon(&self) -> Option<VolumeIcon> {
        let endpoint = self.endpoint()?;
        if endpoint.is_muted() {
            return Some(VolumeIcon::Muted);
        }
        Some(VolumeIcon::for_volume(endpoint.volume(), self.max_volume()))
    }

    /// Volume as a percentage of the nominal (unamplified) maximum.
    pub fn current_level(&self) -> Option<f64> {
        let endpoint = self.endpoint()?;
        Some(100.0 * endpoint.volume() as f64 / self.control.vol_max_norm() as f64)
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.emit(SliderEvent::VisibilityChanged(visible));
        }
    }

    pub(crate) fn emit(&mut self, event: SliderEvent) {
        self.events.push_back(event);
    }

    /// Take all queued events.
    pub fn drain_events(&mut self) -> Vec<SliderEvent> {
        self.events.drain(..).collect()
    }
}

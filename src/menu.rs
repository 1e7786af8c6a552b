// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Volume menu: one output and one input slider over a shared mixer client.

use crate::audio::mixer::MixerControl;
use crate::audio::types::{EndpointKind, MixerEvent};
use crate::message::{MenuEvent, SliderEvent};
use crate::slider::{InputSlider, OutputSlider, VolumeIcon, VOLUME_NOTIFY_DELAY};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Construction options for [`VolumeMenuController`].
#[derive(Debug, Clone, Copy)]
pub struct MenuSettings {
    /// Let the output slider go past the nominal maximum.
    pub amplification_allowed: bool,
    /// Debounce window for volume notifications.
    pub notify_delay: Duration,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            amplification_allowed: false,
            notify_delay: VOLUME_NOTIFY_DELAY,
        }
    }
}

/// Aggregates the output and input sliders and derives the status icon.
pub struct VolumeMenuController {
    control: Rc<dyn MixerControl>,
    output: OutputSlider,
    input: InputSlider,
    events: VecDeque<MenuEvent>,
}

impl VolumeMenuController {
    pub fn new(control: Rc<dyn MixerControl>, settings: MenuSettings) -> Self {
        let mut output = OutputSlider::output(control.clone(), settings.notify_delay);
        output.set_amplification_allowed(settings.amplification_allowed);
        let input = InputSlider::input(control.clone(), settings.notify_delay);

        let mut menu = Self {
            control,
            output,
            input,
            events: VecDeque::new(),
        };
        menu.on_control_state_changed();
        menu
    }

    pub fn output(&self) -> &OutputSlider {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputSlider {
        &mut self.output
    }

    pub fn input(&self) -> &InputSlider {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputSlider {
        &mut self.input
    }

    /// Dispatch a mixer notification to the affected sliders.
    pub fn handle_mixer_event(&mut self, event: MixerEvent) {
        match event {
            MixerEvent::StateChanged => self.on_control_state_changed(),
            MixerEvent::DefaultSinkChanged => self.read_output(),
            MixerEvent::DefaultSourceChanged => self.read_input(),
            other => {
                self.output.handle_mixer_event(&other);
                self.input.handle_mixer_event(&other);
            }
        }
        self.collect_slider_events();
    }

    fn on_control_state_changed(&mut self) {
        let state = self.control.state();
        debug!("Mixer state changed to {:?}", state);
        if state.is_ready() {
            self.read_input();
            self.read_output();
        } else {
            self.events.push_back(MenuEvent::IconChanged);
        }
        self.collect_slider_events();
    }

    fn read_output(&mut self) {
        self.output.attach(self.control.default_sink());
    }

    fn read_input(&mut self) {
        self.input.attach(self.control.default_source());
    }

    /// Apply a new value of the amplified-volume preference.
    pub fn set_amplification_allowed(&mut self, allowed: bool) {
        self.output.set_amplification_allowed(allowed);
        self.collect_slider_events();
    }

    /// Scroll on the indicator: moves the output slider by `step`.
    pub fn scroll(&mut self, step: f64) {
        if !self.control.state().is_ready() {
            return;
        }
        self.output.scroll(step);
        self.collect_slider_events();
    }

    /// Composite status icon; `None` hides the indicator.
    pub fn current_icon(&self) -> Option<VolumeIcon> {
        if !self.control.state().is_ready() {
            return None;
        }
        self.output.current_icon()
    }

    /// Output level in percent of the nominal maximum.
    pub fn current_level(&self) -> Option<f64> {
        if !self.control.state().is_ready() {
            return None;
        }
        self.output.current_level()
    }

    /// Fire due notification timers.
    pub fn poll_timers(&mut self, now: Instant) {
        self.output.poll_timers(now);
        self.input.poll_timers(now);
        self.collect_slider_events();
    }

    /// Earliest pending timer deadline, for hosts that sleep between events.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.output.next_deadline(), self.input.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn collect_slider_events(&mut self) {
        for event in self.output.drain_events() {
            if event == SliderEvent::StreamUpdated {
                self.events.push_back(MenuEvent::IconChanged);
            }
            self.events.push_back(MenuEvent::Slider {
                kind: EndpointKind::Output,
                event,
            });
        }
        for event in self.input.drain_events() {
            self.events.push_back(MenuEvent::Slider {
                kind: EndpointKind::Input,
                event,
            });
        }
    }

    /// Take all queued events, including ones raised by direct slider calls.
    pub fn drain_events(&mut self) -> Vec<MenuEvent> {
        self.collect_slider_events();
        self.events.drain(..).collect()
    }
}

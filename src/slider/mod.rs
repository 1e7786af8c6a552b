// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Stream sliders: shared state composed with an output or input policy.

pub mod debounce;
pub mod policy;
pub mod state;

pub use debounce::{Debounce, VOLUME_NOTIFY_DELAY};
pub use policy::{InputPolicy, OutputPolicy, SliderPolicy, Trigger};
pub use state::{StreamSliderState, VolumeIcon};

use crate::audio::mixer::{MixerControl, MixerEndpoint};
use crate::audio::types::{EndpointKind, MixerEvent};
use crate::message::SliderEvent;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A volume slider bound to one sink or source.
pub struct StreamSlider<P> {
    state: StreamSliderState,
    policy: P,
}

pub type OutputSlider = StreamSlider<OutputPolicy>;
pub type InputSlider = StreamSlider<InputPolicy>;

impl OutputSlider {
    pub fn output(control: Rc<dyn MixerControl>, notify_delay: Duration) -> Self {
        Self::new(control, OutputPolicy::default(), notify_delay)
    }
}

impl InputSlider {
    pub fn input(control: Rc<dyn MixerControl>, notify_delay: Duration) -> Self {
        Self::new(control, InputPolicy::default(), notify_delay)
    }
}

impl<P: SliderPolicy> StreamSlider<P> {
    pub fn new(control: Rc<dyn MixerControl>, policy: P, notify_delay: Duration) -> Self {
        Self {
            state: StreamSliderState::new(control, notify_delay),
            policy,
        }
    }

    pub fn state(&self) -> &StreamSliderState {
        &self.state
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn kind(&self) -> EndpointKind {
        self.policy.kind()
    }

    /// Replace the endpoint this slider controls.
    ///
    /// Always queues [`SliderEvent::StreamUpdated`], even when clearing.
    /// An endpoint of the other kind is refused and clears the slider.
    pub fn attach(&mut self, endpoint: Option<Rc<dyn MixerEndpoint>>) {
        let kind = self.kind();
        let endpoint = endpoint.filter(|e| {
            if e.kind() != kind {
                warn!(
                    "Refusing {} node {} for the {} slider",
                    e.kind().as_str(),
                    e.id(),
                    kind.as_str()
                );
                return false;
            }
            true
        });
        debug!(
            "Attaching {} slider to {:?}",
            kind.as_str(),
            endpoint.as_ref().map(|e| e.id())
        );
        self.state.disconnect();

        match endpoint {
            Some(endpoint) => {
                self.state.connect(&endpoint);
                self.reclassify(Trigger::Attached);
                self.state.update_volume();
            }
            None => {
                self.reclassify(Trigger::Attached);
                self.state.emit(SliderEvent::StreamUpdated);
            }
        }

        self.update_visibility();
    }

    /// React to a notification from the mixer client.
    pub fn handle_mixer_event(&mut self, event: &MixerEvent) {
        match *event {
            MixerEvent::VolumeChanged(id) | MixerEvent::MutedChanged(id)
                if self.state.is_attached_to(id) =>
            {
                self.state.update_volume();
            }
            MixerEvent::PortChanged(id) if self.state.is_attached_to(id) => {
                self.reclassify(Trigger::PortChanged);
            }
            MixerEvent::StreamAdded(_) | MixerEvent::StreamRemoved(_) => {
                self.reclassify(Trigger::RecordingStreamsChanged);
            }
            _ => {}
        }
    }

    fn reclassify(&mut self, trigger: Trigger) {
        let endpoint = self.state.endpoint();
        if self
            .policy
            .classify(trigger, endpoint.as_deref(), self.state.control())
        {
            self.state
                .emit(SliderEvent::SliderIconChanged(self.policy.slider_icon()));
        }
        self.update_visibility();
    }

    fn update_visibility(&mut self) {
        let visible = self.should_be_visible();
        self.state.set_visible(visible);
    }

    pub fn should_be_visible(&self) -> bool {
        self.state.has_endpoint() && self.policy.visibility_extra()
    }

    pub fn slider_icon(&self) -> &'static str {
        self.policy.slider_icon()
    }

    pub fn accessible_name(&self) -> &'static str {
        self.policy.accessible_name()
    }

    pub fn value(&self) -> f64 {
        self.state.value()
    }

    pub fn set_normalized_value(&mut self, value: f64) {
        self.state.set_normalized_value(value);
    }

    pub fn set_normalized_value_at(&mut self, value: f64, now: Instant) {
        self.state.set_normalized_value_at(value, now);
    }

    /// Move the slider by `step`, as a scroll on the indicator does.
    pub fn scroll(&mut self, step: f64) {
        self.set_normalized_value(self.value() + step);
    }

    pub fn begin_drag(&mut self) {
        self.state.begin_drag();
    }

    pub fn end_drag(&mut self) {
        self.state.end_drag();
    }

    pub fn set_amplification_allowed(&mut self, allowed: bool) {
        self.state.set_amplification_allowed(allowed);
    }

    pub fn current_icon(&self) -> Option<VolumeIcon> {
        self.state.current_icon()
    }

    pub fn current_level(&self) -> Option<f64> {
        self.state.current_level()
    }

    pub fn poll_timers(&mut self, now: Instant) {
        self.state.poll_timers(now);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.next_deadline()
    }

    pub fn drain_events(&mut self) -> Vec<SliderEvent> {
        self.state.drain_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::memory::MemoryMixer;
    use crate::audio::types::Port;

    fn output_slider(mixer: &Rc<MemoryMixer>) -> OutputSlider {
        OutputSlider::output(mixer.clone(), VOLUME_NOTIFY_DELAY)
    }

    #[test]
    fn test_attach_emits_stream_updated() {
        let mixer = Rc::new(MemoryMixer::with_limits(100, 150));
        let sink = mixer.add_endpoint(EndpointKind::Output);
        sink.daemon_set_volume(25);
        let mut slider = output_slider(&mixer);

        slider.attach(Some(sink.clone()));
        let events = slider.drain_events();
        assert!(events.contains(&SliderEvent::StreamUpdated));
        assert!(events.contains(&SliderEvent::SliderIconChanged(policy::SPEAKERS_ICON)));
        assert!(events.contains(&SliderEvent::VisibilityChanged(true)));
        assert_eq!(slider.value(), 0.25);
        assert!(slider.should_be_visible());

        slider.attach(None);
        let events = slider.drain_events();
        assert_eq!(
            events,
            vec![SliderEvent::VisibilityChanged(false), SliderEvent::StreamUpdated]
        );
        assert_eq!(slider.current_icon(), None);
    }

    #[test]
    fn test_ignores_events_from_old_endpoint() {
        let mixer = Rc::new(MemoryMixer::with_limits(100, 150));
        let first = mixer.add_endpoint(EndpointKind::Output);
        let second = mixer.add_endpoint(EndpointKind::Output);
        let mut slider = output_slider(&mixer);

        slider.attach(Some(first.clone()));
        slider.attach(Some(second.clone()));
        slider.drain_events();

        first.daemon_set_volume(80);
        for event in mixer.take_events() {
            slider.handle_mixer_event(&event);
        }
        assert!(slider.drain_events().is_empty());

        second.daemon_set_volume(80);
        for event in mixer.take_events() {
            slider.handle_mixer_event(&event);
        }
        assert_eq!(slider.drain_events(), vec![SliderEvent::StreamUpdated]);
        assert_eq!(slider.value(), 0.8);
    }

    #[test]
    fn test_port_change_swaps_glyph() {
        let mixer = Rc::new(MemoryMixer::with_limits(100, 150));
        let sink = mixer.add_endpoint(EndpointKind::Output);
        sink.set_ports(vec![
            Port::new("analog-output-speaker", "Speakers"),
            Port::new("analog-output-headphones", "Headphones"),
        ]);
        sink.select_port("analog-output-speaker");
        let mut slider = output_slider(&mixer);
        slider.attach(Some(sink.clone()));
        slider.drain_events();
        mixer.take_events();

        sink.select_port("analog-output-headphones");
        for event in mixer.take_events() {
            slider.handle_mixer_event(&event);
        }
        assert_eq!(
            slider.drain_events(),
            vec![SliderEvent::SliderIconChanged(policy::HEADPHONES_ICON)]
        );
        assert_eq!(slider.slider_icon(), policy::HEADPHONES_ICON);
        assert!(slider.should_be_visible());
    }

    #[test]
    fn test_input_visibility_follows_recorders() {
        let mixer = Rc::new(MemoryMixer::with_limits(100, 150));
        let source = mixer.add_endpoint(EndpointKind::Input);
        mixer.add_recording_stream(Some("org.gnome.VolumeControl"));
        let mut slider = InputSlider::input(mixer.clone(), VOLUME_NOTIFY_DELAY);

        slider.attach(Some(source.clone()));
        assert!(!slider.should_be_visible());
        mixer.take_events();

        let music = mixer.add_recording_stream(Some("com.example.Music"));
        for event in mixer.take_events() {
            slider.handle_mixer_event(&event);
        }
        assert!(slider.should_be_visible());

        mixer.remove_recording_stream(music);
        for event in mixer.take_events() {
            slider.handle_mixer_event(&event);
        }
        assert!(!slider.should_be_visible());
        assert_eq!(
            slider.drain_events().last(),
            Some(&SliderEvent::VisibilityChanged(false))
        );
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mixer = Rc::new(MemoryMixer::with_limits(100, 150));
        let sink = mixer.add_endpoint(EndpointKind::Output);
        sink.daemon_set_volume(95);
        let mut slider = output_slider(&mixer);
        slider.attach(Some(sink.clone()));

        slider.scroll(0.1);
        assert_eq!(slider.value(), 1.0);
        assert_eq!(sink.volume(), 100);
        assert!(!sink.is_muted());

        slider.scroll(-1.5);
        assert_eq!(slider.value(), 0.0);
        assert_eq!(sink.volume(), 0);
        assert!(sink.is_muted());
    }

    #[test]
    fn test_attach_refuses_wrong_kind() {
        let mixer = Rc::new(MemoryMixer::with_limits(100, 150));
        let source = mixer.add_endpoint(EndpointKind::Input);
        let mut slider = output_slider(&mixer);

        slider.attach(Some(source.clone()));
        assert!(!slider.state().has_endpoint());
        assert!(!slider.should_be_visible());
        assert!(slider.drain_events().contains(&SliderEvent::StreamUpdated));
    }
}

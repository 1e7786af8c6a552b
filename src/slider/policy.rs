// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Output and input specializations of the stream slider.

use crate::audio::mixer::{MixerControl, MixerEndpoint};
use crate::audio::types::{EndpointKind, RecordingStream};
use tracing::debug;

/// Recorders that only show input levels and never count as "recording".
pub const SELF_RECORDERS: &[&str] = &["org.gnome.VolumeControl", "org.PulseAudio.pavucontrol"];

pub const SPEAKERS_ICON: &str = "audio-speakers-symbolic";
pub const HEADPHONES_ICON: &str = "audio-headphones-symbolic";
pub const MICROPHONE_ICON: &str = "audio-input-microphone-symbolic";

/// What caused a policy to re-evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The slider got a new endpoint (or lost it).
    Attached,
    /// The attached endpoint switched ports.
    PortChanged,
    /// A recording stream appeared or went away.
    RecordingStreamsChanged,
}

/// Behaviour that differs between the output and input sliders.
pub trait SliderPolicy {
    fn kind(&self) -> EndpointKind;

    fn accessible_name(&self) -> &'static str;

    /// Glyph shown next to the slider.
    fn slider_icon(&self) -> &'static str;

    /// Re-evaluate policy state. Returns true if the slider glyph changed.
    fn classify(
        &mut self,
        trigger: Trigger,
        endpoint: Option<&dyn MixerEndpoint>,
        control: &dyn MixerControl,
    ) -> bool;

    /// Extra condition on top of "an endpoint is attached".
    fn visibility_extra(&self) -> bool {
        true
    }
}

/// Check whether a sink drives headphones.
pub fn find_headphones(sink: &dyn MixerEndpoint) -> bool {
    // Only reliable for external headphones (e.g. bluetooth).
    if matches!(sink.form_factor().as_deref(), Some("headset" | "headphone")) {
        return true;
    }

    // ALSA has several identifiers for headphone ports.
    if !sink.ports().is_empty() {
        return sink
            .active_port()
            .map(|p| p.port.contains("headphone"))
            .unwrap_or(false);
    }

    false
}

/// Output slider: picks the speakers or headphones glyph.
#[derive(Debug, Default)]
pub struct OutputPolicy {
    has_headphones: Option<bool>,
}

impl OutputPolicy {
    pub fn has_headphones(&self) -> bool {
        self.has_headphones.unwrap_or(false)
    }
}

impl SliderPolicy for OutputPolicy {
    fn kind(&self) -> EndpointKind {
        EndpointKind::Output
    }

    fn accessible_name(&self) -> &'static str {
        "Volume"
    }

    fn slider_icon(&self) -> &'static str {
        if self.has_headphones() {
            HEADPHONES_ICON
        } else {
            SPEAKERS_ICON
        }
    }

    fn classify(
        &mut self,
        trigger: Trigger,
        endpoint: Option<&dyn MixerEndpoint>,
        _control: &dyn MixerControl,
    ) -> bool {
        if trigger == Trigger::RecordingStreamsChanged {
            return false;
        }
        let Some(sink) = endpoint else {
            return false;
        };

        let has_headphones = find_headphones(sink);
        if self.has_headphones == Some(has_headphones) {
            return false;
        }
        debug!(
            "Output on {:?}: headphones {}",
            sink.active_port().map(|p| p.human_port),
            has_headphones
        );
        self.has_headphones = Some(has_headphones);
        true
    }
}

/// Check whether a recording stream belongs to a real recording application.
pub fn is_foreign_recorder(stream: &RecordingStream) -> bool {
    match stream.application_id.as_deref() {
        Some(id) => !SELF_RECORDERS.contains(&id),
        None => false,
    }
}

/// Input slider: only shown while some application is recording.
#[derive(Debug, Default)]
pub struct InputPolicy {
    show_input: bool,
}

impl InputPolicy {
    pub fn show_input(&self) -> bool {
        self.show_input
    }
}

impl SliderPolicy for InputPolicy {
    fn kind(&self) -> EndpointKind {
        EndpointKind::Input
    }

    fn accessible_name(&self) -> &'static str {
        "Microphone"
    }

    fn slider_icon(&self) -> &'static str {
        MICROPHONE_ICON
    }

    fn classify(
        &mut self,
        trigger: Trigger,
        endpoint: Option<&dyn MixerEndpoint>,
        control: &dyn MixerControl,
    ) -> bool {
        if trigger == Trigger::PortChanged {
            return false;
        }
        self.show_input =
            endpoint.is_some() && control.source_outputs().iter().any(is_foreign_recorder);
        false
    }

    fn visibility_extra(&self) -> bool {
        self.show_input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::memory::MemoryMixer;
    use crate::audio::types::Port;

    #[test]
    fn test_headphones_by_form_factor() {
        let mixer = MemoryMixer::new();
        let sink = mixer.add_endpoint(EndpointKind::Output);
        assert!(!find_headphones(&*sink));

        sink.set_form_factor(Some("headset"));
        assert!(find_headphones(&*sink));
        sink.set_form_factor(Some("headphone"));
        assert!(find_headphones(&*sink));
        sink.set_form_factor(Some("internal"));
        assert!(!find_headphones(&*sink));
    }

    #[test]
    fn test_headphones_by_active_port() {
        let mixer = MemoryMixer::new();
        let sink = mixer.add_endpoint(EndpointKind::Output);
        sink.set_form_factor(Some("internal"));
        sink.set_ports(vec![
            Port::new("analog-output-speaker", "Speakers"),
            Port::new("analog-output-headphones", "Headphones"),
        ]);

        sink.select_port("analog-output-speaker");
        assert!(!find_headphones(&*sink));
        sink.select_port("analog-output-headphones");
        assert!(find_headphones(&*sink));
    }

    #[test]
    fn test_output_classify_reports_changes_only() {
        let mixer = MemoryMixer::new();
        let sink = mixer.add_endpoint(EndpointKind::Output);
        let mut policy = OutputPolicy::default();

        // First classification always counts as a change.
        assert!(policy.classify(Trigger::Attached, Some(&*sink), &mixer));
        assert_eq!(policy.slider_icon(), SPEAKERS_ICON);
        assert!(!policy.classify(Trigger::PortChanged, Some(&*sink), &mixer));

        sink.set_form_factor(Some("headset"));
        assert!(policy.classify(Trigger::PortChanged, Some(&*sink), &mixer));
        assert_eq!(policy.slider_icon(), HEADPHONES_ICON);
    }

    #[test]
    fn test_foreign_recorder() {
        assert!(!is_foreign_recorder(&RecordingStream::new(1, None)));
        assert!(!is_foreign_recorder(&RecordingStream::new(1, Some("org.gnome.VolumeControl"))));
        assert!(!is_foreign_recorder(&RecordingStream::new(1, Some("org.PulseAudio.pavucontrol"))));
        assert!(is_foreign_recorder(&RecordingStream::new(1, Some("com.example.Music"))));
    }

    #[test]
    fn test_input_requires_source_and_recorder() {
        let mixer = MemoryMixer::new();
        let source = mixer.add_endpoint(EndpointKind::Input);
        mixer.add_recording_stream(Some("com.example.Music"));
        let mut policy = InputPolicy::default();

        policy.classify(Trigger::Attached, None, &mixer);
        assert!(!policy.visibility_extra());

        policy.classify(Trigger::Attached, Some(&*source), &mixer);
        assert!(policy.visibility_extra());
    }
}

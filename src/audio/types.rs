// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mixer type definitions for endpoints, ports, and recording streams.

/// Raw volume of a unity-gain endpoint (PA_VOLUME_NORM).
pub const VOLUME_NORM: u32 = 65536;

/// Highest raw volume a user interface may offer (PA_VOLUME_UI_MAX, about +11dB).
pub const VOLUME_UI_MAX: u32 = 99957;

/// Identifier of a mixer object (endpoint or recording stream).
pub type EndpointId = u32;

/// Connection state of the mixer client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixerState {
    #[default]
    Closed,
    Connecting,
    Ready,
    Failed,
}

impl MixerState {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Which side of the audio graph an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Audio sink (speakers, headphones).
    Output,
    /// Audio source (microphone).
    Input,
}

impl EndpointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Output => "output",
            Self::Input => "input",
        }
    }
}

/// A selectable port (route) on an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// Machine identifier, e.g. `analog-output-headphones`.
    pub port: String,
    /// Human readable description.
    pub human_port: String,
}

impl Port {
    pub fn new(port: impl Into<String>, human_port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            human_port: human_port.into(),
        }
    }
}

/// An application stream recording from the mixer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingStream {
    pub id: EndpointId,
    pub application_id: Option<String>,
}

impl RecordingStream {
    pub fn new(id: EndpointId, application_id: Option<&str>) -> Self {
        Self {
            id,
            application_id: application_id.map(str::to_string),
        }
    }
}

/// Notifications delivered by a mixer client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerEvent {
    /// Connection state changed.
    StateChanged,
    /// A different sink became the default.
    DefaultSinkChanged,
    /// A different source became the default.
    DefaultSourceChanged,
    /// A stream appeared in the graph.
    StreamAdded(EndpointId),
    /// A stream left the graph.
    StreamRemoved(EndpointId),
    /// Volume of an endpoint changed.
    VolumeChanged(EndpointId),
    /// Mute flag of an endpoint changed.
    MutedChanged(EndpointId),
    /// Active port of an endpoint changed.
    PortChanged(EndpointId),
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Event types flowing from the sliders to the presentation layer.

use crate::audio::types::EndpointKind;

/// Notifications queued by a stream slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliderEvent {
    /// Endpoint replaced, cleared, or its volume/mute changed.
    StreamUpdated,
    /// Slider should be shown or hidden.
    VisibilityChanged(bool),
    /// Glyph next to the slider changed (speakers vs. headphones).
    SliderIconChanged(&'static str),
    /// A volume adjustment settled; play the feedback sound.
    VolumeNotify {
        /// Level of the endpoint when the notification fired.
        level: f64,
    },
}

/// Notifications queued by the volume menu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MenuEvent {
    /// Composite status icon must be re-read.
    IconChanged,
    /// Forwarded slider event.
    Slider {
        kind: EndpointKind,
        event: SliderEvent,
    },
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mixer client and endpoint interfaces consumed by the volume menu.

use crate::audio::types::{EndpointId, EndpointKind, MixerState, Port, RecordingStream};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MixerError {
    #[error("Failed to execute {command}: {message}")]
    CommandFailed { command: &'static str, message: String },
    #[error("Mixer operation failed: {0}")]
    OperationFailed(String),
    #[error("Failed to parse graph dump: {0}")]
    DumpParse(#[from] serde_json::Error),
    #[error("Unexpected output from {command}: {output}")]
    UnexpectedOutput { command: &'static str, output: String },
}

/// A single sink or source owned by the mixer client.
///
/// Setters stage a change; `push_volume` commits staged volume to the daemon.
pub trait MixerEndpoint {
    fn id(&self) -> EndpointId;
    fn kind(&self) -> EndpointKind;

    fn volume(&self) -> u32;
    fn set_volume(&self, volume: u32);

    fn is_muted(&self) -> bool;
    fn change_is_muted(&self, muted: bool);

    /// Commit staged changes to the daemon.
    fn push_volume(&self) -> Result<(), MixerError>;

    /// Device form factor such as `headset`, `headphone` or `internal`.
    fn form_factor(&self) -> Option<String> {
        None
    }

    fn ports(&self) -> Vec<Port> {
        Vec::new()
    }

    fn active_port(&self) -> Option<Port> {
        None
    }
}

/// Connection to the mixer daemon.
pub trait MixerControl {
    fn state(&self) -> MixerState;
    fn default_sink(&self) -> Option<Rc<dyn MixerEndpoint>>;
    fn default_source(&self) -> Option<Rc<dyn MixerEndpoint>>;
    fn vol_max_norm(&self) -> u32;
    fn vol_max_amplified(&self) -> u32;
    /// Application streams currently recording.
    fn source_outputs(&self) -> Vec<RecordingStream>;
}

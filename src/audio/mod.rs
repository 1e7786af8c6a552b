// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Audio subsystem - mixer client interfaces and backends.

pub mod memory;
pub mod mixer;
pub mod pipewire;
pub mod types;
pub mod volume;

pub use memory::{EndpointWrite, MemoryEndpoint, MemoryMixer};
pub use mixer::{MixerControl, MixerEndpoint, MixerError};
pub use pipewire::PwMixer;
pub use types::*;

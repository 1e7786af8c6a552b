// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! shell-volume - panel volume menu for Linux desktops.
//!
//! Keeps an output and an input slider in step with the default sink and
//! source of a mixer daemon, and derives the panel status icon from them.

pub mod audio;
pub mod config;
pub mod desktop;
pub mod indicator;
pub mod menu;
pub mod message;
pub mod slider;
pub mod sound;
pub mod tray;

pub use menu::{MenuSettings, VolumeMenuController};
pub use message::{MenuEvent, SliderEvent};

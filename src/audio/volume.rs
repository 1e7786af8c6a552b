// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Volume and mute control using wpctl.

use crate::audio::mixer::MixerError;
use crate::audio::types::{EndpointId, VOLUME_NORM};
use std::process::Command;
use tracing::debug;

fn run(command: &'static str, args: &[&str]) -> Result<String, MixerError> {
    let output = Command::new(command)
        .args(args)
        .output()
        .map_err(|e| MixerError::CommandFailed {
            command,
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MixerError::OperationFailed(stderr.trim().to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Convert a raw mixer volume to wpctl's linear scale (1.0 = 100%).
pub fn raw_to_linear(volume: u32) -> f32 {
    volume as f32 / VOLUME_NORM as f32
}

/// Convert wpctl's linear scale to a raw mixer volume.
pub fn linear_to_raw(volume: f32) -> u32 {
    (volume.max(0.0) * VOLUME_NORM as f32).round() as u32
}

/// Set volume on a node from a raw mixer volume.
pub fn set_volume(node_id: EndpointId, volume: u32) -> Result<(), MixerError> {
    let linear = raw_to_linear(volume);
    debug!("Setting volume on node {} to {:.4}", node_id, linear);

    run(
        "wpctl",
        &["set-volume", &node_id.to_string(), &format!("{:.4}", linear)],
    )?;
    Ok(())
}

/// Set mute state on a node.
pub fn set_mute(node_id: EndpointId, muted: bool) -> Result<(), MixerError> {
    let mute_value = if muted { "1" } else { "0" };
    debug!("Setting mute on node {} to {}", node_id, muted);

    run("wpctl", &["set-mute", &node_id.to_string(), mute_value])?;
    Ok(())
}

/// Get current raw volume and mute flag of a node.
pub fn get_volume(node_id: EndpointId) -> Result<(u32, bool), MixerError> {
    let stdout = run("wpctl", &["get-volume", &node_id.to_string()])?;
    parse_volume_output(&stdout).ok_or_else(|| MixerError::UnexpectedOutput {
        command: "wpctl",
        output: stdout.trim().to_string(),
    })
}

/// Parse `wpctl get-volume` output: "Volume: 1.00" or "Volume: 0.50 [MUTED]".
pub fn parse_volume_output(stdout: &str) -> Option<(u32, bool)> {
    let mut volume = None;
    let mut muted = false;

    for part in stdout.split_whitespace() {
        if let Ok(v) = part.parse::<f32>() {
            volume = Some(linear_to_raw(v));
        }
        if part.contains("MUTED") {
            muted = true;
        }
    }

    volume.map(|v| (v, muted))
}

/// Dump the PipeWire graph as JSON.
pub fn pw_dump() -> Result<String, MixerError> {
    run("pw-dump", &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_volume_output() {
        assert_eq!(parse_volume_output("Volume: 1.00\n"), Some((VOLUME_NORM, false)));
        assert_eq!(
            parse_volume_output("Volume: 0.50 [MUTED]\n"),
            Some((VOLUME_NORM / 2, true))
        );
        assert_eq!(parse_volume_output("garbage"), None);
    }

    #[test]
    fn test_linear_conversion() {
        assert_eq!(linear_to_raw(1.0), VOLUME_NORM);
        assert_eq!(linear_to_raw(-0.5), 0);
        assert!((raw_to_linear(VOLUME_NORM / 4) - 0.25).abs() < 0.0001);
    }
}

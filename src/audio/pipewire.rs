// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! PipeWire mixer client built on `pw-dump` and `wpctl`.
//!
//! [`capture`] takes a snapshot of the graph. It blocks on external commands
//! and is `Send`, so hosts run it off their event loop. [`PwMixer::apply_capture`]
//! compares it with the previous one and reports the differences as
//! [`MixerEvent`]s. Only the default sink and source are tracked as endpoints.

use crate::audio::mixer::{MixerControl, MixerEndpoint, MixerError};
use crate::audio::types::{
    EndpointId, EndpointKind, MixerEvent, MixerState, Port, RecordingStream, VOLUME_NORM,
    VOLUME_UI_MAX,
};
use crate::audio::volume;
use serde::Deserialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, info, warn};

const NODE_TYPE: &str = "PipeWire:Interface:Node";
const DEVICE_TYPE: &str = "PipeWire:Interface:Device";
const METADATA_TYPE: &str = "PipeWire:Interface:Metadata";

#[derive(Debug, Deserialize)]
struct DumpObject {
    id: u32,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    info: Option<DumpInfo>,
    #[serde(default)]
    props: Option<HashMap<String, Value>>,
    #[serde(default)]
    metadata: Option<Vec<MetadataEntry>>,
}

#[derive(Debug, Default, Deserialize)]
struct DumpInfo {
    #[serde(default)]
    props: HashMap<String, Value>,
    #[serde(default)]
    params: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    key: String,
    #[serde(default)]
    value: Value,
}

/// A default endpoint as seen in one graph snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSnapshot {
    pub id: EndpointId,
    pub form_factor: Option<String>,
    pub ports: Vec<Port>,
    pub active_port: Option<Port>,
}

/// The parts of the PipeWire graph the volume menu cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub sink: Option<EndpointSnapshot>,
    pub source: Option<EndpointSnapshot>,
    pub recording: Vec<RecordingStream>,
}

fn prop_str<'a>(props: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    props.get(key).and_then(Value::as_str)
}

fn prop_u32(props: &HashMap<String, Value>, key: &str) -> Option<u32> {
    match props.get(key)? {
        Value::Number(n) => n.as_u64().map(|v| v as u32),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Extract the node name from a `default.audio.*` metadata value.
fn metadata_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .and_then(|v| v.get("name").and_then(Value::as_str).map(str::to_string)),
        _ => None,
    }
}

fn route_port(route: &Value) -> Option<Port> {
    let name = route.get("name")?.as_str()?;
    let description = route.get("description").and_then(Value::as_str).unwrap_or(name);
    Some(Port::new(name, description))
}

fn routes<'a>(
    params: &'a HashMap<String, Value>,
    param: &str,
    direction: &'a str,
) -> impl Iterator<Item = &'a Value> + 'a {
    params
        .get(param)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(move |r| r.get("direction").and_then(Value::as_str) == Some(direction))
}

fn endpoint_snapshot(
    node: &DumpObject,
    devices: &HashMap<u32, &DumpInfo>,
    kind: EndpointKind,
) -> EndpointSnapshot {
    let empty = DumpInfo::default();
    let info = node.info.as_ref().unwrap_or(&empty);
    let device = prop_u32(&info.props, "device.id").and_then(|id| devices.get(&id).copied());

    let form_factor = prop_str(&info.props, "device.form-factor")
        .or_else(|| device.and_then(|d| prop_str(&d.props, "device.form-factor")))
        .map(str::to_string);

    let direction = match kind {
        EndpointKind::Output => "Output",
        EndpointKind::Input => "Input",
    };

    let (ports, active_port) = match device {
        Some(device) => {
            let ports = routes(&device.params, "EnumRoute", direction)
                .filter_map(route_port)
                .collect();
            let profile_device = prop_u32(&info.props, "card.profile.device");
            let mut active = routes(&device.params, "Route", direction).filter(|r| {
                match profile_device {
                    Some(pd) => r.get("device").and_then(Value::as_u64) == Some(pd as u64),
                    None => true,
                }
            });
            (ports, active.next().and_then(route_port))
        }
        None => (Vec::new(), None),
    };

    EndpointSnapshot {
        id: node.id,
        form_factor,
        ports,
        active_port,
    }
}

/// Parse `pw-dump` output into a [`GraphSnapshot`].
pub fn parse_graph(json: &str) -> Result<GraphSnapshot, MixerError> {
    let objects: Vec<DumpObject> = serde_json::from_str(json)?;

    let mut default_sink = None;
    let mut default_source = None;
    for object in objects.iter().filter(|o| o.kind == METADATA_TYPE) {
        let is_default = object
            .props
            .as_ref()
            .and_then(|p| prop_str(p, "metadata.name"))
            == Some("default");
        if !is_default {
            continue;
        }
        for entry in object.metadata.iter().flatten() {
            match entry.key.as_str() {
                "default.audio.sink" => default_sink = metadata_name(&entry.value),
                "default.audio.source" => default_source = metadata_name(&entry.value),
                _ => {}
            }
        }
    }

    let devices: HashMap<u32, &DumpInfo> = objects
        .iter()
        .filter(|o| o.kind == DEVICE_TYPE)
        .filter_map(|o| o.info.as_ref().map(|info| (o.id, info)))
        .collect();

    let mut graph = GraphSnapshot::default();
    for node in objects.iter().filter(|o| o.kind == NODE_TYPE) {
        let Some(info) = node.info.as_ref() else {
            continue;
        };
        let name = prop_str(&info.props, "node.name");
        match prop_str(&info.props, "media.class") {
            Some("Audio/Sink") if name.is_some() && name == default_sink.as_deref() => {
                graph.sink = Some(endpoint_snapshot(node, &devices, EndpointKind::Output));
            }
            Some("Audio/Source") if name.is_some() && name == default_source.as_deref() => {
                graph.source = Some(endpoint_snapshot(node, &devices, EndpointKind::Input));
            }
            Some("Stream/Input/Audio") => {
                graph.recording.push(RecordingStream::new(
                    node.id,
                    prop_str(&info.props, "application.id"),
                ));
            }
            _ => {}
        }
    }

    Ok(graph)
}

/// A graph snapshot with the raw levels of its default endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capture {
    pub graph: GraphSnapshot,
    pub levels: HashMap<EndpointId, (u32, bool)>,
}

/// Snapshot the graph with `pw-dump` and read default levels with `wpctl`.
pub fn capture() -> Result<Capture, MixerError> {
    let graph = parse_graph(&volume::pw_dump()?)?;
    let mut levels = HashMap::new();
    for endpoint in graph.sink.iter().chain(graph.source.iter()) {
        match volume::get_volume(endpoint.id) {
            Ok(level) => {
                levels.insert(endpoint.id, level);
            }
            Err(e) => warn!("Failed to read volume of node {}: {}", endpoint.id, e),
        }
    }
    Ok(Capture { graph, levels })
}

/// Default sink or source of a [`PwMixer`].
pub struct PwEndpoint {
    id: EndpointId,
    kind: EndpointKind,
    volume: Cell<u32>,
    muted: Cell<bool>,
    committed: Cell<(u32, bool)>,
    form_factor: RefCell<Option<String>>,
    ports: RefCell<Vec<Port>>,
    active_port: RefCell<Option<Port>>,
}

impl PwEndpoint {
    fn new(snapshot: EndpointSnapshot, kind: EndpointKind, level: (u32, bool)) -> Self {
        Self {
            id: snapshot.id,
            kind,
            volume: Cell::new(level.0),
            muted: Cell::new(level.1),
            committed: Cell::new(level),
            form_factor: RefCell::new(snapshot.form_factor),
            ports: RefCell::new(snapshot.ports),
            active_port: RefCell::new(snapshot.active_port),
        }
    }

    /// Fold a newer snapshot into this endpoint, reporting what changed.
    fn update(
        &self,
        snapshot: EndpointSnapshot,
        level: Option<(u32, bool)>,
        events: &mut Vec<MixerEvent>,
    ) {
        if let Some((volume, muted)) = level {
            if volume != self.volume.get() {
                self.volume.set(volume);
                events.push(MixerEvent::VolumeChanged(self.id));
            }
            if muted != self.muted.get() {
                self.muted.set(muted);
                events.push(MixerEvent::MutedChanged(self.id));
            }
            self.committed.set((volume, muted));
        }

        *self.form_factor.borrow_mut() = snapshot.form_factor;
        *self.ports.borrow_mut() = snapshot.ports;
        if *self.active_port.borrow() != snapshot.active_port {
            *self.active_port.borrow_mut() = snapshot.active_port;
            events.push(MixerEvent::PortChanged(self.id));
        }
    }
}

impl MixerEndpoint for PwEndpoint {
    fn id(&self) -> EndpointId {
        self.id
    }

    fn kind(&self) -> EndpointKind {
        self.kind
    }

    fn volume(&self) -> u32 {
        self.volume.get()
    }

    fn set_volume(&self, volume: u32) {
        self.volume.set(volume);
    }

    fn is_muted(&self) -> bool {
        self.muted.get()
    }

    fn change_is_muted(&self, muted: bool) {
        self.muted.set(muted);
    }

    fn push_volume(&self) -> Result<(), MixerError> {
        let (old_volume, old_muted) = self.committed.get();
        let (volume, muted) = (self.volume.get(), self.muted.get());

        if volume != old_volume {
            volume::set_volume(self.id, volume)?;
        }
        if muted != old_muted {
            volume::set_mute(self.id, muted)?;
        }
        self.committed.set((volume, muted));
        Ok(())
    }

    fn form_factor(&self) -> Option<String> {
        self.form_factor.borrow().clone()
    }

    fn ports(&self) -> Vec<Port> {
        self.ports.borrow().clone()
    }

    fn active_port(&self) -> Option<Port> {
        self.active_port.borrow().clone()
    }
}

#[derive(Default)]
struct PwInner {
    state: MixerState,
    sink: Option<Rc<PwEndpoint>>,
    source: Option<Rc<PwEndpoint>>,
    recording: Vec<RecordingStream>,
}

/// Mixer client for a PipeWire session.
pub struct PwMixer {
    inner: RefCell<PwInner>,
}

impl Default for PwMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl PwMixer {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(PwInner {
                state: MixerState::Connecting,
                ..PwInner::default()
            }),
        }
    }

    /// Fold the result of [`capture`] into the client state.
    ///
    /// A failed capture moves the client to [`MixerState::Failed`].
    pub fn apply_capture(&self, capture: Result<Capture, MixerError>) -> Vec<MixerEvent> {
        match capture {
            Ok(Capture { graph, levels }) => self.apply(graph, |id| levels.get(&id).copied()),
            Err(e) => {
                warn!("Failed to snapshot PipeWire graph: {}", e);
                let mut inner = self.inner.borrow_mut();
                if inner.state == MixerState::Failed {
                    return Vec::new();
                }
                inner.state = MixerState::Failed;
                vec![MixerEvent::StateChanged]
            }
        }
    }

    /// Fold a snapshot into the client state.
    ///
    /// `read_level` supplies raw volume and mute for an endpoint id.
    pub fn apply(
        &self,
        graph: GraphSnapshot,
        read_level: impl Fn(EndpointId) -> Option<(u32, bool)>,
    ) -> Vec<MixerEvent> {
        let mut events = Vec::new();
        let mut inner = self.inner.borrow_mut();

        let sink_changed = Self::apply_endpoint(
            &mut inner.sink,
            graph.sink,
            EndpointKind::Output,
            &read_level,
            &mut events,
        );
        let source_changed = Self::apply_endpoint(
            &mut inner.source,
            graph.source,
            EndpointKind::Input,
            &read_level,
            &mut events,
        );

        let old: HashSet<EndpointId> = inner.recording.iter().map(|s| s.id).collect();
        let new: HashSet<EndpointId> = graph.recording.iter().map(|s| s.id).collect();
        for stream in &graph.recording {
            if !old.contains(&stream.id) {
                events.push(MixerEvent::StreamAdded(stream.id));
            }
        }
        for stream in &inner.recording {
            if !new.contains(&stream.id) {
                events.push(MixerEvent::StreamRemoved(stream.id));
            }
        }
        inner.recording = graph.recording;

        if inner.state != MixerState::Ready {
            info!("PipeWire graph ready");
            inner.state = MixerState::Ready;
            // A ready transition re-reads everything.
            return vec![MixerEvent::StateChanged];
        }

        if sink_changed {
            events.push(MixerEvent::DefaultSinkChanged);
        }
        if source_changed {
            events.push(MixerEvent::DefaultSourceChanged);
        }
        events
    }

    /// Returns true when the default endpoint was replaced.
    fn apply_endpoint(
        slot: &mut Option<Rc<PwEndpoint>>,
        snapshot: Option<EndpointSnapshot>,
        kind: EndpointKind,
        read_level: &impl Fn(EndpointId) -> Option<(u32, bool)>,
        events: &mut Vec<MixerEvent>,
    ) -> bool {
        match snapshot {
            Some(snapshot) => {
                if let Some(current) = slot.as_ref().filter(|c| c.id == snapshot.id) {
                    let level = read_level(snapshot.id);
                    current.update(snapshot, level, events);
                    return false;
                }
                debug!("Default {} is now node {}", kind.as_str(), snapshot.id);
                let level = read_level(snapshot.id).unwrap_or((0, false));
                *slot = Some(Rc::new(PwEndpoint::new(snapshot, kind, level)));
                true
            }
            None => {
                if slot.take().is_none() {
                    return false;
                }
                debug!("Default {} went away", kind.as_str());
                true
            }
        }
    }
}

impl MixerControl for PwMixer {
    fn state(&self) -> MixerState {
        self.inner.borrow().state
    }

    fn default_sink(&self) -> Option<Rc<dyn MixerEndpoint>> {
        self.inner
            .borrow()
            .sink
            .clone()
            .map(|s| s as Rc<dyn MixerEndpoint>)
    }

    fn default_source(&self) -> Option<Rc<dyn MixerEndpoint>> {
        self.inner
            .borrow()
            .source
            .clone()
            .map(|s| s as Rc<dyn MixerEndpoint>)
    }

    fn vol_max_norm(&self) -> u32 {
        VOLUME_NORM
    }

    fn vol_max_amplified(&self) -> u32 {
        VOLUME_UI_MAX
    }

    fn source_outputs(&self) -> Vec<RecordingStream> {
        self.inner.borrow().recording.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"[
        { "id": 0, "type": "PipeWire:Interface:Core", "info": null },
        {
            "id": 40,
            "type": "PipeWire:Interface:Device",
            "info": {
                "props": { "device.form-factor": "internal" },
                "params": {
                    "EnumRoute": [
                        { "index": 0, "direction": "Output", "name": "analog-output-speaker", "description": "Speakers" },
                        { "index": 1, "direction": "Output", "name": "analog-output-headphones", "description": "Headphones" },
                        { "index": 2, "direction": "Input", "name": "analog-input-mic", "description": "Microphone" }
                    ],
                    "Route": [
                        { "index": 2, "direction": "Input", "name": "analog-input-mic", "description": "Microphone", "device": 4 },
                        { "index": 1, "direction": "Output", "name": "analog-output-headphones", "description": "Headphones", "device": 3 }
                    ]
                }
            }
        },
        {
            "id": 51,
            "type": "PipeWire:Interface:Node",
            "info": { "props": { "media.class": "Audio/Sink", "node.name": "alsa_output.pci", "device.id": 40, "card.profile.device": 3 } }
        },
        {
            "id": 52,
            "type": "PipeWire:Interface:Node",
            "info": { "props": { "media.class": "Audio/Source", "node.name": "alsa_input.pci", "device.id": 40, "card.profile.device": 4 } }
        },
        {
            "id": 53,
            "type": "PipeWire:Interface:Node",
            "info": { "props": { "media.class": "Audio/Sink", "node.name": "hdmi_output" } }
        },
        {
            "id": 77,
            "type": "PipeWire:Interface:Node",
            "info": { "props": { "media.class": "Stream/Input/Audio", "application.id": "org.gnome.VolumeControl" } }
        },
        {
            "id": 78,
            "type": "PipeWire:Interface:Node",
            "info": { "props": { "media.class": "Stream/Input/Audio" } }
        },
        {
            "id": 30,
            "type": "PipeWire:Interface:Metadata",
            "props": { "metadata.name": "default" },
            "metadata": [
                { "subject": 0, "key": "default.audio.sink", "type": "Spa:String:JSON", "value": { "name": "alsa_output.pci" } },
                { "subject": 0, "key": "default.audio.source", "type": "Spa:String:JSON", "value": "{\"name\":\"alsa_input.pci\"}" }
            ]
        }
    ]"#;

    #[test]
    fn test_parse_graph() {
        let graph = parse_graph(DUMP).unwrap();

        let sink = graph.sink.unwrap();
        assert_eq!(sink.id, 51);
        assert_eq!(sink.form_factor.as_deref(), Some("internal"));
        assert_eq!(sink.ports.len(), 2);
        assert_eq!(
            sink.active_port.map(|p| p.port),
            Some("analog-output-headphones".to_string())
        );

        let source = graph.source.unwrap();
        assert_eq!(source.id, 52);
        assert_eq!(
            source.active_port.map(|p| p.port),
            Some("analog-input-mic".to_string())
        );

        assert_eq!(
            graph.recording,
            vec![
                RecordingStream::new(77, Some("org.gnome.VolumeControl")),
                RecordingStream::new(78, None),
            ]
        );
    }

    #[test]
    fn test_parse_graph_rejects_garbage() {
        assert!(parse_graph("not json").is_err());
        assert_eq!(parse_graph("[]").unwrap(), GraphSnapshot::default());
    }

    #[test]
    fn test_apply_diffs_snapshots() {
        let mixer = PwMixer::new();
        let graph = parse_graph(DUMP).unwrap();

        let events = mixer.apply(graph.clone(), |_| Some((VOLUME_NORM, false)));
        assert_eq!(events, vec![MixerEvent::StateChanged]);
        assert!(mixer.state().is_ready());
        assert_eq!(mixer.default_sink().map(|s| s.volume()), Some(VOLUME_NORM));

        // Same graph, new level on the sink.
        let events = mixer.apply(graph.clone(), |id| {
            Some(if id == 51 { (VOLUME_NORM / 2, true) } else { (VOLUME_NORM, false) })
        });
        assert_eq!(
            events,
            vec![MixerEvent::VolumeChanged(51), MixerEvent::MutedChanged(51)]
        );

        // Source disappears and a recording stream stops.
        let mut next = graph;
        next.source = None;
        next.recording.pop();
        let events = mixer.apply(next, |id| {
            Some(if id == 51 { (VOLUME_NORM / 2, true) } else { (VOLUME_NORM, false) })
        });
        assert_eq!(
            events,
            vec![MixerEvent::StreamRemoved(78), MixerEvent::DefaultSourceChanged]
        );
        assert!(mixer.default_source().is_none());
    }

    #[test]
    fn test_failed_capture_then_recovery() {
        let mixer = PwMixer::new();

        let failed = || Err(MixerError::OperationFailed("pw-dump missing".into()));
        assert_eq!(mixer.apply_capture(failed()), vec![MixerEvent::StateChanged]);
        assert_eq!(mixer.state(), MixerState::Failed);
        assert!(mixer.apply_capture(failed()).is_empty());

        let graph = parse_graph(DUMP).unwrap();
        let levels = HashMap::from([(51, (VOLUME_NORM / 4, false))]);
        let events = mixer.apply_capture(Ok(Capture { graph, levels }));
        assert_eq!(events, vec![MixerEvent::StateChanged]);
        assert!(mixer.state().is_ready());
        assert_eq!(mixer.default_sink().map(|s| s.volume()), Some(VOLUME_NORM / 4));
        // No level read for the source: it starts silent.
        assert_eq!(mixer.default_source().map(|s| s.volume()), Some(0));
    }
}

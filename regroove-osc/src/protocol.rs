//! OSC address map between the host and [`ControlAction`] / [`OutboundEvent`].

use std::path::PathBuf;

use rosc::{OscMessage, OscPacket, OscType};
use thiserror::Error;

use regroove_types::{ControlAction, GridCell, OutboundEvent, PlaybackEvent};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("unknown address {0}")]
    UnknownAddress(String),
    #[error("{addr}: missing argument {index}")]
    MissingArgument { addr: String, index: usize },
    #[error("{addr}: argument {index} has unusable value {value}")]
    BadArgument {
        addr: String,
        index: usize,
        value: String,
    },
    #[error("encode: {0}")]
    Encode(String),
}

fn arg<'a>(msg: &'a OscMessage, index: usize) -> Result<&'a OscType, ProtocolError> {
    msg.args.get(index).ok_or_else(|| ProtocolError::MissingArgument {
        addr: msg.addr.clone(),
        index,
    })
}

fn bad(msg: &OscMessage, index: usize, value: &OscType) -> ProtocolError {
    ProtocolError::BadArgument {
        addr: msg.addr.clone(),
        index,
        value: format!("{:?}", value),
    }
}

/// Any numeric OSC argument as f32.
fn float_arg(msg: &OscMessage, index: usize) -> Result<f32, ProtocolError> {
    match arg(msg, index)? {
        OscType::Float(v) => Ok(*v),
        OscType::Double(v) => Ok(*v as f32),
        OscType::Int(v) => Ok(*v as f32),
        OscType::Long(v) => Ok(*v as f32),
        other => Err(bad(msg, index, other)),
    }
}

/// Any numeric OSC argument with an integral value.
fn int_arg(msg: &OscMessage, index: usize) -> Result<i64, ProtocolError> {
    match arg(msg, index)? {
        OscType::Int(v) => Ok(*v as i64),
        OscType::Long(v) => Ok(*v),
        OscType::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
        OscType::Double(v) if v.fract() == 0.0 => Ok(*v as i64),
        other => Err(bad(msg, index, other)),
    }
}

fn string_arg(msg: &OscMessage, index: usize) -> Result<String, ProtocolError> {
    match arg(msg, index)? {
        OscType::String(s) => Ok(s.clone()),
        OscType::Int(v) => Ok(v.to_string()),
        OscType::Long(v) => Ok(v.to_string()),
        other => Err(bad(msg, index, other)),
    }
}

/// Translate one inbound message. Values are not range-checked here.
pub fn decode_message(msg: &OscMessage) -> Result<ControlAction, ProtocolError> {
    let action = match msg.addr.as_str() {
        "/params/density" => ControlAction::Density(float_arg(msg, 0)?),
        "/params/minDensity" => ControlAction::MinDensity(float_arg(msg, 0)?),
        "/params/maxDensity" => ControlAction::MaxDensity(float_arg(msg, 0)?),
        "/params/random" => ControlAction::Random(float_arg(msg, 0)?),
        "/params/samples" => ControlAction::Samples(int_arg(msg, 0)?),
        "/params/syncMode" => ControlAction::SyncMode(int_arg(msg, 0)?),
        "/params/syncRate" => ControlAction::SyncRate(float_arg(msg, 0)?),
        "/params/velocity" => ControlAction::Velocity(float_arg(msg, 0)?),
        "/params/syncOn" => ControlAction::SyncOn(int_arg(msg, 0)?),
        "/params/generate" => ControlAction::Generate,
        "/params/sync" => ControlAction::SyncTrigger,
        "/wait_sync" => ControlAction::WaitSync(int_arg(msg, 0)?),
        "/update_cell" => ControlAction::UpdateCell {
            step: int_arg(msg, 0)?,
            channel: int_arg(msg, 1)?,
            value: float_arg(msg, 2)?,
        },
        "/set_active_channels" => ControlAction::SetActiveChannels(string_arg(msg, 0)?),
        "/save_pattern" => ControlAction::SavePattern(string_arg(msg, 0)?),
        "/load_pattern" => ControlAction::LoadPattern(string_arg(msg, 0)?),
        "/save_generator_state" => ControlAction::SaveGeneratorState(string_arg(msg, 0)?),
        "/load_generator_state" => {
            ControlAction::LoadGeneratorState(PathBuf::from(string_arg(msg, 0)?))
        }
        "/get_cached_pattern" => ControlAction::GetCachedPattern,
        "/get_source_pattern" => ControlAction::GetSourcePattern,
        "/clear_pattern_history" => ControlAction::ClearPatternHistory,
        "/debug" => ControlAction::Debug(int_arg(msg, 0)?),
        other => return Err(ProtocolError::UnknownAddress(other.to_string())),
    };
    Ok(action)
}

/// Translate a packet, flattening bundles in order.
pub fn decode_packet(packet: &OscPacket) -> Vec<Result<ControlAction, ProtocolError>> {
    match packet {
        OscPacket::Message(msg) => vec![decode_message(msg)],
        OscPacket::Bundle(bundle) => bundle.content.iter().flat_map(decode_packet).collect(),
    }
}

fn grid_args(cells: &[GridCell]) -> Vec<OscType> {
    let mut args = Vec::with_capacity(cells.len() * 3);
    for cell in cells {
        args.push(OscType::Int(cell.step as i32));
        args.push(OscType::Int(cell.channel as i32));
        args.push(OscType::Float(cell.value));
    }
    args
}

fn event_args(events: &[PlaybackEvent]) -> Vec<OscType> {
    let mut args = Vec::with_capacity(events.len() * 3);
    for event in events {
        args.push(OscType::Int(event.tick as i32));
        args.push(OscType::Int(event.channel as i32));
        args.push(OscType::Float(event.velocity));
    }
    args
}

/// Outbound message for an event; grids and sequences are flat triplets.
pub fn encode_event(event: &OutboundEvent) -> OscMessage {
    let (addr, args) = match event {
        OutboundEvent::FillOnsets(cells) => ("/fillOnsetsMatrix", grid_args(cells)),
        OutboundEvent::FillVelocities(cells) => ("/fillVelocitiesMatrix", grid_args(cells)),
        OutboundEvent::EventSequence(events) => ("/eventSequence", event_args(events)),
        OutboundEvent::SyncState(syncing) => ("/penultimateSync", vec![OscType::Int(*syncing as i32)]),
        OutboundEvent::GeneratorReady {
            density_axis,
            sample_axis,
        } => (
            "/generatorReady",
            vec![
                OscType::Int(*density_axis as i32),
                OscType::Int(*sample_axis as i32),
            ],
        ),
    };
    OscMessage {
        addr: addr.to_string(),
        args,
    }
}

pub fn encode_packet(event: &OutboundEvent) -> Result<Vec<u8>, ProtocolError> {
    rosc::encoder::encode(&OscPacket::Message(encode_event(event)))
        .map_err(|e| ProtocolError::Encode(format!("{:?}", e)))
}

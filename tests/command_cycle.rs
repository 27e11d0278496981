//! Integration tests for the command protocol over a scripted transport.
//!
//! No hardware involved: the transport double records every frame
//! written and serves canned (or deliberately broken) replies, so the
//! retry policy and frame contents can be asserted exactly.

use std::collections::VecDeque;

use ddcci::packet::{checksum, request_seed};
use ddcci::protocol::{op, CAPS_FRAGMENT_SIZE, DEVICE_ADDRESS, REPLY_SEED};
use ddcci::{
    AttemptError, CodecError, DdcMonitor, DdcTimings, FeatureCode, ProtocolError, Transport,
    TransportError,
};

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Transport double: records writes, pops canned replies, optionally
/// fails the first N writes.
#[derive(Default)]
struct ScriptedTransport {
    writes: Vec<Vec<u8>>,
    failing_writes: u32,
    replies: VecDeque<Vec<u8>>,
}

impl Transport for ScriptedTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writes.push(bytes.to_vec());
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(TransportError::Io("bus glitch".into()));
        }
        Ok(())
    }

    fn read(&mut self, _max_len: usize) -> Result<Vec<u8>, TransportError> {
        self.replies.pop_front().ok_or(TransportError::Timeout)
    }
}

fn monitor(transport: ScriptedTransport) -> DdcMonitor<ScriptedTransport> {
    DdcMonitor::with_timings(transport, DdcTimings::immediate())
}

/// Frame a reply payload the way a monitor would.
fn reply_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 3);
    frame.push(DEVICE_ADDRESS);
    frame.push(0x80 | payload.len() as u8);
    frame.extend_from_slice(payload);
    frame.push(checksum(REPLY_SEED, &frame));
    frame
}

fn vcp_reply(feature: u8, current: u16, maximum: u16) -> Vec<u8> {
    let [max_hi, max_lo] = maximum.to_be_bytes();
    let [cur_hi, cur_lo] = current.to_be_bytes();
    reply_frame(&[
        op::GET_VCP_REPLY,
        0x00,
        feature,
        0x00,
        max_hi,
        max_lo,
        cur_hi,
        cur_lo,
    ])
}

fn caps_frame(offset: u16, data: &[u8]) -> Vec<u8> {
    let [hi, lo] = offset.to_be_bytes();
    let mut payload = vec![op::CAPS_REPLY, hi, lo];
    payload.extend_from_slice(data);
    reply_frame(&payload)
}

/// Fragment a capability string into the reply sequence a well-behaved
/// monitor would produce for offsets 0, 32, 64, ...
fn caps_replies(s: &str) -> VecDeque<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut replies = VecDeque::new();
    let mut offset = 0usize;
    loop {
        let end = (offset + CAPS_FRAGMENT_SIZE).min(bytes.len());
        let chunk = &bytes[offset..end];
        replies.push_back(caps_frame(offset as u16, chunk));
        offset = end;
        if chunk.len() < CAPS_FRAGMENT_SIZE {
            break;
        }
    }
    replies
}

#[test]
fn get_feature_decodes_reply_and_frames_request() {
    init_logging();
    let mut transport = ScriptedTransport::default();
    transport.replies.push_back(vcp_reply(0x10, 75, 100));

    let mut mon = monitor(transport);
    let reading = mon.get_feature(FeatureCode::Luminance).unwrap();
    assert_eq!(reading.current, 75);
    assert_eq!(reading.maximum, 100);

    let transport = mon.into_transport();
    assert_eq!(transport.writes.len(), 1);
    let frame = &transport.writes[0];
    // single-byte get: [0x82, 0x01, code, checksum]
    assert_eq!(&frame[..3], &[0x82, 0x01, 0x10]);
    assert_eq!(checksum(request_seed(DEVICE_ADDRESS, 1), frame), 0);
}

#[test]
fn get_feature_exhausts_exactly_the_attempt_budget() {
    // every read times out: the cycle runs exactly max_attempts times
    let mut mon = monitor(ScriptedTransport::default());
    let err = mon.get_feature(FeatureCode::Contrast).unwrap_err();
    match err {
        ProtocolError::Unresponsive { attempts, last } => {
            assert_eq!(attempts, 4);
            assert_eq!(last, AttemptError::Transport(TransportError::Timeout));
        }
        other => panic!("expected Unresponsive, got {other:?}"),
    }
    assert_eq!(mon.into_transport().writes.len(), 4);
}

#[test]
fn get_feature_succeeds_on_the_nth_attempt() {
    let mut transport = ScriptedTransport {
        failing_writes: 2,
        ..Default::default()
    };
    transport.replies.push_back(vcp_reply(0x12, 40, 100));

    let mut mon = monitor(transport);
    let reading = mon.get_feature(FeatureCode::Contrast).unwrap();
    assert_eq!(reading.current, 40);
    assert_eq!(mon.into_transport().writes.len(), 3);
}

#[test]
fn corrupted_reply_is_retried() {
    let mut transport = ScriptedTransport::default();
    let mut bad = vcp_reply(0x10, 75, 100);
    bad[5] ^= 0x01; // payload noise, checksum now wrong
    transport.replies.push_back(bad);
    transport.replies.push_back(vcp_reply(0x10, 75, 100));

    let mut mon = monitor(transport);
    assert_eq!(mon.get_feature(FeatureCode::Luminance).unwrap().current, 75);
    assert_eq!(mon.into_transport().writes.len(), 2);
}

#[test]
fn mismatched_feature_echo_is_retried() {
    let mut transport = ScriptedTransport::default();
    transport.replies.push_back(vcp_reply(0x62, 10, 100));
    transport.replies.push_back(vcp_reply(0x10, 75, 100));

    let mut mon = monitor(transport);
    assert_eq!(mon.get_feature(FeatureCode::Luminance).unwrap().current, 75);
    assert_eq!(mon.into_transport().writes.len(), 2);
}

#[test]
fn unsupported_feature_is_not_retried() {
    let mut transport = ScriptedTransport::default();
    transport
        .replies
        .push_back(reply_frame(&[op::GET_VCP_REPLY, 0x01, 0xE9, 0, 0, 0, 0, 0]));

    let mut mon = monitor(transport);
    let err = mon.get_feature(FeatureCode::from_raw(0xE9)).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::UnsupportedFeature(FeatureCode::from_raw(0xE9))
    );
    assert_eq!(mon.into_transport().writes.len(), 1);
}

#[test]
fn set_feature_frames_value_big_endian() {
    init_logging();
    for value in [0u16, 1, 100, 255, 65535] {
        let mut mon = monitor(ScriptedTransport::default());
        mon.set_feature(FeatureCode::Luminance, value).unwrap();

        let transport = mon.into_transport();
        assert_eq!(transport.writes.len(), 1);
        let frame = &transport.writes[0];
        // [0x85, 0x04, SET_VCP, code, hi, lo, checksum]
        assert_eq!(frame.len(), 7);
        assert_eq!(&frame[..4], &[0x85, 0x04, op::SET_VCP, 0x10]);
        assert_eq!(u16::from_be_bytes([frame[4], frame[5]]), value);
        assert_eq!(checksum(request_seed(DEVICE_ADDRESS, 4), frame), 0);
    }
}

#[test]
fn set_feature_exhausts_exactly_the_attempt_budget() {
    let transport = ScriptedTransport {
        failing_writes: u32::MAX,
        ..Default::default()
    };
    let mut mon = monitor(transport);
    let err = mon.set_feature(FeatureCode::Luminance, 50).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Unresponsive { attempts: 4, .. }
    ));
    assert_eq!(mon.into_transport().writes.len(), 4);
}

#[test]
fn toggle_feature_reads_then_writes_the_other_value() {
    let mut transport = ScriptedTransport::default();
    transport.replies.push_back(vcp_reply(0x60, 0x11, 0x12));

    let mut mon = monitor(transport);
    let (from, to) = mon
        .toggle_feature(FeatureCode::InputSource, 0x11, 0x12)
        .unwrap();
    assert_eq!((from, to), (0x11, 0x12));

    let transport = mon.into_transport();
    assert_eq!(transport.writes.len(), 2);
    // the set frame carries the toggled-to value
    let set = &transport.writes[1];
    assert_eq!(u16::from_be_bytes([set[4], set[5]]), 0x12);
}

#[test]
fn capability_string_is_assembled_from_fragments() {
    let caps = "(prot(monitor)type(lcd)model(ACME)cmds(01 02)vcp(02 04 14(05 08 0B) 16))";
    let transport = ScriptedTransport {
        replies: caps_replies(caps),
        ..Default::default()
    };

    let mut mon = monitor(transport);
    assert_eq!(mon.get_capability_string().unwrap(), caps);

    // every request frame names the offset it expects
    let transport = mon.into_transport();
    for (k, frame) in transport.writes.iter().enumerate() {
        assert_eq!(frame[2], op::CAPS_REQUEST);
        let offset = u16::from_be_bytes([frame[3], frame[4]]);
        assert_eq!(offset as usize, k * CAPS_FRAGMENT_SIZE);
    }
}

#[test]
fn capability_document_comes_back_parsed() {
    let caps = "(prot(monitor)type(lcd)model(ACME)cmds(01 02)vcp(02 04 14(05 08 0B) 16))";
    let transport = ScriptedTransport {
        replies: caps_replies(caps),
        ..Default::default()
    };

    let mut mon = monitor(transport);
    let doc = mon.get_capabilities().unwrap();
    assert!(doc.errata.is_empty());
    assert_eq!(doc.attributes["model"], "ACME");
    assert_eq!(doc.vcp_features.len(), 4);

    // documents serialize for the output layer
    let json = serde_json::to_value(&doc).unwrap();
    assert_eq!(json["attributes"]["model"], "ACME");
}

#[test]
fn trailing_nuls_are_trimmed_from_capability_strings() {
    let transport = ScriptedTransport {
        replies: VecDeque::from([caps_frame(0, b"(model(ACME))\0\0\0")]),
        ..Default::default()
    };
    let mut mon = monitor(transport);
    assert_eq!(mon.get_capability_string().unwrap(), "(model(ACME))");
}

#[test]
fn runaway_capability_string_fails_fast() {
    let mut timings = DdcTimings::immediate();
    timings.max_caps_fragments = 4;

    // a monitor that never produces a short fragment
    let mut replies = VecDeque::new();
    for k in 0..4u16 {
        replies.push_back(caps_frame(
            k * CAPS_FRAGMENT_SIZE as u16,
            &[b'x'; CAPS_FRAGMENT_SIZE],
        ));
    }
    let transport = ScriptedTransport {
        replies,
        ..Default::default()
    };

    let mut mon = DdcMonitor::with_timings(transport, timings);
    assert_eq!(
        mon.get_capability_string().unwrap_err(),
        ProtocolError::CapabilityStringTooLong { max_fragments: 4 }
    );
}

#[test]
fn codec_failure_surfaces_as_last_cause() {
    let mut transport = ScriptedTransport::default();
    for _ in 0..4 {
        let mut bad = vcp_reply(0x10, 75, 100);
        *bad.last_mut().unwrap() ^= 0xFF;
        transport.replies.push_back(bad);
    }

    let mut mon = monitor(transport);
    match mon.get_feature(FeatureCode::Luminance).unwrap_err() {
        ProtocolError::Unresponsive { attempts: 4, last } => {
            assert!(matches!(
                last,
                AttemptError::Codec(CodecError::ChecksumMismatch { .. })
            ));
        }
        other => panic!("expected Unresponsive, got {other:?}"),
    }
}

use offpack::Decoder;
use offpack::Encoder;

use crate::codec::decode_val;
use crate::codec::decode_vals;
use crate::error::Error;
use crate::error::FailureReason;
use crate::frame::decode_seq;
use crate::frame::CallEncoder;
use crate::frame::ReplyErrEncoder;
use crate::frame::ReplyOkEncoder;
use crate::frame::RpcFrame;
use crate::value::Value;
use crate::value::ValueType;

#[test]
fn call_frame_round_trip() {
    let args = vec![Value::S64(1), Value::S64(2)];
    let mut enc = Encoder::new();
    CallEncoder::new(17, "add-two-numbers", &args).encode(&mut enc).unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    match RpcFrame::decode(&mut dec).unwrap() {
        RpcFrame::Call(call) => {
            assert_eq!(call.seq, 17);
            assert_eq!(call.method, "add-two-numbers");
            let decoded = decode_vals(call.args, &[ValueType::S64, ValueType::S64]).unwrap();
            assert_eq!(decoded, args);
        }
        _ => panic!("Expected Call frame"),
    }
}

#[test]
fn reply_success_round_trip() {
    let mut enc = Encoder::new();
    ReplyOkEncoder::new(17, &Value::S64(3)).encode(&mut enc).unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    match RpcFrame::decode(&mut dec).unwrap() {
        RpcFrame::Reply(reply) => {
            assert_eq!(reply.seq, 17);
            let mut result_dec = reply.status.expect("expected success");
            assert_eq!(decode_val(&mut result_dec, &ValueType::S64).unwrap(), Value::S64(3));
        }
        _ => panic!("Expected Reply frame"),
    }
}

#[test]
fn reply_failure_round_trip() {
    for reason in [
        FailureReason::OperationPanicked,
        FailureReason::MethodNotFound,
        FailureReason::BadArgumentCount,
        FailureReason::BadArgumentType,
        FailureReason::MalformedRequest,
    ] {
        let mut enc = Encoder::new();
        ReplyErrEncoder::new(5, reason).encode(&mut enc).unwrap();
        let bytes = enc.into_bytes().unwrap();

        let mut dec = Decoder::new(&bytes);
        match RpcFrame::decode(&mut dec).unwrap() {
            RpcFrame::Reply(reply) => {
                assert_eq!(reply.seq, 5);
                assert_eq!(reply.status.unwrap_err(), reason);
            }
            _ => panic!("Expected Reply frame"),
        }
    }
}

#[test]
fn unit_result_round_trip() {
    let mut enc = Encoder::new();
    ReplyOkEncoder::new(1, &Value::Unit).encode(&mut enc).unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    let RpcFrame::Reply(reply) = RpcFrame::decode(&mut dec).unwrap() else {
        panic!("Expected Reply frame");
    };
    let mut result_dec = reply.status.expect("expected success");
    assert_eq!(decode_val(&mut result_dec, &ValueType::Unit).unwrap(), Value::Unit);
}

#[test]
fn integers_survive_the_boundary_losslessly() {
    for v in [0, 1, -1, i64::MAX, i64::MIN] {
        let mut enc = Encoder::new();
        ReplyOkEncoder::new(1, &Value::S64(v)).encode(&mut enc).unwrap();
        let bytes = enc.into_bytes().unwrap();

        let mut dec = Decoder::new(&bytes);
        let RpcFrame::Reply(reply) = RpcFrame::decode(&mut dec).unwrap() else {
            panic!("Expected Reply frame");
        };
        let mut result_dec = reply.status.expect("expected success");
        assert_eq!(decode_val(&mut result_dec, &ValueType::S64).unwrap(), Value::S64(v));
    }
}

#[test]
fn type_mismatch_is_detected() {
    let mut enc = Encoder::new();
    enc.f64(1.5).unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    let err = decode_val(&mut dec, &ValueType::S64).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { expected: "s64", .. }));
}

#[test]
fn argument_count_mismatch_is_detected() {
    let mut enc = Encoder::new();
    crate::codec::encode_vals(&mut enc, &[Value::S64(1)]).unwrap();
    let bytes = enc.into_bytes().unwrap();

    let err = decode_vals(Decoder::new(&bytes), &[ValueType::S64, ValueType::S64]).unwrap_err();
    assert!(matches!(err, Error::ProtocolViolation(_)));

    let mut enc = Encoder::new();
    crate::codec::encode_vals(&mut enc, &[Value::S64(1), Value::S64(2)]).unwrap();
    let bytes = enc.into_bytes().unwrap();

    let err = decode_vals(Decoder::new(&bytes), &[ValueType::S64]).unwrap_err();
    assert!(matches!(err, Error::ProtocolViolation(_)));
}

#[test]
fn unknown_top_level_frame_is_rejected() {
    let mut enc = Encoder::new();
    enc.variant_begin("Gossip").unwrap();
    enc.unit().unwrap();
    enc.variant_end().unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    let err = RpcFrame::decode(&mut dec).unwrap_err();
    assert!(matches!(err, Error::UnknownVariant(_)));
}

#[test]
fn seq_is_recoverable_from_any_frame() {
    let mut enc = Encoder::new();
    CallEncoder::new(99, "long-computation", &[]).encode(&mut enc).unwrap();
    assert_eq!(decode_seq(&enc.into_bytes().unwrap()).unwrap(), 99);

    let mut enc = Encoder::new();
    ReplyOkEncoder::new(41, &Value::Unit).encode(&mut enc).unwrap();
    assert_eq!(decode_seq(&enc.into_bytes().unwrap()).unwrap(), 41);

    let mut enc = Encoder::new();
    ReplyErrEncoder::new(12, FailureReason::MethodNotFound).encode(&mut enc).unwrap();
    assert_eq!(decode_seq(&enc.into_bytes().unwrap()).unwrap(), 12);
}

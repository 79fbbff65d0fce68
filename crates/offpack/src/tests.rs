use super::*;

#[test]
fn scalar_round_trip() {
    let mut enc = Encoder::new();
    enc.list_begin().unwrap();
    enc.bool(true).unwrap();
    enc.bool(false).unwrap();
    enc.u64(u64::MAX).unwrap();
    enc.s64(i64::MIN).unwrap();
    enc.f64(-0.5).unwrap();
    enc.unit().unwrap();
    enc.str("hello").unwrap();
    enc.list_end().unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    let mut items = dec.list().unwrap();
    assert_eq!(items.next().unwrap().bool().unwrap(), true);
    assert_eq!(items.next().unwrap().bool().unwrap(), false);
    assert_eq!(items.next().unwrap().u64().unwrap(), u64::MAX);
    assert_eq!(items.next().unwrap().s64().unwrap(), i64::MIN);
    assert_eq!(items.next().unwrap().f64().unwrap(), -0.5);
    items.next().unwrap().unit().unwrap();
    assert_eq!(items.next().unwrap().str().unwrap(), "hello");
    assert!(items.next().is_none());
}

#[test]
fn f64_bit_pattern_is_lossless() {
    for v in [0.0, -0.0, 0.1, f64::MAX, f64::MIN_POSITIVE, f64::INFINITY] {
        let mut enc = Encoder::new();
        enc.f64(v).unwrap();
        let bytes = enc.into_bytes().unwrap();
        let decoded = Decoder::new(&bytes).f64().unwrap();
        assert_eq!(decoded.to_bits(), v.to_bits());
    }
}

#[test]
fn variant_carries_name_and_payload() {
    let mut enc = Encoder::new();
    enc.variant_begin("add").unwrap();
    enc.s64(42).unwrap();
    enc.variant_end().unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    let (name, mut payload) = dec.variant().unwrap();
    assert_eq!(name, "add");
    assert_eq!(payload.s64().unwrap(), 42);
}

#[test]
fn map_entries_decode_in_order() {
    let mut enc = Encoder::new();
    enc.map_begin().unwrap();
    enc.variant_begin("seq").unwrap();
    enc.u64(7).unwrap();
    enc.variant_end().unwrap();
    enc.variant_begin("method").unwrap();
    enc.str("run").unwrap();
    enc.variant_end().unwrap();
    enc.map_end().unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    let mut map = dec.map().unwrap();
    let (key, mut val) = map.next().unwrap().unwrap();
    assert_eq!(key, "seq");
    assert_eq!(val.u64().unwrap(), 7);
    let (key, mut val) = map.next().unwrap().unwrap();
    assert_eq!(key, "method");
    assert_eq!(val.str().unwrap(), "run");
    assert!(map.next().unwrap().is_none());
}

#[test]
fn skip_passes_over_unknown_fields() {
    let mut enc = Encoder::new();
    enc.map_begin().unwrap();
    enc.variant_begin("future-field").unwrap();
    enc.list_begin().unwrap();
    enc.s64(1).unwrap();
    enc.str("nested").unwrap();
    enc.list_end().unwrap();
    enc.variant_end().unwrap();
    enc.variant_begin("seq").unwrap();
    enc.u64(9).unwrap();
    enc.variant_end().unwrap();
    enc.map_end().unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    let mut map = dec.map().unwrap();
    let mut seq = None;
    while let Some((key, mut val)) = map.next().unwrap() {
        match key {
            "seq" => seq = Some(val.u64().unwrap()),
            _ => val.skip().unwrap(),
        }
    }
    assert_eq!(seq, Some(9));
}

#[test]
fn result_containers_round_trip() {
    let mut enc = Encoder::new();
    enc.result_ok_begin().unwrap();
    enc.s64(3).unwrap();
    enc.result_ok_end().unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    match dec.result().unwrap() {
        Ok(mut body) => assert_eq!(body.s64().unwrap(), 3),
        Err(_) => panic!("expected Ok container"),
    }

    let mut enc = Encoder::new();
    enc.result_err_begin().unwrap();
    enc.str("boom").unwrap();
    enc.result_err_end().unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    match dec.result().unwrap() {
        Ok(_) => panic!("expected Err container"),
        Err(mut body) => assert_eq!(body.str().unwrap(), "boom"),
    }
}

#[test]
fn open_scope_cannot_finalize() {
    let mut enc = Encoder::new();
    enc.list_begin().unwrap();
    assert_eq!(enc.into_bytes().unwrap_err(), Error::ScopeStillOpen);
}

#[test]
fn mismatched_scope_close_fails() {
    let mut enc = Encoder::new();
    enc.list_begin().unwrap();
    let err = enc.map_end().unwrap_err();
    assert_eq!(
        err,
        Error::ScopeMismatch { expected: Scope::Map, actual: Scope::List }
    );
}

#[test]
fn strict_scopes_require_exactly_one_item() {
    let mut enc = Encoder::new();
    enc.variant_begin("empty").unwrap();
    assert_eq!(enc.variant_end().unwrap_err(), Error::EmptyScope(Scope::Variant));

    let mut enc = Encoder::new();
    enc.result_ok_begin().unwrap();
    enc.unit().unwrap();
    assert_eq!(enc.s64(1).unwrap_err(), Error::TooManyItems(Scope::Result));
}

#[test]
fn map_rejects_bare_values() {
    let mut enc = Encoder::new();
    enc.map_begin().unwrap();
    assert_eq!(enc.u64(1).unwrap_err(), Error::InvalidMapEntry);
}

#[test]
fn truncated_input_is_rejected() {
    let mut enc = Encoder::new();
    enc.str("truncate me").unwrap();
    let mut bytes = enc.into_bytes().unwrap();
    bytes.truncate(bytes.len() - 3);

    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.str().unwrap_err(), Error::UnexpectedEnd);
}

#[test]
fn invalid_tag_is_rejected() {
    let mut dec = Decoder::new(&[0xEE]);
    assert_eq!(dec.peek_tag().unwrap_err(), Error::InvalidTag(0xEE));
}

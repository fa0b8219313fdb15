//! Encode/decode round trips for every catalogued type at its boundary values

use audalf::{
    decode_sequence, decode_sequence_with, encode_sequence, encode_sequence_with_null_kind,
    AudalfError, DeserializationSettings, SerializationSettings, TimestampFormat, TimestampShape,
    TypeTag, Value, ValueKind,
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use half::f16;
use num_bigint::BigInt;
use std::fmt::Debug;

fn round_trip<T>(values: Vec<T>)
where
    T: audalf::IntoSlot + audalf::FromValue + Clone + PartialEq + Debug,
{
    let bytes = encode_sequence(values.clone(), &SerializationSettings::default()).unwrap();
    let decoded: Vec<T> = decode_sequence(&bytes).unwrap();
    assert_eq!(decoded, values);
}

#[test]
fn test_unsigned_boundaries() {
    round_trip(vec![u8::MIN, 1, u8::MAX]);
    round_trip(vec![u16::MIN, 1, u16::MAX]);
    round_trip(vec![u32::MIN, 1, u32::MAX]);
    round_trip(vec![u64::MIN, 1, u64::MAX]);
}

#[test]
fn test_signed_boundaries() {
    round_trip(vec![i8::MIN, -1, 0, i8::MAX]);
    round_trip(vec![i16::MIN, -1, 0, i16::MAX]);
    round_trip(vec![i32::MIN, -1, 0, i32::MAX]);
    round_trip(vec![i64::MIN, -1, 0, i64::MAX]);
}

#[test]
fn test_float_boundaries() {
    round_trip(vec![f32::MIN, -1.0, 0.0, f32::MIN_POSITIVE, f32::MAX, f32::INFINITY]);
    round_trip(vec![f64::MIN, -1.0, 0.0, f64::EPSILON, f64::MAX, f64::NEG_INFINITY]);
    round_trip(vec![
        f16::MIN,
        f16::NEG_ONE,
        f16::ZERO,
        f16::MIN_POSITIVE_SUBNORMAL,
        f16::MAX,
        f16::INFINITY,
    ]);

    // NaN never equals itself, so compare bits
    let bytes = encode_sequence([f64::NAN], &SerializationSettings::default()).unwrap();
    let decoded: Vec<f64> = decode_sequence(&bytes).unwrap();
    assert_eq!(decoded[0].to_bits(), f64::NAN.to_bits());
}

#[test]
fn test_strings_and_bools() {
    round_trip(vec![
        String::new(),
        "a".to_string(),
        "exactly8".to_string(),
        "🐶🍦".to_string(),
        "mixed ascii and ünïcödé".to_string(),
    ]);
    round_trip(vec![true, false, true]);
}

#[test]
fn test_big_integers() {
    let huge = BigInt::parse_bytes(b"123456789012345678901234567890123456789", 10).unwrap();
    round_trip(vec![
        BigInt::from(0),
        BigInt::from(-1),
        BigInt::from(i64::MIN),
        BigInt::from(u64::MAX),
        -huge.clone(),
        huge,
    ]);
}

#[test]
fn test_arrays_including_empty() {
    round_trip(vec![vec![], vec![u8::MIN, u8::MAX], vec![1u8; 17]]);
    round_trip(vec![vec![], vec![u16::MIN, u16::MAX]]);
    round_trip(vec![vec![], vec![u32::MIN, u32::MAX, 7]]);
    round_trip(vec![vec![], vec![u64::MIN, u64::MAX]]);
    round_trip(vec![vec![], vec![i8::MIN, -1, i8::MAX]]);
    round_trip(vec![vec![], vec![i16::MIN, -1, i16::MAX]]);
    round_trip(vec![vec![], vec![i32::MIN, -1, i32::MAX]]);
    round_trip(vec![vec![], vec![i64::MIN, -1, i64::MAX]]);
    round_trip(vec![vec![], vec![f16::MIN, f16::from_f32(0.5), f16::MAX]]);
    round_trip(vec![vec![], vec![f32::MIN, 0.5, f32::MAX]]);
    round_trip(vec![vec![], vec![f64::MIN, 0.25, f64::MAX]]);
}

#[test]
fn test_sequence_with_typed_nulls() {
    round_trip(vec![Some("first".to_string()), None, Some(String::new())]);
    round_trip(vec![None::<i32>, None, Some(-5)]);

    let bytes = encode_sequence(
        vec![Some(1u16), None],
        &SerializationSettings::default(),
    )
    .unwrap();
    let raw: Vec<Value> = decode_sequence(&bytes).unwrap();
    assert_eq!(raw, vec![Value::U16(1), Value::Absent(TypeTag::U16)]);
}

#[test]
fn test_bare_type_rejects_null_element() {
    let bytes = encode_sequence(vec![Some(1i32), None], &SerializationSettings::default()).unwrap();
    assert!(matches!(
        decode_sequence::<i32>(&bytes),
        Err(AudalfError::TypeMismatch { .. })
    ));
}

#[test]
fn test_heterogeneous_value_sequence() {
    let values = vec![
        Value::U8(1),
        Value::from("two"),
        Value::F64Array(vec![3.0]),
        Value::F16(f16::from_f32(-2.0)),
        Value::Absent(TypeTag::Boolean),
    ];
    let bytes = encode_sequence_with_null_kind(
        values.clone(),
        Some(ValueKind::Bool),
        &SerializationSettings::default(),
    )
    .unwrap();
    assert_eq!(decode_sequence::<Value>(&bytes).unwrap(), values);
}

fn sample_instant() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2019, 11, 23, 18, 45, 12)
        .unwrap()
}

#[test]
fn test_timestamp_formats_differ_on_wire_but_agree_on_instant() {
    let instant = sample_instant();
    let encode = |format| {
        encode_sequence(
            [instant],
            &SerializationSettings::with_timestamp_format(format),
        )
        .unwrap()
    };

    let seconds = encode(TimestampFormat::UnixSeconds);
    let millis = encode(TimestampFormat::UnixMilliseconds);
    let iso = encode(TimestampFormat::Iso8601);
    assert_ne!(seconds, millis);
    assert_ne!(seconds, iso);
    assert_ne!(millis, iso);

    for bytes in [&seconds, &millis, &iso] {
        let decoded: Vec<DateTime<Utc>> = decode_sequence(bytes).unwrap();
        assert_eq!(decoded, vec![instant.with_timezone(&Utc)]);
    }
}

#[test]
fn test_iso8601_keeps_offset_and_sub_second_precision() {
    let instant = sample_instant() + chrono::Duration::nanoseconds(123_456_700);
    let bytes = encode_sequence([instant], &SerializationSettings::default()).unwrap();

    let aware: Vec<DateTime<FixedOffset>> = decode_sequence(&bytes).unwrap();
    assert_eq!(aware[0], instant);
    assert_eq!(aware[0].offset().local_minus_utc(), 3 * 3600);
}

#[test]
fn test_iso8601_offset_with_seconds_keeps_instant() {
    let odd = FixedOffset::east_opt(3661)
        .unwrap()
        .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .unwrap();
    for format in [
        TimestampFormat::UnixSeconds,
        TimestampFormat::UnixMilliseconds,
        TimestampFormat::Iso8601,
    ] {
        let bytes =
            encode_sequence([odd], &SerializationSettings::with_timestamp_format(format)).unwrap();
        let decoded: Vec<DateTime<FixedOffset>> = decode_sequence(&bytes).unwrap();
        assert_eq!(decoded[0], odd, "{format:?}");
        assert_eq!(decoded[0].timestamp(), odd.timestamp(), "{format:?}");
    }
}

/// Single-element sequence: header, one offset, index at 40, tag at 48, payload at 56
fn with_tag_patched(bytes: &mut [u8], tag: TypeTag) {
    bytes[48..56].copy_from_slice(&tag.to_le_bytes());
}

#[test]
fn test_unparsable_iso8601_text_is_invalid_payload() {
    let mut bytes = encode_sequence(["not a date"], &SerializationSettings::default()).unwrap();
    with_tag_patched(&mut bytes, TypeTag::TimestampIso8601);

    let err = decode_sequence::<Value>(&bytes).unwrap_err();
    assert!(matches!(
        err,
        AudalfError::InvalidPayload { tag, offset: 64, .. } if tag == TypeTag::TimestampIso8601.raw()
    ));
    assert!(err.to_string().contains("not a date"));
}

#[test]
fn test_out_of_range_epoch_counts_are_invalid_payload() {
    for tag in [TypeTag::TimestampUnixSeconds, TypeTag::TimestampUnixMilliseconds] {
        let mut bytes = encode_sequence([i64::MAX], &SerializationSettings::default()).unwrap();
        with_tag_patched(&mut bytes, tag);

        let err = decode_sequence::<Value>(&bytes).unwrap_err();
        assert!(
            matches!(err, AudalfError::InvalidPayload { offset: 56, .. }),
            "{tag:?}: {err}"
        );
        assert!(err.to_string().contains("outside the representable calendar range"));
    }
}

#[test]
fn test_epoch_formats_truncate_precision() {
    let instant = sample_instant() + chrono::Duration::milliseconds(789);

    let bytes = encode_sequence(
        [instant],
        &SerializationSettings::with_timestamp_format(TimestampFormat::UnixSeconds),
    )
    .unwrap();
    let decoded: Vec<DateTime<Utc>> = decode_sequence(&bytes).unwrap();
    assert_eq!(decoded[0], sample_instant().with_timezone(&Utc));

    let bytes = encode_sequence(
        [instant],
        &SerializationSettings::with_timestamp_format(TimestampFormat::UnixMilliseconds),
    )
    .unwrap();
    let decoded: Vec<DateTime<Utc>> = decode_sequence(&bytes).unwrap();
    assert_eq!(decoded[0], instant.with_timezone(&Utc));
}

#[test]
fn test_naive_timestamps_are_utc() {
    let naive: NaiveDateTime = NaiveDate::from_ymd_opt(1969, 7, 20)
        .unwrap()
        .and_hms_opt(20, 17, 40)
        .unwrap();
    for format in [
        TimestampFormat::UnixSeconds,
        TimestampFormat::UnixMilliseconds,
        TimestampFormat::Iso8601,
    ] {
        let bytes =
            encode_sequence([naive], &SerializationSettings::with_timestamp_format(format)).unwrap();
        let decoded: Vec<NaiveDateTime> = decode_sequence(&bytes).unwrap();
        assert_eq!(decoded, vec![naive], "{format:?}");
    }
}

#[test]
fn test_timestamp_shape_setting_picks_value_variant() {
    let bytes = encode_sequence([sample_instant()], &SerializationSettings::default()).unwrap();

    let naive: Vec<Value> = decode_sequence(&bytes).unwrap();
    assert!(matches!(naive[0], Value::DateTime(_)));

    let aware: Vec<Value> = decode_sequence_with(
        &bytes,
        &DeserializationSettings::with_timestamp_shape(TimestampShape::OffsetAware),
    )
    .unwrap();
    assert_eq!(aware[0], Value::DateTimeOffset(sample_instant()));
}

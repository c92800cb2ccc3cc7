#![allow(missing_docs)]

use stasis::{Options, Scalar, Stasis, Value};

fn engine() -> Stasis {
    Stasis::new()
}

fn round_trip(value: &Value) -> stasis::Result<Value> {
    let engine = engine();
    let bytes = engine.serialize(value, Options::default())?;
    engine.deserialize(&bytes, Options::default())
}

// --- PRIMITIVES ---

/// Every supported atomic value survives a full byte round-trip unchanged.
#[test]
fn test_primitive_round_trips() -> stasis::Result<()> {
    let cases = vec![
        Value::Null,
        Value::from(true),
        Value::from(false),
        Value::from(0i64),
        Value::from(i64::MAX),
        Value::from(i64::MIN),
        Value::from(-2.5f64),
        Value::from(""),
        Value::from("héllo wörld ✓"),
        Value::bytes(vec![0u8, 1, 2, 255]),
    ];

    for case in cases {
        let restored = round_trip(&case)?;
        assert_eq!(case, restored, "round-trip changed {case:?}");
    }
    Ok(())
}

#[test]
fn test_nested_containers() -> stasis::Result<()> {
    let root = Value::map([
        ("numbers", Value::list((0..100).map(Value::from).collect())),
        (
            "inner",
            Value::map([("flag", Value::from(true)), ("name", Value::from("nested"))]),
        ),
        ("empty_list", Value::empty_list()),
        ("empty_map", Value::empty_map()),
    ]);

    let restored = round_trip(&root)?;
    assert_eq!(root, restored);
    Ok(())
}

// --- IDENTITY ---

/// Two fields holding the same list before serialization hold the *same*
/// list after reconstruction — identity, not just equality.
#[test]
fn test_identity_preserved_for_shared_values() -> stasis::Result<()> {
    let shared = Value::list(vec![Value::from(1), Value::from(2)]);
    let root = Value::map([("a", shared.clone()), ("b", shared)]);

    let restored = round_trip(&root)?;

    let a = restored.key("a").expect("field a");
    let b = restored.key("b").expect("field b");
    assert!(a.ptr_eq(&b), "shared structure was duplicated");

    // Mutating through one alias is visible through the other.
    a.as_list().expect("list").borrow_mut().push(Value::from(3));
    assert_eq!(b.as_list().expect("list").borrow().len(), 3);
    Ok(())
}

/// A directly self-referential list serializes in bounded space and
/// reconstructs to a value containing itself.
#[test]
fn test_self_cycle() -> stasis::Result<()> {
    let a = Value::empty_list();
    a.as_list().expect("list").borrow_mut().push(a.clone());

    let restored = round_trip(&a)?;
    let first = restored.index(0).expect("element");
    assert!(first.ptr_eq(&restored), "cycle was not restored to itself");
    Ok(())
}

#[test]
fn test_mutual_cycle() -> stasis::Result<()> {
    let a = Value::empty_map();
    let b = Value::empty_map();
    a.as_map()
        .expect("map")
        .borrow_mut()
        .insert("b".into(), b.clone());
    b.as_map()
        .expect("map")
        .borrow_mut()
        .insert("a".into(), a.clone());

    let restored_a = round_trip(&a)?;
    let through = restored_a
        .key("b")
        .and_then(|b| b.key("a"))
        .expect("a.b.a");
    assert!(through.ptr_eq(&restored_a));
    Ok(())
}

/// The IR itself stays finite for cyclic input: the revisit becomes a
/// reference node instead of a repeated subtree.
#[test]
fn test_cycle_produces_reference_node() -> stasis::Result<()> {
    let a = Value::empty_list();
    a.as_list().expect("list").borrow_mut().push(a.clone());

    let ir = engine().serialize_ir(&a, Options::default())?;
    let summary = ir.summary();
    assert_eq!(summary.nodes, 2); // the sequence and the back-reference
    assert_eq!(summary.references, 1);
    Ok(())
}

// --- ENVELOPE ---

#[test]
fn test_corrupted_payload_is_rejected() -> stasis::Result<()> {
    let engine = engine();
    let mut bytes = engine.serialize(&Value::from("payload"), Options::default())?;

    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    match engine.deserialize(&bytes, Options::default()) {
        Err(stasis::StasisError::Format(msg)) => {
            assert!(msg.contains("checksum"), "unexpected message: {msg}");
        }
        other => panic!("expected Format error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_wrong_magic_is_rejected() -> stasis::Result<()> {
    let engine = engine();
    let mut bytes = engine.serialize(&Value::Null, Options::default())?;
    bytes[0] = b'X';

    assert!(matches!(
        engine.deserialize(&bytes, Options::default()),
        Err(stasis::StasisError::Format(_))
    ));
    Ok(())
}

#[test]
fn test_truncated_input_is_rejected() {
    let engine = engine();
    assert!(matches!(
        engine.deserialize(&[1, 2, 3], Options::default()),
        Err(stasis::StasisError::Format(_))
    ));
}

// --- FILE CONVENIENCE ---

#[test]
fn test_save_and_load() -> stasis::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.sta");

    let root = Value::map([
        ("title", Value::from("snapshot")),
        ("data", Value::list((0..1000).map(Value::from).collect())),
    ]);

    let engine = engine();
    engine.save(&path, &root)?;
    let restored = engine.load(&path)?;

    assert_eq!(root, restored);
    Ok(())
}

// --- COMPRESSION ---

#[cfg(feature = "lz4_flex")]
#[test]
fn test_compressed_round_trip() -> stasis::Result<()> {
    let root = Value::list(vec![Value::str("abcabcabc".repeat(500)); 16]);

    let compressed_engine = Stasis::builder().compression(true).build();
    let plain_engine = Stasis::new();

    let compressed = compressed_engine.serialize(&root, Options::default())?;
    let plain = plain_engine.serialize(&root, Options::default())?;
    assert!(compressed.len() < plain.len());

    // Decompression is negotiated through the envelope flags, so any engine
    // can read the compressed bytes.
    let restored = plain_engine.deserialize(&compressed, Options::default())?;
    assert_eq!(root, restored);
    Ok(())
}

// --- TRACE ---

#[test]
fn test_trace_records_visit_depths() -> stasis::Result<()> {
    let root = Value::map([(
        "outer",
        Value::list(vec![Value::list(vec![Value::from(1)])]),
    )]);

    let (_ir, trace) = engine().trace_serialize(&root)?;

    // map -> list -> list; scalars are not identity-tracked or traced.
    assert_eq!(trace.len(), 3);
    assert_eq!(trace.max_depth(), 3);
    assert_eq!(trace.events()[0].label, "map");

    let rendered = trace.to_string();
    assert!(rendered.contains("list"));
    Ok(())
}

/// Scalar round-trips using the IR operations directly (no envelope).
#[test]
fn test_ir_round_trip_without_envelope() -> stasis::Result<()> {
    let engine = engine();
    let root = Value::list(vec![Value::from(42), Value::from("x")]);

    let ir = engine.serialize_ir(&root, Options::default())?;
    let restored = engine.deserialize_ir(&ir, Options::default())?;

    assert_eq!(root, restored);
    Ok(())
}

/// Scalar metadata attached by handlers uses the same scalar type the IR
/// uses; sanity-check its equality semantics here.
#[test]
fn test_scalar_equality() {
    assert_eq!(Scalar::Int(1), Scalar::Int(1));
    assert_ne!(Scalar::Int(1), Scalar::Float(1.0));
}

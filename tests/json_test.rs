#![allow(missing_docs)]

use stasis::{ir_to_json, ir_to_jsonable, Options, Stasis, Value};

fn engine() -> Stasis {
    Stasis::new()
}

// --- STRUCTURAL TRANSFORM ---

#[test]
fn test_jsonable_shape_for_containers() -> stasis::Result<()> {
    let root = Value::map([
        ("flag", Value::from(true)),
        ("items", Value::list(vec![Value::from(1), Value::from("x")])),
    ]);

    let structural = engine().to_jsonable(&root, Options::default())?;

    assert_eq!(structural["kind"], "mapping");
    let entries = &structural["entries"];
    assert_eq!(entries["flag"]["kind"], "primitive");
    assert_eq!(entries["flag"]["value"], true);
    assert_eq!(entries["items"]["kind"], "sequence");
    assert_eq!(entries["items"]["items"][0]["value"], 1);
    assert_eq!(entries["items"]["items"][1]["value"], "x");
    Ok(())
}

/// Sharing survives the transform as plain slot/reference fields: a second
/// consumer could reconstruct the identity relationships from the JSON
/// alone.
#[test]
fn test_sharing_is_losslessly_tagged() -> stasis::Result<()> {
    let shared = Value::list(vec![Value::from(1)]);
    let root = Value::map([("a", shared.clone()), ("b", shared)]);

    let structural = engine().to_jsonable(&root, Options::default())?;

    let a = &structural["entries"]["a"];
    let b = &structural["entries"]["b"];
    assert_eq!(a["kind"], "sequence");
    assert_eq!(b["kind"], "reference");
    assert_eq!(a["slot"], b["slot"], "reference must point at the definition");
    Ok(())
}

#[test]
fn test_cyclic_ir_exports_without_recursion() -> stasis::Result<()> {
    let a = Value::empty_list();
    a.as_list().expect("list").borrow_mut().push(a.clone());

    let structural = engine().to_jsonable(&a, Options::default())?;
    assert_eq!(structural["kind"], "sequence");
    assert_eq!(structural["items"][0]["kind"], "reference");
    assert_eq!(structural["items"][0]["slot"], structural["slot"]);
    Ok(())
}

/// Only JSON-safe leaf types appear in the output: bytes become number
/// arrays, every tag is a string, every slot a number.
#[test]
fn test_only_json_safe_leaves() -> stasis::Result<()> {
    let root = Value::list(vec![
        Value::Null,
        Value::from(1.5f64),
        Value::bytes(vec![7u8, 8, 9]),
    ]);

    let structural = engine().to_jsonable(&root, Options::default())?;

    let items = structural["items"].as_array().expect("items array");
    assert!(items[0]["value"].is_null());
    assert!(items[1]["value"].is_f64());
    assert_eq!(items[2]["value"], serde_json::json!([7, 8, 9]));
    Ok(())
}

// --- TEXT RENDERING ---

#[test]
fn test_json_text_is_pretty_and_sorted() -> stasis::Result<()> {
    let root = Value::map([("zeta", Value::from(1)), ("alpha", Value::from(2))]);
    let text = engine().to_json(&root, Options::default())?;

    // Two-space indentation.
    assert!(text.contains("\n  \"entries\""));
    // Keys render in sorted order.
    let alpha = text.find("\"alpha\"").expect("alpha key");
    let zeta = text.find("\"zeta\"").expect("zeta key");
    assert!(alpha < zeta);
    Ok(())
}

#[test]
fn test_compact_and_custom_indent() -> stasis::Result<()> {
    let engine = engine();
    let ir = engine.serialize_ir(&Value::list(vec![Value::from(1)]), Options::default())?;

    let compact = ir_to_json(&ir, 0)?;
    assert!(!compact.contains('\n'));

    let wide = ir_to_json(&ir, 4)?;
    assert!(wide.contains("\n    \""));
    Ok(())
}

/// The transform is pure: exporting consumes existing IR without touching
/// handlers, so an engine with no handlers can export anything.
#[test]
fn test_transform_needs_no_handlers() -> stasis::Result<()> {
    let root = Value::list(vec![Value::from(1)]);
    let ir = engine().serialize_ir(&root, Options::default())?;

    // Free function, no engine involved at all.
    let structural = ir_to_jsonable(&ir);
    assert_eq!(structural["kind"], "sequence");
    Ok(())
}

/// Round-trip of the structural output through serde_json text stays
/// stable.
#[test]
fn test_structural_output_is_valid_json() -> stasis::Result<()> {
    let root = Value::map([("k", Value::list(vec![Value::from(1), Value::from(2)]))]);
    let structural = engine().to_jsonable(&root, Options::default())?;

    let text = serde_json::to_string(&structural).expect("serializable");
    let reparsed: serde_json::Value = serde_json::from_str(&text).expect("parseable");
    assert_eq!(structural, reparsed);
    Ok(())
}

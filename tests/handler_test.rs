#![allow(missing_docs)]

use std::any::Any;

use stasis::{
    CustomReconstructor, CustomState, Decoder, Encoder, Handler, IrNode, Options, Rebuilt, Stasis,
    StasisError, Value,
};

// --- MOCK RESOURCES ---

/// A stand-in for a resource that is fully reconstructable from data.
#[derive(Debug)]
struct FileTag {
    path: String,
}

impl stasis::Resource for FileTag {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "test.file_tag"
    }
}

struct FileTagHandler;

impl Handler for FileTagHandler {
    fn id(&self) -> &'static str {
        "file_tag"
    }

    fn matches(&self, value: &Value) -> bool {
        value.as_resource::<FileTag>().is_some()
    }

    fn extract(&self, value: &Value, enc: &mut Encoder<'_>) -> stasis::Result<IrNode> {
        let tag = value
            .as_resource::<FileTag>()
            .ok_or_else(|| StasisError::Internal("dispatched to wrong handler".into()))?;
        let state = Value::map([("path", Value::from(tag.path.as_str()))]);
        enc.build(&state)
    }

    fn reconstruct(
        &self,
        state: &IrNode,
        _shell: Option<&Value>,
        dec: &mut Decoder<'_>,
    ) -> stasis::Result<Rebuilt> {
        let state = dec.rebuild(state)?;
        let path = state
            .key("path")
            .and_then(|v| v.as_str().map(String::from))
            .ok_or_else(|| StasisError::Deserialization {
                detail: "missing required key: path".into(),
                handler: None,
                path: Vec::new(),
            })?;
        Ok(Rebuilt::Live(Value::resource(FileTag { path })))
    }
}

/// A catch-all handler claiming every resource. Registered after the
/// specific one in dispatch tests.
struct AnyResourceHandler;

impl Handler for AnyResourceHandler {
    fn id(&self) -> &'static str {
        "any_resource"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Resource(_))
    }

    fn extract(&self, _value: &Value, enc: &mut Encoder<'_>) -> stasis::Result<IrNode> {
        enc.build(&Value::Null)
    }

    fn reconstruct(
        &self,
        _state: &IrNode,
        _shell: Option<&Value>,
        _dec: &mut Decoder<'_>,
    ) -> stasis::Result<Rebuilt> {
        Ok(Rebuilt::Live(Value::Null))
    }
}

/// A handler that always fails during extraction, for error-path tests.
struct BombHandler;

#[derive(Debug)]
struct Bomb;

impl stasis::Resource for Bomb {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "test.bomb"
    }
}

impl Handler for BombHandler {
    fn id(&self) -> &'static str {
        "bomb"
    }

    fn matches(&self, value: &Value) -> bool {
        value.as_resource::<Bomb>().is_some()
    }

    fn extract(&self, _value: &Value, _enc: &mut Encoder<'_>) -> stasis::Result<IrNode> {
        Err(StasisError::Internal("kaboom".into()))
    }

    fn reconstruct(
        &self,
        _state: &IrNode,
        _shell: Option<&Value>,
        _dec: &mut Decoder<'_>,
    ) -> stasis::Result<Rebuilt> {
        Err(StasisError::Internal("unreachable".into()))
    }
}

// --- DISPATCH ---

#[test]
fn test_handler_round_trip() -> stasis::Result<()> {
    let engine = Stasis::builder().handler(FileTagHandler).build();

    let root = Value::map([(
        "log",
        Value::resource(FileTag {
            path: "/var/log/app.log".into(),
        }),
    )]);

    let bytes = engine.serialize(&root, Options::default())?;
    let restored = engine.deserialize(&bytes, Options::default())?;

    let tag = restored.key("log").expect("field");
    let tag = tag.as_resource::<FileTag>().expect("a FileTag again");
    assert_eq!(tag.path, "/var/log/app.log");
    Ok(())
}

/// Registration order is dispatch priority: the first matching handler
/// wins, so the specific handler must beat the catch-all it precedes.
#[test]
fn test_first_registered_handler_wins() -> stasis::Result<()> {
    let engine = Stasis::builder()
        .handler(FileTagHandler)
        .handler(AnyResourceHandler)
        .build();

    let value = Value::resource(FileTag { path: "p".into() });
    let ir = engine.serialize_ir(&value, Options::default())?;

    match &ir {
        IrNode::Handled { handler, .. } => assert_eq!(handler, "file_tag"),
        other => panic!("expected handled node, got {other:?}"),
    }
    Ok(())
}

/// Reversed registration flips the outcome: the catch-all now shadows the
/// specific handler. Order is configuration, not an accident.
#[test]
fn test_registration_order_is_visible_configuration() -> stasis::Result<()> {
    let engine = Stasis::builder()
        .handler(AnyResourceHandler)
        .handler(FileTagHandler)
        .build();

    let value = Value::resource(FileTag { path: "p".into() });
    let ir = engine.serialize_ir(&value, Options::default())?;

    match &ir {
        IrNode::Handled { handler, .. } => assert_eq!(handler, "any_resource"),
        other => panic!("expected handled node, got {other:?}"),
    }
    Ok(())
}

/// The dispatch cache may be cleared at any time without changing results.
#[test]
fn test_cache_clear_is_transparent() -> stasis::Result<()> {
    let engine = Stasis::builder().handler(FileTagHandler).build();
    let value = Value::resource(FileTag { path: "p".into() });

    let before = engine.serialize_ir(&value, Options::default())?;
    engine.handlers().clear_cache();
    let after = engine.serialize_ir(&value, Options::default())?;

    assert_eq!(before, after);
    Ok(())
}

// --- UNSUPPORTED VALUES ---

#[derive(Debug)]
struct Mystery;

impl stasis::Resource for Mystery {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "test.mystery"
    }
}

/// A value nothing claims degrades to an opaque node instead of raising.
#[test]
fn test_unsupported_degrades_to_opaque() -> stasis::Result<()> {
    let engine = Stasis::new();
    let root = Value::list(vec![Value::from(1), Value::resource(Mystery)]);

    let ir = engine.serialize_ir(&root, Options::default())?;
    let restored = engine.deserialize_ir(&ir, Options::default())?;

    // The slot still round-trips; the payload is an inert placeholder.
    let placeholder = restored.index(1).expect("element");
    let rc = placeholder.as_reconnector().expect("placeholder");
    assert_eq!(rc.type_tag(), "test.mystery");
    assert!(!rc.can_reconnect());
    Ok(())
}

/// Debug mode escalates the degradation to a typed error.
#[test]
fn test_unsupported_escalates_in_debug() {
    let engine = Stasis::new();
    let root = Value::list(vec![Value::resource(Mystery)]);

    match engine.serialize_ir(&root, Options::debug()) {
        Err(StasisError::Unsupported { type_name, path }) => {
            assert_eq!(type_name, "test.mystery");
            assert_eq!(path, vec!["list".to_string(), "test.mystery".to_string()]);
        }
        other => panic!("expected Unsupported, got {other:?}"),
    }
}

// --- FAILURE PATHS ---

/// A handler failure at depth N carries the full ancestor chain, in order,
/// when debug is on.
#[test]
fn test_debug_error_path_names_ancestors() {
    let engine = Stasis::builder().handler(BombHandler).build();

    let root = Value::map([("layer", Value::list(vec![Value::resource(Bomb)]))]);

    match engine.serialize_ir(&root, Options::debug()) {
        Err(err @ StasisError::Serialization { .. }) => {
            assert_eq!(
                err.path().to_vec(),
                vec![
                    "map".to_string(),
                    "list".to_string(),
                    "test.bomb".to_string()
                ]
            );
            match err {
                StasisError::Serialization {
                    handler, message, ..
                } => {
                    assert_eq!(handler.as_deref(), Some("bomb"));
                    assert!(message.contains("kaboom"));
                }
                _ => unreachable!(),
            }
        }
        other => panic!("expected Serialization error, got {other:?}"),
    }
}

/// Without debug, the same failure is terse: no path trail.
#[test]
fn test_non_debug_error_is_terse() {
    let engine = Stasis::builder().handler(BombHandler).build();
    let root = Value::list(vec![Value::resource(Bomb)]);

    match engine.serialize_ir(&root, Options::default()) {
        Err(err) => assert!(err.path().is_empty()),
        Ok(_) => panic!("expected failure"),
    }
}

/// Deserializing a handled node with no matching handler registered is a
/// typed deserialization failure, not a panic.
#[test]
fn test_missing_handler_on_decode() -> stasis::Result<()> {
    let writer = Stasis::builder().handler(FileTagHandler).build();
    let reader = Stasis::new();

    let bytes = writer.serialize(
        &Value::resource(FileTag { path: "p".into() }),
        Options::default(),
    )?;

    match reader.deserialize(&bytes, Options::default()) {
        Err(StasisError::Deserialization { detail, .. }) => {
            assert!(detail.contains("file_tag"), "unexpected detail: {detail}");
        }
        other => panic!("expected Deserialization error, got {other:?}"),
    }
    Ok(())
}

// --- CUSTOM OVERRIDES ---

#[derive(Debug)]
struct Token {
    secret: String,
}

impl CustomState for Token {
    fn origin(&self) -> &'static str {
        "test.token"
    }

    fn capture(&self, enc: &mut Encoder<'_>) -> stasis::Result<IrNode> {
        enc.build(&Value::from(format!("custom:{}", self.secret)))
    }
}

impl stasis::Resource for Token {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "test.token"
    }

    fn as_custom(&self) -> Option<&dyn CustomState> {
        Some(self)
    }
}

fn rebuild_token(
    state: &IrNode,
    _shell: Option<&Value>,
    dec: &mut Decoder<'_>,
) -> stasis::Result<Value> {
    let state = dec.rebuild(state)?;
    let text = state.as_str().unwrap_or_default();
    let secret = text.strip_prefix("custom:").unwrap_or(text).to_string();
    Ok(Value::resource(Token { secret }))
}

fn token_engine() -> Stasis {
    Stasis::builder()
        // The catch-all would happily claim Token; the override must win.
        .handler(AnyResourceHandler)
        .custom("test.token", CustomReconstructor::new(rebuild_token))
        .build()
}

/// A type with both a custom override and a matching generic handler uses
/// the override, on both sides.
#[test]
fn test_custom_override_beats_handlers() -> stasis::Result<()> {
    let engine = token_engine();
    let value = Value::resource(Token {
        secret: "s3cr3t".into(),
    });

    let ir = engine.serialize_ir(&value, Options::default())?;
    match &ir {
        IrNode::Custom { origin, .. } => assert_eq!(origin, "test.token"),
        other => panic!("expected custom node, got {other:?}"),
    }

    let restored = engine.deserialize_ir(&ir, Options::default())?;
    let token = restored.as_resource::<Token>().expect("a Token again");
    assert_eq!(token.secret, "s3cr3t");
    Ok(())
}

#[test]
fn test_unknown_origin_on_decode() -> stasis::Result<()> {
    let writer = token_engine();
    let reader = Stasis::new();

    let bytes = writer.serialize(
        &Value::resource(Token { secret: "x".into() }),
        Options::default(),
    )?;

    assert!(matches!(
        reader.deserialize(&bytes, Options::default()),
        Err(StasisError::Deserialization { .. })
    ));
    Ok(())
}

// --- SHARED STATE THROUGH HANDLERS ---

/// Handler state goes through the same identity map as the rest of the
/// graph: a value shared between plain structure and handler state is not
/// duplicated.
#[derive(Debug)]
struct Wrapper {
    inner: Value,
}

impl stasis::Resource for Wrapper {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        "test.wrapper"
    }
}

struct WrapperHandler;

impl Handler for WrapperHandler {
    fn id(&self) -> &'static str {
        "wrapper"
    }

    fn matches(&self, value: &Value) -> bool {
        value.as_resource::<Wrapper>().is_some()
    }

    fn extract(&self, value: &Value, enc: &mut Encoder<'_>) -> stasis::Result<IrNode> {
        let wrapper = value
            .as_resource::<Wrapper>()
            .ok_or_else(|| StasisError::Internal("dispatched to wrong handler".into()))?;
        enc.build(&wrapper.inner)
    }

    fn reconstruct(
        &self,
        state: &IrNode,
        _shell: Option<&Value>,
        dec: &mut Decoder<'_>,
    ) -> stasis::Result<Rebuilt> {
        let inner = dec.rebuild(state)?;
        Ok(Rebuilt::Live(Value::resource(Wrapper { inner })))
    }
}

#[test]
fn test_handler_state_shares_identity_with_graph() -> stasis::Result<()> {
    let engine = Stasis::builder().handler(WrapperHandler).build();

    let shared = Value::list(vec![Value::from(7)]);
    let root = Value::map([
        ("plain", shared.clone()),
        ("wrapped", Value::resource(Wrapper { inner: shared })),
    ]);

    let bytes = engine.serialize(&root, Options::default())?;
    let restored = engine.deserialize(&bytes, Options::default())?;

    let plain = restored.key("plain").expect("field");
    let wrapped = restored.key("wrapped").expect("field");
    let inner = &wrapped.as_resource::<Wrapper>().expect("wrapper").inner;
    assert!(plain.ptr_eq(inner));
    Ok(())
}

// --- ENGINE PROPERTIES ---

#[test]
fn test_engine_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Stasis>();
}

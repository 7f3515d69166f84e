mod common;

use std::sync::Arc;

use common::{geo, lambda};
use tether_runtime::{ConversionError, Context, NativeHandle, NativeObject, NativeValue, Value};

fn square_context(side: f64) -> Context {
    Context::new(vec![])
        .with("side", Value::Float(side))
        .with(
            "area",
            Value::Function(lambda("area", 0, move |_| Ok(Value::Float(side * side)))),
        )
        .with(
            "ScaleBy",
            Value::Function(lambda("ScaleBy", 1, move |args| match &args[0] {
                Value::Float(f) => Ok(Value::Float(side * f)),
                other => Ok(other.clone()),
            })),
        )
}

#[test]
fn script_objects_implement_interfaces() {
    let fx = geo();
    let shape = fx.shape("geo.Shape");
    let ctx = square_context(3.0);
    let NativeValue::Interface(Some(obj)) = fx.rt.from_script(shape, &Value::Context(ctx)).unwrap() else {
        panic!("expected an interface value");
    };
    assert_eq!(obj.type_name(), "geo.Shape");
    assert_eq!(obj.call_method("Area", &[]).unwrap(), vec![NativeValue::Float(9.0)]);
    assert_eq!(
        obj.call_method("ScaleBy", &[NativeValue::Float(2.0)]).unwrap(),
        vec![NativeValue::Float(6.0)]
    );
    assert!(obj.call_method("Perimeter", &[]).is_err());
}

#[test]
fn synthesized_objects_return_their_context() {
    let fx = geo();
    let shape = fx.shape("geo.Shape");
    let ctx = square_context(1.0);
    let native = fx.rt.from_script(shape, &Value::Context(ctx.clone())).unwrap();
    let Value::Context(back) = fx.rt.to_script(shape, &native).unwrap() else {
        panic!("expected the original context");
    };
    assert!(back.ptr_eq(&ctx));
}

#[test]
fn slot_arity_must_match_the_method() {
    let fx = geo();
    let shape = fx.shape("geo.Shape");
    let ctx = square_context(1.0).with(
        "ScaleBy",
        Value::Function(lambda("ScaleBy", 2, |_| Ok(Value::None))),
    );
    let err = fx.rt.from_script(shape, &Value::Context(ctx)).unwrap_err();
    let ConversionError::InterfaceSynthesis {
        interface,
        method,
        expected_arity,
        ..
    } = err
    else {
        panic!("expected a synthesis error, got {err:?}");
    };
    assert_eq!(interface, "geo.Shape");
    assert_eq!(method, "ScaleBy");
    assert_eq!(expected_arity, 1);
}

#[test]
fn missing_slots_name_both_spellings() {
    let fx = geo();
    let shape = fx.shape("geo.Shape");
    let ctx = Context::new(vec![(
        "area".into(),
        Value::Function(lambda("area", 0, |_| Ok(Value::Float(0.0)))),
    )]);
    let err = fx.rt.from_script(shape, &Value::Context(ctx)).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("ScaleBy"), "{message}");
    assert!(message.contains("scale_by"), "{message}");
}

#[derive(Debug)]
struct Square(f64);

impl NativeObject for Square {
    fn type_name(&self) -> &str {
        "geo.Square"
    }

    fn call_method(&self, method: &str, args: &[NativeValue]) -> Result<Vec<NativeValue>, ConversionError> {
        match (method, args) {
            ("Area", []) => Ok(vec![NativeValue::Float(self.0 * self.0)]),
            ("ScaleBy", [NativeValue::Float(f)]) => Ok(vec![NativeValue::Float(self.0 * f)]),
            _ => Err(ConversionError::Failure {
                detail: format!("bad call {method}"),
            }),
        }
    }
}

#[test]
fn native_objects_are_callable_from_scripts() {
    let fx = geo();
    let shape = fx.shape("geo.Shape");
    let square: Arc<dyn NativeObject> = Arc::new(Square(2.0));
    let value = fx
        .rt
        .to_script(shape, &NativeValue::Interface(Some(square.clone())))
        .unwrap();
    let Value::Native(handle) = &value else {
        panic!("expected a native handle, got {value:?}");
    };
    assert_eq!(handle.type_name(), "geo.Shape");

    assert_eq!(
        fx.rt.call_method(&value, "ScaleBy", vec![Value::Int(3)]).unwrap(),
        Value::Float(6.0)
    );
    assert!(matches!(
        fx.rt.call_method(&value, "Area", vec![Value::Int(3)]).unwrap_err(),
        ConversionError::ArityMismatch { expected: 0, actual: 1, .. }
    ));

    let NativeValue::Interface(Some(back)) = fx.rt.from_script(shape, &value).unwrap() else {
        panic!("expected an interface value");
    };
    assert!(Arc::ptr_eq(&back, &square));
}

#[test]
fn handles_of_other_interfaces_are_rejected() {
    let fx = geo();
    let shape = fx.shape("geo.Shape");
    let square: Arc<dyn NativeObject> = Arc::new(Square(2.0));
    let reader = Value::Native(NativeHandle::new("io.Reader", NativeValue::Interface(Some(square))));
    assert_eq!(
        fx.rt.from_script(shape, &reader).unwrap_err(),
        ConversionError::TypeMismatch {
            expected: "geo.Shape".into(),
            actual: "native io.Reader".into(),
        }
    );
}

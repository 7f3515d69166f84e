mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{eventually, geo, Fixture};
use tether_core::ShapeKind;
use tether_runtime::{
    BridgeState, BridgeTable, ConversionError, NativeChan, NativeValue, Record, ScriptChan, Value,
};

fn table(fx: &Fixture, label: &str) -> Arc<BridgeTable> {
    let shape = fx.shape(label);
    match fx.rt.shape(shape).unwrap().kind {
        ShapeKind::Chan { direction, element } => fx.rt.bridge_table(element, direction),
        ref other => panic!("expected a chan shape, got {other:?}"),
    }
}

fn to_script(fx: &Fixture, label: &str, native: &NativeChan) -> ScriptChan {
    let value = fx
        .rt
        .to_script(fx.shape(label), &NativeValue::Chan(Some(native.clone())))
        .unwrap();
    match value {
        Value::Channel(script) => script,
        other => panic!("expected a channel, got {other:?}"),
    }
}

#[test]
fn one_native_channel_maps_to_one_script_channel() {
    let fx = geo();
    let native = NativeChan::bounded(4);
    let first = to_script(&fx, "chan Point", &native);
    let second = to_script(&fx, "chan Point", &native);
    assert_eq!(first, second);

    let back = fx
        .rt
        .from_script(fx.shape("chan Point"), &Value::Channel(first.clone()))
        .unwrap();
    let NativeValue::Chan(Some(back)) = back else {
        panic!("expected a native channel");
    };
    assert!(back.ptr_eq(&native));

    let bridges = table(&fx, "chan Point");
    assert_eq!(bridges.len(), 1);
    assert_eq!(bridges.state(native.id()), BridgeState::Active);
    assert_eq!(bridges.state(first.id()), BridgeState::Active);
    native.close();
}

#[test]
fn native_values_reach_the_script_converted() {
    let fx = geo();
    let native = NativeChan::unbounded();
    let script = to_script(&fx, "<-chan int", &native);
    native.send(NativeValue::Int(7)).unwrap();
    native.send(NativeValue::Int(8)).unwrap();
    assert_eq!(script.recv(), Some(Value::Int(7)));
    assert_eq!(script.recv(), Some(Value::Int(8)));
    native.close();
}

#[test]
fn native_close_drains_then_closes_the_script_side() {
    let fx = geo();
    let native = NativeChan::unbounded();
    let script = to_script(&fx, "<-chan int", &native);
    for i in 0..3 {
        native.send(NativeValue::Int(i)).unwrap();
    }
    assert!(native.close());

    let received: Vec<Value> = std::iter::from_fn(|| script.recv()).collect();
    assert_eq!(received, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
    assert!(eventually(|| script.is_closed()));
    assert!(!script.close());
    assert!(!native.close());

    let bridges = table(&fx, "<-chan int");
    assert!(eventually(|| bridges.state(native.id()) == BridgeState::Absent));
    assert!(bridges.is_empty());
}

#[test]
fn script_sends_on_receive_only_channels_are_protocol_errors() {
    let fx = geo();
    let native = NativeChan::unbounded();
    let script = to_script(&fx, "<-chan int", &native);
    script.send(Value::Int(1)).unwrap();
    assert!(eventually(|| !fx.sink.is_empty()));
    assert!(matches!(
        fx.sink.errors()[0],
        ConversionError::Protocol { .. }
    ));
    assert!(native.is_empty());
    native.close();
}

#[test]
fn script_close_flushes_and_closes_the_native_side() {
    let fx = geo();
    let script = ScriptChan::new();
    let shape = fx.shape("chan<- string");
    let NativeValue::Chan(Some(native)) = fx.rt.from_script(shape, &Value::Channel(script.clone())).unwrap()
    else {
        panic!("expected a native channel");
    };

    script.send(Value::from("a")).unwrap();
    script.send(Value::from("b")).unwrap();
    assert!(script.close());
    assert!(!script.close());

    assert_eq!(native.recv(), Some(NativeValue::String("a".into())));
    assert_eq!(native.recv(), Some(NativeValue::String("b".into())));
    assert_eq!(native.recv(), None);
    assert!(!native.close());
    assert!(script.send(Value::from("late")).is_err());
}

#[test]
fn conversion_failures_are_reported_and_skipped() {
    let fx = geo();
    let script = ScriptChan::new();
    let shape = fx.shape("chan<- string");
    let NativeValue::Chan(Some(native)) = fx.rt.from_script(shape, &Value::Channel(script.clone())).unwrap()
    else {
        panic!("expected a native channel");
    };

    script.send(Value::Int(5)).unwrap();
    script.send(Value::from("ok")).unwrap();
    assert_eq!(native.recv(), Some(NativeValue::String("ok".into())));
    assert_eq!(
        fx.sink.errors(),
        vec![ConversionError::TypeMismatch {
            expected: "string".into(),
            actual: "int".into()
        }]
    );
    script.close();
}

#[test]
fn nil_channels() {
    let fx = geo();
    let shape = fx.shape("chan Point");
    assert_eq!(fx.rt.to_script(shape, &NativeValue::Chan(None)).unwrap(), Value::None);
    assert_eq!(fx.rt.from_script(shape, &Value::Int(0)).unwrap(), NativeValue::Chan(None));
    assert!(fx.rt.from_script(shape, &Value::Int(2)).is_err());
}

fn script_point(x: f64, y: f64) -> Value {
    Value::Record(Record::new(
        "geo.Point",
        vec![("X".into(), Value::Float(x)), ("Y".into(), Value::Float(y))],
    ))
}

fn native_point(x: f64, y: f64) -> NativeValue {
    NativeValue::Struct(vec![NativeValue::Float(x), NativeValue::Float(y)])
}

/// Script to native, then native to script, with no value coming back to
/// its sender.
fn exchange(script: &ScriptChan, native: &NativeChan) {
    for i in 0..5 {
        let x = f64::from(i);
        script.send(script_point(x, 0.0)).unwrap();
        assert_eq!(native.recv(), Some(native_point(x, 0.0)));

        native.send(native_point(0.0, x)).unwrap();
        assert_eq!(script.recv(), Some(script_point(0.0, x)));
    }
    assert_eq!(script.try_recv(), None);
    assert!(native.is_empty());
}

#[test]
fn bidirectional_channels_forward_both_ways() {
    let fx = geo();
    let native = NativeChan::bounded(4);
    let script = to_script(&fx, "chan Point", &native);
    exchange(&script, &native);
    native.close();

    let script = ScriptChan::new();
    let NativeValue::Chan(Some(native)) = fx
        .rt
        .from_script(fx.shape("chan Point"), &Value::Channel(script.clone()))
        .unwrap()
    else {
        panic!("expected a native channel");
    };
    exchange(&script, &native);
    script.close();
    assert!(fx.sink.is_empty(), "{:?}", fx.sink.errors());
}

#[test]
fn concurrent_first_crossings_share_one_pairing() {
    let fx = Arc::new(geo());
    let native = NativeChan::unbounded();
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let fx = Arc::clone(&fx);
            let native = native.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                to_script(&fx, "<-chan int", &native)
            })
        })
        .collect();
    let scripts: Vec<ScriptChan> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(scripts.iter().all(|s| *s == scripts[0]));

    let bridges = table(&fx, "<-chan int");
    assert_eq!(bridges.len(), 1);

    // Closing the native side ends the one pairing.
    native.send(NativeValue::Int(1)).unwrap();
    native.close();
    let received: Vec<Value> = std::iter::from_fn(|| scripts[0].recv()).collect();
    assert_eq!(received, vec![Value::Int(1)]);
    assert!(eventually(|| bridges.is_empty()));
}

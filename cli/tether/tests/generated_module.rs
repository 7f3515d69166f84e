//! The emitter's output for `tests/fixtures/geo.tether.toml`, generated by
//! the build script and compiled against the runtime.

use std::collections::BTreeMap;

use tether_core::Direction;
use tether_gen::Bindings;
use tether_runtime::{
    ConversionError, ExecutionContext, NativeChan, NativeValue, NoEvaluator, Record, Runtime, Value,
};

include!(concat!(env!("OUT_DIR"), "/geo_bindings.rs"));

const MANIFEST: &str = include_str!(concat!(env!("OUT_DIR"), "/geo_bindings.json"));

fn bindings() -> Bindings {
    Bindings::from_json(MANIFEST).unwrap()
}

/// A runtime with the generated shape table and no aliases registered yet.
fn runtime(bindings: &Bindings) -> Runtime {
    Runtime::new(bindings.shapes.clone(), ExecutionContext::new(NoEvaluator))
}

fn point(x: f64, y: f64) -> NativeValue {
    NativeValue::Struct(vec![NativeValue::Float(x), NativeValue::Float(y)])
}

#[test]
fn manifest_loads_with_its_aliases() {
    let bindings = bindings();
    let rt = Runtime::from_manifest(MANIFEST, ExecutionContext::new(NoEvaluator)).unwrap();
    assert_eq!(rt.shapes().len(), bindings.shapes.len());
    assert_eq!(rt.type_names().len(), bindings.aliases.len());
}

#[test]
fn register_type_names_fills_the_alias_table() {
    let bindings = bindings();
    let rt = runtime(&bindings);
    assert!(rt.type_names().is_empty());
    geo_bindings::register_type_names(&rt);
    assert_eq!(bindings.aliases.len(), 1);
    for (alias, listing) in &bindings.aliases {
        assert_eq!(rt.type_names().listing(alias).as_deref(), Some(listing.as_str()));
    }
}

#[test]
fn generated_converters_agree_with_the_interpreter() {
    let bindings = bindings();
    let rt = runtime(&bindings);
    let points = bindings.export("[]Point", Direction::ToScript).unwrap().shape;

    let native = NativeValue::Slice(vec![point(1.0, 2.0), point(3.0, 4.0)]);
    let generated = geo_bindings::to_script_slice_geo_point(&rt, &native).unwrap();
    assert_eq!(generated, rt.to_script(points, &native).unwrap());

    let Value::List(items) = &generated else {
        panic!("expected a list, got {generated:?}");
    };
    assert_eq!(geo_bindings::from_script_geo_point(&rt, &items[1]).unwrap(), point(3.0, 4.0));
}

#[test]
fn self_referential_structs_round_trip() {
    let bindings = bindings();
    let rt = runtime(&bindings);
    let tail = NativeValue::Struct(vec![
        NativeValue::Int(2),
        NativeValue::Pointer(None),
        NativeValue::Func(None),
        NativeValue::Chan(None),
    ]);
    let head = NativeValue::Struct(vec![
        NativeValue::Int(1),
        NativeValue::Pointer(Some(Box::new(tail))),
        NativeValue::Func(None),
        NativeValue::Chan(None),
    ]);

    let value = geo_bindings::to_script_geo_node(&rt, &head).unwrap();
    let Value::Record(record) = &value else {
        panic!("expected a record, got {value:?}");
    };
    let Some(Value::Record(next)) = record.get("Next") else {
        panic!("expected a nested record");
    };
    assert_eq!(next.get("Value"), Some(&Value::Int(2)));
    assert_eq!(next.get("Next"), Some(&Value::None));
    assert_eq!(geo_bindings::from_script_geo_node(&rt, &value).unwrap(), head);
}

#[test]
fn anonymous_struct_errors_name_their_fields() {
    let bindings = bindings();
    let rt = runtime(&bindings);
    geo_bindings::register_type_names(&rt);

    let label = Value::Record(Record::new(
        "geo.Label",
        vec![
            ("Text".into(), Value::from("origin")),
            ("At".into(), Value::Dict(BTreeMap::new())),
        ],
    ));
    let err = geo_bindings::from_script_geo_label(&rt, &label).unwrap_err();
    let ConversionError::InField { field, source } = &err else {
        panic!("expected a field error, got {err:?}");
    };
    assert_eq!(field, "At");
    let ConversionError::MissingField { type_name, .. } = source.as_ref() else {
        panic!("expected a missing field, got {source:?}");
    };
    assert!(type_name.starts_with("Struct_"), "{type_name}");
    assert!(type_name.contains("{X int64}"), "{type_name}");
}

#[test]
fn generated_bridge_accessor_shares_the_runtime_table() {
    let bindings = bindings();
    let rt = runtime(&bindings);
    let native = NativeChan::unbounded();
    let value = geo_bindings::to_script_chan_geo_point(&rt, &NativeValue::Chan(Some(native.clone()))).unwrap();
    assert!(matches!(value, Value::Channel(_)));

    let table = geo_bindings::bridge_geo_point_both(&rt);
    assert_eq!(table.len(), 1);
    native.close();
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tether_core::{Direction, ShapeId};
use tether_gen::{generate, Bindings, Declaration};
use tether_runtime::{
    CollectingSink, Evaluator, ExecutionContext, Runtime, ScriptError, ScriptFunction, Value,
};

pub const GEO: &str = r#"
[package]
name = "geo"

[[types]]
name = "Point"
type = "struct { X float64; Y float64 }"

[[types]]
name = "Polygon"
type = "struct { Name string; Corners [3]Point; Tags map[string]int }"

[[types]]
name = "Shape"
type = "interface { Area() float64; ScaleBy(f float64) float64 }"

[[types]]
name = "Handle"
type = "unsafe.Pointer"

[[types]]
name = "Label"
type = "struct { Text string; At struct { X int } }"

[[functions]]
name = "Distance"
signature = "func(a Point, b Point) float64"

[[functions]]
name = "Parse"
signature = "func(s string) (int, error)"

[[functions]]
name = "Sum"
signature = "func(label string, values ...int) int"

[[functions]]
name = "Apply"
signature = "func(f func(int) (int, string), x int) int"

[[convert]]
type = "*Point"

[[convert]]
type = "chan Point"

[[convert]]
type = "<-chan int"

[[convert]]
type = "chan<- string"
"#;

type Body = dyn Fn(Vec<Value>) -> Result<Value, ScriptError> + Send + Sync;

/// Script function body understood by [`LambdaEvaluator`].
pub struct Lambda(pub Arc<Body>);

pub fn lambda(
    name: &str,
    arity: usize,
    body: impl Fn(Vec<Value>) -> Result<Value, ScriptError> + Send + Sync + 'static,
) -> ScriptFunction {
    ScriptFunction::new(name, arity, Lambda(Arc::new(body)))
}

/// Stand-in interpreter: runs Rust closures as script functions.
#[derive(Default)]
pub struct LambdaEvaluator {
    calls: AtomicUsize,
}

impl LambdaEvaluator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Evaluator for LambdaEvaluator {
    fn call(&self, function: &ScriptFunction, args: Vec<Value>) -> Result<Value, ScriptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match function.body::<Lambda>() {
            Some(Lambda(body)) => body(args),
            None => Err(ScriptError::new(format!("{} is not callable", function.name()))),
        }
    }
}

pub struct Fixture {
    pub rt: Runtime,
    pub sink: Arc<CollectingSink>,
    pub evaluator: Arc<LambdaEvaluator>,
    pub bindings: Bindings,
}

impl Fixture {
    pub fn shape(&self, label: &str) -> ShapeId {
        self.bindings
            .export(label, Direction::ToScript)
            .unwrap_or_else(|| panic!("no export {label}"))
            .shape
    }
}

pub fn geo() -> Fixture {
    let lowered = Declaration::parse(GEO).unwrap().lower().unwrap();
    let bindings = generate(&lowered).unwrap();
    let sink = Arc::new(CollectingSink::new());
    let evaluator = Arc::new(LambdaEvaluator::default());
    let rt = Runtime::with_error_sink(
        bindings.shapes.clone(),
        ExecutionContext::from_arc(evaluator.clone()),
        sink.clone(),
    );
    for (alias, listing) in &bindings.aliases {
        rt.type_names().register_alias(alias, listing);
    }
    Fixture {
        rt,
        sink,
        evaluator,
        bindings,
    }
}

/// Poll until `cond` holds or a generous timeout passes.
pub fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

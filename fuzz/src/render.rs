#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde::Serialize;

#[derive(Debug, Serialize, Arbitrary)]
enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

fuzz_target!(|data: (&str, Vec<(&str, &str)>, BTreeMap<String, Value>)| {
    let (root, includes, globals) = data;
    let mut engine = tessera::Engine::new();
    engine.set_max_include_depth(8);
    if engine.add_template("fuzz.html", root).is_err() {
        return;
    }
    for (name, source) in includes {
        if engine.add_template(name, source).is_err() {
            engine.add_text(name, source);
        }
    }
    let _ = engine.get_template("fuzz.html").unwrap().render(&globals);
});

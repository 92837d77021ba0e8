mod helpers;

use serde_json::json;
use tessera::{Engine, ErrorKind, Value};

use crate::helpers::Writer;

fn render(source: &str, ctx: serde_json::Value) -> tessera::Result<String> {
    Engine::new().compile(source)?.render(ctx)
}

#[test]
fn render_raw() {
    let result = render("lorem ipsum", json!({})).unwrap();
    assert_eq!(result, "lorem ipsum");
}

#[test]
fn render_raw_closing_delimiter_is_text() {
    let result = render("function() { return {}; }}", json!({})).unwrap();
    assert_eq!(result, "function() { return {}; }}");
}

#[test]
fn render_comment() {
    let result = render("lorem {# ipsum #}dolor", json!({})).unwrap();
    assert_eq!(result, "lorem dolor");
}

#[test]
fn render_whitespace_trim() {
    let result = render("lorem \n  {{- ipsum -}}  \n dolor", json!({ "ipsum": 1 })).unwrap();
    assert_eq!(result, "lorem1dolor");
}

#[test]
fn render_inline_expr_bool() {
    let result = render("lorem {{ ipsum }}", json!({ "ipsum": true })).unwrap();
    assert_eq!(result, "lorem true");
}

#[test]
fn render_inline_expr_integer() {
    let result = render("lorem {{ ipsum }}", json!({ "ipsum": 123 })).unwrap();
    assert_eq!(result, "lorem 123");
}

#[test]
fn render_inline_expr_float() {
    let result = render("{{ a }} {{ b }}", json!({ "a": 123.4, "b": 3.0 })).unwrap();
    assert_eq!(result, "123.4 3.0");
}

#[test]
fn render_inline_expr_none() {
    let result = render("lorem {{ ipsum }}!", json!({ "ipsum": null })).unwrap();
    assert_eq!(result, "lorem !");
}

#[test]
fn render_inline_expr_list_and_map() {
    let result = render(
        "{{ list }} {{ map }}",
        json!({ "list": ["a", 1, null], "map": { "x": [1.5] } }),
    )
    .unwrap();
    assert_eq!(result, r#"["a", 1, null] {x: [1.5]}"#);
}

#[test]
fn render_inline_expr_map_index() {
    let result = render(
        "lorem {{ ipsum.dolor }} {{ ipsum['dolor'] }}",
        json!({ "ipsum": { "dolor": "sit" } }),
    )
    .unwrap();
    assert_eq!(result, "lorem sit sit");
}

#[test]
fn render_inline_expr_list_index() {
    let result = render(
        "lorem {{ ipsum.1 }} {{ ipsum[-2] }}",
        json!({ "ipsum": ["sit", "amet"] }),
    )
    .unwrap();
    assert_eq!(result, "lorem amet sit");
}

#[test]
fn render_inline_expr_iteration_list() {
    let result = render("{{ 1, 'a' }} {{ 2, }}", json!({})).unwrap();
    assert_eq!(result, r#"[1, "a"] [2]"#);
}

#[test]
fn render_escapes_html() {
    let result = render("{{ s }}", json!({ "s": "<b>Tom & Jerry</b>" })).unwrap();
    assert_eq!(result, "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
}

#[test]
fn render_safe_is_not_escaped() {
    let result = render("{{ safe(s) }}", json!({ "s": "<br>" })).unwrap();
    assert_eq!(result, "<br>");
}

#[test]
fn render_without_auto_escape() {
    let mut engine = Engine::new();
    engine.set_auto_escape(false);
    let result = engine
        .compile("{{ s }}")
        .unwrap()
        .render(json!({ "s": "<br>" }))
        .unwrap();
    assert_eq!(result, "<br>");
}

#[test]
fn render_if_chain_selects_first_true_branch() {
    let source = "{% if n == 1 %}one{% elif n == 2 %}two{% elif n < 10 %}few{% else %}many{% endif %}";
    for (n, expected) in [(1, "one"), (2, "two"), (5, "few"), (50, "many")] {
        let result = render(source, json!({ "n": n })).unwrap();
        assert_eq!(result, expected);
    }
}

#[test]
fn render_if_without_else_renders_nothing() {
    let result = render("a{% if false %}b{% endif %}c", json!({})).unwrap();
    assert_eq!(result, "ac");
}

#[test]
fn render_if_does_not_evaluate_later_conditions() {
    let result = render("{% if true %}yes{% elif nope %}no{% endif %}", json!({})).unwrap();
    assert_eq!(result, "yes");
}

#[test]
fn render_nested_blocks() {
    let result = render(
        "{% for row in rows %}{% if row %}{% for x in row %}{{ x }}{% endfor %}{% else %}-{% endif %};{% endfor %}",
        json!({ "rows": [[1, 2], [], [3]] }),
    )
    .unwrap();
    assert_eq!(result, "12;-;3;");
}

#[test]
fn render_for_loop() {
    let result = render(
        "{% for x in xs %}{{ loop.index }}:{{ x }}{% if not loop.last %}, {% endif %}{% endfor %}",
        json!({ "xs": ["a", "b", "c"] }),
    )
    .unwrap();
    assert_eq!(result, "0:a, 1:b, 2:c");
}

#[test]
fn render_for_loop_first_and_length() {
    let result = render(
        "{% for x in xs %}{% if loop.first %}{{ loop.length }}{% endif %}{% endfor %}",
        json!({ "xs": [1, 2, 3, 4] }),
    )
    .unwrap();
    assert_eq!(result, "4");
}

#[test]
fn render_for_loop_else() {
    let source = "{% for x in xs %}{{ x }}{% else %}empty{% endfor %}";
    assert_eq!(render(source, json!({ "xs": [] })).unwrap(), "empty");
    assert_eq!(render(source, json!({ "xs": null })).unwrap(), "empty");
    assert_eq!(render(source, json!({ "xs": [1] })).unwrap(), "1");
}

#[test]
fn render_for_loop_map_keys() {
    let result = render(
        "{% for k in m %}{{ k }}={{ m[k] }};{% endfor %}",
        json!({ "m": { "b": 2, "a": 1 } }),
    )
    .unwrap();
    assert_eq!(result, "a=1;b=2;");
}

#[test]
fn render_for_loop_unpack() {
    let result = render(
        "{% for n, s in pairs %}{{ n }}{{ s }} {% endfor %}",
        json!({ "pairs": [[1, "a"], [2, "b"]] }),
    )
    .unwrap();
    assert_eq!(result, "1a 2b ");
}

#[test]
fn render_for_loop_unpack_err_length() {
    let err = render(
        "{% for a, b in pairs %}{% endfor %}",
        json!({ "pairs": [[1, 2, 3]] }),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(
        err.message(),
        "cannot unpack list of length 3 into 2 variables"
    );
}

#[test]
fn render_for_loop_err_not_iterable() {
    let err = render("{% for x in 5 %}{% endfor %}", json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotIterable);
    assert_eq!(
        err.message(),
        "expected iterable, but expression evaluated to integer"
    );
    assert_eq!(err.line_col(), Some((1, 13)));
}

#[test]
fn render_for_loop_vars_do_not_leak() {
    let err = render("{% for x in [1] %}{% endfor %}{{ x }}", json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedName);
}

#[test]
fn render_if_branch_locals_do_not_leak() {
    let err = render("{% if true %}{% let y = 1 %}{% endif %}[{{ y }}]", json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedName);
    assert_eq!(err.message(), "undefined name `y`");

    let source = "{% if false %}{% elif true %}{% set y = 1 %}{{ y }}{% endif %}[{{ y }}]";
    let err = render(source, json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedName);

    let source = "{% for x in [] %}{% else %}{% let y = 1 %}{% endfor %}[{{ y }}]";
    let err = render(source, json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedName);
}

#[test]
fn render_if_branch_set_rebinds_outer_variable() {
    let result = render(
        "{% let y = 1 %}{% if true %}{% set y = 2 %}{% let z = 3 %}{{ y }}{{ z }}{% endif %}{{ y }}",
        json!({}),
    )
    .unwrap();
    assert_eq!(result, "232");
}

#[test]
fn render_set_rebinds_outer_variable() {
    let result = render(
        "{% set total = 0 %}{% for x in xs %}{% set total = total + x %}{% endfor %}{{ total }}",
        json!({ "xs": [1, 2, 3] }),
    )
    .unwrap();
    assert_eq!(result, "6");
}

#[test]
fn render_let_shadows_inside_loop() {
    let result = render(
        "{% let y = 'outer' %}{% for x in xs %}{% let y = x %}{{ y }}{% endfor %} {{ y }}",
        json!({ "xs": [1, 2] }),
    )
    .unwrap();
    assert_eq!(result, "12 outer");
}

#[test]
fn render_set_in_loop_without_outer_binding_is_dropped() {
    let result = render(
        "{% for x in [1] %}{% set z = x %}{% endfor %}{{ defined('z') }}",
        json!({}),
    )
    .unwrap();
    assert_eq!(result, "false");
}

#[test]
fn render_err_undefined_name() {
    let err = render("lorem {{ ipsum }}", json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedName);
    assert_eq!(err.to_string(), "undefined name `ipsum` at 1:10");
}

#[test]
fn render_err_undefined_name_stops_output() {
    let mut w = Writer::new();
    let err = Engine::new()
        .compile("before {{ nope }} after")
        .unwrap()
        .render_to_writer(&mut w, json!({}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedName);
    assert_eq!(w.as_str(), "before ");
}

#[test]
fn render_err_pretty() {
    let err = render("lorem\n{{ ipsum.dolor }}", json!({ "ipsum": {} })).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyNotFound);
    assert_eq!(
        format!("{err:#}"),
        "
   |
 2 | {{ ipsum.dolor }}
   |    ^^^^^^^^^^^ not found in map: `dolor`
"
    );
}

#[test]
fn render_to_writer() {
    let mut w = Writer::new();
    Engine::new()
        .compile("lorem {{ ipsum }}")
        .unwrap()
        .render_to_writer(&mut w, json!({ "ipsum": "dolor" }))
        .unwrap();
    assert_eq!(w.as_str(), "lorem dolor");
}

#[test]
fn render_to_writer_err_io() {
    let err = Engine::new()
        .compile("lorem {{ ipsum }}")
        .unwrap()
        .render_to_writer(Writer::failing_after(1), json!({ "ipsum": "dolor" }))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(err.message(), "io error: pipe closed");
}

#[test]
fn render_from_value() {
    let ctx: Value = [("ipsum", 1)].into_iter().collect();
    let result = Engine::new()
        .compile("lorem {{ ipsum + 1 }}")
        .unwrap()
        .render_from(&ctx)
        .unwrap();
    assert_eq!(result, "lorem 2");
}

#[test]
fn render_err_context_not_a_map() {
    let err = Engine::new()
        .compile("lorem")
        .unwrap()
        .render(vec![1, 2])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.message(), "expected map for render context, found list");
}

#[test]
fn render_unit_context() {
    let result = Engine::new().compile("lorem").unwrap().render(()).unwrap();
    assert_eq!(result, "lorem");
}

#[test]
fn render_include_relative() {
    let mut engine = Engine::new();
    engine
        .add_template(
            "pages/index.html",
            r#"[{% include "../partials/nav.html" with active = page %}]"#,
        )
        .unwrap();
    engine
        .add_template("partials/nav.html", "{{ active }}-{{ site }}")
        .unwrap();
    let result = engine
        .get_template("pages/index.html")
        .unwrap()
        .render(json!({ "page": "home", "site": "x" }))
        .unwrap();
    assert_eq!(result, "[home-x]");
}

#[test]
fn render_include_sibling_and_absolute() {
    let mut engine = Engine::new();
    engine
        .add_template("a/b/main.html", r#"{% include "part.html" %}|{% include "/top.html" %}"#)
        .unwrap();
    engine.add_template("a/b/part.html", "part").unwrap();
    engine.add_template("top.html", "top").unwrap();
    let result = engine
        .get_template("a/b/main.html")
        .unwrap()
        .render(())
        .unwrap();
    assert_eq!(result, "part|top");
}

#[test]
fn render_include_locals_are_scoped() {
    let mut engine = Engine::new();
    engine
        .add_template(
            "main.html",
            r#"{% include "inner.html" with x = 1 %}{{ defined('x') }}"#,
        )
        .unwrap();
    engine.add_template("inner.html", "{{ x }}").unwrap();
    let result = engine.get_template("main.html").unwrap().render(()).unwrap();
    assert_eq!(result, "1false");
}

#[test]
fn render_include_err_unknown_template() {
    let mut engine = Engine::new();
    engine
        .add_template("pages/index.html", r#"{% include "missing.html" %}"#)
        .unwrap();
    let err = engine
        .get_template("pages/index.html")
        .unwrap()
        .render(())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.message(), "unknown template `pages/missing.html`");
    assert_eq!(err.name(), Some("pages/index.html"));
}

#[test]
fn render_include_err_names_inner_template() {
    let mut engine = Engine::new();
    engine
        .add_template("outer.html", r#"{% include "inner.html" %}"#)
        .unwrap();
    engine.add_template("inner.html", "\n{{ nope }}").unwrap();
    let err = engine
        .get_template("outer.html")
        .unwrap()
        .render(())
        .unwrap_err();
    assert_eq!(err.name(), Some("inner.html"));
    assert_eq!(err.to_string(), "undefined name `nope` at inner.html:2:4");
}

#[test]
fn render_include_err_max_depth() {
    let mut engine = Engine::new();
    engine.set_max_include_depth(4);
    engine
        .add_template("loop.html", r#"x{% include "loop.html" %}"#)
        .unwrap();
    let err = engine
        .get_template("loop.html")
        .unwrap()
        .render(())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.message(), "reached maximum include depth (4)");
}

#[test]
fn render_text() {
    let mut engine = Engine::new();
    engine.add_text("docs/LICENSE", "MIT <3 {{ not parsed }}");
    engine
        .add_template("docs/about.html", r#"{% text "LICENSE" %}"#)
        .unwrap();
    let result = engine
        .get_template("docs/about.html")
        .unwrap()
        .render(())
        .unwrap();
    assert_eq!(result, "MIT <3 {{ not parsed }}");
}

#[test]
fn render_text_falls_back_to_template_source() {
    let mut engine = Engine::new();
    engine.add_template("a.html", "{{ x }}").unwrap();
    engine.add_template("b.html", r#"{% text "a.html" %}"#).unwrap();
    let result = engine.get_template("b.html").unwrap().render(()).unwrap();
    assert_eq!(result, "{{ x }}");
}

#[test]
fn render_text_err_unknown() {
    let err = render(r#"{% text "nope.txt" %}"#, json!({})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.message(), "unknown text `nope.txt`");
}

/*
 * render_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Rendering of variables and sections, checked at several chunk sizes.
 */

mod common;

use std::io::Cursor;

use common::{render_chunked, render_ok};
use pretty_assertions::assert_eq;
use serde_json::json;
use streamstache::{Escaper, Record, RenderConfig, RenderError, Renderer, Value};

fn render_str(template: &'static str, data: &Value) -> String {
    render_ok(|| Renderer::new(Cursor::new(template), data))
}

#[test]
fn test_plain_text_passes_through() {
    let data = Value::Null;
    assert_eq!(render_str("", &data), "");
    assert_eq!(render_str("no tags { here }", &data), "no tags { here }");
    assert_eq!(render_str("trailing {", &data), "trailing {");
}

#[test]
fn test_variables() {
    let data = Value::from(json!({"a": "Hello", "b": {"c": "World"}}));
    assert_eq!(render_str("<h1>{{a}} {{b.c}}!</h1>", &data), "<h1>Hello World!</h1>");
}

#[test]
fn test_tags_allow_spaces() {
    let data = Value::from(json!({"a": "Hello", "e": "!"}));
    assert_eq!(render_str("{{a }}{{  e}}{{ a }}", &data), "Hello!Hello");
}

#[test]
fn test_missing_paths_render_nothing() {
    let data = Value::from(json!({"a": "text", "n": null}));
    assert_eq!(render_str("[{{missing}}][{{a.b}}][{{n}}][{{a..b}}]", &data), "[][][][]");
}

#[test]
fn test_escaping() {
    let data = Value::from(json!({"code": "<a href=\"x\">'{{c}}' & co</a>"}));
    assert_eq!(
        render_str("{{code}}", &data),
        "&lt;a href=&#34;x&#34;&gt;&#39;&#123;&#123;c&#125;&#125;&#39; &amp; co&lt;/a&gt;"
    );
    assert_eq!(
        render_str("{{&code}}", &data),
        "<a href=\"x\">'{{c}}' & co</a>"
    );
}

#[test]
fn test_raw_output_reproduces_bytes() {
    let original = "{{}} <&> \"quoted\" ünïcødé }}{{";
    let data = Value::from(json!({"x": original}));
    assert_eq!(render_str("{{&x}}", &data), original);
}

#[test]
fn test_scalar_formatting() {
    let data = Value::from(json!({
        "int": -42,
        "whole": 1.0,
        "frac": 1.5,
        "yes": true,
        "no": false,
        "list": [1, "two"],
        "map": {"b": 2, "a": 1},
    }));
    assert_eq!(
        render_str("{{int}} {{whole}} {{frac}} {{yes}} {{no}}", &data),
        "-42 1 1.5 true false"
    );
    assert_eq!(render_str("{{&list}} {{&map}}", &data), r#"[1,"two"] {"a":1,"b":2}"#);
}

#[test]
fn test_bytes_render_verbatim() {
    let data = Value::map([("raw", Value::Bytes(b"a<b".to_vec()))]);
    assert_eq!(render_str("{{&raw}} {{raw}}", &data), "a<b a&lt;b");
}

#[test]
fn test_section_over_list() {
    let data = Value::from(json!({"words": ["a", "b", "c"]}));
    assert_eq!(render_str("{{#words}}({{.}}){{/words}}", &data), "(a)(b)(c)");
}

#[test]
fn test_nested_sections_over_same_list() {
    let data = Value::from(json!({"words": ["a", "b", "c"]}));
    let output = render_str("{{#words}}({{.}}){{#words}}({{.}}){{/words}}{{/words}}", &data);
    insta::assert_snapshot!(output, @"(a)(a)(b)(c)(b)(a)(b)(c)(c)(a)(b)(c)");
}

#[test]
fn test_section_over_objects() {
    let data = Value::from(json!({
        "people": [
            {"name": "Ann", "pets": ["cat"]},
            {"name": "Bob", "pets": []},
        ],
    }));
    let output = render_str(
        "{{#people}}{{name}}:{{#pets}} {{.}}{{/pets}}{{^pets}} none{{/pets}};{{/people}}",
        &data,
    );
    insta::assert_snapshot!(output, @"Ann: cat;Bob: none;");
}

#[test]
fn test_scope_shadowing() {
    let data = Value::from(json!({
        "a": "Hello",
        "b": "World",
        "greeting": {"a": "Hola"},
    }));
    assert_eq!(
        render_str("{{#greeting}}{{a}} {{b}}!{{/greeting}}", &data),
        "Hola World!"
    );
    assert_eq!(render_str("{{a}} {{b}}!", &data), "Hello World!");
}

#[test]
fn test_inverted_sections() {
    let data = Value::from(json!({"many": {"words": []}, "words": ["a"]}));
    assert_eq!(
        render_str(
            "{{#many.words}}Hello World!{{/many.words}}{{^many.words}}Hola Mundo!{{/many.words}}",
            &data
        ),
        "Hola Mundo!"
    );
}

#[test]
fn test_inverted_is_exclusive_with_section() {
    let template = "{{#x}}yes{{/x}}{{^x}}no{{/x}}";
    let cases = [
        (json!({}), "no"),
        (json!({"x": null}), "no"),
        (json!({"x": false}), "no"),
        (json!({"x": ""}), "no"),
        (json!({"x": []}), "no"),
        (json!({"x": {}}), "no"),
        (json!({"x": true}), "yes"),
        (json!({"x": 0}), "yes"),
        (json!({"x": "s"}), "yes"),
        (json!({"x": [1, 2]}), "yesyes"),
        (json!({"x": {"k": 1}}), "yes"),
    ];
    for (value, expected) in cases {
        let data = Value::from(value.clone());
        assert_eq!(render_str(template, &data), expected, "data {value}");
    }
}

#[test]
fn test_scalar_sections_bind_dot() {
    let data = Value::from(json!({"n": 0, "s": "x"}));
    assert_eq!(render_str("{{#n}}[{{.}}]{{/n}}{{#s}}[{{.}}]{{/s}}", &data), "[0][x]");
}

#[test]
fn test_section_with_element_alias() {
    let data = Value::from(json!({"words": ["a", "b", "c"]}));
    assert_eq!(
        render_str("{{#words as word}}{{word}}{{/words}}", &data),
        "abc"
    );

    let data = Value::from(json!({"words": [{"value": "a"}, {"value": "b"}]}));
    assert_eq!(
        render_str("{{#words as word}}{{word.value}}{{/words}}", &data),
        "ab"
    );
}

#[test]
fn test_outer_alias_visible_in_inner_section() {
    let data = Value::from(json!({
        "groups": [{"name": "g1", "items": ["x", "y"]}],
    }));
    assert_eq!(
        render_str(
            "{{#groups as g}}{{#g.items}}{{g.name}}-{{.}} {{/g.items}}{{/groups}}",
            &data
        ),
        "g1-x g1-y "
    );
}

#[test]
fn test_null_element_does_not_reach_outer_section() {
    let data = Value::from(json!({"outer": ["O"], "xs": ["a", null]}));
    assert_eq!(
        render_str("{{#outer}}{{#xs}}[{{.}}]{{/xs}}{{/outer}}", &data),
        "[a][]"
    );
}

#[test]
fn test_null_element_alias_does_not_reach_root() {
    let data = Value::from(json!({"x": "ROOT", "xs": ["a", null]}));
    assert_eq!(render_str("{{#xs as x}}[{{x}}]{{/xs}}", &data), "[a][]");
    assert_eq!(
        render_str("{{#xs as x}}{{#x}}yes{{/x}}{{^x}}no{{/x}};{{/xs}}", &data),
        "yes;no;"
    );
}

#[test]
fn test_section_with_key_value_aliases() {
    let data = Value::from(json!({"words": {"a": "b", "c": "d", "e": "f"}}));
    assert_eq!(render_str("{{#words as k, v}}{{k}}{{/words}}", &data), "ace");
    assert_eq!(render_str("{{#words as k, v}}{{v}}{{/words}}", &data), "bdf");
}

#[test]
fn test_key_value_aliases_over_list_bind_index() {
    let data = Value::from(json!({"words": ["a", "b", "c"]}));
    assert_eq!(
        render_str("{{#words as i, w}}{{i}}:{{w}} {{/words}}", &data),
        "0:a 1:b 2:c "
    );
}

#[test]
fn test_record_fields_keep_order() {
    let data = Value::from(
        Record::new()
            .field("title", "Scores")
            .field("scores", Record::new().field("zed", 3).field("amy", 7)),
    );
    let output = render_str(
        "{{title}}: {{#scores as name, score}}{{name}}={{score}} {{/scores}}",
        &data,
    );
    insta::assert_snapshot!(output, @"Scores: zed=3 amy=7 ");
}

#[test]
fn test_value_from_serialize() {
    #[derive(serde::Serialize)]
    struct Page {
        title: String,
        tags: Vec<&'static str>,
    }

    let data = Value::from_serialize(&Page {
        title: "Post".to_string(),
        tags: vec!["rust", "web"],
    })
    .unwrap();
    assert_eq!(
        render_str("{{title}}{{#tags}} #{{.}}{{/tags}}", &data),
        "Post #rust #web"
    );
}

#[test]
fn test_custom_delimiters_and_raw_marker() {
    let data = Value::from(json!({"name": "<b>", "items": [1, 2]}));
    let output = render_ok(|| {
        let config = RenderConfig::default()
            .with_delimiters("<%", "%>")
            .unwrap()
            .with_raw_marker('=')
            .unwrap();
        Renderer::new(
            Cursor::new("{{name}} <% name %> <%= name %> <%#items%>[<%.%>]<%/items%>"),
            &data,
        )
        .with_config(config)
    });
    assert_eq!(output, "{{name}} &lt;b&gt; <b> [1][2]");
}

#[test]
fn test_long_delimiters_across_chunks() {
    let data = Value::from(json!({"x": "X"}));
    let output = render_ok(|| {
        let config = RenderConfig::default()
            .with_delimiters("{{{{", "}}}}")
            .unwrap();
        Renderer::new(Cursor::new("{{{x}}} {{{{x}}}} {{{{{x}}}}}"), &data).with_config(config)
    });
    assert_eq!(output, "{{{x}}} X }");
}

#[test]
fn test_disabled_escaping() {
    let data = Value::from(json!({"a": "<b>&</b>"}));
    let output = render_ok(|| {
        Renderer::new(Cursor::new("{{a}}"), &data)
            .with_config(RenderConfig::default().with_escaper(Escaper::none()))
    });
    assert_eq!(output, "<b>&</b>");
}

#[test]
fn test_unclosed_section_reports_after_body() {
    let data = Value::from(json!({"words": ["a", "b", "c"]}));
    let rendered = render_chunked(|| {
        Renderer::new(Cursor::new("<h1>{{#words}}({{.}})</h1>"), &data)
    });
    assert_eq!(rendered.output, "<h1>(a)</h1>");
    assert!(matches!(
        rendered.error,
        Some(RenderError::UnclosedSections { names }) if names == ["words"]
    ));
}

#[test]
fn test_empty_tag_reports_after_prefix() {
    let data = Value::Null;
    let rendered = render_chunked(|| Renderer::new(Cursor::new("<h1>{{}}</h1>"), &data));
    assert_eq!(rendered.output, "<h1>");
    assert!(matches!(rendered.error, Some(RenderError::EmptyTag)));
}

#[test]
fn test_invalid_aliases() {
    let data = Value::from(json!({"words": ["a"]}));
    let rendered = render_chunked(|| {
        Renderer::new(Cursor::new("x{{#words as a, b, c}}{{/words}}"), &data)
    });
    assert_eq!(rendered.output, "x");
    assert!(matches!(rendered.error, Some(RenderError::InvalidAliases { .. })));
}

#[test]
fn test_source_io_error_propagates() {
    struct Broken;

    impl std::io::Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    impl std::io::Seek for Broken {
        fn seek(&mut self, _pos: std::io::SeekFrom) -> std::io::Result<u64> {
            Ok(0)
        }
    }

    impl streamstache::Source for Broken {}

    let data = Value::Null;
    let rendered = common::drain(Renderer::new(Broken, &data), 16);
    assert_eq!(rendered.output, "");
    match rendered.error {
        Some(RenderError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

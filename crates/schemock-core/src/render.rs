//! Render gateway: a small template language evaluated against an explicit
//! context built from one [`ModelSchema`].
//!
//! ```text
//! {{ mock_name }}                      interpolation
//! {{ class_name | snake_case }}        filters, applied left to right
//! {% for m in class_methods %}...{% endfor %}
//! {% if not constants %}...{% else %}...{% endif %}
//! ```
//!
//! A line holding nothing but one `{% %}` tag is dropped entirely from the output.

use heck::ToSnakeCase;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::error::RenderError;
use crate::schema::ModelSchema;

/// Built-in template emitting a Ruby mock class.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/mock.rb.tmpl");

static RE_FOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^for\s+([a-z_][a-zA-Z0-9_]*)\s+in\s+([a-zA-Z_][a-zA-Z0-9_.]*)$").unwrap()
});
static RE_IF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^if\s+(not\s+)?([a-zA-Z_][a-zA-Z0-9_.]*)$").unwrap()
});
static RE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$").unwrap());

/// Render `template` with `schema` as its only data context.
pub fn render(template: &str, schema: &ModelSchema, suffix: &str) -> Result<String, RenderError> {
    render_with_context(template, &schema.render_context(suffix))
}

/// Render `template` against an already-built context object.
pub fn render_with_context(template: &str, context: &Value) -> Result<String, RenderError> {
    let segments = segment(template)?;
    let mut pos = 0;
    let nodes = parse_nodes(&segments, &mut pos, None)?;

    let mut out = String::with_capacity(template.len() * 2);
    let mut scopes: Vec<(String, Value)> = Vec::new();
    eval_nodes(&nodes, context, &mut scopes, &mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Segmenting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Expr { body: String, line: usize },
    Tag { body: String, line: usize },
}

impl Segment {
    fn line(&self) -> usize {
        match self {
            Segment::Text(_) => 0,
            Segment::Expr { line, .. } | Segment::Tag { line, .. } => *line,
        }
    }
}

fn segment(template: &str) -> Result<Vec<Segment>, RenderError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = template;
    let mut line = 1;
    // Whether the pending text starts at the beginning of a line.
    let mut at_line_start = true;

    while let Some(open) = find_open(rest) {
        let (before, after_open) = rest.split_at(open);
        text.push_str(before);
        line += before.matches('\n').count();

        let is_tag = after_open.starts_with("{%");
        let close = if is_tag { "%}" } else { "}}" };
        let Some(close_idx) = after_open[2..].find(close) else {
            return Err(RenderError::Malformed {
                line,
                message: format!("unclosed `{}`", &after_open[..2]),
            });
        };
        let body = after_open[2..2 + close_idx].trim().to_string();
        if body.contains('\n') {
            return Err(RenderError::Malformed {
                line,
                message: "tag spans multiple lines".to_string(),
            });
        }
        if body.is_empty() {
            return Err(RenderError::Malformed {
                line,
                message: "empty tag".to_string(),
            });
        }
        rest = &after_open[2 + close_idx + 2..];

        if !is_tag {
            flush(&mut segments, &mut text, &mut at_line_start);
            segments.push(Segment::Expr { body, line });
            at_line_start = false;
            continue;
        }

        // Standalone tag line: drop its indentation and line break.
        let line_start = text.rfind('\n').map(|i| i + 1);
        let before_on_line = &text[line_start.unwrap_or(0)..];
        let after_on_line = rest.split('\n').next().unwrap_or("");
        let standalone = (line_start.is_some() || at_line_start)
            && before_on_line.trim().is_empty()
            && after_on_line.trim().is_empty();

        let tag_line = line;
        if standalone {
            text.truncate(line_start.unwrap_or(0));
            rest = match rest.find('\n') {
                Some(nl) => {
                    line += 1;
                    &rest[nl + 1..]
                }
                None => "",
            };
        }
        flush(&mut segments, &mut text, &mut at_line_start);
        segments.push(Segment::Tag {
            body,
            line: tag_line,
        });
        at_line_start = standalone;
    }
    text.push_str(rest);
    flush(&mut segments, &mut text, &mut at_line_start);
    Ok(segments)
}

fn find_open(s: &str) -> Option<usize> {
    match (s.find("{{"), s.find("{%")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn flush(segments: &mut Vec<Segment>, text: &mut String, at_line_start: &mut bool) {
    if !text.is_empty() {
        *at_line_start = text.ends_with('\n');
        segments.push(Segment::Text(std::mem::take(text)));
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Expr {
        path: String,
        filters: Vec<String>,
        line: usize,
    },
    For {
        var: String,
        path: String,
        body: Vec<Node>,
        line: usize,
    },
    If {
        negate: bool,
        path: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
        line: usize,
    },
}

/// Parse until a closing tag listed in `until` (left unconsumed) or the end of input.
fn parse_nodes(
    segments: &[Segment],
    pos: &mut usize,
    until: Option<&[&str]>,
) -> Result<Vec<Node>, RenderError> {
    let mut nodes = Vec::new();

    while let Some(seg) = segments.get(*pos) {
        match seg {
            Segment::Text(t) => {
                nodes.push(Node::Text(t.clone()));
                *pos += 1;
            }
            Segment::Expr { body, line } => {
                let mut parts = body.split('|').map(str::trim);
                let path = parts.next().unwrap_or_default();
                check_path(path, *line)?;
                nodes.push(Node::Expr {
                    path: path.to_string(),
                    filters: parts.map(str::to_string).collect(),
                    line: *line,
                });
                *pos += 1;
            }
            Segment::Tag { body, line } => {
                let line = *line;
                if until.is_some_and(|u| u.contains(&body.as_str())) {
                    return Ok(nodes);
                }
                if let Some(caps) = RE_FOR.captures(body) {
                    *pos += 1;
                    let body_nodes = parse_nodes(segments, pos, Some(&["endfor"][..]))?;
                    expect_close(segments, pos, "endfor", line)?;
                    nodes.push(Node::For {
                        var: caps[1].to_string(),
                        path: caps[2].to_string(),
                        body: body_nodes,
                        line,
                    });
                } else if let Some(caps) = RE_IF.captures(body) {
                    *pos += 1;
                    let then = parse_nodes(segments, pos, Some(&["else", "endif"][..]))?;
                    let otherwise = if matches!(segments.get(*pos), Some(Segment::Tag { body, .. }) if body == "else")
                    {
                        *pos += 1;
                        parse_nodes(segments, pos, Some(&["endif"][..]))?
                    } else {
                        Vec::new()
                    };
                    expect_close(segments, pos, "endif", line)?;
                    nodes.push(Node::If {
                        negate: caps.get(1).is_some(),
                        path: caps[2].to_string(),
                        then,
                        otherwise,
                        line,
                    });
                } else if matches!(body.as_str(), "endfor" | "endif" | "else") {
                    return Err(RenderError::Malformed {
                        line,
                        message: format!("`{body}` without an opening tag"),
                    });
                } else {
                    return Err(RenderError::Malformed {
                        line,
                        message: format!("unrecognized tag `{body}`"),
                    });
                }
            }
        }
    }

    match until {
        None => Ok(nodes),
        Some(closers) => Err(RenderError::Malformed {
            line: segments.last().map_or(0, Segment::line),
            message: format!("missing `{}`", closers[closers.len() - 1]),
        }),
    }
}

fn expect_close(
    segments: &[Segment],
    pos: &mut usize,
    closer: &str,
    open_line: usize,
) -> Result<(), RenderError> {
    match segments.get(*pos) {
        Some(Segment::Tag { body, .. }) if body == closer => {
            *pos += 1;
            Ok(())
        }
        _ => Err(RenderError::Malformed {
            line: open_line,
            message: format!("missing `{closer}`"),
        }),
    }
}

fn check_path(path: &str, line: usize) -> Result<(), RenderError> {
    if RE_PATH.is_match(path) {
        Ok(())
    } else {
        Err(RenderError::Malformed {
            line,
            message: format!("invalid expression `{path}`"),
        })
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn eval_nodes(
    nodes: &[Node],
    context: &Value,
    scopes: &mut Vec<(String, Value)>,
    out: &mut String,
) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Expr {
                path,
                filters,
                line,
            } => {
                let mut value = lookup(path, context, scopes, *line)?;
                for filter in filters {
                    value = apply_filter(filter, value, *line)?;
                }
                out.push_str(&display(&value));
            }
            Node::For {
                var,
                path,
                body,
                line,
            } => {
                let items: Vec<Value> = match lookup(path, context, scopes, *line)? {
                    Value::Array(items) => items,
                    Value::Object(map) => map
                        .into_iter()
                        .map(|(k, v)| serde_json::json!({ "key": k, "value": v }))
                        .collect(),
                    Value::Null => Vec::new(),
                    _ => {
                        return Err(RenderError::NotIterable {
                            name: path.clone(),
                            line: *line,
                        })
                    }
                };
                let count = items.len();
                for (index, item) in items.into_iter().enumerate() {
                    scopes.push((var.clone(), item));
                    scopes.push((
                        "loop".to_string(),
                        serde_json::json!({
                            "index": index,
                            "first": index == 0,
                            "last": index + 1 == count,
                        }),
                    ));
                    let result = eval_nodes(body, context, scopes, out);
                    scopes.truncate(scopes.len() - 2);
                    result?;
                }
            }
            Node::If {
                negate,
                path,
                then,
                otherwise,
                line,
            } => {
                let cond = truthy(&lookup(path, context, scopes, *line)?) != *negate;
                let branch = if cond { then } else { otherwise };
                eval_nodes(branch, context, scopes, out)?;
            }
        }
    }
    Ok(())
}

/// Resolve a dotted path. The root must be a loop variable or a context
/// query; missing nested fields resolve to null.
fn lookup(
    path: &str,
    context: &Value,
    scopes: &[(String, Value)],
    line: usize,
) -> Result<Value, RenderError> {
    let mut parts = path.split('.');
    let root = parts.next().unwrap_or_default();
    let mut current = scopes
        .iter()
        .rev()
        .find(|(name, _)| name == root)
        .map(|(_, v)| v)
        .or_else(|| context.get(root))
        .ok_or_else(|| RenderError::UndefinedQuery {
            name: root.to_string(),
            line,
        })?;

    for part in parts {
        match current.get(part) {
            Some(next) => current = next,
            None => return Ok(Value::Null),
        }
    }
    Ok(current.clone())
}

fn apply_filter(filter: &str, value: Value, line: usize) -> Result<Value, RenderError> {
    let result = match filter {
        "snake_case" => Value::String(display(&value).to_snake_case()),
        "symbol" => Value::String(format!(":{}", display(&value))),
        "inspect" => Value::String(ruby_literal(&value, true)),
        "literal" => Value::String(ruby_literal(&value, false)),
        "join" => match value {
            Value::Array(items) => Value::String(
                items.iter().map(display).collect::<Vec<_>>().join(", "),
            ),
            other => other,
        },
        _ => {
            return Err(RenderError::UnknownFilter {
                name: filter.to_string(),
                line,
            })
        }
    };
    Ok(result)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => ruby_literal(value, true),
    }
}

/// Ruby literal text for a value. With `quote_strings` unset, strings are
/// emitted as-is (they already hold source literals).
fn ruby_literal(value: &Value, quote_strings: bool) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if quote_strings => {
            format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|v| ruby_literal(v, quote_strings))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Object(map) => ruby_hash(map, quote_strings),
    }
}

fn ruby_hash(map: &Map<String, Value>, quote_strings: bool) -> String {
    if map.is_empty() {
        return "{}".to_string();
    }
    let entries: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("{}: {}", hash_key(k), ruby_literal(v, quote_strings)))
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

fn hash_key(key: &str) -> String {
    let bare = key.starts_with(|c: char| c.is_ascii_lowercase() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        key.to_string()
    } else {
        format!("\"{key}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx() -> Value {
        json!({
            "name": "Person",
            "items": ["a", "b", "c"],
            "empty": [],
            "flag": true,
            "defaults": { "name": null, "age": "0" },
        })
    }

    fn run(tpl: &str) -> Result<String, RenderError> {
        render_with_context(tpl, &ctx())
    }

    #[test]
    fn interpolation_and_filters() {
        assert_eq!(run("class {{ name }}Mock").unwrap(), "class PersonMock");
        assert_eq!(run("{{ name | snake_case }}").unwrap(), "person");
        assert_eq!(run("{{ name | symbol }}").unwrap(), ":Person");
        assert_eq!(run("{{ items | join }}").unwrap(), "a, b, c");
        assert_eq!(run("{{ defaults | literal }}").unwrap(), "{ name: nil, age: 0 }");
        assert_eq!(run("{{ name | inspect }}").unwrap(), "\"Person\"");
        assert_eq!(
            render_with_context("{{ m | literal }}", &json!({ "m": { "valid?": null } })).unwrap(),
            "{ \"valid?\": nil }"
        );
    }

    #[test]
    fn for_loop_with_standalone_tags() {
        let tpl = "start\n  {% for x in items %}\n  - {{ x }}\n  {% endfor %}\nend\n";
        assert_eq!(run(tpl).unwrap(), "start\n  - a\n  - b\n  - c\nend\n");
    }

    #[test]
    fn inline_loop_and_loop_meta() {
        let tpl = "{% for x in items %}{{ x }}{% if not loop.last %},{% endif %}{% endfor %}";
        assert_eq!(run(tpl).unwrap(), "a,b,c");
    }

    #[test]
    fn loop_over_object_entries() {
        let tpl = "{% for e in defaults %}{{ e.key }}={{ e.value | literal }};{% endfor %}";
        assert_eq!(run(tpl).unwrap(), "name=nil;age=0;");
    }

    #[test]
    fn if_else() {
        assert_eq!(run("{% if flag %}yes{% else %}no{% endif %}").unwrap(), "yes");
        assert_eq!(run("{% if empty %}yes{% else %}no{% endif %}").unwrap(), "no");
        assert_eq!(run("{% if not empty %}yes{% endif %}").unwrap(), "yes");
        assert_eq!(run("{% if not flag %}yes{% endif %}").unwrap(), "");
    }

    #[test]
    fn missing_nested_field_is_empty() {
        assert_eq!(run("[{{ defaults.missing }}]").unwrap(), "[]");
    }

    #[test]
    fn undefined_query_reported() {
        assert_eq!(
            run("line one\n{{ bogus }}"),
            Err(RenderError::UndefinedQuery {
                name: "bogus".into(),
                line: 2
            })
        );
    }

    #[test]
    fn unknown_filter_reported() {
        assert_eq!(
            run("{{ name | shout }}"),
            Err(RenderError::UnknownFilter {
                name: "shout".into(),
                line: 1
            })
        );
    }

    #[test]
    fn not_iterable_reported() {
        assert!(matches!(
            run("{% for x in name %}{% endfor %}"),
            Err(RenderError::NotIterable { .. })
        ));
    }

    #[test]
    fn malformed_templates() {
        assert!(matches!(run("{{ name"), Err(RenderError::Malformed { .. })));
        assert!(matches!(
            run("{% for x in items %}no end"),
            Err(RenderError::Malformed { .. })
        ));
        assert!(matches!(run("{% endif %}"), Err(RenderError::Malformed { .. })));
        assert!(matches!(run("{% unless x %}"), Err(RenderError::Malformed { .. })));
        assert!(matches!(run("{{ a b }}"), Err(RenderError::Malformed { .. })));
    }
}

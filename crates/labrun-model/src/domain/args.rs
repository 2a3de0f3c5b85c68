use serde_json::{Map, Value};

/// Process-argument payload attached to a job record.
///
/// The queue stores `args` as free-form JSON. The shape is resolved once at
/// ingestion and each variant has exactly one formatting rule:
/// - a sequence of scalars passes through stringified, in order;
/// - a mapping expands to `--name value` pairs in insertion order, with
///   boolean/empty values emitting only the bare flag (`false` drops the
///   flag entirely);
/// - a raw string is tokenized with shell quoting rules;
/// - any other scalar becomes a single argument.
#[derive(Debug, Clone, PartialEq)]
pub enum JobArgs {
    None,
    Sequence(Vec<Value>),
    Mapping(Map<String, Value>),
    Raw(String),
    Scalar(Value),
}

impl JobArgs {
    /// Classify a raw `args` column value.
    pub fn from_value(raw: Option<&Value>) -> Self {
        match raw {
            None | Some(Value::Null) => JobArgs::None,
            Some(Value::Array(items)) => JobArgs::Sequence(items.clone()),
            Some(Value::Object(map)) => JobArgs::Mapping(map.clone()),
            Some(Value::String(line)) => JobArgs::Raw(line.clone()),
            Some(other) => JobArgs::Scalar(other.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            JobArgs::None => true,
            JobArgs::Sequence(items) => items.is_empty(),
            JobArgs::Mapping(map) => map.is_empty(),
            JobArgs::Raw(line) => line.trim().is_empty(),
            JobArgs::Scalar(_) => false,
        }
    }

    /// Render the payload as an argv fragment.
    pub fn to_argv(&self) -> Vec<String> {
        match self {
            JobArgs::None => Vec::new(),
            JobArgs::Sequence(items) => items.iter().map(scalar_to_string).collect(),
            JobArgs::Mapping(map) => {
                let mut argv = Vec::new();
                for (name, value) in map {
                    match value {
                        Value::Bool(false) => {}
                        Value::Null | Value::Bool(true) => argv.push(format!("--{name}")),
                        Value::String(s) if s.is_empty() => argv.push(format!("--{name}")),
                        other => {
                            argv.push(format!("--{name}"));
                            argv.push(scalar_to_string(other));
                        }
                    }
                }
                argv
            }
            JobArgs::Raw(line) => tokenize(line),
            JobArgs::Scalar(value) => vec![scalar_to_string(value)],
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Split a raw command line into tokens, honoring single quotes, double
/// quotes, and backslash escapes. An unterminated quote consumes the rest of
/// the line.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            '\'' => {
                has_token = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    current.push(c);
                }
            }
            '"' => {
                has_token = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        // inside double quotes a backslash only escapes the
                        // quote and itself
                        '\\' => match chars.next() {
                            Some(esc @ ('"' | '\\')) => current.push(esc),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => current.push('\\'),
                        },
                        _ => current.push(c),
                    }
                }
            }
            '\\' => {
                has_token = true;
                if let Some(c) = chars.next() {
                    current.push(c);
                }
            }
            _ => {
                has_token = true;
                current.push(ch);
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn argv(raw: Value) -> Vec<String> {
        JobArgs::from_value(Some(&raw)).to_argv()
    }

    #[test]
    fn absent_payload_is_empty() {
        assert!(JobArgs::from_value(None).to_argv().is_empty());
        assert!(argv(Value::Null).is_empty());
    }

    #[test]
    fn sequence_stringifies_in_order() {
        assert_eq!(argv(json!([1, "x", true, 2.5])), ["1", "x", "true", "2.5"]);
    }

    #[test]
    fn mapping_expands_to_flag_pairs_in_insertion_order() {
        assert_eq!(argv(json!({"a": 1, "b": null})), ["--a", "1", "--b"]);
    }

    #[test]
    fn mapping_boolean_and_empty_values_emit_bare_flag() {
        assert_eq!(
            argv(json!({"verbose": true, "tag": "", "dry_run": false, "n": 3})),
            ["--verbose", "--tag", "--n", "3"]
        );
    }

    #[test]
    fn raw_string_respects_quoting() {
        assert_eq!(
            argv(json!("--a 1 --b 'two words'")),
            ["--a", "1", "--b", "two words"]
        );
    }

    #[test]
    fn other_scalars_become_single_argument() {
        assert_eq!(argv(json!(42)), ["42"]);
    }

    #[test]
    fn tokenize_handles_double_quotes_and_escapes() {
        assert_eq!(tokenize(r#"say "he said \"hi\"""#), ["say", r#"he said "hi""#]);
        assert_eq!(tokenize(r"one\ arg two"), ["one arg", "two"]);
    }

    #[test]
    fn tokenize_preserves_empty_quoted_token() {
        assert_eq!(tokenize("a '' b"), ["a", "", "b"]);
    }

    #[test]
    fn tokenize_concatenates_adjacent_segments() {
        assert_eq!(tokenize("a'b c'd"), ["ab cd"]);
    }

    #[test]
    fn tokenize_of_blank_line_is_empty() {
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
    }
}

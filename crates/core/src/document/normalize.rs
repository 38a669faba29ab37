//! Object-literal to JSON normalization.
//!
//! Generated config files are JavaScript modules. Hand edits bring in
//! single-quoted strings, bare keys, comments and trailing commas, none of
//! which strict JSON accepts. Every rewrite here is string-aware, so quote
//! characters and commas inside string literals are never touched.

/// Module prefix every config file starts with.
pub const EXPORT_PREFIX: &str = "export default";

/// Rewrite a config module body into strict JSON text.
///
/// Does not validate; the result is handed to the JSON parser, which
/// reports anything this pass could not repair.
pub fn to_strict_json(source: &str) -> String {
    let body = strip_export(source);
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => i = copy_double_quoted(&chars, i, &mut out),
            '\'' => i = convert_single_quoted(&chars, i, &mut out),
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            '}' | ']' => {
                drop_trailing_comma(&mut out);
                out.push(c);
                i += 1;
            }
            ';' => i += 1,
            c if is_ident_start(c) => i = copy_identifier(&chars, i, &mut out),
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn strip_export(source: &str) -> &str {
    let trimmed = source.trim_start_matches('\u{feff}').trim_start();
    trimmed.strip_prefix(EXPORT_PREFIX).unwrap_or(trimmed)
}

fn copy_double_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        if c == '\\' {
            if let Some(next) = chars.get(i + 1) {
                out.push(*next);
            }
            i += 2;
            continue;
        }
        i += 1;
        if c == '"' {
            break;
        }
    }
    i
}

fn convert_single_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                match chars.get(i + 1) {
                    // `\'` needs no escape inside double quotes.
                    Some('\'') => out.push('\''),
                    Some(next) => {
                        out.push('\\');
                        out.push(*next);
                    }
                    None => out.push('\\'),
                }
                i += 2;
            }
            '"' => {
                out.push_str("\\\"");
                i += 1;
            }
            '\'' => {
                out.push('"');
                return i + 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    i
}

/// Copy an identifier, quoting it when it is used as an object key.
fn copy_identifier(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut end = start;
    while end < chars.len() && is_ident_continue(chars[end]) {
        end += 1;
    }
    let ident: String = chars[start..end].iter().collect();

    let mut look = end;
    while look < chars.len() && chars[look].is_whitespace() {
        look += 1;
    }
    if chars.get(look) == Some(&':') {
        out.push('"');
        out.push_str(&ident);
        out.push('"');
    } else {
        out.push_str(&ident);
    }
    end
}

fn drop_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.remove(trimmed_len - 1);
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> serde_json::Value {
        serde_json::from_str(&to_strict_json(source)).expect("normalized text should parse")
    }

    #[test]
    fn strips_export_prefix() {
        assert_eq!(parse("export default {\"h5\": {}}"), serde_json::json!({"h5": {}}));
    }

    #[test]
    fn plain_json_passes_through() {
        assert_eq!(parse("{\"a\": [1, 2]}"), serde_json::json!({"a": [1, 2]}));
    }

    #[test]
    fn single_quotes_become_double() {
        assert_eq!(
            parse("export default { 'h5': { 'name': 'Acme' } }"),
            serde_json::json!({"h5": {"name": "Acme"}})
        );
    }

    #[test]
    fn quotes_inside_strings_are_preserved() {
        assert_eq!(
            parse(r#"export default { "a": "it's", 'b': 'say "hi"', 'c': 'don\'t' }"#),
            serde_json::json!({"a": "it's", "b": "say \"hi\"", "c": "don't"})
        );
    }

    #[test]
    fn trailing_commas_removed() {
        assert_eq!(
            parse("export default {\n  h5: {\n    list: [1, 2,],\n  },\n}\n"),
            serde_json::json!({"h5": {"list": [1, 2]}})
        );
    }

    #[test]
    fn commas_inside_strings_kept() {
        assert_eq!(
            parse(r#"{"a": "x,}", "b": "y,]"}"#),
            serde_json::json!({"a": "x,}", "b": "y,]"})
        );
    }

    #[test]
    fn bare_keys_quoted_but_literals_kept() {
        assert_eq!(
            parse("export default { h5: { enabled: true, off: false, none: null, $x: 1 } };"),
            serde_json::json!({"h5": {"enabled": true, "off": false, "none": null, "$x": 1}})
        );
    }

    #[test]
    fn comments_removed() {
        assert_eq!(
            parse("export default {\n  // channel\n  h5: { /* inline */ a: 'https://x.y/z' },\n}"),
            serde_json::json!({"h5": {"a": "https://x.y/z"}})
        );
    }

    #[test]
    fn garbage_still_fails_to_parse() {
        let text = to_strict_json("export default { h5: [1, 2 }");
        assert!(serde_json::from_str::<serde_json::Value>(&text).is_err());
    }
}

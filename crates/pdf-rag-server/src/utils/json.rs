/// Extract the first complete JSON object from a possibly noisy LLM
/// completion (prose preamble, markdown fences, trailing commentary).
///
/// Tracks brace depth while skipping braces inside JSON strings, including
/// escape sequences. Returns the object substring or None.
pub fn extract_first_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in s[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else {
                match ch {
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_object() {
        assert_eq!(extract_first_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn object_with_preamble_and_trailer() {
        let s = r#"Here is the chart: {"chart_type":"bar","values":[1,2]} hope it helps"#;
        assert_eq!(
            extract_first_json_object(s),
            Some(r#"{"chart_type":"bar","values":[1,2]}"#)
        );
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let s = r#"{"title":"a {weird} label","n":{"x":1}}"#;
        assert_eq!(extract_first_json_object(s), Some(s));
    }

    #[test]
    fn escaped_quotes_inside_strings() {
        let s = r#"{"title":"she said \"hi\" {","n":1}"#;
        assert_eq!(extract_first_json_object(s), Some(s));
    }

    #[test]
    fn unterminated_object_yields_none() {
        assert_eq!(extract_first_json_object(r#"{"a": {"b": 1}"#), None);
        assert_eq!(extract_first_json_object("no json here"), None);
    }
}

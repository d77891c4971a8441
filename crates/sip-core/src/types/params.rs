//! `;name=value` parameter lists, as found after a URI or a name-addr.
//!
//! Every function takes the parameter section *including* its leading `;`
//! (for example `;transport=udp;lr`) and returns a new string in the same
//! form. Names compare case-insensitively, values are kept verbatim.

/// Split a parameter section into `(name, value)` pairs.
///
/// A parameter without `=` (such as `lr`) has value `None`. Semicolons inside
/// quoted values do not split.
pub fn iter_params(params: &str) -> Vec<(&str, Option<&str>)> {
    split_segments(params)
        .into_iter()
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| match segment.find('=') {
            Some(eq) => (segment[..eq].trim(), Some(segment[eq + 1..].trim())),
            None => (segment.trim(), None),
        })
        .collect()
}

/// Value of parameter `name`. A flag parameter yields `Some("")`.
pub fn get_param<'a>(params: &'a str, name: &str) -> Option<&'a str> {
    iter_params(params)
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.unwrap_or(""))
}

pub fn has_param(params: &str, name: &str) -> bool {
    get_param(params, name).is_some()
}

/// Replace or append parameter `name`. An empty `value` writes a flag.
pub fn set_param(params: &str, name: &str, value: &str) -> String {
    let mut found = false;
    let mut out = String::with_capacity(params.len() + name.len() + value.len() + 2);
    for (key, existing) in iter_params(params) {
        out.push(';');
        if key.eq_ignore_ascii_case(name) && !found {
            found = true;
            push_param(&mut out, key, value);
        } else {
            push_param(&mut out, key, existing.unwrap_or(""));
            if existing == Some("") {
                out.push('=');
            }
        }
    }
    if !found {
        out.push(';');
        push_param(&mut out, name, value);
    }
    out
}

/// Drop parameter `name` (every occurrence)
pub fn remove_param(params: &str, name: &str) -> String {
    let mut out = String::with_capacity(params.len());
    for (key, value) in iter_params(params) {
        if key.eq_ignore_ascii_case(name) {
            continue;
        }
        out.push(';');
        push_param(&mut out, key, value.unwrap_or(""));
        if value == Some("") {
            out.push('=');
        }
    }
    out
}

fn push_param(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    if !value.is_empty() {
        out.push('=');
        out.push_str(value);
    }
}

fn split_segments(params: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut start = 0usize;
    for (i, c) in params.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&params[start..]);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_param() {
        let params = ";transport=UDP;lr;Tag=abc";
        assert_eq!(get_param(params, "transport"), Some("UDP"));
        assert_eq!(get_param(params, "lr"), Some(""));
        assert_eq!(get_param(params, "tag"), Some("abc"));
        assert_eq!(get_param(params, "maddr"), None);
    }

    #[test]
    fn test_set_param_replaces_in_place() {
        assert_eq!(set_param(";a=1;b=2;c", "b", "9"), ";a=1;b=9;c");
        assert_eq!(set_param(";a=1", "lr", ""), ";a=1;lr");
        assert_eq!(set_param("", "tag", "x"), ";tag=x");
    }

    #[test]
    fn test_remove_param() {
        assert_eq!(remove_param(";a=1;lr;b=2", "lr"), ";a=1;b=2");
        assert_eq!(remove_param(";a=1", "a"), "");
    }

    #[test]
    fn test_quoted_value_keeps_semicolon() {
        let params = ";reason=\"a;b\";x=1";
        assert_eq!(get_param(params, "reason"), Some("\"a;b\""));
        assert_eq!(get_param(params, "x"), Some("1"));
    }

    #[test]
    fn test_empty_explicit_value_survives_rewrite() {
        assert_eq!(set_param(";a=;b=1", "b", "2"), ";a=;b=2");
    }
}

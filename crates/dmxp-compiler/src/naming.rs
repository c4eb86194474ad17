//! Case conversion shared by the IR builder and every backend.

/// Converts a snake_case (or dotted, slashed...) name to PascalCase.
pub fn to_pascal_case(s: &str) -> String {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Converts a PascalCase or camelCase name to snake_case.
///
/// Acronyms stay together: `HTTPServer` becomes `http_server`.
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for word in s.split(|c: char| !c.is_ascii_alphanumeric()).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push('_');
        }
        let chars: Vec<char> = word.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            if c.is_ascii_uppercase() && i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
                if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_lower) {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        }
    }
    result
}

/// Converts a name to camelCase.
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(&to_snake_case(s));
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Converts a name to SCREAMING_SNAKE_CASE.
pub fn to_screaming_snake_case(s: &str) -> String {
    to_snake_case(s).to_ascii_uppercase()
}

/// Snake-case identifier for a channel name such as `sensors/temp.v1`.
pub fn channel_ident(name: &str) -> String {
    let ident = to_snake_case(name);
    match ident.chars().next() {
        None => "channel".to_string(),
        Some(c) if c.is_ascii_digit() => format!("ch_{}", ident),
        Some(_) => ident,
    }
}

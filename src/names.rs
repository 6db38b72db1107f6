//! Name handling
//!
//! Two concerns live here:
//! - accessor sanitizing for declared property names
//! - export names for the namespace (parameterize, then camelize)
//!
//! Both are pure string transforms. Collision handling happens in the
//! namespace itself, where titled names take precedence.

/// Sanitize a wire property name into an accessor name
///
/// Characters outside `[A-Za-z0-9_]` are stripped; a leading digit gets an
/// underscore prefix. The wire name is kept separately for serialization.
pub fn sanitize_accessor(name: &str) -> String {
    let mut out: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        out.insert(0, '_');
    }
    out
}

/// Lowercase, replace runs of non-alphanumerics with `sep`, trim separators
pub fn parameterize(s: &str, sep: char) -> String {
    let mut result = String::with_capacity(s.len());
    let mut pending_sep = false;

    for c in s.chars() {
        if c.is_ascii_alphanumeric() || (c == '_' && sep == '_') {
            if pending_sep && !result.is_empty() {
                result.push(sep);
            }
            pending_sep = false;
            result.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    result.trim_matches(sep).to_string()
}

/// Convert an underscore/dash separated word list to PascalCase
///
/// Only the first letter of each word is touched, so camelize expects its
/// input already lowercased.
pub fn camelize(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;

    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Export-name transform: `"Example Schema"` becomes `ExampleSchema`
pub fn standardize(name: &str) -> String {
    camelize(&parameterize(name, '_'))
}

/// Last segment of a type URI, used to name untitled types
///
/// `"memory:types#/definitions/address"` yields `address`; document URIs
/// lose a trailing `.json`/`.schema.json`.
pub fn uri_base_name(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('#').trim_end_matches('/');
    let segment = trimmed
        .rsplit(|c| c == '/' || c == '#' || c == ':')
        .next()
        .unwrap_or(trimmed);
    segment
        .trim_end_matches(".schema.json")
        .trim_end_matches(".json")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_accessor() {
        assert_eq!(sanitize_accessor("first-name"), "firstname");
        assert_eq!(sanitize_accessor("@type"), "type");
        assert_eq!(sanitize_accessor("3d"), "_3d");
        assert_eq!(sanitize_accessor("snake_case"), "snake_case");
    }

    #[test]
    fn test_standardize() {
        assert_eq!(standardize("Example Schema"), "ExampleSchema");
        assert_eq!(standardize("MyObj1"), "Myobj1");
        assert_eq!(standardize("home-address"), "HomeAddress");
        assert_eq!(standardize("  spaced  out "), "SpacedOut");
    }

    #[test]
    fn test_parameterize() {
        assert_eq!(parameterize("Example Schema", '-'), "example-schema");
        assert_eq!(parameterize("a//b", '-'), "a-b");
    }

    #[test]
    fn test_uri_base_name() {
        assert_eq!(uri_base_name("memory:types#/definitions/address"), "address");
        assert_eq!(uri_base_name("file:shapes/circle.schema.json"), "circle");
        assert_eq!(uri_base_name("person/pet"), "pet");
    }
}

use lazy_static::lazy_static;
use regex::Regex;
use validator::{ValidationErrors, ValidationErrorsKind};

lazy_static! {
    /// Regex for MIME types of the form `type/subtype`
    /// - Valid: "image/png", "application/vnd.ms-excel", "text/plain; charset=utf-8"
    /// - Invalid: "png", "image/", "/png", "image png"
    pub static ref MIME_TYPE_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*(\s*;.*)?$")
            .unwrap();

    /// Regex for hex-encoded SHA-256 digests (64 hex characters)
    pub static ref SHA256_HEX_REGEX: Regex = Regex::new(r"^[0-9a-fA-F]{64}$").unwrap();

    /// Regex for the part of an asset key after `{owner}/assets/`: `{category}/{token}`
    /// - Valid: "image/0b5c2d1e-7f0a-4c36-9d8e-2f4b8a1c6e90", "application/a"
    /// - Invalid: "../bob", "image/../x", ".hidden/x", "image/a/b", "image\x"
    pub static ref ASSET_KEY_TAIL_REGEX: Regex =
        Regex::new(r"^[a-z0-9][a-z0-9.+-]*/[A-Za-z0-9-]+$").unwrap();
}

/// Flatten `validator` errors into `field: message` strings.
///
/// Field names are reported in their camelCase wire form. `prefix` is prepended to
/// every field name, e.g. `[2].` for the third entry of a batch.
pub fn field_messages(prefix: &str, errors: &ValidationErrors) -> Vec<String> {
    let mut messages = Vec::new();
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    messages.push(format!("{}{}: {}", prefix, wire_name(field), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                messages.extend(field_messages(&format!("{}{}.", prefix, wire_name(field)), inner));
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    messages.extend(field_messages(
                        &format!("{}{}[{}].", prefix, wire_name(field), index),
                        inner,
                    ));
                }
            }
        }
    }
    messages.sort();
    messages
}

fn wire_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_mime_type_regex_valid() {
        assert!(MIME_TYPE_REGEX.is_match("image/png"));
        assert!(MIME_TYPE_REGEX.is_match("application/vnd.ms-excel"));
        assert!(MIME_TYPE_REGEX.is_match("image/svg+xml"));
        assert!(MIME_TYPE_REGEX.is_match("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_mime_type_regex_invalid() {
        assert!(!MIME_TYPE_REGEX.is_match("png"));
        assert!(!MIME_TYPE_REGEX.is_match("image/"));
        assert!(!MIME_TYPE_REGEX.is_match("/png"));
        assert!(!MIME_TYPE_REGEX.is_match("image png"));
        assert!(!MIME_TYPE_REGEX.is_match(""));
    }

    #[test]
    fn test_sha256_hex_regex() {
        assert!(SHA256_HEX_REGEX.is_match(&"a".repeat(64)));
        assert!(!SHA256_HEX_REGEX.is_match(&"a".repeat(63)));
        assert!(!SHA256_HEX_REGEX.is_match(&"g".repeat(64)));
    }

    #[test]
    fn test_asset_key_tail_regex() {
        assert!(ASSET_KEY_TAIL_REGEX.is_match("image/0b5c2d1e-7f0a-4c36-9d8e-2f4b8a1c6e90"));
        assert!(ASSET_KEY_TAIL_REGEX.is_match("application/a"));
        assert!(!ASSET_KEY_TAIL_REGEX.is_match("../../bob/assets/image/x"));
        assert!(!ASSET_KEY_TAIL_REGEX.is_match("../x"));
        assert!(!ASSET_KEY_TAIL_REGEX.is_match("./x"));
        assert!(!ASSET_KEY_TAIL_REGEX.is_match("image/.."));
        assert!(!ASSET_KEY_TAIL_REGEX.is_match("image//x"));
        assert!(!ASSET_KEY_TAIL_REGEX.is_match("image/a/b"));
        assert!(!ASSET_KEY_TAIL_REGEX.is_match("image\\x"));
        assert!(!ASSET_KEY_TAIL_REGEX.is_match("Image/x"));
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
        #[validate(range(min = 1))]
        size_bytes: u64,
    }

    #[test]
    fn test_field_messages_prefix_and_wire_names() {
        let errors = Sample {
            name: String::new(),
            size_bytes: 0,
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            field_messages("[3].", &errors),
            vec!["[3].name: name is required", "[3].sizeBytes: range"]
        );
    }
}

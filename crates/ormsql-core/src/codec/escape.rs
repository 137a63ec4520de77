//! MySQL literal and identifier escaping.
//!
//! Every string that reaches generated SQL goes through one of these two
//! functions.

/// Quote a string as a MySQL string literal.
///
/// Backslash-escapes NUL, backspace, tab, newline, carriage return, Ctrl-Z,
/// both quote characters, and the backslash itself.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Quote an identifier with backticks.
///
/// Embedded backticks are doubled; `a.b` becomes `` `a`.`b` `` so qualified
/// names keep working.
pub fn escape_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('`');
    for ch in name.chars() {
        match ch {
            '`' => out.push_str("``"),
            '.' => out.push_str("`.`"),
            c => out.push(c),
        }
    }
    out.push('`');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain() {
        assert_eq!(escape_string("active"), "'active'");
    }

    #[test]
    fn test_escape_injection() {
        assert_eq!(escape_string("x' OR '1'='1"), r"'x\' OR \'1\'=\'1'");
        assert_eq!(escape_string(r"a\b"), r"'a\\b'");
        assert_eq!(escape_string("line\nbreak\0"), r"'line\nbreak\0'");
        assert_eq!(escape_string("say \"hi\""), r#"'say \"hi\"'"#);
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("name"), "`name`");
        assert_eq!(escape_identifier("person.name"), "`person`.`name`");
        assert_eq!(escape_identifier("we`ird"), "`we``ird`");
    }
}

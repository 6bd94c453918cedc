//! # Shell Quoting
//!
//! Three ways manifest text reaches a generated script:
//!
//! - [`escape_dq`] for free text inside a double-quoted log string.
//! - [`single_quote`] for text that must stay fully literal.
//! - [`quote_with_placeholders`] for installer arguments, which may use the
//!   trusted runtime placeholders `$TARGET_USER` and `$TARGET_HOME`.
//!
//! Free text is never spliced into a script any other way. Command bodies go
//! through heredocs (see [`crate::heredoc`]).

use crate::error::EmitError;

/// Escape text for embedding between double quotes.
///
/// Backslash, double quote, dollar and backtick are backslash-escaped (in
/// that order), then CR, LF and TAB become the two-character sequences
/// `\r`, `\n` and `\t`, so the text stays on one logical line.
pub fn escape_dq(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '`' => out.push_str("\\`"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Wrap text in single quotes. Embedded single quotes become `'\''`.
pub fn single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Runtime placeholders allowed to stay expandable.
const PLACEHOLDERS: &[(&str, &str)] = &[
    ("${TARGET_USER}", "TARGET_USER"),
    ("${TARGET_HOME}", "TARGET_HOME"),
    ("$TARGET_USER", "TARGET_USER"),
    ("$TARGET_HOME", "TARGET_HOME"),
];

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Match an allowlisted placeholder at the start of `rest`, returning the
/// variable name and the matched length.
fn placeholder_at(rest: &str) -> Option<(&'static str, usize)> {
    PLACEHOLDERS.iter().find_map(|(token, name)| {
        let tail = rest.strip_prefix(token)?;
        let braced = token.ends_with('}');
        if !braced && tail.bytes().next().is_some_and(is_ident_byte) {
            return None;
        }
        Some((*name, token.len()))
    })
}

/// Quote an argument, keeping only the allowlisted placeholders expandable.
///
/// Everything else is single-quoted. `$TARGET_HOME/bin` becomes
/// `"${TARGET_HOME}"'/bin'`; `$OTHER` stays literal.
///
/// # Errors
///
/// Returns [`EmitError::CommandSubstitution`] if the value contains `$(` or
/// a backtick anywhere, placeholder or not.
pub fn quote_with_placeholders(value: &str) -> Result<String, EmitError> {
    if value.contains("$(") || value.contains('`') {
        return Err(EmitError::CommandSubstitution {
            value: value.to_string(),
        });
    }

    let mut out = String::new();
    let mut literal = String::new();
    let mut rest = value;
    while !rest.is_empty() {
        if let Some((name, len)) = placeholder_at(rest) {
            if !literal.is_empty() {
                out.push_str(&single_quote(&literal));
                literal.clear();
            }
            out.push_str(&format!("\"${{{name}}}\""));
            rest = &rest[len..];
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            literal.push(c);
        }
        rest = chars.as_str();
    }
    if !literal.is_empty() || out.is_empty() {
        out.push_str(&single_quote(&literal));
    }
    Ok(out)
}

/// Encode free text for one tab-separated doctor table field: backslash,
/// newline, tab and CR become `\\`, `\n`, `\t`, `\r`. Decoded at run time
/// with `printf '%b'`.
pub fn encode_field(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Minimal POSIX reader for a word made of single-quoted segments and
    /// backslash-escaped characters. `None` if anything else would be
    /// interpreted by the shell.
    fn shell_word(word: &str) -> Option<String> {
        let mut out = String::new();
        let mut chars = word.chars();
        while let Some(c) = chars.next() {
            match c {
                '\'' => loop {
                    match chars.next()? {
                        '\'' => break,
                        inner => out.push(inner),
                    }
                },
                '\\' => out.push(chars.next()?),
                _ => return None,
            }
        }
        Some(out)
    }

    #[test]
    fn escape_dq_neutralises_expansion() {
        assert_eq!(escape_dq("$(rm -rf /)"), "\\$(rm -rf /)");
        assert_eq!(escape_dq("`id`"), "\\`id\\`");
        assert_eq!(escape_dq("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_dq("a\\b"), "a\\\\b");
        assert_eq!(escape_dq("one\ntwo\tthree\r"), "one\\ntwo\\tthree\\r");
    }

    #[test]
    fn escape_dq_backslash_first() {
        // A pre-escaped dollar must not collapse back into an expansion.
        assert_eq!(escape_dq("\\$HOME"), "\\\\\\$HOME");
    }

    #[test]
    fn single_quote_handles_embedded_quotes() {
        assert_eq!(single_quote("plain"), "'plain'");
        assert_eq!(single_quote("it's"), "'it'\\''s'");
        assert_eq!(single_quote(""), "''");
        assert_eq!(single_quote("$(id)"), "'$(id)'");
    }

    #[test]
    fn placeholders_stay_expandable() {
        assert_eq!(
            quote_with_placeholders("$TARGET_HOME/.local").unwrap(),
            "\"${TARGET_HOME}\"'/.local'"
        );
        assert_eq!(
            quote_with_placeholders("--user=${TARGET_USER}").unwrap(),
            "'--user='\"${TARGET_USER}\""
        );
        assert_eq!(
            quote_with_placeholders("$TARGET_USER:$TARGET_USER").unwrap(),
            "\"${TARGET_USER}\"':'\"${TARGET_USER}\""
        );
    }

    #[test]
    fn other_variables_stay_literal() {
        assert_eq!(quote_with_placeholders("$HOME").unwrap(), "'$HOME'");
        assert_eq!(
            quote_with_placeholders("$TARGET_HOMEDIR").unwrap(),
            "'$TARGET_HOMEDIR'"
        );
        assert_eq!(quote_with_placeholders("--unattended").unwrap(), "'--unattended'");
        assert_eq!(quote_with_placeholders("").unwrap(), "''");
    }

    #[test]
    fn command_substitution_is_refused() {
        for value in ["$(id)", "`id`", "$TARGET_HOME/$(id)", "${TARGET_HOME}`x`"] {
            assert!(
                matches!(
                    quote_with_placeholders(value),
                    Err(EmitError::CommandSubstitution { .. })
                ),
                "{value:?}"
            );
        }
    }

    #[test]
    fn encode_field_escapes_separators() {
        assert_eq!(encode_field("a\tb\nc\\d\r"), "a\\tb\\nc\\\\d\\r");
        assert_eq!(encode_field("plain text"), "plain text");
    }

    proptest! {
        #[test]
        fn escape_dq_output_has_no_bare_specials(s in any::<String>()) {
            let escaped = escape_dq(&s);
            prop_assert!(!escaped.contains('\n') && !escaped.contains('\r') && !escaped.contains('\t'));
            // Every special character is preceded by an odd run of backslashes.
            let bytes = escaped.as_bytes();
            for (i, b) in bytes.iter().enumerate() {
                if matches!(b, b'"' | b'$' | b'`') {
                    let run = bytes[..i].iter().rev().take_while(|&&c| c == b'\\').count();
                    prop_assert!(run % 2 == 1, "unescaped {:?} in {:?}", *b as char, escaped);
                }
            }
        }

        #[test]
        fn single_quote_reads_back_as_one_word(s in any::<String>()) {
            prop_assert_eq!(shell_word(&single_quote(&s)), Some(s));
        }

        #[test]
        fn encode_field_output_is_single_field(s in any::<String>()) {
            let encoded = encode_field(&s);
            prop_assert!(!encoded.contains('\t') && !encoded.contains('\n') && !encoded.contains('\r'));
        }
    }
}

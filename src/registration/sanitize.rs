//! Field sanitizers shared by the form validator and the gateway.
//!
//! Each field class has its own sanitizer. All of them are idempotent:
//! running one twice gives the same result as running it once, which is what
//! lets the form validator detect values that bypassed sanitization.

use regex::Regex;
use std::sync::OnceLock;

static SCRIPT_BODY_REGEX: OnceLock<Regex> = OnceLock::new();
static STYLE_BODY_REGEX: OnceLock<Regex> = OnceLock::new();
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

/// Which sanitizer applies to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Text,
    Phone,
    Date,
    Password,
    Token,
}

impl FieldClass {
    /// Run the sanitizer for this field class.
    pub fn sanitize(self, value: &str) -> String {
        match self {
            FieldClass::Text => sanitize_text(value),
            FieldClass::Phone => sanitize_phone(value),
            FieldClass::Date => sanitize_date(value),
            FieldClass::Password => sanitize_password(value),
            FieldClass::Token => sanitize_token(value),
        }
    }
}

/// Replace line breaks and tabs with a space and drop every other control
/// character.
///
/// A `\r\n` pair collapses into a single space.
pub fn strip_control_chars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' | '\t' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}

/// Strip markup from free text.
///
/// Behaves like an HTML filter with an empty tag allow-list: `<script>` and
/// `<style>` elements are removed together with their bodies, every other tag
/// is removed but its text is kept, and stray angle brackets are dropped.
pub fn strip_html(value: &str) -> String {
    if !value.contains(['<', '>']) {
        return value.to_string();
    }

    let script = SCRIPT_BODY_REGEX.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?(?:</script\s*>|$)")
            .expect("script body regex is valid")
    });
    let style = STYLE_BODY_REGEX.get_or_init(|| {
        Regex::new(r"(?is)<style\b[^>]*>.*?(?:</style\s*>|$)").expect("style body regex is valid")
    });
    let tag = TAG_REGEX
        .get_or_init(|| Regex::new(r"<[/!?]?[A-Za-z][^<>]*>").expect("tag regex is valid"));

    let without_scripts = script.replace_all(value, "");
    let without_styles = style.replace_all(&without_scripts, "");
    let without_tags = tag.replace_all(&without_styles, "");

    without_tags.replace(['<', '>'], "")
}

/// Sanitize a free-text field (name, email, dojo, rank, emergency contact
/// name, medical conditions).
pub fn sanitize_text(value: &str) -> String {
    let stripped = strip_html(value.trim());
    strip_control_chars(&stripped).trim().to_string()
}

/// Sanitize a phone field: only digits, `+`, whitespace and `( ) . -` survive.
pub fn sanitize_phone(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || c.is_whitespace() || "+().-".contains(*c))
        .collect();
    strip_control_chars(&kept).trim().to_string()
}

/// Sanitize a date field: only ASCII digits and `-` survive.
pub fn sanitize_date(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Passwords keep every printable character; only control characters are
/// normalised.
pub fn sanitize_password(value: &str) -> String {
    strip_control_chars(value)
}

/// Sanitize the bot-verification token.
pub fn sanitize_token(value: &str) -> String {
    strip_control_chars(value.trim()).trim().to_string()
}

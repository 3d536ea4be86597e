//! Single forward pass over the input. Markup is tokenized without building
//! a tree; disallowed elements are skipped together with everything inside
//! them, allowed elements are re-emitted in a normalized form (lowercased
//! names, filtered attributes, balanced close tags, entity-escaped text) so
//! that running the pass over its own output changes nothing.

use crate::policy::Policy;

/// Elements that never hold content; a disallowed one is dropped as a bare
/// tag instead of swallowing what follows it.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text up to the literal close tag. A
/// `</div>` inside a script body is script data, not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "title", "textarea",
];

/// Schemes an `href` may carry; anything else (javascript:, data:, ...) is
/// dropped with the attribute.
const SAFE_URI_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "ftp"];

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-'
}

struct Tag {
    name: String,
    attrs: Vec<(String, Option<String>)>,
}

enum Token {
    /// Open tag parsed up to and including its `>`.
    Open(Tag, usize),
    /// Close tag; the name is lowercased.
    Close(String, usize),
    /// Comment, doctype or processing instruction — dropped.
    Skip(usize),
    /// A `<` that does not begin markup; emitted as text.
    LoneLt,
    /// Markup left unterminated at end of input; the remainder is dropped.
    Truncated,
}

pub(crate) fn scan(policy: &Policy, input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut open: Vec<String> = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let Some(rel) = input[pos..].find('<') else {
            emit_text(&mut out, &input[pos..]);
            break;
        };
        let lt = pos + rel;
        emit_text(&mut out, &input[pos..lt]);

        match parse_token(input, lt) {
            Token::Open(tag, end) => {
                pos = end;
                if policy.tag_allowed(&tag.name) {
                    emit_open(&mut out, policy, &tag);
                    if !is_void(&tag.name) {
                        open.push(tag.name);
                    }
                } else if is_void(&tag.name) {
                    // dropped tag, nothing to skip
                } else if is_raw_text(&tag.name) {
                    pos = skip_raw_text(input, end, &tag.name);
                } else {
                    pos = skip_element(input, end, &tag.name);
                }
            }
            Token::Close(name, end) => {
                pos = end;
                if let Some(idx) = open.iter().rposition(|n| *n == name) {
                    let closing = open.split_off(idx);
                    for n in closing.iter().rev() {
                        out.push_str("</");
                        out.push_str(n);
                        out.push('>');
                    }
                }
            }
            Token::Skip(end) => pos = end,
            Token::LoneLt => {
                escape_into(&mut out, "<", false);
                pos = lt + 1;
            }
            Token::Truncated => {
                pos = input.len();
            }
        }
    }

    for n in open.iter().rev() {
        out.push_str("</");
        out.push_str(n);
        out.push('>');
    }

    out
}

fn parse_token(input: &str, lt: usize) -> Token {
    let bytes = input.as_bytes();
    let Some(&c) = bytes.get(lt + 1) else {
        return Token::LoneLt;
    };
    match c {
        b'!' => {
            if input[lt..].starts_with("<!--") {
                match input[lt + 4..].find("-->") {
                    Some(i) => Token::Skip(lt + 4 + i + 3),
                    None => Token::Truncated,
                }
            } else {
                match input[lt..].find('>') {
                    Some(i) => Token::Skip(lt + i + 1),
                    None => Token::Truncated,
                }
            }
        }
        b'?' => match input[lt..].find('>') {
            Some(i) => Token::Skip(lt + i + 1),
            None => Token::Truncated,
        },
        b'/' => match bytes.get(lt + 2) {
            Some(c2) if c2.is_ascii_alphabetic() => {
                let name_start = lt + 2;
                let mut i = name_start;
                while i < bytes.len() && is_name_byte(bytes[i]) {
                    i += 1;
                }
                let name = input[name_start..i].to_ascii_lowercase();
                match input[i..].find('>') {
                    Some(j) => Token::Close(name, i + j + 1),
                    None => Token::Truncated,
                }
            }
            // "</>" and "</ ..." are bogus comments
            _ => match input[lt..].find('>') {
                Some(i) => Token::Skip(lt + i + 1),
                None => Token::Truncated,
            },
        },
        c if c.is_ascii_alphabetic() => parse_open(input, lt),
        _ => Token::LoneLt,
    }
}

fn parse_open(input: &str, lt: usize) -> Token {
    let bytes = input.as_bytes();
    let mut i = lt + 1;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = input[lt + 1..i].to_ascii_lowercase();
    let mut attrs: Vec<(String, Option<String>)> = Vec::new();

    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() {
            return Token::Truncated;
        }
        if bytes[i] == b'>' {
            return Token::Open(Tag { name, attrs }, i + 1);
        }

        let astart = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        if i == astart {
            // a stray '=' before any name; swallow it
            i += 1;
            continue;
        }
        let aname = input[astart..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = None;
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() {
                match bytes[i] {
                    q @ (b'"' | b'\'') => {
                        let vstart = i + 1;
                        match input[vstart..].find(q as char) {
                            Some(j) => {
                                value = Some(input[vstart..vstart + j].to_string());
                                i = vstart + j + 1;
                            }
                            None => return Token::Truncated,
                        }
                    }
                    _ => {
                        let vstart = i;
                        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>'
                        {
                            i += 1;
                        }
                        value = Some(input[vstart..i].to_string());
                    }
                }
            }
        }
        attrs.push((aname, value));
    }
}

/// Skip a disallowed element and everything inside it. Same-name nesting is
/// honored; raw-text children are skipped literally so a close tag hidden in
/// script data cannot terminate the outer element early.
fn skip_element(input: &str, mut pos: usize, name: &str) -> usize {
    let mut depth = 1usize;
    while pos < input.len() {
        let Some(rel) = input[pos..].find('<') else {
            return input.len();
        };
        let lt = pos + rel;
        match parse_token(input, lt) {
            Token::Open(tag, end) => {
                if is_raw_text(&tag.name) {
                    pos = skip_raw_text(input, end, &tag.name);
                } else {
                    if tag.name == name && !is_void(&tag.name) {
                        depth += 1;
                    }
                    pos = end;
                }
            }
            Token::Close(cname, end) => {
                pos = end;
                if cname == name {
                    depth -= 1;
                    if depth == 0 {
                        return pos;
                    }
                }
            }
            Token::Skip(end) => pos = end,
            Token::LoneLt => pos = lt + 1,
            Token::Truncated => return input.len(),
        }
    }
    input.len()
}

/// Skip raw-text content up to (and including) the literal close tag.
fn skip_raw_text(input: &str, from: usize, name: &str) -> usize {
    let bytes = input.as_bytes();
    let nbytes = name.as_bytes();
    let mut i = from;
    while i + 2 + nbytes.len() <= bytes.len() {
        if bytes[i] == b'<'
            && bytes[i + 1] == b'/'
            && bytes[i + 2..i + 2 + nbytes.len()].eq_ignore_ascii_case(nbytes)
        {
            let after = i + 2 + nbytes.len();
            let boundary_ok = bytes.get(after).is_none_or(|b| !is_name_byte(*b));
            if boundary_ok {
                return match input[after..].find('>') {
                    Some(j) => after + j + 1,
                    None => input.len(),
                };
            }
        }
        i += 1;
    }
    input.len()
}

fn emit_open(out: &mut String, policy: &Policy, tag: &Tag) {
    out.push('<');
    out.push_str(&tag.name);
    let mut seen: Vec<&str> = Vec::new();
    for (name, value) in &tag.attrs {
        if !policy.attr_allowed(name) || seen.contains(&name.as_str()) {
            continue;
        }
        let decoded = decode_entities(value.as_deref().unwrap_or(""));
        if name == "href" && !href_allowed(&decoded) {
            continue;
        }
        seen.push(name);
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(out, &decoded, true);
        out.push('"');
    }
    out.push('>');
}

fn emit_text(out: &mut String, raw: &str) {
    if raw.is_empty() {
        return;
    }
    let decoded = decode_entities(raw);
    escape_into(out, &decoded, false);
}

fn escape_into(out: &mut String, s: &str, in_attr: bool) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn href_allowed(value: &str) -> bool {
    // Control characters and whitespace are transparent to browsers when
    // sniffing the scheme ("java\tscript:"), so strip them before looking.
    let cleaned: String = value
        .chars()
        .filter(|c| *c > '\u{20}' && *c != '\u{7f}')
        .collect();
    let lower = cleaned.to_ascii_lowercase();
    match lower.split_once(':') {
        None => true,
        Some((scheme, _)) => {
            // a ':' past the first path/query/fragment byte is not a scheme
            scheme.contains(['/', '?', '#']) || SAFE_URI_SCHEMES.contains(&scheme)
        }
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        if rest.starts_with('&') {
            if let Some((decoded, len)) = decode_entity(rest) {
                out.push(decoded);
                i += len;
                continue;
            }
        }
        let ch = rest.chars().next().expect("non-empty remainder");
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Decode one entity at the start of `s` (which begins with `&`). Returns
/// the character and the byte length consumed, or None when the sequence is
/// not an entity and the `&` stands for itself.
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let body = &s[1..];
    if let Some(num) = body.strip_prefix('#') {
        let (digits, radix, prefix_len) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 3),
            None => (num, 10, 2),
        };
        let end = digits
            .char_indices()
            .find(|(_, c)| !c.is_digit(radix))
            .map(|(i, _)| i)
            .unwrap_or(digits.len());
        if end == 0 || end > 8 || !digits[end..].starts_with(';') {
            return None;
        }
        let cp = u32::from_str_radix(&digits[..end], radix).ok()?;
        let ch = match cp {
            0 => '\u{fffd}',
            _ => char::from_u32(cp).unwrap_or('\u{fffd}'),
        };
        Some((ch, prefix_len + end + 1))
    } else {
        let semi = body.find(';')?;
        if semi == 0 || semi > 32 {
            return None;
        }
        let ch = match &body[..semi] {
            "amp" | "AMP" => '&',
            "lt" | "LT" => '<',
            "gt" | "GT" => '>',
            "quot" | "QUOT" => '"',
            "apos" => '\'',
            "colon" => ':',
            "semi" => ';',
            "sol" => '/',
            "equals" => '=',
            "nbsp" => '\u{a0}',
            "Tab" => '\t',
            "NewLine" => '\n',
            _ => return None,
        };
        Some((ch, 1 + semi + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;

    fn clean(input: &str) -> String {
        scan(&Policy::default(), input)
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(clean("hello world"), "hello world");
    }

    #[test]
    fn script_and_content_removed_text_preserved() {
        assert_eq!(clean("<script>alert(1)</script>Hello"), "Hello");
    }

    #[test]
    fn disallowed_tag_strips_inner_text() {
        assert_eq!(clean("a<iframe>SECRET</iframe>b"), "ab");
        assert_eq!(clean("<button>click me</button>"), "");
        assert_eq!(clean("<a href=\"x\">link text</a>"), "");
    }

    #[test]
    fn allowed_tag_survives_normalized() {
        assert_eq!(clean("<P>hi</P>"), "<p>hi</p>");
        assert_eq!(clean("<strong>bold</strong>"), "<strong>bold</strong>");
    }

    #[test]
    fn disallowed_attributes_removed_one_by_one() {
        assert_eq!(
            clean("<p onclick=\"x()\" href=\"http://e.com\" id=\"p1\">t</p>"),
            "<p href=\"http://e.com\">t</p>"
        );
    }

    #[test]
    fn event_handler_attributes_always_dropped() {
        assert_eq!(clean("<div onerror=alert(1) onload=x>t</div>"), "<div>t</div>");
    }

    #[test]
    fn raw_text_close_inside_script_stays_script_data() {
        assert_eq!(clean("<div><script>a = \"</div>\";</script>x</div>"), "<div>x</div>");
    }

    #[test]
    fn nested_same_name_disallowed_elements() {
        assert_eq!(clean("<form>a<form>b</form>c</form>tail"), "tail");
    }

    #[test]
    fn void_disallowed_tag_does_not_swallow_following_text() {
        assert_eq!(clean("<input value=x>hi"), "hi");
        assert_eq!(clean("<embed src=x>there"), "there");
        assert_eq!(clean("<img src=x onerror=alert(1)>safe"), "safe");
    }

    #[test]
    fn unterminated_disallowed_tag_drops_remainder() {
        assert_eq!(clean("<object>everything after"), "");
    }

    #[test]
    fn unclosed_allowed_tags_are_balanced() {
        assert_eq!(clean("<div><p>hi"), "<div><p>hi</p></div>");
    }

    #[test]
    fn stray_close_tags_dropped() {
        assert_eq!(clean("</div>hi</script>"), "hi");
    }

    #[test]
    fn overlapping_close_auto_closes_inner() {
        assert_eq!(clean("<div><span>x</div>"), "<div><span>x</span></div>");
    }

    #[test]
    fn br_is_void() {
        assert_eq!(clean("a<br>b<br/>c"), "a<br>b<br>c");
    }

    #[test]
    fn comments_and_doctype_dropped() {
        assert_eq!(clean("a<!-- hidden -->b"), "ab");
        assert_eq!(clean("<!DOCTYPE html>x"), "x");
        assert_eq!(clean("<?php evil(); ?>y"), "y");
    }

    #[test]
    fn lone_angle_brackets_become_entities() {
        assert_eq!(clean("1 < 2 > 0"), "1 &lt; 2 &gt; 0");
        assert_eq!(clean("<3"), "&lt;3");
    }

    #[test]
    fn entities_in_text_stay_inert() {
        assert_eq!(clean("&lt;script&gt;"), "&lt;script&gt;");
        assert_eq!(clean("a &amp; b"), "a &amp; b");
    }

    #[test]
    fn javascript_href_dropped() {
        assert_eq!(clean("<p href=\"javascript:alert(1)\">t</p>"), "<p>t</p>");
        assert_eq!(clean("<p href=\"java\tscript:alert(1)\">t</p>"), "<p>t</p>");
        assert_eq!(clean("<p href=\"JAVASCRIPT:x\">t</p>"), "<p>t</p>");
        assert_eq!(clean("<p href=\"javascript&colon;x\">t</p>"), "<p>t</p>");
        assert_eq!(clean("<p href=\"data:text/html,x\">t</p>"), "<p>t</p>");
    }

    #[test]
    fn plain_href_kept() {
        assert_eq!(
            clean("<p href=\"https://example.com/a?b=1\" target=\"_blank\">t</p>"),
            "<p href=\"https://example.com/a?b=1\" target=\"_blank\">t</p>"
        );
        assert_eq!(clean("<p href=\"/relative\">t</p>"), "<p href=\"/relative\">t</p>");
    }

    #[test]
    fn duplicate_attributes_keep_first() {
        assert_eq!(
            clean("<p target=\"_blank\" target=\"_self\">t</p>"),
            "<p target=\"_blank\">t</p>"
        );
    }

    #[test]
    fn style_content_dropped_entirely() {
        assert_eq!(clean("<style>p { color: red }</style>after"), "after");
    }

    #[test]
    fn unicode_text_untouched() {
        assert_eq!(clean("héllo ∀x ümlaut"), "héllo ∀x ümlaut");
        assert_eq!(clean("<p>mañana</p>"), "<p>mañana</p>");
    }
}

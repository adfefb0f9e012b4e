//! Token sanitization for class-like attribute values.

/// Reduce a single token to the characters that are safe inside an HTML
/// `class` attribute. Percent-encoded octets are stripped first so encoded
/// junk cannot smuggle bytes through, then everything outside
/// `[A-Za-z0-9_-]` is dropped.
pub fn sanitize_html_class(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let bytes = token.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            i += 3;
            continue;
        }
        let c = bytes[i] as char;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        }
        i += 1;
    }

    out
}

/// Sanitize every entry of a token list and join the survivors with single
/// spaces. Empty results are dropped so repeated sanitize/join/split cycles
/// are stable.
pub fn sanitize_token_list<'a, I>(tokens: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    tokens
        .into_iter()
        .map(sanitize_html_class)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

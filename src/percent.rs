//! §4.B — percent-decode/encode for request-target octets.
//!
//! The decode side is grounded on `cbiffle-httpd1`'s `unescape()`
//! (`other_examples/...cbiffle-httpd1__src-lib.rs.rs`), generalized to also
//! fold `+` into space and to pass malformed `%` sequences through verbatim
//! rather than erroring, per `spec.md` §4.B.

/// Decodes `'+' -> ' '` and `%HH -> byte HH` (case-insensitive hex). A
/// malformed `%` (non-hex digits, or truncated at the end of the string) is
/// copied through unchanged, `%` and all.
pub fn decode(src: &str) -> String {
    let bytes = src.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if bytes.len() >= i + 3 => {
                match (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi * 16 + lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    // The decoded octets are not guaranteed valid UTF-8 (arbitrary bytes can
    // follow a `%XX`); lossily recover a `String` rather than fail the
    // request over it — the normalizer and filesystem layer operate on
    // whatever text comes out.
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Control-char-safe encoding for `Location` headers: bytes `< 0x20` or
/// `> 0x7F` become `%XX` (upper-case hex); everything else, including `/`,
/// `.`, `%`, and reserved characters, passes through unchanged. This is
/// intentionally not general URL-encoding.
pub fn encode(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    for &b in src.as_bytes() {
        if b < 0x20 || b > 0x7F {
            out.push_str(&format!("%{:02X}", b));
        } else {
            out.push(b as char);
        }
    }
    out
}

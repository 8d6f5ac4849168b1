//! Reversible field-name encoding
//!
//! Solr accepts almost anything as a field name, but anything outside
//! `[0-9a-zA-Z_]` causes trouble in query strings, function queries and
//! local params. Every other character is replaced by `_X<hex>_`, where
//! `<hex>` is the lowercase hex of its UTF-8 bytes:
//!
//! - `tm_entity:node/body` → `tm_entity_X3a_node_X2f_body`
//! - `last_XMas` → `last_X5f58_Mas` (the introducer itself is escaped)
//!
//! The format is shared with names already stored in existing indexes, so
//! the alphabet and the decode rule must not change.

const INTRODUCER: &str = "_X";
const TERMINATOR: u8 = b'_';

/// Encode a field name into the engine-safe alphabet.
pub fn encode(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' && chars.peek() == Some(&'X') {
            chars.next();
            push_escape(&mut encoded, INTRODUCER.as_bytes());
        } else if c.is_ascii_alphanumeric() || c == '_' {
            encoded.push(c);
        } else {
            let mut buf = [0u8; 4];
            push_escape(&mut encoded, c.encode_utf8(&mut buf).as_bytes());
        }
    }

    encoded
}

/// Decode a field name produced by [`encode`].
///
/// Escapes whose payload is not valid hex, has an odd length or is not
/// valid UTF-8 are kept as they are.
pub fn decode(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut decoded = String::with_capacity(name.len());
    let mut cursor = 0;
    let mut literal_start = 0;

    while let Some(offset) = name[cursor..].find(INTRODUCER) {
        let start = cursor + offset;
        let hex_start = start + INTRODUCER.len();
        let hex_len = bytes[hex_start..]
            .iter()
            .take_while(|b| is_lower_hex(**b))
            .count();
        let hex_end = hex_start + hex_len;

        if hex_len > 0 && bytes.get(hex_end) == Some(&TERMINATOR) {
            if let Some(chunk) = decode_hex(&name[hex_start..hex_end]) {
                decoded.push_str(&name[literal_start..start]);
                decoded.push_str(&chunk);
                cursor = hex_end + 1;
                literal_start = cursor;
                continue;
            }
        }

        cursor = start + 1;
    }

    decoded.push_str(&name[literal_start..]);
    decoded
}

/// True when `name` only uses characters that never need escaping.
///
/// A safe name may still contain `_X`, so it is not necessarily a fixed
/// point of [`encode`].
pub fn is_encoded_safe(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn push_escape(out: &mut String, bytes: &[u8]) {
    out.push_str(INTRODUCER);
    out.push_str(&hex::encode(bytes));
    out.push(TERMINATOR as char);
}

fn is_lower_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'a'..=b'f').contains(&b)
}

fn decode_hex(hex: &str) -> Option<String> {
    let bytes = hex::decode(hex).ok()?;
    String::from_utf8(bytes).ok()
}

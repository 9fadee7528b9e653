//! Hand-rolled XML parser covering the subset the client's asset files
//! use: declarations, elements, attributes with either quote style,
//! character and numeric entities, CDATA sections, comments and DOCTYPE.
//!
//! Whitespace-only text runs are dropped so that parse/serialize cycles
//! through the indenting printer stay stable. Unknown entities are passed
//! through literally rather than rejected, since shipped asset files are
//! not always strictly conforming.

use crate::xml::errors::ParseError;
use crate::xml::node::{Document, NodeId};
use std::fs;
use std::path::Path;

/// Parse a document from raw bytes, stripping a UTF-8 byte-order marker
/// when present.
pub fn parse(bytes: &[u8]) -> Result<Document, ParseError> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)?;
    parse_str(text)
}

/// Parse a document from a string slice.
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut doc = Document::new();
    let mut cur = Cursor::new(input);

    cur.skip_whitespace();
    while !cur.at_end() {
        if cur.starts_with("<?") {
            parse_processing_instruction(&mut cur, &mut doc)?;
        } else if cur.starts_with("<!--") {
            let comment = parse_comment(&mut cur)?;
            let node = doc.create_comment(comment);
            let root = doc.root();
            doc.append_child(root, node);
        } else if cur.starts_with("<!DOCTYPE") {
            skip_doctype(&mut cur)?;
        } else if cur.starts_with("<!") {
            return Err(cur.malformed("unsupported markup declaration"));
        } else if cur.starts_with("</") {
            return Err(cur.malformed("closing tag without an open element"));
        } else if cur.starts_with("<") {
            let element = parse_element(&mut cur, &mut doc)?;
            let root = doc.root();
            doc.append_child(root, element);
        } else {
            return Err(cur.malformed("text outside of any element"));
        }
        cur.skip_whitespace();
    }

    if doc.document_element().is_none() {
        return Err(ParseError::Malformed {
            offset: 0,
            detail: "no root element".to_string(),
        });
    }
    Ok(doc)
}

/// Read and parse the file at `path`.
pub fn parse_file(path: &Path) -> Result<Document, ParseError> {
    let bytes = fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&bytes)
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Consume `prefix` if it is next; report whether it was.
    fn eat(&mut self, prefix: &str) -> bool {
        if self.starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        let bytes = self.input.as_bytes();
        while let Some(&b) = bytes.get(self.pos) {
            if b == b' ' || b == b'\t' || b == b'\r' || b == b'\n' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Advance past `pat`, returning the text before it. Errors at EOF.
    fn take_until(&mut self, pat: &str) -> Result<&'a str, ParseError> {
        match self.rest().find(pat) {
            Some(rel) => {
                let start = self.pos;
                self.pos += rel + pat.len();
                Ok(&self.input[start..start + rel])
            }
            None => Err(ParseError::UnexpectedEof {
                offset: self.input.len(),
            }),
        }
    }

    fn malformed(&self, detail: &str) -> ParseError {
        ParseError::Malformed {
            offset: self.pos,
            detail: detail.to_string(),
        }
    }

    fn eof(&self) -> ParseError {
        ParseError::UnexpectedEof {
            offset: self.input.len(),
        }
    }
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':') || b >= 0x80
}

fn parse_name<'a>(cur: &mut Cursor<'a>) -> Result<&'a str, ParseError> {
    let bytes = cur.input.as_bytes();
    let start = cur.pos;
    match bytes.get(start) {
        Some(&b) if is_name_start(b) => {}
        Some(_) => return Err(cur.malformed("expected a name")),
        None => return Err(cur.eof()),
    }
    let mut end = start + 1;
    while end < bytes.len() && is_name_byte(bytes[end]) {
        end += 1;
    }
    cur.pos = end;
    Ok(&cur.input[start..end])
}

fn parse_attribute(cur: &mut Cursor) -> Result<(String, String), ParseError> {
    let name = parse_name(cur)?.to_string();
    cur.skip_whitespace();
    if !cur.eat("=") {
        return Err(cur.malformed("expected '=' after attribute name"));
    }
    cur.skip_whitespace();
    let quote = match cur.peek() {
        Some(b'"') => "\"",
        Some(b'\'') => "'",
        Some(_) => return Err(cur.malformed("expected quoted attribute value")),
        None => return Err(cur.eof()),
    };
    cur.pos += 1;
    let raw = cur.take_until(quote)?;
    Ok((name, decode_entities(raw)))
}

fn parse_comment(cur: &mut Cursor) -> Result<String, ParseError> {
    debug_assert!(cur.starts_with("<!--"));
    cur.pos += 4;
    Ok(cur.take_until("-->")?.to_string())
}

fn skip_doctype(cur: &mut Cursor) -> Result<(), ParseError> {
    debug_assert!(cur.starts_with("<!DOCTYPE"));
    cur.pos += "<!DOCTYPE".len();
    let mut depth = 1usize;
    let bytes = cur.input.as_bytes();
    while cur.pos < bytes.len() {
        match bytes[cur.pos] {
            b'<' => depth += 1,
            b'>' => {
                depth -= 1;
                if depth == 0 {
                    cur.pos += 1;
                    return Ok(());
                }
            }
            _ => {}
        }
        cur.pos += 1;
    }
    Err(cur.eof())
}

/// Parse `<? ... ?>`. The XML declaration contributes its encoding label
/// to the document; any other processing instruction is skipped.
fn parse_processing_instruction(cur: &mut Cursor, doc: &mut Document) -> Result<(), ParseError> {
    debug_assert!(cur.starts_with("<?"));
    cur.pos += 2;
    let target = parse_name(cur)?.to_string();
    if target != "xml" {
        cur.take_until("?>")?;
        return Ok(());
    }
    loop {
        cur.skip_whitespace();
        if cur.eat("?>") {
            return Ok(());
        }
        if cur.at_end() {
            return Err(cur.eof());
        }
        let (name, value) = parse_attribute(cur)?;
        if name == "encoding" {
            doc.set_encoding(value);
        }
    }
}

fn parse_element(cur: &mut Cursor, doc: &mut Document) -> Result<NodeId, ParseError> {
    debug_assert_eq!(cur.peek(), Some(b'<'));
    cur.pos += 1;
    let name = parse_name(cur)?.to_string();
    let element = doc.create_element(name.clone());

    // Attribute list up to `>` or `/>`.
    loop {
        cur.skip_whitespace();
        if cur.eat("/>") {
            return Ok(element);
        }
        if cur.eat(">") {
            break;
        }
        if cur.at_end() {
            return Err(cur.eof());
        }
        let (attr_name, attr_value) = parse_attribute(cur)?;
        doc.set_attribute(element, &attr_name, attr_value);
    }

    // Content up to the matching closing tag.
    loop {
        if cur.at_end() {
            return Err(cur.eof());
        }
        if cur.starts_with("</") {
            let close_offset = cur.pos;
            cur.pos += 2;
            let close = parse_name(cur)?;
            if close != name {
                return Err(ParseError::MismatchedTag {
                    offset: close_offset,
                    expected: name,
                    found: close.to_string(),
                });
            }
            cur.skip_whitespace();
            if !cur.eat(">") {
                return Err(cur.malformed("expected '>' to close tag"));
            }
            return Ok(element);
        } else if cur.starts_with("<!--") {
            let comment = parse_comment(cur)?;
            let node = doc.create_comment(comment);
            doc.append_child(element, node);
        } else if cur.starts_with("<![CDATA[") {
            cur.pos += "<![CDATA[".len();
            let content = cur.take_until("]]>")?.to_string();
            let node = doc.create_cdata(content);
            doc.append_child(element, node);
        } else if cur.starts_with("<?") {
            parse_processing_instruction(cur, doc)?;
        } else if cur.starts_with("<!") {
            return Err(cur.malformed("unsupported markup declaration"));
        } else if cur.starts_with("<") {
            let child = parse_element(cur, doc)?;
            doc.append_child(element, child);
        } else {
            let start = cur.pos;
            let rel = cur.rest().find('<').unwrap_or(cur.rest().len());
            cur.pos += rel;
            let raw = &cur.input[start..start + rel];
            if !raw.chars().all(|c| c.is_ascii_whitespace()) {
                let node = doc.create_text(decode_entities(raw));
                doc.append_child(element, node);
            }
        }
    }
}

/// Decode character and numeric entity references, passing unknown or
/// malformed references through literally.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= 9)
            .and_then(|end| {
                let entity = &tail[1..1 + end];
                let c = match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "apos" => Some('\''),
                    "quot" => Some('"'),
                    _ => {
                        let code = entity.strip_prefix('#')?;
                        let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X'))
                        {
                            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                            None => code.parse().ok()?,
                        };
                        char::from_u32(value)
                    }
                };
                c.map(|c| (c, 2 + end))
            });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

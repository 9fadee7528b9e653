//! Indenting serializer. Mirrors the layout the client's own tools emit:
//! an XML declaration, two-space indentation, character content inlined
//! when an element holds nothing but text or CDATA.

use crate::xml::node::{Document, NodeId, NodeKind};

const INDENT: &str = "  ";

/// Serialize the whole document, declaration included.
///
/// The declaration repeats the encoding label the document was parsed
/// with, defaulting to `utf-8` for documents built in memory.
#[must_use]
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    let encoding = doc.encoding().unwrap_or("utf-8");
    out.push_str("<?xml version=\"1.0\" encoding=\"");
    out.push_str(encoding);
    out.push_str("\"?>\n");
    for &child in doc.children(doc.root()) {
        write_node(doc, child, 0, &mut out);
    }
    out
}

/// Serialize a single subtree without a declaration.
#[must_use]
pub fn serialize_node(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, node, 0, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Document => {
            for &child in doc.children(id) {
                write_node(doc, child, depth, out);
            }
        }
        NodeKind::Element { name, attributes } => {
            push_indent(out, depth);
            out.push('<');
            out.push_str(name);
            for attr in attributes {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                push_escaped(out, &attr.value, true);
                out.push('"');
            }
            let children = doc.children(id);
            if children.is_empty() {
                out.push_str("/>\n");
            } else if children.iter().all(|&c| is_character_data(doc, c)) {
                out.push('>');
                for &child in children {
                    write_character_data(doc, child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push_str(">\n");
            } else {
                out.push_str(">\n");
                for &child in children {
                    write_node(doc, child, depth + 1, out);
                }
                push_indent(out, depth);
                out.push_str("</");
                out.push_str(name);
                out.push_str(">\n");
            }
        }
        NodeKind::Text(_) | NodeKind::CData(_) => {
            push_indent(out, depth);
            write_character_data(doc, id, out);
            out.push('\n');
        }
        NodeKind::Comment(text) => {
            push_indent(out, depth);
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->\n");
        }
    }
}

fn is_character_data(doc: &Document, id: NodeId) -> bool {
    matches!(doc.kind(id), NodeKind::Text(_) | NodeKind::CData(_))
}

fn write_character_data(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Text(text) => push_escaped(out, text, false),
        NodeKind::CData(text) => {
            out.push_str("<![CDATA[");
            // A literal "]]>" inside the content would end the section
            // early, so split it across two sections.
            out.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
            out.push_str("]]>");
        }
        _ => {}
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn push_escaped(out: &mut String, text: &str, in_attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

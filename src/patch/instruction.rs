//! Instruction model compiled out of the composed patch tree.

use crate::xml::{Document, NodeId};
use xxhash_rust::xxh3::xxh3_64;

/// Where an insert places fresh content among the context node's
/// children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOrder {
    First,
    Last,
    /// Zero-based child index, clamped to the child count at apply time.
    At(usize),
}

/// One structural instruction.
///
/// `content` ids reference template nodes inside the composed patch
/// document; they are deep-copied into the target on application.
#[derive(Debug, Clone)]
pub enum Instruction {
    /// Recurse into every node the path expression matches.
    Select { path: String, body: Vec<Instruction> },
    /// Detach matched nodes, parking them under `key`, and splice the
    /// content in their place.
    Replace {
        path: String,
        key: u64,
        content: Vec<NodeId>,
    },
    /// Detach matched nodes, parking them under `key`.
    Remove { path: String, key: u64 },
    /// Reattach whatever an earlier replace or remove parked under `key`.
    Restore { path: String, key: u64 },
    /// Instantiate the content under the context node, unless the path
    /// expression already matches something.
    Insert {
        path: String,
        order: InsertOrder,
        content: Vec<NodeId>,
    },
}

impl Instruction {
    /// The instruction's path expression attribute, as written.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Instruction::Select { path, .. }
            | Instruction::Replace { path, .. }
            | Instruction::Remove { path, .. }
            | Instruction::Restore { path, .. }
            | Instruction::Insert { path, .. } => path,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Select { .. } => "select",
            Instruction::Replace { .. } => "replace",
            Instruction::Remove { .. } => "remove",
            Instruction::Restore { .. } => "restore",
            Instruction::Insert { .. } => "insert",
        }
    }
}

/// Identity key tying a restore to the replace or remove that parked the
/// node. Both sides hash the verbatim path expression text.
#[must_use]
pub fn identity_hash(path: &str) -> u64 {
    xxh3_64(path.as_bytes())
}

/// Compile the instruction children of a `patch` element or a `select`
/// body. Unknown and malformed instruction elements are skipped with a
/// warning; everything else compiles in document order.
pub fn compile(doc: &Document, node: NodeId) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    for child in doc.element_children(node) {
        let name = doc.name(child).unwrap_or_default();
        let Some(path) = doc.attribute(child, "path") else {
            log::warn!("skipping '{}' instruction without a path attribute", name);
            continue;
        };
        let path = path.to_string();
        match name {
            "select" => instructions.push(Instruction::Select {
                body: compile(doc, child),
                path,
            }),
            "replace" => instructions.push(Instruction::Replace {
                key: identity_hash(&path),
                content: doc.children(child).to_vec(),
                path,
            }),
            "remove" => instructions.push(Instruction::Remove {
                key: identity_hash(&path),
                path,
            }),
            "restore" => instructions.push(Instruction::Restore {
                key: identity_hash(&path),
                path,
            }),
            "insert" => {
                let order = match doc.attribute(child, "order") {
                    None | Some("last") => InsertOrder::Last,
                    Some("first") => InsertOrder::First,
                    Some(raw) => match raw.parse::<usize>() {
                        Ok(index) => InsertOrder::At(index),
                        Err(_) => {
                            log::warn!(
                                "skipping insert '{}' with unrecognized order '{}'",
                                path,
                                raw
                            );
                            continue;
                        }
                    },
                };
                instructions.push(Instruction::Insert {
                    order,
                    content: doc.children(child).to_vec(),
                    path,
                });
            }
            other => {
                log::warn!("skipping unknown instruction element '{}'", other);
            }
        }
    }
    instructions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_str;

    fn compile_patch(xml: &str) -> (Document, Vec<Instruction>) {
        let doc = parse_str(xml).unwrap();
        let patch = doc.document_element().unwrap();
        let instructions = compile(&doc, patch);
        (doc, instructions)
    }

    #[test]
    fn test_compile_all_kinds() {
        let (_, instructions) = compile_patch(
            r#"<patch file="a.xml">
                 <select path="config">
                   <replace path="option[@name='x']"><option name="x" value="2"/></replace>
                 </select>
                 <remove path="config/legacy"/>
                 <restore path="config/legacy"/>
                 <insert path="config/extra" order="first"><extra/></insert>
               </patch>"#,
        );
        let kinds: Vec<_> = instructions.iter().map(Instruction::kind).collect();
        assert_eq!(kinds, vec!["select", "remove", "restore", "insert"]);
        let Instruction::Select { body, .. } = &instructions[0] else {
            panic!("expected select");
        };
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].kind(), "replace");
    }

    #[test]
    fn test_remove_and_restore_share_identity() {
        let (_, instructions) = compile_patch(
            r#"<patch file="a.xml">
                 <remove path="config/old"/>
                 <restore path="config/old"/>
               </patch>"#,
        );
        let Instruction::Remove { key: k1, .. } = &instructions[0] else {
            panic!("expected remove");
        };
        let Instruction::Restore { key: k2, .. } = &instructions[1] else {
            panic!("expected restore");
        };
        assert_eq!(k1, k2);
        assert_ne!(*k1, identity_hash("config/other"));
    }

    #[test]
    fn test_missing_path_skipped() {
        let (_, instructions) = compile_patch(
            r#"<patch file="a.xml">
                 <remove/>
                 <remove path="kept"/>
               </patch>"#,
        );
        assert_eq!(instructions.len(), 1);
    }

    #[test]
    fn test_unknown_kind_skipped() {
        let (_, instructions) = compile_patch(
            r#"<patch file="a.xml">
                 <frobnicate path="x"/>
                 <remove path="y"/>
               </patch>"#,
        );
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].kind(), "remove");
    }

    #[test]
    fn test_insert_orders() {
        let (_, instructions) = compile_patch(
            r#"<patch file="a.xml">
                 <insert path="a"><x/></insert>
                 <insert path="b" order="first"><x/></insert>
                 <insert path="c" order="2"><x/></insert>
                 <insert path="d" order="sideways"><x/></insert>
               </patch>"#,
        );
        assert_eq!(instructions.len(), 3);
        let orders: Vec<_> = instructions
            .iter()
            .map(|i| match i {
                Instruction::Insert { order, .. } => *order,
                _ => panic!("expected insert"),
            })
            .collect();
        assert_eq!(
            orders,
            vec![InsertOrder::Last, InsertOrder::First, InsertOrder::At(2)]
        );
    }

    #[test]
    fn test_replace_content_captured() {
        let (doc, instructions) = compile_patch(
            r#"<patch file="a.xml">
                 <replace path="t">text<child attr="1"/></replace>
               </patch>"#,
        );
        let Instruction::Replace { content, .. } = &instructions[0] else {
            panic!("expected replace");
        };
        assert_eq!(content.len(), 2);
        assert_eq!(doc.name(content[1]), Some("child"));
    }
}

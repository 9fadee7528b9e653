//! Arena-backed XML node tree.
//!
//! A [`Document`] owns every node it ever allocated; a [`NodeId`] is a
//! stable index into that arena. Detaching a node only unlinks it from its
//! parent, the subtree stays alive in the arena and can be reattached
//! later. That property is what lets the patch applier park removed nodes
//! aside and restore them afterwards without any copying.

/// A single attribute on an element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic document root; never has a parent.
    Document,
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
    CData(String),
    Comment(String),
}

/// Stable handle to a node within one [`Document`].
///
/// Ids are never reused and survive every structural mutation. Using an id
/// with a document other than the one that created it is a logic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An XML document: node arena plus the encoding label from its
/// declaration, carried through so serialization can reproduce it.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    encoding: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the synthetic root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            encoding: None,
        }
    }

    /// The synthetic root node. Always valid.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Encoding label captured from the XML declaration, if any.
    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn set_encoding(&mut self, encoding: impl Into<String>) {
        self.encoding = Some(encoding.into());
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.index()].kind, NodeKind::Element { .. })
    }

    /// Element name, or `None` for non-element nodes.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// All attributes of an element, in document order. Empty for
    /// non-element nodes.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.nodes[id.index()].kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Value of the named attribute, if present.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set or replace an attribute, preserving first-seen order.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.index()].kind {
            match attributes.iter_mut().find(|a| a.name == name) {
                Some(attr) => attr.value = value.into(),
                None => attributes.push(Attribute {
                    name: name.to_string(),
                    value: value.into(),
                }),
            }
        }
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Element children only, in document order.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.is_element(c))
    }

    /// Element children carrying the given name.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.element_children(id)
            .filter(move |&c| self.name(c) == Some(name))
    }

    /// First element child with the given name.
    #[must_use]
    pub fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children_named(id, name).next()
    }

    /// The document element: first element child of the root.
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root()).next()
    }

    /// Concatenated character data.
    ///
    /// For an element this joins the text and CDATA of its direct
    /// children; for a text or CDATA node it is that node's content.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.nodes[id.index()].kind {
            NodeKind::Text(s) | NodeKind::CData(s) => s.clone(),
            NodeKind::Comment(_) => String::new(),
            NodeKind::Document | NodeKind::Element { .. } => {
                let mut out = String::new();
                for &child in self.children(id) {
                    if let NodeKind::Text(s) | NodeKind::CData(s) = self.kind(child) {
                        out.push_str(s);
                    }
                }
                out
            }
        }
    }

    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Element {
            name: name.into(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(content.into()))
    }

    pub fn create_cdata(&mut self, content: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::CData(content.into()))
    }

    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Comment(content.into()))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child);
    }

    /// Insert `child` at `index` among `parent`'s children (clamped to the
    /// current child count), detaching it from any previous parent first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        debug_assert_ne!(parent, child);
        self.detach(child);
        let slot = index.min(self.nodes[parent.index()].children.len());
        self.nodes[parent.index()].children.insert(slot, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Unlink a node from its parent. The subtree stays alive in the arena
    /// and can be reattached later. Detaching an already-detached node (or
    /// the root) is a no-op.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.index()].parent.take() else {
            return;
        };
        let siblings = &mut self.nodes[parent.index()].children;
        if let Some(pos) = siblings.iter().position(|&c| c == id) {
            siblings.remove(pos);
        }
    }

    /// Position of a node among its parent's children.
    #[must_use]
    pub fn position_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes[id.index()].parent?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Deep-copy a subtree from another document into this one.
    ///
    /// The copy is returned detached; attach it with [`append_child`] or
    /// [`insert_child`].
    ///
    /// [`append_child`]: Document::append_child
    /// [`insert_child`]: Document::insert_child
    pub fn import(&mut self, source: &Document, node: NodeId) -> NodeId {
        let copy = self.push_node(source.kind(node).clone());
        for &child in source.children(node) {
            let imported = self.import(source, child);
            self.append_child(copy, imported);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let config = doc.create_element("config");
        doc.append_child(root, config);
        let option = doc.create_element("option");
        doc.set_attribute(option, "name", "speed");
        doc.append_child(config, option);
        let text = doc.create_text("fast");
        doc.append_child(option, text);
        (doc, config, option, text)
    }

    #[test]
    fn test_build_and_navigate() {
        let (doc, config, option, _) = sample();
        assert_eq!(doc.document_element(), Some(config));
        assert_eq!(doc.name(config), Some("config"));
        assert_eq!(doc.children(config), &[option]);
        assert_eq!(doc.parent(option), Some(config));
        assert_eq!(doc.attribute(option, "name"), Some("speed"));
        assert_eq!(doc.attribute(option, "missing"), None);
        assert_eq!(doc.text_content(option), "fast");
    }

    #[test]
    fn test_set_attribute_overwrites() {
        let (mut doc, _, option, _) = sample();
        doc.set_attribute(option, "name", "slow");
        doc.set_attribute(option, "extra", "1");
        assert_eq!(doc.attribute(option, "name"), Some("slow"));
        assert_eq!(doc.attributes(option).len(), 2);
        assert_eq!(doc.attributes(option)[0].name, "name");
    }

    #[test]
    fn test_detach_and_reattach() {
        let (mut doc, config, option, text) = sample();
        assert_eq!(doc.position_in_parent(option), Some(0));
        doc.detach(option);
        assert_eq!(doc.parent(option), None);
        assert!(doc.children(config).is_empty());
        // Subtree intact while detached.
        assert_eq!(doc.children(option), &[text]);
        doc.append_child(config, option);
        assert_eq!(doc.children(config), &[option]);
        assert_eq!(doc.parent(option), Some(config));
    }

    #[test]
    fn test_detach_detached_is_noop() {
        let (mut doc, _, option, _) = sample();
        doc.detach(option);
        doc.detach(option);
        assert_eq!(doc.parent(option), None);
    }

    #[test]
    fn test_insert_child_clamps_index() {
        let (mut doc, config, option, _) = sample();
        let extra = doc.create_element("extra");
        doc.insert_child(config, 99, extra);
        assert_eq!(doc.children(config), &[option, extra]);
        let first = doc.create_element("first");
        doc.insert_child(config, 0, first);
        assert_eq!(doc.children(config), &[first, option, extra]);
    }

    #[test]
    fn test_import_deep_copies() {
        let (src, _, option, _) = sample();
        let mut dst = Document::new();
        let copied = dst.import(&src, option);
        let root = dst.root();
        dst.append_child(root, copied);
        assert_eq!(dst.name(copied), Some("option"));
        assert_eq!(dst.attribute(copied, "name"), Some("speed"));
        assert_eq!(dst.text_content(copied), "fast");
        // Copies are independent of the source arena.
        assert_eq!(src.text_content(option), "fast");
    }

    #[test]
    fn test_children_named() {
        let mut doc = Document::new();
        let root = doc.root();
        let files = doc.create_element("files");
        doc.append_child(root, files);
        for name in ["file", "other", "file"] {
            let child = doc.create_element(name);
            doc.append_child(files, child);
        }
        assert_eq!(doc.children_named(files, "file").count(), 2);
        assert!(doc.child_named(files, "other").is_some());
        assert!(doc.child_named(files, "absent").is_none());
    }
}

//! Page Document Model
//!
//! Arena-backed DOM for a single page context. Nodes are addressed by
//! [`NodeId`]; detached nodes stay in the arena until the page is dropped.

mod range;
mod serialize;

pub use range::{Boundary, Range};

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("offset {offset} is out of bounds or splits a character")]
    IndexSize { offset: usize },

    #[error("node {0:?} is not a child of the given parent")]
    NotFound(NodeId),

    #[error("operation would produce an invalid tree")]
    HierarchyRequest,

    #[error("range end precedes its start")]
    InvalidRange,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Fragment,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Elements whose text never renders
pub fn is_non_rendering(name: &str) -> bool {
    ["head", "style", "script", "title", "meta", "link"]
        .iter()
        .any(|n| name.eq_ignore_ascii_case(n))
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    /// Build `<html><body><p>…</p>…</body></html>` with one paragraph per entry
    pub fn from_paragraphs<'a>(paragraphs: impl IntoIterator<Item = &'a str>) -> Self {
        let mut doc = Self::new();
        let html = doc.create_element("html");
        let body = doc.create_element("body");
        doc.push_child(doc.root(), html);
        doc.push_child(html, body);
        for text in paragraphs {
            let p = doc.create_element("p");
            let t = doc.create_text(text);
            doc.push_child(body, p);
            doc.push_child(p, t);
        }
        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0 as usize)
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            name: name.to_string(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).map(|d| &d.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).and_then(|d| d.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    fn is_container(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            Some(NodeKind::Document | NodeKind::Fragment | NodeKind::Element { .. })
        )
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: String) {
        if let Some(NodeData {
            kind: NodeKind::Text(text),
            ..
        }) = self.data_mut(id)
        {
            *text = value;
        }
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, key: &str, value: &str) {
        if let Some(NodeData {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.data_mut(id)
        {
            match attributes.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
                Some((_, v)) => *v = value.to_string(),
                None => attributes.push((key.to_string(), value.to_string())),
            }
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Concatenated text of a subtree
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(_) => {
                for &c in self.children(id) {
                    self.collect_text(c, out);
                }
            }
            None => {}
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// Index of `id` within its parent's children
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Remove a node from its parent; the subtree stays intact
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.data_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        if let Some(d) = self.data_mut(id) {
            d.parent = None;
        }
    }

    /// Append without validation; used by builders that own both nodes
    fn push_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(d) = self.data_mut(child) {
            d.parent = Some(parent);
        }
        if let Some(p) = self.data_mut(parent) {
            p.children.push(child);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference` (or at the end).
    /// A fragment moves its children instead of itself.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if !self.is_container(parent) || self.data(child).is_none() {
            return Err(DomError::HierarchyRequest);
        }
        if matches!(self.kind(child), Some(NodeKind::Document))
            || self.is_inclusive_ancestor(child, parent)
        {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(DomError::NotFound(r));
            }
        }

        let moving: Vec<NodeId> = if matches!(self.kind(child), Some(NodeKind::Fragment)) {
            self.children(child).to_vec()
        } else {
            vec![child]
        };

        for node in moving {
            self.detach(node);
            let at = match reference {
                Some(r) => self
                    .children(parent)
                    .iter()
                    .position(|&c| c == r)
                    .ok_or(DomError::NotFound(r))?,
                None => self.children(parent).len(),
            };
            if let Some(d) = self.data_mut(node) {
                d.parent = Some(parent);
            }
            if let Some(p) = self.data_mut(parent) {
                p.children.insert(at, node);
            }
        }
        Ok(())
    }

    /// Split a text node at a byte offset. The node keeps `..offset`;
    /// the returned sibling holds `offset..` and directly follows it.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let text = self.text(id).ok_or(DomError::HierarchyRequest)?;
        if offset > text.len() || !text.is_char_boundary(offset) {
            return Err(DomError::IndexSize { offset });
        }
        let tail = text[offset..].to_string();
        let head = text[..offset].to_string();

        let new_node = self.create_text(&tail);
        if let Some(parent) = self.parent(id) {
            let next = self
                .index_in_parent(id)
                .and_then(|i| self.children(parent).get(i + 1).copied());
            self.insert_before(parent, new_node, next)?;
        }
        self.set_text(id, head);
        Ok(new_node)
    }

    /// Text nodes under `root` in document order whose text would render.
    /// Subtrees for which `skip` returns true are not entered.
    pub fn text_nodes_where(&self, root: NodeId, skip: impl Fn(&Self, NodeId) -> bool) -> Vec<NodeId> {
        fn walk(
            doc: &Document,
            node: NodeId,
            skip: &dyn Fn(&Document, NodeId) -> bool,
            out: &mut Vec<NodeId>,
        ) {
            match doc.kind(node) {
                Some(NodeKind::Text(_)) => out.push(node),
                Some(NodeKind::Element { name, .. }) if is_non_rendering(name) => {}
                Some(_) if skip(doc, node) => {}
                Some(_) => {
                    for &c in doc.children(node) {
                        walk(doc, c, skip, out);
                    }
                }
                None => {}
            }
        }

        let mut out = Vec::new();
        walk(self, root, &skip, &mut out);
        out
    }

    /// Elements carrying `class` anywhere under `root`
    pub fn elements_with_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.has_class(node, class) {
                out.push(node);
            }
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Tree path from the root, as child indexes. Detached nodes yield `None`.
    pub(crate) fn path(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut cur = id;
        while cur != self.root() {
            path.push(self.index_in_parent(cur)?);
            cur = self.parent(cur)?;
        }
        path.reverse();
        Some(path)
    }

    pub fn to_html(&self) -> String {
        serialize::to_html(self, self.root())
    }
}

//! Live selection ranges.
//!
//! A boundary point is either inside a text node (byte offset) or between
//! the children of a container (child index). Points are ordered by their
//! tree path with the offset appended, which matches document order.

use std::cmp::Ordering;

use super::{Document, DomError, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    fn validate(&self, doc: &Document) -> Result<(), DomError> {
        let ok = match doc.text(self.node) {
            Some(text) => self.offset <= text.len() && text.is_char_boundary(self.offset),
            None => self.offset <= doc.children(self.node).len(),
        };
        if ok {
            Ok(())
        } else {
            Err(DomError::IndexSize {
                offset: self.offset,
            })
        }
    }

    fn key(&self, doc: &Document) -> Result<Vec<usize>, DomError> {
        let mut key = doc.path(self.node).ok_or(DomError::NotFound(self.node))?;
        key.push(self.offset);
        Ok(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    start: Boundary,
    end: Boundary,
}

impl Range {
    pub fn new(doc: &Document, start: Boundary, end: Boundary) -> Result<Self, DomError> {
        start.validate(doc)?;
        end.validate(doc)?;
        if start.key(doc)? > end.key(doc)? {
            return Err(DomError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    /// Range over `start..end` bytes of a single text node
    pub fn within_text(
        doc: &Document,
        node: NodeId,
        start: usize,
        end: usize,
    ) -> Result<Self, DomError> {
        Self::new(doc, Boundary::new(node, start), Boundary::new(node, end))
    }

    pub fn start(&self) -> Boundary {
        self.start
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Selected text, in document order
    pub fn text(&self, doc: &Document) -> Result<String, DomError> {
        self.start.validate(doc)?;
        self.end.validate(doc)?;
        let start_key = self.start.key(doc)?;
        let end_key = self.end.key(doc)?;
        let mut out = String::new();

        for node in doc.text_nodes_where(doc.root(), |_, _| false) {
            let Some(text) = doc.text(node) else { continue };
            let lo = if node == self.start.node {
                self.start.offset
            } else if Boundary::new(node, 0).key(doc)? >= start_key {
                0
            } else {
                continue;
            };
            let hi = if node == self.end.node {
                self.end.offset
            } else if Boundary::new(node, text.len()).key(doc)? <= end_key {
                text.len()
            } else {
                continue;
            };
            if lo < hi {
                out.push_str(&text[lo..hi]);
            }
        }
        Ok(out)
    }

    /// Remove everything between the boundaries and collapse to the start.
    /// Partially selected text nodes are trimmed; partially selected
    /// elements keep their unselected children.
    pub fn delete_contents(&mut self, doc: &mut Document) -> Result<(), DomError> {
        self.start.validate(doc)?;
        self.end.validate(doc)?;
        if self.is_collapsed() {
            return Ok(());
        }

        let (start, end) = (self.start, self.end);
        if start.node == end.node {
            if let Some(text) = doc.text(start.node) {
                let mut kept = text[..start.offset].to_string();
                kept.push_str(&text[end.offset..]);
                doc.set_text(start.node, kept);
                self.end = start;
                return Ok(());
            }
        }

        let start_key = start.key(doc)?;
        let end_key = end.key(doc)?;
        let mut doomed = Vec::new();
        collect_contained(doc, doc.root(), &mut Vec::new(), &start_key, &end_key, &mut doomed);

        if let Some(text) = doc.text(start.node) {
            let kept = text[..start.offset].to_string();
            doc.set_text(start.node, kept);
        }
        if let Some(text) = doc.text(end.node) {
            let kept = text[end.offset..].to_string();
            doc.set_text(end.node, kept);
        }
        for node in doomed {
            doc.detach(node);
        }

        self.end = start;
        Ok(())
    }

    /// Insert `node` at the start of the range, splitting a text node if needed
    pub fn insert_node(&self, doc: &mut Document, node: NodeId) -> Result<(), DomError> {
        self.start.validate(doc)?;
        let start = self.start;

        if doc.is_text(start.node) {
            let parent = doc.parent(start.node).ok_or(DomError::HierarchyRequest)?;
            let tail = doc.split_text(start.node, start.offset)?;
            doc.insert_before(parent, node, Some(tail))
        } else {
            let reference = doc.children(start.node).get(start.offset).copied();
            doc.insert_before(start.node, node, reference)
        }
    }
}

/// Push the topmost nodes lying entirely between the two keys
fn collect_contained(
    doc: &Document,
    node: NodeId,
    path: &mut Vec<usize>,
    start_key: &[usize],
    end_key: &[usize],
    out: &mut Vec<NodeId>,
) {
    for (i, &child) in doc.children(node).iter().enumerate() {
        path.push(i);
        let before = path.as_slice();
        let mut after = path.clone();
        if let Some(last) = after.last_mut() {
            *last += 1;
        }

        let starts_inside = before.cmp(start_key) != Ordering::Less;
        let ends_inside = after.as_slice().cmp(end_key) != Ordering::Greater;
        if starts_inside && ends_inside {
            out.push(child);
        } else if after.as_slice() > start_key && before < end_key {
            collect_contained(doc, child, path, start_key, end_key, out);
        }
        path.pop();
    }
}

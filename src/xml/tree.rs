// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Arena-backed XML element tree.
//!
//! A [`Document`] owns every element it ever created. Elements are addressed
//! by [`NodeId`] and linked through parent/children indices; detaching an
//! element only unlinks it, so ids stay valid for the life of the document.
//! Only elements, attributes and element text are modelled, which is all the
//! SOAP messages exchanged here carry.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::fmt::Write as _;

use super::{ns, QName};

/// Index of an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Element {
    name: QName,
    attributes: Vec<(QName, String)>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An XML document held as an arena of elements.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Element>,
    root: Option<NodeId>,
    /// Child elements already resolved for a (parent, field index) pair.
    bound: Mutex<HashMap<(NodeId, u16), NodeId>>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from text.
    pub fn parse(text: &str) -> Result<Self, roxmltree::Error> {
        let source = roxmltree::Document::parse(text)?;
        let mut doc = Self::new();
        let root = doc.import(source.root_element(), None);
        doc.root = Some(root);
        Ok(doc)
    }

    fn import(&mut self, node: roxmltree::Node<'_, '_>, parent: Option<NodeId>) -> NodeId {
        let name = QName::new(node.tag_name().namespace(), node.tag_name().name());
        let id = self.create_element(name);

        for attr in node.attributes() {
            self.set_attribute(id, QName::new(attr.namespace(), attr.name()), attr.value());
        }

        let mut text = String::new();
        let mut has_elements = false;
        for child in node.children() {
            if child.is_element() {
                has_elements = true;
                self.import(child, Some(id));
            } else if child.is_text() {
                text.push_str(child.text().unwrap_or_default());
            }
        }

        let keep_text = if has_elements {
            !text.trim().is_empty()
        } else {
            !text.is_empty()
        };
        if keep_text {
            self.nodes[id.0].text = Some(text);
        }

        if let Some(parent) = parent {
            self.append_child(parent, id);
        }
        id
    }

    /// Root element, if one has been set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Make `id` the document root.
    pub fn set_root(&mut self, id: NodeId) {
        self.detach(id);
        self.root = Some(id);
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: QName) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Element {
            name,
            attributes: Vec::new(),
            text: None,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create an element and append it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, name: QName) -> NodeId {
        let id = self.create_element(name);
        self.append_child(parent, id);
        id
    }

    /// Whether `id` refers to an element of this document.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Element name.
    pub fn name(&self, id: NodeId) -> &QName {
        &self.nodes[id.0].name
    }

    /// Element text content.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].text.as_deref()
    }

    /// Replace the element text content.
    pub fn set_text(&mut self, id: NodeId, text: Option<String>) {
        self.nodes[id.0].text = text;
    }

    /// Attribute value.
    pub fn attribute(&self, id: NodeId, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.nodes[id.0]
            .attributes
            .iter()
            .find(|(name, _)| name.is(namespace, local))
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attribute(&mut self, id: NodeId, name: QName, value: impl Into<String>) {
        let value = value.into();
        let attributes = &mut self.nodes[id.0].attributes;
        match attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => attributes.push((name, value)),
        }
    }

    /// Remove an attribute if present.
    pub fn remove_attribute(&mut self, id: NodeId, namespace: Option<&str>, local: &str) {
        self.nodes[id.0]
            .attributes
            .retain(|(name, _)| !name.is(namespace, local));
    }

    /// Parent element.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Child elements in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// First child with the given name.
    pub fn find_child(&self, id: NodeId, namespace: Option<&str>, local: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.name(*c).is(namespace, local))
    }

    /// All children with the given name.
    pub fn find_children(&self, id: NodeId, namespace: Option<&str>, local: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.name(*c).is(namespace, local))
            .collect()
    }

    /// Position of `id` among its parent's children.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    /// Insert `child` at `index` among the children of `parent`.
    ///
    /// The child is first detached from wherever it currently lives.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Unlink `id` from its parent. The element itself stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        if self.root == Some(id) {
            self.root = None;
        }
        self.bound().retain(|_, bound| *bound != id);
    }

    fn bound(&self) -> MutexGuard<'_, HashMap<(NodeId, u16), NodeId>> {
        self.bound.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn cached(&self, parent: NodeId, field: u16) -> Option<NodeId> {
        let cached = self.bound().get(&(parent, field)).copied()?;
        // Entries are dropped on detach, but re-check in case the child moved.
        (self.parent(cached) == Some(parent)).then_some(cached)
    }

    pub(crate) fn cache(&self, parent: NodeId, field: u16, child: NodeId) {
        self.bound().insert((parent, field), child);
    }

    pub(crate) fn uncache(&self, parent: NodeId, field: u16) {
        self.bound().remove(&(parent, field));
    }

    /// Serialize the root element.
    pub fn to_xml(&self) -> String {
        match self.root {
            Some(root) => self.element_to_xml(root),
            None => String::new(),
        }
    }

    /// Serialize the subtree rooted at `id`.
    ///
    /// All namespaces used in the subtree are declared on its top element.
    pub fn element_to_xml(&self, id: NodeId) -> String {
        let mut namespaces: Vec<String> = Vec::new();
        self.collect_namespaces(id, &mut namespaces);

        let mut prefixes: Vec<(String, String)> = Vec::new();
        let mut generated = 0;
        for uri in namespaces {
            let prefix = match ns::PREFIXES.iter().find(|(known, _)| *known == uri) {
                Some((_, prefix)) => prefix.to_string(),
                None => {
                    let prefix = format!("ns{}", generated);
                    generated += 1;
                    prefix
                }
            };
            prefixes.push((uri, prefix));
        }

        let mut out = String::new();
        self.write_element(id, &prefixes, true, &mut out);
        out
    }

    fn collect_namespaces(&self, id: NodeId, out: &mut Vec<String>) {
        let node = &self.nodes[id.0];
        let names = std::iter::once(&node.name).chain(node.attributes.iter().map(|(n, _)| n));
        for name in names {
            if let Some(uri) = name.namespace() {
                if !out.iter().any(|u| u == uri) {
                    out.push(uri.to_string());
                }
            }
        }
        for child in &node.children {
            self.collect_namespaces(*child, out);
        }
    }

    fn write_element(&self, id: NodeId, prefixes: &[(String, String)], top: bool, out: &mut String) {
        let node = &self.nodes[id.0];
        let tag = qualified(&node.name, prefixes);

        out.push('<');
        out.push_str(&tag);
        if top {
            for (uri, prefix) in prefixes {
                let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape(uri, true));
            }
        }
        for (name, value) in &node.attributes {
            let _ = write!(out, " {}=\"{}\"", qualified(name, prefixes), escape(value, true));
        }

        if node.children.is_empty() && node.text.is_none() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        if let Some(text) = &node.text {
            out.push_str(&escape(text, false));
        }
        for child in &node.children {
            self.write_element(*child, prefixes, false, out);
        }
        let _ = write!(out, "</{}>", tag);
    }
}

fn qualified(name: &QName, prefixes: &[(String, String)]) -> String {
    let prefix = name
        .namespace()
        .and_then(|uri| prefixes.iter().find(|(u, _)| u == uri))
        .map(|(_, p)| p.as_str());
    match prefix {
        Some(p) => format!("{}:{}", p, name.local_name()),
        None => name.local_name().to_string(),
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

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

//! Declarative element bindings.
//!
//! A structured type implements [`XmlNode`]: it is a copyable handle to one
//! element of a [`Document`] and lists its [`Field`]s in schema order. The
//! free functions in this module read and write those fields:
//!
//! - scalar children through a [`Converter`] ([`get_value`], [`set_value`]),
//! - attributes ([`get_attribute`], [`set_attribute`]),
//! - nested structured children ([`get_element`], [`set_element`]),
//! - repeated children ([`ElementList`], [`ValueList`]).
//!
//! New children are inserted directly after the closest preceding field
//! that is currently present, so documents keep their schema sequence no
//! matter in which order fields are assigned.
//!
//! A field named `"."` refers to the bound element itself, which is how a
//! collection element whose children are the list items is described.

use std::marker::PhantomData;

use super::{nil_attribute, ns, Converter, Document, NodeId, QName, Value};
use crate::error::BindingError;

/// Field name referring to the bound element itself.
pub const SELF: &str = ".";

/// How a field maps onto the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Attribute on the bound element.
    Attribute(Converter),
    /// Text content of a child element.
    Value(Converter),
    /// Nested structured child element.
    Element,
    /// Container element holding repeated structured children.
    ElementList {
        /// Local name of each item.
        child: &'static str,
        /// Namespace of each item.
        child_namespace: Option<&'static str>,
    },
    /// Container element holding repeated scalar children.
    ValueList {
        /// Local name of each item.
        child: &'static str,
        /// Namespace of each item.
        child_namespace: Option<&'static str>,
        /// Converter applied to each item.
        converter: Converter,
    },
    /// Arbitrary child element (a SOAP body payload).
    Any,
}

/// A field descriptor.
///
/// `index` is the declaration position within the owning type and defines
/// the canonical child order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Declaration index.
    pub index: u16,
    /// Local name, or [`SELF`].
    pub name: &'static str,
    /// Namespace URI.
    pub namespace: Option<&'static str>,
    /// Whether the field may be deleted.
    pub required: bool,
    /// Whether `xsi:nil` is honoured.
    pub nillable: bool,
    /// Mapping kind.
    pub kind: FieldKind,
}

impl Field {
    const fn new(
        index: u16,
        namespace: Option<&'static str>,
        name: &'static str,
        kind: FieldKind,
    ) -> Self {
        Self {
            index,
            name,
            namespace,
            required: true,
            nillable: false,
            kind,
        }
    }

    /// Scalar child element.
    pub const fn value(
        index: u16,
        namespace: Option<&'static str>,
        name: &'static str,
        converter: Converter,
    ) -> Self {
        Self::new(index, namespace, name, FieldKind::Value(converter))
    }

    /// Attribute of the bound element.
    pub const fn attribute(
        index: u16,
        namespace: Option<&'static str>,
        name: &'static str,
        converter: Converter,
    ) -> Self {
        Self::new(index, namespace, name, FieldKind::Attribute(converter))
    }

    /// Nested structured element.
    pub const fn element(index: u16, namespace: Option<&'static str>, name: &'static str) -> Self {
        Self::new(index, namespace, name, FieldKind::Element)
    }

    /// Repeated structured children inside a container element.
    pub const fn element_list(
        index: u16,
        namespace: Option<&'static str>,
        name: &'static str,
        child_namespace: Option<&'static str>,
        child: &'static str,
    ) -> Self {
        Self::new(
            index,
            namespace,
            name,
            FieldKind::ElementList {
                child,
                child_namespace,
            },
        )
    }

    /// Repeated scalar children inside a container element.
    pub const fn value_list(
        index: u16,
        namespace: Option<&'static str>,
        name: &'static str,
        child_namespace: Option<&'static str>,
        child: &'static str,
        converter: Converter,
    ) -> Self {
        Self::new(
            index,
            namespace,
            name,
            FieldKind::ValueList {
                child,
                child_namespace,
                converter,
            },
        )
    }

    /// Arbitrary payload element.
    pub const fn any(index: u16, name: &'static str) -> Self {
        Self::new(index, None, name, FieldKind::Any)
    }

    /// Honour and emit `xsi:nil`.
    pub const fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    /// Allow the field to be deleted.
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Qualified name of the backing node.
    pub fn qname(&self) -> QName {
        QName::new(self.namespace, self.name)
    }

    fn is_self(&self) -> bool {
        self.name == SELF
    }

    fn is_child(&self) -> bool {
        !self.is_self() && !matches!(self.kind, FieldKind::Attribute(_))
    }
}

/// A structured type bound to one element.
pub trait XmlNode: Copy + Sized {
    /// Fields in declaration order.
    const FIELDS: &'static [Field];

    /// Build the minimum element skeleton for this type.
    fn create(doc: &mut Document) -> NodeId;

    /// Wrap an element id without checks.
    fn from_node(id: NodeId) -> Self;

    /// Underlying element id.
    fn node(&self) -> NodeId;

    /// Wrap an existing element of `doc`.
    fn bind(doc: &Document, id: NodeId) -> Result<Self, BindingError> {
        if doc.contains(id) {
            Ok(Self::from_node(id))
        } else {
            Err(BindingError::NotAnElement(id.index()))
        }
    }

    /// Create a fresh skeleton and bind it.
    fn new(doc: &mut Document) -> Self {
        Self::from_node(Self::create(doc))
    }
}

fn is_nil(doc: &Document, id: NodeId) -> bool {
    doc.attribute(id, Some(ns::XSI), "nil") == Some("true")
}

fn set_nil(doc: &mut Document, id: NodeId, nil: bool) {
    if nil {
        doc.set_attribute(id, nil_attribute(), "true");
    } else {
        doc.remove_attribute(id, Some(ns::XSI), "nil");
    }
}

/// Locate the node backing `field` under `parent`.
fn find(doc: &Document, parent: NodeId, field: &Field) -> Option<NodeId> {
    if field.is_self() {
        return Some(parent);
    }
    if let Some(cached) = doc.cached(parent, field.index) {
        return Some(cached);
    }
    let found = match field.kind {
        FieldKind::Any => doc.children(parent).first().copied(),
        _ => doc.find_child(parent, field.namespace, field.name),
    }?;
    doc.cache(parent, field.index, found);
    Some(found)
}

/// Child position at which a new element for `field` belongs.
fn insertion_index<P: XmlNode>(doc: &Document, parent: NodeId, field: &Field) -> usize {
    P::FIELDS
        .iter()
        .filter(|f| f.index < field.index && f.is_child())
        .rev()
        .find_map(|f| find(doc, parent, f).and_then(|c| doc.position(c)))
        .map_or(0, |position| position + 1)
}

fn insert_field<P: XmlNode>(doc: &mut Document, parent: NodeId, field: &Field, child: NodeId) {
    let index = insertion_index::<P>(doc, parent, field);
    doc.insert_child(parent, index, child);
    doc.cache(parent, field.index, child);
}

fn converter(field: &Field) -> Result<Converter, BindingError> {
    match field.kind {
        FieldKind::Value(c) | FieldKind::Attribute(c) => Ok(c),
        _ => Err(BindingError::Type {
            expected: "scalar field",
            actual: "structured field",
        }),
    }
}

fn typed<V>(value: Option<Value>) -> Result<Option<V>, BindingError>
where
    V: TryFrom<Value, Error = BindingError>,
{
    value.map(V::try_from).transpose()
}

/// Read a scalar child element.
///
/// Absent and nil elements both read as `None`.
pub fn get_value<P, V>(doc: &Document, node: &P, field: &Field) -> Result<Option<V>, BindingError>
where
    P: XmlNode,
    V: TryFrom<Value, Error = BindingError>,
{
    let converter = converter(field)?;
    let Some(element) = find(doc, node.node(), field) else {
        return Ok(None);
    };
    if field.nillable && is_nil(doc, element) {
        return Ok(None);
    }
    typed(converter.from_string(doc.text(element))?)
}

/// Write a scalar child element, creating it when absent.
pub fn set_value<P, V>(
    doc: &mut Document,
    node: &P,
    field: &Field,
    value: Option<V>,
) -> Result<(), BindingError>
where
    P: XmlNode,
    V: Into<Value>,
{
    let converter = converter(field)?;
    let value = value.map(Into::into);
    if value.is_none() && !field.nillable {
        return Err(BindingError::NotNillable(field.qname().to_clark()));
    }
    let text = converter.to_string(value.as_ref())?;

    let parent = node.node();
    let element = match find(doc, parent, field) {
        Some(element) => element,
        None => {
            let element = doc.create_element(field.qname());
            insert_field::<P>(doc, parent, field, element);
            element
        }
    };
    if field.nillable {
        set_nil(doc, element, value.is_none());
    }
    doc.set_text(element, text);
    Ok(())
}

/// Read an attribute of the bound element.
pub fn get_attribute<P, V>(doc: &Document, node: &P, field: &Field) -> Result<Option<V>, BindingError>
where
    P: XmlNode,
    V: TryFrom<Value, Error = BindingError>,
{
    let converter = converter(field)?;
    let text = doc.attribute(node.node(), field.namespace, field.name);
    typed(converter.from_string(text)?)
}

/// Write an attribute of the bound element. `None` removes it.
pub fn set_attribute<P, V>(
    doc: &mut Document,
    node: &P,
    field: &Field,
    value: Option<V>,
) -> Result<(), BindingError>
where
    P: XmlNode,
    V: Into<Value>,
{
    let converter = converter(field)?;
    let value = value.map(Into::into);
    match converter.to_string(value.as_ref())? {
        Some(text) => doc.set_attribute(node.node(), field.qname(), text),
        None => doc.remove_attribute(node.node(), field.namespace, field.name),
    }
    Ok(())
}

/// Read a nested structured child.
pub fn get_element<P, C>(doc: &Document, node: &P, field: &Field) -> Option<C>
where
    P: XmlNode,
    C: XmlNode,
{
    let element = find(doc, node.node(), field)?;
    if field.nillable && is_nil(doc, element) {
        return None;
    }
    Some(C::from_node(element))
}

/// Replace a nested structured child.
///
/// Any current child is removed. `None` installs a fresh skeleton of `C`.
pub fn set_element<P, C>(doc: &mut Document, node: &P, field: &Field, value: Option<C>) -> C
where
    P: XmlNode,
    C: XmlNode,
{
    let child = match value {
        Some(child) => child.node(),
        None => C::create(doc),
    };
    set_node(doc, node, field, child);
    C::from_node(child)
}

/// Raw element backing a child field.
pub fn get_node<P: XmlNode>(doc: &Document, node: &P, field: &Field) -> Option<NodeId> {
    find(doc, node.node(), field)
}

/// Install `child` as the element backing a field, removing the current one.
pub fn set_node<P: XmlNode>(doc: &mut Document, node: &P, field: &Field, child: NodeId) {
    let parent = node.node();
    if let Some(old) = find(doc, parent, field) {
        doc.detach(old);
    }
    doc.uncache(parent, field.index);
    insert_field::<P>(doc, parent, field, child);
}

/// Remove a field's node. Required fields cannot be deleted.
pub fn delete<P: XmlNode>(doc: &mut Document, node: &P, field: &Field) -> Result<(), BindingError> {
    if field.required {
        return Err(BindingError::Required(field.qname().to_clark()));
    }
    let parent = node.node();
    match field.kind {
        FieldKind::Attribute(_) => doc.remove_attribute(parent, field.namespace, field.name),
        _ if field.is_self() => {}
        _ => {
            if let Some(child) = find(doc, parent, field) {
                doc.detach(child);
            }
            doc.uncache(parent, field.index);
        }
    }
    Ok(())
}

fn list_item(field: &Field) -> Result<QName, BindingError> {
    match field.kind {
        FieldKind::ElementList {
            child,
            child_namespace,
        }
        | FieldKind::ValueList {
            child,
            child_namespace,
            ..
        } => Ok(QName::new(child_namespace, child)),
        _ => Err(BindingError::Type {
            expected: "list field",
            actual: "single field",
        }),
    }
}

fn list_container(doc: &Document, parent: NodeId, field: &Field) -> Option<NodeId> {
    let container = find(doc, parent, field)?;
    if field.nillable && is_nil(doc, container) {
        return None;
    }
    Some(container)
}

fn ensure_container<P: XmlNode>(doc: &mut Document, parent: NodeId, field: &Field) -> NodeId {
    if let Some(container) = find(doc, parent, field) {
        return container;
    }
    let container = doc.create_element(field.qname());
    if field.nillable {
        set_nil(doc, container, true);
    }
    insert_field::<P>(doc, parent, field, container);
    container
}

/// Read a structured list field. Absent and nil containers read as `None`.
pub fn get_element_list<P, C>(
    doc: &Document,
    node: &P,
    field: &Field,
) -> Result<Option<ElementList<C>>, BindingError>
where
    P: XmlNode,
    C: XmlNode,
{
    let item = list_item(field)?;
    Ok(list_container(doc, node.node(), field).map(|container| ElementList {
        items: Items::new(container, item, field.nillable),
        _marker: PhantomData,
    }))
}

/// Structured list field, creating an empty container when absent.
pub fn ensure_element_list<P, C>(
    doc: &mut Document,
    node: &P,
    field: &Field,
) -> Result<ElementList<C>, BindingError>
where
    P: XmlNode,
    C: XmlNode,
{
    let item = list_item(field)?;
    let container = ensure_container::<P>(doc, node.node(), field);
    Ok(ElementList {
        items: Items::new(container, item, field.nillable),
        _marker: PhantomData,
    })
}

/// Read a scalar list field. Absent and nil containers read as `None`.
pub fn get_value_list<P: XmlNode>(
    doc: &Document,
    node: &P,
    field: &Field,
) -> Result<Option<ValueList>, BindingError> {
    let item = list_item(field)?;
    let converter = value_list_converter(field)?;
    Ok(list_container(doc, node.node(), field).map(|container| ValueList {
        items: Items::new(container, item, field.nillable),
        converter,
    }))
}

/// Scalar list field, creating an empty container when absent.
pub fn ensure_value_list<P: XmlNode>(
    doc: &mut Document,
    node: &P,
    field: &Field,
) -> Result<ValueList, BindingError> {
    let item = list_item(field)?;
    let converter = value_list_converter(field)?;
    let container = ensure_container::<P>(doc, node.node(), field);
    Ok(ValueList {
        items: Items::new(container, item, field.nillable),
        converter,
    })
}

fn value_list_converter(field: &Field) -> Result<Converter, BindingError> {
    match field.kind {
        FieldKind::ValueList { converter, .. } => Ok(converter),
        _ => Err(BindingError::Type {
            expected: "value list",
            actual: "element list",
        }),
    }
}

/// Set a list field to nil, dropping its items.
pub fn nil_list<P: XmlNode>(doc: &mut Document, node: &P, field: &Field) -> Result<(), BindingError> {
    list_item(field)?;
    if !field.nillable {
        return Err(BindingError::NotNillable(field.qname().to_clark()));
    }
    let container = ensure_container::<P>(doc, node.node(), field);
    for child in doc.children(container).to_vec() {
        doc.detach(child);
    }
    set_nil(doc, container, true);
    doc.set_text(container, None);
    Ok(())
}

/// Sibling items sharing one tag under a container.
#[derive(Debug, Clone)]
struct Items {
    container: NodeId,
    item: QName,
    nillable: bool,
}

impl Items {
    fn new(container: NodeId, item: QName, nillable: bool) -> Self {
        Self {
            container,
            item,
            nillable,
        }
    }

    fn ids(&self, doc: &Document) -> Vec<NodeId> {
        doc.find_children(self.container, self.item.namespace(), self.item.local_name())
    }

    fn check(&self, doc: &Document, index: usize) -> Result<NodeId, BindingError> {
        let ids = self.ids(doc);
        ids.get(index)
            .copied()
            .ok_or(BindingError::IndexOutOfRange {
                index,
                len: ids.len(),
            })
    }

    fn insert(&self, doc: &mut Document, index: usize, child: NodeId) -> Result<(), BindingError> {
        let ids = self.ids(doc);
        if index > ids.len() {
            return Err(BindingError::IndexOutOfRange {
                index,
                len: ids.len(),
            });
        }
        let position = match ids.get(index) {
            Some(next) => doc.position(*next).unwrap_or(0),
            None => match ids.last() {
                Some(last) => doc.position(*last).map_or(0, |p| p + 1),
                None => doc.children(self.container).len(),
            },
        };
        doc.insert_child(self.container, position, child);
        if self.nillable {
            set_nil(doc, self.container, false);
        }
        Ok(())
    }

    fn remove(&self, doc: &mut Document, index: usize) -> Result<NodeId, BindingError> {
        let child = self.check(doc, index)?;
        doc.detach(child);
        if self.nillable && self.ids(doc).is_empty() {
            set_nil(doc, self.container, true);
            doc.set_text(self.container, None);
        }
        Ok(child)
    }

    fn replace(&self, doc: &mut Document, index: usize, child: NodeId) -> Result<(), BindingError> {
        let old = self.check(doc, index)?;
        let position = doc.position(old).unwrap_or(0);
        doc.detach(old);
        doc.insert_child(self.container, position, child);
        Ok(())
    }
}

/// Repeated structured children backed 1:1 by sibling elements.
#[derive(Debug, Clone)]
pub struct ElementList<C> {
    items: Items,
    _marker: PhantomData<C>,
}

impl<C: XmlNode> ElementList<C> {
    /// Container element.
    pub fn container(&self) -> NodeId {
        self.items.container
    }

    /// Number of items.
    pub fn len(&self, doc: &Document) -> usize {
        self.items.ids(doc).len()
    }

    /// Whether the list has no items.
    pub fn is_empty(&self, doc: &Document) -> bool {
        self.len(doc) == 0
    }

    /// Item at `index`.
    pub fn get(&self, doc: &Document, index: usize) -> Option<C> {
        self.items.ids(doc).get(index).copied().map(C::from_node)
    }

    /// All items in document order.
    pub fn items(&self, doc: &Document) -> Vec<C> {
        self.items.ids(doc).into_iter().map(C::from_node).collect()
    }

    /// Insert an item before position `index`.
    pub fn insert(&self, doc: &mut Document, index: usize, value: C) -> Result<(), BindingError> {
        self.items.insert(doc, index, value.node())
    }

    /// Append an item.
    pub fn push(&self, doc: &mut Document, value: C) -> Result<(), BindingError> {
        let len = self.len(doc);
        self.insert(doc, len, value)
    }

    /// Replace the item at `index`.
    pub fn set(&self, doc: &mut Document, index: usize, value: C) -> Result<(), BindingError> {
        self.items.replace(doc, index, value.node())
    }

    /// Remove and return the item at `index`.
    pub fn remove(&self, doc: &mut Document, index: usize) -> Result<C, BindingError> {
        self.items.remove(doc, index).map(C::from_node)
    }
}

/// Repeated scalar children backed 1:1 by sibling elements.
#[derive(Debug, Clone)]
pub struct ValueList {
    items: Items,
    converter: Converter,
}

impl ValueList {
    /// Number of items.
    pub fn len(&self, doc: &Document) -> usize {
        self.items.ids(doc).len()
    }

    /// Whether the list has no items.
    pub fn is_empty(&self, doc: &Document) -> bool {
        self.len(doc) == 0
    }

    /// Decoded item at `index`.
    pub fn get<V>(&self, doc: &Document, index: usize) -> Result<Option<V>, BindingError>
    where
        V: TryFrom<Value, Error = BindingError>,
    {
        let id = self.items.check(doc, index)?;
        typed(self.converter.from_string(doc.text(id))?)
    }

    /// All decoded items in document order. Empty items are skipped.
    pub fn items<V>(&self, doc: &Document) -> Result<Vec<V>, BindingError>
    where
        V: TryFrom<Value, Error = BindingError>,
    {
        let mut out = Vec::new();
        for id in self.items.ids(doc) {
            if let Some(value) = typed(self.converter.from_string(doc.text(id))?)? {
                out.push(value);
            }
        }
        Ok(out)
    }

    /// Insert a value before position `index`.
    pub fn insert<V: Into<Value>>(
        &self,
        doc: &mut Document,
        index: usize,
        value: V,
    ) -> Result<(), BindingError> {
        let text = self.converter.to_string(Some(&value.into()))?;
        let child = doc.create_element(self.items.item.clone());
        doc.set_text(child, text);
        self.items.insert(doc, index, child)
    }

    /// Append a value.
    pub fn push<V: Into<Value>>(&self, doc: &mut Document, value: V) -> Result<(), BindingError> {
        let len = self.len(doc);
        self.insert(doc, len, value)
    }

    /// Overwrite the value at `index`.
    pub fn set<V: Into<Value>>(
        &self,
        doc: &mut Document,
        index: usize,
        value: V,
    ) -> Result<(), BindingError> {
        let id = self.items.check(doc, index)?;
        let text = self.converter.to_string(Some(&value.into()))?;
        doc.set_text(id, text);
        Ok(())
    }

    /// Remove the value at `index`.
    pub fn remove(&self, doc: &mut Document, index: usize) -> Result<(), BindingError> {
        self.items.remove(doc, index).map(|_| ())
    }
}

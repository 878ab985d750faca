use crate::attribute::AttributeModel;
use crate::branch::Branch;
use crate::content::{Content, ContentModel};
use crate::document::XmlDocument;
use crate::error;
use crate::factory::DocumentFactory;
use crate::name::{Namespace, QName};
use crate::node::{
    Owner, XmlAttribute, XmlCData, XmlComment, XmlEntity, XmlProcessingInstruction, XmlText,
};
use crate::{collapse_whitespace, node, Node, NodeType, XmlItem, XmlNode};
use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

// -----------------------------------------------------------------------------------------------

/// Element node.
///
/// Children and attributes are owned through strong references; the parent
/// link is weak. Elements are always handled as `XmlNode<XmlElement>` and
/// know their own handle, so they can link the nodes added to them.
pub struct XmlElement {
    qname: QName,
    content: ContentModel,
    attributes: AttributeModel,
    owner: Owner,
    factory: DocumentFactory,
    user_data: Option<Rc<dyn Any>>,
    this: Weak<RefCell<XmlElement>>,
}

impl fmt::Debug for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("XmlElement")
            .field("qname", &self.qname)
            .field("attributes", &self.attributes)
            .field("content", &self.content)
            .field("owner", &self.owner)
            .finish()
    }
}

impl PartialEq for XmlElement {
    fn eq(&self, other: &Self) -> bool {
        self.qname == other.qname
            && self.qname.qualified_name() == other.qname.qualified_name()
            && self.attributes == other.attributes
            && self.content == other.content
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "<{}", self.qname.qualified_name())?;

        for namespace in self.undeclared_namespaces() {
            write!(f, " {}", namespace)?;
        }

        for namespace in self.content.namespaces() {
            write!(f, " {}", namespace)?;
        }

        for attr in self.attributes.as_slice() {
            write!(f, " {}", attr.borrow())?;
        }

        if self.content.entries().iter().all(|v| v.as_namespace().is_some()) {
            write!(f, "/>")
        } else {
            write!(f, ">{}</{}>", self.content, self.qname.qualified_name())
        }
    }
}

impl Node for XmlElement {
    fn node_type(&self) -> NodeType {
        NodeType::Element
    }

    fn name(&self) -> Option<&str> {
        Some(self.qname.qualified_name())
    }

    fn text(&self) -> Cow<'_, str> {
        self.content.text()
    }

    fn string_value(&self) -> Cow<'_, str> {
        Cow::Owned(self.content.string_value())
    }

    fn supports_parent(&self) -> bool {
        true
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>> {
        self.owner.parent()
    }

    fn document(&self) -> Option<XmlNode<XmlDocument>> {
        self.owner.document()
    }
}

impl XmlElement {
    pub fn new(qname: QName, factory: DocumentFactory) -> XmlNode<XmlElement> {
        Rc::new_cyclic(|this| {
            RefCell::new(XmlElement {
                qname,
                content: ContentModel::new(),
                attributes: AttributeModel::new(),
                owner: Owner::Detached,
                factory,
                user_data: None,
                this: this.clone(),
            })
        })
    }

    pub fn factory(&self) -> &DocumentFactory {
        &self.factory
    }

    // -------------------------------------------------------------------------------------------

    pub fn qname(&self) -> &QName {
        &self.qname
    }

    pub fn qualified_name(&self) -> &str {
        self.qname.qualified_name()
    }

    pub fn local_name(&self) -> &str {
        self.qname.local_name()
    }

    pub fn namespace(&self) -> &Namespace {
        self.qname.namespace()
    }

    pub fn namespace_prefix(&self) -> &str {
        self.qname.namespace_prefix()
    }

    pub fn namespace_uri(&self) -> &str {
        self.qname.namespace_uri()
    }

    pub fn set_qname(&mut self, qname: QName) {
        self.qname = qname;
    }

    /// Renames the element. A prefix must be in scope; an unprefixed name
    /// keeps the current namespace.
    pub fn set_name(&mut self, name: &str) -> error::Result<()> {
        let parsed =
            xml_nom::parse_qname(name).ok_or_else(|| error::Error::InvalidName(name.to_string()))?;

        let namespace = if parsed.is_prefixed() {
            self.namespace_for_prefix(parsed.prefix())
                .ok_or_else(|| error::Error::UndeclaredPrefix(parsed.prefix().to_string()))?
        } else {
            self.qname.namespace().clone()
        };

        self.qname = self.factory.create_qname(parsed.local_part(), &namespace);
        Ok(())
    }

    pub fn user_data(&self) -> Option<Rc<dyn Any>> {
        self.user_data.clone()
    }

    pub fn set_user_data(&mut self, data: Option<Rc<dyn Any>>) {
        self.user_data = data;
    }

    /// Value of the `ID` or `id` attribute.
    pub fn id(&self) -> Option<String> {
        self.attribute_value("ID")
            .or_else(|| self.attribute_value("id"))
    }

    // -------------------------------------------------------------------------------------------

    pub fn is_root_element(&self) -> bool {
        matches!(self.owner, Owner::Document(_)) && self.owner.is_linked()
    }

    /// `/`-separated location from the top of the tree.
    pub fn path(&self) -> String {
        match self.owner.parent() {
            Some(parent) => format!("{}/{}", parent.borrow().path(), self.name_step()),
            None => format!("/{}", self.name_step()),
        }
    }

    /// Like [`XmlElement::path`], with a 1-based position added to each step
    /// that has siblings of the same name.
    pub fn unique_path(&self) -> String {
        let step = self.name_step();

        match self.owner.parent() {
            Some(parent) => {
                let parent = parent.borrow();
                let siblings = parent.content.elements_qname(&self.qname);
                let step = if siblings.len() > 1 {
                    let position = siblings
                        .iter()
                        .position(|v| Rc::as_ptr(v) == self.this.as_ptr())
                        .unwrap_or_default();
                    format!("{}[{}]", step, position + 1)
                } else {
                    step
                };
                format!("{}/{}", parent.unique_path(), step)
            }
            None => format!("/{}", step),
        }
    }

    fn name_step(&self) -> String {
        if self.namespace_uri().is_empty() || !self.namespace_prefix().is_empty() {
            self.qualified_name().to_string()
        } else {
            format!("*[name()='{}']", self.local_name())
        }
    }

    // -------------------------------------------------------------------------------------------

    /// Raw view of the content.
    pub fn content(&self) -> &ContentModel {
        &self.content
    }

    pub fn nodes(&self) -> Vec<XmlItem> {
        self.content.nodes()
    }

    pub fn node(&self, index: usize) -> Option<XmlItem> {
        self.content.get(index)
    }

    pub fn node_count(&self) -> usize {
        self.content.len()
    }

    pub fn index_of(&self, item: &XmlItem) -> Option<usize> {
        self.content.index_of(item)
    }

    pub fn elements(&self) -> Vec<XmlNode<XmlElement>> {
        self.content.elements()
    }

    /// Child elements named `name`, resolved against the namespaces in
    /// scope. An unknown prefix matches nothing.
    pub fn elements_named(&self, name: &str) -> Vec<XmlNode<XmlElement>> {
        match self.resolve_qname(name) {
            Ok(qname) => self.content.elements_qname(&qname),
            Err(_) => vec![],
        }
    }

    pub fn elements_qname(&self, qname: &QName) -> Vec<XmlNode<XmlElement>> {
        self.content.elements_qname(qname)
    }

    pub fn element(&self, name: &str) -> Option<XmlNode<XmlElement>> {
        let qname = self.resolve_qname(name).ok()?;
        self.content.element(qname.local_name(), qname.namespace_uri())
    }

    pub fn element_qname(&self, qname: &QName) -> Option<XmlNode<XmlElement>> {
        self.content
            .element(qname.local_name(), qname.namespace_uri())
    }

    pub fn element_text(&self, name: &str) -> Option<String> {
        self.element(name)
            .map(|v| v.borrow().text().into_owned())
    }

    pub fn element_text_trim(&self, name: &str) -> Option<String> {
        self.element(name).map(|v| v.borrow().text_trim())
    }

    // -------------------------------------------------------------------------------------------

    pub fn text_trim(&self) -> String {
        collapse_whitespace(&self.content.text())
    }

    /// Replaces every character data child with a single text node.
    pub fn set_text(&mut self, text: &str) -> error::Result<XmlNode<XmlText>> {
        let mut removed = vec![];
        self.content.retain_entries(|v| {
            let character = matches!(
                v.node_type(),
                NodeType::Text | NodeType::CData | NodeType::Entity
            );
            if character {
                removed.push(v.clone());
            }
            !character
        });

        for entry in removed.iter() {
            self.unlink(entry);
        }

        self.add_text(text)
    }

    pub fn is_text_only(&self) -> bool {
        self.content.is_text_only()
    }

    pub fn has_mixed_content(&self) -> bool {
        self.content.has_mixed_content()
    }

    /// Merges adjacent text, drops empty text, and recurses into child
    /// elements.
    pub fn normalize(&mut self) {
        let entries = self.content.clear();
        let mut merged: Vec<Content> = Vec::with_capacity(entries.len());

        for entry in entries {
            let text = match &entry {
                Content::Text(v) => Some(v.clone()),
                Content::Node(XmlItem::Text(v)) => Some(v.borrow().text().to_string()),
                _ => None,
            };

            let Some(text) = text else {
                if let Content::Node(XmlItem::Element(child)) = &entry {
                    child.borrow_mut().normalize();
                }
                merged.push(entry);
                continue;
            };

            if text.is_empty() {
                self.unlink(&entry);
                continue;
            }

            match merged.last_mut() {
                Some(Content::Text(previous)) => {
                    previous.push_str(&text);
                    self.unlink(&entry);
                }
                Some(last @ Content::Node(XmlItem::Text(_))) => {
                    let appended = match &*last {
                        Content::Node(XmlItem::Text(previous)) => {
                            previous.borrow_mut().append_text(&text)
                        }
                        _ => Ok(()),
                    };

                    // A flyweight cannot grow; fall back to bare text.
                    if appended.is_err() {
                        let mut joined = last.to_item().text();
                        joined.push_str(&text);
                        *last = Content::Text(joined);
                    }
                    self.unlink(&entry);
                }
                _ => merged.push(entry),
            }
        }

        for entry in merged {
            self.content.add(entry);
        }
    }

    // -------------------------------------------------------------------------------------------

    pub fn add<T: Into<XmlItem>>(&mut self, item: T) -> error::Result<()> {
        let item = item.into();

        if let XmlItem::Attribute(attr) = item {
            return self.add_attribute_node(attr);
        }

        self.check_add(&item, false)?;
        item.set_owner(self.link());
        self.content.add(Content::Node(item));
        Ok(())
    }

    pub fn insert<T: Into<XmlItem>>(&mut self, index: usize, item: T) -> error::Result<()> {
        let item = item.into();

        if index > self.content.len() {
            return Err(error::Error::OutOfIndex(index));
        }

        if let XmlItem::Attribute(_) = item {
            return Err(error::Error::InvalidHierarchy(format!(
                "{} cannot be placed in content",
                item.describe()
            )));
        }

        self.check_add(&item, false)?;
        item.set_owner(self.link());
        self.content.insert(index, Content::Node(item))
    }

    pub fn remove(&mut self, item: &XmlItem) -> bool {
        if let XmlItem::Attribute(attr) = item {
            return self.remove_attribute(attr);
        }

        match self.content.remove_node(item) {
            Some(removed) => {
                self.unlink(&removed);
                true
            }
            None => false,
        }
    }

    pub fn remove_at(&mut self, index: usize) -> error::Result<XmlItem> {
        let removed = self.content.remove_at(index)?;
        self.unlink(&removed);
        Ok(removed.to_item())
    }

    /// Replaces the child at `index` and returns the old one.
    pub fn set_node(&mut self, index: usize, item: XmlItem) -> error::Result<XmlItem> {
        let current = self
            .content
            .get(index)
            .ok_or(error::Error::OutOfIndex(index))?;

        if current.ptr_eq(&item) {
            return Ok(item);
        }

        if let XmlItem::Attribute(_) = item {
            return Err(error::Error::InvalidHierarchy(format!(
                "{} cannot be placed in content",
                item.describe()
            )));
        }

        self.check_add(&item, false)?;
        item.set_owner(self.link());
        let old = self.content.set(index, Content::Node(item))?;
        self.unlink(&old);
        Ok(old.to_item())
    }

    /// Replaces the whole content. Nodes already owned by this element may
    /// be passed again.
    pub fn set_content(&mut self, items: Vec<XmlItem>) -> error::Result<()> {
        for item in items.iter() {
            if let XmlItem::Attribute(_) = item {
                return Err(error::Error::InvalidHierarchy(format!(
                    "{} cannot be placed in content",
                    item.describe()
                )));
            }
            self.check_add(item, true)?;
        }

        self.clear_content();

        for item in items {
            item.set_owner(self.link());
            self.content.add(Content::Node(item));
        }

        Ok(())
    }

    pub fn clear_content(&mut self) {
        for entry in self.content.clear() {
            self.unlink(&entry);
        }
    }

    /// Appends deep copies of another branch's content.
    pub fn append_content(&mut self, branch: &Branch) -> error::Result<()> {
        let copies = match branch {
            Branch::Element(v) if Rc::as_ptr(v) == self.this.as_ptr() => {
                self.content.deep_copy(&self.factory)
            }
            Branch::Element(v) => v.borrow().content().deep_copy(&self.factory),
            Branch::Document(v) => v.borrow().content().deep_copy(&self.factory),
        };

        for entry in copies {
            match entry {
                Content::Text(v) => self.content.add(Content::Text(v)),
                Content::Node(v) => self.add(v)?,
            }
        }

        Ok(())
    }

    // -------------------------------------------------------------------------------------------

    /// Adds a child element. A prefixed name needs its prefix in scope; an
    /// unprefixed name takes the default namespace in scope.
    pub fn add_element(&mut self, name: &str) -> error::Result<XmlNode<XmlElement>> {
        let qname = self.resolve_qname(name)?;
        self.add_element_qname(qname)
    }

    pub fn add_element_ns(
        &mut self,
        qualified_name: &str,
        uri: &str,
    ) -> error::Result<XmlNode<XmlElement>> {
        let qname = self.factory.qname(qualified_name, uri)?;
        self.add_element_qname(qname)
    }

    pub fn add_element_qname(&mut self, qname: QName) -> error::Result<XmlNode<XmlElement>> {
        let element = self.factory.create_element_qname(qname);
        self.add(element.clone())?;
        Ok(element)
    }

    pub fn add_text(&mut self, text: &str) -> error::Result<XmlNode<XmlText>> {
        let text = self.factory.create_text(text);
        self.add(text.clone())?;
        Ok(text)
    }

    /// Appends character data without creating a node for it.
    pub fn add_raw_text(&mut self, text: &str) {
        self.content.add(Content::from(text));
    }

    pub fn add_cdata(&mut self, text: &str) -> error::Result<XmlNode<XmlCData>> {
        let cdata = self.factory.create_cdata(text);
        self.add(cdata.clone())?;
        Ok(cdata)
    }

    pub fn add_comment(&mut self, text: &str) -> error::Result<XmlNode<XmlComment>> {
        let comment = self.factory.create_comment(text);
        self.add(comment.clone())?;
        Ok(comment)
    }

    pub fn add_entity(
        &mut self,
        name: &str,
        text: Option<&str>,
    ) -> error::Result<XmlNode<XmlEntity>> {
        if !xml_nom::is_name(name) {
            return Err(error::Error::InvalidName(name.to_string()));
        }

        let entity = self.factory.create_entity(name, text);
        self.add(entity.clone())?;
        Ok(entity)
    }

    pub fn add_processing_instruction(
        &mut self,
        target: &str,
        text: &str,
    ) -> error::Result<XmlNode<XmlProcessingInstruction>> {
        if !xml_nom::is_name(target) {
            return Err(error::Error::InvalidName(target.to_string()));
        }

        let pi = self.factory.create_processing_instruction(target, text);
        self.add(pi.clone())?;
        Ok(pi)
    }

    /// Declares `prefix` on this element.
    pub fn add_namespace(&mut self, prefix: &str, uri: &str) -> error::Result<Namespace> {
        if !prefix.is_empty() && !xml_nom::is_ncname(prefix) {
            return Err(error::Error::InvalidName(prefix.to_string()));
        }

        if !prefix.is_empty() && uri.is_empty() {
            return Err(error::Error::UndeclaredPrefix(prefix.to_string()));
        }

        let namespace = self.factory.create_namespace(prefix, uri);
        self.content
            .add(Content::Node(XmlItem::Namespace(namespace.clone())));
        Ok(namespace)
    }

    // -------------------------------------------------------------------------------------------

    /// Own prefix first, then `xml`, then local declarations, then the
    /// ancestors. The empty prefix falls back to no namespace.
    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<Namespace> {
        if prefix == self.namespace_prefix() {
            return Some(self.namespace().clone());
        }

        if prefix == "xml" {
            return Some(self.factory.names().xml_namespace());
        }

        if let Some(namespace) = self.content.namespace_for_prefix(prefix) {
            return Some(namespace);
        }

        if let Some(namespace) = self
            .owner
            .parent()
            .and_then(|v| v.borrow().namespace_for_prefix(prefix))
        {
            return Some(namespace);
        }

        if prefix.is_empty() {
            Some(self.factory.names().no_namespace())
        } else {
            None
        }
    }

    pub fn namespace_for_uri(&self, uri: &str) -> Option<Namespace> {
        if uri.is_empty() {
            return Some(self.factory.names().no_namespace());
        }

        if uri == self.namespace_uri() {
            return Some(self.namespace().clone());
        }

        if let Some(namespace) = self.content.namespace_for_uri(uri) {
            return Some(namespace);
        }

        self.owner
            .parent()
            .and_then(|v| v.borrow().namespace_for_uri(uri))
    }

    /// Namespace nodes in the content.
    pub fn declared_namespaces(&self) -> Vec<Namespace> {
        self.content.namespaces()
    }

    /// Declared namespaces other than the element's own.
    pub fn additional_namespaces(&self) -> Vec<Namespace> {
        self.content
            .namespaces()
            .into_iter()
            .filter(|v| v != self.namespace())
            .collect()
    }

    /// Namespaces used by the element or its attributes that are neither
    /// declared here nor inherited.
    fn undeclared_namespaces(&self) -> Vec<Namespace> {
        let mut missing: Vec<Namespace> = vec![];

        let used = std::iter::once(self.namespace().clone()).chain(
            self.attributes
                .as_slice()
                .iter()
                .map(|v| v.borrow().qname().namespace().clone())
                .filter(|v| !v.prefix().is_empty()),
        );

        for namespace in used {
            if namespace.prefix() == "xml" || missing.contains(&namespace) {
                continue;
            }

            if self.content.namespace_for_prefix(namespace.prefix()).is_some() {
                continue;
            }

            let inherited = self
                .owner
                .parent()
                .and_then(|v| v.borrow().namespace_for_prefix(namespace.prefix()));

            let declared = match inherited {
                Some(v) => v.uri() == namespace.uri(),
                None => namespace.is_no_namespace(),
            };

            if !declared {
                missing.push(namespace);
            }
        }

        missing
    }

    // -------------------------------------------------------------------------------------------

    pub fn attributes(&self) -> Vec<XmlNode<XmlAttribute>> {
        self.attributes.as_slice().to_vec()
    }

    pub fn attribute_model(&self) -> &AttributeModel {
        &self.attributes
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn attribute_at(&self, index: usize) -> Option<XmlNode<XmlAttribute>> {
        self.attributes.get(index)
    }

    /// Lookup by the qualified name as written.
    pub fn attribute(&self, name: &str) -> Option<XmlNode<XmlAttribute>> {
        self.attributes.find_named(name)
    }

    pub fn attribute_qname(&self, qname: &QName) -> Option<XmlNode<XmlAttribute>> {
        self.attributes.find_qname(qname)
    }

    pub fn attribute_value(&self, name: &str) -> Option<String> {
        self.attribute(name)
            .map(|v| v.borrow().value().to_string())
    }

    pub fn attribute_value_qname(&self, qname: &QName) -> Option<String> {
        self.attribute_qname(qname)
            .map(|v| v.borrow().value().to_string())
    }

    /// Sets an attribute. A prefixed name needs its prefix in scope; an
    /// unprefixed name has no namespace.
    pub fn add_attribute(
        &mut self,
        name: &str,
        value: &str,
    ) -> error::Result<XmlNode<XmlAttribute>> {
        let parsed =
            xml_nom::parse_qname(name).ok_or_else(|| error::Error::InvalidName(name.to_string()))?;

        let namespace = if parsed.is_prefixed() {
            self.namespace_for_prefix(parsed.prefix())
                .ok_or_else(|| error::Error::UndeclaredPrefix(parsed.prefix().to_string()))?
        } else {
            self.factory.names().no_namespace()
        };

        let qname = self.factory.create_qname(parsed.local_part(), &namespace);
        self.set_attribute_value(&qname, value)
    }

    pub fn add_attribute_ns(
        &mut self,
        qualified_name: &str,
        uri: &str,
        value: &str,
    ) -> error::Result<XmlNode<XmlAttribute>> {
        let qname = self.factory.qname(qualified_name, uri)?;
        self.set_attribute_value(&qname, value)
    }

    /// Missing attributes are created, read-only ones are replaced at the
    /// same position by a new attribute, and linked ones change in place.
    pub fn set_attribute_value(
        &mut self,
        qname: &QName,
        value: &str,
    ) -> error::Result<XmlNode<XmlAttribute>> {
        let Some(index) = self
            .attributes
            .position(qname.local_name(), qname.namespace_uri())
        else {
            let attr = self
                .factory
                .create_attribute_qname(qname.clone(), value);
            self.add_attribute_node(attr.clone())?;
            return Ok(attr);
        };

        let existing = self.attributes.as_slice()[index].clone();
        if existing.borrow().is_read_only() {
            let attr = self
                .factory
                .create_attribute_qname(existing.borrow().qname().clone(), value);
            attr.borrow_mut().set_owner(self.link());
            self.attributes.set(index, attr.clone())?;
            Ok(attr)
        } else {
            existing.borrow_mut().set_value(value)?;
            Ok(existing)
        }
    }

    /// Adds an attribute node, replacing the one with the same name.
    pub fn add_attribute_node(&mut self, attr: XmlNode<XmlAttribute>) -> error::Result<()> {
        self.check_attribute(&attr)?;
        attr.borrow_mut().set_owner(self.link());
        if let Some(old) = self.attributes.put(attr) {
            old.borrow_mut().set_owner(Owner::Detached);
        }
        Ok(())
    }

    pub(crate) fn insert_attribute_node(
        &mut self,
        index: usize,
        attr: XmlNode<XmlAttribute>,
    ) -> error::Result<()> {
        if index > self.attributes.len() {
            return Err(error::Error::OutOfIndex(index));
        }

        self.check_attribute(&attr)?;
        attr.borrow_mut().set_owner(self.link());
        if let Some(old) = self.attributes.insert(index, attr)? {
            old.borrow_mut().set_owner(Owner::Detached);
        }
        Ok(())
    }

    pub(crate) fn set_attribute_node(
        &mut self,
        index: usize,
        attr: XmlNode<XmlAttribute>,
    ) -> error::Result<XmlNode<XmlAttribute>> {
        let current = self
            .attributes
            .get(index)
            .ok_or(error::Error::OutOfIndex(index))?;

        if Rc::ptr_eq(&current, &attr) {
            return Ok(attr);
        }

        self.check_attribute(&attr)?;
        let old = self.attributes.remove_at(index)?;
        old.borrow_mut().set_owner(Owner::Detached);
        self.insert_attribute_node(index, attr)?;
        Ok(old)
    }

    pub fn remove_attribute(&mut self, attr: &XmlNode<XmlAttribute>) -> bool {
        if self.attributes.remove(attr) {
            attr.borrow_mut().set_owner(Owner::Detached);
            true
        } else {
            false
        }
    }

    pub fn remove_attribute_at(&mut self, index: usize) -> error::Result<XmlNode<XmlAttribute>> {
        let attr = self.attributes.remove_at(index)?;
        attr.borrow_mut().set_owner(Owner::Detached);
        Ok(attr)
    }

    pub fn clear_attributes(&mut self) {
        for attr in self.attributes.clear() {
            attr.borrow_mut().set_owner(Owner::Detached);
        }
    }

    // -------------------------------------------------------------------------------------------

    pub fn create_copy(&self) -> XmlNode<XmlElement> {
        self.create_copy_qname(self.qname.clone())
    }

    pub fn create_copy_named(&self, name: &str) -> error::Result<XmlNode<XmlElement>> {
        let qname = self.resolve_qname(name)?;
        Ok(self.create_copy_qname(qname))
    }

    /// Deep copy under another name. The copy has no parent.
    pub fn create_copy_qname(&self, qname: QName) -> XmlNode<XmlElement> {
        let attributes = self
            .attributes
            .as_slice()
            .iter()
            .map(|v| {
                let v = v.borrow();
                self.factory.create_attribute_qname(v.qname().clone(), v.value())
            })
            .collect::<Vec<XmlNode<XmlAttribute>>>();
        let content = self.content.deep_copy(&self.factory);

        let copy = self.factory.create_element_qname(qname);
        {
            let mut element = copy.borrow_mut();
            let link = element.link();

            for attr in attributes {
                attr.borrow_mut().set_owner(link.clone());
                element.attributes.put(attr);
            }

            for entry in content {
                if let Content::Node(item) = &entry {
                    item.set_owner(link.clone());
                }
                element.content.add(entry);
            }

            element.user_data = self.user_data.clone();
        }
        copy
    }

    // -------------------------------------------------------------------------------------------

    pub(crate) fn owner(&self) -> &Owner {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        self.owner = owner;
    }

    pub(crate) fn ptr(&self) -> *const RefCell<XmlElement> {
        self.this.as_ptr()
    }

    fn link(&self) -> Owner {
        Owner::Element(self.this.clone())
    }

    fn unlink(&self, entry: &Content) {
        if let Content::Node(item) = entry {
            if item.owner().is_element(self.ptr()) {
                item.release();
            }
        }
    }

    fn resolve_qname(&self, name: &str) -> error::Result<QName> {
        let parsed =
            xml_nom::parse_qname(name).ok_or_else(|| error::Error::InvalidName(name.to_string()))?;

        let namespace = match self.namespace_for_prefix(parsed.prefix()) {
            Some(namespace) => namespace,
            None if parsed.is_prefixed() => {
                return Err(error::Error::UndeclaredPrefix(parsed.prefix().to_string()))
            }
            None => self.factory.names().no_namespace(),
        };

        Ok(self.factory.create_qname(parsed.local_part(), &namespace))
    }

    fn is_self_or_ancestor(&self, element: &XmlNode<XmlElement>) -> bool {
        let target = Rc::as_ptr(element);
        if target == self.ptr() {
            return true;
        }

        let mut current = self.owner.parent();
        while let Some(parent) = current {
            if Rc::as_ptr(&parent) == target {
                return true;
            }
            current = parent.borrow().parent();
        }

        false
    }

    fn check_add(&self, item: &XmlItem, allow_own: bool) -> error::Result<()> {
        match item {
            XmlItem::Document(_) | XmlItem::DocumentType(_) => {
                return Err(error::Error::InvalidHierarchy(format!(
                    "{} cannot be added to element '{}'",
                    item.node_type().as_str(),
                    self.qualified_name()
                )));
            }
            XmlItem::Element(v) if self.is_self_or_ancestor(v) => {
                return Err(error::Error::InvalidHierarchy(format!(
                    "element '{}' cannot contain itself or an ancestor",
                    self.qualified_name()
                )));
            }
            _ => {}
        }

        let owner = item.owner();
        if owner.is_linked() && !(allow_own && owner.is_element(self.ptr())) {
            return Err(error::Error::IllegalAdd {
                node: item.describe(),
                parent: owner.describe(),
            });
        }

        Ok(())
    }

    fn check_attribute(&self, attr: &XmlNode<XmlAttribute>) -> error::Result<()> {
        let owner = attr.borrow().owner().clone();
        if owner.is_linked() {
            return Err(error::Error::IllegalAdd {
                node: XmlItem::Attribute(attr.clone()).describe(),
                parent: owner.describe(),
            });
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::NameCache;

    fn root() -> XmlNode<XmlElement> {
        DocumentFactory::new().create_element("root").unwrap()
    }

    #[test]
    fn test_names() {
        let factory = DocumentFactory::new();
        let element = factory.create_element_ns("x:foo", "U").unwrap();

        let e = element.borrow();
        assert_eq!("x:foo", e.qualified_name());
        assert_eq!("foo", e.local_name());
        assert_eq!("x", e.namespace_prefix());
        assert_eq!("U", e.namespace_uri());
        assert_eq!(Some("x:foo"), e.name());
        assert_eq!(NodeType::Element, e.node_type());
        assert!(e.supports_parent());
        assert!(!e.is_read_only());
    }

    #[test]
    fn test_set_name() {
        let factory = DocumentFactory::new();
        let element = factory.create_element_ns("x:foo", "U").unwrap();
        element.borrow_mut().add_namespace("y", "V").unwrap();

        element.borrow_mut().set_name("bar").unwrap();
        assert_eq!("x:bar", element.borrow().qualified_name());

        element.borrow_mut().set_name("y:baz").unwrap();
        assert_eq!("V", element.borrow().namespace_uri());

        assert_eq!(
            Err(error::Error::UndeclaredPrefix("z".to_string())),
            element.borrow_mut().set_name("z:qux")
        );
        assert_eq!(
            Err(error::Error::InvalidName("1a".to_string())),
            element.borrow_mut().set_name("1a")
        );
    }

    #[test]
    fn test_add_links_parent() {
        let root = root();
        let child = root.borrow_mut().add_element("child").unwrap();
        let text = root.borrow_mut().add_text("t").unwrap();

        assert!(Rc::ptr_eq(&root, &child.borrow().parent().unwrap()));
        assert!(Rc::ptr_eq(&root, &text.borrow().parent().unwrap()));
        assert_eq!(2, root.borrow().node_count());
        assert_eq!("<root><child/>t</root>", root.borrow().to_string());
    }

    #[test]
    fn test_single_parent() {
        let factory = DocumentFactory::new();
        let first = factory.create_element("first").unwrap();
        let second = factory.create_element("second").unwrap();
        let child = first.borrow_mut().add_element("child").unwrap();

        let err = second.borrow_mut().add(child.clone()).unwrap_err();
        assert_eq!(
            error::Error::IllegalAdd {
                node: "element 'child'".to_string(),
                parent: "element 'first'".to_string(),
            },
            err
        );
        assert!(Rc::ptr_eq(&first, &child.borrow().parent().unwrap()));
        assert_eq!(0, second.borrow().node_count());

        let attr = first.borrow_mut().add_attribute("a", "1").unwrap();
        assert!(matches!(
            second.borrow_mut().add(attr.clone()),
            Err(error::Error::IllegalAdd { .. })
        ));
        assert!(Rc::ptr_eq(&first, &attr.borrow().parent().unwrap()));
    }

    #[test]
    fn test_add_shared_to_many() {
        let factory = DocumentFactory::new();
        let first = factory.create_element("first").unwrap();
        let second = factory.create_element("second").unwrap();
        let text = node(XmlText::shared("same"));

        first.borrow_mut().add(text.clone()).unwrap();
        second.borrow_mut().add(text.clone()).unwrap();
        assert!(text.borrow().parent().is_none());
        assert_eq!("same", first.borrow().text());
        assert_eq!("same", second.borrow().text());
    }

    #[test]
    fn test_invalid_hierarchy() {
        let factory = DocumentFactory::new();
        let root = factory.create_element("root").unwrap();
        let child = root.borrow_mut().add_element("child").unwrap();
        let grandchild = child.borrow_mut().add_element("grandchild").unwrap();

        assert!(matches!(
            root.borrow_mut().add(root.clone()),
            Err(error::Error::InvalidHierarchy(_))
        ));
        assert!(matches!(
            grandchild.borrow_mut().add(root.clone()),
            Err(error::Error::InvalidHierarchy(_))
        ));
        assert!(matches!(
            root.borrow_mut().add(factory.create_document()),
            Err(error::Error::InvalidHierarchy(_))
        ));
        assert!(matches!(
            root.borrow_mut().add(factory.create_doc_type("root", None, None)),
            Err(error::Error::InvalidHierarchy(_))
        ));
    }

    #[test]
    fn test_insert_remove() {
        let root = root();
        let a = root.borrow_mut().add_element("a").unwrap();
        let b = root.borrow().factory().create_element("b").unwrap();
        root.borrow_mut().insert(0, b.clone()).unwrap();

        assert_eq!(Some(0), root.borrow().index_of(&XmlItem::from(b.clone())));
        assert_eq!(Some(1), root.borrow().index_of(&XmlItem::from(a.clone())));
        assert_eq!(
            Err(error::Error::OutOfIndex(3)),
            root.borrow_mut().insert(3, XmlItem::from(Namespace::new("p", "u")))
        );

        assert!(root.borrow_mut().remove(&XmlItem::from(a.clone())));
        assert!(a.borrow().parent().is_none());
        assert!(!root.borrow_mut().remove(&XmlItem::from(a.clone())));

        let removed = root.borrow_mut().remove_at(0).unwrap();
        assert!(removed.ptr_eq(&XmlItem::from(b.clone())));
        assert!(b.borrow().parent().is_none());
        assert!(root.borrow_mut().remove_at(0).is_err());
    }

    #[test]
    fn test_set_node() {
        let root = root();
        let a = root.borrow_mut().add_element("a").unwrap();
        let b = root.borrow().factory().create_element("b").unwrap();

        let old = root.borrow_mut().set_node(0, XmlItem::from(b.clone())).unwrap();
        assert!(old.ptr_eq(&XmlItem::from(a.clone())));
        assert!(a.borrow().parent().is_none());
        assert!(b.borrow().parent().is_some());
        assert!(root.borrow_mut().set_node(1, XmlItem::from(a)).is_err());
    }

    #[test]
    fn test_set_content() {
        let root = root();
        let a = root.borrow_mut().add_element("a").unwrap();
        let b = root.borrow_mut().add_element("b").unwrap();

        root.borrow_mut()
            .set_content(vec![XmlItem::from(b.clone()), XmlItem::from(a.clone())])
            .unwrap();
        assert_eq!("<root><b/><a/></root>", root.borrow().to_string());
        assert!(a.borrow().parent().is_some());

        root.borrow_mut().set_content(vec![XmlItem::from(a.clone())]).unwrap();
        assert!(b.borrow().parent().is_none());

        root.borrow_mut().clear_content();
        assert!(a.borrow().parent().is_none());
        assert_eq!("<root/>", root.borrow().to_string());
    }

    #[test]
    fn test_text_aggregation() {
        let root = root();
        root.borrow_mut().add_raw_text("a");
        let child = root.borrow_mut().add_element("child").unwrap();
        child.borrow_mut().add_text("inner").unwrap();
        root.borrow_mut().add_text("b").unwrap();

        assert_eq!("ab", root.borrow().text());
        assert_eq!("ainnerb", root.borrow().string_value());
        assert!(root.borrow().has_mixed_content());
        assert!(!root.borrow().is_text_only());
    }

    #[test]
    fn test_text_trim() {
        let root = root();
        root.borrow_mut().add_raw_text("  hello \n\t ");
        root.borrow_mut().add_cdata("big   world ").unwrap();
        assert_eq!("hello big world", root.borrow().text_trim());
    }

    #[test]
    fn test_set_text() {
        let root = root();
        root.borrow_mut().add_raw_text("a");
        let cdata = root.borrow_mut().add_cdata("b").unwrap();
        root.borrow_mut().add_comment("c").unwrap();
        root.borrow_mut().add_element("d").unwrap();

        root.borrow_mut().set_text("new").unwrap();
        assert_eq!("<root><!--c--><d/>new</root>", root.borrow().to_string());
        assert!(cdata.borrow().parent().is_none());
    }

    #[test]
    fn test_normalize() {
        let root = root();
        root.borrow_mut().add_raw_text("a");
        root.borrow_mut().add_text("b").unwrap();
        root.borrow_mut().add_text("").unwrap();
        let child = root.borrow_mut().add_element("child").unwrap();
        child.borrow_mut().add_text("x").unwrap();
        child.borrow_mut().add(node(XmlText::shared("y"))).unwrap();
        child.borrow_mut().add_raw_text("z");
        let c = root.borrow_mut().add_text("c").unwrap();
        root.borrow_mut().add_raw_text("d");

        root.borrow_mut().normalize();
        assert_eq!(3, root.borrow().node_count());
        assert_eq!("ab", root.borrow().node(0).unwrap().text());
        assert_eq!("cd", c.borrow().text());
        assert_eq!(1, child.borrow().node_count());
        assert_eq!("xyz", child.borrow().text());

        let shared = node(XmlText::shared("p"));
        let other = root.borrow_mut().add_element("other").unwrap();
        other.borrow_mut().add(shared.clone()).unwrap();
        other.borrow_mut().add_text("q").unwrap();
        other.borrow_mut().normalize();
        assert_eq!(1, other.borrow().node_count());
        assert_eq!("pq", other.borrow().text());
        assert_eq!("p", shared.borrow().text());
    }

    #[test]
    fn test_entities_and_pis() {
        let root = root();
        root.borrow_mut().add_entity("amp", Some("&")).unwrap();
        root.borrow_mut()
            .add_processing_instruction("target", "a=\"1\"")
            .unwrap();

        assert_eq!(
            "<root>&amp;<?target a=\"1\"?></root>",
            root.borrow().to_string()
        );
        assert_eq!("&", root.borrow().string_value());
        assert!(root.borrow_mut().add_entity("1", None).is_err());
        assert!(root.borrow_mut().add_processing_instruction("", "").is_err());
    }

    #[test]
    fn test_add_element_namespaces() {
        let root = root();
        root.borrow_mut().add_namespace("x", "urn:x").unwrap();
        root.borrow_mut().add_namespace("", "urn:d").unwrap();

        let a = root.borrow_mut().add_element("x:a").unwrap();
        assert_eq!("urn:x", a.borrow().namespace_uri());

        let b = a.borrow_mut().add_element("b").unwrap();
        assert_eq!("urn:d", b.borrow().namespace_uri());

        let c = b.borrow_mut().add_element_ns("y:c", "urn:y").unwrap();
        assert_eq!("y:c", c.borrow().qualified_name());

        assert_eq!(
            Err(error::Error::UndeclaredPrefix("z".to_string())),
            b.borrow_mut().add_element("z:d").map(|_| ())
        );
        assert_eq!(
            Err(error::Error::InvalidName("a b".to_string())),
            b.borrow_mut().add_element("a b").map(|_| ())
        );
        assert!(root.borrow_mut().add_namespace("1x", "urn").is_err());
    }

    #[test]
    fn test_namespace_for_prefix() {
        let names = Rc::new(NameCache::new());
        let factory = DocumentFactory::with_names(names.clone());
        let root = factory.create_element_ns("p:root", "urn:p").unwrap();
        root.borrow_mut().add_namespace("x", "urn:x").unwrap();
        let child = root.borrow_mut().add_element("child").unwrap();

        let c = child.borrow();
        assert!(c.namespace_for_prefix("x").unwrap().ptr_eq(&names.namespace("x", "urn:x")));
        assert_eq!("urn:p", c.namespace_for_prefix("p").unwrap().uri());
        assert!(c.namespace_for_prefix("xml").unwrap().ptr_eq(&names.xml_namespace()));
        assert!(c.namespace_for_prefix("").unwrap().ptr_eq(&names.no_namespace()));
        assert!(c.namespace_for_prefix("y").is_none());

        assert_eq!("x", c.namespace_for_uri("urn:x").unwrap().prefix());
        assert!(c.namespace_for_uri("urn:none").is_none());
        assert!(c.namespace_for_uri("").unwrap().is_no_namespace());
    }

    #[test]
    fn test_additional_namespaces() {
        let factory = DocumentFactory::new();
        let root = factory.create_element_ns("p:root", "urn:p").unwrap();
        root.borrow_mut().add_namespace("p", "urn:p").unwrap();
        root.borrow_mut().add_namespace("x", "urn:x").unwrap();

        assert_eq!(2, root.borrow().declared_namespaces().len());
        let additional = root.borrow().additional_namespaces();
        assert_eq!(1, additional.len());
        assert_eq!("x", additional[0].prefix());
    }

    #[test]
    fn test_display_declares_namespaces() {
        let factory = DocumentFactory::new();
        let root = factory.create_element_ns("p:root", "urn:p").unwrap();
        let child = root.borrow_mut().add_element("p:child").unwrap();
        child
            .borrow_mut()
            .add_attribute_ns("q:a", "urn:q", "1")
            .unwrap();
        child.borrow_mut().add_element_ns("d", "urn:d").unwrap();

        assert_eq!(
            "<p:root xmlns:p=\"urn:p\"><p:child xmlns:q=\"urn:q\" q:a=\"1\"><d xmlns=\"urn:d\"/></p:child></p:root>",
            root.borrow().to_string()
        );
    }

    #[test]
    fn test_attributes() {
        let root = root();
        let a = root.borrow_mut().add_attribute("a", "1").unwrap();
        root.borrow_mut().add_attribute("b", "<\"2\">").unwrap();

        assert_eq!(2, root.borrow().attribute_count());
        assert_eq!(Some("1".to_string()), root.borrow().attribute_value("a"));
        assert!(Rc::ptr_eq(&root, &a.borrow().parent().unwrap()));
        assert_eq!(
            "<root a=\"1\" b=\"&lt;&quot;2&quot;>\"/>",
            root.borrow().to_string()
        );

        assert!(root.borrow_mut().remove_attribute(&a));
        assert!(a.borrow().parent().is_none());
        assert_eq!(None, root.borrow().attribute_value("a"));

        assert_eq!(
            Err(error::Error::UndeclaredPrefix("x".to_string())),
            root.borrow_mut().add_attribute("x:a", "1").map(|_| ())
        );

        root.borrow_mut().add_attribute("xml:lang", "en").unwrap();
        assert_eq!(Some("en".to_string()), root.borrow().attribute_value("xml:lang"));
    }

    #[test]
    fn test_attribute_replace_or_mutate() {
        let factory = DocumentFactory::new();
        let root = factory.create_element("root").unwrap();
        let qname = factory.create_qname("a", &factory.names().no_namespace());

        let linked = root.borrow_mut().add_attribute("a", "1").unwrap();
        let same = root.borrow_mut().set_attribute_value(&qname, "2").unwrap();
        assert!(Rc::ptr_eq(&linked, &same));
        assert_eq!("2", linked.borrow().value());
        assert!(Rc::ptr_eq(&root, &linked.borrow().parent().unwrap()));

        let other = factory.create_element("other").unwrap();
        let shared = node(XmlAttribute::shared(qname.clone(), "x"));
        other.borrow_mut().add_attribute_node(shared.clone()).unwrap();
        other.borrow_mut().add_attribute("b", "y").unwrap();

        let replaced = other.borrow_mut().set_attribute_value(&qname, "z").unwrap();
        assert!(!Rc::ptr_eq(&shared, &replaced));
        assert_eq!("x", shared.borrow().value());
        assert_eq!("z", replaced.borrow().value());
        assert!(replaced.borrow().supports_parent());
        assert!(Rc::ptr_eq(&other, &replaced.borrow().parent().unwrap()));
        assert!(Rc::ptr_eq(&replaced, &other.borrow().attribute_at(0).unwrap()));
        assert_eq!(2, other.borrow().attribute_count());
    }

    #[test]
    fn test_add_attribute_node_replaces() {
        let factory = DocumentFactory::new();
        let root = factory.create_element("root").unwrap();
        let first = root.borrow_mut().add_attribute("a", "1").unwrap();
        let second = factory.create_attribute("a", "2").unwrap();

        root.borrow_mut().add(second.clone()).unwrap();
        assert_eq!(1, root.borrow().attribute_count());
        assert!(first.borrow().parent().is_none());
        assert_eq!(Some("2".to_string()), root.borrow().attribute_value("a"));
    }

    #[test]
    fn test_clone_independence() {
        let root = root();
        root.borrow_mut().add_attribute("a", "1").unwrap();
        root.borrow_mut().add_namespace("x", "urn:x").unwrap();
        let child = root.borrow_mut().add_element("x:child").unwrap();
        child.borrow_mut().add_text("text").unwrap();
        root.borrow_mut().add_raw_text("tail");
        root.borrow_mut().add(node(XmlComment::shared("shared"))).unwrap();

        let copy = root.borrow().create_copy();
        assert_eq!(*root.borrow(), *copy.borrow());
        assert_eq!(root.borrow().to_string(), copy.borrow().to_string());
        assert!(!Rc::ptr_eq(&root, &copy));
        assert!(copy.borrow().parent().is_none());
        assert!(copy.borrow().document().is_none());

        let copied_child = copy.borrow().element("x:child").unwrap();
        assert!(!Rc::ptr_eq(&child, &copied_child));
        assert!(Rc::ptr_eq(&copy, &copied_child.borrow().parent().unwrap()));
        assert!(copy.borrow().node(3).unwrap().ptr_eq(&root.borrow().node(3).unwrap()));

        copy.borrow_mut().add_attribute("b", "2").unwrap();
        copied_child.borrow_mut().add_text("more").unwrap();
        copy.borrow()
            .attribute("a")
            .unwrap()
            .borrow_mut()
            .set_value("changed")
            .unwrap();

        assert_eq!(1, root.borrow().attribute_count());
        assert_eq!(Some("1".to_string()), root.borrow().attribute_value("a"));
        assert_eq!("text", child.borrow().text());
        assert_ne!(*root.borrow(), *copy.borrow());
    }

    #[test]
    fn test_create_copy_named() {
        let root = root();
        root.borrow_mut().add_namespace("x", "urn:x").unwrap();
        root.borrow_mut().add_element("child").unwrap();

        let copy = root.borrow().create_copy_named("x:other").unwrap();
        assert_eq!("x:other", copy.borrow().qualified_name());
        assert_eq!(2, copy.borrow().node_count());
        assert!(root.borrow().create_copy_named("y:other").is_err());
    }

    #[test]
    fn test_append_content() {
        let factory = DocumentFactory::new();
        let source = factory.create_element("source").unwrap();
        source.borrow_mut().add_raw_text("a");
        let child = source.borrow_mut().add_element("child").unwrap();

        let target = factory.create_element("target").unwrap();
        target
            .borrow_mut()
            .append_content(&Branch::from(source.clone()))
            .unwrap();
        assert_eq!("<target>a<child/></target>", target.borrow().to_string());
        assert_eq!(2, source.borrow().node_count());
        assert!(Rc::ptr_eq(&source, &child.borrow().parent().unwrap()));

        target
            .borrow_mut()
            .append_content(&Branch::from(target.clone()))
            .unwrap();
        assert_eq!(4, target.borrow().node_count());
    }

    #[test]
    fn test_navigation() {
        let root = root();
        let a = root.borrow_mut().add_element("a").unwrap();
        a.borrow_mut().add_text("  one  two ").unwrap();
        root.borrow_mut().add_element("b").unwrap();
        root.borrow_mut().add_element("a").unwrap();

        let r = root.borrow();
        assert_eq!(3, r.elements().len());
        assert_eq!(2, r.elements_named("a").len());
        assert!(r.elements_named("q:a").is_empty());
        assert!(Rc::ptr_eq(&a, &r.element("a").unwrap()));
        assert_eq!(Some("  one  two ".to_string()), r.element_text("a"));
        assert_eq!(Some("one two".to_string()), r.element_text_trim("a"));
        assert_eq!(None, r.element_text("c"));
        assert!(!r.is_root_element());
    }

    #[test]
    fn test_user_data() {
        let root = root();
        root.borrow_mut().set_user_data(Some(Rc::new(42u32)));

        let data = root.borrow().user_data().unwrap();
        assert_eq!(Some(&42u32), data.downcast_ref::<u32>());

        let copy = root.borrow().create_copy();
        assert!(copy.borrow().user_data().is_some());
    }

    #[test]
    fn test_id() {
        let root = root();
        assert_eq!(None, root.borrow().id());
        root.borrow_mut().add_attribute("id", "a").unwrap();
        assert_eq!(Some("a".to_string()), root.borrow().id());
        root.borrow_mut().add_attribute("ID", "b").unwrap();
        assert_eq!(Some("b".to_string()), root.borrow().id());
    }
}

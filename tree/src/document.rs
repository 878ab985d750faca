use crate::content::{Content, ContentModel};
use crate::element::XmlElement;
use crate::error;
use crate::factory::DocumentFactory;
use crate::node::{Owner, XmlComment, XmlDocumentType, XmlProcessingInstruction};
use crate::{node, Node, NodeType, XmlItem, XmlNode};
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

// -----------------------------------------------------------------------------------------------

/// Top of a tree.
///
/// The content holds at most one element, which is the root element.
/// Comments and processing instructions may surround it. The document type
/// is kept apart from the content.
pub struct XmlDocument {
    name: Option<String>,
    xml_encoding: Option<String>,
    content: ContentModel,
    root: Option<XmlNode<XmlElement>>,
    doc_type: Option<XmlNode<XmlDocumentType>>,
    factory: DocumentFactory,
    this: Weak<RefCell<XmlDocument>>,
}

impl fmt::Debug for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("XmlDocument")
            .field("name", &self.name)
            .field("xml_encoding", &self.xml_encoding)
            .field("doc_type", &self.doc_type)
            .field("content", &self.content)
            .finish()
    }
}

impl PartialEq for XmlDocument {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.doc_type == other.doc_type && self.content == other.content
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "<?xml version=\"1.0\" encoding=\"{}\"?>",
            self.xml_encoding.as_deref().unwrap_or("UTF-8")
        )?;

        if let Some(doc_type) = self.doc_type.as_ref() {
            write!(f, "{}", doc_type.borrow())?;
        }

        write!(f, "{}", self.content)
    }
}

impl Node for XmlDocument {
    fn node_type(&self) -> NodeType {
        NodeType::Document
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn text(&self) -> Cow<'_, str> {
        self.content.text()
    }

    fn string_value(&self) -> Cow<'_, str> {
        Cow::Owned(self.content.string_value())
    }

    fn supports_parent(&self) -> bool {
        false
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>> {
        None
    }

    fn document(&self) -> Option<XmlNode<XmlDocument>> {
        self.this.upgrade()
    }
}

impl XmlDocument {
    pub fn new(factory: DocumentFactory) -> XmlNode<XmlDocument> {
        Rc::new_cyclic(|this| {
            RefCell::new(XmlDocument {
                name: None,
                xml_encoding: None,
                content: ContentModel::new(),
                root: None,
                doc_type: None,
                factory,
                this: this.clone(),
            })
        })
    }

    pub fn factory(&self) -> &DocumentFactory {
        &self.factory
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(|v| v.to_string());
    }

    pub fn xml_encoding(&self) -> Option<&str> {
        self.xml_encoding.as_deref()
    }

    pub fn set_xml_encoding(&mut self, encoding: Option<&str>) {
        self.xml_encoding = encoding.map(|v| v.to_string());
    }

    // -------------------------------------------------------------------------------------------

    pub fn root_element(&self) -> Option<XmlNode<XmlElement>> {
        self.root.clone()
    }

    /// Installs `element` as the root. An existing root is detached and its
    /// position in the content is reused.
    pub fn set_root_element(&mut self, element: XmlNode<XmlElement>) -> error::Result<()> {
        if let Some(root) = self.root.as_ref() {
            if Rc::ptr_eq(root, &element) {
                return Ok(());
            }
        }

        let item = XmlItem::Element(element.clone());
        self.check_owner(&item)?;

        match self.root.take() {
            Some(old) => {
                let old = XmlItem::Element(old);
                let index = self.content.index_of(&old).unwrap_or(self.content.len());
                if index < self.content.len() {
                    self.content.set(index, Content::Node(item.clone()))?;
                } else {
                    self.content.add(Content::Node(item.clone()));
                }
                old.release();
            }
            None => self.content.add(Content::Node(item.clone())),
        }

        item.set_owner(self.link());
        self.root = Some(element);
        Ok(())
    }

    /// Detaches the root element and returns it.
    pub fn clear_root_element(&mut self) -> Option<XmlNode<XmlElement>> {
        let root = self.root.take()?;
        let item = XmlItem::Element(root.clone());
        self.content.remove_node(&item);
        item.release();
        Some(root)
    }

    pub fn doc_type(&self) -> Option<XmlNode<XmlDocumentType>> {
        self.doc_type.clone()
    }

    pub fn set_doc_type(&mut self, doc_type: Option<XmlNode<XmlDocumentType>>) -> error::Result<()> {
        if let Some(new) = doc_type.as_ref() {
            let owner = new.borrow().owner().clone();
            if owner.is_linked() && !owner.is_document(self.ptr()) {
                return Err(error::Error::IllegalAdd {
                    node: XmlItem::DocumentType(new.clone()).describe(),
                    parent: owner.describe(),
                });
            }
        }

        self.clear_doc_type();

        if let Some(new) = doc_type.as_ref() {
            new.borrow_mut().set_owner(self.link());
        }

        self.doc_type = doc_type;
        Ok(())
    }

    pub fn add_doc_type(
        &mut self,
        element_name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> error::Result<XmlNode<XmlDocumentType>> {
        let doc_type = self
            .factory
            .create_doc_type(element_name, public_id, system_id);
        self.set_doc_type(Some(doc_type.clone()))?;
        Ok(doc_type)
    }

    // -------------------------------------------------------------------------------------------

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

    pub fn add<T: Into<XmlItem>>(&mut self, item: T) -> error::Result<()> {
        let item = item.into();

        if let XmlItem::DocumentType(doc_type) = item {
            return self.set_doc_type(Some(doc_type));
        }

        self.check_add(&item)?;
        self.link_item(&item);
        self.content.add(Content::Node(item));
        Ok(())
    }

    pub fn insert<T: Into<XmlItem>>(&mut self, index: usize, item: T) -> error::Result<()> {
        let item = item.into();

        if index > self.content.len() {
            return Err(error::Error::OutOfIndex(index));
        }

        self.check_add(&item)?;
        self.link_item(&item);
        self.content.insert(index, Content::Node(item))
    }

    pub fn remove(&mut self, item: &XmlItem) -> bool {
        if let XmlItem::DocumentType(doc_type) = item {
            let current = self
                .doc_type
                .as_ref()
                .map(|v| Rc::ptr_eq(v, doc_type))
                .unwrap_or_default();
            if current {
                self.clear_doc_type();
            }
            return current;
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

    /// Replaces the child at `index`. An element may only replace the root.
    pub fn set_node(&mut self, index: usize, item: XmlItem) -> error::Result<XmlItem> {
        let current = self
            .content
            .get(index)
            .ok_or(error::Error::OutOfIndex(index))?;

        if current.ptr_eq(&item) {
            return Ok(item);
        }

        let replaces_root = matches!(current, XmlItem::Element(_));
        self.check_kind(&item)?;
        self.check_owner(&item)?;
        if let XmlItem::Element(_) = item {
            if self.root.is_some() && !replaces_root {
                return Err(error::Error::RootElementExists);
            }
        }

        let old = self.content.set(index, Content::Node(item.clone()))?;
        self.unlink(&old);
        self.link_item(&item);
        Ok(old.to_item())
    }

    /// Replaces the whole content. Nodes already owned by this document may
    /// be passed again. A document type replaces the current one.
    pub fn set_content(&mut self, items: Vec<XmlItem>) -> error::Result<()> {
        let mut elements = 0;
        for item in items.iter() {
            if !matches!(item, XmlItem::DocumentType(_)) {
                self.check_kind(item)?;
            }

            let owner = item.owner();
            if owner.is_linked() && !owner.is_document(self.ptr()) {
                return Err(error::Error::IllegalAdd {
                    node: item.describe(),
                    parent: owner.describe(),
                });
            }

            if let XmlItem::Element(_) = item {
                elements += 1;
                if elements > 1 {
                    return Err(error::Error::RootElementExists);
                }
            }
        }

        self.clear_content();

        for item in items {
            match item {
                XmlItem::DocumentType(v) => self.set_doc_type(Some(v))?,
                item => {
                    self.link_item(&item);
                    self.content.add(Content::Node(item));
                }
            }
        }

        Ok(())
    }

    pub fn clear_content(&mut self) {
        for entry in self.content.clear() {
            self.unlink(&entry);
        }
    }

    // -------------------------------------------------------------------------------------------

    /// Creates the root element. A prefixed name is rejected because a
    /// document has no namespaces in scope.
    pub fn add_element(&mut self, name: &str) -> error::Result<XmlNode<XmlElement>> {
        let element = self.factory.create_element(name)?;
        self.add(element.clone())?;
        Ok(element)
    }

    pub fn add_element_ns(
        &mut self,
        qualified_name: &str,
        uri: &str,
    ) -> error::Result<XmlNode<XmlElement>> {
        let element = self.factory.create_element_ns(qualified_name, uri)?;
        self.add(element.clone())?;
        Ok(element)
    }

    pub fn add_comment(&mut self, text: &str) -> error::Result<XmlNode<XmlComment>> {
        let comment = self.factory.create_comment(text);
        self.add(comment.clone())?;
        Ok(comment)
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

    // -------------------------------------------------------------------------------------------

    /// Looks up an element by its `ID` or `id` attribute through the factory.
    pub fn element_by_id(&self, id: &str) -> Option<XmlNode<XmlElement>> {
        self.factory.element_by_id(self, id)
    }

    /// Deep copy with fresh nodes for everything that is not a flyweight.
    pub fn create_copy(&self) -> XmlNode<XmlDocument> {
        let copy = self.factory.create_document();
        {
            let mut document = copy.borrow_mut();
            document.name = self.name.clone();
            document.xml_encoding = self.xml_encoding.clone();

            if let Some(doc_type) = self.doc_type.as_ref() {
                let doc_type = node(doc_type.borrow().detached_copy());
                doc_type.borrow_mut().set_owner(document.link());
                document.doc_type = Some(doc_type);
            }

            for entry in self.content.deep_copy(&self.factory) {
                if let Content::Node(item) = &entry {
                    document.link_item(item);
                }
                document.content.add(entry);
            }
        }
        copy
    }

    pub fn normalize(&mut self) {
        if let Some(root) = self.root.as_ref() {
            root.borrow_mut().normalize();
        }
    }

    // -------------------------------------------------------------------------------------------

    pub(crate) fn ptr(&self) -> *const RefCell<XmlDocument> {
        self.this.as_ptr()
    }

    fn link(&self) -> Owner {
        Owner::Document(self.this.clone())
    }

    fn clear_doc_type(&mut self) {
        if let Some(old) = self.doc_type.take() {
            old.borrow_mut().set_owner(Owner::Detached);
        }
    }

    fn link_item(&mut self, item: &XmlItem) {
        item.set_owner(self.link());
        if let XmlItem::Element(element) = item {
            self.root = Some(element.clone());
        }
    }

    fn unlink(&mut self, entry: &Content) {
        let Content::Node(item) = entry else {
            return;
        };

        if let (XmlItem::Element(element), Some(root)) = (item, self.root.as_ref()) {
            if Rc::ptr_eq(element, root) {
                self.root = None;
            }
        }

        if item.owner().is_document(self.ptr()) {
            item.release();
        }
    }

    fn check_kind(&self, item: &XmlItem) -> error::Result<()> {
        match item {
            XmlItem::Comment(_) | XmlItem::Element(_) | XmlItem::PI(_) => Ok(()),
            _ => Err(error::Error::InvalidHierarchy(format!(
                "{} cannot be added to a document",
                item.describe()
            ))),
        }
    }

    fn check_owner(&self, item: &XmlItem) -> error::Result<()> {
        let owner = item.owner();
        if owner.is_linked() {
            return Err(error::Error::IllegalAdd {
                node: item.describe(),
                parent: owner.describe(),
            });
        }
        Ok(())
    }

    fn check_add(&self, item: &XmlItem) -> error::Result<()> {
        self.check_kind(item)?;
        self.check_owner(item)?;

        if let XmlItem::Element(_) = item {
            if self.root.is_some() {
                return Err(error::Error::RootElementExists);
            }
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------------------------

use crate::document::XmlDocument;
use crate::element::XmlElement;
use crate::error;
use crate::name::{NameCache, Namespace, QName};
use crate::node::{
    XmlAttribute, XmlCData, XmlComment, XmlDocumentType, XmlEntity, XmlProcessingInstruction,
    XmlText,
};
use crate::{node, Node, XmlNode};
use ahash::AHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

// -----------------------------------------------------------------------------------------------

/// Node constructor used by every tree operation that creates nodes.
///
/// Only [`ContentFactory::names`] is required. Override the other methods to
/// build specialized trees without touching the tree logic.
pub trait ContentFactory {
    fn names(&self) -> &Rc<NameCache>;

    fn create_document(&self, factory: &DocumentFactory) -> XmlNode<XmlDocument> {
        XmlDocument::new(factory.clone())
    }

    fn create_element(&self, factory: &DocumentFactory, qname: QName) -> XmlNode<XmlElement> {
        XmlElement::new(qname, factory.clone())
    }

    fn create_attribute(&self, qname: QName, value: &str) -> XmlNode<XmlAttribute> {
        node(XmlAttribute::new(qname, value))
    }

    fn create_text(&self, text: &str) -> XmlNode<XmlText> {
        node(XmlText::new(text))
    }

    fn create_cdata(&self, text: &str) -> XmlNode<XmlCData> {
        node(XmlCData::new(text))
    }

    fn create_comment(&self, text: &str) -> XmlNode<XmlComment> {
        node(XmlComment::new(text))
    }

    fn create_entity(&self, name: &str, text: Option<&str>) -> XmlNode<XmlEntity> {
        node(XmlEntity::new(name, text))
    }

    fn create_processing_instruction(
        &self,
        target: &str,
        text: &str,
    ) -> XmlNode<XmlProcessingInstruction> {
        node(XmlProcessingInstruction::new(target, text))
    }

    fn create_doc_type(
        &self,
        element_name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> XmlNode<XmlDocumentType> {
        node(XmlDocumentType::new(element_name, public_id, system_id))
    }

    fn create_namespace(&self, prefix: &str, uri: &str) -> Namespace {
        self.names().namespace(prefix, uri)
    }

    fn create_qname(&self, local_name: &str, namespace: &Namespace) -> QName {
        self.names().qname(local_name, namespace)
    }

    /// Linear scan in document order.
    fn element_by_id(&self, document: &XmlDocument, id: &str) -> Option<XmlNode<XmlElement>> {
        document.content().element_by_id(id)
    }
}

// -----------------------------------------------------------------------------------------------

/// Plain nodes backed by a name cache.
#[derive(Debug)]
pub struct DefaultContentFactory {
    names: Rc<NameCache>,
}

impl Default for DefaultContentFactory {
    fn default() -> Self {
        DefaultContentFactory::new(NameCache::default_instance())
    }
}

impl ContentFactory for DefaultContentFactory {
    fn names(&self) -> &Rc<NameCache> {
        &self.names
    }
}

impl DefaultContentFactory {
    pub fn new(names: Rc<NameCache>) -> Self {
        DefaultContentFactory { names }
    }
}

// -----------------------------------------------------------------------------------------------

type IdKey = (usize, String);

/// Keeps an index from ID values to elements.
///
/// The index is rebuilt from the document on a miss and every hit is checked
/// against the tree, so it never has to be told about mutations. A rebuild
/// keeps the first element in document order for a repeated ID. After that
/// the indexed element keeps winning until it loses the ID or leaves the
/// document, even if a duplicate is later inserted before it.
#[derive(Debug)]
pub struct IndexedContentFactory {
    names: Rc<NameCache>,
    index: RefCell<AHashMap<IdKey, Weak<RefCell<XmlElement>>>>,
}

impl Default for IndexedContentFactory {
    fn default() -> Self {
        IndexedContentFactory::new(NameCache::default_instance())
    }
}

impl ContentFactory for IndexedContentFactory {
    fn names(&self) -> &Rc<NameCache> {
        &self.names
    }

    fn element_by_id(&self, document: &XmlDocument, id: &str) -> Option<XmlNode<XmlElement>> {
        let key = (document.ptr() as usize, id.to_string());

        let cached = self.index.borrow().get(&key).and_then(Weak::upgrade);
        if let Some(element) = cached {
            if IndexedContentFactory::is_valid(&element, document, id) {
                return Some(element);
            }
        }

        self.rebuild(document);
        self.index
            .borrow()
            .get(&key)
            .and_then(Weak::upgrade)
    }
}

impl IndexedContentFactory {
    pub fn new(names: Rc<NameCache>) -> Self {
        IndexedContentFactory {
            names,
            index: RefCell::new(AHashMap::new()),
        }
    }

    pub fn indexed_count(&self) -> usize {
        self.index.borrow().len()
    }

    fn is_valid(element: &XmlNode<XmlElement>, document: &XmlDocument, id: &str) -> bool {
        let e = element.borrow();
        e.id().as_deref() == Some(id)
            && e
                .document()
                .map(|v| Rc::as_ptr(&v) == document.ptr())
                .unwrap_or_default()
    }

    fn rebuild(&self, document: &XmlDocument) {
        let ptr = document.ptr() as usize;

        let mut index = self.index.borrow_mut();
        index.retain(|(doc, _), v| *doc != ptr && v.strong_count() > 0);

        for element in document.content().descendants() {
            if let Some(id) = element.borrow().id() {
                index
                    .entry((ptr, id))
                    .or_insert_with(|| Rc::downgrade(&element));
            }
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// Cloneable handle to a [`ContentFactory`].
///
/// Every element and document keeps the handle it was created with and uses
/// it for the nodes it creates on behalf of the caller.
#[derive(Clone)]
pub struct DocumentFactory {
    inner: Rc<dyn ContentFactory>,
}

impl Default for DocumentFactory {
    fn default() -> Self {
        DocumentFactory::new()
    }
}

impl fmt::Debug for DocumentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("DocumentFactory")
            .field("names", self.inner.names())
            .finish()
    }
}

impl DocumentFactory {
    /// Plain factory on the per-thread name cache.
    pub fn new() -> Self {
        DocumentFactory::from_factory(DefaultContentFactory::default())
    }

    /// Plain factory on its own name cache.
    pub fn with_names(names: Rc<NameCache>) -> Self {
        DocumentFactory::from_factory(DefaultContentFactory::new(names))
    }

    /// Factory whose documents answer ID lookups from an index.
    pub fn indexed() -> Self {
        DocumentFactory::from_factory(IndexedContentFactory::default())
    }

    pub fn from_factory<T: ContentFactory + 'static>(factory: T) -> Self {
        DocumentFactory {
            inner: Rc::new(factory),
        }
    }

    pub fn names(&self) -> &Rc<NameCache> {
        self.inner.names()
    }

    pub fn ptr_eq(&self, other: &DocumentFactory) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------------------------

    pub fn create_document(&self) -> XmlNode<XmlDocument> {
        self.inner.create_document(self)
    }

    /// Element without a namespace; a prefixed name is rejected.
    pub fn create_element(&self, qualified_name: &str) -> error::Result<XmlNode<XmlElement>> {
        self.create_element_ns(qualified_name, "")
    }

    pub fn create_element_ns(
        &self,
        qualified_name: &str,
        uri: &str,
    ) -> error::Result<XmlNode<XmlElement>> {
        let qname = self.qname(qualified_name, uri)?;
        Ok(self.create_element_qname(qname))
    }

    pub fn create_element_qname(&self, qname: QName) -> XmlNode<XmlElement> {
        self.inner.create_element(self, qname)
    }

    pub fn create_attribute(
        &self,
        qualified_name: &str,
        value: &str,
    ) -> error::Result<XmlNode<XmlAttribute>> {
        let qname = self.qname(qualified_name, "")?;
        Ok(self.create_attribute_qname(qname, value))
    }

    pub fn create_attribute_qname(&self, qname: QName, value: &str) -> XmlNode<XmlAttribute> {
        self.inner.create_attribute(qname, value)
    }

    pub fn create_text(&self, text: &str) -> XmlNode<XmlText> {
        self.inner.create_text(text)
    }

    pub fn create_cdata(&self, text: &str) -> XmlNode<XmlCData> {
        self.inner.create_cdata(text)
    }

    pub fn create_comment(&self, text: &str) -> XmlNode<XmlComment> {
        self.inner.create_comment(text)
    }

    pub fn create_entity(&self, name: &str, text: Option<&str>) -> XmlNode<XmlEntity> {
        self.inner.create_entity(name, text)
    }

    pub fn create_processing_instruction(
        &self,
        target: &str,
        text: &str,
    ) -> XmlNode<XmlProcessingInstruction> {
        self.inner.create_processing_instruction(target, text)
    }

    pub fn create_doc_type(
        &self,
        element_name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> XmlNode<XmlDocumentType> {
        self.inner
            .create_doc_type(element_name, public_id, system_id)
    }

    pub fn create_namespace(&self, prefix: &str, uri: &str) -> Namespace {
        self.inner.create_namespace(prefix, uri)
    }

    pub fn create_qname(&self, local_name: &str, namespace: &Namespace) -> QName {
        self.inner.create_qname(local_name, namespace)
    }

    /// Parses `qualified_name` and interns it in namespace `uri`.
    pub fn qname(&self, qualified_name: &str, uri: &str) -> error::Result<QName> {
        self.inner.names().qualified(qualified_name, uri)
    }

    pub fn element_by_id(&self, document: &XmlDocument, id: &str) -> Option<XmlNode<XmlElement>> {
        self.inner.element_by_id(document, id)
    }
}

// -----------------------------------------------------------------------------------------------

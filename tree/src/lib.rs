pub mod attribute;
pub mod branch;
pub mod builder;
pub mod content;
pub mod document;
pub mod element;
pub mod error;
pub mod factory;
pub mod list;
pub mod name;
pub mod node;
pub mod path;
pub mod stack;
pub mod visitor;

pub use branch::Branch;
pub use builder::TreeBuilder;
pub use content::Content;
pub use document::XmlDocument;
pub use element::XmlElement;
pub use factory::{ContentFactory, DefaultContentFactory, DocumentFactory, IndexedContentFactory};
pub use list::{AttributeList, BackedList, ContentList};
pub use name::{NameCache, Namespace, QName};
pub use node::{
    XmlAttribute, XmlCData, XmlComment, XmlDocumentType, XmlEntity, XmlProcessingInstruction,
    XmlText,
};
pub use stack::NamespaceStack;
pub use visitor::Visitor;

use node::Owner;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

// -----------------------------------------------------------------------------------------------

pub type XmlNode<T> = Rc<RefCell<T>>;

pub fn node<T>(value: T) -> XmlNode<T> {
    Rc::new(RefCell::new(value))
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Attribute,
    CData,
    Comment,
    Document,
    DocumentType,
    Element,
    Entity,
    Namespace,
    ProcessingInstruction,
    Text,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Attribute => "attribute",
            NodeType::CData => "CDATA",
            NodeType::Comment => "comment",
            NodeType::Document => "document",
            NodeType::DocumentType => "document type",
            NodeType::Element => "element",
            NodeType::Entity => "entity",
            NodeType::Namespace => "namespace",
            NodeType::ProcessingInstruction => "processing instruction",
            NodeType::Text => "text",
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// Capabilities shared by every node kind.
///
/// `Display` writes the XML fragment of the node. Nodes that do not support
/// the parent relationship are flyweights: they can sit in several trees at
/// once and refuse mutation.
pub trait Node: fmt::Display {
    fn node_type(&self) -> NodeType;

    fn name(&self) -> Option<&str> {
        None
    }

    fn text(&self) -> Cow<'_, str>;

    fn string_value(&self) -> Cow<'_, str> {
        self.text()
    }

    fn as_xml(&self) -> String {
        self.to_string()
    }

    fn supports_parent(&self) -> bool;

    fn is_read_only(&self) -> bool {
        !self.supports_parent()
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>>;

    fn document(&self) -> Option<XmlNode<XmlDocument>>;
}

impl Node for Namespace {
    fn node_type(&self) -> NodeType {
        NodeType::Namespace
    }

    fn name(&self) -> Option<&str> {
        Some(self.prefix())
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.uri())
    }

    fn supports_parent(&self) -> bool {
        false
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>> {
        None
    }

    fn document(&self) -> Option<XmlNode<XmlDocument>> {
        None
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub enum XmlItem {
    Attribute(XmlNode<XmlAttribute>),
    CData(XmlNode<XmlCData>),
    Comment(XmlNode<XmlComment>),
    Document(XmlNode<XmlDocument>),
    DocumentType(XmlNode<XmlDocumentType>),
    Element(XmlNode<XmlElement>),
    Entity(XmlNode<XmlEntity>),
    Namespace(Namespace),
    PI(XmlNode<XmlProcessingInstruction>),
    Text(XmlNode<XmlText>),
}

impl PartialEq for XmlItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (XmlItem::Attribute(l), XmlItem::Attribute(r)) => l == r,
            (XmlItem::CData(l), XmlItem::CData(r)) => l == r,
            (XmlItem::Comment(l), XmlItem::Comment(r)) => l == r,
            (XmlItem::Document(l), XmlItem::Document(r)) => l == r,
            (XmlItem::DocumentType(l), XmlItem::DocumentType(r)) => l == r,
            (XmlItem::Element(l), XmlItem::Element(r)) => l == r,
            (XmlItem::Entity(l), XmlItem::Entity(r)) => l == r,
            (XmlItem::Namespace(l), XmlItem::Namespace(r)) => l == r,
            (XmlItem::PI(l), XmlItem::PI(r)) => l == r,
            (XmlItem::Text(l), XmlItem::Text(r)) => l == r,
            _ => false,
        }
    }
}

impl fmt::Display for XmlItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            XmlItem::Attribute(v) => write!(f, "{}", v.borrow()),
            XmlItem::CData(v) => write!(f, "{}", v.borrow()),
            XmlItem::Comment(v) => write!(f, "{}", v.borrow()),
            XmlItem::Document(v) => write!(f, "{}", v.borrow()),
            XmlItem::DocumentType(v) => write!(f, "{}", v.borrow()),
            XmlItem::Element(v) => write!(f, "{}", v.borrow()),
            XmlItem::Entity(v) => write!(f, "{}", v.borrow()),
            XmlItem::Namespace(v) => write!(f, "{}", v),
            XmlItem::PI(v) => write!(f, "{}", v.borrow()),
            XmlItem::Text(v) => write!(f, "{}", v.borrow()),
        }
    }
}

impl From<XmlNode<XmlAttribute>> for XmlItem {
    fn from(value: XmlNode<XmlAttribute>) -> Self {
        XmlItem::Attribute(value)
    }
}

impl From<XmlNode<XmlCData>> for XmlItem {
    fn from(value: XmlNode<XmlCData>) -> Self {
        XmlItem::CData(value)
    }
}

impl From<XmlNode<XmlComment>> for XmlItem {
    fn from(value: XmlNode<XmlComment>) -> Self {
        XmlItem::Comment(value)
    }
}

impl From<XmlNode<XmlDocument>> for XmlItem {
    fn from(value: XmlNode<XmlDocument>) -> Self {
        XmlItem::Document(value)
    }
}

impl From<XmlNode<XmlDocumentType>> for XmlItem {
    fn from(value: XmlNode<XmlDocumentType>) -> Self {
        XmlItem::DocumentType(value)
    }
}

impl From<XmlNode<XmlElement>> for XmlItem {
    fn from(value: XmlNode<XmlElement>) -> Self {
        XmlItem::Element(value)
    }
}

impl From<XmlNode<XmlEntity>> for XmlItem {
    fn from(value: XmlNode<XmlEntity>) -> Self {
        XmlItem::Entity(value)
    }
}

impl From<Namespace> for XmlItem {
    fn from(value: Namespace) -> Self {
        XmlItem::Namespace(value)
    }
}

impl From<XmlNode<XmlProcessingInstruction>> for XmlItem {
    fn from(value: XmlNode<XmlProcessingInstruction>) -> Self {
        XmlItem::PI(value)
    }
}

impl From<XmlNode<XmlText>> for XmlItem {
    fn from(value: XmlNode<XmlText>) -> Self {
        XmlItem::Text(value)
    }
}

impl XmlItem {
    pub fn node_type(&self) -> NodeType {
        match self {
            XmlItem::Attribute(_) => NodeType::Attribute,
            XmlItem::CData(_) => NodeType::CData,
            XmlItem::Comment(_) => NodeType::Comment,
            XmlItem::Document(_) => NodeType::Document,
            XmlItem::DocumentType(_) => NodeType::DocumentType,
            XmlItem::Element(_) => NodeType::Element,
            XmlItem::Entity(_) => NodeType::Entity,
            XmlItem::Namespace(_) => NodeType::Namespace,
            XmlItem::PI(_) => NodeType::ProcessingInstruction,
            XmlItem::Text(_) => NodeType::Text,
        }
    }

    pub fn name(&self) -> Option<String> {
        match self {
            XmlItem::Attribute(v) => Node::name(&*v.borrow()).map(|v| v.to_string()),
            XmlItem::CData(v) => Node::name(&*v.borrow()).map(|v| v.to_string()),
            XmlItem::Comment(v) => Node::name(&*v.borrow()).map(|v| v.to_string()),
            XmlItem::Document(v) => Node::name(&*v.borrow()).map(|v| v.to_string()),
            XmlItem::DocumentType(v) => Node::name(&*v.borrow()).map(|v| v.to_string()),
            XmlItem::Element(v) => Node::name(&*v.borrow()).map(|v| v.to_string()),
            XmlItem::Entity(v) => Node::name(&*v.borrow()).map(|v| v.to_string()),
            XmlItem::Namespace(v) => Node::name(v).map(|v| v.to_string()),
            XmlItem::PI(v) => Node::name(&*v.borrow()).map(|v| v.to_string()),
            XmlItem::Text(v) => Node::name(&*v.borrow()).map(|v| v.to_string()),
        }
    }

    pub fn text(&self) -> String {
        match self {
            XmlItem::Attribute(v) => Node::text(&*v.borrow()).into_owned(),
            XmlItem::CData(v) => Node::text(&*v.borrow()).into_owned(),
            XmlItem::Comment(v) => Node::text(&*v.borrow()).into_owned(),
            XmlItem::Document(v) => Node::text(&*v.borrow()).into_owned(),
            XmlItem::DocumentType(v) => Node::text(&*v.borrow()).into_owned(),
            XmlItem::Element(v) => Node::text(&*v.borrow()).into_owned(),
            XmlItem::Entity(v) => Node::text(&*v.borrow()).into_owned(),
            XmlItem::Namespace(v) => Node::text(v).into_owned(),
            XmlItem::PI(v) => Node::text(&*v.borrow()).into_owned(),
            XmlItem::Text(v) => Node::text(&*v.borrow()).into_owned(),
        }
    }

    pub fn string_value(&self) -> String {
        match self {
            XmlItem::Document(v) => v.borrow().string_value().into_owned(),
            XmlItem::Element(v) => v.borrow().string_value().into_owned(),
            _ => self.text(),
        }
    }

    pub fn as_xml(&self) -> String {
        self.to_string()
    }

    pub fn supports_parent(&self) -> bool {
        match self {
            XmlItem::Attribute(v) => v.borrow().supports_parent(),
            XmlItem::CData(v) => v.borrow().supports_parent(),
            XmlItem::Comment(v) => v.borrow().supports_parent(),
            XmlItem::Document(v) => v.borrow().supports_parent(),
            XmlItem::DocumentType(v) => v.borrow().supports_parent(),
            XmlItem::Element(v) => v.borrow().supports_parent(),
            XmlItem::Entity(v) => v.borrow().supports_parent(),
            XmlItem::Namespace(v) => v.supports_parent(),
            XmlItem::PI(v) => v.borrow().supports_parent(),
            XmlItem::Text(v) => v.borrow().supports_parent(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        match self {
            XmlItem::Document(_) | XmlItem::Element(_) => false,
            _ => !self.supports_parent(),
        }
    }

    /// Whether the node is currently linked into an element or a document.
    pub fn has_parent(&self) -> bool {
        self.owner().is_linked()
    }

    pub fn parent(&self) -> Option<XmlNode<XmlElement>> {
        self.owner().parent()
    }

    /// The element or document holding this node.
    pub fn parent_item(&self) -> Option<XmlItem> {
        match self.owner() {
            Owner::Element(v) => v.upgrade().map(XmlItem::Element),
            Owner::Document(v) => v.upgrade().map(XmlItem::Document),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<XmlNode<XmlDocument>> {
        match self {
            XmlItem::Document(v) => Some(v.clone()),
            _ => self.owner().document(),
        }
    }

    pub fn as_element(&self) -> Option<XmlNode<XmlElement>> {
        match self {
            XmlItem::Element(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<XmlNode<XmlAttribute>> {
        match self {
            XmlItem::Attribute(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Identity comparison; namespaces compare by value.
    pub fn ptr_eq(&self, other: &XmlItem) -> bool {
        match (self, other) {
            (XmlItem::Attribute(l), XmlItem::Attribute(r)) => Rc::ptr_eq(l, r),
            (XmlItem::CData(l), XmlItem::CData(r)) => Rc::ptr_eq(l, r),
            (XmlItem::Comment(l), XmlItem::Comment(r)) => Rc::ptr_eq(l, r),
            (XmlItem::Document(l), XmlItem::Document(r)) => Rc::ptr_eq(l, r),
            (XmlItem::DocumentType(l), XmlItem::DocumentType(r)) => Rc::ptr_eq(l, r),
            (XmlItem::Element(l), XmlItem::Element(r)) => Rc::ptr_eq(l, r),
            (XmlItem::Entity(l), XmlItem::Entity(r)) => Rc::ptr_eq(l, r),
            (XmlItem::Namespace(l), XmlItem::Namespace(r)) => l.ptr_eq(r) || l == r,
            (XmlItem::PI(l), XmlItem::PI(r)) => Rc::ptr_eq(l, r),
            (XmlItem::Text(l), XmlItem::Text(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }

    /// Removes the node from its element or document. The node itself is
    /// left intact and can be added somewhere else.
    pub fn detach(&self) -> bool {
        match self.owner() {
            Owner::Element(v) => match v.upgrade() {
                Some(parent) => parent.borrow_mut().remove(self),
                None => {
                    self.set_owner(Owner::Detached);
                    false
                }
            },
            Owner::Document(v) => match v.upgrade() {
                Some(document) => document.borrow_mut().remove(self),
                None => {
                    self.set_owner(Owner::Detached);
                    false
                }
            },
            _ => false,
        }
    }

    /// Detached deep copy. Flyweights are shared, linked nodes are rebuilt
    /// through `factory`.
    pub fn deep_copy(&self, factory: &DocumentFactory) -> XmlItem {
        if self.is_read_only() {
            return self.clone();
        }

        match self {
            XmlItem::Attribute(v) => {
                let v = v.borrow();
                XmlItem::Attribute(factory.create_attribute_qname(v.qname().clone(), v.value()))
            }
            XmlItem::CData(v) => XmlItem::CData(factory.create_cdata(v.borrow().text())),
            XmlItem::Comment(v) => XmlItem::Comment(factory.create_comment(v.borrow().text())),
            XmlItem::Document(v) => XmlItem::Document(v.borrow().create_copy()),
            XmlItem::DocumentType(v) => XmlItem::DocumentType(node(v.borrow().detached_copy())),
            XmlItem::Element(v) => XmlItem::Element(v.borrow().create_copy()),
            XmlItem::Entity(v) => {
                let v = v.borrow();
                XmlItem::Entity(factory.create_entity(v.name(), v.text()))
            }
            XmlItem::Namespace(v) => XmlItem::Namespace(v.clone()),
            XmlItem::PI(v) => {
                let v = v.borrow();
                XmlItem::PI(factory.create_processing_instruction(v.target(), v.text()))
            }
            XmlItem::Text(v) => XmlItem::Text(factory.create_text(v.borrow().text())),
        }
    }

    /// XPath-like location of the node, e.g. `/root/item/@id`.
    pub fn path(&self) -> String {
        match self {
            XmlItem::Document(_) => "/".to_string(),
            XmlItem::Element(v) => v.borrow().path(),
            _ => self.leaf_path(|e| e.borrow().path()),
        }
    }

    /// Like [`XmlItem::path`] with sibling positions for repeated names.
    pub fn unique_path(&self) -> String {
        match self {
            XmlItem::Document(_) => "/".to_string(),
            XmlItem::Element(v) => v.borrow().unique_path(),
            _ => self.leaf_path(|e| e.borrow().unique_path()),
        }
    }

    fn leaf_path(&self, parent_path: impl Fn(&XmlNode<XmlElement>) -> String) -> String {
        let step = match self {
            XmlItem::Attribute(v) => format!("@{}", v.borrow().qualified_name()),
            XmlItem::CData(_) | XmlItem::Text(_) => "text()".to_string(),
            XmlItem::Comment(_) => "comment()".to_string(),
            XmlItem::Namespace(v) => format!("namespace::{}", v.prefix()),
            XmlItem::PI(_) => "processing-instruction()".to_string(),
            _ => String::new(),
        };

        match self.parent() {
            Some(parent) => format!("{}/{}", parent_path(&parent), step),
            None => step,
        }
    }

    pub(crate) fn owner(&self) -> Owner {
        match self {
            XmlItem::Attribute(v) => v.borrow().owner().clone(),
            XmlItem::CData(v) => v.borrow().owner().clone(),
            XmlItem::Comment(v) => v.borrow().owner().clone(),
            XmlItem::Document(_) => Owner::Detached,
            XmlItem::DocumentType(v) => v.borrow().owner().clone(),
            XmlItem::Element(v) => v.borrow().owner().clone(),
            XmlItem::Entity(v) => v.borrow().owner().clone(),
            XmlItem::Namespace(_) => Owner::Shared,
            XmlItem::PI(v) => v.borrow().owner().clone(),
            XmlItem::Text(v) => v.borrow().owner().clone(),
        }
    }

    /// No-op for flyweights.
    pub(crate) fn set_owner(&self, owner: Owner) {
        match self {
            XmlItem::Attribute(v) => v.borrow_mut().set_owner(owner),
            XmlItem::CData(v) => v.borrow_mut().set_owner(owner),
            XmlItem::Comment(v) => v.borrow_mut().set_owner(owner),
            XmlItem::Document(_) => {}
            XmlItem::DocumentType(v) => v.borrow_mut().set_owner(owner),
            XmlItem::Element(v) => v.borrow_mut().set_owner(owner),
            XmlItem::Entity(v) => v.borrow_mut().set_owner(owner),
            XmlItem::Namespace(_) => {}
            XmlItem::PI(v) => v.borrow_mut().set_owner(owner),
            XmlItem::Text(v) => v.borrow_mut().set_owner(owner),
        }
    }

    pub(crate) fn release(&self) {
        self.set_owner(Owner::Detached);
    }

    /// Short description used in error messages.
    pub(crate) fn describe(&self) -> String {
        let node_type = self.node_type().as_str();
        match self {
            XmlItem::Document(_) => node_type.to_string(),
            XmlItem::Attribute(_)
            | XmlItem::DocumentType(_)
            | XmlItem::Element(_)
            | XmlItem::Entity(_)
            | XmlItem::Namespace(_)
            | XmlItem::PI(_) => {
                format!("{} '{}'", node_type, self.name().unwrap_or_default())
            }
            _ => format!("{} '{}'", node_type, self.text()),
        }
    }
}

// -----------------------------------------------------------------------------------------------

pub(crate) fn escape_text(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

pub(crate) fn escape_attribute(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '"']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Trims both ends and collapses inner whitespace runs to one space.
pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<&str>>().join(" ")
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert!(matches!(escape_text("abc"), Cow::Borrowed("abc")));
        assert_eq!("a &lt;b&gt; &amp; \"c\"", escape_text("a <b> & \"c\""));
        assert_eq!("a &lt;b> &amp; &quot;c&quot;", escape_attribute("a <b> & \"c\""));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!("a b c", collapse_whitespace("  a \n\t b   c "));
        assert_eq!("", collapse_whitespace(" \n "));
    }

    #[test]
    fn test_item_identity_and_equality() {
        let factory = DocumentFactory::new();
        let a = XmlItem::from(factory.create_text("a"));
        let b = XmlItem::from(factory.create_text("a"));

        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
        assert_ne!(a, XmlItem::from(factory.create_comment("a")));

        let ns1 = XmlItem::from(Namespace::new("x", "urn:x"));
        let ns2 = XmlItem::from(Namespace::new("x", "urn:x"));
        assert!(ns1.ptr_eq(&ns2));
    }

    #[test]
    fn test_item_describe() {
        let factory = DocumentFactory::new();
        let element = XmlItem::from(factory.create_element("root").unwrap());
        assert_eq!("element 'root'", element.describe());

        let text = XmlItem::from(factory.create_text("abc"));
        assert_eq!("text 'abc'", text.describe());

        let document = XmlItem::from(factory.create_document());
        assert_eq!("document", document.describe());
    }

    #[test]
    fn test_item_detach() {
        let factory = DocumentFactory::new();
        let root = factory.create_element("root").unwrap();
        let child = root.borrow_mut().add_element("child").unwrap();
        let text = root.borrow_mut().add_text("abc").unwrap();

        let item = XmlItem::from(child.clone());
        assert!(item.has_parent());
        assert!(item.detach());
        assert!(!item.has_parent());
        assert!(!item.detach());
        assert!(child.borrow().parent().is_none());

        assert!(XmlItem::from(text.clone()).detach());
        assert_eq!(0, root.borrow().node_count());
        assert_eq!("abc", text.borrow().text());
    }

    #[test]
    fn test_item_path() {
        let factory = DocumentFactory::new();
        let document = factory.create_document();
        let root = document.borrow_mut().add_element("root").unwrap();
        let a1 = root.borrow_mut().add_element("a").unwrap();
        let a2 = root.borrow_mut().add_element("a").unwrap();
        let attr = a2.borrow_mut().add_attribute("id", "2").unwrap();
        let text = a1.borrow_mut().add_text("x").unwrap();

        assert_eq!("/", XmlItem::from(document).path());
        assert_eq!("/root/a", XmlItem::from(a1.clone()).path());
        assert_eq!("/root/a[2]", XmlItem::from(a2).unique_path());
        assert_eq!("/root/a/@id", XmlItem::from(attr).path());
        assert_eq!("/root/a[1]/text()", XmlItem::from(text).unique_path());
        assert_eq!("comment()", XmlItem::from(factory.create_comment("c")).path());
    }
}

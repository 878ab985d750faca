use crate::document::XmlDocument;
use crate::element::XmlElement;
use crate::error;
use crate::list::{AttributeList, BackedList, ContentList};
use crate::name::QName;
use crate::{XmlItem, XmlNode};
use std::rc::Rc;

// -----------------------------------------------------------------------------------------------

/// A node that owns content: an element or a document.
#[derive(Clone, Debug)]
pub enum Branch {
    Document(XmlNode<XmlDocument>),
    Element(XmlNode<XmlElement>),
}

impl From<XmlNode<XmlDocument>> for Branch {
    fn from(value: XmlNode<XmlDocument>) -> Self {
        Branch::Document(value)
    }
}

impl From<XmlNode<XmlElement>> for Branch {
    fn from(value: XmlNode<XmlElement>) -> Self {
        Branch::Element(value)
    }
}

impl Branch {
    pub fn from_item(item: &XmlItem) -> Option<Self> {
        match item {
            XmlItem::Document(v) => Some(Branch::Document(v.clone())),
            XmlItem::Element(v) => Some(Branch::Element(v.clone())),
            _ => None,
        }
    }

    pub fn as_item(&self) -> XmlItem {
        match self {
            Branch::Document(v) => XmlItem::Document(v.clone()),
            Branch::Element(v) => XmlItem::Element(v.clone()),
        }
    }

    pub fn ptr_eq(&self, other: &Branch) -> bool {
        match (self, other) {
            (Branch::Document(l), Branch::Document(r)) => Rc::ptr_eq(l, r),
            (Branch::Element(l), Branch::Element(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }

    // -------------------------------------------------------------------------------------------

    pub fn nodes(&self) -> Vec<XmlItem> {
        match self {
            Branch::Document(v) => v.borrow().nodes(),
            Branch::Element(v) => v.borrow().nodes(),
        }
    }

    pub fn node(&self, index: usize) -> Option<XmlItem> {
        match self {
            Branch::Document(v) => v.borrow().node(index),
            Branch::Element(v) => v.borrow().node(index),
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            Branch::Document(v) => v.borrow().node_count(),
            Branch::Element(v) => v.borrow().node_count(),
        }
    }

    pub fn index_of(&self, item: &XmlItem) -> Option<usize> {
        match self {
            Branch::Document(v) => v.borrow().index_of(item),
            Branch::Element(v) => v.borrow().index_of(item),
        }
    }

    pub fn add(&self, item: XmlItem) -> error::Result<()> {
        match self {
            Branch::Document(v) => v.borrow_mut().add(item),
            Branch::Element(v) => v.borrow_mut().add(item),
        }
    }

    pub fn insert(&self, index: usize, item: XmlItem) -> error::Result<()> {
        match self {
            Branch::Document(v) => v.borrow_mut().insert(index, item),
            Branch::Element(v) => v.borrow_mut().insert(index, item),
        }
    }

    pub fn remove(&self, item: &XmlItem) -> bool {
        match self {
            Branch::Document(v) => v.borrow_mut().remove(item),
            Branch::Element(v) => v.borrow_mut().remove(item),
        }
    }

    pub fn remove_at(&self, index: usize) -> error::Result<XmlItem> {
        match self {
            Branch::Document(v) => v.borrow_mut().remove_at(index),
            Branch::Element(v) => v.borrow_mut().remove_at(index),
        }
    }

    pub fn set_node(&self, index: usize, item: XmlItem) -> error::Result<XmlItem> {
        match self {
            Branch::Document(v) => v.borrow_mut().set_node(index, item),
            Branch::Element(v) => v.borrow_mut().set_node(index, item),
        }
    }

    pub fn clear_content(&self) {
        match self {
            Branch::Document(v) => v.borrow_mut().clear_content(),
            Branch::Element(v) => v.borrow_mut().clear_content(),
        }
    }

    pub fn text(&self) -> String {
        self.as_item().text()
    }

    // -------------------------------------------------------------------------------------------

    /// Live view of the whole content.
    pub fn content(&self) -> ContentList {
        ContentList::new(self.clone())
    }

    /// Live view of the attributes; documents have none.
    pub fn attributes(&self) -> Option<AttributeList> {
        match self {
            Branch::Document(_) => None,
            Branch::Element(v) => Some(AttributeList::new(v.clone())),
        }
    }

    /// Child elements. Changes made through the list go to the branch.
    pub fn elements(&self) -> BackedList<XmlNode<XmlElement>> {
        let elements = match self {
            Branch::Document(v) => v.borrow().content().elements(),
            Branch::Element(v) => v.borrow().elements(),
        };
        BackedList::new(self.clone(), elements)
    }

    /// Child elements named `name`, resolved in the branch's scope.
    pub fn elements_named(&self, name: &str) -> BackedList<XmlNode<XmlElement>> {
        let elements = match self {
            Branch::Document(v) => {
                let document = v.borrow();
                match document.factory().qname(name, "") {
                    Ok(qname) => document.content().elements_qname(&qname),
                    Err(_) => vec![],
                }
            }
            Branch::Element(v) => v.borrow().elements_named(name),
        };
        BackedList::new(self.clone(), elements)
    }

    pub fn elements_qname(&self, qname: &QName) -> BackedList<XmlNode<XmlElement>> {
        let elements = match self {
            Branch::Document(v) => v.borrow().content().elements_qname(qname),
            Branch::Element(v) => v.borrow().elements_qname(qname),
        };
        BackedList::new(self.clone(), elements)
    }

    // -------------------------------------------------------------------------------------------

    pub fn select_nodes(&self, expr: &str) -> error::Result<Vec<XmlItem>> {
        self.as_item().select_nodes(expr)
    }

    pub fn select_single_node(&self, expr: &str) -> error::Result<Option<XmlItem>> {
        self.as_item().select_single_node(expr)
    }

    pub fn value_of(&self, expr: &str) -> error::Result<String> {
        self.as_item().value_of(expr)
    }
}

// -----------------------------------------------------------------------------------------------

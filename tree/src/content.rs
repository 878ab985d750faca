use crate::element::XmlElement;
use crate::error;
use crate::factory::DocumentFactory;
use crate::name::{Namespace, QName};
use crate::node::XmlText;
use crate::{escape_text, node, NodeType, XmlItem, XmlNode};
use std::borrow::Cow;
use std::fmt;

// -----------------------------------------------------------------------------------------------

/// One entry of a branch's content. Character data that was never asked
/// for as a node is kept as a bare string.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Text(String),
    Node(XmlItem),
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Content::Text(v) => write!(f, "{}", escape_text(v)),
            Content::Node(v) => write!(f, "{}", v),
        }
    }
}

impl From<XmlItem> for Content {
    fn from(value: XmlItem) -> Self {
        Content::Node(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl Content {
    pub fn node_type(&self) -> NodeType {
        match self {
            Content::Text(_) => NodeType::Text,
            Content::Node(v) => v.node_type(),
        }
    }

    /// Node view of the entry. Bare text is wrapped in a read-only text node.
    pub fn to_item(&self) -> XmlItem {
        match self {
            Content::Text(v) => XmlItem::Text(node(XmlText::shared(v))),
            Content::Node(v) => v.clone(),
        }
    }

    pub fn is_character_data(&self) -> bool {
        matches!(
            self.node_type(),
            NodeType::Text | NodeType::CData
        )
    }

    pub(crate) fn as_element(&self) -> Option<&XmlNode<XmlElement>> {
        match self {
            Content::Node(XmlItem::Element(v)) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Content::Node(XmlItem::Namespace(v)) => Some(v),
            _ => None,
        }
    }

    fn is_same(&self, item: &XmlItem) -> bool {
        matches!(self, Content::Node(v) if v.ptr_eq(item))
    }

    fn is_equal(&self, item: &XmlItem) -> bool {
        match (self, item) {
            (Content::Text(l), XmlItem::Text(r)) => r.borrow().text() == l,
            (Content::Node(l), r) => l == r,
            _ => false,
        }
    }

    fn character_data(&self) -> Option<Cow<'_, str>> {
        match self {
            Content::Text(v) => Some(Cow::Borrowed(v.as_str())),
            Content::Node(XmlItem::Text(v)) => Some(Cow::Owned(v.borrow().text().to_string())),
            Content::Node(XmlItem::CData(v)) => Some(Cow::Owned(v.borrow().text().to_string())),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// Ordered children of an element or a document.
///
/// The model only stores entries. Linking children to their parent is the
/// job of the branch that owns the model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentModel {
    entries: Vec<Content>,
}

impl fmt::Display for ContentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        for entry in self.entries.iter().filter(|v| v.as_namespace().is_none()) {
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

impl ContentModel {
    pub fn new() -> Self {
        ContentModel::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw view. Bare text stays bare.
    pub fn entries(&self) -> &[Content] {
        self.entries.as_slice()
    }

    pub fn get(&self, index: usize) -> Option<XmlItem> {
        self.entries.get(index).map(Content::to_item)
    }

    /// Node view. Bare text is materialized as read-only text nodes.
    pub fn nodes(&self) -> Vec<XmlItem> {
        self.entries.iter().map(Content::to_item).collect()
    }

    pub fn add(&mut self, content: Content) {
        self.entries.push(content);
    }

    pub fn insert(&mut self, index: usize, content: Content) -> error::Result<()> {
        if index > self.entries.len() {
            return Err(error::Error::OutOfIndex(index));
        }

        self.entries.insert(index, content);
        Ok(())
    }

    pub fn set(&mut self, index: usize, content: Content) -> error::Result<Content> {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(error::Error::OutOfIndex(index))?;
        Ok(std::mem::replace(entry, content))
    }

    pub fn remove_at(&mut self, index: usize) -> error::Result<Content> {
        if index >= self.entries.len() {
            return Err(error::Error::OutOfIndex(index));
        }

        Ok(self.entries.remove(index))
    }

    /// Position of `item`, by identity first. Read-only nodes have no
    /// identity worth keeping, so they also match equal entries.
    pub fn index_of(&self, item: &XmlItem) -> Option<usize> {
        if let Some(index) = self.entries.iter().position(|v| v.is_same(item)) {
            return Some(index);
        }

        if item.is_read_only() {
            self.entries.iter().position(|v| v.is_equal(item))
        } else {
            None
        }
    }

    pub fn remove_node(&mut self, item: &XmlItem) -> Option<Content> {
        let index = self.index_of(item)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) -> Vec<Content> {
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn retain_entries(&mut self, f: impl FnMut(&Content) -> bool) {
        self.entries.retain(f);
    }

    // -------------------------------------------------------------------------------------------

    pub fn elements(&self) -> Vec<XmlNode<XmlElement>> {
        self.entries
            .iter()
            .filter_map(Content::as_element)
            .cloned()
            .collect()
    }

    pub fn elements_named(&self, local_name: &str, uri: &str) -> Vec<XmlNode<XmlElement>> {
        self.entries
            .iter()
            .filter_map(Content::as_element)
            .filter(|v| v.borrow().qname().matches(local_name, uri))
            .cloned()
            .collect()
    }

    pub fn elements_qname(&self, qname: &QName) -> Vec<XmlNode<XmlElement>> {
        self.elements_named(qname.local_name(), qname.namespace_uri())
    }

    pub fn element(&self, local_name: &str, uri: &str) -> Option<XmlNode<XmlElement>> {
        self.entries
            .iter()
            .filter_map(Content::as_element)
            .find(|v| v.borrow().qname().matches(local_name, uri))
            .cloned()
    }

    /// Every element below this content in document order.
    pub fn descendants(&self) -> Vec<XmlNode<XmlElement>> {
        let mut descendants = vec![];
        for element in self.entries.iter().filter_map(Content::as_element) {
            descendants.push(element.clone());
            descendants.extend(element.borrow().content().descendants());
        }
        descendants
    }

    /// First element in document order whose `ID` or `id` attribute is
    /// `id`. Linear scan.
    pub fn element_by_id(&self, id: &str) -> Option<XmlNode<XmlElement>> {
        for element in self.entries.iter().filter_map(Content::as_element) {
            if element.borrow().id().as_deref() == Some(id) {
                return Some(element.clone());
            }

            if let Some(found) = element.borrow().content().element_by_id(id) {
                return Some(found);
            }
        }

        None
    }

    // -------------------------------------------------------------------------------------------

    pub fn namespaces(&self) -> Vec<Namespace> {
        self.entries
            .iter()
            .filter_map(Content::as_namespace)
            .cloned()
            .collect()
    }

    /// Looks at this content's own declarations only.
    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<Namespace> {
        self.entries
            .iter()
            .filter_map(Content::as_namespace)
            .find(|v| v.prefix() == prefix)
            .cloned()
    }

    /// Looks at this content's own declarations only.
    pub fn namespace_for_uri(&self, uri: &str) -> Option<Namespace> {
        self.entries
            .iter()
            .filter_map(Content::as_namespace)
            .find(|v| v.uri() == uri)
            .cloned()
    }

    // -------------------------------------------------------------------------------------------

    /// Concatenated bare text, text and CDATA children. A single text child
    /// stored as a bare string is returned without copying.
    pub fn text(&self) -> Cow<'_, str> {
        let mut texts = self.entries.iter().filter_map(Content::character_data);

        let Some(first) = texts.next() else {
            return Cow::Borrowed("");
        };

        match texts.next() {
            None => first,
            Some(second) => {
                let mut text = first.into_owned();
                text.push_str(&second);
                for rest in texts {
                    text.push_str(&rest);
                }
                Cow::Owned(text)
            }
        }
    }

    /// Deep character content, as in the XPath string value.
    pub fn string_value(&self) -> String {
        let mut value = String::new();
        for entry in self.entries.iter() {
            match entry {
                Content::Text(v) => value.push_str(v),
                Content::Node(XmlItem::Text(v)) => value.push_str(v.borrow().text()),
                Content::Node(XmlItem::CData(v)) => value.push_str(v.borrow().text()),
                Content::Node(XmlItem::Entity(v)) => {
                    value.push_str(v.borrow().text().unwrap_or_default())
                }
                Content::Node(XmlItem::Element(v)) => {
                    value.push_str(&v.borrow().content().string_value())
                }
                _ => {}
            }
        }
        value
    }

    /// More than one kind of node in the content.
    pub fn has_mixed_content(&self) -> bool {
        let mut kinds = self.entries.iter().map(Content::node_type);
        match kinds.next() {
            Some(first) => kinds.any(|v| v != first),
            None => false,
        }
    }

    /// Only character data and comments.
    pub fn is_text_only(&self) -> bool {
        self.entries.iter().all(|v| {
            matches!(
                v.node_type(),
                NodeType::Text | NodeType::CData | NodeType::Comment
            )
        })
    }

    /// Detached copies of every entry.
    pub fn deep_copy(&self, factory: &DocumentFactory) -> Vec<Content> {
        self.entries
            .iter()
            .map(|v| match v {
                Content::Text(v) => Content::Text(v.clone()),
                Content::Node(v) => Content::Node(v.deep_copy(factory)),
            })
            .collect()
    }
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn model(factory: &DocumentFactory) -> ContentModel {
        let mut content = ContentModel::new();
        content.add(Content::from("a"));
        content.add(Content::Node(XmlItem::Element(
            factory.create_element("child").unwrap(),
        )));
        content.add(Content::from("b"));
        content
    }

    #[test]
    fn test_raw_and_node_view() {
        let factory = DocumentFactory::new();
        let content = model(&factory);

        assert_eq!(3, content.len());
        assert_eq!(Content::Text("a".to_string()), content.entries()[0]);

        let nodes = content.nodes();
        assert_eq!(NodeType::Text, nodes[0].node_type());
        assert!(nodes[0].is_read_only());
        assert_eq!(NodeType::Element, nodes[1].node_type());
        assert!(content.get(3).is_none());
    }

    #[test]
    fn test_text() {
        let factory = DocumentFactory::new();
        let content = model(&factory);
        assert_eq!("ab", content.text());

        let mut single = ContentModel::new();
        single.add(Content::from("only"));
        assert!(matches!(single.text(), Cow::Borrowed("only")));

        let mut nodes = ContentModel::new();
        nodes.add(Content::Node(XmlItem::Text(factory.create_text("x"))));
        nodes.add(Content::Node(XmlItem::Comment(factory.create_comment("c"))));
        nodes.add(Content::Node(XmlItem::CData(factory.create_cdata("y"))));
        assert_eq!("xy", nodes.text());

        assert_eq!("", ContentModel::new().text());
    }

    #[test]
    fn test_mixed_content() {
        let factory = DocumentFactory::new();
        assert!(model(&factory).has_mixed_content());
        assert!(!ContentModel::new().has_mixed_content());

        let mut texts = ContentModel::new();
        texts.add(Content::from("a"));
        texts.add(Content::Node(XmlItem::Text(factory.create_text("b"))));
        assert!(!texts.has_mixed_content());
        assert!(texts.is_text_only());

        assert!(!model(&factory).is_text_only());
    }

    #[test]
    fn test_index_of() {
        let factory = DocumentFactory::new();
        let mut content = model(&factory);

        let child = content.get(1).unwrap();
        assert_eq!(Some(1), content.index_of(&child));

        let other = XmlItem::Element(factory.create_element("child").unwrap());
        assert_eq!(None, content.index_of(&other));

        let bare = content.get(2).unwrap();
        assert_eq!(Some(2), content.index_of(&bare));

        let removed = content.remove_node(&bare).unwrap();
        assert_eq!(Content::Text("b".to_string()), removed);
        assert_eq!(2, content.len());
    }

    #[test]
    fn test_insert_out_of_index() {
        let mut content = ContentModel::new();
        assert_eq!(
            Err(error::Error::OutOfIndex(1)),
            content.insert(1, Content::from("a"))
        );
        content.insert(0, Content::from("a")).unwrap();
        assert_eq!(Err(error::Error::OutOfIndex(1)), content.remove_at(1).map(|_| ()));
        assert_eq!(
            Err(error::Error::OutOfIndex(3)),
            content.set(3, Content::from("b")).map(|_| ())
        );
    }

    #[test]
    fn test_elements() {
        let factory = DocumentFactory::new();
        let mut content = model(&factory);
        content.add(Content::Node(XmlItem::Element(
            factory.create_element_ns("x:child", "urn:x").unwrap(),
        )));

        assert_eq!(2, content.elements().len());
        assert_eq!(1, content.elements_named("child", "").len());
        assert_eq!(1, content.elements_named("child", "urn:x").len());
        assert!(content.element("child", "urn:y").is_none());

        let qname = factory.create_qname("child", &Namespace::new("y", "urn:x"));
        assert_eq!(1, content.elements_qname(&qname).len());
    }

    #[test]
    fn test_namespaces() {
        let mut content = ContentModel::new();
        content.add(Content::Node(XmlItem::Namespace(Namespace::new("x", "urn:x"))));
        content.add(Content::Node(XmlItem::Namespace(Namespace::new("", "urn:d"))));

        assert_eq!(2, content.namespaces().len());
        assert_eq!(
            Some("urn:x"),
            content.namespace_for_prefix("x").as_ref().map(|v| v.uri())
        );
        assert_eq!(
            Some(""),
            content.namespace_for_uri("urn:d").as_ref().map(|v| v.prefix())
        );
        assert!(content.namespace_for_prefix("y").is_none());
        assert_eq!("", content.to_string());
    }

    #[test]
    fn test_element_by_id() {
        let factory = DocumentFactory::new();
        let root = factory.create_element("root").unwrap();
        let a = root.borrow_mut().add_element("a").unwrap();
        let b = a.borrow_mut().add_element("b").unwrap();
        b.borrow_mut().add_attribute("id", "x1").unwrap();
        let c = root.borrow_mut().add_element("c").unwrap();
        c.borrow_mut().add_attribute("ID", "x2").unwrap();

        let content = root.borrow().content().clone();
        assert!(std::rc::Rc::ptr_eq(&b, &content.element_by_id("x1").unwrap()));
        assert!(std::rc::Rc::ptr_eq(&c, &content.element_by_id("x2").unwrap()));
        assert!(content.element_by_id("x3").is_none());
        assert_eq!(3, content.descendants().len());
    }

    #[test]
    fn test_deep_copy() {
        let factory = DocumentFactory::new();
        let content = model(&factory);
        let copy = content.deep_copy(&factory);

        assert_eq!(content.entries(), copy.as_slice());
        assert!(!copy[1].is_same(&content.get(1).unwrap()));
    }
}

use crate::document::XmlDocument;
use crate::element::XmlElement;
use crate::error;
use crate::factory::DocumentFactory;
use crate::node::XmlDocumentType;
use crate::stack::NamespaceStack;
use crate::XmlNode;

// -----------------------------------------------------------------------------------------------

/// Builds a document from parser events.
///
/// Namespace declarations, whether announced through
/// [`TreeBuilder::start_prefix_mapping`] or passed as `xmlns` attributes,
/// become namespace nodes of the element that declares them. Character data
/// is stored as bare text.
#[derive(Debug)]
pub struct TreeBuilder {
    factory: DocumentFactory,
    namespaces: NamespaceStack,
    document: XmlNode<XmlDocument>,
    elements: Vec<XmlNode<XmlElement>>,
    pending: Vec<(String, String)>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        TreeBuilder::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder::with_factory(DocumentFactory::default())
    }

    pub fn with_factory(factory: DocumentFactory) -> Self {
        TreeBuilder {
            namespaces: NamespaceStack::new(factory.clone()),
            document: factory.create_document(),
            elements: vec![],
            pending: vec![],
            factory,
        }
    }

    pub fn document(&self) -> &XmlNode<XmlDocument> {
        &self.document
    }

    pub fn namespaces(&self) -> &NamespaceStack {
        &self.namespaces
    }

    /// Currently open element.
    pub fn current(&self) -> Option<&XmlNode<XmlElement>> {
        self.elements.last()
    }

    // -------------------------------------------------------------------------------------------

    /// Announces a declaration for the next [`TreeBuilder::start_element`].
    /// A start event that fails keeps the announcement for the next one.
    pub fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) {
        self.pending.push((prefix.to_string(), uri.to_string()));
    }

    pub fn start_element(
        &mut self,
        qualified_name: &str,
        attributes: &[(&str, &str)],
    ) -> error::Result<XmlNode<XmlElement>> {
        let pending = std::mem::take(&mut self.pending);
        self.namespaces.push_scope();

        match self.open_element(qualified_name, attributes, &pending) {
            Ok(element) => {
                self.elements.push(element.clone());
                Ok(element)
            }
            Err(e) => {
                self.namespaces.pop_scope();
                self.pending = pending;
                Err(e)
            }
        }
    }

    pub fn end_element(&mut self) -> error::Result<XmlNode<XmlElement>> {
        let element = self.elements.pop().ok_or_else(|| {
            error::Error::InvalidHierarchy("no element is open".to_string())
        })?;
        self.namespaces.pop_scope();
        Ok(element)
    }

    /// Whitespace outside the root element is dropped.
    pub fn characters(&mut self, text: &str) -> error::Result<()> {
        match self.elements.last() {
            Some(element) => {
                element.borrow_mut().add_raw_text(text);
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(error::Error::InvalidHierarchy(
                "character data outside the root element".to_string(),
            )),
        }
    }

    pub fn cdata(&mut self, text: &str) -> error::Result<()> {
        let element = self.open("CDATA")?;
        element.borrow_mut().add_cdata(text)?;
        Ok(())
    }

    pub fn entity_reference(&mut self, name: &str, text: Option<&str>) -> error::Result<()> {
        let element = self.open("entity reference")?;
        element.borrow_mut().add_entity(name, text)?;
        Ok(())
    }

    pub fn comment(&mut self, text: &str) -> error::Result<()> {
        match self.elements.last() {
            Some(element) => element.borrow_mut().add_comment(text)?,
            None => self.document.borrow_mut().add_comment(text)?,
        };
        Ok(())
    }

    pub fn processing_instruction(&mut self, target: &str, text: &str) -> error::Result<()> {
        match self.elements.last() {
            Some(element) => element
                .borrow_mut()
                .add_processing_instruction(target, text)?,
            None => self
                .document
                .borrow_mut()
                .add_processing_instruction(target, text)?,
        };
        Ok(())
    }

    pub fn doc_type(
        &mut self,
        element_name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> error::Result<XmlNode<XmlDocumentType>> {
        self.document
            .borrow_mut()
            .add_doc_type(element_name, public_id, system_id)
    }

    /// Hands over the document. Every element must have been closed.
    pub fn finish(self) -> error::Result<XmlNode<XmlDocument>> {
        if let Some(element) = self.elements.last() {
            return Err(error::Error::InvalidHierarchy(format!(
                "element '{}' is not closed",
                element.borrow().qualified_name()
            )));
        }

        Ok(self.document)
    }

    // -------------------------------------------------------------------------------------------

    fn open(&self, node: &str) -> error::Result<XmlNode<XmlElement>> {
        self.elements.last().cloned().ok_or_else(|| {
            error::Error::InvalidHierarchy(format!("{} outside the root element", node))
        })
    }

    fn open_element(
        &mut self,
        qualified_name: &str,
        attributes: &[(&str, &str)],
        pending: &[(String, String)],
    ) -> error::Result<XmlNode<XmlElement>> {
        let mut declarations = pending.to_vec();
        let mut values = vec![];

        for (name, value) in attributes {
            match declared_prefix(name) {
                Some(prefix) => declarations.push((prefix.to_string(), value.to_string())),
                None => values.push((*name, *value)),
            }
        }

        for (prefix, uri) in declarations.iter() {
            self.namespaces.declare(prefix, uri);
        }

        check_name(qualified_name)?;
        let qname = self.namespaces.qname("", "", qualified_name)?;
        let element = self.factory.create_element_qname(qname);

        {
            let mut e = element.borrow_mut();

            for (prefix, uri) in declarations.iter() {
                e.add_namespace(prefix, uri)?;
            }

            for (name, value) in values {
                check_name(name)?;
                let qname = self.namespaces.attribute_qname("", "", name)?;
                e.set_attribute_value(&qname, value)?;
            }
        }

        match self.elements.last() {
            Some(parent) => parent.borrow_mut().add(element.clone())?,
            None => self.document.borrow_mut().add(element.clone())?,
        }

        Ok(element)
    }
}

fn declared_prefix(name: &str) -> Option<&str> {
    if name == "xmlns" {
        Some("")
    } else {
        name.strip_prefix("xmlns:")
    }
}

fn check_name(name: &str) -> error::Result<()> {
    match xml_nom::parse_qname(name) {
        Some(_) => Ok(()),
        None => Err(error::Error::InvalidName(name.to_string())),
    }
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, NodeType, XmlItem};
    use std::rc::Rc;

    #[test]
    fn test_build_document() {
        let mut builder = TreeBuilder::new();
        builder.doc_type("root", None, Some("root.dtd")).unwrap();
        builder.characters("\n").unwrap();
        builder.comment("head").unwrap();
        builder
            .start_element("root", &[("xmlns", "urn:d"), ("xmlns:p", "urn:p"), ("id", "r")])
            .unwrap();
        builder.characters("a").unwrap();
        builder.start_prefix_mapping("q", "urn:q");
        builder
            .start_element("p:child", &[("q:attr", "1"), ("plain", "2")])
            .unwrap();
        builder.cdata("<x>").unwrap();
        builder.entity_reference("amp", Some("&")).unwrap();
        builder.end_element().unwrap();
        builder.start_element("leaf", &[]).unwrap();
        builder.end_element().unwrap();
        builder.processing_instruction("pi", "v=\"1\"").unwrap();
        builder.end_element().unwrap();
        builder.comment("tail").unwrap();

        let document = builder.finish().unwrap();
        let root = document.borrow().root_element().unwrap();

        let r = root.borrow();
        assert_eq!("urn:d", r.namespace_uri());
        assert_eq!(2, r.declared_namespaces().len());
        assert_eq!(Some("r".to_string()), r.attribute_value("id"));
        assert_eq!(NodeType::Text, r.node(2).unwrap().node_type());
        assert!(r.node(2).unwrap().is_read_only());

        let child = r.elements()[0].clone();
        let c = child.borrow();
        assert_eq!("urn:p", c.namespace_uri());
        assert_eq!(Some("1".to_string()), c.attribute_value("q:attr"));
        assert_eq!("urn:q", c.attribute("q:attr").unwrap().borrow().namespace_uri());
        assert_eq!("", c.attribute("plain").unwrap().borrow().namespace_uri());
        assert_eq!("<x>&", c.string_value());

        let leaf = r.element("leaf").unwrap();
        assert_eq!("urn:d", leaf.borrow().namespace_uri());
        assert!(Rc::ptr_eq(&document, &leaf.borrow().document().unwrap()));

        assert_eq!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><!DOCTYPE root SYSTEM \"root.dtd\"><!--head-->\
<root xmlns=\"urn:d\" xmlns:p=\"urn:p\" id=\"r\">a<p:child xmlns:q=\"urn:q\" q:attr=\"1\" plain=\"2\">\
<![CDATA[<x>]]>&amp;</p:child><leaf/><?pi v=\"1\"?></root><!--tail-->",
            document.borrow().to_string()
        );
    }

    #[test]
    fn test_scope_ends_with_element() {
        let mut builder = TreeBuilder::new();
        builder.start_element("root", &[]).unwrap();
        builder.start_element("a", &[("xmlns:p", "urn:p")]).unwrap();
        builder.start_element("p:b", &[]).unwrap();
        builder.end_element().unwrap();
        builder.end_element().unwrap();
        assert_eq!(1, builder.namespaces().depth());

        assert_eq!(
            Err(error::Error::UndeclaredPrefix("p".to_string())),
            builder.start_element("p:c", &[]).map(|_| ())
        );
        assert_eq!(1, builder.namespaces().depth());
        assert_eq!(
            Err(error::Error::InvalidName("1c".to_string())),
            builder.start_element("1c", &[]).map(|_| ())
        );
        assert_eq!(1, builder.root_children());
    }

    #[test]
    fn test_prefix_mapping_survives_failed_start() {
        let mut builder = TreeBuilder::new();
        builder.start_prefix_mapping("q", "urn:q");
        assert_eq!(
            Err(error::Error::InvalidName("1bad".to_string())),
            builder.start_element("1bad", &[]).map(|_| ())
        );
        assert_eq!(0, builder.namespaces().depth());

        let element = builder.start_element("q:ok", &[]).unwrap();
        assert_eq!("urn:q", element.borrow().namespace_uri());
        assert_eq!(1, element.borrow().declared_namespaces().len());

        builder.start_element("inner", &[]).unwrap();
        builder.end_element().unwrap();
        builder.end_element().unwrap();
        assert!(builder.finish().is_ok());
    }

    #[test]
    fn test_errors() {
        let mut builder = TreeBuilder::new();
        assert!(matches!(
            builder.characters("text"),
            Err(error::Error::InvalidHierarchy(_))
        ));
        assert!(matches!(builder.cdata("x"), Err(error::Error::InvalidHierarchy(_))));
        assert!(matches!(builder.end_element(), Err(error::Error::InvalidHierarchy(_))));

        builder.start_element("root", &[]).unwrap();
        builder.end_element().unwrap();
        assert_eq!(
            Err(error::Error::RootElementExists),
            builder.start_element("second", &[]).map(|_| ())
        );
        assert_eq!(0, builder.namespaces().depth());

        let mut open = TreeBuilder::new();
        open.start_element("root", &[]).unwrap();
        assert!(matches!(open.finish(), Err(error::Error::InvalidHierarchy(_))));
    }

    #[test]
    fn test_query_built_tree() {
        let mut builder = TreeBuilder::new();
        builder.start_element("root", &[]).unwrap();
        builder.start_element("item", &[("id", "1")]).unwrap();
        builder.characters("one").unwrap();
        builder.end_element().unwrap();
        builder.end_element().unwrap();

        let document = builder.finish().unwrap();
        let item = XmlItem::from(document);
        assert_eq!("one", item.value_of("/root/item[@id='1']").unwrap());
    }

    impl TreeBuilder {
        fn root_children(&self) -> usize {
            self.elements[0].borrow().node_count()
        }
    }
}

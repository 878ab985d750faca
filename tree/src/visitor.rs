use crate::document::XmlDocument;
use crate::element::XmlElement;
use crate::name::Namespace;
use crate::node::{
    XmlAttribute, XmlCData, XmlComment, XmlDocumentType, XmlEntity, XmlProcessingInstruction,
    XmlText,
};
use crate::{XmlItem, XmlNode};

// -----------------------------------------------------------------------------------------------

/// One callback per node kind; every callback defaults to doing nothing.
///
/// Branches are visited before their children. Elements pass their
/// attributes to the visitor before their content.
#[allow(unused_variables)]
pub trait Visitor {
    fn visit_document(&mut self, document: &XmlNode<XmlDocument>) {}

    fn visit_doc_type(&mut self, doc_type: &XmlNode<XmlDocumentType>) {}

    fn visit_element(&mut self, element: &XmlNode<XmlElement>) {}

    fn visit_attribute(&mut self, attribute: &XmlNode<XmlAttribute>) {}

    fn visit_text(&mut self, text: &XmlNode<XmlText>) {}

    fn visit_cdata(&mut self, cdata: &XmlNode<XmlCData>) {}

    fn visit_comment(&mut self, comment: &XmlNode<XmlComment>) {}

    fn visit_entity(&mut self, entity: &XmlNode<XmlEntity>) {}

    fn visit_namespace(&mut self, namespace: &Namespace) {}

    fn visit_processing_instruction(&mut self, pi: &XmlNode<XmlProcessingInstruction>) {}
}

impl XmlItem {
    /// Walks the node and everything below it in document order.
    ///
    /// Children are collected before they are visited, so the visitor may
    /// edit the tree it walks.
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            XmlItem::Attribute(v) => visitor.visit_attribute(v),
            XmlItem::CData(v) => visitor.visit_cdata(v),
            XmlItem::Comment(v) => visitor.visit_comment(v),
            XmlItem::Document(v) => {
                visitor.visit_document(v);

                let doc_type = v.borrow().doc_type();
                if let Some(doc_type) = doc_type {
                    visitor.visit_doc_type(&doc_type);
                }

                let nodes = v.borrow().nodes();
                for child in nodes {
                    child.accept(visitor);
                }
            }
            XmlItem::DocumentType(v) => visitor.visit_doc_type(v),
            XmlItem::Element(v) => {
                visitor.visit_element(v);

                let attributes = v.borrow().attributes();
                for attr in attributes.iter() {
                    visitor.visit_attribute(attr);
                }

                let nodes = v.borrow().nodes();
                for child in nodes {
                    child.accept(visitor);
                }
            }
            XmlItem::Entity(v) => visitor.visit_entity(v),
            XmlItem::Namespace(v) => visitor.visit_namespace(v),
            XmlItem::PI(v) => visitor.visit_processing_instruction(v),
            XmlItem::Text(v) => visitor.visit_text(v),
        }
    }
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::DocumentFactory;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Visitor for Recorder {
        fn visit_document(&mut self, _: &XmlNode<XmlDocument>) {
            self.events.push("document".to_string());
        }

        fn visit_doc_type(&mut self, doc_type: &XmlNode<XmlDocumentType>) {
            let name = doc_type.borrow().element_name().to_string();
            self.events.push(format!("doctype {}", name));
        }

        fn visit_element(&mut self, element: &XmlNode<XmlElement>) {
            let name = element.borrow().qualified_name().to_string();
            self.events.push(format!("element {}", name));
        }

        fn visit_attribute(&mut self, attribute: &XmlNode<XmlAttribute>) {
            let name = attribute.borrow().qualified_name().to_string();
            self.events.push(format!("attribute {}", name));
        }

        fn visit_text(&mut self, text: &XmlNode<XmlText>) {
            let text = text.borrow().text().to_string();
            self.events.push(format!("text {}", text));
        }

        fn visit_comment(&mut self, comment: &XmlNode<XmlComment>) {
            let text = comment.borrow().text().to_string();
            self.events.push(format!("comment {}", text));
        }

        fn visit_namespace(&mut self, namespace: &Namespace) {
            self.events.push(format!("namespace {}", namespace.prefix()));
        }
    }

    #[test]
    fn test_visit_order() {
        let factory = DocumentFactory::new();
        let document = factory.create_document();
        document.borrow_mut().add_doc_type("root", None, None).unwrap();
        document.borrow_mut().add_comment("head").unwrap();
        let root = document.borrow_mut().add_element("root").unwrap();
        root.borrow_mut().add_namespace("x", "urn:x").unwrap();
        root.borrow_mut().add_attribute("a", "1").unwrap();
        root.borrow_mut().add_raw_text("bare");
        let child = root.borrow_mut().add_element("x:child").unwrap();
        child.borrow_mut().add_attribute("b", "2").unwrap();
        child.borrow_mut().add_text("inner").unwrap();
        root.borrow_mut().add_cdata("skipped").unwrap();

        let mut recorder = Recorder::default();
        XmlItem::from(document).accept(&mut recorder);

        assert_eq!(
            vec![
                "document",
                "doctype root",
                "comment head",
                "element root",
                "attribute a",
                "namespace x",
                "text bare",
                "element x:child",
                "attribute b",
                "text inner",
            ],
            recorder.events
        );
    }

    #[test]
    fn test_visitor_may_edit_tree() {
        struct Stripper;

        impl Visitor for Stripper {
            fn visit_comment(&mut self, comment: &XmlNode<XmlComment>) {
                XmlItem::from(comment.clone()).detach();
            }
        }

        let factory = DocumentFactory::new();
        let root = factory.create_element("root").unwrap();
        root.borrow_mut().add_comment("a").unwrap();
        let child = root.borrow_mut().add_element("child").unwrap();
        child.borrow_mut().add_comment("b").unwrap();
        root.borrow_mut().add_comment("c").unwrap();

        XmlItem::from(root.clone()).accept(&mut Stripper);
        assert_eq!("<root><child/></root>", root.borrow().to_string());
    }
}

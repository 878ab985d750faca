use super::model::{Axis, LocationPath, NodeTest, Predicate, Step};
use crate::element::XmlElement;
use crate::error;
use crate::name::XML_NAMESPACE_URI;
use crate::{Node, XmlItem, XmlNode};
use ahash::{AHashMap, AHashSet};
use std::rc::Rc;

// -----------------------------------------------------------------------------------------------

impl XmlItem {
    /// Nodes selected by the path `expr`, in document order and without
    /// duplicates.
    ///
    /// Prefixes resolve against the declarations in scope at this node;
    /// unprefixed names only match names without a namespace. An absolute
    /// path on a tree without a document starts above its topmost element.
    pub fn select_nodes(&self, expr: &str) -> error::Result<Vec<XmlItem>> {
        let path = super::compile(expr)?;
        let evaluator = Evaluator::new(self, &path)?;
        Ok(evaluator.evaluate(self, &path))
    }

    pub fn select_single_node(&self, expr: &str) -> error::Result<Option<XmlItem>> {
        Ok(self.select_nodes(expr)?.into_iter().next())
    }

    /// String value of the first selected node, empty when nothing matches.
    pub fn value_of(&self, expr: &str) -> error::Result<String> {
        Ok(self
            .select_single_node(expr)?
            .map(|v| v.string_value())
            .unwrap_or_default())
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum Cursor {
    /// Stands in for the missing document above a detached element.
    Root(XmlNode<XmlElement>),
    /// `parent` is where the node was reached from; flyweights know no other.
    Node {
        item: XmlItem,
        parent: Option<XmlItem>,
    },
}

impl Cursor {
    fn new(item: XmlItem) -> Self {
        Cursor::Node { item, parent: None }
    }

    fn item(&self) -> Option<&XmlItem> {
        match self {
            Cursor::Root(_) => None,
            Cursor::Node { item, .. } => Some(item),
        }
    }

    fn key(&self) -> usize {
        match self {
            Cursor::Root(_) => 0,
            Cursor::Node { item, .. } => identity(item),
        }
    }

    fn children(&self) -> Vec<Cursor> {
        match self {
            Cursor::Root(v) => vec![Cursor::new(XmlItem::Element(v.clone()))],
            Cursor::Node { item, .. } => {
                let nodes = match item {
                    XmlItem::Document(v) => v.borrow().nodes(),
                    XmlItem::Element(v) => v.borrow().nodes(),
                    _ => vec![],
                };

                nodes
                    .into_iter()
                    .filter(|v| !matches!(v, XmlItem::Namespace(_)))
                    .map(|v| Cursor::Node {
                        item: v,
                        parent: Some(item.clone()),
                    })
                    .collect()
            }
        }
    }

    fn descendants(&self, found: &mut Vec<Cursor>) {
        for child in self.children() {
            child.descendants_with_self(found);
        }
    }

    fn descendants_with_self(self, found: &mut Vec<Cursor>) {
        found.push(self.clone());
        self.descendants(found);
    }

    fn attributes(&self) -> Vec<Cursor> {
        match self {
            Cursor::Node {
                item: XmlItem::Element(v),
                ..
            } => v
                .borrow()
                .attributes()
                .into_iter()
                .map(|a| Cursor::Node {
                    item: XmlItem::Attribute(a),
                    parent: Some(XmlItem::Element(v.clone())),
                })
                .collect(),
            _ => vec![],
        }
    }

    fn parent(&self) -> Option<Cursor> {
        match self {
            Cursor::Root(_) => None,
            Cursor::Node { item, parent } => item
                .parent_item()
                .or_else(|| parent.clone())
                .map(Cursor::new),
        }
    }
}

fn identity(item: &XmlItem) -> usize {
    match item {
        XmlItem::Attribute(v) => Rc::as_ptr(v) as *const () as usize,
        XmlItem::CData(v) => Rc::as_ptr(v) as *const () as usize,
        XmlItem::Comment(v) => Rc::as_ptr(v) as *const () as usize,
        XmlItem::Document(v) => Rc::as_ptr(v) as *const () as usize,
        XmlItem::DocumentType(v) => Rc::as_ptr(v) as *const () as usize,
        XmlItem::Element(v) => Rc::as_ptr(v) as *const () as usize,
        XmlItem::Entity(v) => Rc::as_ptr(v) as *const () as usize,
        XmlItem::Namespace(v) => v.as_ptr() as usize,
        XmlItem::PI(v) => Rc::as_ptr(v) as *const () as usize,
        XmlItem::Text(v) => Rc::as_ptr(v) as *const () as usize,
    }
}

// -----------------------------------------------------------------------------------------------

struct Evaluator {
    uris: AHashMap<String, String>,
}

impl Evaluator {
    /// Resolves every prefix used by `path` up front.
    fn new(context: &XmlItem, path: &LocationPath) -> error::Result<Self> {
        let scope = match context {
            XmlItem::Element(v) => Some(v.clone()),
            XmlItem::Document(v) => v.borrow().root_element(),
            _ => context.parent(),
        };

        let prefixes = path.steps.iter().flat_map(|step| {
            step.test
                .prefix()
                .into_iter()
                .chain(step.predicates.iter().filter_map(|v| v.prefix()))
        });

        let mut uris = AHashMap::new();
        for prefix in prefixes {
            if uris.contains_key(prefix) {
                continue;
            }

            let uri = match scope
                .as_ref()
                .and_then(|v| v.borrow().namespace_for_prefix(prefix))
            {
                Some(namespace) => namespace.uri().to_string(),
                None if prefix == "xml" => XML_NAMESPACE_URI.to_string(),
                None => return Err(error::Error::UndeclaredPrefix(prefix.to_string())),
            };
            uris.insert(prefix.to_string(), uri);
        }

        Ok(Evaluator { uris })
    }

    fn uri(&self, prefix: &str) -> &str {
        self.uris.get(prefix).map(|v| v.as_str()).unwrap_or_default()
    }

    fn evaluate(&self, context: &XmlItem, path: &LocationPath) -> Vec<XmlItem> {
        let start = if path.absolute {
            root(context)
        } else {
            Cursor::new(context.clone())
        };

        let mut current = vec![start];
        for step in path.steps.iter() {
            let mut seen = AHashSet::new();
            let mut next = vec![];
            for cursor in current.iter() {
                for found in self.step(cursor, step) {
                    if seen.insert(found.key()) {
                        next.push(found);
                    }
                }
            }
            current = next;
        }

        current
            .into_iter()
            .filter_map(|v| v.item().cloned())
            .collect()
    }

    fn step(&self, cursor: &Cursor, step: &Step) -> Vec<Cursor> {
        let candidates = match step.axis {
            Axis::Attribute => cursor.attributes(),
            Axis::Child => cursor.children(),
            Axis::DescendantOrSelf => {
                let mut found = vec![];
                cursor.clone().descendants_with_self(&mut found);
                found
            }
            Axis::Parent => cursor.parent().into_iter().collect(),
            Axis::SelfNode => vec![cursor.clone()],
        };

        let mut selected: Vec<Cursor> = candidates
            .into_iter()
            .filter(|v| self.matches(v, &step.test))
            .collect();

        for predicate in step.predicates.iter() {
            selected = selected
                .into_iter()
                .enumerate()
                .filter(|(i, v)| self.accepts(v, predicate, i + 1))
                .map(|(_, v)| v)
                .collect();
        }

        selected
    }

    fn matches(&self, cursor: &Cursor, test: &NodeTest) -> bool {
        let item = match cursor.item() {
            Some(item) => item,
            None => return matches!(test, NodeTest::Node),
        };

        match test {
            NodeTest::Node => true,
            NodeTest::Text => matches!(item, XmlItem::Text(_) | XmlItem::CData(_)),
            NodeTest::Comment => matches!(item, XmlItem::Comment(_)),
            NodeTest::ProcessingInstruction(target) => match item {
                XmlItem::PI(v) => target.map(|t| v.borrow().target() == t).unwrap_or(true),
                _ => false,
            },
            NodeTest::Any => expanded_name(item).is_some(),
            NodeTest::AnyInNamespace(prefix) => {
                expanded_name(item).is_some_and(|(_, uri)| uri == self.uri(prefix))
            }
            NodeTest::Name(name) => expanded_name(item).is_some_and(|(local, uri)| {
                local == name.local_part() && uri == self.uri(name.prefix())
            }),
        }
    }

    fn accepts(&self, cursor: &Cursor, predicate: &Predicate, position: usize) -> bool {
        match predicate {
            Predicate::Position(n) => *n == position,
            Predicate::NameEquals(name) => {
                cursor.item().and_then(|v| v.name()).as_deref() == Some(*name)
            }
            Predicate::Attribute(test, value) => {
                self.any_matches(cursor.attributes(), test, *value)
            }
            Predicate::Child(test, value) => self.any_matches(cursor.children(), test, *value),
        }
    }

    fn any_matches(&self, cursors: Vec<Cursor>, test: &NodeTest, value: Option<&str>) -> bool {
        cursors.iter().any(|v| {
            self.matches(v, test)
                && match (value, v.item()) {
                    (Some(value), Some(item)) => item.string_value() == value,
                    (Some(_), None) => false,
                    (None, _) => true,
                }
        })
    }
}

/// Local name and namespace URI of an element or an attribute.
fn expanded_name(item: &XmlItem) -> Option<(String, String)> {
    match item {
        XmlItem::Element(v) => {
            let v = v.borrow();
            Some((v.local_name().to_string(), v.namespace_uri().to_string()))
        }
        XmlItem::Attribute(v) => {
            let v = v.borrow();
            Some((v.local_name().to_string(), v.namespace_uri().to_string()))
        }
        _ => None,
    }
}

/// Document of `context`, or a stand-in above its topmost element.
fn root(context: &XmlItem) -> Cursor {
    if let Some(document) = context.document() {
        return Cursor::new(XmlItem::Document(document));
    }

    let mut top = match context {
        XmlItem::Element(v) => Some(v.clone()),
        _ => context.parent(),
    };

    loop {
        let parent = match top.as_ref() {
            Some(v) => v.borrow().parent(),
            None => None,
        };

        match parent {
            Some(parent) => top = Some(parent),
            None => break,
        }
    }

    match top {
        Some(element) => Cursor::Root(element),
        None => Cursor::new(context.clone()),
    }
}

// -----------------------------------------------------------------------------------------------

use crate::error;
use crate::name::QName;
use crate::node::XmlAttribute;
use crate::XmlNode;
use std::rc::Rc;

// -----------------------------------------------------------------------------------------------

/// Attributes of one element, unique by local name and namespace URI.
///
/// Like [`crate::content::ContentModel`] it only stores entries; the element
/// keeps the back-references up to date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeModel {
    attributes: Vec<XmlNode<XmlAttribute>>,
}

impl AttributeModel {
    pub fn new() -> Self {
        AttributeModel::default()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn as_slice(&self) -> &[XmlNode<XmlAttribute>] {
        self.attributes.as_slice()
    }

    pub fn get(&self, index: usize) -> Option<XmlNode<XmlAttribute>> {
        self.attributes.get(index).cloned()
    }

    pub fn position(&self, local_name: &str, uri: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|v| v.borrow().qname().matches(local_name, uri))
    }

    pub fn index_of(&self, attribute: &XmlNode<XmlAttribute>) -> Option<usize> {
        self.attributes.iter().position(|v| Rc::ptr_eq(v, attribute))
    }

    pub fn find(&self, local_name: &str, uri: &str) -> Option<XmlNode<XmlAttribute>> {
        self.position(local_name, uri).and_then(|v| self.get(v))
    }

    pub fn find_qname(&self, qname: &QName) -> Option<XmlNode<XmlAttribute>> {
        self.find(qname.local_name(), qname.namespace_uri())
    }

    /// Match on the qualified name as written, e.g. `xml:lang`.
    pub fn find_named(&self, qualified_name: &str) -> Option<XmlNode<XmlAttribute>> {
        self.attributes
            .iter()
            .find(|v| v.borrow().qualified_name() == qualified_name)
            .cloned()
    }

    /// Appends `attribute`, or takes the place of the attribute with the same
    /// name. The replaced attribute is returned.
    pub fn put(&mut self, attribute: XmlNode<XmlAttribute>) -> Option<XmlNode<XmlAttribute>> {
        let position = {
            let attr = attribute.borrow();
            self.position(attr.local_name(), attr.namespace_uri())
        };

        match position {
            Some(index) => Some(std::mem::replace(&mut self.attributes[index], attribute)),
            None => {
                self.attributes.push(attribute);
                None
            }
        }
    }

    /// Inserts at `index`, dropping any other attribute with the same name.
    /// The dropped attribute is returned.
    pub fn insert(
        &mut self,
        index: usize,
        attribute: XmlNode<XmlAttribute>,
    ) -> error::Result<Option<XmlNode<XmlAttribute>>> {
        if index > self.attributes.len() {
            return Err(error::Error::OutOfIndex(index));
        }

        let position = {
            let attr = attribute.borrow();
            self.position(attr.local_name(), attr.namespace_uri())
        };

        self.attributes.insert(index, attribute);

        Ok(position.map(|v| {
            let v = if v >= index { v + 1 } else { v };
            self.attributes.remove(v)
        }))
    }

    pub fn set(
        &mut self,
        index: usize,
        attribute: XmlNode<XmlAttribute>,
    ) -> error::Result<XmlNode<XmlAttribute>> {
        let entry = self
            .attributes
            .get_mut(index)
            .ok_or(error::Error::OutOfIndex(index))?;
        Ok(std::mem::replace(entry, attribute))
    }

    pub fn remove_at(&mut self, index: usize) -> error::Result<XmlNode<XmlAttribute>> {
        if index >= self.attributes.len() {
            return Err(error::Error::OutOfIndex(index));
        }

        Ok(self.attributes.remove(index))
    }

    pub fn remove(&mut self, attribute: &XmlNode<XmlAttribute>) -> bool {
        match self.index_of(attribute) {
            Some(index) => {
                self.attributes.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) -> Vec<XmlNode<XmlAttribute>> {
        std::mem::take(&mut self.attributes)
    }
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::NameCache;
    use crate::node;

    fn attribute(names: &NameCache, name: &str, uri: &str, value: &str) -> XmlNode<XmlAttribute> {
        let prefix = if uri.is_empty() { "" } else { "p" };
        let qname = names.qname(name, &names.namespace(prefix, uri));
        node(XmlAttribute::new(qname, value))
    }

    #[test]
    fn test_put_replaces_same_name() {
        let names = NameCache::new();
        let mut model = AttributeModel::new();

        assert!(model.put(attribute(&names, "a", "", "1")).is_none());
        assert!(model.put(attribute(&names, "b", "", "2")).is_none());
        assert!(model.put(attribute(&names, "a", "urn:x", "3")).is_none());
        assert_eq!(3, model.len());

        let old = model.put(attribute(&names, "a", "", "4")).unwrap();
        assert_eq!("1", old.borrow().value());
        assert_eq!(3, model.len());
        assert_eq!("4", model.get(0).unwrap().borrow().value());

        assert_eq!("3", model.find("a", "urn:x").unwrap().borrow().value());
        assert_eq!("3", model.find_named("p:a").unwrap().borrow().value());
        assert!(model.find("c", "").is_none());
    }

    #[test]
    fn test_insert() {
        let names = NameCache::new();
        let mut model = AttributeModel::new();
        model.put(attribute(&names, "a", "", "1"));
        model.put(attribute(&names, "b", "", "2"));

        assert!(model.insert(0, attribute(&names, "c", "", "3")).unwrap().is_none());
        assert_eq!("c", model.get(0).unwrap().borrow().local_name());

        let dropped = model.insert(1, attribute(&names, "b", "", "4")).unwrap().unwrap();
        assert_eq!("2", dropped.borrow().value());
        assert_eq!(3, model.len());
        assert_eq!("4", model.get(1).unwrap().borrow().value());

        assert_eq!(
            Err(error::Error::OutOfIndex(5)),
            model.insert(5, attribute(&names, "d", "", "5")).map(|_| ())
        );
    }

    #[test]
    fn test_remove() {
        let names = NameCache::new();
        let mut model = AttributeModel::new();
        let a = attribute(&names, "a", "", "1");
        model.put(a.clone());

        assert_eq!(Some(0), model.index_of(&a));
        assert!(!model.remove(&attribute(&names, "a", "", "1")));
        assert!(model.remove(&a));
        assert!(model.is_empty());
        assert!(model.remove_at(0).is_err());
    }
}

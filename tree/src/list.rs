use crate::branch::Branch;
use crate::element::XmlElement;
use crate::error;
use crate::node::XmlAttribute;
use crate::{XmlItem, XmlNode};
use std::rc::Rc;

// -----------------------------------------------------------------------------------------------

/// Live view of a branch's content.
///
/// Every call goes straight to the branch, so parent links are maintained
/// the same way as when the branch is edited directly.
#[derive(Clone, Debug)]
pub struct ContentList {
    branch: Branch,
}

impl ContentList {
    pub fn new(branch: Branch) -> Self {
        ContentList { branch }
    }

    pub fn branch(&self) -> &Branch {
        &self.branch
    }

    pub fn len(&self) -> usize {
        self.branch.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<XmlItem> {
        self.branch.node(index)
    }

    /// Iterates over a snapshot taken now.
    pub fn iter(&self) -> std::vec::IntoIter<XmlItem> {
        self.branch.nodes().into_iter()
    }

    pub fn add(&self, item: XmlItem) -> error::Result<()> {
        self.branch.add(item)
    }

    pub fn insert(&self, index: usize, item: XmlItem) -> error::Result<()> {
        self.branch.insert(index, item)
    }

    pub fn remove(&self, index: usize) -> error::Result<XmlItem> {
        self.branch.remove_at(index)
    }

    pub fn remove_item(&self, item: &XmlItem) -> bool {
        self.branch.remove(item)
    }

    pub fn set(&self, index: usize, item: XmlItem) -> error::Result<XmlItem> {
        self.branch.set_node(index, item)
    }

    pub fn clear(&self) {
        self.branch.clear_content();
    }

    /// Removes every node for which `f` returns `false`.
    pub fn retain<F: FnMut(&XmlItem) -> bool>(&self, mut f: F) -> error::Result<()> {
        let mut index = 0;
        for item in self.branch.nodes() {
            if f(&item) {
                index += 1;
            } else {
                self.branch.remove_at(index)?;
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------------------------

/// Live view of an element's attributes.
#[derive(Clone, Debug)]
pub struct AttributeList {
    element: XmlNode<XmlElement>,
}

impl AttributeList {
    pub fn new(element: XmlNode<XmlElement>) -> Self {
        AttributeList { element }
    }

    pub fn len(&self) -> usize {
        self.element.borrow().attribute_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<XmlNode<XmlAttribute>> {
        self.element.borrow().attribute_at(index)
    }

    pub fn iter(&self) -> std::vec::IntoIter<XmlNode<XmlAttribute>> {
        self.element.borrow().attributes().into_iter()
    }

    /// Appends `attr`, or replaces the attribute with the same name.
    pub fn add(&self, attr: XmlNode<XmlAttribute>) -> error::Result<()> {
        self.element.borrow_mut().add_attribute_node(attr)
    }

    pub fn insert(&self, index: usize, attr: XmlNode<XmlAttribute>) -> error::Result<()> {
        self.element.borrow_mut().insert_attribute_node(index, attr)
    }

    pub fn remove(&self, index: usize) -> error::Result<XmlNode<XmlAttribute>> {
        self.element.borrow_mut().remove_attribute_at(index)
    }

    pub fn remove_item(&self, attr: &XmlNode<XmlAttribute>) -> bool {
        self.element.borrow_mut().remove_attribute(attr)
    }

    pub fn set(
        &self,
        index: usize,
        attr: XmlNode<XmlAttribute>,
    ) -> error::Result<XmlNode<XmlAttribute>> {
        self.element.borrow_mut().set_attribute_node(index, attr)
    }

    pub fn clear(&self) {
        self.element.borrow_mut().clear_attributes();
    }

    pub fn retain<F: FnMut(&XmlNode<XmlAttribute>) -> bool>(&self, mut f: F) {
        for attr in self.iter() {
            if !f(&attr) {
                self.remove_item(&attr);
            }
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// Filtered snapshot of a branch's content.
///
/// Reads come from the snapshot. Writes are applied to the branch at the
/// position matching the snapshot, then to the snapshot itself. Changes
/// made to the branch by other means are not seen.
#[derive(Clone, Debug)]
pub struct BackedList<T> {
    branch: Branch,
    items: Vec<T>,
}

impl<T> BackedList<T>
where
    T: Clone + Into<XmlItem>,
{
    pub fn new(branch: Branch, items: Vec<T>) -> Self {
        BackedList { branch, items }
    }

    pub fn branch(&self) -> &Branch {
        &self.branch
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).cloned()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        self.items.as_slice()
    }

    /// Appends to the end of the branch.
    pub fn add(&mut self, item: T) -> error::Result<()> {
        self.branch.add(item.clone().into())?;
        self.items.push(item);
        Ok(())
    }

    /// Inserts before the item currently at `index`, or after the last item
    /// when `index` is the length of the list.
    pub fn insert(&mut self, index: usize, item: T) -> error::Result<()> {
        if index > self.items.len() {
            return Err(error::Error::OutOfIndex(index));
        }

        let real_index = self.real_index(index);
        self.branch.insert(real_index, item.clone().into())?;
        self.items.insert(index, item);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> error::Result<T> {
        if index >= self.items.len() {
            return Err(error::Error::OutOfIndex(index));
        }

        let target: XmlItem = self.items[index].clone().into();
        if !self.branch.remove(&target) {
            return Err(stale(&target));
        }
        Ok(self.items.remove(index))
    }

    pub fn remove_item(&mut self, item: &T) -> bool {
        let target: XmlItem = item.clone().into();
        match self
            .items
            .iter()
            .position(|v| target.ptr_eq(&v.clone().into()))
        {
            Some(index) if self.branch.remove(&target) => {
                self.items.remove(index);
                true
            }
            Some(_) => false,
            None => false,
        }
    }

    pub fn set(&mut self, index: usize, item: T) -> error::Result<T> {
        if index >= self.items.len() {
            return Err(error::Error::OutOfIndex(index));
        }

        let current: XmlItem = self.items[index].clone().into();
        let real_index = self
            .branch
            .index_of(&current)
            .ok_or(error::Error::OutOfIndex(index))?;
        self.branch.set_node(real_index, item.clone().into())?;
        Ok(std::mem::replace(&mut self.items[index], item))
    }

    /// Stops at the first item the branch no longer holds; it and the
    /// items after it stay in the list.
    pub fn clear(&mut self) -> error::Result<()> {
        self.retain(|_| false)
    }

    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut f: F) -> error::Result<()> {
        let mut index = 0;
        while index < self.items.len() {
            if f(&self.items[index]) {
                index += 1;
                continue;
            }

            let target: XmlItem = self.items[index].clone().into();
            if !self.branch.remove(&target) {
                return Err(stale(&target));
            }
            self.items.remove(index);
        }
        Ok(())
    }

    fn real_index(&self, index: usize) -> usize {
        let found = match self.items.get(index) {
            Some(next) => self.branch.index_of(&next.clone().into()),
            None => self
                .items
                .last()
                .and_then(|v| self.branch.index_of(&v.clone().into()))
                .map(|v| v + 1),
        };
        found.unwrap_or_else(|| self.branch.node_count())
    }
}

impl BackedList<XmlNode<XmlElement>> {
    pub fn contains(&self, element: &XmlNode<XmlElement>) -> bool {
        self.items.iter().any(|v| Rc::ptr_eq(v, element))
    }
}

impl<T> IntoIterator for BackedList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

fn stale(item: &XmlItem) -> error::Error {
    error::Error::InvalidHierarchy(format!("{} is no longer in the branch", item.describe()))
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::DocumentFactory;
    use crate::{Node, NodeType};

    fn root_with_children() -> (XmlNode<XmlElement>, Vec<XmlNode<XmlElement>>) {
        let factory = DocumentFactory::new();
        let root = factory.create_element("root").unwrap();
        root.borrow_mut().add_raw_text("t0");
        let a = root.borrow_mut().add_element("a").unwrap();
        root.borrow_mut().add_comment("c").unwrap();
        let b = root.borrow_mut().add_element("b").unwrap();
        root.borrow_mut().add_raw_text("t1");
        (root, vec![a, b])
    }

    #[test]
    fn test_backed_insert_uses_real_index() {
        let factory = DocumentFactory::new();
        let root = factory.create_element("root").unwrap();
        root.borrow_mut().add_element("a").unwrap();
        root.borrow_mut().add_element("b").unwrap();
        let child = factory.create_element("child").unwrap();

        let mut elements = Branch::from(root.clone()).elements();
        elements.insert(1, child.clone()).unwrap();

        let r = root.borrow();
        assert_eq!(3, r.elements().len());
        assert!(Rc::ptr_eq(&child, &r.elements()[1]));
        assert!(Rc::ptr_eq(&root, &child.borrow().parent().unwrap()));
        assert_eq!(3, elements.len());
        assert!(elements.contains(&child));
    }

    #[test]
    fn test_backed_insert_between_other_content() {
        let (root, children) = root_with_children();
        let factory = root.borrow().factory().clone();
        let mut elements = Branch::from(root.clone()).elements();

        let first = factory.create_element("first").unwrap();
        elements.insert(0, first.clone()).unwrap();
        assert_eq!(
            Some(1),
            root.borrow().index_of(&XmlItem::from(first.clone()))
        );

        let middle = factory.create_element("middle").unwrap();
        elements.insert(2, middle.clone()).unwrap();
        assert_eq!(
            Some(4),
            root.borrow().index_of(&XmlItem::from(middle.clone()))
        );

        let last = factory.create_element("last").unwrap();
        elements.insert(4, last.clone()).unwrap();
        assert_eq!(
            Some(6),
            root.borrow().index_of(&XmlItem::from(last.clone()))
        );

        assert_eq!(
            Err(error::Error::OutOfIndex(6)),
            elements.insert(6, factory.create_element("x").unwrap())
        );
        assert_eq!(5, elements.len());
        assert!(Rc::ptr_eq(&children[1], &elements.get(3).unwrap()));
        assert_eq!(
            "<root>t0<first/><a/><!--c--><middle/><b/><last/>t1</root>",
            root.borrow().to_string()
        );
    }

    #[test]
    fn test_backed_insert_into_empty() {
        let factory = DocumentFactory::new();
        let root = factory.create_element("root").unwrap();
        root.borrow_mut().add_raw_text("text");

        let mut elements = Branch::from(root.clone()).elements();
        elements.insert(0, factory.create_element("a").unwrap()).unwrap();
        assert_eq!("<root>text<a/></root>", root.borrow().to_string());
    }

    #[test]
    fn test_backed_rejects_parented_node() {
        let (root, _) = root_with_children();
        let factory = root.borrow().factory().clone();
        let other = factory.create_element("other").unwrap();
        let owned = other.borrow_mut().add_element("owned").unwrap();

        let mut elements = Branch::from(root.clone()).elements();
        assert!(matches!(
            elements.insert(0, owned.clone()),
            Err(error::Error::IllegalAdd { .. })
        ));
        assert!(matches!(
            elements.add(owned.clone()),
            Err(error::Error::IllegalAdd { .. })
        ));
        assert_eq!(2, elements.len());
        assert!(Rc::ptr_eq(&other, &owned.borrow().parent().unwrap()));
    }

    #[test]
    fn test_backed_remove_set_clear() {
        let (root, children) = root_with_children();
        let factory = root.borrow().factory().clone();
        let mut elements = Branch::from(root.clone()).elements();

        let removed = elements.remove(0).unwrap();
        assert!(Rc::ptr_eq(&children[0], &removed));
        assert!(children[0].borrow().parent().is_none());
        assert_eq!(4, root.borrow().node_count());
        assert!(elements.remove(1).is_err());

        let c = factory.create_element("c").unwrap();
        let old = elements.set(0, c.clone()).unwrap();
        assert!(Rc::ptr_eq(&children[1], &old));
        assert!(children[1].borrow().parent().is_none());
        assert_eq!("<root>t0<!--c--><c/>t1</root>", root.borrow().to_string());

        assert!(elements.remove_item(&c));
        assert!(!elements.remove_item(&c));

        elements.add(factory.create_element("d").unwrap()).unwrap();
        elements.add(factory.create_element("e").unwrap()).unwrap();
        elements
            .retain(|v| v.borrow().local_name() == "e")
            .unwrap();
        assert_eq!("<root>t0<!--c-->t1<e/></root>", root.borrow().to_string());

        elements.clear().unwrap();
        assert!(elements.is_empty());
        assert_eq!(3, root.borrow().node_count());
    }

    #[test]
    fn test_backed_stale_snapshot() {
        let (root, children) = root_with_children();
        let mut elements = Branch::from(root.clone()).elements();
        assert!(root
            .borrow_mut()
            .remove(&XmlItem::from(children[0].clone())));

        assert!(matches!(
            elements.remove(0),
            Err(error::Error::InvalidHierarchy(_))
        ));
        assert!(!elements.remove_item(&children[0]));
        assert_eq!(2, elements.len());

        assert!(elements.clear().is_err());
        assert_eq!(2, elements.len());
        assert!(Rc::ptr_eq(&children[1], &elements.get(1).unwrap()));
        assert!(Rc::ptr_eq(&root, &children[1].borrow().parent().unwrap()));

        elements
            .retain(|v| !Rc::ptr_eq(v, &children[1]))
            .unwrap();
        assert_eq!(1, elements.len());
        assert!(children[1].borrow().parent().is_none());
        assert_eq!("<root>t0<!--c-->t1</root>", root.borrow().to_string());
    }

    #[test]
    fn test_backed_named() {
        let (root, _) = root_with_children();
        root.borrow_mut().add_element("a").unwrap();

        let elements = Branch::from(root.clone()).elements_named("a");
        assert_eq!(2, elements.len());
        let names = elements
            .into_iter()
            .map(|v| v.borrow().qualified_name().to_string())
            .collect::<Vec<String>>();
        assert_eq!(vec!["a", "a"], names);
    }

    #[test]
    fn test_content_list() {
        let (root, children) = root_with_children();
        let factory = root.borrow().factory().clone();
        let content = Branch::from(root.clone()).content();

        assert_eq!(5, content.len());
        assert_eq!(NodeType::Text, content.get(0).unwrap().node_type());
        assert_eq!(5, content.iter().count());

        content.insert(0, XmlItem::from(factory.create_comment("head"))).unwrap();
        assert_eq!(6, root.borrow().node_count());

        let removed = content.remove(2).unwrap();
        assert!(removed.ptr_eq(&XmlItem::from(children[0].clone())));
        assert!(children[0].borrow().parent().is_none());

        content
            .retain(|v| v.node_type() != NodeType::Comment)
            .unwrap();
        assert_eq!("<root>t0<b/>t1</root>", root.borrow().to_string());

        let text = factory.create_text("x");
        content.set(0, XmlItem::from(text.clone())).unwrap();
        assert!(Rc::ptr_eq(&root, &text.borrow().parent().unwrap()));
        assert!(content.remove_item(&XmlItem::from(text.clone())));

        content.clear();
        assert!(content.is_empty());
        assert!(children[1].borrow().parent().is_none());
    }

    #[test]
    fn test_attribute_list() {
        let factory = DocumentFactory::new();
        let root = factory.create_element("root").unwrap();
        root.borrow_mut().add_attribute("a", "1").unwrap();
        let attributes = Branch::from(root.clone()).attributes().unwrap();

        let b = factory.create_attribute("b", "2").unwrap();
        attributes.insert(0, b.clone()).unwrap();
        assert_eq!("<root b=\"2\" a=\"1\"/>", root.borrow().to_string());
        assert!(Rc::ptr_eq(&root, &b.borrow().parent().unwrap()));

        let c = factory.create_attribute("c", "3").unwrap();
        let old = attributes.set(0, c.clone()).unwrap();
        assert!(Rc::ptr_eq(&b, &old));
        assert!(b.borrow().parent().is_none());

        attributes.add(factory.create_attribute("a", "4").unwrap()).unwrap();
        assert_eq!(2, attributes.len());
        assert_eq!("4", attributes.get(1).unwrap().borrow().value());

        attributes.retain(|v| v.borrow().local_name() != "c");
        assert_eq!(1, attributes.len());
        assert!(c.borrow().parent().is_none());

        let a = attributes.remove(0).unwrap();
        assert!(a.borrow().parent().is_none());
        assert!(attributes.is_empty());
        assert!(!attributes.remove_item(&a));

        attributes.add(a.clone()).unwrap();
        attributes.clear();
        assert_eq!(0, root.borrow().attribute_count());
    }
}

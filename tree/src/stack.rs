use crate::error;
use crate::factory::DocumentFactory;
use crate::name::{Namespace, QName};

// -----------------------------------------------------------------------------------------------

/// Namespace declarations in scope while a tree is built from a stream of
/// events.
///
/// Each scope remembers how many declarations were made before it, so a
/// later declaration of the same prefix shadows the earlier one until its
/// scope is popped.
#[derive(Debug)]
pub struct NamespaceStack {
    factory: DocumentFactory,
    namespaces: Vec<Namespace>,
    scopes: Vec<usize>,
}

impl Default for NamespaceStack {
    fn default() -> Self {
        NamespaceStack::new(DocumentFactory::default())
    }
}

impl NamespaceStack {
    pub fn new(factory: DocumentFactory) -> Self {
        NamespaceStack {
            factory,
            namespaces: vec![],
            scopes: vec![],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(self.namespaces.len());
    }

    /// Drops the innermost scope and returns what it declared.
    pub fn pop_scope(&mut self) -> Vec<Namespace> {
        match self.scopes.pop() {
            Some(start) => self.namespaces.split_off(start),
            None => vec![],
        }
    }

    pub fn declare(&mut self, prefix: &str, uri: &str) -> Namespace {
        let namespace = self.factory.create_namespace(prefix, uri);
        self.namespaces.push(namespace.clone());
        namespace
    }

    /// Declarations made in the innermost scope.
    pub fn declared_in_scope(&self) -> &[Namespace] {
        let start = self.scopes.last().copied().unwrap_or_default();
        &self.namespaces[start..]
    }

    pub fn contains(&self, namespace: &Namespace) -> bool {
        self.namespaces.iter().any(|v| v == namespace)
    }

    // -------------------------------------------------------------------------------------------

    /// Innermost declaration of `prefix`. `xml` is always bound and the
    /// empty prefix falls back to no namespace.
    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<Namespace> {
        if prefix == "xml" {
            return Some(self.factory.names().xml_namespace());
        }

        if let Some(namespace) = self.namespaces.iter().rev().find(|v| v.prefix() == prefix) {
            return Some(namespace.clone());
        }

        if prefix.is_empty() {
            Some(self.factory.names().no_namespace())
        } else {
            None
        }
    }

    pub fn uri_for_prefix(&self, prefix: &str) -> Option<String> {
        self.namespace_for_prefix(prefix)
            .map(|v| v.uri().to_string())
    }

    pub fn default_namespace(&self) -> Namespace {
        self.namespace_for_prefix("")
            .unwrap_or_else(|| self.factory.names().no_namespace())
    }

    /// Element name from parser output. When `uri` is empty the prefix of
    /// `qualified_name` is looked up in scope.
    pub fn qname(&self, uri: &str, local_name: &str, qualified_name: &str) -> error::Result<QName> {
        let (prefix, local) = split(qualified_name, local_name);

        let namespace = if uri.is_empty() {
            self.namespace_for_prefix(prefix)
                .ok_or_else(|| error::Error::UndeclaredPrefix(prefix.to_string()))?
        } else {
            self.factory.create_namespace(prefix, uri)
        };

        Ok(self.factory.create_qname(local, &namespace))
    }

    /// Attribute name from parser output. Unprefixed attributes are never
    /// in a namespace.
    pub fn attribute_qname(
        &self,
        uri: &str,
        local_name: &str,
        qualified_name: &str,
    ) -> error::Result<QName> {
        let (prefix, local) = split(qualified_name, local_name);

        if prefix.is_empty() {
            let namespace = self.factory.names().no_namespace();
            return Ok(self.factory.create_qname(local, &namespace));
        }

        self.qname(uri, local, qualified_name)
    }
}

fn split<'a>(qualified_name: &'a str, local_name: &'a str) -> (&'a str, &'a str) {
    match qualified_name.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None if local_name.is_empty() => ("", qualified_name),
        None => ("", local_name),
    }
}

// -----------------------------------------------------------------------------------------------

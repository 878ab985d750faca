use crate::error;
use ahash::AHashMap;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

pub const XML_NAMESPACE_URI: &str = "http://www.w3.org/XML/1998/namespace";

// -----------------------------------------------------------------------------------------------

struct NamespaceData {
    prefix: String,
    uri: String,
}

/// A (prefix, URI) pair. Also the node kind used for namespace declarations.
///
/// Namespaces are immutable and cheap to clone; instances obtained from a
/// [`NameCache`] are shared, so [`Namespace::ptr_eq`] is a valid fast path.
#[derive(Clone)]
pub struct Namespace(Rc<NamespaceData>);

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || (self.0.prefix == other.0.prefix && self.0.uri == other.0.uri)
    }
}

impl Eq for Namespace {}

impl Hash for Namespace {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.prefix.hash(state);
        self.0.uri.hash(state);
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("Namespace")
            .field("prefix", &self.0.prefix)
            .field("uri", &self.0.uri)
            .finish()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "{}=\"{}\"",
            self.declaration_name(),
            crate::escape_attribute(self.uri())
        )
    }
}

impl Namespace {
    /// Builds a namespace that does not go through any cache.
    pub fn new(prefix: &str, uri: &str) -> Self {
        Namespace(Rc::new(NamespaceData {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
        }))
    }

    /// Interned through the per-thread [`NameCache`].
    pub fn get(prefix: &str, uri: &str) -> Self {
        NameCache::default_instance().namespace(prefix, uri)
    }

    pub fn no_namespace() -> Self {
        NameCache::default_instance().no_namespace()
    }

    pub fn xml() -> Self {
        NameCache::default_instance().xml_namespace()
    }

    pub fn prefix(&self) -> &str {
        self.0.prefix.as_str()
    }

    pub fn uri(&self) -> &str {
        self.0.uri.as_str()
    }

    pub fn is_no_namespace(&self) -> bool {
        self.0.prefix.is_empty() && self.0.uri.is_empty()
    }

    pub fn ptr_eq(&self, other: &Namespace) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    /// `xmlns` for the default namespace, `xmlns:prefix` otherwise.
    pub fn declaration_name(&self) -> String {
        if self.0.prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", self.0.prefix)
        }
    }
}

// -----------------------------------------------------------------------------------------------

struct QNameData {
    local_name: String,
    namespace: Namespace,
    qualified_name: String,
}

/// Local name plus namespace.
///
/// Two names are equal when the local name and the namespace URI match; the
/// prefix only affects the qualified form used for output.
#[derive(Clone)]
pub struct QName(Rc<QNameData>);

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
            || (self.0.local_name == other.0.local_name
                && self.0.namespace.uri() == other.0.namespace.uri())
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.local_name.hash(state);
        self.0.namespace.uri().hash(state);
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("QName")
            .field("qualified_name", &self.0.qualified_name)
            .field("uri", &self.0.namespace.uri())
            .finish()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.0.qualified_name.as_str())
    }
}

impl QName {
    /// Builds a name that does not go through any cache.
    pub fn new(local_name: &str, namespace: Namespace) -> Self {
        let qualified_name = if namespace.prefix().is_empty() {
            local_name.to_string()
        } else {
            format!("{}:{}", namespace.prefix(), local_name)
        };
        QName(Rc::new(QNameData {
            local_name: local_name.to_string(),
            namespace,
            qualified_name,
        }))
    }

    /// Interned through the per-thread [`NameCache`].
    pub fn get(local_name: &str, namespace: &Namespace) -> Self {
        NameCache::default_instance().qname(local_name, namespace)
    }

    /// Interned name without a namespace.
    pub fn local(local_name: &str) -> Self {
        NameCache::default_instance().local_qname(local_name)
    }

    pub fn local_name(&self) -> &str {
        self.0.local_name.as_str()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.0.namespace
    }

    pub fn namespace_prefix(&self) -> &str {
        self.0.namespace.prefix()
    }

    pub fn namespace_uri(&self) -> &str {
        self.0.namespace.uri()
    }

    pub fn qualified_name(&self) -> &str {
        self.0.qualified_name.as_str()
    }

    pub fn ptr_eq(&self, other: &QName) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn matches(&self, local_name: &str, uri: &str) -> bool {
        self.local_name() == local_name && self.namespace_uri() == uri
    }
}

// -----------------------------------------------------------------------------------------------

thread_local! {
    static DEFAULT_CACHE: Rc<NameCache> = Rc::new(NameCache::new());
}

/// Interning cache for [`Namespace`] and [`QName`] values.
///
/// Namespaces are keyed by URI then prefix. Names without a namespace live in
/// a flat map; the others are keyed by namespace then local name. The cache
/// is single-threaded: every thread gets its own default instance.
pub struct NameCache {
    no_namespace: Namespace,
    xml_namespace: Namespace,
    namespaces: RefCell<AHashMap<String, AHashMap<String, Namespace>>>,
    local_names: RefCell<AHashMap<String, QName>>,
    names: RefCell<AHashMap<Namespace, AHashMap<String, QName>>>,
}

impl Default for NameCache {
    fn default() -> Self {
        NameCache::new()
    }
}

impl fmt::Debug for NameCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("NameCache")
            .field("namespaces", &self.namespace_count())
            .field("qnames", &self.qname_count())
            .finish()
    }
}

impl NameCache {
    pub fn new() -> Self {
        let no_namespace = Namespace::new("", "");
        let xml_namespace = Namespace::new("xml", XML_NAMESPACE_URI);

        let mut namespaces: AHashMap<String, AHashMap<String, Namespace>> = AHashMap::new();
        namespaces
            .entry(String::new())
            .or_default()
            .insert(String::new(), no_namespace.clone());
        namespaces
            .entry(XML_NAMESPACE_URI.to_string())
            .or_default()
            .insert("xml".to_string(), xml_namespace.clone());

        NameCache {
            no_namespace,
            xml_namespace,
            namespaces: RefCell::new(namespaces),
            local_names: RefCell::new(AHashMap::new()),
            names: RefCell::new(AHashMap::new()),
        }
    }

    /// The cache shared by everything created on the current thread.
    pub fn default_instance() -> Rc<NameCache> {
        DEFAULT_CACHE.with(Rc::clone)
    }

    pub fn no_namespace(&self) -> Namespace {
        self.no_namespace.clone()
    }

    pub fn xml_namespace(&self) -> Namespace {
        self.xml_namespace.clone()
    }

    pub fn namespace(&self, prefix: &str, uri: &str) -> Namespace {
        let mut namespaces = self.namespaces.borrow_mut();

        if let Some(ns) = namespaces.get(uri).and_then(|v| v.get(prefix)) {
            return ns.clone();
        }

        let ns = Namespace::new(prefix, uri);
        namespaces
            .entry(uri.to_string())
            .or_default()
            .insert(prefix.to_string(), ns.clone());
        ns
    }

    pub fn local_qname(&self, local_name: &str) -> QName {
        let mut names = self.local_names.borrow_mut();

        if let Some(name) = names.get(local_name) {
            return name.clone();
        }

        let name = QName::new(local_name, self.no_namespace());
        names.insert(local_name.to_string(), name.clone());
        name
    }

    pub fn qname(&self, local_name: &str, namespace: &Namespace) -> QName {
        if namespace.is_no_namespace() {
            return self.local_qname(local_name);
        }

        if let Some(name) = self
            .names
            .borrow()
            .get(namespace)
            .and_then(|v| v.get(local_name))
        {
            return name.clone();
        }

        let namespace = self.namespace(namespace.prefix(), namespace.uri());
        let name = QName::new(local_name, namespace.clone());
        self.names
            .borrow_mut()
            .entry(namespace)
            .or_default()
            .insert(local_name.to_string(), name.clone());
        name
    }

    /// Parses `prefix:local` (or `local`) and interns it in namespace `uri`.
    pub fn qualified(&self, qualified_name: &str, uri: &str) -> error::Result<QName> {
        let name = xml_nom::parse_qname(qualified_name)
            .ok_or_else(|| error::Error::InvalidName(qualified_name.to_string()))?;

        if name.is_prefixed() && uri.is_empty() {
            return Err(error::Error::UndeclaredPrefix(name.prefix().to_string()));
        }

        let namespace = self.namespace(name.prefix(), uri);
        Ok(self.qname(name.local_part(), &namespace))
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.borrow().values().map(|v| v.len()).sum()
    }

    pub fn qname_count(&self) -> usize {
        self.local_names.borrow().len()
            + self
                .names
                .borrow()
                .values()
                .map(|v| v.len())
                .sum::<usize>()
    }
}

// -----------------------------------------------------------------------------------------------

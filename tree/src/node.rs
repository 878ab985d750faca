use crate::document::XmlDocument;
use crate::element::XmlElement;
use crate::error;
use crate::name::QName;
use crate::{escape_attribute, escape_text, Node, NodeType, XmlNode};
use indexmap::IndexMap;
use nom::branch::alt;
use nom::bytes::complete::{take_till, take_till1};
use nom::character::complete::{char, multispace0};
use nom::combinator::map;
use nom::multi::many0;
use nom::sequence::{delimited, preceded, tuple};
use nom::IResult;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

pub type ValueMap = IndexMap<String, String, ahash::RandomState>;

// -----------------------------------------------------------------------------------------------

/// Back-reference held by a node.
///
/// `Shared` marks a flyweight that may appear in many trees and never tracks
/// a parent. The other states belong to nodes that support the parent
/// relationship.
#[derive(Clone, Debug, Default)]
pub(crate) enum Owner {
    #[default]
    Shared,
    Detached,
    Element(Weak<RefCell<XmlElement>>),
    Document(Weak<RefCell<XmlDocument>>),
}

impl Owner {
    pub(crate) fn supports_parent(&self) -> bool {
        !matches!(self, Owner::Shared)
    }

    pub(crate) fn is_linked(&self) -> bool {
        match self {
            Owner::Element(v) => v.strong_count() > 0,
            Owner::Document(v) => v.strong_count() > 0,
            _ => false,
        }
    }

    pub(crate) fn parent(&self) -> Option<XmlNode<XmlElement>> {
        match self {
            Owner::Element(v) => v.upgrade(),
            _ => None,
        }
    }

    pub(crate) fn document(&self) -> Option<XmlNode<XmlDocument>> {
        match self {
            Owner::Element(v) => v.upgrade().and_then(|e| e.borrow().document()),
            Owner::Document(v) => v.upgrade(),
            _ => None,
        }
    }

    pub(crate) fn is_element(&self, element: *const RefCell<XmlElement>) -> bool {
        matches!(self, Owner::Element(v) if v.as_ptr() == element)
    }

    pub(crate) fn is_document(&self, document: *const RefCell<XmlDocument>) -> bool {
        matches!(self, Owner::Document(v) if v.as_ptr() == document)
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Owner::Element(v) => match v.upgrade() {
                Some(e) => format!("element '{}'", e.borrow().qname().qualified_name()),
                None => "element".to_string(),
            },
            Owner::Document(_) => "document".to_string(),
            _ => "nothing".to_string(),
        }
    }

    /// Moves a linked node back to `Detached`; flyweights stay shared.
    pub(crate) fn release(&mut self) {
        if self.supports_parent() {
            *self = Owner::Detached;
        }
    }

    fn check_writable(&self, node: &str) -> error::Result<()> {
        if self.supports_parent() {
            Ok(())
        } else {
            Err(error::Error::read_only(node))
        }
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct XmlAttribute {
    qname: QName,
    value: String,
    owner: Owner,
}

impl PartialEq for XmlAttribute {
    fn eq(&self, other: &Self) -> bool {
        self.qname == other.qname && self.value == other.value
    }
}

impl fmt::Display for XmlAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "{}=\"{}\"",
            self.qname.qualified_name(),
            escape_attribute(self.value.as_str())
        )
    }
}

impl Node for XmlAttribute {
    fn node_type(&self) -> NodeType {
        NodeType::Attribute
    }

    fn name(&self) -> Option<&str> {
        Some(self.qname.qualified_name())
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.value.as_str())
    }

    fn supports_parent(&self) -> bool {
        self.owner.supports_parent()
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>> {
        self.owner.parent()
    }

    fn document(&self) -> Option<XmlNode<XmlDocument>> {
        self.owner.document()
    }
}

impl XmlAttribute {
    pub fn new(qname: QName, value: &str) -> Self {
        XmlAttribute {
            qname,
            value: value.to_string(),
            owner: Owner::Detached,
        }
    }

    pub fn shared(qname: QName, value: &str) -> Self {
        XmlAttribute {
            qname,
            value: value.to_string(),
            owner: Owner::Shared,
        }
    }

    pub fn qname(&self) -> &QName {
        &self.qname
    }

    pub fn local_name(&self) -> &str {
        self.qname.local_name()
    }

    pub fn qualified_name(&self) -> &str {
        self.qname.qualified_name()
    }

    pub fn namespace_uri(&self) -> &str {
        self.qname.namespace_uri()
    }

    pub fn value(&self) -> &str {
        self.value.as_str()
    }

    pub fn set_value(&mut self, value: &str) -> error::Result<()> {
        self.owner.check_writable("attribute")?;
        self.value = value.to_string();
        Ok(())
    }

    pub(crate) fn owner(&self) -> &Owner {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        if self.owner.supports_parent() {
            self.owner = owner;
        }
    }

    pub(crate) fn detached_copy(&self) -> Self {
        XmlAttribute::new(self.qname.clone(), self.value.as_str())
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct XmlCData {
    text: String,
    owner: Owner,
}

impl PartialEq for XmlCData {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl fmt::Display for XmlCData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "<![CDATA[{}]]>", self.text)
    }
}

impl Node for XmlCData {
    fn node_type(&self) -> NodeType {
        NodeType::CData
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.text.as_str())
    }

    fn supports_parent(&self) -> bool {
        self.owner.supports_parent()
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>> {
        self.owner.parent()
    }

    fn document(&self) -> Option<XmlNode<XmlDocument>> {
        self.owner.document()
    }
}

impl XmlCData {
    pub fn new(text: &str) -> Self {
        XmlCData {
            text: text.to_string(),
            owner: Owner::Detached,
        }
    }

    pub fn shared(text: &str) -> Self {
        XmlCData {
            text: text.to_string(),
            owner: Owner::Shared,
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn set_text(&mut self, text: &str) -> error::Result<()> {
        self.owner.check_writable("CDATA")?;
        self.text = text.to_string();
        Ok(())
    }

    pub fn append_text(&mut self, text: &str) -> error::Result<()> {
        self.owner.check_writable("CDATA")?;
        self.text.push_str(text);
        Ok(())
    }

    pub(crate) fn owner(&self) -> &Owner {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        if self.owner.supports_parent() {
            self.owner = owner;
        }
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct XmlComment {
    text: String,
    owner: Owner,
}

impl PartialEq for XmlComment {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl fmt::Display for XmlComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "<!--{}-->", self.text)
    }
}

impl Node for XmlComment {
    fn node_type(&self) -> NodeType {
        NodeType::Comment
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.text.as_str())
    }

    fn supports_parent(&self) -> bool {
        self.owner.supports_parent()
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>> {
        self.owner.parent()
    }

    fn document(&self) -> Option<XmlNode<XmlDocument>> {
        self.owner.document()
    }
}

impl XmlComment {
    pub fn new(text: &str) -> Self {
        XmlComment {
            text: text.to_string(),
            owner: Owner::Detached,
        }
    }

    pub fn shared(text: &str) -> Self {
        XmlComment {
            text: text.to_string(),
            owner: Owner::Shared,
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn set_text(&mut self, text: &str) -> error::Result<()> {
        self.owner.check_writable("comment")?;
        self.text = text.to_string();
        Ok(())
    }

    pub fn append_text(&mut self, text: &str) -> error::Result<()> {
        self.owner.check_writable("comment")?;
        self.text.push_str(text);
        Ok(())
    }

    pub(crate) fn owner(&self) -> &Owner {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        if self.owner.supports_parent() {
            self.owner = owner;
        }
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct XmlText {
    text: String,
    owner: Owner,
}

impl PartialEq for XmlText {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl fmt::Display for XmlText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", escape_text(self.text.as_str()))
    }
}

impl Node for XmlText {
    fn node_type(&self) -> NodeType {
        NodeType::Text
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.text.as_str())
    }

    fn supports_parent(&self) -> bool {
        self.owner.supports_parent()
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>> {
        self.owner.parent()
    }

    fn document(&self) -> Option<XmlNode<XmlDocument>> {
        self.owner.document()
    }
}

impl XmlText {
    pub fn new(text: &str) -> Self {
        XmlText {
            text: text.to_string(),
            owner: Owner::Detached,
        }
    }

    pub fn shared(text: &str) -> Self {
        XmlText {
            text: text.to_string(),
            owner: Owner::Shared,
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn set_text(&mut self, text: &str) -> error::Result<()> {
        self.owner.check_writable("text")?;
        self.text = text.to_string();
        Ok(())
    }

    pub fn append_text(&mut self, text: &str) -> error::Result<()> {
        self.owner.check_writable("text")?;
        self.text.push_str(text);
        Ok(())
    }

    pub(crate) fn owner(&self) -> &Owner {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        if self.owner.supports_parent() {
            self.owner = owner;
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// Entity reference. The replacement text of a read-only entity can be
/// assigned once, a linked entity accepts any number of updates.
#[derive(Clone, Debug)]
pub struct XmlEntity {
    name: String,
    text: Option<String>,
    owner: Owner,
}

impl PartialEq for XmlEntity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.text == other.text
    }
}

impl fmt::Display for XmlEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "&{};", self.name)
    }
}

impl Node for XmlEntity {
    fn node_type(&self) -> NodeType {
        NodeType::Entity
    }

    fn name(&self) -> Option<&str> {
        Some(self.name.as_str())
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.text.as_deref().unwrap_or_default())
    }

    fn supports_parent(&self) -> bool {
        self.owner.supports_parent()
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>> {
        self.owner.parent()
    }

    fn document(&self) -> Option<XmlNode<XmlDocument>> {
        self.owner.document()
    }
}

impl XmlEntity {
    pub fn new(name: &str, text: Option<&str>) -> Self {
        XmlEntity {
            name: name.to_string(),
            text: text.map(|v| v.to_string()),
            owner: Owner::Detached,
        }
    }

    pub fn shared(name: &str, text: Option<&str>) -> Self {
        XmlEntity {
            name: name.to_string(),
            text: text.map(|v| v.to_string()),
            owner: Owner::Shared,
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: &str) -> error::Result<()> {
        if !self.owner.supports_parent() && self.text.is_some() {
            return Err(error::Error::read_only("entity"));
        }

        self.text = Some(text.to_string());
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> error::Result<()> {
        self.owner.check_writable("entity")?;

        if !xml_nom::is_name(name) {
            return Err(error::Error::InvalidName(name.to_string()));
        }

        self.name = name.to_string();
        Ok(())
    }

    pub(crate) fn owner(&self) -> &Owner {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        if self.owner.supports_parent() {
            self.owner = owner;
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// Processing instruction. The data is kept both as raw text and as the
/// `name="value"` pairs found in it; updating one side rewrites the other.
#[derive(Clone, Debug)]
pub struct XmlProcessingInstruction {
    target: String,
    text: String,
    values: ValueMap,
    owner: Owner,
}

impl PartialEq for XmlProcessingInstruction {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.text == other.text
    }
}

impl fmt::Display for XmlProcessingInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        if self.text.is_empty() {
            write!(f, "<?{}?>", self.target)
        } else {
            write!(f, "<?{} {}?>", self.target, self.text)
        }
    }
}

impl Node for XmlProcessingInstruction {
    fn node_type(&self) -> NodeType {
        NodeType::ProcessingInstruction
    }

    fn name(&self) -> Option<&str> {
        Some(self.target.as_str())
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.text.as_str())
    }

    fn supports_parent(&self) -> bool {
        self.owner.supports_parent()
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>> {
        self.owner.parent()
    }

    fn document(&self) -> Option<XmlNode<XmlDocument>> {
        self.owner.document()
    }
}

impl XmlProcessingInstruction {
    pub fn new(target: &str, text: &str) -> Self {
        XmlProcessingInstruction {
            target: target.to_string(),
            text: text.to_string(),
            values: parse_values(text),
            owner: Owner::Detached,
        }
    }

    pub fn shared(target: &str, text: &str) -> Self {
        XmlProcessingInstruction {
            owner: Owner::Shared,
            ..XmlProcessingInstruction::new(target, text)
        }
    }

    pub fn with_values(target: &str, values: ValueMap) -> Self {
        XmlProcessingInstruction {
            target: target.to_string(),
            text: format_values(&values),
            values,
            owner: Owner::Detached,
        }
    }

    pub fn target(&self) -> &str {
        self.target.as_str()
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.as_str())
    }

    pub fn set_target(&mut self, target: &str) -> error::Result<()> {
        self.owner.check_writable("processing instruction")?;
        self.target = target.to_string();
        Ok(())
    }

    pub fn set_text(&mut self, text: &str) -> error::Result<()> {
        self.owner.check_writable("processing instruction")?;
        self.text = text.to_string();
        self.values = parse_values(text);
        Ok(())
    }

    pub fn set_value(&mut self, name: &str, value: &str) -> error::Result<()> {
        self.owner.check_writable("processing instruction")?;
        self.values.insert(name.to_string(), value.to_string());
        self.text = format_values(&self.values);
        Ok(())
    }

    pub fn remove_value(&mut self, name: &str) -> error::Result<bool> {
        self.owner.check_writable("processing instruction")?;
        let removed = self.values.shift_remove(name).is_some();
        if removed {
            self.text = format_values(&self.values);
        }
        Ok(removed)
    }

    pub(crate) fn owner(&self) -> &Owner {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        if self.owner.supports_parent() {
            self.owner = owner;
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// `<!DOCTYPE name PUBLIC "..." "...">` with optional internal subset
/// declarations kept as raw strings.
#[derive(Clone, Debug)]
pub struct XmlDocumentType {
    element_name: String,
    public_id: Option<String>,
    system_id: Option<String>,
    internal_declarations: Vec<String>,
    owner: Owner,
}

impl PartialEq for XmlDocumentType {
    fn eq(&self, other: &Self) -> bool {
        self.element_name == other.element_name
            && self.public_id == other.public_id
            && self.system_id == other.system_id
            && self.internal_declarations == other.internal_declarations
    }
}

impl fmt::Display for XmlDocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "<!DOCTYPE {}", self.element_name)?;

        match (self.public_id.as_deref(), self.system_id.as_deref()) {
            (Some(public_id), Some(system_id)) => {
                write!(f, " PUBLIC \"{}\" \"{}\"", public_id, system_id)?
            }
            (Some(public_id), None) => write!(f, " PUBLIC \"{}\"", public_id)?,
            (None, Some(system_id)) => write!(f, " SYSTEM \"{}\"", system_id)?,
            (None, None) => {}
        }

        if !self.internal_declarations.is_empty() {
            write!(f, " [")?;
            for declaration in self.internal_declarations.as_slice() {
                write!(f, "{}", declaration)?;
            }
            write!(f, "]")?;
        }

        write!(f, ">")
    }
}

impl Node for XmlDocumentType {
    fn node_type(&self) -> NodeType {
        NodeType::DocumentType
    }

    fn name(&self) -> Option<&str> {
        Some(self.element_name.as_str())
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn supports_parent(&self) -> bool {
        self.owner.supports_parent()
    }

    fn parent(&self) -> Option<XmlNode<XmlElement>> {
        None
    }

    fn document(&self) -> Option<XmlNode<XmlDocument>> {
        self.owner.document()
    }
}

impl XmlDocumentType {
    pub fn new(element_name: &str, public_id: Option<&str>, system_id: Option<&str>) -> Self {
        XmlDocumentType {
            element_name: element_name.to_string(),
            public_id: public_id.map(|v| v.to_string()),
            system_id: system_id.map(|v| v.to_string()),
            internal_declarations: vec![],
            owner: Owner::Detached,
        }
    }

    pub fn shared(element_name: &str, public_id: Option<&str>, system_id: Option<&str>) -> Self {
        XmlDocumentType {
            owner: Owner::Shared,
            ..XmlDocumentType::new(element_name, public_id, system_id)
        }
    }

    pub fn element_name(&self) -> &str {
        self.element_name.as_str()
    }

    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    pub fn internal_declarations(&self) -> &[String] {
        self.internal_declarations.as_slice()
    }

    pub fn add_internal_declaration(&mut self, declaration: &str) -> error::Result<()> {
        self.owner.check_writable("document type")?;
        self.internal_declarations.push(declaration.to_string());
        Ok(())
    }

    pub fn set_element_name(&mut self, element_name: &str) -> error::Result<()> {
        self.owner.check_writable("document type")?;
        self.element_name = element_name.to_string();
        Ok(())
    }

    pub fn set_public_id(&mut self, public_id: Option<&str>) -> error::Result<()> {
        self.owner.check_writable("document type")?;
        self.public_id = public_id.map(|v| v.to_string());
        Ok(())
    }

    pub fn set_system_id(&mut self, system_id: Option<&str>) -> error::Result<()> {
        self.owner.check_writable("document type")?;
        self.system_id = system_id.map(|v| v.to_string());
        Ok(())
    }

    pub(crate) fn owner(&self) -> &Owner {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        if self.owner.supports_parent() {
            self.owner = owner;
        }
    }

    pub(crate) fn detached_copy(&self) -> Self {
        XmlDocumentType {
            owner: Owner::Detached,
            ..self.clone()
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// Splits `a="1" b='2'` into ordered pairs. Anything that is not a pair is
/// skipped.
fn parse_values(text: &str) -> ValueMap {
    let mut values = ValueMap::default();

    if let Ok((_, pairs)) = value_pairs(text) {
        for (name, value) in pairs.into_iter().flatten() {
            values.insert(name.to_string(), value.to_string());
        }
    }

    values
}

/// (S? (Name S? '=' S? Literal | Token))*
fn value_pairs(input: &str) -> IResult<&str, Vec<Option<(&str, &str)>>> {
    many0(preceded(
        multispace0,
        alt((
            map(value_pair, Some),
            map(take_till1(|c: char| c.is_whitespace()), |_| None),
        )),
    ))(input)
}

/// Name S? '=' S? Literal
fn value_pair(input: &str) -> IResult<&str, (&str, &str)> {
    map(
        tuple((
            xml_nom::name,
            delimited(multispace0, char('='), multispace0),
            quoted,
        )),
        |(name, _, value)| (name, value),
    )(input)
}

/// '"' [^"]* '"' | "'" [^']* "'"
fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_till(|c| c == '"'), char('"')),
        delimited(char('\''), take_till(|c| c == '\''), char('\'')),
    ))(input)
}

fn format_values(values: &ValueMap) -> String {
    values
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v))
        .collect::<Vec<String>>()
        .join(" ")
}

// -----------------------------------------------------------------------------------------------

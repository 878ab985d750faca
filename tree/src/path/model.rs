use xml_nom::model::QName;

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationPath<'a> {
    pub absolute: bool,
    pub steps: Vec<Step<'a>>,
}

impl<'a> From<(bool, Vec<Step<'a>>)> for LocationPath<'a> {
    fn from(value: (bool, Vec<Step<'a>>)) -> Self {
        let (absolute, steps) = value;
        LocationPath { absolute, steps }
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct Step<'a> {
    pub axis: Axis,
    pub test: NodeTest<'a>,
    pub predicates: Vec<Predicate<'a>>,
}

impl<'a> From<(Axis, NodeTest<'a>, Vec<Predicate<'a>>)> for Step<'a> {
    fn from(value: (Axis, NodeTest<'a>, Vec<Predicate<'a>>)) -> Self {
        let (axis, test, predicates) = value;
        Step {
            axis,
            test,
            predicates,
        }
    }
}

impl<'a> From<(Axis, NodeTest<'a>)> for Step<'a> {
    fn from(value: (Axis, NodeTest<'a>)) -> Self {
        let (axis, test) = value;
        Step::from((axis, test, vec![]))
    }
}

impl<'a> Step<'a> {
    /// `//` between two steps.
    pub fn descendant_or_self() -> Self {
        Step::from((Axis::DescendantOrSelf, NodeTest::Node))
    }

    /// `..`
    pub fn parent() -> Self {
        Step::from((Axis::Parent, NodeTest::Node))
    }

    /// `.`
    pub fn current() -> Self {
        Step::from((Axis::SelfNode, NodeTest::Node))
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Axis {
    Attribute,
    #[default]
    Child,
    DescendantOrSelf,
    Parent,
    SelfNode,
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum NodeTest<'a> {
    /// `*`
    Any,
    /// `prefix:*`
    AnyInNamespace(&'a str),
    Name(QName<'a>),
    Comment,
    Node,
    ProcessingInstruction(Option<&'a str>),
    Text,
}

impl<'a> From<&'a str> for NodeTest<'a> {
    fn from(value: &'a str) -> Self {
        match value {
            "comment" => NodeTest::Comment,
            "text" => NodeTest::Text,
            "node" => NodeTest::Node,
            _ => NodeTest::Name(QName::from(value)),
        }
    }
}

impl<'a> From<QName<'a>> for NodeTest<'a> {
    fn from(value: QName<'a>) -> Self {
        NodeTest::Name(value)
    }
}

impl<'a> NodeTest<'a> {
    /// Prefix the test needs resolved before it can be matched.
    pub fn prefix(&self) -> Option<&'a str> {
        match self {
            NodeTest::AnyInNamespace(v) => Some(*v),
            NodeTest::Name(v) if v.is_prefixed() => Some(v.prefix()),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate<'a> {
    /// `[@name]` or `[@name='value']`
    Attribute(NodeTest<'a>, Option<&'a str>),
    /// `[name]` or `[name='value']`
    Child(NodeTest<'a>, Option<&'a str>),
    /// `[name()='value']`
    NameEquals(&'a str),
    /// `[n]`, counted from 1.
    Position(usize),
}

impl<'a> Predicate<'a> {
    pub fn prefix(&self) -> Option<&'a str> {
        match self {
            Predicate::Attribute(test, _) | Predicate::Child(test, _) => test.prefix(),
            _ => None,
        }
    }
}

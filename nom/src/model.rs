use std::fmt;

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrefixedName<'a> {
    pub prefix: &'a str,
    pub local_part: &'a str,
}

impl<'a> From<(&'a str, &'a str)> for PrefixedName<'a> {
    fn from(value: (&'a str, &'a str)) -> Self {
        let (prefix, local_part) = value;
        PrefixedName { prefix, local_part }
    }
}

impl<'a> fmt::Display for PrefixedName<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}:{}", self.prefix, self.local_part)
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum QName<'a> {
    Prefixed(PrefixedName<'a>),
    Unprefixed(&'a str),
}

impl<'a> Default for QName<'a> {
    fn default() -> Self {
        QName::Unprefixed("")
    }
}

impl<'a> From<PrefixedName<'a>> for QName<'a> {
    fn from(value: PrefixedName<'a>) -> Self {
        QName::Prefixed(value)
    }
}

impl<'a> From<&'a str> for QName<'a> {
    fn from(value: &'a str) -> Self {
        QName::Unprefixed(value)
    }
}

impl<'a> fmt::Display for QName<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            QName::Prefixed(v) => v.fmt(f),
            QName::Unprefixed(v) => write!(f, "{}", v),
        }
    }
}

impl<'a> QName<'a> {
    pub fn local_part(&self) -> &'a str {
        match self {
            QName::Prefixed(v) => v.local_part,
            QName::Unprefixed(v) => v,
        }
    }

    /// Empty string when the name carries no prefix.
    pub fn prefix(&self) -> &'a str {
        match self {
            QName::Prefixed(v) => v.prefix,
            QName::Unprefixed(_) => "",
        }
    }

    pub fn is_prefixed(&self) -> bool {
        matches!(self, QName::Prefixed(_))
    }
}

// -----------------------------------------------------------------------------------------------

pub mod model;
pub mod xmlchar;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::combinator::{all_consuming, map};
use nom::sequence::{preceded, tuple};
use nom::IResult;

/// NameStartChar (NameChar)*
///
/// [\[5\] Name](https://www.w3.org/TR/2008/REC-xml-20081126/#NT-Name)
pub fn name(input: &str) -> IResult<&str, &str> {
    xmlchar::name_char_except1("")(input)
}

/// Name - (Char* ':' Char*)
///
/// [\[4\] NCName](https://www.w3.org/TR/2009/REC-xml-names-20091208/#NT-NCName)
pub fn ncname(input: &str) -> IResult<&str, &str> {
    xmlchar::name_char_except1(":")(input)
}

/// PrefixedName | UnprefixedName
///
/// [\[7\] QName](https://www.w3.org/TR/2009/REC-xml-names-20091208/#NT-QName)
pub fn qname(input: &str) -> IResult<&str, model::QName<'_>> {
    alt((
        map(prefixed_name, model::QName::from),
        map(ncname, model::QName::from),
    ))(input)
}

/// Prefix ':' LocalPart
///
/// [\[8\] PrefixedName](https://www.w3.org/TR/2009/REC-xml-names-20091208/#NT-PrefixedName)
fn prefixed_name(input: &str) -> IResult<&str, model::PrefixedName> {
    map(
        tuple((ncname, preceded(tag(":"), ncname))),
        model::PrefixedName::from,
    )(input)
}

// -----------------------------------------------------------------------------------------------

/// Parses the whole of `value` as a QName.
pub fn parse_qname(value: &str) -> Option<model::QName<'_>> {
    all_consuming(qname)(value).ok().map(|(_, v)| v)
}

pub fn is_name(value: &str) -> bool {
    all_consuming(name)(value).is_ok()
}

pub fn is_ncname(value: &str) -> bool {
    all_consuming(ncname)(value).is_ok()
}

// -----------------------------------------------------------------------------------------------

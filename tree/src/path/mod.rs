mod eval;
pub mod model;

use crate::error;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_till};
use nom::character::complete::{char, digit1, multispace0};
use nom::combinator::{all_consuming, map, map_res, opt};
use nom::multi::many0;
use nom::sequence::{delimited, preceded, terminated, tuple};
use nom::IResult;
use xml_nom::{ncname, qname};

// -----------------------------------------------------------------------------------------------

pub fn parse(input: &str) -> IResult<&str, model::LocationPath> {
    location_path(input)
}

/// Parses the whole of `expr`, surrounding whitespace aside.
pub(crate) fn compile(expr: &str) -> error::Result<model::LocationPath<'_>> {
    match all_consuming(delimited(multispace0, location_path, multispace0))(expr) {
        Ok((_, path)) => Ok(path),
        Err(_) => Err(error::Error::InvalidPath(expr.to_string())),
    }
}

// -----------------------------------------------------------------------------------------------

/// '//' RelativeLocationPath | '/' RelativeLocationPath? | RelativeLocationPath
///
/// [\[1\] LocationPath](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-LocationPath)
///
/// [\[2\] AbsoluteLocationPath](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-AbsoluteLocationPath)
fn location_path(input: &str) -> IResult<&str, model::LocationPath> {
    alt((
        map(preceded(tag("//"), relative_location_path), |steps| {
            let mut all = vec![model::Step::descendant_or_self()];
            all.extend(steps);
            model::LocationPath::from((true, all))
        }),
        map(preceded(char('/'), opt(relative_location_path)), |steps| {
            model::LocationPath::from((true, steps.unwrap_or_default()))
        }),
        map(relative_location_path, |steps| {
            model::LocationPath::from((false, steps))
        }),
    ))(input)
}

/// Step | RelativeLocationPath '/' Step | RelativeLocationPath '//' Step
///
/// [\[3\] RelativeLocationPath](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-RelativeLocationPath)
fn relative_location_path(input: &str) -> IResult<&str, Vec<model::Step>> {
    map(
        tuple((
            step,
            many0(tuple((
                delimited(multispace0, alt((tag("//"), tag("/"))), multispace0),
                step,
            ))),
        )),
        |(first, rest)| {
            let mut steps = vec![first];
            for (operator, step) in rest {
                if operator == "//" {
                    steps.push(model::Step::descendant_or_self());
                }
                steps.push(step);
            }
            steps
        },
    )(input)
}

/// '..' | '.' | '@' NameTest Predicate* | NodeTest Predicate*
///
/// [\[4\] Step](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-Step)
///
/// [\[12\] AbbreviatedStep](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-AbbreviatedStep)
fn step(input: &str) -> IResult<&str, model::Step> {
    alt((
        map(tag(".."), |_| model::Step::parent()),
        map(char('.'), |_| model::Step::current()),
        map(
            tuple((
                preceded(tuple((char('@'), multispace0)), name_test),
                many0(preceded(multispace0, predicate)),
            )),
            |(test, predicates)| model::Step::from((model::Axis::Attribute, test, predicates)),
        ),
        map(
            tuple((node_test, many0(preceded(multispace0, predicate)))),
            |(test, predicates)| model::Step::from((model::Axis::Child, test, predicates)),
        ),
    ))(input)
}

/// NameTest | NodeType '(' ')' | 'processing-instruction' '(' Literal? ')'
///
/// [\[7\] NodeTest](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-NodeTest)
fn node_test(input: &str) -> IResult<&str, model::NodeTest> {
    alt((
        map(
            delimited(
                tuple((
                    tag("processing-instruction"),
                    multispace0,
                    char('('),
                    multispace0,
                )),
                opt(literal),
                tuple((multispace0, char(')'))),
            ),
            model::NodeTest::ProcessingInstruction,
        ),
        map(
            terminated(
                node_type,
                tuple((multispace0, char('('), multispace0, char(')'))),
            ),
            model::NodeTest::from,
        ),
        name_test,
    ))(input)
}

/// '[' PredicateExpr ']'
///
/// [\[8\] Predicate](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-Predicate)
fn predicate(input: &str) -> IResult<&str, model::Predicate> {
    delimited(
        tuple((char('['), multispace0)),
        predicate_expr,
        tuple((multispace0, char(']'))),
    )(input)
}

/// Digits | 'name()' '=' Literal | '@' NameTest ('=' Literal)? | NodeTest ('=' Literal)?
///
/// A subset of [\[9\] PredicateExpr](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-PredicateExpr).
fn predicate_expr(input: &str) -> IResult<&str, model::Predicate> {
    alt((
        map_res(digit1, |v: &str| v.parse::<usize>().map(model::Predicate::Position)),
        map(
            preceded(
                tuple((
                    tag("name"),
                    multispace0,
                    char('('),
                    multispace0,
                    char(')'),
                )),
                equals_literal,
            ),
            model::Predicate::NameEquals,
        ),
        map(
            tuple((
                preceded(tuple((char('@'), multispace0)), name_test),
                opt(equals_literal),
            )),
            |(test, value)| model::Predicate::Attribute(test, value),
        ),
        map(tuple((node_test, opt(equals_literal))), |(test, value)| {
            model::Predicate::Child(test, value)
        }),
    ))(input)
}

/// '=' Literal
fn equals_literal(input: &str) -> IResult<&str, &str> {
    preceded(tuple((multispace0, char('='), multispace0)), literal)(input)
}

/// '"' [^"]* '"' | "'" [^']* "'"
///
/// [\[29\] Literal](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-Literal)
fn literal(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_till(|c| c == '"'), char('"')),
        delimited(char('\''), take_till(|c| c == '\''), char('\'')),
    ))(input)
}

/// '*' | NCName ':' '*' | QName
///
/// [\[37\] NameTest](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-NameTest)
fn name_test(input: &str) -> IResult<&str, model::NodeTest> {
    alt((
        map(char('*'), |_| model::NodeTest::Any),
        map(terminated(ncname, tag(":*")), model::NodeTest::AnyInNamespace),
        map(qname, model::NodeTest::from),
    ))(input)
}

/// 'comment' | 'text' | 'node'
///
/// [\[38\] NodeType](https://www.w3.org/TR/1999/REC-xpath-19991116/#NT-NodeType)
fn node_type(input: &str) -> IResult<&str, &str> {
    alt((tag("comment"), tag("text"), tag("node")))(input)
}

// -----------------------------------------------------------------------------------------------

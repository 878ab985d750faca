use nom::character::complete::satisfy;
use nom::combinator::recognize;
use nom::bytes::complete::take_while;
use nom::sequence::pair;
use nom::IResult;

// -----------------------------------------------------------------------------------------------

/// ":" | [A-Z] | "_" | [a-z] | [#xC0-#xD6] | [#xD8-#xF6] | [#xF8-#x2FF] | [#x370-#x37D] |
/// [#x37F-#x1FFF] | [#x200C-#x200D] | [#x2070-#x218F] | [#x2C00-#x2FEF] | [#x3001-#xD7FF] |
/// [#xF900-#xFDCF] | [#xFDF0-#xFFFD] | [#x10000-#xEFFFF]
///
/// [\[4\] NameStartChar](https://www.w3.org/TR/2008/REC-xml-20081126/#NT-NameStartChar)
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':'
        | 'A'..='Z'
        | '_'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// NameStartChar | "-" | "." | [0-9] | #xB7 | [#x0300-#x036F] | [#x203F-#x2040]
///
/// [\[4a\] NameChar](https://www.w3.org/TR/2008/REC-xml-20081126/#NT-NameChar)
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-'
            | '.'
            | '0'..='9'
            | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

/// S ::= (#x20 | #x9 | #xD | #xA)+
///
/// [\[3\] S](https://www.w3.org/TR/2008/REC-xml-20081126/#NT-S)
pub fn is_whitespace(c: char) -> bool {
    matches!(c, '\u{20}' | '\u{9}' | '\u{D}' | '\u{A}')
}

// -----------------------------------------------------------------------------------------------

/// NameStartChar (NameChar)*, optionally excluding some characters.
pub fn name_char_except1(except: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input: &str| {
        recognize(pair(
            satisfy(|c| is_name_start_char(c) && !except.contains(c)),
            take_while(|c| is_name_char(c) && !except.contains(c)),
        ))(input)
    }
}

// -----------------------------------------------------------------------------------------------

//! Parser for the host's address syntax:
//!
//! ```text
//! address = object "." label group*
//! group   = "[" item ("," item)* "]"
//! item    = "*" | range | number
//! range   = [number] ":" [number] [":" number]
//! ```
//!
//! A number containing `.`, `e` or `E` is a real; anything else is an
//! integer. A group holding more than one item parses to a nested
//! entry. Whitespace is insignificant.

use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::char;
use nom::combinator::all_consuming;
use nom::combinator::map;
use nom::combinator::map_res;
use nom::combinator::opt;
use nom::error::Error;
use nom::error::ErrorKind;
use nom::multi::many0;
use nom::multi::separated_list1;
use nom::number::complete::recognize_float;
use nom::sequence::delimited;
use nom::sequence::preceded;
use nom::sequence::tuple;

use crate::address::Address;
use crate::error::ComponentError;
use crate::index::IndexEntry;
use crate::index::Range;
use crate::index::Scalar;

/// Parses a single number.
pub fn number(input: &str) -> IResult<&str, Scalar> {
    map_res(recognize_float, |s: &str| {
        if s.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
            s.parse::<f64>()
                .map(Scalar::Real)
                .map_err(|e| e.to_string())
        } else {
            s.parse::<i64>().map(Scalar::Int).map_err(|e| e.to_string())
        }
    })(input)
}

fn range_or_scalar(input: &str) -> IResult<&str, IndexEntry> {
    let (input, start) = opt(number)(input)?;
    let (input, colon) = opt(char(':'))(input)?;
    if colon.is_none() {
        return match start {
            Some(value) => Ok((input, IndexEntry::Scalar(value))),
            None => Err(nom::Err::Error(Error::new(input, ErrorKind::Digit))),
        };
    }
    let (input, stop) = opt(number)(input)?;
    let (input, step) = opt(preceded(char(':'), number))(input)?;
    Ok((input, Range(start, stop, step).into()))
}

fn item(input: &str) -> IResult<&str, IndexEntry> {
    alt((map(char('*'), |_| IndexEntry::Wildcard), range_or_scalar))(input)
}

/// Parses one bracketed group.
pub fn group(input: &str) -> IResult<&str, IndexEntry> {
    map(
        delimited(char('['), separated_list1(char(','), item), char(']')),
        |mut items| {
            if items.len() == 1 {
                items.remove(0)
            } else {
                IndexEntry::Nested(items)
            }
        },
    )(input)
}

fn object(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c != '.' && c != '[')(input)
}

fn label(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// Parses a complete address, without surrounding whitespace
/// handling. See [`parse_address`].
pub fn address(input: &str) -> IResult<&str, Address> {
    map(
        tuple((object, char('.'), label, many0(group))),
        |(object, _, label, groups)| Address::new(object, label, groups),
    )(input)
}

/// Parses `input` as an address, ignoring whitespace.
pub fn parse_address(input: &str) -> Result<Address, ComponentError> {
    let stripped: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let (_, address) =
        all_consuming(address)(&stripped).map_err(|err| ComponentError::Parse {
            input: input.to_string(),
            reason: err.to_string(),
        })?;
    Ok(address)
}

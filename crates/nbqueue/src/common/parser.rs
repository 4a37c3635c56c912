use nom::IResult;
use nom::error::{ErrorKind, ParseError};

/// Position at which a template stopped matching the expected syntax.
#[derive(Debug, PartialEq, Eq)]
pub struct ParserError<I> {
    pub input: I,
    pub kind: ErrorKind,
}

impl<I> ParseError<I> for ParserError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        ParserError { input, kind }
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}

pub type NomResult<'a, Ret> = IResult<&'a str, Ret, ParserError<&'a str>>;

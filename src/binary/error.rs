use nom::error::{ErrorKind, ParseError};
use thiserror::Error;

use super::section::SectionCode;

pub type Res<'a, T> = nom::IResult<&'a [u8], T, DecodeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed encoding: {width} consumed {len} bytes")]
    MalformedEncoding { width: &'static str, len: usize },
    #[error("integer overflow")]
    Overflow,
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("invalid magic number ({0:?})")]
    InvalidMagic([u8; 4]),
    #[error("invalid section id ({0})")]
    InvalidSectionId(u8),
    #[error("invalid external kind ({0})")]
    InvalidExternalKind(u8),
    #[error("invalid opcode ({0:#04x})")]
    InvalidOpcode(u8),
    #[error("invalid value type ({0})")]
    InvalidValueType(i64),
    #[error("invalid type constructor ({0})")]
    InvalidTypeForm(i64),
    #[error("function type declares {0} results")]
    TooManyResults(u32),
    #[error("{remaining} bytes unread in {section:?} section")]
    TrailingBytes {
        section: SectionCode,
        remaining: usize,
    },
    #[error("export {what} of {len} exceeds the limit of {max}")]
    ExportBound {
        what: &'static str,
        len: usize,
        max: usize,
    },
    #[error("parser error: {0:?}")]
    Nom(ErrorKind),
    #[error("section {id} at offset {offset:#x}: {source}")]
    Section {
        id: u8,
        offset: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub(crate) fn in_section(self, id: u8, offset: usize) -> Self {
        Self::Section {
            id,
            offset,
            source: Box::new(self),
        }
    }

    /// Strips the section context and returns the error that stopped decoding.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            Self::Section { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl<I> ParseError<I> for DecodeError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Eof | ErrorKind::Complete => Self::UnexpectedEnd,
            kind => Self::Nom(kind),
        }
    }

    fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<nom::Err<DecodeError>> for DecodeError {
    fn from(err: nom::Err<DecodeError>) -> Self {
        match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
            nom::Err::Incomplete(_) => Self::UnexpectedEnd,
        }
    }
}

pub(crate) fn fail<'a, T>(err: DecodeError) -> Res<'a, T> {
    Err(nom::Err::Failure(err))
}

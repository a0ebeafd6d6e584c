use std::fmt;

use crate::model::enums::Extension;
use crate::sieve::lexer::LexError;

/// Everything that can go wrong while compiling a script.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unexpected end of script, expected {0}")]
    UnexpectedEof(&'static str),
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unsupported feature \"{0}\" in require")]
    UnsupportedExtension(String),
    #[error("{0} MUST be enabled with \"require\"")]
    ExtensionNotEnabled(Extension),
    #[error("require must come before any other command")]
    MisplacedRequire,
    #[error("duplicate {0}")]
    DuplicateTag(&'static str),
    #[error(transparent)]
    InvalidLiteral(#[from] LiteralError),
    #[error("unable to find a compatible comparator")]
    NoCompatibleComparator,
    #[error("blocks and tests nested more than {0} levels deep")]
    NestingTooDeep(usize),
}

impl CompileError {
    /// Fatal errors abort the whole compilation instead of skipping to the
    /// next statement.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Lex(_) | Self::UnexpectedEof(_) | Self::NestingTooDeep(_)
        )
    }
}

/// Rejection reasons of the literal validators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiteralError {
    #[error("string '{0}': not valid utf8")]
    NotUtf8(String),
    #[error("header '{0}': not a valid header")]
    InvalidHeader(String),
    #[error("header '{0}': not a valid header for an address test")]
    InvalidAddressHeader(String),
    #[error("env-part '{0}': not a valid part for an envelope test")]
    InvalidEnvelopePart(String),
    #[error("flag '{0}': not a system flag")]
    NotSystemFlag(String),
    #[error("flag '{0}': not a valid keyword")]
    InvalidKeyword(String),
    #[error("'{0}': not a valid relational operation")]
    InvalidRelation(String),
    #[error("regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
    #[error("address '{0}': not a valid address")]
    InvalidAddress(String),
}

/// A defect reported while compiling, with the line it was detected on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub error: CompileError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

impl std::error::Error for Diagnostic {}

/// AST node types for compiled SIEVE scripts (RFC 5228 and extensions).
///
/// A compiled script is a block: the ordered list of its top-level commands.
use serde::Serialize;

use crate::model::enums::{
    AddressPartType, Comparator, IncludeLocation, MatchType, Priority, SizeComparator,
};

pub type Block = Vec<Command>;

/// A command in a SIEVE script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Command {
    Keep,
    Stop,
    Discard,
    /// `fileinto [:copy] "mailbox";`
    Fileinto { copy: bool, mailbox: String },
    /// `redirect [:copy] "address";`
    Redirect { copy: bool, address: String },
    /// `reject "reason";`
    Reject(String),
    Vacation(Vacation),
    SetFlag(Vec<String>),
    AddFlag(Vec<String>),
    RemoveFlag(Vec<String>),
    Mark,
    Unmark,
    Notify(Notify),
    Denotify(Denotify),
    /// `include [:personal|:global] "name";`
    Include {
        location: IncludeLocation,
        script: String,
    },
    Return,
    /// `if <test> { ... }` with an optional elsif/else chain
    If(IfBlock),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfBlock {
    pub condition: TestExpr,
    pub then_block: Block,
    /// Empty when there is no `else`. An `elsif` is a nested `If` here.
    pub else_block: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vacation {
    pub days: u64,
    pub addresses: Vec<String>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub handle: Option<String>,
    pub mime: bool,
    /// Response body. Checked UTF-8 text, or the raw MIME entity when
    /// `mime` is set.
    pub reason: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notify {
    pub method: String,
    pub id: Option<String>,
    pub options: Vec<String>,
    pub priority: Priority,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Denotify {
    /// `None` cancels every pending notification.
    pub pattern: Option<DenotifyPattern>,
    /// `None` matches notifications of any priority.
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenotifyPattern {
    pub comparison: Comparison,
    pub pattern: String,
}

/// The resolved comparator and the way it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub comparator: Comparator,
    pub match_type: MatchType,
}

/// A test expression in an if/elsif condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TestExpr {
    /// `allof (test1, test2, ...)`
    AllOf(Vec<TestExpr>),
    /// `anyof (test1, test2, ...)`
    AnyOf(Vec<TestExpr>),
    /// `not <test>`
    Not(Box<TestExpr>),
    /// `exists ["Header", ...]`
    Exists(Vec<String>),
    True,
    False,
    Address(AddressTest),
    Envelope(AddressTest),
    /// `header [:comparator] [:match_type] <headers> <keys>`
    Header {
        comparison: Comparison,
        header_names: Vec<String>,
        keys: Vec<String>,
    },
    /// `body [:comparator] [:match_type] [transform] <keys>`
    Body {
        transform: BodyTransform,
        comparison: Comparison,
        keys: Vec<String>,
    },
    /// `size :over/:under <limit>`
    Size { comparator: SizeComparator, limit: u64 },
}

/// Shared payload of `address` and `envelope`. For `envelope` the
/// header names are envelope parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressTest {
    pub address_part: AddressPartType,
    pub comparison: Comparison,
    pub header_names: Vec<String>,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BodyTransform {
    Raw,
    Text,
    /// `:content ["type", ...]`
    Content(Vec<String>),
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a comparator is applied to the key list of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Is,
    Contains,
    Matches,
    Regex,
    /// `:count "<op>"` from the relational extension (RFC 5231).
    Count(RelationalOp),
    /// `:value "<op>"` from the relational extension (RFC 5231).
    Value(RelationalOp),
}

impl MatchType {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Is => ":is",
            Self::Contains => ":contains",
            Self::Matches => ":matches",
            Self::Regex => ":regex",
            Self::Count(_) => ":count",
            Self::Value(_) => ":value",
        }
    }

    /// Parses the plain match-type tags. The relational tags carry an
    /// operator argument and are handled separately.
    pub fn from_sieve(s: &str) -> Option<Self> {
        match s {
            ":is" => Some(Self::Is),
            ":contains" => Some(Self::Contains),
            ":matches" => Some(Self::Matches),
            ":regex" => Some(Self::Regex),
            _ => None,
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(op) | Self::Value(op) => write!(f, "{} \"{op}\"", self.as_sieve()),
            _ => f.write_str(self.as_sieve()),
        }
    }
}

/// Relational operator of `:count` / `:value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationalOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl RelationalOp {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Eq => "eq",
            Self::Ne => "ne",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            _ => None,
        }
    }
}

impl fmt::Display for RelationalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

/// Registered comparators the interpreter knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    Octet,
    AsciiCasemap,
    AsciiNumeric,
}

impl Comparator {
    pub const DEFAULT: Self = Self::AsciiCasemap;

    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Octet => "i;octet",
            Self::AsciiCasemap => "i;ascii-casemap",
            Self::AsciiNumeric => "i;ascii-numeric",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s {
            "i;octet" => Some(Self::Octet),
            "i;ascii-casemap" => Some(Self::AsciiCasemap),
            "i;ascii-numeric" => Some(Self::AsciiNumeric),
            _ => None,
        }
    }

    pub fn supports(&self, match_type: MatchType) -> bool {
        match self {
            Self::Octet | Self::AsciiCasemap => true,
            Self::AsciiNumeric => matches!(
                match_type,
                MatchType::Is | MatchType::Count(_) | MatchType::Value(_)
            ),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressPartType {
    All,
    Localpart,
    Domain,
    /// `:user` from the subaddress extension (RFC 5233).
    User,
    /// `:detail` from the subaddress extension (RFC 5233).
    Detail,
}

impl AddressPartType {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::All => ":all",
            Self::Localpart => ":localpart",
            Self::Domain => ":domain",
            Self::User => ":user",
            Self::Detail => ":detail",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s {
            ":all" => Some(Self::All),
            ":localpart" => Some(Self::Localpart),
            ":domain" => Some(Self::Domain),
            ":user" => Some(Self::User),
            ":detail" => Some(Self::Detail),
            _ => None,
        }
    }

    pub fn is_subaddress(&self) -> bool {
        matches!(self, Self::User | Self::Detail)
    }
}

impl fmt::Display for AddressPartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeComparator {
    Over,
    Under,
}

impl SizeComparator {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Over => ":over",
            Self::Under => ":under",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s {
            ":over" => Some(Self::Over),
            ":under" => Some(Self::Under),
            _ => None,
        }
    }
}

impl fmt::Display for SizeComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

/// Notification priority used by `notify` and `denotify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Low => ":low",
            Self::Normal => ":normal",
            Self::High => ":high",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s {
            ":low" => Some(Self::Low),
            ":normal" => Some(Self::Normal),
            ":high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncludeLocation {
    Personal,
    Global,
}

impl IncludeLocation {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Personal => ":personal",
            Self::Global => ":global",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s {
            ":personal" => Some(Self::Personal),
            ":global" => Some(Self::Global),
            _ => None,
        }
    }
}

impl fmt::Display for IncludeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

/// Optional capabilities a script has to declare with `require`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Extension {
    Fileinto,
    Reject,
    Envelope,
    Body,
    Vacation,
    Imapflags,
    Notify,
    Subaddress,
    Relational,
    Regex,
    Copy,
    Include,
    ComparatorAsciiNumeric,
}

impl Extension {
    pub const ALL: [Self; 13] = [
        Self::Fileinto,
        Self::Reject,
        Self::Envelope,
        Self::Body,
        Self::Vacation,
        Self::Imapflags,
        Self::Notify,
        Self::Subaddress,
        Self::Relational,
        Self::Regex,
        Self::Copy,
        Self::Include,
        Self::ComparatorAsciiNumeric,
    ];

    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Fileinto => "fileinto",
            Self::Reject => "reject",
            Self::Envelope => "envelope",
            Self::Body => "body",
            Self::Vacation => "vacation",
            Self::Imapflags => "imapflags",
            Self::Notify => "notify",
            Self::Subaddress => "subaddress",
            Self::Relational => "relational",
            Self::Regex => "regex",
            Self::Copy => "copy",
            Self::Include => "include",
            Self::ComparatorAsciiNumeric => "comparator-i;ascii-numeric",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ext| ext.as_sieve() == s)
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

/// Command keywords, excluding the control structures `require`, `if`,
/// `elsif` and `else`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Keep,
    Stop,
    Discard,
    Fileinto,
    Redirect,
    Reject,
    Vacation,
    Setflag,
    Addflag,
    Removeflag,
    Mark,
    Unmark,
    Notify,
    Denotify,
    Include,
    Return,
}

impl ActionType {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Stop => "stop",
            Self::Discard => "discard",
            Self::Fileinto => "fileinto",
            Self::Redirect => "redirect",
            Self::Reject => "reject",
            Self::Vacation => "vacation",
            Self::Setflag => "setflag",
            Self::Addflag => "addflag",
            Self::Removeflag => "removeflag",
            Self::Mark => "mark",
            Self::Unmark => "unmark",
            Self::Notify => "notify",
            Self::Denotify => "denotify",
            Self::Include => "include",
            Self::Return => "return",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "keep" => Some(Self::Keep),
            "stop" => Some(Self::Stop),
            "discard" => Some(Self::Discard),
            "fileinto" => Some(Self::Fileinto),
            "redirect" => Some(Self::Redirect),
            "reject" => Some(Self::Reject),
            "vacation" => Some(Self::Vacation),
            "setflag" => Some(Self::Setflag),
            "addflag" => Some(Self::Addflag),
            "removeflag" => Some(Self::Removeflag),
            "mark" => Some(Self::Mark),
            "unmark" => Some(Self::Unmark),
            "notify" => Some(Self::Notify),
            "denotify" => Some(Self::Denotify),
            "include" => Some(Self::Include),
            "return" => Some(Self::Return),
            _ => None,
        }
    }

    /// The extension that must be declared before the command may be used.
    pub fn extension(&self) -> Option<Extension> {
        match self {
            Self::Keep | Self::Stop | Self::Discard | Self::Redirect => None,
            Self::Fileinto => Some(Extension::Fileinto),
            Self::Reject => Some(Extension::Reject),
            Self::Vacation => Some(Extension::Vacation),
            Self::Setflag | Self::Addflag | Self::Removeflag | Self::Mark | Self::Unmark => {
                Some(Extension::Imapflags)
            }
            Self::Notify | Self::Denotify => Some(Extension::Notify),
            Self::Include | Self::Return => Some(Extension::Include),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionTest {
    Header,
    Address,
    Envelope,
    Size,
    Exists,
    True,
    False,
    Not,
    Body,
    AnyOf,
    AllOf,
}

impl ConditionTest {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Address => "address",
            Self::Envelope => "envelope",
            Self::Size => "size",
            Self::Exists => "exists",
            Self::True => "true",
            Self::False => "false",
            Self::Not => "not",
            Self::Body => "body",
            Self::AnyOf => "anyof",
            Self::AllOf => "allof",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "header" => Some(Self::Header),
            "address" => Some(Self::Address),
            "envelope" => Some(Self::Envelope),
            "size" => Some(Self::Size),
            "exists" => Some(Self::Exists),
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "not" => Some(Self::Not),
            "body" => Some(Self::Body),
            "anyof" => Some(Self::AnyOf),
            "allof" => Some(Self::AllOf),
            _ => None,
        }
    }

    pub fn extension(&self) -> Option<Extension> {
        match self {
            Self::Envelope => Some(Extension::Envelope),
            Self::Body => Some(Extension::Body),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

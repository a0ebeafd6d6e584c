/// Argument aggregators.
///
/// Each test or action that takes optional tagged arguments collects them
/// into one of these records while its tags are parsed. Tags may come in
/// any order, but each only once. Once the tag list is complete the record
/// is canonicalized: unset fields take their defaults and the result moves
/// into the AST builder.
use crate::config::VacationLimits;
use crate::model::enums::{
    AddressPartType, Comparator, Extension, MatchType, Priority, RelationalOp,
};
use crate::sieve::ast::BodyTransform;
use crate::sieve::error::CompileError;
use crate::sieve::validate;

const DEFAULT_NOTIFY_METHOD: &str = "default";
const DEFAULT_NOTIFY_MESSAGE: &str = "$from$: $subject$";

/// Stores `value` in an unset slot, or reports `what` as a duplicate.
pub(crate) fn assign<T>(
    slot: &mut Option<T>,
    value: T,
    what: &'static str,
) -> Result<(), CompileError> {
    if slot.is_some() {
        return Err(CompileError::DuplicateTag(what));
    }
    *slot = Some(value);
    Ok(())
}

/// `:is`/`:contains`/`:matches`/`:regex`/`:count`/`:value` and
/// `:comparator`, shared by every comparator-bearing construct.
#[derive(Debug, Default)]
pub struct ComparisonTags {
    match_type: Option<MatchType>,
    comparator: Option<String>,
}

/// A comparison whose comparator name has not been resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonComparison {
    pub comparator: String,
    pub match_type: MatchType,
}

impl ComparisonTags {
    pub fn set_match_type(&mut self, match_type: MatchType) -> Result<(), CompileError> {
        assign(&mut self.match_type, match_type, "comparator type tag")
    }

    /// `:count "op"` / `:value "op"`. The duplicate check comes before the
    /// operator is validated.
    pub fn set_relational(
        &mut self,
        make: fn(RelationalOp) -> MatchType,
        op: &str,
    ) -> Result<(), CompileError> {
        if self.match_type.is_some() {
            return Err(CompileError::DuplicateTag("comparator type tag"));
        }
        self.match_type = Some(make(validate::relational(op)?));
        Ok(())
    }

    /// `:comparator "name"`. `numeric_enabled` says whether
    /// `comparator-i;ascii-numeric` was declared.
    pub fn set_comparator(&mut self, name: String, numeric_enabled: bool) -> Result<(), CompileError> {
        if self.comparator.is_some() {
            return Err(CompileError::DuplicateTag("comparator tag"));
        }
        if name == Comparator::AsciiNumeric.as_sieve() && !numeric_enabled {
            return Err(CompileError::ExtensionNotEnabled(
                Extension::ComparatorAsciiNumeric,
            ));
        }
        self.comparator = Some(name);
        Ok(())
    }

    pub fn canonicalize(self) -> CanonComparison {
        CanonComparison {
            comparator: self
                .comparator
                .unwrap_or_else(|| Comparator::DEFAULT.as_sieve().to_string()),
            match_type: self.match_type.unwrap_or(MatchType::Is),
        }
    }
}

/// Tags of `address` and `envelope`.
#[derive(Debug, Default)]
pub struct AddressTags {
    address_part: Option<AddressPartType>,
    pub comparison: ComparisonTags,
}

pub struct CanonAddressTags {
    pub address_part: AddressPartType,
    pub comparison: CanonComparison,
}

impl AddressTags {
    pub fn set_address_part(&mut self, part: AddressPartType) -> Result<(), CompileError> {
        assign(&mut self.address_part, part, "or conflicting address part tag")
    }

    pub fn canonicalize(self) -> CanonAddressTags {
        CanonAddressTags {
            address_part: self.address_part.unwrap_or(AddressPartType::All),
            comparison: self.comparison.canonicalize(),
        }
    }
}

/// Tags of `header`.
#[derive(Debug, Default)]
pub struct HeaderTags {
    pub comparison: ComparisonTags,
}

impl HeaderTags {
    pub fn canonicalize(self) -> CanonComparison {
        self.comparison.canonicalize()
    }
}

/// Tags of `body`.
#[derive(Debug, Default)]
pub struct BodyTags {
    transform: Option<BodyTransform>,
    pub comparison: ComparisonTags,
}

pub struct CanonBodyTags {
    pub transform: BodyTransform,
    pub comparison: CanonComparison,
}

impl BodyTags {
    /// `:raw`, `:text` or `:content [types]`; only one of them.
    pub fn set_transform(&mut self, transform: BodyTransform) -> Result<(), CompileError> {
        assign(&mut self.transform, transform, "or conflicting transform tag")
    }

    pub fn canonicalize(self) -> CanonBodyTags {
        CanonBodyTags {
            transform: self.transform.unwrap_or(BodyTransform::Text),
            comparison: self.comparison.canonicalize(),
        }
    }
}

/// Tags of `vacation`.
#[derive(Debug, Default)]
pub struct VacationTags {
    days: Option<u64>,
    addresses: Option<Vec<String>>,
    subject: Option<String>,
    from: Option<String>,
    handle: Option<String>,
    mime: Option<()>,
}

pub struct CanonVacationTags {
    pub days: u64,
    pub addresses: Vec<String>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub handle: Option<String>,
    pub mime: bool,
}

impl VacationTags {
    pub fn set_days(&mut self, days: u64) -> Result<(), CompileError> {
        assign(&mut self.days, days, ":days")
    }

    pub fn set_addresses(&mut self, addresses: Vec<String>) -> Result<(), CompileError> {
        assign(&mut self.addresses, addresses, ":addresses")
    }

    pub fn set_subject(&mut self, subject: String) -> Result<(), CompileError> {
        assign(&mut self.subject, subject, ":subject")
    }

    pub fn set_from(&mut self, from: String) -> Result<(), CompileError> {
        assign(&mut self.from, from, ":from")
    }

    pub fn set_handle(&mut self, handle: String) -> Result<(), CompileError> {
        assign(&mut self.handle, handle, ":handle")
    }

    pub fn set_mime(&mut self) -> Result<(), CompileError> {
        assign(&mut self.mime, (), ":mime")
    }

    /// `:mime` means the reason is a MIME entity rather than UTF-8 text.
    pub fn is_mime(&self) -> bool {
        self.mime.is_some()
    }

    pub fn canonicalize(self, limits: &VacationLimits) -> CanonVacationTags {
        CanonVacationTags {
            days: limits.resolve(self.days),
            addresses: self.addresses.unwrap_or_default(),
            subject: self.subject,
            from: self.from,
            handle: self.handle,
            mime: self.mime.is_some(),
        }
    }
}

/// Tags of `notify`.
#[derive(Debug, Default)]
pub struct NotifyTags {
    method: Option<String>,
    id: Option<String>,
    options: Option<Vec<String>>,
    priority: Option<Priority>,
    message: Option<String>,
}

pub struct CanonNotifyTags {
    pub method: String,
    pub id: Option<String>,
    pub options: Vec<String>,
    pub priority: Priority,
    pub message: String,
}

impl NotifyTags {
    pub fn set_method(&mut self, method: String) -> Result<(), CompileError> {
        assign(&mut self.method, method, ":method")
    }

    pub fn set_id(&mut self, id: String) -> Result<(), CompileError> {
        assign(&mut self.id, id, ":id")
    }

    pub fn set_options(&mut self, options: Vec<String>) -> Result<(), CompileError> {
        assign(&mut self.options, options, ":options")
    }

    pub fn set_priority(&mut self, priority: Priority) -> Result<(), CompileError> {
        assign(&mut self.priority, priority, "priority")
    }

    pub fn set_message(&mut self, message: String) -> Result<(), CompileError> {
        assign(&mut self.message, message, ":message")
    }

    pub fn canonicalize(self) -> CanonNotifyTags {
        CanonNotifyTags {
            method: self
                .method
                .unwrap_or_else(|| DEFAULT_NOTIFY_METHOD.to_string()),
            id: self.id,
            options: self.options.unwrap_or_default(),
            priority: self.priority.unwrap_or(Priority::Normal),
            message: self
                .message
                .unwrap_or_else(|| DEFAULT_NOTIFY_MESSAGE.to_string()),
        }
    }
}

/// Tags of `denotify`. The comparator is always `i;ascii-casemap`, so only
/// the match type and its pattern are collected.
#[derive(Debug, Default)]
pub struct DenotifyTags {
    matcher: Option<(MatchType, String)>,
    priority: Option<Priority>,
}

pub struct CanonDenotifyTags {
    pub matcher: Option<CanonDenotifyMatch>,
    pub priority: Option<Priority>,
}

pub struct CanonDenotifyMatch {
    pub comparison: CanonComparison,
    pub pattern: String,
}

impl DenotifyTags {
    pub fn set_priority(&mut self, priority: Priority) -> Result<(), CompileError> {
        assign(&mut self.priority, priority, "priority")
    }

    pub fn set_match(&mut self, match_type: MatchType, pattern: String) -> Result<(), CompileError> {
        assign(&mut self.matcher, (match_type, pattern), "comparator type tag")
    }

    /// Duplicate check for the relational form, made before its operator
    /// and pattern are read.
    pub fn has_match(&self) -> bool {
        self.matcher.is_some()
    }

    pub fn canonicalize(self) -> CanonDenotifyTags {
        CanonDenotifyTags {
            matcher: self.matcher.map(|(match_type, pattern)| CanonDenotifyMatch {
                comparison: CanonComparison {
                    comparator: Comparator::DEFAULT.as_sieve().to_string(),
                    match_type,
                },
                pattern,
            }),
            priority: self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sieve::error::LiteralError;

    #[test]
    fn test_comparison_defaults() {
        let canon = HeaderTags::default().canonicalize();
        assert_eq!(canon.comparator, "i;ascii-casemap");
        assert_eq!(canon.match_type, MatchType::Is);
    }

    #[test]
    fn test_duplicate_match_type() {
        let mut tags = ComparisonTags::default();
        tags.set_match_type(MatchType::Contains).unwrap();
        assert_eq!(
            tags.set_match_type(MatchType::Is),
            Err(CompileError::DuplicateTag("comparator type tag"))
        );
        // a relational tag conflicts with an existing match type too,
        // and the duplicate wins over the bad operator
        assert_eq!(
            tags.set_relational(MatchType::Count, "bogus"),
            Err(CompileError::DuplicateTag("comparator type tag"))
        );
        assert_eq!(tags.canonicalize().match_type, MatchType::Contains);
    }

    #[test]
    fn test_relational_operator_checked() {
        let mut tags = ComparisonTags::default();
        assert_eq!(
            tags.set_relational(MatchType::Value, "foo"),
            Err(CompileError::InvalidLiteral(LiteralError::InvalidRelation(
                "foo".to_string()
            )))
        );
        tags.set_relational(MatchType::Value, "GE").unwrap();
        assert_eq!(
            tags.canonicalize().match_type,
            MatchType::Value(RelationalOp::Ge)
        );
    }

    #[test]
    fn test_comparator_tag() {
        let mut tags = ComparisonTags::default();
        assert_eq!(
            tags.set_comparator("i;ascii-numeric".to_string(), false),
            Err(CompileError::ExtensionNotEnabled(
                Extension::ComparatorAsciiNumeric
            ))
        );
        tags.set_comparator("i;octet".to_string(), false).unwrap();
        assert_eq!(
            tags.set_comparator("i;ascii-numeric".to_string(), false),
            Err(CompileError::DuplicateTag("comparator tag"))
        );
        assert_eq!(tags.canonicalize().comparator, "i;octet");
    }

    #[test]
    fn test_address_part() {
        let mut tags = AddressTags::default();
        tags.set_address_part(AddressPartType::Domain).unwrap();
        assert!(tags.set_address_part(AddressPartType::Localpart).is_err());
        assert_eq!(tags.canonicalize().address_part, AddressPartType::Domain);
        assert_eq!(
            AddressTags::default().canonicalize().address_part,
            AddressPartType::All
        );
    }

    #[test]
    fn test_body_transform() {
        let mut tags = BodyTags::default();
        tags.set_transform(BodyTransform::Content(vec!["text/html".to_string()]))
            .unwrap();
        assert_eq!(
            tags.set_transform(BodyTransform::Raw),
            Err(CompileError::DuplicateTag("or conflicting transform tag"))
        );
        assert_eq!(
            BodyTags::default().canonicalize().transform,
            BodyTransform::Text
        );
    }

    #[test]
    fn test_vacation_days_clamped() {
        let limits = VacationLimits {
            min_days: 2,
            max_days: 10,
            default_days: 7,
        };
        let mut tags = VacationTags::default();
        tags.set_days(90).unwrap();
        assert_eq!(tags.set_days(3), Err(CompileError::DuplicateTag(":days")));
        assert_eq!(tags.canonicalize(&limits).days, 10);

        let mut tags = VacationTags::default();
        tags.set_days(0).unwrap();
        assert_eq!(tags.canonicalize(&limits).days, 2);

        let canon = VacationTags::default().canonicalize(&limits);
        assert_eq!(canon.days, 7);
        assert!(canon.addresses.is_empty());
        assert!(!canon.mime);
    }

    #[test]
    fn test_vacation_duplicates() {
        let mut tags = VacationTags::default();
        tags.set_mime().unwrap();
        assert_eq!(tags.set_mime(), Err(CompileError::DuplicateTag(":mime")));
        tags.set_subject("away".to_string()).unwrap();
        assert_eq!(
            tags.set_subject("again".to_string()),
            Err(CompileError::DuplicateTag(":subject"))
        );
        assert!(tags.is_mime());
    }

    #[test]
    fn test_notify_defaults() {
        let canon = NotifyTags::default().canonicalize();
        assert_eq!(canon.method, "default");
        assert_eq!(canon.priority, Priority::Normal);
        assert_eq!(canon.message, "$from$: $subject$");
        assert!(canon.options.is_empty());
        assert!(canon.id.is_none());

        let mut tags = NotifyTags::default();
        tags.set_priority(Priority::High).unwrap();
        assert_eq!(
            tags.set_priority(Priority::Low),
            Err(CompileError::DuplicateTag("priority"))
        );
    }

    #[test]
    fn test_denotify() {
        let canon = DenotifyTags::default().canonicalize();
        assert!(canon.matcher.is_none());
        assert!(canon.priority.is_none());

        let mut tags = DenotifyTags::default();
        tags.set_match(MatchType::Is, "id-1".to_string()).unwrap();
        assert!(tags.has_match());
        assert!(tags.set_match(MatchType::Contains, "x".to_string()).is_err());
        let matcher = tags.canonicalize().matcher.unwrap();
        assert_eq!(matcher.comparison.comparator, "i;ascii-casemap");
        assert_eq!(matcher.pattern, "id-1");
    }
}

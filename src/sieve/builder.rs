/// AST builders: turn canonicalized tags plus validated operands into nodes.
use crate::model::enums::Comparator;
use crate::sieve::args::{
    CanonAddressTags, CanonBodyTags, CanonComparison, CanonDenotifyTags, CanonNotifyTags,
    CanonVacationTags,
};
use crate::sieve::ast::*;
use crate::sieve::error::CompileError;

/// Which of the two address-style tests is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Address,
    Envelope,
}

/// Resolves the comparator name, failing when the interpreter has no
/// implementation of it for the requested match type.
pub fn comparison(canon: CanonComparison) -> Result<Comparison, CompileError> {
    Comparator::from_sieve(&canon.comparator)
        .filter(|c| c.supports(canon.match_type))
        .map(|comparator| Comparison {
            comparator,
            match_type: canon.match_type,
        })
        .ok_or(CompileError::NoCompatibleComparator)
}

pub fn build_address(
    kind: AddressKind,
    tags: CanonAddressTags,
    header_names: Vec<String>,
    keys: Vec<String>,
) -> Result<TestExpr, CompileError> {
    let test = AddressTest {
        address_part: tags.address_part,
        comparison: comparison(tags.comparison)?,
        header_names,
        keys,
    };
    Ok(match kind {
        AddressKind::Address => TestExpr::Address(test),
        AddressKind::Envelope => TestExpr::Envelope(test),
    })
}

pub fn build_header(
    tags: CanonComparison,
    header_names: Vec<String>,
    keys: Vec<String>,
) -> Result<TestExpr, CompileError> {
    Ok(TestExpr::Header {
        comparison: comparison(tags)?,
        header_names,
        keys,
    })
}

pub fn build_body(tags: CanonBodyTags, keys: Vec<String>) -> Result<TestExpr, CompileError> {
    Ok(TestExpr::Body {
        transform: tags.transform,
        comparison: comparison(tags.comparison)?,
        keys,
    })
}

pub fn build_vacation(tags: CanonVacationTags, reason: Vec<u8>) -> Command {
    Command::Vacation(Vacation {
        days: tags.days,
        addresses: tags.addresses,
        subject: tags.subject,
        from: tags.from,
        handle: tags.handle,
        mime: tags.mime,
        reason,
    })
}

pub fn build_notify(tags: CanonNotifyTags) -> Command {
    Command::Notify(Notify {
        method: tags.method,
        id: tags.id,
        options: tags.options,
        priority: tags.priority,
        message: tags.message,
    })
}

pub fn build_denotify(tags: CanonDenotifyTags) -> Result<Command, CompileError> {
    let pattern = tags
        .matcher
        .map(|m| {
            Ok::<_, CompileError>(DenotifyPattern {
                comparison: comparison(m.comparison)?,
                pattern: m.pattern,
            })
        })
        .transpose()?;
    Ok(Command::Denotify(Denotify {
        pattern,
        priority: tags.priority,
    }))
}

pub fn build_if(condition: TestExpr, then_block: Block, else_block: Block) -> Command {
    Command::If(IfBlock {
        condition,
        then_block,
        else_block,
    })
}

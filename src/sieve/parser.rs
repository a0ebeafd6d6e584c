/// Recursive descent SIEVE parser.
///
/// Pulls tokens from a [`TokenSource`] and builds the command tree. A
/// malformed statement is reported through the script handle and skipped up
/// to the next statement boundary, so one pass reports every independent
/// defect. Lexical errors, a premature end of input and nesting past
/// `max_nesting` abort the parse.
use crate::model::enums::{
    ActionType, AddressPartType, ConditionTest, Extension, IncludeLocation, MatchType, Priority,
    RelationalOp, SizeComparator,
};
use crate::model::script::SieveScript;
use crate::sieve::args::{
    self, AddressTags, BodyTags, ComparisonTags, DenotifyTags, HeaderTags, NotifyTags,
    VacationTags,
};
use crate::sieve::ast::*;
use crate::sieve::builder::{self, AddressKind};
use crate::sieve::error::{CompileError, LiteralError};
use crate::sieve::lexer::{Span, Token, TokenSource};
use crate::sieve::validate;

type PResult<T> = Result<T, CompileError>;

pub struct Parser<'s, 'h, S> {
    source: S,
    script: &'s mut SieveScript<'h>,
    lookahead: Option<Span>,
    exhausted: bool,
    /// Line of the most recently lexed token.
    line: usize,
    /// Current block and test nesting.
    depth: usize,
}

impl<'s, 'h, S: TokenSource> Parser<'s, 'h, S> {
    pub fn new(source: S, script: &'s mut SieveScript<'h>) -> Self {
        Self {
            source,
            script,
            lookahead: None,
            exhausted: false,
            line: 1,
            depth: 0,
        }
    }

    /// Parses the whole input. Returns `None` when the require block is
    /// invalid or a fatal error stopped the parse; every other error is only
    /// counted on the script handle.
    pub fn run(mut self) -> Option<Block> {
        match self.script_body() {
            Ok(block) => block,
            Err(err) => {
                tracing::warn!(line = self.line, error = %err, "compilation aborted");
                self.report(err);
                None
            }
        }
    }

    // --- Token plumbing ---

    fn fill(&mut self) -> PResult<()> {
        if self.lookahead.is_none() && !self.exhausted {
            match self.source.next_token()? {
                Some(span) => {
                    self.line = span.line;
                    self.lookahead = Some(span);
                }
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    fn peek(&mut self) -> PResult<Option<&Token>> {
        self.fill()?;
        Ok(self.lookahead.as_ref().map(|s| &s.token))
    }

    fn bump(&mut self) -> PResult<Option<Token>> {
        self.fill()?;
        Ok(self.lookahead.take().map(|s| s.token))
    }

    /// Consumes the next token if `pred` accepts it.
    fn next_if(&mut self, pred: impl FnOnce(&Token) -> bool) -> PResult<Option<Token>> {
        self.fill()?;
        if self.lookahead.as_ref().is_some_and(|s| pred(&s.token)) {
            Ok(self.lookahead.take().map(|s| s.token))
        } else {
            Ok(None)
        }
    }

    /// The error for finding something other than `what` next.
    fn expected(&mut self, what: &'static str) -> CompileError {
        match self.peek() {
            Ok(Some(token)) => {
                CompileError::Syntax(format!("expected {what}, found {}", describe(token)))
            }
            Ok(None) => CompileError::UnexpectedEof(what),
            Err(err) => err,
        }
    }

    fn expect(&mut self, token: Token, what: &'static str) -> PResult<()> {
        match self.next_if(|t| *t == token)? {
            Some(_) => Ok(()),
            None => Err(self.expected(what)),
        }
    }

    fn expect_semicolon(&mut self) -> PResult<()> {
        self.expect(Token::Semicolon, "';'")
    }

    fn at_keyword(&mut self, keyword: &str) -> PResult<bool> {
        Ok(matches!(self.peek()?, Some(Token::Identifier(id)) if id.eq_ignore_ascii_case(keyword)))
    }

    fn identifier(&mut self, what: &'static str) -> PResult<String> {
        match self.next_if(|t| matches!(t, Token::Identifier(_)))? {
            Some(Token::Identifier(id)) => Ok(id.to_ascii_lowercase()),
            _ => Err(self.expected(what)),
        }
    }

    fn next_tag(&mut self) -> PResult<Option<String>> {
        Ok(match self.next_if(|t| matches!(t, Token::Tag(_)))? {
            Some(Token::Tag(tag)) => Some(tag),
            _ => None,
        })
    }

    fn string_bytes(&mut self, what: &'static str) -> PResult<Vec<u8>> {
        match self.next_if(|t| matches!(t, Token::QuotedString(_) | Token::MultiLineString(_)))? {
            Some(Token::QuotedString(s)) => Ok(s),
            Some(Token::MultiLineString(parts)) => Ok(parts.concat()),
            _ => Err(self.expected(what)),
        }
    }

    /// A string literal that has to be valid UTF-8.
    fn string(&mut self, what: &'static str) -> PResult<String> {
        let bytes = self.string_bytes(what)?;
        Ok(validate::utf8_string(bytes)?)
    }

    /// `"a"` or `["a", "b", ...]` with at least one element.
    fn string_list(&mut self, what: &'static str) -> PResult<Vec<String>> {
        if self.next_if(|t| *t == Token::LBracket)?.is_none() {
            return Ok(vec![self.string(what)?]);
        }
        let mut items = vec![self.string(what)?];
        loop {
            match self.next_if(|t| matches!(t, Token::Comma | Token::RBracket))? {
                Some(Token::Comma) => items.push(self.string(what)?),
                Some(_) => return Ok(items),
                None => return Err(self.expected("',' or ']'")),
            }
        }
    }

    fn number(&mut self, what: &'static str) -> PResult<u64> {
        match self.next_if(|t| matches!(t, Token::Number(_)))? {
            Some(Token::Number(n)) => Ok(n),
            _ => Err(self.expected(what)),
        }
    }

    // --- Error recovery ---

    fn report(&mut self, err: CompileError) {
        let line = self.line;
        self.script.report(line, err);
    }

    /// Runs `production` one nesting level deeper. Past the configured
    /// limit the parse is aborted instead of recursing further.
    fn nested<T>(&mut self, production: fn(&mut Self) -> PResult<T>) -> PResult<T> {
        let limit = self.script.config().max_nesting;
        if self.depth >= limit {
            return Err(CompileError::NestingTooDeep(limit));
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    /// Runs one statement production, recovering from non-fatal errors.
    fn statement<T>(&mut self, production: fn(&mut Self) -> PResult<T>) -> PResult<Option<T>> {
        match production(self) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.report(err);
                self.synchronize()?;
                Ok(None)
            }
        }
    }

    /// Discards tokens through the end of the current statement: the next
    /// `;` or the closing brace of a block (plus any `elsif`/`else` chain).
    /// Stops in front of a `}` that closes the enclosing block.
    fn synchronize(&mut self) -> PResult<()> {
        tracing::debug!(line = self.line, "skipping to next statement");
        let mut depth = 0usize;
        loop {
            match self.peek()? {
                None => return Ok(()),
                Some(Token::RBrace) if depth == 0 => return Ok(()),
                _ => {}
            }
            match self.bump()? {
                Some(Token::Semicolon) if depth == 0 => return Ok(()),
                Some(Token::LBrace) => depth += 1,
                Some(Token::RBrace) => {
                    depth -= 1;
                    if depth == 0 && !self.at_keyword("elsif")? && !self.at_keyword("else")? {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    // --- Grammar ---

    /// `script := require* command*`
    fn script_body(&mut self) -> PResult<Option<Block>> {
        let mut requires_valid = true;
        while self.at_keyword("require")? {
            if self.statement(Self::require)? != Some(true) {
                requires_valid = false;
            }
        }
        if !requires_valid {
            tracing::debug!("invalid require block, giving up");
            return Ok(None);
        }
        self.commands(true).map(Some)
    }

    /// `require <string-list>;`, registering each name with the gate.
    fn require(&mut self) -> PResult<bool> {
        self.bump()?;
        let names = self.string_list("extension name")?;
        self.expect_semicolon()?;
        let mut valid = true;
        for name in names {
            if let Err(err) = self.script.declare(&name) {
                self.report(err);
                valid = false;
            }
        }
        Ok(valid)
    }

    fn commands(&mut self, top_level: bool) -> PResult<Block> {
        let mut block = Vec::new();
        loop {
            match self.peek()? {
                None if top_level => return Ok(block),
                None => return Err(CompileError::UnexpectedEof("'}'")),
                Some(Token::RBrace) if top_level => {
                    self.report(CompileError::Syntax("unexpected '}'".to_string()));
                    self.bump()?;
                    continue;
                }
                Some(Token::RBrace) => return Ok(block),
                _ => {}
            }
            if let Some(command) = self.statement(Self::command)? {
                block.push(command);
            }
        }
    }

    /// `'{' command* '}'`
    fn block(&mut self) -> PResult<Block> {
        self.expect(Token::LBrace, "'{'")?;
        let block = self.nested(|p| p.commands(false))?;
        self.expect(Token::RBrace, "'}'")?;
        Ok(block)
    }

    fn command(&mut self) -> PResult<Command> {
        let name = self.identifier("command")?;
        match name.as_str() {
            "if" => return self.if_command(),
            "require" => return Err(CompileError::MisplacedRequire),
            "elsif" | "else" => {
                return Err(CompileError::Syntax(format!("'{name}' without 'if'")));
            }
            _ => {}
        }
        let action = ActionType::from_sieve(&name)
            .ok_or_else(|| CompileError::Syntax(format!("unknown command '{name}'")))?;
        if let Some(ext) = action.extension() {
            self.script.require(ext)?;
        }

        let command = match action {
            ActionType::Keep => Command::Keep,
            ActionType::Stop => Command::Stop,
            ActionType::Discard => Command::Discard,
            ActionType::Mark => Command::Mark,
            ActionType::Unmark => Command::Unmark,
            ActionType::Return => Command::Return,
            ActionType::Fileinto => {
                let copy = self.copy_tag("fileinto")?;
                let mailbox = self.string("mailbox name")?;
                Command::Fileinto { copy, mailbox }
            }
            ActionType::Redirect => {
                let copy = self.copy_tag("redirect")?;
                let address = self.string("address")?;
                self.check_address(&address)?;
                Command::Redirect { copy, address }
            }
            ActionType::Reject => Command::Reject(self.string("reject reason")?),
            ActionType::Vacation => self.vacation()?,
            ActionType::Setflag => Command::SetFlag(self.flag_list()?),
            ActionType::Addflag => Command::AddFlag(self.flag_list()?),
            ActionType::Removeflag => Command::RemoveFlag(self.flag_list()?),
            ActionType::Notify => self.notify()?,
            ActionType::Denotify => self.denotify()?,
            ActionType::Include => self.include()?,
        };
        self.expect_semicolon()?;
        Ok(command)
    }

    /// `if <test> <block> (elsif <test> <block>)* (else <block>)?`
    fn if_command(&mut self) -> PResult<Command> {
        let condition = self.test()?;
        let then_block = self.block()?;
        let else_block = self.else_chain()?;
        Ok(builder::build_if(condition, then_block, else_block))
    }

    /// Each `elsif` becomes an `if` nested in the else block of the one
    /// before it. The chain is read iteratively and folded from the end.
    fn else_chain(&mut self) -> PResult<Block> {
        let mut arms = Vec::new();
        while self.at_keyword("elsif")? {
            self.bump()?;
            let condition = self.test()?;
            let then_block = self.block()?;
            arms.push((condition, then_block));
        }
        let mut else_block = if self.at_keyword("else")? {
            self.bump()?;
            self.block()?
        } else {
            Vec::new()
        };
        while let Some((condition, then_block)) = arms.pop() {
            else_block = vec![builder::build_if(condition, then_block, else_block)];
        }
        Ok(else_block)
    }

    // --- Actions ---

    /// Optional `:copy` of `fileinto` and `redirect`.
    fn copy_tag(&mut self, construct: &str) -> PResult<bool> {
        let mut copy = None;
        while let Some(tag) = self.next_tag()? {
            if tag != ":copy" {
                return Err(unexpected_tag(&tag, construct));
            }
            self.script.require(Extension::Copy)?;
            args::assign(&mut copy, (), ":copy")?;
        }
        Ok(copy.is_some())
    }

    fn check_address(&self, address: &str) -> PResult<()> {
        if self.script.is_valid_address(address) {
            Ok(())
        } else {
            Err(LiteralError::InvalidAddress(address.to_string()).into())
        }
    }

    fn flag_list(&mut self) -> PResult<Vec<String>> {
        let flags = self.string_list("flag")?;
        validate::string_list(&flags, validate::flag)?;
        Ok(flags)
    }

    fn vacation(&mut self) -> PResult<Command> {
        let mut tags = VacationTags::default();
        while let Some(tag) = self.next_tag()? {
            match tag.as_str() {
                ":days" => tags.set_days(self.number("number of days")?)?,
                ":addresses" => {
                    let addresses = self.string_list("address")?;
                    for address in &addresses {
                        self.check_address(address)?;
                    }
                    tags.set_addresses(addresses)?;
                }
                ":subject" => tags.set_subject(self.string("subject")?)?,
                ":from" => {
                    let from = self.string("address")?;
                    self.check_address(&from)?;
                    tags.set_from(from)?;
                }
                ":handle" => tags.set_handle(self.string("handle")?)?,
                ":mime" => tags.set_mime()?,
                _ => return Err(unexpected_tag(&tag, "vacation")),
            }
        }
        let reason = if tags.is_mime() {
            self.string_bytes("vacation reason")?
        } else {
            self.string("vacation reason")?.into_bytes()
        };
        let tags = tags.canonicalize(&self.script.config().vacation);
        Ok(builder::build_vacation(tags, reason))
    }

    fn notify(&mut self) -> PResult<Command> {
        let mut tags = NotifyTags::default();
        while let Some(tag) = self.next_tag()? {
            if let Some(priority) = Priority::from_sieve(&tag) {
                tags.set_priority(priority)?;
                continue;
            }
            match tag.as_str() {
                ":method" => tags.set_method(self.string("notification method")?)?,
                ":id" => tags.set_id(self.string("notification id")?)?,
                ":options" => tags.set_options(self.string_list("notification option")?)?,
                ":message" => tags.set_message(self.string("notification message")?)?,
                _ => return Err(unexpected_tag(&tag, "notify")),
            }
        }
        Ok(builder::build_notify(tags.canonicalize()))
    }

    fn denotify(&mut self) -> PResult<Command> {
        let mut tags = DenotifyTags::default();
        while let Some(tag) = self.next_tag()? {
            if let Some(priority) = Priority::from_sieve(&tag) {
                tags.set_priority(priority)?;
                continue;
            }
            match tag.as_str() {
                ":is" | ":contains" | ":matches" | ":regex" => {
                    let match_type = match_type_tag(&tag)?;
                    if match_type == MatchType::Regex {
                        self.script.require(Extension::Regex)?;
                    }
                    let pattern = self.string("pattern")?;
                    if match_type == MatchType::Regex {
                        tags.set_match(match_type, pattern.clone())?;
                        validate::regex(&pattern, true)?;
                    } else {
                        tags.set_match(match_type, pattern)?;
                    }
                }
                ":count" | ":value" => {
                    self.script.require(Extension::Relational)?;
                    if tags.has_match() {
                        return Err(CompileError::DuplicateTag("comparator type tag"));
                    }
                    let op = validate::relational(&self.string("relational operator")?)?;
                    let pattern = self.string("pattern")?;
                    tags.set_match(relational_match(&tag, op), pattern)?;
                }
                _ => return Err(unexpected_tag(&tag, "denotify")),
            }
        }
        builder::build_denotify(tags.canonicalize())
    }

    fn include(&mut self) -> PResult<Command> {
        let mut location = None;
        while let Some(tag) = self.next_tag()? {
            let Some(loc) = IncludeLocation::from_sieve(&tag) else {
                return Err(unexpected_tag(&tag, "include"));
            };
            if location.replace(loc).is_some() {
                return Err(CompileError::DuplicateTag("or conflicting location tag"));
            }
        }
        let script = self.string("script name")?;
        Ok(Command::Include {
            location: location.unwrap_or(IncludeLocation::Personal),
            script,
        })
    }

    // --- Tests ---

    fn test(&mut self) -> PResult<TestExpr> {
        self.nested(Self::test_body)
    }

    fn test_body(&mut self) -> PResult<TestExpr> {
        let name = self.identifier("test")?;
        let kind = ConditionTest::from_sieve(&name)
            .ok_or_else(|| CompileError::Syntax(format!("unknown test '{name}'")))?;
        if let Some(ext) = kind.extension() {
            self.script.require(ext)?;
        }

        match kind {
            ConditionTest::AnyOf => Ok(TestExpr::AnyOf(self.test_list()?)),
            ConditionTest::AllOf => Ok(TestExpr::AllOf(self.test_list()?)),
            ConditionTest::Not => Ok(TestExpr::Not(Box::new(self.test()?))),
            ConditionTest::True => Ok(TestExpr::True),
            ConditionTest::False => Ok(TestExpr::False),
            ConditionTest::Exists => {
                let header_names = self.string_list("header name")?;
                validate::string_list(&header_names, validate::header_name)?;
                Ok(TestExpr::Exists(header_names))
            }
            ConditionTest::Size => self.size_test(),
            ConditionTest::Header => self.header_test(),
            ConditionTest::Address => self.address_test(AddressKind::Address),
            ConditionTest::Envelope => self.address_test(AddressKind::Envelope),
            ConditionTest::Body => self.body_test(),
        }
    }

    /// `'(' test (',' test)* ')'`
    fn test_list(&mut self) -> PResult<Vec<TestExpr>> {
        self.expect(Token::LParen, "'('")?;
        let mut tests = vec![self.test()?];
        loop {
            match self.next_if(|t| matches!(t, Token::Comma | Token::RParen))? {
                Some(Token::Comma) => tests.push(self.test()?),
                Some(_) => return Ok(tests),
                None => return Err(self.expected("',' or ')'")),
            }
        }
    }

    fn size_test(&mut self) -> PResult<TestExpr> {
        let comparator = match self.next_tag()? {
            Some(tag) => SizeComparator::from_sieve(&tag)
                .ok_or_else(|| unexpected_tag(&tag, "size"))?,
            None => return Err(self.expected("':over' or ':under'")),
        };
        let limit = self.number("size limit")?;
        Ok(TestExpr::Size { comparator, limit })
    }

    /// Handles a comparator or match-type tag. Returns `false` when `tag` is
    /// neither.
    fn comparison_tag(&mut self, tag: &str, tags: &mut ComparisonTags) -> PResult<bool> {
        match tag {
            ":is" | ":contains" | ":matches" | ":regex" => {
                let match_type = match_type_tag(tag)?;
                if match_type == MatchType::Regex {
                    self.script.require(Extension::Regex)?;
                }
                tags.set_match_type(match_type)?;
            }
            ":count" | ":value" => {
                self.script.require(Extension::Relational)?;
                let op = self.string("relational operator")?;
                let make: fn(RelationalOp) -> MatchType = if tag == ":count" {
                    MatchType::Count
                } else {
                    MatchType::Value
                };
                tags.set_relational(make, &op)?;
            }
            ":comparator" => {
                let name = self.string("comparator name")?;
                let numeric = self.script.has(Extension::ComparatorAsciiNumeric);
                tags.set_comparator(name, numeric)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn address_test(&mut self, kind: AddressKind) -> PResult<TestExpr> {
        let construct = match kind {
            AddressKind::Address => "address",
            AddressKind::Envelope => "envelope",
        };
        let mut tags = AddressTags::default();
        while let Some(tag) = self.next_tag()? {
            if self.comparison_tag(&tag, &mut tags.comparison)? {
                continue;
            }
            let part =
                AddressPartType::from_sieve(&tag).ok_or_else(|| unexpected_tag(&tag, construct))?;
            if part.is_subaddress() {
                self.script.require(Extension::Subaddress)?;
            }
            tags.set_address_part(part)?;
        }

        let header_names = self.string_list("header name")?;
        let keys = self.string_list("key")?;
        let strict = self.script.config().strict;
        match kind {
            AddressKind::Address => {
                validate::string_list(&header_names, |h| validate::address_header(h, strict))?
            }
            AddressKind::Envelope => {
                validate::string_list(&header_names, |p| validate::envelope_part(p, strict))?
            }
        }

        let tags = tags.canonicalize();
        if tags.comparison.match_type == MatchType::Regex {
            validate::regex_list(&keys, &tags.comparison.comparator)?;
        }
        builder::build_address(kind, tags, header_names, keys)
    }

    fn header_test(&mut self) -> PResult<TestExpr> {
        let mut tags = HeaderTags::default();
        while let Some(tag) = self.next_tag()? {
            if !self.comparison_tag(&tag, &mut tags.comparison)? {
                return Err(unexpected_tag(&tag, "header"));
            }
        }

        let header_names = self.string_list("header name")?;
        let keys = self.string_list("key")?;
        validate::string_list(&header_names, validate::header_name)?;

        let tags = tags.canonicalize();
        if tags.match_type == MatchType::Regex {
            validate::regex_list(&keys, &tags.comparator)?;
        }
        builder::build_header(tags, header_names, keys)
    }

    fn body_test(&mut self) -> PResult<TestExpr> {
        let mut tags = BodyTags::default();
        while let Some(tag) = self.next_tag()? {
            if self.comparison_tag(&tag, &mut tags.comparison)? {
                continue;
            }
            match tag.as_str() {
                ":raw" => tags.set_transform(BodyTransform::Raw)?,
                ":text" => tags.set_transform(BodyTransform::Text)?,
                ":content" => {
                    let types = self.string_list("content type")?;
                    tags.set_transform(BodyTransform::Content(types))?;
                }
                _ => return Err(unexpected_tag(&tag, "body")),
            }
        }

        let keys = self.string_list("key")?;
        let tags = tags.canonicalize();
        if tags.comparison.match_type == MatchType::Regex {
            validate::regex_list(&keys, &tags.comparison.comparator)?;
        }
        builder::build_body(tags, keys)
    }
}

fn match_type_tag(tag: &str) -> PResult<MatchType> {
    MatchType::from_sieve(tag).ok_or_else(|| unexpected_tag(tag, "match type"))
}

fn relational_match(tag: &str, op: RelationalOp) -> MatchType {
    if tag == ":count" {
        MatchType::Count(op)
    } else {
        MatchType::Value(op)
    }
}

fn unexpected_tag(tag: &str, construct: &str) -> CompileError {
    CompileError::Syntax(format!("unexpected tag '{tag}' for {construct}"))
}

fn describe(token: &Token) -> String {
    match token {
        Token::Tag(tag) => format!("tag '{tag}'"),
        Token::Identifier(id) => format!("'{id}'"),
        Token::QuotedString(_) | Token::MultiLineString(_) => "string".to_string(),
        Token::Number(n) => format!("number {n}"),
        Token::Semicolon => "';'".to_string(),
        Token::Comma => "','".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBrace => "'{'".to_string(),
        Token::RBrace => "'}'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::model::enums::Comparator;
    use crate::sieve::error::Diagnostic;
    use crate::sieve::lexer::Lexer;

    fn parse(src: &str) -> (Option<Block>, Vec<Diagnostic>) {
        let mut errors = Vec::new();
        let block = {
            let mut script =
                SieveScript::new(CompilerConfig::default()).on_error(|d| errors.push(d.clone()));
            Parser::new(Lexer::new(src.as_bytes()), &mut script).run()
        };
        (block, errors)
    }

    fn parse_ok(src: &str) -> Block {
        let (block, errors) = parse(src);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        block.expect("no tree")
    }

    #[test]
    fn test_simple_actions() {
        let block = parse_ok("keep; discard; stop;");
        assert_eq!(block, vec![Command::Keep, Command::Discard, Command::Stop]);
    }

    #[test]
    fn test_empty_script() {
        assert_eq!(parse_ok(""), Vec::<Command>::new());
        assert_eq!(parse_ok("# only a comment\n"), Vec::<Command>::new());
    }

    #[test]
    fn test_fileinto_copy() {
        let block = parse_ok("require [\"fileinto\", \"copy\"];\nfileinto :copy \"INBOX.a\";");
        assert_eq!(
            block,
            vec![Command::Fileinto {
                copy: true,
                mailbox: "INBOX.a".to_string()
            }]
        );
    }

    #[test]
    fn test_copy_without_require() {
        let (block, errors) = parse("require \"fileinto\";\nfileinto :copy \"a\";");
        assert_eq!(block, Some(vec![]));
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].error,
            CompileError::ExtensionNotEnabled(Extension::Copy)
        );
    }

    #[test]
    fn test_duplicate_copy() {
        let (_, errors) = parse("require [\"fileinto\", \"copy\"];\nfileinto :copy :copy \"x\";");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
        assert_eq!(errors[0].error, CompileError::DuplicateTag(":copy"));

        let (_, errors) = parse("require \"copy\";\nredirect :copy :copy \"a@b.c\";");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error, CompileError::DuplicateTag(":copy"));
    }

    #[test]
    fn test_unknown_tag_on_redirect() {
        let (_, errors) = parse("redirect :days \"a@b.c\";");
        assert!(matches!(errors[0].error, CompileError::Syntax(_)));
    }

    #[test]
    fn test_header_test_defaults() {
        let block = parse_ok("if header \"Subject\" \"hi\" { keep; }");
        match &block[0] {
            Command::If(IfBlock {
                condition: TestExpr::Header { comparison, .. },
                then_block,
                else_block,
            }) => {
                assert_eq!(comparison.comparator, Comparator::AsciiCasemap);
                assert_eq!(comparison.match_type, MatchType::Is);
                assert_eq!(then_block, &vec![Command::Keep]);
                assert!(else_block.is_empty());
            }
            other => panic!("Expected If, got {other:?}"),
        }
    }

    #[test]
    fn test_elsif_nests_in_else_block() {
        let block = parse_ok("if false { stop; } elsif true { keep; } else { discard; }");
        let Command::If(outer) = &block[0] else {
            panic!("Expected If");
        };
        assert_eq!(outer.condition, TestExpr::False);
        let [Command::If(inner)] = outer.else_block.as_slice() else {
            panic!("Expected nested If, got {:?}", outer.else_block);
        };
        assert_eq!(inner.condition, TestExpr::True);
        assert_eq!(inner.then_block, vec![Command::Keep]);
        assert_eq!(inner.else_block, vec![Command::Discard]);
    }

    #[test]
    fn test_anyof_not_size_exists() {
        let block =
            parse_ok("if anyof (not exists [\"X-Spam\", \"X-Virus\"], size :over 100K) { discard; }");
        let Command::If(IfBlock { condition, .. }) = &block[0] else {
            panic!("Expected If");
        };
        assert_eq!(
            condition,
            &TestExpr::AnyOf(vec![
                TestExpr::Not(Box::new(TestExpr::Exists(vec![
                    "X-Spam".to_string(),
                    "X-Virus".to_string()
                ]))),
                TestExpr::Size {
                    comparator: SizeComparator::Over,
                    limit: 100 * 1024
                },
            ])
        );
    }

    #[test]
    fn test_address_parts_and_relational() {
        let block = parse_ok(
            "require [\"subaddress\", \"relational\", \"comparator-i;ascii-numeric\"];\n\
             if address :detail :count \"ge\" :comparator \"i;ascii-numeric\" \"to\" \"2\" { keep; }",
        );
        let Command::If(IfBlock {
            condition: TestExpr::Address(test),
            ..
        }) = &block[0]
        else {
            panic!("Expected address test");
        };
        assert_eq!(test.address_part, AddressPartType::Detail);
        assert_eq!(test.comparison.comparator, Comparator::AsciiNumeric);
        assert_eq!(test.comparison.match_type, MatchType::Count(RelationalOp::Ge));
    }

    #[test]
    fn test_subaddress_gate() {
        let (_, errors) = parse("if address :user \"to\" \"bob\" { keep; }");
        assert_eq!(
            errors[0].error,
            CompileError::ExtensionNotEnabled(Extension::Subaddress)
        );
    }

    #[test]
    fn test_address_header_strict() {
        let (_, errors) = parse("if address \"Subject\" \"x\" { keep; }");
        assert_eq!(
            errors[0].error,
            CompileError::InvalidLiteral(LiteralError::InvalidAddressHeader("Subject".to_string()))
        );
    }

    #[test]
    fn test_duplicate_match_type() {
        let (block, errors) = parse("if header :is :contains \"a\" \"b\" { keep; }\nkeep;");
        assert_eq!(block, Some(vec![Command::Keep]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[0].error, CompileError::DuplicateTag("comparator type tag"));
    }

    #[test]
    fn test_numeric_comparator_rejects_contains() {
        let (_, errors) = parse(
            "require \"comparator-i;ascii-numeric\";\n\
             if header :contains :comparator \"i;ascii-numeric\" \"x\" \"1\" { keep; }",
        );
        assert_eq!(errors[0].error, CompileError::NoCompatibleComparator);
    }

    #[test]
    fn test_bad_regex_reported() {
        let (_, errors) = parse("require \"regex\";\nif header :regex \"subject\" \"(open\" { keep; }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0].error,
            CompileError::InvalidLiteral(LiteralError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_body_content_transform() {
        let block = parse_ok(
            "require \"body\";\nif body :content [\"text/plain\"] :contains \"offer\" { discard; }",
        );
        let Command::If(IfBlock {
            condition: TestExpr::Body { transform, comparison, keys },
            ..
        }) = &block[0]
        else {
            panic!("Expected body test");
        };
        assert_eq!(transform, &BodyTransform::Content(vec!["text/plain".to_string()]));
        assert_eq!(comparison.match_type, MatchType::Contains);
        assert_eq!(keys, &vec!["offer".to_string()]);
    }

    #[test]
    fn test_vacation_defaults_and_clamp() {
        let block = parse_ok("require \"vacation\";\nvacation :days 90 \"Away\";");
        let Command::Vacation(v) = &block[0] else {
            panic!("Expected vacation");
        };
        assert_eq!(v.days, 30);
        assert_eq!(v.reason, b"Away");
        assert!(!v.mime);

        let block = parse_ok("require \"vacation\";\nvacation text:\nGone.\n..\n.\n;");
        let Command::Vacation(v) = &block[0] else {
            panic!("Expected vacation");
        };
        assert_eq!(v.days, 7);
        assert_eq!(v.reason, b"Gone.\n.\n");
    }

    #[test]
    fn test_vacation_bad_from() {
        let (_, errors) = parse("require \"vacation\";\nvacation :from \"not an address\" \"x\";");
        assert_eq!(
            errors[0].error,
            CompileError::InvalidLiteral(LiteralError::InvalidAddress(
                "not an address".to_string()
            ))
        );
    }

    #[test]
    fn test_flags_validated() {
        let block = parse_ok("require \"imapflags\";\naddflag [\"\\\\Seen\", \"$Junk\"]; mark;");
        assert_eq!(
            block,
            vec![
                Command::AddFlag(vec!["\\Seen".to_string(), "$Junk".to_string()]),
                Command::Mark
            ]
        );

        let (_, errors) = parse("require \"imapflags\";\nsetflag \"\\\\Recent\";");
        assert_eq!(
            errors[0].error,
            CompileError::InvalidLiteral(LiteralError::NotSystemFlag("\\Recent".to_string()))
        );
    }

    #[test]
    fn test_notify_defaults() {
        let block = parse_ok("require \"notify\";\nnotify :high :options [\"a@b.c\"];");
        assert_eq!(
            block,
            vec![Command::Notify(Notify {
                method: "default".to_string(),
                id: None,
                options: vec!["a@b.c".to_string()],
                priority: Priority::High,
                message: "$from$: $subject$".to_string(),
            })]
        );
    }

    #[test]
    fn test_denotify_relational() {
        let block = parse_ok(
            "require [\"notify\", \"relational\"];\ndenotify :value \"lt\" \"5\" :low;",
        );
        let Command::Denotify(Denotify {
            pattern: Some(pattern),
            priority,
        }) = &block[0]
        else {
            panic!("Expected denotify with a pattern");
        };
        assert_eq!(pattern.comparison.match_type, MatchType::Value(RelationalOp::Lt));
        assert_eq!(pattern.pattern, "5");
        assert_eq!(priority, &Some(Priority::Low));
    }

    #[test]
    fn test_include_location() {
        let block = parse_ok("require \"include\";\ninclude :global \"spam\"; return;");
        assert_eq!(
            block,
            vec![
                Command::Include {
                    location: IncludeLocation::Global,
                    script: "spam".to_string()
                },
                Command::Return
            ]
        );
        let (_, errors) = parse("require \"include\";\ninclude :global :personal \"spam\";");
        assert_eq!(
            errors[0].error,
            CompileError::DuplicateTag("or conflicting location tag")
        );
    }

    #[test]
    fn test_invalid_require_gives_no_tree() {
        let (block, errors) = parse("require [\"fileinto\", \"bogus\", \"other\"];\nkeep;");
        assert_eq!(block, None);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0].error,
            CompileError::UnsupportedExtension("bogus".to_string())
        );
    }

    #[test]
    fn test_misplaced_require() {
        let (block, errors) = parse("keep;\nrequire \"fileinto\";\nstop;");
        assert_eq!(block, Some(vec![Command::Keep, Command::Stop]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
        assert_eq!(errors[0].error, CompileError::MisplacedRequire);
    }

    #[test]
    fn test_recovery_reports_each_statement() {
        let src = "fileinto \"a\";\nreject \"b\";\nif envelope \"from\" \"x\" { keep; }\nkeep;";
        let (block, errors) = parse(src);
        assert_eq!(block, Some(vec![Command::Keep]));
        let lines: Vec<usize> = errors.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_error_inside_block_keeps_if() {
        let (block, errors) = parse("if true { bogus; keep; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            block,
            Some(vec![Command::If(IfBlock {
                condition: TestExpr::True,
                then_block: vec![Command::Keep],
                else_block: vec![],
            })])
        );
    }

    #[test]
    fn test_missing_semicolon_then_brace() {
        let (block, errors) = parse("if true { keep }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].error, CompileError::Syntax(_)));
        assert!(block.is_some());
    }

    #[test]
    fn test_unclosed_block_is_fatal() {
        let (block, errors) = parse("if true { keep;");
        assert_eq!(block, None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error, CompileError::UnexpectedEof("'}'"));
    }

    #[test]
    fn test_lex_error_is_fatal() {
        let (block, errors) = parse("keep;\nredirect \"unterminated");
        assert_eq!(block, None);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].error, CompileError::Lex(_)));
    }

    #[test]
    fn test_stray_closing_brace() {
        let (block, errors) = parse("keep; } stop;");
        assert_eq!(block, Some(vec![Command::Keep, Command::Stop]));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_else_without_if() {
        let (_, errors) = parse("else { keep; }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].error, CompileError::Syntax(_)));
    }

    #[test]
    fn test_deep_not_chain_is_reported() {
        let src = format!("if {}true {{ keep; }}", "not ".repeat(20_000));
        let (block, errors) = parse(&src);
        assert_eq!(block, None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error, CompileError::NestingTooDeep(64));
    }

    #[test]
    fn test_deep_blocks_and_anyof_are_reported() {
        let src = format!("{}keep;{}", "if true { ".repeat(5_000), " }".repeat(5_000));
        let (block, errors) = parse(&src);
        assert_eq!(block, None);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].error, CompileError::NestingTooDeep(_)));

        let src = format!("if {}true{} {{ keep; }}", "anyof(".repeat(5_000), ")".repeat(5_000));
        let (_, errors) = parse(&src);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].error, CompileError::NestingTooDeep(_)));
    }

    #[test]
    fn test_nesting_within_limit() {
        let src = format!("{}keep;{}", "if not true { ".repeat(20), " }".repeat(20));
        let block = parse_ok(&src);
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn test_long_elsif_chain_is_not_nesting() {
        let src = format!(
            "if false {{ keep; }}{} else {{ discard; }}",
            " elsif false { stop; }".repeat(500)
        );
        let block = parse_ok(&src);
        let mut node = &block[0];
        let mut arms = 0;
        while let Command::If(if_block) = node {
            arms += 1;
            match if_block.else_block.first() {
                Some(next) => node = next,
                None => break,
            }
        }
        assert_eq!(arms, 501);
        assert_eq!(node, &Command::Discard);
    }

    #[test]
    fn test_non_utf8_key_rejected() {
        let mut errors = Vec::new();
        {
            let mut script =
                SieveScript::new(CompilerConfig::default()).on_error(|d| errors.push(d.clone()));
            let src = b"if header :is \"subject\" \"caf\xe9\" { keep; }";
            Parser::new(Lexer::new(src), &mut script).run();
        }
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0].error,
            CompileError::InvalidLiteral(LiteralError::NotUtf8(_))
        ));
    }

    #[test]
    fn test_mime_reason_keeps_raw_bytes() {
        let mut errors = Vec::new();
        let block = {
            let mut script =
                SieveScript::new(CompilerConfig::default()).on_error(|d| errors.push(d.clone()));
            let src = b"require \"vacation\";\nvacation :mime \"caf\xe9\";";
            Parser::new(Lexer::new(src), &mut script).run()
        };
        assert!(errors.is_empty());
        let Some([Command::Vacation(v)]) = block.as_deref() else {
            panic!("Expected one vacation, got {block:?}");
        };
        assert!(v.mime);
        assert_eq!(v.reason, b"caf\xe9");
    }

    #[test]
    fn test_reject_requires_utf8() {
        let mut errors = Vec::new();
        {
            let mut script =
                SieveScript::new(CompilerConfig::default()).on_error(|d| errors.push(d.clone()));
            let src = b"require \"reject\";\nreject \"caf\xe9\";";
            Parser::new(Lexer::new(src), &mut script).run();
        }
        assert!(matches!(
            errors[0].error,
            CompileError::InvalidLiteral(LiteralError::NotUtf8(_))
        ));
    }
}

pub mod address;
pub mod args;
pub mod ast;
pub mod builder;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod require;
pub mod validate;

use crate::config::CompilerConfig;
use crate::model::script::SieveScript;
use ast::Block;
use error::Diagnostic;
use lexer::{Lexer, TokenSource};
use parser::Parser;

/// Compiles a script held in memory.
///
/// Every defect goes to the handle's error callback. The tree is returned
/// only when nothing was reported.
pub fn compile(script: &mut SieveScript<'_>, input: &[u8]) -> Option<Block> {
    compile_tokens(script, Lexer::new(input))
}

/// Compiles from any token source.
pub fn compile_tokens<S: TokenSource>(script: &mut SieveScript<'_>, source: S) -> Option<Block> {
    script.reset();
    let block = Parser::new(source, script).run();
    let errors = script.err_count();
    if errors > 0 {
        tracing::info!(errors, "script rejected");
        return None;
    }
    tracing::debug!(commands = block.as_ref().map_or(0, Vec::len), "script compiled");
    block
}

/// Compiles `input` with `config`, collecting diagnostics instead of
/// streaming them.
pub fn check(config: &CompilerConfig, input: &[u8]) -> Result<Block, Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();
    let block = {
        let mut script =
            SieveScript::new(config.clone()).on_error(|d| diagnostics.push(d.clone()));
        compile(&mut script, input)
    };
    match block {
        Some(block) => Ok(block),
        None => Err(diagnostics),
    }
}

//! Front-end compiler for SIEVE mail filtering scripts (RFC 5228) and the
//! extensions an interpreter commonly supports: fileinto, reject, envelope,
//! body, vacation, imapflags, notify, subaddress, relational, regex, copy,
//! include and the `i;ascii-numeric` comparator.
//!
//! A script is compiled against a [`SieveScript`] handle, which carries the
//! host configuration, the extension registry, the address validator and
//! the diagnostic callback. Compilation yields the command tree, or nothing
//! when any error was reported.

pub mod config;
pub mod model;
pub mod sieve;
pub mod store;

pub use config::CompilerConfig;
pub use model::script::SieveScript;
pub use sieve::ast::{Block, Command, TestExpr};
pub use sieve::error::{CompileError, Diagnostic};
pub use sieve::{check, compile, compile_tokens};

//! Sandboxed evaluation of generated component code.
//!
//! A code block goes through two stages, each with its own error type:
//!
//! - transpile: lex and parse the JSX-like source into a syntax tree
//!   ([`TranspileError`] with a line and column)
//! - execute: evaluate the tree with a fixed capability set and a step and
//!   call-depth budget ([`ExecutionError`])
//!
//! The evaluator sees nothing of the host beyond what `stdlib` installs.

mod ast;
mod charts;
mod error;
mod interp;
mod lexer;
mod parser;
mod stdlib;
mod value;

pub use error::{ExecutionError, SandboxError, TranspileError};
pub use interp::Limits;

use crate::chart::ChartSpec;
use crate::component::Node;

/// Stack for the evaluation thread. Parsing and evaluation both recurse.
const EVAL_STACK_SIZE: usize = 32 * 1024 * 1024;

/// What a code block rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentOutput {
    pub nodes: Vec<Node>,
    /// Charts by index; `Node::Chart(i)` places one inline, the rest were
    /// drawn on the canvas.
    pub charts: Vec<ChartSpec>,
}

/// Transpiles and evaluates one code block.
///
/// Runs on a dedicated thread with a large stack and waits for it; the
/// budgets in `limits` bound how long that takes.
///
/// # Errors
/// [`SandboxError::Transpile`] when the source does not parse,
/// [`SandboxError::Execution`] when evaluation fails or renders nothing.
pub fn run(source: &str, limits: Limits) -> Result<ComponentOutput, SandboxError> {
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("chatview-eval".to_string())
            .stack_size(EVAL_STACK_SIZE)
            .spawn_scoped(scope, || evaluate(source, limits))
            .map_err(|e| ExecutionError::new(format!("failed to start evaluation: {e}")))?;
        handle
            .join()
            .unwrap_or_else(|_| Err(ExecutionError::new("evaluation panicked").into()))
    })
}

fn evaluate(source: &str, limits: Limits) -> Result<ComponentOutput, SandboxError> {
    let program = parser::parse_program(source)?;
    Ok(interp::run_program(&program, limits)?)
}

use std::fmt;

/// Generated source could not be lexed or parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileError {
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    pub message: String,
}

impl TranspileError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for TranspileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for TranspileError {}

/// Evaluation failed: a runtime error, an exhausted budget, or output that
/// cannot be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExecutionError {}

/// Failure of one code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxError {
    Transpile(TranspileError),
    Execution(ExecutionError),
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxError::Transpile(e) => write!(f, "transpile error at {e}"),
            SandboxError::Execution(e) => write!(f, "execution error: {e}"),
        }
    }
}

impl std::error::Error for SandboxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SandboxError::Transpile(e) => Some(e),
            SandboxError::Execution(e) => Some(e),
        }
    }
}

impl From<TranspileError> for SandboxError {
    fn from(e: TranspileError) -> Self {
        SandboxError::Transpile(e)
    }
}

impl From<ExecutionError> for SandboxError {
    fn from(e: ExecutionError) -> Self {
        SandboxError::Execution(e)
    }
}

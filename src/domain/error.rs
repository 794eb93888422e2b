//! Domain error types.

/// A rule expression parse error with its character offset.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// The input with a caret under the failing position, then the error.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!("{}\n{}\n{}", input, caret, self)
    }
}

/// Top-level error type for tradebench.
///
/// Precondition variants signal a caller or logic defect and are never
/// retried. Numeric edge cases are not errors: they surface as NaN values.
#[derive(Debug, thiserror::Error)]
pub enum TradebenchError {
    #[error("position is already closed")]
    PositionClosed,

    #[error("exit index {exit} is before entry index {entry}")]
    ExitBeforeEntry { entry: usize, exit: usize },

    #[error("entry index {entry} is before last order index {last}")]
    EntryBeforeLastExit { last: usize, entry: usize },

    #[error("position is not closed")]
    PositionNotClosed,

    #[error("position is not opened")]
    PositionNotOpened,

    #[error("slice {index} out of range ({slices} slices)")]
    SliceOutOfRange { index: usize, slices: usize },

    #[error("invalid index range [{begin}, {end}]")]
    InvalidRange { begin: usize, end: usize },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no bars in {path}")]
    NoData { path: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradebenchError> for std::process::ExitCode {
    fn from(err: &TradebenchError) -> Self {
        let code: u8 = match err {
            TradebenchError::Io(_) => 1,
            TradebenchError::ConfigParse { .. }
            | TradebenchError::ConfigMissing { .. }
            | TradebenchError::ConfigInvalid { .. } => 2,
            TradebenchError::UnknownStrategy { .. } => 3,
            TradebenchError::RuleParse(_) => 4,
            TradebenchError::Data { .. } | TradebenchError::NoData { .. } => 5,
            TradebenchError::PositionClosed
            | TradebenchError::ExitBeforeEntry { .. }
            | TradebenchError::EntryBeforeLastExit { .. }
            | TradebenchError::PositionNotClosed
            | TradebenchError::PositionNotOpened
            | TradebenchError::SliceOutOfRange { .. }
            | TradebenchError::InvalidRange { .. }
            | TradebenchError::InvalidArgument { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not anyhow/eyre/thiserror?

Callers of the page directory have to tell "the page does not exist" apart
from "the store failed halfway through a reorder". A closed set of kinds
gives them something to match on, while the context chain and the captured
span trace carry the operator-facing detail.
 */

/// Error variants that can occur in page directory operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// No page with this id exists
    PageNotFound { page_id: String },

    /// A page with this id already exists
    PageAlreadyExists { page_id: String },

    /// An explicit position requested at creation is already taken in the partition
    PositionConflict { api_id: String, position: u32 },

    /// An explicit position requested at creation lies outside `first..=last`
    PositionOutOfRange {
        api_id: String,
        position: u32,
        first: u32,
        last: u32,
    },

    /// The moved page is not among its siblings, or the target slot is out of range
    InvalidReorderRequest { page_id: String, reason: String },

    /// Technical failure reported by the storage collaborator
    Storage { message: String },

    /// A reorder write plan failed part way through
    ReorderAborted {
        api_id: String,
        page_id: String,
        applied: usize,
        planned: usize,
    },

    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration could not be parsed or is inconsistent
    ConfigError { message: String },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::PageNotFound { page_id } => write!(f, "Page [{}] can not be found", page_id),
            ErrorKind::PageAlreadyExists { page_id } => {
                write!(f, "Page [{}] already exists", page_id)
            }
            ErrorKind::PositionConflict { api_id, position } => write!(
                f,
                "Position {} is already taken in API [{}]",
                position, api_id
            ),
            ErrorKind::PositionOutOfRange {
                api_id,
                position,
                first,
                last,
            } => write!(
                f,
                "Position {} is outside {}..={} in API [{}]",
                position, first, last, api_id
            ),
            ErrorKind::InvalidReorderRequest { page_id, reason } => {
                write!(f, "Invalid reorder request for page [{}]: {}", page_id, reason)
            }
            ErrorKind::Storage { message } => write!(f, "Storage error: {}", message),
            ErrorKind::ReorderAborted {
                api_id,
                page_id,
                applied,
                planned,
            } => write!(
                f,
                "Reorder of API [{}] aborted at page [{}] after {}/{} writes",
                api_id, page_id, applied, planned
            ),
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::ConfigError { message } => write!(f, "Configuration error: {}", message),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why separate ErrorKind and PagedirError?

ErrorKind is what callers match on. PagedirError wraps it with the runtime
context strings attached during propagation, an optional causing error and
the span trace captured where the error was created.
*/

/// Error type wrapping [`ErrorKind`] with context, cause and span trace.
pub struct PagedirError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<PagedirError>>,
    span_trace: SpanTrace,
}

impl PagedirError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a new boxed error, the shape used by [`PagedirResult`].
    pub fn boxed(kind: ErrorKind) -> Box<Self> {
        Box::new(Self::new(kind))
    }

    /// Creates a plain message error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that caused this one.
    pub fn caused_by(mut self, cause: impl Into<Box<PagedirError>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the attached context strings, oldest first.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the error that caused this one, if any.
    pub fn cause(&self) -> Option<&PagedirError> {
        self.cause.as_deref()
    }

    /// Returns the span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// True if this error reports a missing page.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::PageNotFound { .. })
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        let children = self.context.len() + usize::from(self.cause.is_some());
        for (i, ctx) in self.context.iter().enumerate() {
            let connector = if i + 1 == children { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, connector, ctx)?;
        }
        if let Some(cause) = &self.cause {
            writeln!(f, "{}└─ cause: {}", indent, cause.kind)?;
            cause.write_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for PagedirError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for PagedirError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        if let Some(cause) = &self.cause {
            return Some(cause.as_ref());
        }
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for PagedirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for PagedirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        self.write_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/// Standard result type for page directory operations.
pub type PagedirResult<T> = std::result::Result<T, Box<PagedirError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> PagedirResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> PagedirResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for PagedirResult<T> {
    fn context(self, context: impl Into<String>) -> PagedirResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> PagedirResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Creates a boxed message error using `format!` syntax.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::error::PagedirError::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed message error using `format!` syntax.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}

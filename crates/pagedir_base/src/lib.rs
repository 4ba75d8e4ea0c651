/* 📖 # Why have pagedir_base as a core library?
pagedir_base provides the error handling and tracing setup shared by the
engine and the CLI, without depending on either.
*/

pub mod error;
mod error_tests;
pub mod tracing;

pub use error::{ErrorKind, PagedirError, PagedirResult, ResultExt};

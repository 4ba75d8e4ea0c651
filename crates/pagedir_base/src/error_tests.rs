/* 📖 # Why use a separate file for these error tests?

Some cases verify span traces, which embed source locations. Keeping them out
of the error module keeps those locations stable while the module changes.
*/

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::{PagedirError, PagedirResult, ResultExt};
    use expect_test::expect;
    use std::error::Error;
    use std::io;
    use std::path::PathBuf;
    use tracing::span;
    use tracing_error::ErrorLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    /// Set up tracing with ErrorLayer for tests.
    /// Uses `try_init()` to handle multiple tests running concurrently.
    fn setup_tracing_subscriber() {
        let _ = tracing_subscriber::registry()
            .with(ErrorLayer::default())
            .try_init();
    }

    fn storage_error(message: &str) -> PagedirError {
        PagedirError::new(ErrorKind::Storage {
            message: message.to_string(),
        })
    }

    #[test]
    fn test_error_from_message() {
        let error = PagedirError::message("something went wrong");

        match error.kind() {
            ErrorKind::Message { message } => {
                assert_eq!(message, "something went wrong");
            }
            _ => panic!("Expected Message variant"),
        }
    }

    #[test]
    fn test_error_context_attachment() {
        let error = PagedirError::message("original error")
            .context("first context")
            .context("second context");

        assert_eq!(error.get_context().len(), 2);
        assert_eq!(error.get_context()[0], "first context");
        assert_eq!(error.get_context()[1], "second context");
    }

    #[test]
    fn test_error_with_context_lazy_evaluation() {
        let mut called = false;
        let error = PagedirError::message("error").with_context(|| {
            called = true;
            "lazy context".to_string()
        });

        assert!(called);
        assert_eq!(error.get_context()[0], "lazy context");
    }

    #[test]
    fn test_error_display_with_multiple_contexts() {
        let error = PagedirError::message("root error")
            .context("first")
            .context("second")
            .context("third");
        assert_eq!(error.to_string(), "first: second: third: root error");
    }

    #[test]
    fn test_error_display_page_not_found() {
        let error = PagedirError::new(ErrorKind::PageNotFound {
            page_id: "abc".to_string(),
        });
        assert_eq!(error.to_string(), "Page [abc] can not be found");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_storage_error_is_not_not_found() {
        let error = storage_error("disk full");
        assert!(!error.is_not_found());
        assert_eq!(error.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_error_display_reorder_aborted() {
        let error = PagedirError::new(ErrorKind::ReorderAborted {
            api_id: "api-1".to_string(),
            page_id: "page-2".to_string(),
            applied: 1,
            planned: 3,
        });
        assert_eq!(
            error.to_string(),
            "Reorder of API [api-1] aborted at page [page-2] after 1/3 writes"
        );
    }

    #[test]
    fn test_error_display_invalid_reorder() {
        let error = PagedirError::new(ErrorKind::InvalidReorderRequest {
            page_id: "p".to_string(),
            reason: "position 9 outside [1, 3]".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Invalid reorder request for page [p]: position 9 outside [1, 3]"
        );
    }

    #[test]
    fn test_error_display_file_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let error = PagedirError::new(ErrorKind::FileError {
            path: PathBuf::from("/tmp/pagedir.toml"),
            source: io_err,
        });
        let display = error.to_string();
        assert!(display.contains("/tmp/pagedir.toml"));
        assert!(display.contains("not found"));
    }

    #[test]
    fn test_error_source_file_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error = PagedirError::new(ErrorKind::FileError {
            path: PathBuf::from("test.txt"),
            source: io_err,
        });
        assert!(error.source().is_some());
        assert_eq!(error.root_cause().to_string(), "access denied");
    }

    #[test]
    fn test_error_source_message() {
        let error = PagedirError::message("test");
        assert!(error.source().is_none());
        assert_eq!(error.root_cause().to_string(), "test");
    }

    #[test]
    fn test_error_cause_is_source() {
        let error = PagedirError::message("outer").caused_by(storage_error("write refused"));
        assert_eq!(
            error.cause().map(|cause| cause.to_string()),
            Some("Storage error: write refused".to_string())
        );
        assert_eq!(
            error.root_cause().to_string(),
            "Storage error: write refused"
        );
    }

    #[test]
    fn test_result_ext_context_success() {
        let result: PagedirResult<i32> = Ok(42);
        assert_eq!(result.context("operation failed").unwrap(), 42);
    }

    #[test]
    fn test_result_ext_chaining() {
        let result: PagedirResult<i32> = Err(Box::new(PagedirError::message("root")));
        let err = result
            .context("step 1")
            .context("step 2")
            .with_context(|| "step 3".to_string())
            .unwrap_err();
        assert_eq!(err.to_string(), "step 1: step 2: step 3: root");
    }

    #[test]
    fn test_err_macro_formats_message() {
        fn fails() -> PagedirResult<()> {
            crate::bail!("page {} is broken", 7)
        }
        let err = fails().unwrap_err();
        assert_eq!(err.to_string(), "page 7 is broken");
    }

    #[test]
    fn test_debug_tree_without_span() {
        let error = PagedirError::message("outer error")
            .context("outer context")
            .caused_by(PagedirError::message("inner error").context("inner context"));

        expect![[r#"
            outer error
            ├─ outer context
            └─ cause: inner error
               └─ inner context

        "#]]
        .assert_debug_eq(&error);
    }

    #[test]
    fn test_debug_tree_reorder_failure() {
        let error = PagedirError::new(ErrorKind::ReorderAborted {
            api_id: "api".to_string(),
            page_id: "b".to_string(),
            applied: 2,
            planned: 3,
        })
        .context("reordering page [a]")
        .caused_by(storage_error("write refused").context("updating page [b]"));

        expect![[r#"
            Reorder of API [api] aborted at page [b] after 2/3 writes
            ├─ reordering page [a]
            └─ cause: Storage error: write refused
               └─ updating page [b]

        "#]]
        .assert_debug_eq(&error);
    }

    #[test]
    fn test_debug_includes_span_trace() {
        setup_tracing_subscriber();

        let operation_span = span!(tracing::Level::DEBUG, "reorder_operation", api = "api-7");
        let _guard = operation_span.enter();

        let error = storage_error("timeout");
        let debug = format!("{:?}", error);

        assert!(debug.starts_with("Storage error: timeout\n"));
        assert!(debug.contains("Trace:"));
        assert!(debug.contains("reorder_operation"));
    }
}

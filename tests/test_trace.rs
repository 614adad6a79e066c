//! Tests for the diagnostic trace sink

use layernet::utils::trace::{Level, Trace, DEFAULT_TRACE_FILE, MAX_MESSAGE_SIZE, MAX_TRACE_FILE_SIZE};
use std::fs;
use tempfile::tempdir;

// ============================================================================
// Formatting Tests
// ============================================================================

mod format_tests {
    use super::*;

    #[test]
    fn test_report_line_layout() {
        let line = Trace::format(Level::Warning, "loss is rising");

        assert!(line.starts_with("[Warning @ "));
        assert!(line.ends_with("]: loss is rising"));

        // [Warning @ YYYY-MM-DD HH:MM:SS]
        let stamp = &line["[Warning @ ".len().."[Warning @ ".len() + 19];
        let bytes = stamp.as_bytes();
        assert_eq!(bytes[4], b'-');
        assert_eq!(bytes[7], b'-');
        assert_eq!(bytes[10], b' ');
        assert_eq!(bytes[13], b':');
        assert_eq!(bytes[16], b':');
        assert!(stamp.chars().filter(|c| c.is_ascii_digit()).count() == 14);
    }

    #[test]
    fn test_levels() {
        assert!(Trace::format(Level::Info, "x").starts_with("[Info @ "));
        assert!(Trace::format(Level::Error, "x").starts_with("[Error @ "));
    }

    #[test]
    fn test_empty_message() {
        assert!(Trace::format(Level::Info, "").ends_with("]: Internal error"));
    }

    #[test]
    fn test_default_path() {
        assert_eq!(Trace::default().path().to_str(), Some(DEFAULT_TRACE_FILE));
    }
}

// ============================================================================
// Log File Tests
// ============================================================================

mod file_tests {
    use super::*;

    #[test]
    fn test_append_creates_and_appends() {
        let dir = tempdir().unwrap();
        let trace = Trace::new(dir.path().join("trace.log"));

        trace.append("first").unwrap();
        trace.append("second").unwrap();

        let contents = fs::read_to_string(trace.path()).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn test_info_report_reaches_file() {
        let dir = tempdir().unwrap();
        let trace = Trace::new(dir.path().join("trace.log"));

        trace.report(Level::Info, "epoch 1 done");
        trace.report(Level::Warning, "learning rate scaled");
        trace.check(true, "not written");

        let contents = fs::read_to_string(trace.path()).unwrap();
        assert_eq!(contents, "epoch 1 done\nlearning rate scaled\n");
    }

    #[test]
    fn test_long_message_is_clipped() {
        let dir = tempdir().unwrap();
        let trace = Trace::new(dir.path().join("trace.log"));

        trace.append(&"z".repeat(MAX_MESSAGE_SIZE * 2)).unwrap();

        let contents = fs::read_to_string(trace.path()).unwrap();
        assert_eq!(contents.len(), MAX_MESSAGE_SIZE + 1);
    }

    #[test]
    fn test_oversized_file_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trace.log");
        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_TRACE_FILE_SIZE + 1).unwrap();
        drop(file);

        let trace = Trace::new(&path);
        trace.append("fresh").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_small_file_is_appended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trace.log");
        fs::write(&path, "old\n").unwrap();

        Trace::new(&path).append("new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_unwritable_path_is_reported_by_append_only() {
        let dir = tempdir().unwrap();
        let trace = Trace::new(dir.path().join("missing").join("trace.log"));

        assert!(trace.append("lost").is_err());
        // report swallows the failure
        trace.report(Level::Info, "still fine");
    }
}

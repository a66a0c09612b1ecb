//! Stack-trace noise removal for logged ETL error text.
//!
//! Transformation tools log the whole Java exception chain into the error
//! tables. Only the lines a human acts on are kept: frames, `Caused by:`
//! wrappers, `... N more` continuations, bare exception class names and
//! engine-internal lines are dropped, and each remaining line appears once.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Lines matching any of these are discarded. Patterns are unanchored unless
/// they start with `^`.
static NOISE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // stack frame
        r"^\s*at\s.*",
        // "... 12 more"
        r"^\s*\.\.\. \d+ more\b.*",
        r"^\s*Caused by:\s.*",
        // trailing marker, e.g. "Unexpected Exception:"
        r"\bException:\s*$",
        // line holding nothing but an exception class name
        r"^\s*(?:[A-Za-z_$][\w$]*\.)*[\w$]*Exception:?\s*$",
        r"^\s*$",
        // engine internals
        r".*org\.pentaho\..*",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("noise pattern"))
    .collect()
});

fn is_noise(line: &str) -> bool {
    NOISE_PATTERNS.iter().any(|re| re.is_match(line))
}

/// Strip noise lines and repeated lines from a raw error description.
///
/// Surviving lines are trimmed and kept in first-seen order; duplicates are
/// detected within this message only. The result is stable under repeated
/// cleaning.
pub fn clean_error(raw: &str) -> String {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for line in raw.lines() {
        if is_noise(line) {
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if seen.insert(line) {
            kept.push(line);
        }
    }

    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KETTLE_TRACE: &str = "\
2024/05/02 03:10:44 - Load_Fact - ERROR (version 9.4.0.0-343) : Unexpected error
org.pentaho.di.core.exception.KettleException:
Conversion error: the value 'abc' is not a number
\tat org.pentaho.di.trans.steps.tableoutput.TableOutput.processRow(TableOutput.java:125)
\tat org.pentaho.di.trans.step.RunThread.run(RunThread.java:62)
\tat java.lang.Thread.run(Thread.java:750)
Caused by: java.lang.NumberFormatException: For input string: \"abc\"
\t... 3 more

Conversion error: the value 'abc' is not a number
";

    #[test]
    fn drops_frames_and_exception_only_lines() {
        let raw = "java.lang.Exception\n\tat com.foo.Bar.run(Bar.java:10)\nReal cause here\nReal cause here";
        assert_eq!(clean_error(raw), "Real cause here");
    }

    #[test]
    fn cleans_kettle_trace() {
        assert_eq!(
            clean_error(KETTLE_TRACE),
            "2024/05/02 03:10:44 - Load_Fact - ERROR (version 9.4.0.0-343) : Unexpected error\n\
             Conversion error: the value 'abc' is not a number"
        );
    }

    #[test]
    fn duplicates_keep_first_seen_order() {
        let raw = "b\na\n  b  \nc\na\n";
        assert_eq!(clean_error(raw), "b\na\nc");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let once = clean_error(KETTLE_TRACE);
        assert_eq!(clean_error(&once), once);

        let messy = "  first  \r\n\r\n... 4 more\nsecond\n first\n";
        let once = clean_error(messy);
        assert_eq!(once, "first\nsecond");
        assert_eq!(clean_error(&once), once);
    }

    #[test]
    fn keeps_messages_that_merely_mention_exceptions() {
        let raw = "Exception raised while loading dimension\nRow count mismatch: expected 10";
        assert_eq!(clean_error(raw), raw);
    }

    #[test]
    fn empty_and_noise_only_input_yield_empty_string() {
        assert_eq!(clean_error(""), "");
        assert_eq!(clean_error("\n \n\tat x.y(Z.java:1)\n"), "");
    }
}

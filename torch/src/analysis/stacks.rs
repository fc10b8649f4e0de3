//! Raw stack samples and the dtrace text format
//!
//! A raw sample listing is one frame per line, leaf first, with samples
//! separated by blank lines:
//!
//! ```text
//! strlen
//! parse
//! main
//!
//! __start
//! ```

use std::io::{self, Write};

/// One sampled stack, as frame names
pub type Stack = Vec<String>;

/// Split raw sampler output into stacks
///
/// Lines are trimmed. Any run of blank lines ends the current stack, and a
/// stack still open at the end of input is kept.
#[must_use]
pub fn parse_raw_stacks(text: &str) -> Vec<Stack> {
    let mut stacks = Vec::new();
    let mut current = Vec::new();

    for line in text.lines().map(str::trim) {
        if !line.is_empty() {
            current.push(line.to_string());
        } else if !current.is_empty() {
            stacks.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        stacks.push(current);
    }
    stacks
}

/// Keep the first and last `/`-separated components of a frame
///
/// `handler:/srv/app/lib/server.js:42` becomes `handler:server.js:42`.
#[must_use]
pub fn truncate_frame_path(frame: &str) -> String {
    let mut parts = frame.split('/');
    let first = parts.next().unwrap_or_default();
    match parts.next_back() {
        Some(last) => format!("{first}{last}"),
        None => frame.to_string(),
    }
}

/// Write stacks in the text format dtrace's `ustack()` aggregations print,
/// which flame graph tools read
///
/// Three filler lines open the output, then each stack's frames follow with a
/// sample count of one.
///
/// # Errors
/// Returns an error if writing fails
pub fn write_dtrace_text<W: Write>(stacks: &[Stack], writer: &mut W) -> io::Result<()> {
    for _ in 0..3 {
        writeln!(writer, " ")?;
    }

    for stack in stacks {
        for frame in stack {
            writeln!(writer, "{}", truncate_frame_path(frame))?;
        }
        writeln!(writer, "   1")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacks(raw: &[&[&str]]) -> Vec<Stack> {
        raw.iter().map(|s| s.iter().map(|f| (*f).to_string()).collect()).collect()
    }

    fn dtrace_text(stacks: &[Stack]) -> String {
        let mut out = Vec::new();
        write_dtrace_text(stacks, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_splits_on_blank_lines() {
        let parsed = parse_raw_stacks("strlen\nparse\nmain\n\n__start\n");
        assert_eq!(parsed, stacks(&[&["strlen", "parse", "main"], &["__start"]]));
    }

    #[test]
    fn test_parse_elides_repeated_blank_lines() {
        let parsed = parse_raw_stacks("\n\n  foo  \n   \n\n\n\tbar\nmain\n\n");
        assert_eq!(parsed, stacks(&[&["foo"], &["bar", "main"]]));
    }

    #[test]
    fn test_parse_keeps_trailing_stack() {
        assert_eq!(parse_raw_stacks("a\nb"), stacks(&[&["a", "b"]]));
        assert!(parse_raw_stacks("\n \n").is_empty());
    }

    #[test]
    fn test_truncate_frame_path() {
        assert_eq!(truncate_frame_path("foo:/tmp/foo/bar/baz/foo.js:10"), "foo:foo.js:10");
        assert_eq!(truncate_frame_path("main"), "main");
        assert_eq!(truncate_frame_path("a/b"), "ab");
    }

    #[test]
    fn test_dtrace_text_single_frame() {
        assert_eq!(dtrace_text(&stacks(&[&["main"]])), " \n \n \nmain\n   1\n");
    }

    #[test]
    fn test_dtrace_text_two_stacks() {
        let text = dtrace_text(&stacks(&[&["foo", "main"], &["bar", "main"]]));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [" ", " ", " ", "foo", "main", "   1", "bar", "main", "   1"]);
    }

    #[test]
    fn test_dtrace_text_truncates_paths() {
        let text = dtrace_text(&stacks(&[&[
            "foo:/tmp/foo/bar/baz/foo.js:10",
            "main:/tmp/foo/bar/baz/main.js:20",
        ]]));
        assert!(text.ends_with("foo:foo.js:10\nmain:main.js:20\n   1\n"));
    }
}

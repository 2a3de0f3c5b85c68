use std::path::Path;

pub const DEFAULT_TAIL_LINES: usize = 20;

/// Last `max_lines` lines of a log file, joined with newlines.
///
/// Returns the full content when the file is shorter, and `None` when the
/// file is missing, unreadable, or has no lines at all.
pub fn read_tail(path: &Path, max_lines: usize) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return None;
    }
    let start = lines.len().saturating_sub(max_lines);
    Some(lines[start..].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_lines(dir: &TempDir, count: usize) -> std::path::PathBuf {
        let path = dir.path().join("out.log");
        let text: String = (1..=count).map(|n| format!("line {n}\n")).collect();
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn long_file_yields_exactly_the_last_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_lines(&dir, 25);

        let tail = read_tail(&path, DEFAULT_TAIL_LINES).unwrap();
        let lines: Vec<&str> = tail.lines().collect();
        assert_eq!(lines.len(), 20);
        assert_eq!(lines.first(), Some(&"line 6"));
        assert_eq!(lines.last(), Some(&"line 25"));
    }

    #[test]
    fn short_file_yields_full_content() {
        let dir = TempDir::new().unwrap();
        let path = write_lines(&dir, 3);

        assert_eq!(
            read_tail(&path, DEFAULT_TAIL_LINES).unwrap(),
            "line 1\nline 2\nline 3"
        );
    }

    #[test]
    fn missing_file_yields_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_tail(&dir.path().join("ghost.log"), 20).is_none());
    }

    #[test]
    fn empty_file_yields_none() {
        let dir = TempDir::new().unwrap();
        let path = write_lines(&dir, 0);
        assert!(read_tail(&path, 20).is_none());
    }
}

use crate::domain::{SessionRecord, parse_log_line, parse_session_content};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

pub fn load_session_record(path: &Path) -> io::Result<SessionRecord> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    let parsed = parse_session_content(&content);
    if parsed.skipped_lines > 0 {
        log::debug!(
            "skipped {} malformed line(s) in {}",
            parsed.skipped_lines,
            path.display()
        );
    }

    Ok(SessionRecord::new(
        path.to_path_buf(),
        parsed.metadata,
        parsed.messages,
        bytes.len() as u64,
    ))
}

/// Re-parses the file when it has grown past `known_size` bytes.
pub fn reload_if_grown(path: &Path, known_size: u64) -> io::Result<Option<SessionRecord>> {
    let size = fs::metadata(path)?.len();
    if size <= known_size {
        return Ok(None);
    }
    load_session_record(path).map(Some)
}

/// First `cwd` found in the file, reading no further than needed.
pub fn scan_cwd_hint(path: &Path) -> io::Result<Option<PathBuf>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(record) = parse_log_line(line) else {
            continue;
        };
        if let Some(cwd) = record.envelope.cwd {
            return Ok(Some(cwd));
        }
    }
}

//! Replay of recorded flows from text.
//!
//! Format, one packet per line:
//!
//! ```text
//! # src            dst             bytes
//! 192.168.1.10     142.250.74.46   1514
//! fe80::1          ff02::fb        96
//! ```
//!
//! Blank lines and `#` comments are ignored. Lines that don't parse become
//! [`SkipReason::Malformed`] events.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::net::IpAddr;
use std::path::Path;

use crate::error::{Error, Result};
use crate::source::{PacketEvent, PacketSource, SkipReason, SourceEvent};

pub struct ReplaySource {
    name: String,
    reader: Box<dyn BufRead + Send>,
    line: Vec<u8>,
}

impl ReplaySource {
    /// Open a replay file; `-` reads stdin.
    pub fn open(path: &Path) -> Result<Self> {
        if path == Path::new("-") {
            return Ok(Self::from_reader("replay:stdin", BufReader::new(io::stdin())));
        }
        let file = File::open(path).map_err(|source| Error::Replay {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(
            format!("replay:{}", path.display()),
            BufReader::new(file),
        ))
    }

    pub fn from_reader(name: impl Into<String>, reader: impl BufRead + Send + 'static) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(reader),
            line: Vec::new(),
        }
    }
}

impl PacketSource for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_event(&mut self) -> Option<SourceEvent> {
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return None,
                Ok(_) => {
                    let Ok(text) = std::str::from_utf8(&self.line) else {
                        return Some(SourceEvent::Skipped(SkipReason::Malformed));
                    };
                    if let Some(event) = parse_line(text) {
                        return Some(event);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::warn!("{}: read failed: {e}", self.name);
                    return None;
                }
            }
        }
    }
}

/// Parse one replay line. `None` for blank lines and comments.
pub fn parse_line(line: &str) -> Option<SourceEvent> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(match parse_fields(line) {
        Some(ev) => SourceEvent::Packet(ev),
        None => SourceEvent::Skipped(SkipReason::Malformed),
    })
}

fn parse_fields(line: &str) -> Option<PacketEvent> {
    let mut fields = line.split_whitespace();
    let source: IpAddr = fields.next()?.parse().ok()?;
    let destination: IpAddr = fields.next()?.parse().ok()?;
    let size: usize = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(PacketEvent::new(source, destination, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn parses_v4_and_v6() {
        match parse_line("10.0.0.1 10.0.0.2 1500\n") {
            Some(SourceEvent::Packet(ev)) => {
                assert_eq!(ev.source.to_string(), "10.0.0.1");
                assert_eq!(ev.destination.to_string(), "10.0.0.2");
                assert_eq!(ev.size, 1500);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_line("fe80::1\tff02::fb\t96"),
            Some(SourceEvent::Packet(_))
        ));
    }

    #[test]
    fn comments_and_blanks_are_ignored() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   \n"), None);
        assert_eq!(parse_line("# src dst bytes"), None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        for line in [
            "10.0.0.1 10.0.0.2",
            "10.0.0.1 nope 10",
            "10.0.0.1 10.0.0.2 -5",
            "10.0.0.1 10.0.0.2 5 extra",
            "999.0.0.1 10.0.0.2 5",
        ] {
            assert_eq!(
                parse_line(line),
                Some(SourceEvent::Skipped(SkipReason::Malformed)),
                "{line}"
            );
        }
    }

    #[test]
    fn reader_yields_events_in_order_then_ends() {
        let text = "# header\n10.0.0.1 10.0.0.2 10\n\nbad line\n10.0.0.3 10.0.0.4 20\n";
        let mut src = ReplaySource::from_reader("test", Cursor::new(text));
        assert_eq!(src.name(), "test");

        let mut sizes = Vec::new();
        let mut skipped = 0;
        while let Some(ev) = src.next_event() {
            match ev {
                SourceEvent::Packet(p) => sizes.push(p.size),
                SourceEvent::Skipped(_) => skipped += 1,
                SourceEvent::Idle => {}
            }
        }
        assert_eq!(sizes, vec![10, 20]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn non_utf8_line_is_skipped_and_reading_continues() {
        let bytes = b"10.0.0.1 10.0.0.2 10\n\xff\xfe bad\n10.0.0.3 10.0.0.4 20\n".to_vec();
        let mut src = ReplaySource::from_reader("test", Cursor::new(bytes));

        let events: Vec<_> = std::iter::from_fn(|| src.next_event()).collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], SourceEvent::Packet(ref p) if p.size == 10));
        assert_eq!(events[1], SourceEvent::Skipped(SkipReason::Malformed));
        assert!(matches!(events[2], SourceEvent::Packet(ref p) if p.size == 20));
    }

    #[test]
    fn opens_files_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "192.168.0.1 192.168.0.2 64").unwrap();
        let mut src = ReplaySource::open(file.path()).unwrap();
        assert!(src.name().starts_with("replay:"));
        assert!(matches!(src.next_event(), Some(SourceEvent::Packet(_))));
        assert_eq!(src.next_event(), None);
    }
}

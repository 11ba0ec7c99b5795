//! Log-line source
//!
//! Reads events from text where each line is an RFC 3339 timestamp followed
//! by an event name:
//!
//! ```text
//! 2014-09-24T19:47:32-07:00 first
//! 2014-09-24T19:47:42-07:00 second
//! ```

use crate::error::{ReplayError, Result};
use crate::event::{Event, Source, Timestamp};
use chrono::{DateTime, FixedOffset, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// A named event parsed from one log line.
///
/// The timestamp keeps the offset it was recorded with; it is only
/// normalized to UTC when the engine asks for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub name: String,
}

impl Event for LogEvent {
    fn timestamp(&self) -> Timestamp {
        self.timestamp.with_timezone(&Utc)
    }
}

impl FromStr for LogEvent {
    type Err = ReplayError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (ts, name) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| ReplayError::InvalidLine {
                line: line.to_string(),
                reason: "missing event name".to_string(),
            })?;

        let timestamp = DateTime::parse_from_rfc3339(ts)?;
        Ok(Self {
            timestamp,
            name: name.trim().to_string(),
        })
    }
}

/// Pulls [`LogEvent`]s out of a line-oriented reader.
///
/// Blank lines are skipped. The first line that fails to parse (or a read
/// error) ends the stream; the cause is kept in [`LogLineSource::last_error`].
pub struct LogLineSource<R> {
    lines: Lines<R>,
    line_no: usize,
    finished: bool,
    last_error: Option<ReplayError>,
}

impl<R: BufRead> LogLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            finished: false,
            last_error: None,
        }
    }

    /// Why the stream ended early, if it did.
    pub fn last_error(&self) -> Option<&ReplayError> {
        self.last_error.as_ref()
    }

    /// Number of lines read so far.
    pub fn lines_read(&self) -> usize {
        self.line_no
    }

    fn fail(&mut self, err: ReplayError) -> Option<LogEvent> {
        warn!(line = self.line_no, error = %err, "ending log stream early");
        self.last_error = Some(err);
        self.finished = true;
        None
    }
}

impl LogLineSource<BufReader<File>> {
    /// Open a log file for replay.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Source for LogLineSource<R> {
    type Event = LogEvent;

    fn next_event(&mut self) -> Option<LogEvent> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return self.fail(e.into()),
                None => {
                    self.finished = true;
                    return None;
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            return match line.parse() {
                Ok(event) => Some(event),
                Err(e) => self.fail(e),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = "2014-09-24T19:47:32-07:00 first
2014-09-24T19:47:42-07:00 second

2014-09-24T19:48:13-07:00 third
";

    #[test]
    fn test_parse_line() {
        let ev: LogEvent = "2014-09-24T19:47:32-07:00 first".parse().unwrap();
        assert_eq!(ev.name, "first");
        assert_eq!(ev.timestamp.offset().local_minus_utc(), -7 * 3600);
        assert_eq!(ev.timestamp.to_rfc3339(), "2014-09-24T19:47:32-07:00");
        assert_eq!(
            Event::timestamp(&ev),
            Utc.with_ymd_and_hms(2014, 9, 25, 2, 47, 32).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_missing_name() {
        let err = "2014-09-24T19:47:32-07:00".parse::<LogEvent>().unwrap_err();
        assert!(matches!(err, ReplayError::InvalidLine { .. }));
    }

    #[test]
    fn test_parse_rejects_bad_timestamp() {
        let err = "yesterday lunch".parse::<LogEvent>().unwrap_err();
        assert!(matches!(err, ReplayError::Timestamp(_)));
    }

    #[test]
    fn test_reads_all_events_skipping_blanks() {
        let mut src = LogLineSource::new(SAMPLE.as_bytes());
        let mut names = Vec::new();
        while let Some(ev) = src.next_event() {
            names.push(ev.name);
        }
        assert_eq!(names, vec!["first", "second", "third"]);
        assert!(src.last_error().is_none());
        assert_eq!(src.lines_read(), 4);
        assert_eq!(src.next_event(), None);
    }

    #[test]
    fn test_bad_line_ends_stream() {
        let data = "2014-09-24T19:47:32-07:00 first\nnot-a-time oops\n2014-09-24T19:48:13-07:00 third\n";
        let mut src = LogLineSource::new(data.as_bytes());

        assert_eq!(src.next_event().map(|e| e.name), Some("first".to_string()));
        assert_eq!(src.next_event(), None);
        assert!(matches!(src.last_error(), Some(ReplayError::Timestamp(_))));

        // Stays ended
        assert_eq!(src.next_event(), None);
    }

    #[test]
    fn test_open_missing_file() {
        let err = LogLineSource::open("/definitely/not/here.log").err().unwrap();
        assert!(matches!(err, ReplayError::Io(_)));
    }
}

use std::collections::VecDeque;
use std::io::BufRead;

use crate::Error;

/// Transport seam for the ingestion pipeline.
///
/// `recv` yields one raw line of telemetry. `Ok(None)` signals a clean
/// end of stream (the pipeline stops); [`Error::UpstreamDisconnected`]
/// signals a recoverable failure (the pipeline reconnects with backoff
/// through its connect factory). Implementations wrap whatever carries
/// the stream: a socket, a message-bus consumer, a file of captured
/// readings.
pub trait TelemetrySource: Send {
    fn recv(&mut self) -> Result<Option<String>, Error>;
}

/// Reads newline-delimited telemetry from any [`BufRead`].
pub struct LineSource<R: BufRead + Send> {
    reader: R,
}

impl<R: BufRead + Send> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead + Send> TelemetrySource for LineSource<R> {
    fn recv(&mut self) -> Result<Option<String>, Error> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line.trim_end().to_string())),
            Err(e) => Err(Error::UpstreamDisconnected(e.to_string())),
        }
    }
}

/// In-memory source over a fixed set of lines; ends cleanly when drained.
/// Used in tests and for replaying captured telemetry.
pub struct StaticSource {
    lines: VecDeque<String>,
}

impl StaticSource {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl TelemetrySource for StaticSource {
    fn recv(&mut self) -> Result<Option<String>, Error> {
        Ok(self.lines.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_source_reads_until_eof() {
        let mut source = LineSource::new("one\ntwo\n".as_bytes());
        assert_eq!(source.recv().unwrap(), Some("one".to_string()));
        assert_eq!(source.recv().unwrap(), Some("two".to_string()));
        assert_eq!(source.recv().unwrap(), None);
    }

    #[test]
    fn static_source_drains_cleanly() {
        let mut source = StaticSource::from_lines(["a"]);
        assert_eq!(source.recv().unwrap(), Some("a".to_string()));
        assert_eq!(source.recv().unwrap(), None);
    }
}

// Line-oriented transport to the controller board
// Inbound lines are read by a single reader; outbound lines share one locked writer

use parking_lot::Mutex;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::settings::SerialSettings;

/// Blocking line reader that tolerates read timeouts and partial lines
pub struct LineReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            pending: Vec::new(),
        }
    }

    /// Read the next line without its terminator.
    /// Returns `None` once the stream is closed.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            match self.inner.read_until(b'\n', &mut self.pending) {
                Ok(0) => {
                    if self.pending.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(self.take_line()));
                }
                Ok(_) => {
                    if self.pending.last() == Some(&b'\n') {
                        return Ok(Some(self.take_line()));
                    }
                }
                // Serial ports report an idle line as a timeout; keep the partial line
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn take_line(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes)
            .trim_end_matches(['\r', '\n'])
            .to_string()
    }
}

/// Shared writer; each call writes one whole line and flushes under the lock
#[derive(Clone)]
pub struct LineWriter {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl LineWriter {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.inner.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// Open the serial device and split it into a reader and a shared writer
pub fn open_serial(
    settings: &SerialSettings,
) -> Result<(LineReader<Box<dyn serialport::SerialPort>>, LineWriter), serialport::Error> {
    let port = serialport::new(&settings.port, settings.baud_rate)
        .timeout(Duration::from_millis(settings.read_timeout_ms))
        .open()?;
    let writer = port.try_clone()?;

    tracing::info!(port = %settings.port, baud = settings.baud_rate, "serial port open");

    Ok((LineReader::new(port), LineWriter::new(writer)))
}

/// In-memory writer for tests; the returned buffer sees every written byte
#[cfg(test)]
pub(crate) fn memory_writer() -> (LineWriter, Arc<Mutex<Vec<u8>>>) {
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let buffer = Arc::new(Mutex::new(Vec::new()));
    (LineWriter::new(Shared(buffer.clone())), buffer)
}

/// Lines written so far to a [`memory_writer`] buffer
#[cfg(test)]
pub(crate) fn written_lines(buffer: &Mutex<Vec<u8>>) -> Vec<String> {
    String::from_utf8_lossy(&buffer.lock())
        .lines()
        .map(|l| l.to_string())
        .collect()
}

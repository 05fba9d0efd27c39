use std::io::{self, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Window {
    data: Vec<u8>,
    /// Absolute stream offset of `data[0]`.
    base: u64,
    /// Absolute write position.
    pos: u64,
}

/// Seekable write buffer whose head can be drained once the archive writer
/// no longer needs to revisit it.
///
/// The zip writer seeks back only into the entry it is finishing, so after
/// each new entry begins everything before that entry's start is final and
/// can go to the response. Seeking into drained bytes is an error.
#[derive(Clone, Default)]
pub struct Spool {
    window: Arc<Mutex<Window>>,
}

impl Spool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, Window>> {
        self.window
            .lock()
            .map_err(|_| io::Error::other("archive spool poisoned"))
    }

    /// Current absolute write position.
    pub fn position(&self) -> io::Result<u64> {
        Ok(self.lock()?.pos)
    }

    /// Removes and returns every buffered byte before absolute offset `mark`.
    pub fn drain_to(&self, mark: u64) -> io::Result<Vec<u8>> {
        let mut window = self.lock()?;
        let end = mark.saturating_sub(window.base).min(window.data.len() as u64) as usize;
        let head: Vec<u8> = window.data.drain(..end).collect();
        window.base += end as u64;
        Ok(head)
    }

    pub fn drain_all(&self) -> io::Result<Vec<u8>> {
        let end = {
            let window = self.lock()?;
            window.base + window.data.len() as u64
        };
        self.drain_to(end)
    }

    /// Bytes currently held.
    pub fn buffered(&self) -> io::Result<usize> {
        Ok(self.lock()?.data.len())
    }
}

impl Write for Spool {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut window = self.lock()?;
        let start = (window.pos - window.base) as usize;
        let end = start + buf.len();
        if window.data.len() < end {
            window.data.resize(end, 0);
        }
        window.data[start..end].copy_from_slice(buf);
        window.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for Spool {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let mut window = self.lock()?;
        let end = window.base as i128 + window.data.len() as i128;
        let absolute = match target {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => window.pos as i128 + delta as i128,
            SeekFrom::End(delta) => end + delta as i128,
        };
        if absolute < window.base as i128 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "seek into bytes already sent",
            ));
        }
        window.pos = absolute as u64;
        Ok(window.pos)
    }
}

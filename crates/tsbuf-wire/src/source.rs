use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::net::TcpStream;

/// A sequential byte stream that may or may not be able to rewind.
///
/// Seeking is a capability the packet-size detector probes for, not
/// something it can assume: a file can go back to offset 0 after the
/// probe read, a pipe or socket cannot. Sources that can rewind override
/// [`rewind_to_start`](Self::rewind_to_start); everything else keeps the
/// default, which reports "unsupported" without touching the stream.
///
/// ```text
/// ┌──────────────────────────┬────────────┐
/// │ Source                   │ Rewind     │
/// ├──────────────────────────┼────────────┤
/// │ File, Cursor<T>          │ yes        │
/// │ Seekable<R: Read + Seek> │ yes        │
/// │ Stdin, TcpStream, &[u8]  │ no         │
/// │ Sequential<R: Read>      │ no         │
/// └──────────────────────────┴────────────┘
/// ```
pub trait ByteSource: Read {
    /// Reposition the source at absolute offset 0.
    ///
    /// Returns `Ok(true)` when the source was rewound, `Ok(false)` when
    /// it has no way to seek.
    ///
    /// # Errors
    ///
    /// Returns the underlying error when the source supports seeking
    /// but the seek itself failed.
    fn rewind_to_start(&mut self) -> io::Result<bool> {
        Ok(false)
    }
}

impl ByteSource for File {
    fn rewind_to_start(&mut self) -> io::Result<bool> {
        self.seek(SeekFrom::Start(0))?;
        Ok(true)
    }
}

impl<T: AsRef<[u8]>> ByteSource for Cursor<T> {
    fn rewind_to_start(&mut self) -> io::Result<bool> {
        self.set_position(0);
        Ok(true)
    }
}

impl ByteSource for &[u8] {}
impl ByteSource for io::Stdin {}
impl ByteSource for io::StdinLock<'_> {}
impl ByteSource for TcpStream {}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn rewind_to_start(&mut self) -> io::Result<bool> {
        (**self).rewind_to_start()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn rewind_to_start(&mut self) -> io::Result<bool> {
        (**self).rewind_to_start()
    }
}

/// Adapts any `Read + Seek` type into a rewindable [`ByteSource`].
#[derive(Debug)]
pub struct Seekable<R>(pub R);

impl<R: Read> Read for Seekable<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read + Seek> ByteSource for Seekable<R> {
    fn rewind_to_start(&mut self) -> io::Result<bool> {
        self.0.seek(SeekFrom::Start(0))?;
        Ok(true)
    }
}

/// Adapts any reader into a forward-only [`ByteSource`], hiding a
/// `Seek` impl it may have.
#[derive(Debug)]
pub struct Sequential<R>(pub R);

impl<R: Read> Read for Sequential<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read> ByteSource for Sequential<R> {}

/// Read until `buf` is full or the reader reports end of input.
///
/// Returns the number of bytes placed in `buf`; anything short of
/// `buf.len()` means the stream ended. `Interrupted` reads are retried.
/// Unlike `read_exact`, a short stream is not an error, and unlike a
/// single `read`, a source that trickles bytes in small pieces still
/// fills the whole buffer.
///
/// # Errors
///
/// Any read error other than `Interrupted` is returned as-is; bytes
/// already copied into `buf` are then unspecified.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

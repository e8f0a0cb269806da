use crate::error::FrameError;
use crate::frame::{Frame, FrameKind, CR, CRLF, LF};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Per-pull read size and the base of the initial buffer sizing.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Aggregate nesting cap for standalone decoding. The live session path uses
/// the lower cap carried by [`crate::config::Config`].
pub const MAX_NESTING_DEPTH: usize = 30;

/// A wrapper over a byte stream, used to read and write RESP frames.
///
/// The handler owns a growable receive buffer in front of the stream. Reads
/// pull at most one `chunk_size` chunk from the stream at a time; a pull that
/// comes back short latches `eof_seen`, because a RESP peer commonly writes a
/// complete command in one short write. The latch never reverts: buffered
/// bytes are still served, and only once the buffer drains does a read report
/// [`FrameError::Eof`].
pub struct Handler<S> {
    stream: S,
    buffer: BytesMut,
    chunk_size: usize,
    eof_seen: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Handler<S> {
    pub fn new(stream: S) -> Self {
        Self::with_chunk_size(stream, DEFAULT_CHUNK_SIZE)
    }

    /// Creates a handler pulling `chunk_size` bytes per upstream read. The
    /// buffer starts at twice that, to cover the first pull and a typical
    /// follow-up without reallocating.
    pub fn with_chunk_size(stream: S, chunk_size: usize) -> Self {
        assert!(chunk_size > 0);
        Self {
            stream,
            buffer: BytesMut::with_capacity(2 * chunk_size),
            chunk_size,
            eof_seen: false,
        }
    }

    /// Whether the source has signaled end-of-stream at least once.
    pub fn seen_eof(&self) -> bool {
        self.eof_seen
    }

    /// The unread bytes currently buffered.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Pulls at most one chunk from the source into the buffer.
    async fn fill(&mut self) -> Result<usize, FrameError> {
        self.buffer.reserve(self.chunk_size);
        let n = self
            .stream
            .read_buf(&mut (&mut self.buffer).limit(self.chunk_size))
            .await?;
        if n < self.chunk_size {
            // the source has drained, at least momentarily
            self.eof_seen = true;
        }
        if n == 0 && self.buffer.is_empty() {
            return Err(FrameError::Eof);
        }
        Ok(n)
    }

    /// Returns the smallest buffered prefix ending in `delim`, inclusive,
    /// consuming it. Pulls more data from the source until the delimiter
    /// shows up, the source drains, or I/O fails.
    pub async fn read_until(&mut self, delim: u8) -> Result<Bytes, FrameError> {
        if self.buffer.is_empty() && self.eof_seen {
            return Err(FrameError::Eof);
        }
        let mut searched = 0;
        loop {
            if let Some(pos) = self.buffer[searched..].iter().position(|&b| b == delim) {
                return Ok(self.buffer.split_to(searched + pos + 1).freeze());
            }
            if self.eof_seen {
                return Err(if self.buffer.is_empty() {
                    FrameError::Eof
                } else {
                    FrameError::IncompleteFrame
                });
            }
            searched = self.buffer.len();
            let n = self.fill().await?;
            debug!("poured {} bytes from the source stream", n);
        }
    }

    /// Returns exactly the next `n` bytes, consuming them.
    pub async fn read_exact(&mut self, n: usize) -> Result<Bytes, FrameError> {
        assert!(n > 0);
        if self.buffer.is_empty() && self.eof_seen {
            return Err(FrameError::Eof);
        }
        while self.buffer.len() < n {
            if self.eof_seen {
                return Err(FrameError::NotEnoughData);
            }
            self.fill().await?;
        }
        Ok(self.buffer.split_to(n).freeze())
    }

    /// Writes `src` to the source and flushes it, returning the number of
    /// bytes written.
    pub async fn send(&mut self, src: &[u8]) -> Result<usize, FrameError> {
        self.stream.write_all(src).await?;
        self.stream.flush().await?;
        Ok(src.len())
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), FrameError> {
        self.send(&frame.as_bytes()).await.map(|_| ())
    }

    /// Reads one CRLF-terminated line and returns it with the terminator
    /// stripped. The result is guaranteed free of CR and LF.
    async fn read_line(&mut self) -> Result<Bytes, FrameError> {
        let line = self.read_until(LF).await?;
        if line.len() < 2 {
            return Err(FrameError::IncompleteFrame);
        }
        if line[line.len() - 2] != CR {
            // bare LF
            return Err(FrameError::Invalid);
        }
        let body = line.slice(..line.len() - 2);
        if body.iter().any(|&b| b == CR) {
            // bare CR
            return Err(FrameError::Invalid);
        }
        Ok(body)
    }

    fn parse_int(field: &[u8]) -> Result<i64, FrameError> {
        std::str::from_utf8(field)
            .map_err(|_| FrameError::Atoi)?
            .parse()
            .map_err(|_| FrameError::Atoi)
    }

    /// Decodes one frame off the stream.
    ///
    /// Aggregates are decoded with an explicit stack rather than recursion;
    /// the stack height stands in for recursion depth, so a frame that would
    /// come to life at `max_depth` or deeper is rejected with
    /// [`FrameError::MaxDepth`] exactly as the recursive formulation would.
    pub async fn decode(
        &mut self,
        depth: usize,
        max_depth: usize,
    ) -> Result<Frame, FrameError> {
        if depth >= max_depth {
            return Err(FrameError::MaxDepth);
        }

        let mut array_stack: Vec<(Vec<Frame>, usize)> = vec![];

        loop {
            // fold completed arrays into previous ones or return the last one if it is completed
            while let Some((complete_array, _)) = array_stack
                .last()
                .is_some_and(|(items, expected)| items.len() == *expected)
                .then(|| array_stack.pop().unwrap())
            {
                let frame = Frame::Array(complete_array);
                match array_stack.last_mut() {
                    None => return Ok(frame),
                    Some((parent, _)) => parent.push(frame),
                }
            }

            if depth + array_stack.len() >= max_depth {
                return Err(FrameError::MaxDepth);
            }

            // Every frame opens with one CRLF-terminated header line; the
            // first byte is the frame tag.
            let header = self.read_line().await?;
            let Some(&tag) = header.first() else {
                return Err(FrameError::Invalid);
            };
            let payload = header.slice(1..);

            let kind = FrameKind::from_u8(tag);
            if kind.is_aggregate() {
                let expected = Self::parse_int(&payload)?;
                if expected < 0 {
                    return Err(FrameError::Invalid);
                }
                array_stack.push((Vec::new(), expected as usize));
                continue;
            }

            let frame = self.non_aggregate(kind, payload).await?;
            match array_stack.last_mut() {
                None => return Ok(frame),
                Some((items, _)) => items.push(frame),
            }
        }
    }

    /// Builds a non-aggregate frame from its kind and header payload, reading
    /// the body off the stream for bulk kinds.
    async fn non_aggregate(
        &mut self,
        kind: FrameKind,
        payload: Bytes,
    ) -> Result<Frame, FrameError> {
        match kind {
            FrameKind::SimpleString => Ok(Frame::SimpleString(payload)),
            FrameKind::SimpleError => Ok(Frame::SimpleError(payload)),
            FrameKind::BigNumber => Ok(Frame::BigNumber(payload)),
            FrameKind::Integer => Ok(Frame::Integer(Self::parse_int(&payload)?)),
            FrameKind::Boolean => match payload.as_ref() {
                b"t" => Ok(Frame::Boolean(true)),
                b"f" => Ok(Frame::Boolean(false)),
                _ => Err(FrameError::Invalid),
            },
            FrameKind::Null => {
                if !payload.is_empty() {
                    return Err(FrameError::Invalid);
                }
                Ok(Frame::Null)
            }
            FrameKind::BulkString => Ok(Frame::BulkString(self.bulk_body(&payload).await?)),
            FrameKind::BulkError => Ok(Frame::BulkError(self.bulk_body(&payload).await?)),
            FrameKind::Array | FrameKind::Undefined => Err(FrameError::Invalid),
        }
    }

    /// Reads a bulk body of the declared length plus its CRLF trailer. A
    /// declared length of -1 is the null-bulk convention: the body is empty
    /// and nothing follows the header.
    async fn bulk_body(&mut self, len_field: &[u8]) -> Result<Bytes, FrameError> {
        let declared = Self::parse_int(len_field)?;
        if declared == -1 {
            return Ok(Bytes::new());
        }
        if declared < 0 {
            return Err(FrameError::Invalid);
        }
        let len = declared as usize;
        let mut body = self.read_exact(len + 2).await?;
        let trailer = body.split_off(len);
        if trailer.as_ref() != CRLF {
            return Err(FrameError::Invalid);
        }
        Ok(body)
    }

    /// Drives one session: each well-formed frame is echoed back to the
    /// peer; a malformed one elicits a `SimpleError` reply carrying the
    /// error mnemonic. Returns when the peer closes or the stream dies.
    pub async fn run(&mut self, max_depth: usize) {
        loop {
            let reply = match self.decode(0, max_depth).await {
                Ok(frame) => frame,
                Err(FrameError::Eof) => {
                    debug!("peer closed the connection");
                    return;
                }
                Err(err) if err.is_fatal() => {
                    warn!("terminating session: {}", err);
                    return;
                }
                Err(err) => Frame::simple_error(&err.to_string()),
            };
            if let Err(err) = self.write_frame(&reply).await {
                warn!("failed to write to the stream: {}", err);
                return;
            }
        }
    }
}

//! Background draining of a single output stream.
//!
//! A [`StreamConsumer`] describes *what* to do with a stream: buffer it all
//! ([`StreamConsumer::accumulate`]) or hand it to a callback line by line
//! ([`StreamConsumer::forward`]). Calling [`StreamConsumer::consume`] spawns a
//! task that starts reading right away and returns a [`ConsumerHandle`], the
//! single point where the caller waits for the result.
//!
//! Lines forwarded from one stream reach the listener in the order they were
//! written. Nothing is promised about interleaving between two streams.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::errors::ProcessError;

/// Callback receiving one line of output, without its line terminator.
pub type LineListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Size of the read buffer used in accumulate mode.
const CHUNK_SIZE: usize = 8192;

/// Policy for draining one output stream.
#[derive(Clone)]
pub enum StreamConsumer {
    /// Buffer the entire stream; the text is returned by [`ConsumerHandle::get`].
    Accumulate,
    /// Split the stream into lines and invoke the listener for each one.
    Forward(LineListener),
}

impl StreamConsumer {
    /// Creates a consumer that buffers the whole stream.
    #[must_use]
    pub fn accumulate() -> Self {
        Self::Accumulate
    }

    /// Creates a consumer that forwards each line to `listener`.
    #[must_use]
    pub fn forward<F>(listener: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self::Forward(Arc::new(listener))
    }

    /// Starts draining `stream` in a background task.
    ///
    /// Draining begins before this function returns. When `cancel` fires the
    /// task stops reading and finishes as if the stream had ended; read errors
    /// observed after cancellation are not reported.
    ///
    /// Must be called from within a tokio runtime.
    pub fn consume<R>(
        self,
        name: &'static str,
        stream: R,
        cancel: CancellationToken,
    ) -> ConsumerHandle
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let task = tokio::spawn(async move {
            match self {
                Self::Accumulate => accumulate(stream, &cancel).await,
                Self::Forward(listener) => forward(stream, &listener, &cancel)
                    .await
                    .map(|()| String::new()),
            }
        });
        ConsumerHandle { name, task }
    }
}

impl fmt::Debug for StreamConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accumulate => f.write_str("Accumulate"),
            Self::Forward(_) => f.write_str("Forward(..)"),
        }
    }
}

/// Handle to a running stream consumer.
#[derive(Debug)]
pub struct ConsumerHandle {
    name: &'static str,
    task: JoinHandle<io::Result<String>>,
}

impl ConsumerHandle {
    /// Waits for the stream to end and returns the accumulated text.
    ///
    /// The text is empty for a forwarding consumer.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Io`] if the stream faulted mid-read or the
    /// listener panicked.
    pub async fn get(self) -> Result<String, ProcessError> {
        match self.task.await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(source)) => Err(ProcessError::io(
                format!("failed to read {}", self.name),
                source,
            )),
            Err(join_error) => Err(ProcessError::io(
                format!("{} consumer stopped unexpectedly", self.name),
                io::Error::other(join_error.to_string()),
            )),
        }
    }
}

async fn accumulate<R>(mut stream: R, cancel: &CancellationToken) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = stream.read(&mut chunk) => result,
        };
        match read {
            Ok(0) => break,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            Err(_) if cancel.is_cancelled() => break,
            Err(e) => return Err(e),
        }
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

async fn forward<R>(
    stream: R,
    listener: &LineListener,
    cancel: &CancellationToken,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = reader.read_until(b'\n', &mut line) => result,
        };
        match read {
            Ok(0) => break,
            Ok(_) => listener(&decode_line(&line)),
            Err(_) if cancel.is_cancelled() => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Strips the line terminator (`\n` or `\r\n`) and decodes lossily.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Yields `data` once, then fails.
    struct FaultyReader {
        data: Option<Vec<u8>>,
    }

    impl AsyncRead for FaultyReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.data.take() {
                Some(data) => {
                    buf.put_slice(&data);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "stream reset",
                ))),
            }
        }
    }

    fn collecting_consumer() -> (StreamConsumer, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let consumer = StreamConsumer::forward(move |line| {
            sink.lock().unwrap().push(line.to_string());
        });
        (consumer, lines)
    }

    #[tokio::test]
    async fn accumulate_returns_stream_verbatim() {
        let input = Cursor::new(b"first\nsecond\n  trailing  ".to_vec());
        let handle =
            StreamConsumer::accumulate().consume("stdout", input, CancellationToken::new());
        assert_eq!(handle.get().await.unwrap(), "first\nsecond\n  trailing  ");
    }

    #[tokio::test]
    async fn forward_delivers_lines_in_order() {
        let (consumer, lines) = collecting_consumer();
        let input = Cursor::new(b"one\r\ntwo\nthree".to_vec());
        let text = consumer
            .consume("stdout", input, CancellationToken::new())
            .get()
            .await
            .unwrap();

        assert!(text.is_empty());
        assert_eq!(*lines.lock().unwrap(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn forward_keeps_empty_lines() {
        let (consumer, lines) = collecting_consumer();
        let input = Cursor::new(b"a\n\nb\n".to_vec());
        consumer
            .consume("stderr", input, CancellationToken::new())
            .get()
            .await
            .unwrap();
        assert_eq!(*lines.lock().unwrap(), vec!["a", "", "b"]);
    }

    #[tokio::test]
    async fn faulted_stream_surfaces_through_get() {
        let reader = FaultyReader {
            data: Some(b"partial".to_vec()),
        };
        let err = StreamConsumer::accumulate()
            .consume("stdout", reader, CancellationToken::new())
            .get()
            .await
            .unwrap_err();

        match err {
            ProcessError::Io { message, source } => {
                assert_eq!(message, "failed to read stdout");
                assert_eq!(source.kind(), io::ErrorKind::ConnectionReset);
            }
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn faulted_stream_after_cancellation_is_end_of_stream() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let reader = FaultyReader { data: None };
        let text = StreamConsumer::accumulate()
            .consume("stdout", reader, cancel)
            .get()
            .await
            .unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn cancellation_ends_a_stream_that_never_closes() {
        let (_writer, reader) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let handle = StreamConsumer::accumulate().consume("stdout", reader, cancel.clone());
        cancel.cancel();
        assert_eq!(handle.get().await.unwrap(), "");
    }

    #[tokio::test]
    async fn panicking_listener_is_reported() {
        let consumer = StreamConsumer::forward(|_| panic!("listener bug"));
        let err = consumer
            .consume("stdout", Cursor::new(b"x\n".to_vec()), CancellationToken::new())
            .get()
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Io { .. }));
    }

    #[test]
    fn decode_line_strips_terminators_only() {
        assert_eq!(decode_line(b"text\r\n"), "text");
        assert_eq!(decode_line(b"text\n"), "text");
        assert_eq!(decode_line(b" text "), " text ");
    }
}

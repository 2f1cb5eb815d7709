//! Decoded audio output of a pipeline

use crate::supervisor::PipelineHandle;
use crate::types::PipelineState;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::ChildStdout;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Raw PCM byte stream read from the transcoder
///
/// Reads pass transcoder output through unchanged. When that output ends, the
/// stream waits for the pipeline to settle and then reports either a clean
/// end-of-stream or an error carrying the
/// [`AbnormalExit`](crate::AbnormalExit) that failed the pipeline.
///
/// Stopping the pipeline ends the stream immediately, including a read that is
/// already pending. Unread bytes are discarded. A joint-failure teardown ends
/// the stream the same way, but with the failure as the error.
pub struct AudioStream {
    output: Option<ChildStdout>,
    handle: PipelineHandle,
    cancelled: BoxFuture<()>,
    settled: Option<BoxFuture<PipelineState>>,
    done: bool,
    bytes_read: u64,
}

impl AudioStream {
    pub(crate) fn new(output: ChildStdout, handle: PipelineHandle) -> Self {
        let cancel = handle.cancellation();
        Self {
            output: Some(output),
            handle,
            cancelled: Box::pin(async move { cancel.cancelled().await }),
            settled: None,
            done: false,
            bytes_read: 0,
        }
    }

    /// Bytes delivered to the reader so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Handle of the pipeline feeding this stream
    pub fn handle(&self) -> &PipelineHandle {
        &self.handle
    }

    /// Clean end-of-stream, unless a stage failed the pipeline
    fn outcome(&self) -> io::Result<()> {
        match self.handle.failure() {
            Some(failure) => Err(io::Error::other(failure)),
            None => Ok(()),
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.output = None;
        self.settled = None;
    }
}

impl AsyncRead for AudioStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.done || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        if this.cancelled.as_mut().poll(cx).is_ready() {
            tracing::debug!("Audio stream cancelled after {} bytes", this.bytes_read);
            this.finish();
            return Poll::Ready(this.outcome());
        }

        if let Some(output) = this.output.as_mut() {
            let before = buf.filled().len();
            if let Err(err) = ready!(Pin::new(output).poll_read(cx, buf)) {
                this.finish();
                return Poll::Ready(Err(err));
            }
            let read = buf.filled().len() - before;
            if read > 0 {
                this.bytes_read += read as u64;
                return Poll::Ready(Ok(()));
            }
            this.output = None;
        }

        let handle = this.handle.clone();
        let settled = this
            .settled
            .get_or_insert_with(|| Box::pin(async move { handle.finished().await }));
        let state = ready!(settled.as_mut().poll(cx));

        tracing::debug!("Audio stream ended after {} bytes ({:?})", this.bytes_read, state);
        this.finish();
        Poll::Ready(this.outcome())
    }
}

impl fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioStream")
            .field("open", &self.output.is_some())
            .field("done", &self.done)
            .field("bytes_read", &self.bytes_read)
            .finish_non_exhaustive()
    }
}

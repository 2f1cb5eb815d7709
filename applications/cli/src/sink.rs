//! Where decoded PCM goes

use std::io;
use std::path::Path;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Boxed byte sink for raw PCM
pub type PcmSink = Pin<Box<dyn AsyncWrite + Send>>;

/// Open the PCM sink: a file when `output` is given (created or truncated),
/// otherwise stdout
pub async fn open(output: Option<&Path>) -> io::Result<PcmSink> {
    match output {
        Some(path) => {
            tracing::debug!("Writing PCM to {}", path.display());
            let file = tokio::fs::File::create(path).await?;
            Ok(Box::pin(file))
        }
        None => Ok(Box::pin(tokio::io::stdout())),
    }
}

/// Copy an audio stream into a sink until the stream ends, then flush
///
/// Returns the number of bytes written. Errors from either side end the copy.
pub async fn pump<R, W>(audio: &mut R, sink: &mut W) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let written = tokio::io::copy(audio, sink).await?;
    sink.flush().await?;
    Ok(written)
}

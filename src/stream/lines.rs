//! Async adapter from a stream of framed lines to decode results.

use super::{decode_line, DecodeResult};
use futures::stream::{self, BoxStream, Stream, StreamExt};

/// Decode every line of `input`, skipping no-op lines.
///
/// The output ends after the first `[DONE]` result or when `input` ends. Framing
/// and transport belong to the caller.
pub fn decode_lines<S>(input: S) -> BoxStream<'static, DecodeResult>
where
    S: Stream<Item = String> + Send + 'static,
{
    stream::unfold((input.boxed(), false), |(mut input, finished)| async move {
        if finished {
            return None;
        }
        loop {
            let line = input.next().await?;
            let result = decode_line(&line);
            if result.is_noop() {
                continue;
            }
            let finished = result.is_done;
            return Some((result, (input, finished)));
        }
    })
    .boxed()
}

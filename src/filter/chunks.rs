//! Cancellable chunked iteration over tuple/element ranges.
//!
//! Execute bodies loop over large index ranges; these helpers split the
//! range into fixed chunks, poll the cancel token between chunks, and
//! guarantee that on cancellation only whole completed chunks were
//! processed, never a partial chunk.
//!
//! The parallel variants (feature `rayon-support`) hand each worker a
//! disjoint output chunk, so no two workers ever write the same element.

use std::ops::Range;

use crate::filter::cancel::CancelToken;
use crate::mill_error::DataMillError;

/// Iterations between cancellation polls when the caller has no opinion.
pub const DEFAULT_CHUNK: usize = 4096;

/// Run `body` over `0..total` in chunks, polling `cancel` before each chunk.
///
/// # Errors
/// `Cancelled` as soon as the token is observed set; the chunk that was
/// about to start is not entered.
pub fn for_each_chunk(
    total: usize,
    chunk: usize,
    cancel: &CancelToken,
    mut body: impl FnMut(Range<usize>),
) -> Result<(), DataMillError> {
    let chunk = chunk.max(1);
    let mut start = 0;
    while start < total {
        if cancel.is_cancelled() {
            return Err(DataMillError::Cancelled);
        }
        let end = (start + chunk).min(total);
        body(start..end);
        start = end;
    }
    Ok(())
}

/// Chunked, cancellable write loop over a mutable slice.
///
/// `body` receives the chunk's starting element index and the chunk itself.
pub fn for_each_chunk_mut<T>(
    data: &mut [T],
    chunk: usize,
    cancel: &CancelToken,
    mut body: impl FnMut(usize, &mut [T]),
) -> Result<(), DataMillError> {
    let chunk = chunk.max(1);
    for (index, piece) in data.chunks_mut(chunk).enumerate() {
        if cancel.is_cancelled() {
            return Err(DataMillError::Cancelled);
        }
        body(index * chunk, piece);
    }
    Ok(())
}

/// Parallel chunked write loop; each worker owns a disjoint chunk and polls
/// the shared token once per chunk.
///
/// Chunks observed after cancellation are skipped whole, so the output is
/// always a union of fully-processed chunks.
#[cfg(feature = "rayon-support")]
pub fn par_for_each_chunk_mut<T: Send>(
    data: &mut [T],
    chunk: usize,
    cancel: &CancelToken,
    body: impl Fn(usize, &mut [T]) + Send + Sync,
) -> Result<(), DataMillError> {
    use rayon::prelude::*;
    let chunk = chunk.max(1);
    data.par_chunks_mut(chunk).enumerate().for_each(|(index, piece)| {
        if cancel.is_cancelled() {
            return;
        }
        body(index * chunk, piece);
    });
    if cancel.is_cancelled() {
        return Err(DataMillError::Cancelled);
    }
    Ok(())
}

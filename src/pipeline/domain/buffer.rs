use crate::error::PipelineError;

/// Reserves room for `len` elements, turning allocator failure into
/// `ResourceExhausted` instead of aborting the process.
pub fn try_with_capacity<T>(len: usize, stage: &'static str) -> Result<Vec<T>, PipelineError> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|e| {
        PipelineError::exhausted(
            stage,
            format!("{} elements of {} bytes: {}", len, std::mem::size_of::<T>(), e),
        )
    })?;
    Ok(buffer)
}

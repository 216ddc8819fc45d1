//! PackBits RLE decompression
//!
//! PackBits is the run-length scheme used for PSD channel data.
//! Reference: Apple Technical Note TN1023

use super::error::PsdError;

/// Largest output a PackBits stream can produce per input byte
const MAX_EXPANSION: usize = 128;

/// Output capacity to reserve for `expected_len` bytes decoded from
/// `input_len` compressed bytes
pub(crate) fn decoded_capacity(expected_len: usize, input_len: usize) -> usize {
    expected_len.min(input_len.saturating_mul(MAX_EXPANSION))
}

/// Decode one PackBits compressed run of `expected_len` bytes
///
/// Control byte rules:
/// - N >= 0: Next N+1 bytes are literal (copy as-is)
/// - -127 <= N < 0: Repeat next byte (1-N) times
/// - N = -128: No operation (used for padding)
pub fn packbits_decode(input: &[u8], expected_len: usize) -> Result<Vec<u8>, PsdError> {
    let mut output = Vec::with_capacity(decoded_capacity(expected_len, input.len()));
    let mut i = 0;

    while output.len() < expected_len && i < input.len() {
        let n = input[i] as i8;
        i += 1;

        if n >= 0 {
            // Literal: copy next (n + 1) bytes
            let count = n as usize + 1;
            let literal = input.get(i..i + count).ok_or_else(|| {
                PsdError::Format(format!(
                    "RLE literal run of {} bytes overruns input at byte {}",
                    count, i
                ))
            })?;
            output.extend_from_slice(literal);
            i += count;
        } else if n > -128 {
            // Run: repeat next byte (1 - n) times
            let count = (1 - n as i16) as usize;
            let byte = *input.get(i).ok_or_else(|| {
                PsdError::Format(format!("RLE repeat run is missing its value at byte {}", i))
            })?;
            i += 1;
            output.resize(output.len() + count, byte);
        }
        // n == -128 is a no-op
    }

    if output.len() != expected_len {
        return Err(PsdError::Format(format!(
            "RLE output size mismatch: expected {}, got {}",
            expected_len,
            output.len()
        )));
    }

    Ok(output)
}

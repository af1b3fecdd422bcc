//! Applies a parsed delta instruction stream to a fully materialized base,
//! producing the reconstructed target object bytes.

use crate::delta::{parse_delta_instructions, DeltaInstruction};
use crate::PackError;

/// Apply `delta` (the inflated delta script, including its two leading
/// size varints) to `base` (the fully materialized base object bytes).
///
/// Returns the reconstructed target bytes, whose length always equals the
/// delta's declared result size.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>, PackError> {
    let (source_size, target_size, instructions) = parse_delta_instructions(delta)?;

    if source_size != base.len() {
        return Err(PackError::InvalidDelta {
            offset: 0,
            reason: format!(
                "delta source size {source_size} does not match base length {}",
                base.len()
            ),
        });
    }

    let mut out = Vec::with_capacity(target_size);

    for instr in instructions {
        match instr {
            DeltaInstruction::Copy { offset, size } => {
                let start = offset as usize;
                let end = start
                    .checked_add(size)
                    .ok_or_else(|| PackError::InvalidDelta {
                        offset,
                        reason: "copy range overflows".into(),
                    })?;
                if end > base.len() {
                    return Err(PackError::InvalidDelta {
                        offset,
                        reason: format!(
                            "copy [{start}, {end}) exceeds base length {}",
                            base.len()
                        ),
                    });
                }
                out.extend_from_slice(&base[start..end]);
            }
            DeltaInstruction::Insert(bytes) => {
                out.extend_from_slice(&bytes);
            }
        }
    }

    if out.len() != target_size {
        return Err(PackError::InvalidDelta {
            offset: delta.len() as u64,
            reason: format!(
                "reconstructed {} bytes but delta declared {target_size}",
                out.len()
            ),
        });
    }

    Ok(out)
}

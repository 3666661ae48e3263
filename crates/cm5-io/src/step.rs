//! Step-file codec: lossless persistence of a run for exact resumption.
//!
//! ```text
//! ["CM5S"] [version u8]
//! [dt f64] [contact_iterations u32] [stiffness f32] [planar u8]
//! [target_length f32] [target_spread f32] [seed u64] [growth_rate f32]
//! [palette_len u32] ([r f32] [g f32] [b f32]) * palette_len
//! [step u64] [capacity u32] [cell_count u32] [next_cell_id u32] [divisions u32]
//! ([word u32] * 16) * cell_count
//! [fnv1a64 of every preceding byte, u64]
//! ```
//!
//! All values are little-endian and floats are stored by bit pattern,
//! so decoding reproduces the encoded state exactly.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use cm5_core::cell::CELL_WORDS;
use cm5_core::{Cell, Parameters, SimulationState, StepId, StepMeta};

use crate::atomic::write_atomic;
use crate::codec::*;
use crate::error::CodecError;
use crate::hash::{HashingReader, HashingWriter};

/// Magic bytes at the start of every step file.
pub const STEP_MAGIC: [u8; 4] = *b"CM5S";

/// Current step-file format version.
pub const STEP_FORMAT_VERSION: u8 = 1;

/// Largest capacity a step file may declare. Equal to the largest
/// capacity a simulator accepts.
pub const MAX_STEP_CAPACITY: u32 = 1 << 20;

/// Largest palette a step file may declare.
pub const MAX_PALETTE_LEN: u32 = 1 << 16;

/// A decoded step file.
#[derive(Clone, Debug, PartialEq)]
pub struct StepFile {
    /// Run parameters in force when the file was written.
    pub parameters: Parameters,
    /// Colony state, including the step counter.
    pub state: SimulationState,
}

// ── Encode ──────────────────────────────────────────────────────

/// Encode parameters and state, followed by the checksum trailer.
pub fn encode_step(
    w: &mut dyn Write,
    parameters: &Parameters,
    state: &SimulationState,
) -> Result<(), CodecError> {
    let mut hw = HashingWriter::new(w);
    hw.write_all(&STEP_MAGIC)?;
    write_u8(&mut hw, STEP_FORMAT_VERSION)?;
    encode_parameters(&mut hw, parameters)?;
    encode_state(&mut hw, state)?;
    let checksum = hw.hash();
    write_u64_le(hw.inner(), checksum)?;
    Ok(())
}

fn encode_parameters(w: &mut dyn Write, p: &Parameters) -> Result<(), CodecError> {
    write_f64_le(w, p.dt)?;
    write_u32_le(w, p.contact_iterations)?;
    write_f32_le(w, p.stiffness)?;
    write_u8(w, u8::from(p.planar))?;
    write_f32_le(w, p.target_length)?;
    write_f32_le(w, p.target_spread)?;
    write_u64_le(w, p.seed)?;
    write_f32_le(w, p.growth_rate)?;
    write_count(w, p.palette.len(), "palette length")?;
    for rgb in &p.palette {
        for &c in rgb {
            write_f32_le(w, c)?;
        }
    }
    Ok(())
}

fn encode_state(w: &mut dyn Write, state: &SimulationState) -> Result<(), CodecError> {
    let meta = state.meta();
    write_u64_le(w, state.step().0)?;
    write_count(w, state.capacity(), "capacity")?;
    write_u32_le(w, meta.cell_count)?;
    write_u32_le(w, meta.next_cell_id)?;
    write_u32_le(w, meta.divisions)?;
    for cell in state.live_cells() {
        for word in cell.to_words() {
            write_u32_le(w, word)?;
        }
    }
    Ok(())
}

// ── Decode ──────────────────────────────────────────────────────

/// Decode a step file, verifying header, checksum, and state invariants.
///
/// Reads exactly the encoded bytes and nothing past the trailer.
pub fn decode_step(r: &mut dyn Read) -> Result<StepFile, CodecError> {
    let mut hr = HashingReader::new(r);
    read_header(&mut hr, STEP_MAGIC, STEP_FORMAT_VERSION)?;
    let parameters = decode_parameters(&mut hr)?;
    let (capacity, cells, meta, step) = decode_state(&mut hr)?;
    let computed = hr.hash();
    let stored = read_u64_le(hr.inner())?;
    if stored != computed {
        return Err(CodecError::ChecksumMismatch { stored, computed });
    }
    let state = SimulationState::from_parts(capacity, &cells, meta, step)?;
    Ok(StepFile { parameters, state })
}

fn decode_parameters(r: &mut dyn Read) -> Result<Parameters, CodecError> {
    let dt = read_f64_le(r)?;
    let contact_iterations = read_u32_le(r)?;
    let stiffness = read_f32_le(r)?;
    let planar = match read_u8(r)? {
        0 => false,
        1 => true,
        other => return Err(CodecError::malformed(format!("planar flag {other}"))),
    };
    let target_length = read_f32_le(r)?;
    let target_spread = read_f32_le(r)?;
    let seed = read_u64_le(r)?;
    let growth_rate = read_f32_le(r)?;
    let palette_len = read_u32_le(r)?;
    if palette_len > MAX_PALETTE_LEN {
        return Err(CodecError::malformed(format!(
            "palette length {palette_len} exceeds {MAX_PALETTE_LEN}"
        )));
    }
    let mut palette = Vec::with_capacity(palette_len as usize);
    for _ in 0..palette_len {
        palette.push([read_f32_le(r)?, read_f32_le(r)?, read_f32_le(r)?]);
    }
    Ok(Parameters {
        dt,
        contact_iterations,
        stiffness,
        planar,
        target_length,
        target_spread,
        seed,
        growth_rate,
        palette,
    })
}

type StateParts = (usize, Vec<Cell>, StepMeta, StepId);

fn decode_state(r: &mut dyn Read) -> Result<StateParts, CodecError> {
    let step = StepId(read_u64_le(r)?);
    let capacity = read_u32_le(r)?;
    let cell_count = read_u32_le(r)?;
    let next_cell_id = read_u32_le(r)?;
    let divisions = read_u32_le(r)?;
    if capacity > MAX_STEP_CAPACITY {
        return Err(CodecError::malformed(format!(
            "capacity {capacity} exceeds {MAX_STEP_CAPACITY}"
        )));
    }
    if cell_count > capacity {
        return Err(CodecError::malformed(format!(
            "cell count {cell_count} exceeds capacity {capacity}"
        )));
    }
    // `cell_count` is unverified until the trailer; grow as cells arrive.
    let mut cells = Vec::new();
    let mut words = [0u32; CELL_WORDS];
    for _ in 0..cell_count {
        for word in &mut words {
            *word = read_u32_le(r)?;
        }
        cells.push(Cell::from_words(&words));
    }
    let meta = StepMeta {
        cell_count,
        next_cell_id,
        divisions,
        _pad: 0,
    };
    Ok((capacity as usize, cells, meta, step))
}

// ── Files ───────────────────────────────────────────────────────

/// Atomically write a step file to `path`.
pub fn write_step_file(
    path: &Path,
    parameters: &Parameters,
    state: &SimulationState,
) -> Result<(), CodecError> {
    write_atomic(path, |w| encode_step(w, parameters, state))?;
    log::debug!(
        "wrote step file {} (step {}, {} cells)",
        path.display(),
        state.step(),
        state.cell_count()
    );
    Ok(())
}

/// Read a step file, rejecting trailing bytes after the checksum.
pub fn read_step_file(path: &Path) -> Result<StepFile, CodecError> {
    let mut r = BufReader::new(File::open(path)?);
    let file = decode_step(&mut r)?;
    let mut extra = [0u8; 1];
    if r.read(&mut extra)? != 0 {
        return Err(CodecError::malformed("trailing bytes after checksum"));
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm5_core::CellSeed;

    fn sample() -> (Parameters, SimulationState) {
        let params = Parameters {
            seed: 99,
            ..Parameters::default()
        };
        let mut state = SimulationState::with_capacity(6).unwrap();
        state.spawn(&CellSeed::default(), &params, 0.25).unwrap();
        state
            .spawn(
                &CellSeed {
                    position: [2.0, 1.0, 0.0],
                    direction: [0.0, 1.0, 0.0],
                    cell_type: 2,
                    ..CellSeed::default()
                },
                &params,
                0.75,
            )
            .unwrap();
        state.cells_mut()[1].velocity = [-0.0, 1e-30, 3.0];
        state.advance();
        state.advance();
        (params, state)
    }

    fn encode(params: &Parameters, state: &SimulationState) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_step(&mut buf, params, state).unwrap();
        buf
    }

    #[test]
    fn round_trip_is_bit_exact() {
        let (params, state) = sample();
        let buf = encode(&params, &state);
        let decoded = decode_step(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded.parameters, params);
        assert!(decoded.state.same_bits(&state));
        assert_eq!(decoded.state.step(), StepId(2));
    }

    #[test]
    fn encoded_length_matches_layout() {
        let (params, state) = sample();
        let buf = encode(&params, &state);
        let header = 4 + 1;
        let param_block = 8 + 4 + 4 + 1 + 4 + 4 + 8 + 4 + 4 + params.palette.len() * 12;
        let state_block = 8 + 4 * 4 + state.cell_count() * 64;
        assert_eq!(buf.len(), header + param_block + state_block + 8);
    }

    #[test]
    fn any_flipped_byte_is_detected() {
        let (params, state) = sample();
        let buf = encode(&params, &state);
        for i in (5..buf.len()).step_by(7) {
            let mut bad = buf.clone();
            bad[i] ^= 0x10;
            assert!(decode_step(&mut bad.as_slice()).is_err(), "byte {i}");
        }
    }

    #[test]
    fn checksum_mismatch_is_reported() {
        let (params, state) = sample();
        let mut buf = encode(&params, &state);
        // Flip a bit in a cell's velocity: structurally valid, checksum wrong.
        let at = buf.len() - 8 - 64 + 32;
        buf[at] ^= 1;
        assert!(matches!(
            decode_step(&mut buf.as_slice()),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn truncation_is_rejected() {
        let (params, state) = sample();
        let buf = encode(&params, &state);
        let short = &buf[..buf.len() - 3];
        assert!(matches!(
            decode_step(&mut &short[..]),
            Err(CodecError::Io(_))
        ));
    }

    #[test]
    fn declared_cells_must_be_present() {
        let (params, state) = sample();
        let buf = encode(&params, &state);
        let state_at = 5 + 8 + 4 + 4 + 1 + 4 + 4 + 8 + 4 + 4 + params.palette.len() * 12;
        // Claim a full colony at the limit, then end right after the counts.
        let mut bad = buf[..state_at + 8 + 16].to_vec();
        bad[state_at + 8..state_at + 12].copy_from_slice(&MAX_STEP_CAPACITY.to_le_bytes());
        bad[state_at + 12..state_at + 16].copy_from_slice(&MAX_STEP_CAPACITY.to_le_bytes());
        assert!(matches!(
            decode_step(&mut bad.as_slice()),
            Err(CodecError::Io(_))
        ));

        bad[state_at + 8..state_at + 12].copy_from_slice(&(MAX_STEP_CAPACITY + 1).to_le_bytes());
        assert!(matches!(
            decode_step(&mut bad.as_slice()),
            Err(CodecError::Malformed { .. })
        ));
    }

    #[test]
    fn bad_magic_and_version() {
        let (params, state) = sample();
        let mut buf = encode(&params, &state);
        buf[4] = 200;
        assert!(matches!(
            decode_step(&mut buf.as_slice()),
            Err(CodecError::UnsupportedVersion { found: 200 })
        ));
        buf[0] = b'X';
        assert!(matches!(
            decode_step(&mut buf.as_slice()),
            Err(CodecError::InvalidMagic { .. })
        ));
    }
}

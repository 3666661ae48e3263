//! File codecs for the cm5 colony simulator.
//!
//! Two formats, both little-endian binary written through an atomic
//! temp-file-and-rename:
//!
//! - **Step files** ([`step`]) persist run parameters and the complete
//!   colony state, checksummed with FNV-1a. Reading one back yields a
//!   state bit-for-bit equal to the one written.
//! - **Viz files** ([`viz`]) hold a presentation view (cap centres,
//!   radius, colour, id) for external viewers. They are not resumable.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod atomic;
pub mod codec;
pub mod error;
pub mod hash;
pub mod step;
pub mod viz;

pub use atomic::write_atomic;
pub use error::{CodecError, CodecErrorClass};
pub use step::{decode_step, encode_step, read_step_file, write_step_file, StepFile};
pub use viz::{decode_viz, encode_viz, read_viz_file, write_viz_file, VizCell, VizFrame};

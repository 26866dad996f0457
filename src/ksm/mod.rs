//! Ken Silverman's `.KSM` note streams with their `insts.dat` instruments.

mod sequencer;
mod song;

pub use sequencer::Sequencer;
pub use song::{Instrument, Note, NoteKind, Song, Track};

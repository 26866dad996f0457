//! AdLib Visual Composer songs: `.ROL` scores with `.BNK` instrument banks.

mod bank;
mod sequencer;
mod song;

pub use bank::{Bank, Instrument};
pub use sequencer::Sequencer;
pub use song::{
    InstrumentEvent, Mode, NoteEvent, PitchEvent, Song, TempoEvent, VoiceTrack, VolumeEvent,
};

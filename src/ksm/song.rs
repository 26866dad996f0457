use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::*;
use crate::encoder::Operator;
use crate::error::Error;
use crate::reader::ByteReader;

/// A decoded KSM song with its instrument table.
#[derive(Debug, Clone)]
pub struct Song {
    pub(crate) tracks: [Track; KSM_TRACKS],
    pub(crate) notes: Vec<Note>,
    pub(crate) instruments: Vec<Instrument>,
    pub(crate) rhythm: bool,
}

/// Per-track settings from the song header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Track {
    /// Index into the instrument table
    pub instrument: u8,
    /// Time grid, in divisions of 240 ticks
    pub quantize: u8,
    /// How many chip channels the track may use
    pub channels: u8,
    /// 0 (silent) to 63 (loudest)
    pub volume: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Off,
    Normal,
    Quieter,
    Louder,
}

/// One event of the note stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub time: u32,
    pub track: u8,
    pub kind: NoteKind,
    /// Index into the frequency table, 0..63
    pub pitch: u8,
}

/// An entry of `insts.dat`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Instrument {
    pub name: String,
    pub carrier: Operator,
    /// Carries the channel's feedback/connection byte.
    pub modulator: Operator,
}

impl Note {
    /// Unpack a note word: pitch in bits 0-5, kind in 6-7, track in 8-11
    /// and time in 12-31.
    fn decode(word: u32) -> Self {
        let kind = match word & 0xc0 {
            0x00 => NoteKind::Off,
            0x40 => NoteKind::Normal,
            0x80 => NoteKind::Quieter,
            _ => NoteKind::Louder,
        };

        Note {
            time: word >> 12,
            track: ((word >> 8) & 0x0f) as u8,
            kind,
            pitch: (word & 0x3f) as u8,
        }
    }
}

impl Instrument {
    fn read(reader: &mut ByteReader) -> Result<Self, Error> {
        let name = reader.read_str(KSM_INSTRUMENT_NAME_LENGTH)?;

        let mut bytes = [0; KSM_INSTRUMENT_LENGTH];
        for byte in bytes.iter_mut() {
            *byte = reader.read_u8()?;
        }
        reader.skip(KSM_INSTRUMENT_FILLER)?;

        Ok(Instrument {
            name,
            carrier: Operator {
                ammulti: bytes[0],
                ksltl: bytes[1],
                ardr: bytes[2],
                slrr: bytes[3],
                waveform: bytes[4],
                fbc: 0,
            },
            modulator: Operator {
                ammulti: bytes[5],
                ksltl: bytes[6],
                ardr: bytes[7],
                slrr: bytes[8],
                waveform: bytes[9],
                fbc: bytes[10],
            },
        })
    }
}

impl Song {
    /// Decode a KSM song. `insts` holds the bytes of the companion
    /// `insts.dat`.
    pub fn from_slices(ksm: &[u8], insts: &[u8]) -> Result<Song, Error> {
        let mut reader = ByteReader::new(ksm);

        let mut tables = [[0; KSM_TRACKS]; 5];
        for table in tables.iter_mut() {
            for value in table.iter_mut() {
                *value = reader.read_u8()?;
            }
        }
        let [instrument, quantize, channels, _unused, volume] = tables;

        let mut tracks = [Track::default(); KSM_TRACKS];
        for (i, track) in tracks.iter_mut().enumerate() {
            *track = Track {
                instrument: instrument[i],
                quantize: quantize[i],
                channels: channels[i],
                volume: volume[i],
            };
            if track.quantize == 0 && track.channels > 0 {
                log::warn!("Track {} has no quantization, using 240", i);
            }
        }

        let count = usize::from(reader.read_u16()?);
        if count == 0 {
            return Err(Error::MalformedRecord("song has no notes"));
        }
        let mut notes = Vec::with_capacity(count.min(reader.remaining() / 4));
        for _ in 0..count {
            notes.push(Note::decode(reader.read_u32()?));
        }

        let rhythm = match tracks[KSM_DRUM_TRACK].channels {
            0 => false,
            1 => true,
            other => {
                log::warn!("Unknown drum track setting {}, playing melodic", other);
                false
            }
        };

        let mut reader = ByteReader::new(insts);
        let mut instruments = Vec::with_capacity(KSM_INSTRUMENTS);
        for _ in 0..KSM_INSTRUMENTS {
            instruments.push(Instrument::read(&mut reader)?);
        }

        log::debug!(
            "KSM song: {} notes, {}",
            notes.len(),
            if rhythm { "rhythm mode" } else { "melodic" }
        );

        Ok(Song {
            tracks,
            notes,
            instruments,
            rhythm,
        })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Whether tracks 11 to 15 drive the rhythm section.
    pub fn rhythm(&self) -> bool {
        self.rhythm
    }

    /// Number of melodic chip channels available to tracks.
    pub fn channels(&self) -> usize {
        if self.rhythm {
            BASS_DRUM_CHANNEL
        } else {
            NUM_MELODIC_VOICES
        }
    }

    pub(crate) fn instrument(&self, track: usize) -> &Instrument {
        &self.instruments[usize::from(self.tracks[track].instrument)]
    }

    /// Time grid of `track`, in ticks.
    pub(crate) fn quantum(&self, track: usize) -> u32 {
        let divisions = u32::from(self.tracks[track].quantize).max(1);

        (KSM_QUANTUM / divisions).max(1)
    }
}

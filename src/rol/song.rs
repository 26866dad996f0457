use alloc::string::String;
use alloc::vec::Vec;
use arrayvec::ArrayVec;

use crate::consts::*;
use crate::error::Error;
use crate::reader::ByteReader;
use crate::rol::bank::{Bank, Instrument, Resolver};

/// A decoded ROL song. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Song {
    pub(crate) ticks_per_beat: u16,
    pub(crate) beats_per_measure: u16,
    pub(crate) basic_tempo: f32,
    pub(crate) mode: Mode,
    pub(crate) tempo_events: Vec<TempoEvent>,
    pub(crate) voices: ArrayVec<[VoiceTrack; NUM_PERCUSSIVE_VOICES]>,
    pub(crate) instruments: Vec<Instrument>,
    pub(crate) time_of_last_note: i32,
}

/// Whether channels 6 to 8 play drums or melody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 6 melodic voices and 5 drums on the rhythm section.
    Percussive,
    /// 9 melodic voices.
    Melodic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoEvent {
    pub tick: i32,
    pub multiplier: f32,
}

/// A note and how many ticks it lasts. `note` is already biased, so
/// `SILENCE_NOTE` marks a rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub note: i32,
    pub duration: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentEvent {
    pub tick: i32,
    pub name: String,
    /// Index into the song's instrument list.
    pub instrument: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeEvent {
    pub tick: i32,
    pub multiplier: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEvent {
    pub tick: i32,
    /// 1.0 means no bend.
    pub variation: f32,
}

/// The four event streams of one voice, each sorted by tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VoiceTrack {
    pub notes: Vec<NoteEvent>,
    pub instruments: Vec<InstrumentEvent>,
    pub volumes: Vec<VolumeEvent>,
    pub pitches: Vec<PitchEvent>,
}

impl Mode {
    fn from_byte(mode: u8) -> Self {
        if mode == 0 {
            Mode::Percussive
        } else {
            Mode::Melodic
        }
    }

    /// Number of voices a song in this mode carries.
    pub fn voices(self) -> usize {
        match self {
            Mode::Percussive => NUM_PERCUSSIVE_VOICES,
            Mode::Melodic => NUM_MELODIC_VOICES,
        }
    }
}

impl Song {
    /// Decode a ROL song, resolving its instruments through `bank`.
    ///
    /// `bank` holds the bytes of the companion `.BNK` file.
    pub fn from_slices(rol: &[u8], bank: &[u8]) -> Result<Song, Error> {
        let mut reader = ByteReader::new(rol);

        let major = reader.read_u16()?;
        let minor = reader.read_u16()?;
        if major != ROL_VERSION_MAJOR || minor != ROL_VERSION_MINOR {
            return Err(Error::UnsupportedVersion { major, minor });
        }

        reader.skip(ROL_HEADER_UNUSED0)?;
        let ticks_per_beat = reader.read_u16()?;
        let beats_per_measure = reader.read_u16()?;
        let _edit_scale_y = reader.read_u16()?;
        let _edit_scale_x = reader.read_u16()?;
        reader.skip(ROL_HEADER_UNUSED1)?;
        let mode = Mode::from_byte(reader.read_u8()?);
        reader.skip(ROL_HEADER_UNUSED2)?;
        let basic_tempo = reader.read_f32()?;

        let tempo_events = load_tempo_events(&mut reader)?;

        let mut resolver = Resolver::new(Bank::from_slice(bank)?);
        let mut voices = ArrayVec::new();
        let mut time_of_last_note = 0;
        for _ in 0..mode.voices() {
            let (notes, declared) = load_note_events(&mut reader)?;
            time_of_last_note = time_of_last_note.max(declared);

            let instruments = load_instrument_events(&mut reader, &mut resolver)?;
            let volumes = load_volume_events(&mut reader)?;
            let pitches = load_pitch_events(&mut reader)?;

            voices.push(VoiceTrack {
                notes,
                instruments,
                volumes,
                pitches,
            });
        }

        let instruments = resolver.into_instruments();
        log::debug!(
            "ROL {:?} song: {} ticks, {} tempo events, {} instruments",
            mode,
            time_of_last_note,
            tempo_events.len(),
            instruments.len()
        );

        Ok(Song {
            ticks_per_beat,
            beats_per_measure,
            basic_tempo,
            mode,
            tempo_events,
            voices,
            instruments,
            time_of_last_note,
        })
    }

    pub fn ticks_per_beat(&self) -> u16 {
        self.ticks_per_beat
    }

    pub fn beats_per_measure(&self) -> u16 {
        self.beats_per_measure
    }

    pub fn basic_tempo(&self) -> f32 {
        self.basic_tempo
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tempo_events(&self) -> &[TempoEvent] {
        &self.tempo_events
    }

    pub fn voices(&self) -> &[VoiceTrack] {
        &self.voices
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// The longest declared note span of any voice, in ticks.
    pub fn time_of_last_note(&self) -> i32 {
        self.time_of_last_note
    }
}

fn load_tempo_events(reader: &mut ByteReader) -> Result<Vec<TempoEvent>, Error> {
    let count = reader.read_count()?;
    let mut events = Vec::with_capacity(count);
    for _ in 0..count {
        let tick = i32::from(reader.read_i16()?);
        let multiplier = reader.read_f32()?;
        events.push(TempoEvent { tick, multiplier });
    }

    Ok(events)
}

/// Read a voice's notes. The block has no count; notes are read until their
/// durations add up to the declared total.
///
/// Returns the notes and the declared total.
fn load_note_events(reader: &mut ByteReader) -> Result<(Vec<NoteEvent>, i32), Error> {
    reader.skip(ROL_TRACK_FILLER)?;

    let declared = i32::from(reader.read_i16()?);
    let mut notes = Vec::new();

    if declared != 0 {
        let mut total = 0;
        loop {
            if notes.len() == MAX_NOTE_EVENTS {
                return Err(Error::Truncated {
                    offset: reader.position(),
                });
            }

            let note = i32::from(reader.read_i16()?) + SILENCE_NOTE;
            let duration = i32::from(reader.read_i16()?);
            notes.push(NoteEvent { note, duration });

            total += duration;
            if total >= declared {
                break;
            }
        }
    }

    reader.skip(ROL_TRACK_FILLER)?;

    Ok((notes, declared))
}

fn load_instrument_events(
    reader: &mut ByteReader,
    resolver: &mut Resolver,
) -> Result<Vec<InstrumentEvent>, Error> {
    let count = reader.read_count()?;
    let mut events = Vec::with_capacity(count);
    for _ in 0..count {
        let tick = i32::from(reader.read_i16()?);
        let name = reader.read_str(ROL_NAME_LENGTH)?;
        reader.skip(ROL_INSTRUMENT_EVENT_FILLER)?;

        let instrument = resolver.resolve(&name)?;
        events.push(InstrumentEvent {
            tick,
            name,
            instrument,
        });
    }
    reader.skip(ROL_TRACK_FILLER)?;

    Ok(events)
}

fn load_volume_events(reader: &mut ByteReader) -> Result<Vec<VolumeEvent>, Error> {
    let count = reader.read_count()?;
    let mut events = Vec::with_capacity(count);
    for _ in 0..count {
        let tick = i32::from(reader.read_i16()?);
        let multiplier = reader.read_f32()?;
        events.push(VolumeEvent { tick, multiplier });
    }
    reader.skip(ROL_TRACK_FILLER)?;

    Ok(events)
}

fn load_pitch_events(reader: &mut ByteReader) -> Result<Vec<PitchEvent>, Error> {
    let count = reader.read_count()?;
    let mut events = Vec::with_capacity(count);
    for _ in 0..count {
        let tick = i32::from(reader.read_i16()?);
        let variation = reader.read_f32()?;
        events.push(PitchEvent { tick, variation });
    }

    Ok(events)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::rol::bank::tests::{bank_bytes, PIANO_CAR, PIANO_MOD};

    /// A voice as written to a ROL file. Notes hold raw (unbiased) numbers.
    #[derive(Default, Clone)]
    pub(crate) struct RawVoice {
        pub(crate) declared: i16,
        pub(crate) notes: Vec<(i16, i16)>,
        pub(crate) instruments: Vec<(i16, &'static str)>,
        pub(crate) volumes: Vec<(i16, f32)>,
        pub(crate) pitches: Vec<(i16, f32)>,
    }

    impl RawVoice {
        /// A voice whose declared length is the sum of its note durations.
        pub(crate) fn with_notes(notes: &[(i16, i16)]) -> Self {
            Self {
                declared: notes.iter().map(|&(_, d)| d).sum(),
                notes: notes.to_vec(),
                ..Self::default()
            }
        }
    }

    fn push_i16(out: &mut Vec<u8>, value: i16) {
        out.extend_from_slice(&value.to_le_bytes());
    }

    fn push_f32(out: &mut Vec<u8>, value: f32) {
        out.extend_from_slice(&value.to_le_bytes());
    }

    /// Build a ROL file. `mode` 0 is percussive.
    pub(crate) fn rol_bytes(mode: u8, tempo: &[(i16, f32)], voices: &[RawVoice]) -> Vec<u8> {
        let mut out = Vec::new();
        push_i16(&mut out, 0);
        push_i16(&mut out, 4);
        out.resize(out.len() + ROL_HEADER_UNUSED0, 0);
        push_i16(&mut out, 4); // ticks per beat
        push_i16(&mut out, 4); // beats per measure
        push_i16(&mut out, 0);
        push_i16(&mut out, 0);
        out.push(0);
        out.push(mode);
        out.resize(out.len() + ROL_HEADER_UNUSED2, 0);
        push_f32(&mut out, 120.0);

        push_i16(&mut out, tempo.len() as i16);
        for &(tick, multiplier) in tempo {
            push_i16(&mut out, tick);
            push_f32(&mut out, multiplier);
        }

        let count = Mode::from_byte(mode).voices();
        for i in 0..count {
            let voice = voices.get(i).cloned().unwrap_or_default();

            out.resize(out.len() + ROL_TRACK_FILLER, 0);
            push_i16(&mut out, voice.declared);
            for &(note, duration) in &voice.notes {
                push_i16(&mut out, note);
                push_i16(&mut out, duration);
            }
            out.resize(out.len() + ROL_TRACK_FILLER, 0);

            push_i16(&mut out, voice.instruments.len() as i16);
            for &(tick, name) in &voice.instruments {
                push_i16(&mut out, tick);
                let mut field = [0; ROL_NAME_LENGTH];
                field[..name.len()].copy_from_slice(name.as_bytes());
                out.extend_from_slice(&field);
                out.resize(out.len() + ROL_INSTRUMENT_EVENT_FILLER, 0);
            }
            out.resize(out.len() + ROL_TRACK_FILLER, 0);

            push_i16(&mut out, voice.volumes.len() as i16);
            for &(tick, multiplier) in &voice.volumes {
                push_i16(&mut out, tick);
                push_f32(&mut out, multiplier);
            }
            out.resize(out.len() + ROL_TRACK_FILLER, 0);

            push_i16(&mut out, voice.pitches.len() as i16);
            for &(tick, variation) in &voice.pitches {
                push_i16(&mut out, tick);
                push_f32(&mut out, variation);
            }
        }

        out
    }

    pub(crate) fn standard_bank() -> Vec<u8> {
        bank_bytes(&[("PIANO1", PIANO_MOD, PIANO_CAR)])
    }

    #[test]
    fn header_fields() {
        let data = rol_bytes(1, &[(0, 1.0), (8, 2.0)], &[]);
        let song = Song::from_slices(&data, &standard_bank()).unwrap();

        assert_eq!(song.ticks_per_beat(), 4);
        assert_eq!(song.beats_per_measure(), 4);
        assert_eq!(song.basic_tempo(), 120.0);
        assert_eq!(song.mode(), Mode::Melodic);
        assert_eq!(song.voices().len(), 9);
        assert_eq!(
            song.tempo_events(),
            &[
                TempoEvent {
                    tick: 0,
                    multiplier: 1.0
                },
                TempoEvent {
                    tick: 8,
                    multiplier: 2.0
                }
            ]
        );
        assert_eq!(song.time_of_last_note(), 0);
    }

    #[test]
    fn percussive_has_eleven_voices() {
        let data = rol_bytes(0, &[], &[]);
        let song = Song::from_slices(&data, &standard_bank()).unwrap();

        assert_eq!(song.mode(), Mode::Percussive);
        assert_eq!(song.voices().len(), 11);
    }

    #[test]
    fn unsupported_version() {
        let mut data = rol_bytes(1, &[], &[]);
        data[2] = 5;

        match Song::from_slices(&data, &standard_bank()) {
            Err(Error::UnsupportedVersion { major, minor }) => assert_eq!((major, minor), (0, 5)),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn notes_are_biased() {
        let voice = RawVoice::with_notes(&[(60, 2), (0, 3)]);
        let data = rol_bytes(1, &[], &[voice]);
        let song = Song::from_slices(&data, &standard_bank()).unwrap();

        assert_eq!(
            song.voices()[0].notes,
            vec![
                NoteEvent {
                    note: 48,
                    duration: 2
                },
                NoteEvent {
                    note: SILENCE_NOTE,
                    duration: 3
                }
            ]
        );
        assert_eq!(song.time_of_last_note(), 5);
    }

    #[test]
    fn declared_duration_bounds_note_block() {
        // Declared total 6 is reached by the third note exactly; the fourth
        // pair belongs to the next block and must not be read as a note.
        let mut voice = RawVoice::with_notes(&[(50, 1), (52, 2), (54, 3)]);
        voice.instruments = vec![(0, "PIANO1")];
        let data = rol_bytes(1, &[], &[voice, RawVoice::with_notes(&[(40, 9)])]);
        let song = Song::from_slices(&data, &standard_bank()).unwrap();

        assert_eq!(song.voices()[0].notes.len(), 3);
        assert_eq!(song.voices()[0].instruments[0].name, "PIANO1");
        assert_eq!(song.voices()[1].notes.len(), 1);
        assert_eq!(song.time_of_last_note(), 9);
    }

    #[test]
    fn overshooting_duration_stops() {
        let mut voice = RawVoice::with_notes(&[(50, 4), (52, 4)]);
        voice.declared = 5;
        let data = rol_bytes(1, &[], &[voice]);
        let song = Song::from_slices(&data, &standard_bank()).unwrap();

        assert_eq!(song.voices()[0].notes.len(), 2);
        assert_eq!(song.time_of_last_note(), 5);
    }

    #[test]
    fn never_reaching_declared_duration_is_truncated() {
        // Negative durations never add up to the declared total
        let mut voice = RawVoice::with_notes(&[(50, -1), (52, -1)]);
        voice.declared = 10;
        let data = rol_bytes(1, &[], &[voice]);

        assert!(matches!(
            Song::from_slices(&data, &standard_bank()),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn truncated_file() {
        let voice = RawVoice::with_notes(&[(50, 1)]);
        let mut data = rol_bytes(1, &[], &[voice]);
        data.truncate(data.len() - 3);

        assert!(matches!(
            Song::from_slices(&data, &standard_bank()),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn instruments_share_indices_across_voices() {
        let mut first = RawVoice::with_notes(&[(50, 1)]);
        first.instruments = vec![(0, "PIANO1"), (1, "ghost")];
        let mut second = RawVoice::with_notes(&[(50, 1)]);
        second.instruments = vec![(0, "piano1"), (2, "GHOST")];
        let data = rol_bytes(1, &[], &[first, second]);
        let song = Song::from_slices(&data, &standard_bank()).unwrap();

        let indices = |v: usize| {
            song.voices()[v]
                .instruments
                .iter()
                .map(|e| e.instrument)
                .collect::<Vec<_>>()
        };
        assert_eq!(indices(0), vec![0, 1]);
        assert_eq!(indices(1), vec![0, 1]);
        assert_eq!(song.instruments().len(), 2);
        assert_eq!(song.instruments()[1].carrier.ksltl, 0);
    }

    #[test]
    fn volume_and_pitch_events() {
        let mut voice = RawVoice::with_notes(&[(50, 4)]);
        voice.volumes = vec![(0, 0.5), (2, 1.0)];
        voice.pitches = vec![(1, 1.25)];
        let data = rol_bytes(1, &[], &[voice]);
        let song = Song::from_slices(&data, &standard_bank()).unwrap();
        let voice = &song.voices()[0];

        assert_eq!(
            voice.volumes,
            vec![
                VolumeEvent {
                    tick: 0,
                    multiplier: 0.5
                },
                VolumeEvent {
                    tick: 2,
                    multiplier: 1.0
                }
            ]
        );
        assert_eq!(
            voice.pitches,
            vec![PitchEvent {
                tick: 1,
                variation: 1.25
            }]
        );
    }

    #[test]
    fn broken_bank_fails_load() {
        let data = rol_bytes(1, &[], &[]);

        assert!(Song::from_slices(&data, &[1, 0, b'A']).is_err());
    }
}

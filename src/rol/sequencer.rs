use arrayvec::ArrayVec;

use crate::consts::*;
use crate::encoder::{
    carrier_slot, drum_slot, frequency, pitch_bend, rhythm_bit, scaled_total_level, PitchBend,
};
#[cfg(feature = "std")]
use crate::error::Error;
use crate::opl::Opl;
use crate::player::Player;
use crate::rol::bank::Instrument;
use crate::rol::song::{Mode, Song, VoiceTrack};

/// Plays a ROL `Song` by writing OPL2 registers, one tick per `update`.
///
/// ```rust
/// # use oplseq::{Player, RegisterLog, rol};
/// # fn play(song: rol::Song) {
/// let mut sequencer = rol::Sequencer::with_song(song, RegisterLog::new());
/// while sequencer.update() {
///     // Wait 1 / sequencer.refresh() seconds
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct Sequencer<O: Opl> {
    song: Option<Song>,
    chip: Chip<O>,
    playheads: ArrayVec<[VoicePlayhead; NUM_PERCUSSIVE_VOICES]>,

    refresh: f32,
    next_tempo_event: usize,
    tick: i32,
}

/// Which event streams of a voice have run dry. Sticky until rewind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Exhausted {
    instruments: bool,
    volumes: bool,
    pitches: bool,
    notes: bool,
}

/// Playback position within one voice.
#[derive(Debug, Clone)]
struct VoicePlayhead {
    next_instrument: usize,
    next_volume: usize,
    next_pitch: usize,
    current_note: usize,

    // Ticks since the current note started, and its length
    elapsed: i32,
    duration: i32,

    force_note: bool,
    exhausted: Exhausted,
}

/// Register caches for one voice. Writes only ever send what changed, and
/// both total level and frequency depend on earlier writes.
#[derive(Debug, Clone, Copy)]
struct VoiceRegisters {
    fnum_row: usize,
    half_tone: i32,
    volume: u8,
    ksltl: u8,
    note: i32,
    key_on: bool,
    block_high: u8,
}

/// The OPL2 register sink and everything remembered about its state.
#[derive(Debug)]
struct Chip<O: Opl> {
    opl: O,
    mode: Mode,
    voices: [VoiceRegisters; NUM_PERCUSSIVE_VOICES],
    rhythm: u8,
    pitch_bend: PitchBend,
}

impl Default for VoicePlayhead {
    fn default() -> Self {
        VoicePlayhead {
            next_instrument: 0,
            next_volume: 0,
            next_pitch: 0,
            current_note: 0,
            elapsed: 0,
            duration: 0,
            force_note: true,
            exhausted: Exhausted::default(),
        }
    }
}

impl Default for VoiceRegisters {
    fn default() -> Self {
        VoiceRegisters {
            fnum_row: 0,
            half_tone: 0,
            volume: MAX_VOLUME,
            ksltl: 0,
            note: 0,
            key_on: false,
            block_high: 0,
        }
    }
}

/// Map a ROL volume multiplier onto 0..=127.
fn volume_level(multiplier: f32) -> u8 {
    (f32::from(MAX_VOLUME) * multiplier.max(0.0).min(1.0)) as u8
}

impl VoicePlayhead {
    /// Advance this voice by one tick.
    fn update<O: Opl>(
        &mut self,
        voice: usize,
        track: &VoiceTrack,
        instruments: &[Instrument],
        tick: i32,
        chip: &mut Chip<O>,
    ) {
        if track.notes.is_empty() || self.exhausted.notes {
            return;
        }

        if !self.exhausted.instruments {
            match track.instruments.get(self.next_instrument) {
                Some(event) if event.tick == tick => {
                    chip.send_instrument(voice, &instruments[event.instrument]);
                    self.next_instrument += 1;
                }
                Some(_) => (),
                None => self.exhausted.instruments = true,
            }
        }

        if !self.exhausted.volumes {
            match track.volumes.get(self.next_volume) {
                Some(event) if event.tick == tick => {
                    chip.set_volume(voice, volume_level(event.multiplier));
                    self.next_volume += 1;
                }
                Some(_) => (),
                None => self.exhausted.volumes = true,
            }
        }

        if self.force_note || self.elapsed >= self.duration {
            // The first note starts without advancing
            if !self.force_note {
                self.current_note += 1;
            }

            match track.notes.get(self.current_note) {
                Some(note) => {
                    chip.set_note(voice, note.note);
                    self.elapsed = 0;
                    self.duration = note.duration;
                    self.force_note = false;
                }
                None => {
                    chip.set_note(voice, SILENCE_NOTE);
                    self.exhausted.notes = true;
                    return;
                }
            }
        }

        if !self.exhausted.pitches {
            match track.pitches.get(self.next_pitch) {
                Some(event) if event.tick == tick => {
                    chip.set_pitch(voice, event.variation);
                    self.next_pitch += 1;
                }
                Some(_) => (),
                None => self.exhausted.pitches = true,
            }
        }

        self.elapsed += 1;
    }
}

impl<O: Opl> Chip<O> {
    fn new(opl: O) -> Self {
        Chip {
            opl,
            mode: Mode::Melodic,
            voices: [VoiceRegisters::default(); NUM_PERCUSSIVE_VOICES],
            rhythm: 0,
            pitch_bend: PitchBend::default(),
        }
    }

    /// Forget all cached state and put the chip in `mode`.
    fn reset(&mut self, mode: Mode) {
        self.mode = mode;
        self.voices = [VoiceRegisters::default(); NUM_PERCUSSIVE_VOICES];
        self.rhythm = 0;
        self.pitch_bend = PitchBend::default();

        self.opl.write(REG_WAVE_CTRL, WAVE_SELECT_ENABLE);

        if mode == Mode::Percussive {
            self.rhythm = RHYTHM_ENABLE;
            self.opl.write(REG_RHYTHM, self.rhythm);

            self.set_freq(TOM_TOM_CHANNEL, TOM_TOM_NOTE, false);
            self.set_freq(SNARE_DRUM_CHANNEL, SNARE_NOTE, false);
        }
    }

    /// Voices 6 to 10 are drums in percussive mode.
    fn is_drum(&self, voice: usize) -> bool {
        self.mode == Mode::Percussive && voice >= BASS_DRUM_CHANNEL
    }

    /// Voices 7 to 10 only drive a single operator in percussive mode.
    fn is_single_operator(&self, voice: usize) -> bool {
        self.mode == Mode::Percussive && voice >= SNARE_DRUM_CHANNEL
    }

    fn set_note(&mut self, voice: usize, note: i32) {
        if self.is_drum(voice) {
            self.set_note_percussive(voice, note);
        } else {
            self.set_note_melodic(voice, note);
        }
    }

    fn set_note_melodic(&mut self, voice: usize, note: i32) {
        let block_high = self.voices[voice].block_high;
        self.opl.write(REG_KEYON_BLOCK + voice as u8, block_high & !KEY_ON);
        self.voices[voice].key_on = false;

        if note != SILENCE_NOTE {
            self.set_freq(voice, note, true);
        }
    }

    fn set_note_percussive(&mut self, voice: usize, note: i32) {
        let bit = rhythm_bit(voice);

        self.rhythm &= !bit;
        self.opl.write(REG_RHYTHM, self.rhythm);
        self.voices[voice].key_on = false;

        if note != SILENCE_NOTE {
            match voice {
                TOM_TOM_CHANNEL => {
                    self.set_freq(TOM_TOM_CHANNEL, note, false);
                    self.set_freq(SNARE_DRUM_CHANNEL, note + TOM_TOM_TO_SNARE, false);
                }
                BASS_DRUM_CHANNEL => self.set_freq(voice, note, false),
                // Snare, cymbal and hi-hat have fixed pitches
                _ => (),
            }

            self.voices[voice].key_on = true;
            self.rhythm |= bit;
            self.opl.write(REG_RHYTHM, self.rhythm);
        }
    }

    fn set_pitch(&mut self, voice: usize, variation: f32) {
        if self.is_drum(voice) {
            return;
        }

        let (row, half_tone) = self.pitch_bend.step(pitch_bend(variation));
        self.voices[voice].fnum_row = row;
        self.voices[voice].half_tone = half_tone;

        let VoiceRegisters { note, key_on, .. } = self.voices[voice];
        self.set_freq(voice, note, key_on);
    }

    fn set_freq(&mut self, voice: usize, note: i32, key_on: bool) {
        let regs = &mut self.voices[voice];
        let freq = frequency(regs.fnum_row, regs.half_tone, note);

        regs.note = note;
        regs.key_on = key_on;
        regs.block_high = freq.block_high;

        let key = if key_on { KEY_ON } else { 0 };
        self.opl.write(REG_FNUM_LOW + voice as u8, freq.fnum_low);
        self.opl
            .write(REG_KEYON_BLOCK + voice as u8, freq.block_high | key);
    }

    /// The carrier's KSL/TL byte scaled by the voice volume.
    fn ksl_tl(&self, voice: usize) -> u8 {
        let regs = &self.voices[voice];

        scaled_total_level(regs.ksltl, regs.volume)
    }

    fn set_volume(&mut self, voice: usize, volume: u8) {
        let slot = if self.is_single_operator(voice) {
            drum_slot(voice)
        } else {
            carrier_slot(voice)
        };

        self.voices[voice].volume = volume;
        let level = self.ksl_tl(voice);
        self.opl.write(REG_KSL_TL + slot, level);
    }

    fn send_instrument(&mut self, voice: usize, instrument: &Instrument) {
        let modulator = &instrument.modulator;
        let carrier = &instrument.carrier;

        if self.is_single_operator(voice) {
            let slot = drum_slot(voice);

            self.voices[voice].ksltl = modulator.ksltl;
            let level = self.ksl_tl(voice);

            self.opl.write(REG_AM_MULTI + slot, modulator.ammulti);
            self.opl.write(REG_KSL_TL + slot, level);
            self.opl.write(REG_AR_DR + slot, modulator.ardr);
            self.opl.write(REG_SL_RR + slot, modulator.slrr);
            self.opl.write(REG_WAVEFORM + slot, modulator.waveform);
        } else {
            let slot = OP_TABLE[voice];

            self.opl.write(REG_AM_MULTI + slot, modulator.ammulti);
            self.opl.write(REG_KSL_TL + slot, modulator.ksltl);
            self.opl.write(REG_AR_DR + slot, modulator.ardr);
            self.opl.write(REG_SL_RR + slot, modulator.slrr);
            self.opl.write(REG_FB_CONN + voice as u8, modulator.fbc);
            self.opl.write(REG_WAVEFORM + slot, modulator.waveform);

            self.voices[voice].ksltl = carrier.ksltl;
            let level = self.ksl_tl(voice);
            let slot = carrier_slot(voice);

            self.opl.write(REG_AM_MULTI + slot, carrier.ammulti);
            self.opl.write(REG_KSL_TL + slot, level);
            self.opl.write(REG_AR_DR + slot, carrier.ardr);
            self.opl.write(REG_SL_RR + slot, carrier.slrr);
            self.opl.write(REG_WAVEFORM + slot, carrier.waveform);
        }
    }
}

impl<O: Opl> Sequencer<O> {
    /// Create a sequencer with no song loaded.
    pub fn new(opl: O) -> Self {
        Sequencer {
            song: None,
            chip: Chip::new(opl),
            playheads: ArrayVec::new(),
            refresh: ROL_DEFAULT_REFRESH,
            next_tempo_event: 0,
            tick: 0,
        }
    }

    /// Create a sequencer playing `song`, rewound to its start.
    pub fn with_song(song: Song, opl: O) -> Self {
        let mut sequencer = Self::new(opl);
        sequencer.set_song(song);

        sequencer
    }

    /// Replace the current song and rewind.
    pub fn set_song(&mut self, song: Song) {
        self.playheads = song.voices.iter().map(|_| VoicePlayhead::default()).collect();
        self.song = Some(song);
        self.rewind(0);
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.as_ref()
    }

    /// The next tick `update` will play.
    pub fn tick(&self) -> i32 {
        self.tick
    }

    pub fn opl(&self) -> &O {
        &self.chip.opl
    }

    pub fn opl_mut(&mut self) -> &mut O {
        &mut self.chip.opl
    }

    pub fn into_opl(self) -> O {
        self.chip.opl
    }
}

/// Ticks per second at `multiplier` times the song's basic tempo.
fn tempo_refresh(song: &Song, multiplier: f32) -> f32 {
    let tick_beat = f32::from(song.ticks_per_beat.min(ROL_MAX_TICK_BEAT));

    tick_beat * song.basic_tempo * multiplier / 60.0
}

impl<O: Opl> Player for Sequencer<O> {
    #[cfg(feature = "std")]
    fn load(&mut self, path: &std::path::Path) -> Result<(), Error> {
        self.song = None;
        self.playheads.clear();

        let (rol, bank) = crate::player::read_with_companion(path, ROL_BANK_FILENAME)?;
        let song = Song::from_slices(&rol, &bank)?;
        self.set_song(song);

        Ok(())
    }

    fn rewind(&mut self, _subsong: usize) {
        let song = match &self.song {
            Some(song) => song,
            None => return,
        };

        for playhead in self.playheads.iter_mut() {
            *playhead = VoicePlayhead::default();
        }
        self.next_tempo_event = 0;
        self.tick = 0;

        self.chip.reset(song.mode);
        self.refresh = tempo_refresh(song, 1.0);
    }

    fn update(&mut self) -> bool {
        let song = match &self.song {
            Some(song) => song,
            None => return false,
        };

        if let Some(event) = song.tempo_events.get(self.next_tempo_event) {
            if event.tick == self.tick {
                self.refresh = tempo_refresh(song, event.multiplier);
                self.next_tempo_event += 1;
            }
        }

        let voices = song.voices.iter().zip(self.playheads.iter_mut());
        for (voice, (track, playhead)) in voices.enumerate() {
            playhead.update(voice, track, &song.instruments, self.tick, &mut self.chip);
        }

        self.tick += 1;

        self.tick <= song.time_of_last_note
    }

    fn refresh(&self) -> f32 {
        self.refresh
    }

    /// The first instrument of `voice`, empty if the voice plays nothing.
    fn instrument_name(&self, voice: usize) -> &str {
        self.song
            .as_ref()
            .and_then(|song| song.voices.get(voice))
            .filter(|track| !track.notes.is_empty())
            .and_then(|track| track.instruments.first())
            .map_or("", |event| event.name.as_str())
    }
}

use core::iter;

use crate::consts::*;
use crate::encoder::Operator;
#[cfg(feature = "std")]
use crate::error::Error;
use crate::ksm::song::{Note, NoteKind, Song};
use crate::opl::Opl;
use crate::player::Player;

/// Plays a KSM `Song` by writing OPL2 registers at a fixed 240 Hz.
#[derive(Debug)]
pub struct Sequencer<O: Opl> {
    song: Option<Song>,
    chip: Chip<O>,

    count: i64,
    count_stop: i64,
    next_note: usize,
    song_end: bool,
}

/// A melodic chip channel and the track that owns it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ChannelSlot {
    track: usize,
    /// Sounding pitch, 0 when idle
    pitch: u8,
    /// `count_stop` when the channel last started a note
    last_used: i64,
}

#[derive(Debug)]
struct Chip<O: Opl> {
    opl: O,
    slots: [ChannelSlot; NUM_MELODIC_VOICES],
    channels: usize,
    rhythm: u8,
}

/// How a drum track drives the rhythm section.
#[derive(Debug, Clone, Copy)]
struct Drum {
    bit: u8,
    channel: usize,
    /// Added to the frequency word
    transpose: i32,
    /// Volume goes to the carrier rather than the modulator
    carrier: bool,
}

// Bass drum, snare, tom-tom, cymbal, hi-hat
const DRUMS: [Drum; 5] = [
    Drum {
        bit: 0x10,
        channel: BASS_DRUM_CHANNEL,
        transpose: -2048,
        carrier: true,
    },
    Drum {
        bit: 0x08,
        channel: SNARE_DRUM_CHANNEL,
        transpose: -2048,
        carrier: true,
    },
    Drum {
        bit: 0x04,
        channel: TOM_TOM_CHANNEL,
        transpose: 0,
        carrier: false,
    },
    Drum {
        bit: 0x02,
        channel: TOM_TOM_CHANNEL,
        transpose: 0,
        carrier: true,
    },
    Drum {
        bit: 0x01,
        channel: SNARE_DRUM_CHANNEL,
        transpose: -2048,
        carrier: false,
    },
];

/// Block and F-Num word for `pitch`. Index 63 is past the table and plays
/// the silent last entry.
fn frequency(pitch: u8) -> u16 {
    KSM_FREQ[usize::from(pitch).min(KSM_FREQ.len() - 1)]
}

/// Replace the total level of `op`, keeping its key scale bits.
fn with_level(op: &Operator, level: u8) -> Operator {
    Operator {
        ksltl: (op.ksltl & KSL_MASK) | level,
        ..*op
    }
}

/// `(carrier, modulator)` programs for channels 6 to 8 in rhythm mode.
///
/// Channels 7 and 8 each carry two drums, one per operator.
fn drum_programs(song: &Song) -> [(Operator, Operator); 3] {
    let level = |track: usize| song.tracks[track].volume ^ KSM_MAX_LEVEL;
    let bass = song.instrument(11);
    let snare = song.instrument(12);
    let tom = song.instrument(13);
    let cymbal = song.instrument(14);
    let hihat = song.instrument(15);

    [
        (with_level(&bass.carrier, level(11)), bass.modulator),
        (
            with_level(&snare.carrier, level(12)),
            with_level(&hihat.modulator, level(15)),
        ),
        (
            with_level(&cymbal.carrier, level(14)),
            with_level(&tom.modulator, level(13)),
        ),
    ]
}

/// Round `time` to the nearest multiple of `quantum`.
fn quantize(time: u32, quantum: u32) -> i64 {
    i64::from((time + quantum / 2) / quantum * quantum)
}

impl<O: Opl> Chip<O> {
    fn new(opl: O) -> Self {
        Chip {
            opl,
            slots: [ChannelSlot::default(); NUM_MELODIC_VOICES],
            channels: NUM_MELODIC_VOICES,
            rhythm: 0,
        }
    }

    fn reset(&mut self, song: &Song) {
        self.channels = song.channels();
        self.rhythm = if song.rhythm { RHYTHM_ENABLE } else { 0 };
        self.slots = [ChannelSlot::default(); NUM_MELODIC_VOICES];

        self.opl.write(REG_WAVE_CTRL, WAVE_SELECT_ENABLE);
        self.opl.write(REG_TIMER1, 0);
        self.opl.write(REG_CSM_KEYSPLIT, 0);
        self.opl.write(REG_RHYTHM, self.rhythm);

        if song.rhythm {
            for (i, (carrier, modulator)) in drum_programs(song).iter().enumerate() {
                self.set_instrument(BASS_DRUM_CHANNEL + i, carrier, modulator);
            }
        }

        // Hand out channels in track order; the rest stay with track 0
        let owners = song
            .tracks
            .iter()
            .enumerate()
            .flat_map(|(track, t)| iter::repeat(track).take(usize::from(t.channels)));
        for (slot, track) in self.slots[..self.channels].iter_mut().zip(owners) {
            slot.track = track;
        }

        for channel in 0..self.channels {
            let track = self.slots[channel].track;
            let instrument = song.instrument(track);
            let level = TL_MIN_LEVEL.wrapping_sub(song.tracks[track].volume);
            let carrier = with_level(&instrument.carrier, level);

            self.set_instrument(channel, &carrier, &instrument.modulator);
        }
    }

    fn set_instrument(&mut self, channel: usize, carrier: &Operator, modulator: &Operator) {
        let slot = OP_TABLE[channel];
        let channel = channel as u8;

        self.opl.write(REG_FNUM_LOW + channel, 0);
        self.opl.write(REG_KEYON_BLOCK + channel, 0);
        self.opl.write(REG_FB_CONN + channel, modulator.fbc);
        self.set_operator(slot, modulator);
        self.set_operator(slot + CARRIER_OFFSET, carrier);
    }

    fn set_operator(&mut self, slot: u8, op: &Operator) {
        self.opl.write(REG_AM_MULTI + slot, op.ammulti);
        self.opl.write(REG_KSL_TL + slot, op.ksltl);
        self.opl.write(REG_AR_DR + slot, op.ardr);
        self.opl.write(REG_SL_RR + slot, op.slrr);
        self.opl.write(REG_WAVEFORM + slot, op.waveform);
    }

    fn play_note(&mut self, song: &Song, note: Note, count_stop: i64) {
        let track = usize::from(note.track);
        let volume = song.tracks[track].volume;

        let level = match note.kind {
            NoteKind::Off => return self.note_off(track, note.pitch),
            NoteKind::Normal => volume,
            NoteKind::Quieter => volume.saturating_sub(KSM_LEVEL_STEP),
            NoteKind::Louder => volume.saturating_add(KSM_LEVEL_STEP).min(KSM_MAX_LEVEL),
        };

        if track < KSM_DRUM_TRACK {
            self.note_on(song, track, note.pitch, level, count_stop);
        } else if self.rhythm & RHYTHM_ENABLE != 0 {
            self.drum_on(song, track, note.pitch, level);
        }
    }

    fn note_off(&mut self, track: usize, pitch: u8) {
        if let Some(channel) = self.slots[..self.channels]
            .iter()
            .position(|slot| slot.track == track && slot.pitch == pitch)
        {
            let freq = frequency(pitch);
            self.opl
                .write(REG_KEYON_BLOCK + channel as u8, (freq >> 8) as u8 & !KEY_ON);

            let slot = &mut self.slots[channel];
            slot.pitch = 0;
            slot.last_used = 0;
        }
    }

    fn note_on(&mut self, song: &Song, track: usize, pitch: u8, level: u8, count_stop: i64) {
        // Steal the track's longest idle channel
        let mut best: Option<(usize, u32)> = None;
        for (channel, slot) in self.slots[..self.channels].iter().enumerate() {
            if slot.track != track {
                continue;
            }

            let age = (count_stop - slot.last_used) as u32;
            // Strictly greater, so equal ages keep the earliest channel
            // where a `>=` scan would settle on the last one
            if best.map_or(true, |(_, oldest)| age > oldest) {
                best = Some((channel, age));
            }
        }
        let channel = match best {
            Some((channel, _)) => channel,
            None => return,
        };

        let freq = frequency(pitch);
        let ksl = song.instrument(track).carrier.ksltl & KSL_MASK;
        let ch = channel as u8;

        self.opl.write(REG_KEYON_BLOCK + ch, 0);
        self.opl.write(
            REG_KSL_TL + OP_TABLE[channel] + CARRIER_OFFSET,
            ksl.wrapping_add(level ^ KSM_MAX_LEVEL),
        );
        self.opl.write(REG_FNUM_LOW + ch, (freq & 0xff) as u8);
        self.opl.write(REG_KEYON_BLOCK + ch, (freq >> 8) as u8 | KEY_ON);

        let slot = &mut self.slots[channel];
        slot.pitch = pitch;
        slot.last_used = count_stop;
    }

    fn drum_on(&mut self, song: &Song, track: usize, pitch: u8, level: u8) {
        let drum = DRUMS[track - KSM_DRUM_TRACK];
        let freq = i32::from(frequency(pitch)) + drum.transpose;
        let ch = drum.channel as u8;

        self.opl.write(REG_FNUM_LOW + ch, (freq & 0xff) as u8);
        self.opl
            .write(REG_KEYON_BLOCK + ch, (freq >> 8) as u8 & !KEY_ON);

        // Retrigger: drop the bit, then raise it again below
        self.opl.write(REG_RHYTHM, self.rhythm & !drum.bit);
        self.rhythm |= drum.bit;

        let instrument = song.instrument(track);
        let (slot, ksltl) = if drum.carrier {
            (
                OP_TABLE[drum.channel] + CARRIER_OFFSET,
                instrument.carrier.ksltl,
            )
        } else {
            (OP_TABLE[drum.channel], instrument.modulator.ksltl)
        };
        self.opl.write(
            REG_KSL_TL + slot,
            (ksltl & KSL_MASK).wrapping_add(level ^ KSM_MAX_LEVEL),
        );

        self.opl.write(REG_RHYTHM, self.rhythm);
    }
}

impl<O: Opl> Sequencer<O> {
    /// Create a sequencer with no song loaded.
    pub fn new(opl: O) -> Self {
        Sequencer {
            song: None,
            chip: Chip::new(opl),
            count: 0,
            count_stop: 0,
            next_note: 0,
            song_end: false,
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
        self.song = Some(song);
        self.rewind(0);
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.as_ref()
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

impl<O: Opl> Player for Sequencer<O> {
    #[cfg(feature = "std")]
    fn load(&mut self, path: &std::path::Path) -> Result<(), Error> {
        self.song = None;

        let (ksm, insts) = crate::player::read_with_companion(path, KSM_INSTRUMENTS_FILENAME)?;
        let song = Song::from_slices(&ksm, &insts)?;
        self.set_song(song);

        Ok(())
    }

    fn rewind(&mut self, _subsong: usize) {
        let song = match &self.song {
            Some(song) => song,
            None => return,
        };

        self.chip.reset(song);

        self.next_note = 0;
        self.song_end = false;
        self.count = song.notes.first().map_or(0, |note| i64::from(note.time)) - 1;
        self.count_stop = self.count;
    }

    fn update(&mut self) -> bool {
        let song = match &self.song {
            Some(song) => song,
            None => return false,
        };

        self.count += 1;

        // One lap of the note list at most, whatever the quantization does
        let mut budget = song.notes.len();
        while self.count >= self.count_stop && budget > 0 {
            budget -= 1;

            self.chip
                .play_note(song, song.notes[self.next_note], self.count_stop);

            self.next_note += 1;
            if self.next_note == song.notes.len() {
                self.next_note = 0;
                self.song_end = true;
                self.count = i64::from(song.notes[0].time) - 1;
            }

            let next = song.notes[self.next_note];
            self.count_stop = quantize(next.time, song.quantum(usize::from(next.track)));
        }

        !self.song_end
    }

    fn refresh(&self) -> f32 {
        KSM_REFRESH
    }

    /// The instrument of `track`, empty if the track has no channels.
    fn instrument_name(&self, track: usize) -> &str {
        self.song
            .as_ref()
            .and_then(|song| {
                song.tracks
                    .get(track)
                    .filter(|t| t.channels > 0)
                    .map(|t| song.instruments[usize::from(t.instrument)].name.as_str())
            })
            .unwrap_or("")
    }
}

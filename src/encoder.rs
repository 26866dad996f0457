//! Translation of notes, volumes and pitch bends into OPL2 register values.

use crate::consts::*;

/// One operator's parameters, already laid out the way the chip's
/// registers expect them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    /// AM / vibrato / EG type / KSR / frequency multiple (`0x20` block)
    pub ammulti: u8,
    /// Key scale level / total level (`0x40` block)
    pub ksltl: u8,
    /// Attack rate / decay rate (`0x60` block)
    pub ardr: u8,
    /// Sustain level / release rate (`0x80` block)
    pub slrr: u8,
    /// Feedback / connection (`0xC0` block). Only meaningful on modulators.
    pub fbc: u8,
    /// Waveform select (`0xE0` block)
    pub waveform: u8,
}

/// The two frequency registers of a channel, without the key-on bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frequency {
    /// Low 8 bits of the F-Num (`0xA0` block)
    pub(crate) fnum_low: u8,
    /// Block and high F-Num bits (`0xB0` block)
    pub(crate) block_high: u8,
}

/// Look up the frequency registers for `note` shifted by `half_tone`,
/// using F-Num table `row`.
///
/// The shifted note saturates at both ends of the note range.
pub(crate) fn frequency(row: usize, half_tone: i32, note: i32) -> Frequency {
    let biased = note
        .saturating_add(half_tone)
        .max(0)
        .min(MAX_NOTES as i32 - 1) as usize;
    let fnum = FNUM_NOTES[row][NOTE_INDEX[biased] as usize];

    Frequency {
        fnum_low: (fnum & 0xff) as u8,
        block_high: (NOTE_OCTAVE[biased] << BLOCK_SHIFT) | ((fnum >> 8) & FNUM_HIGH_MASK) as u8,
    }
}

/// Convert a ROL pitch variation (1.0 = no bend) into a 14-bit bend value.
pub(crate) fn pitch_bend(variation: f32) -> u16 {
    #[allow(clippy::float_cmp)]
    let centered = variation == 1.0;

    if centered {
        MID_PITCH
    } else {
        (PITCH_BEND_SCALE * variation) as u16
    }
}

/// Turns bend values into an F-Num table row and a half-tone offset.
///
/// Remembers the last computation; consecutive identical bends are common.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct PitchBend {
    last: Option<(i32, usize, i32)>,
}

impl PitchBend {
    /// Returns `(row, half_tone)` for `bend`.
    pub(crate) fn step(&mut self, bend: u16) -> (usize, i32) {
        let length = (i32::from(bend) - i32::from(MID_PITCH)) * PITCH_STEPS;

        if let Some((last, row, half_tone)) = self.last {
            if last == length {
                return (row, half_tone);
            }
        }

        // Rounds toward negative infinity
        let steps = length.div_euclid(i32::from(MID_PITCH));
        let (row, half_tone) = if steps < 0 {
            let down = PITCH_STEPS - 1 - steps;
            let mut delta = (down - PITCH_STEPS + 1) % PITCH_STEPS;
            if delta != 0 {
                delta = PITCH_STEPS - delta;
            }
            (delta as usize, -(down / PITCH_STEPS))
        } else {
            ((steps % PITCH_STEPS) as usize, steps / PITCH_STEPS)
        };

        self.last = Some((length, row, half_tone));

        (row, half_tone)
    }
}

/// Scale the total level in `ksltl` by `volume` (0..=127), keeping the key
/// scale bits.
///
/// Rounds half up by adding half the divisor before dividing.
pub(crate) fn scaled_total_level(ksltl: u8, volume: u8) -> u8 {
    let amplitude = u16::from(TL_MIN_LEVEL - (ksltl & TL_MASK));
    let scaled = u16::from(volume) * amplitude;
    let scaled = scaled + scaled + u16::from(MAX_VOLUME);
    let level = u16::from(TL_MIN_LEVEL).wrapping_sub(scaled / (2 * u16::from(MAX_VOLUME)));

    level as u8 | (ksltl & KSL_MASK)
}

/// Rhythm control bit of percussion voice 6 (bass drum) to 10 (hi-hat).
pub(crate) fn rhythm_bit(voice: usize) -> u8 {
    1 << (4 + BASS_DRUM_CHANNEL - voice)
}

/// Carrier slot of melodic channel `channel`.
pub(crate) fn carrier_slot(channel: usize) -> u8 {
    OP_TABLE[channel] + CARRIER_OFFSET
}

/// The single slot driven by drum voice 7 (snare) to 10 (hi-hat).
pub(crate) fn drum_slot(voice: usize) -> u8 {
    DRUM_OP_TABLE[voice - SNARE_DRUM_CHANNEL]
}

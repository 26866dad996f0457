// OPL2 register bases
pub(crate) const REG_WAVE_CTRL: u8 = 0x01; // Test LSI / waveform select enable
pub(crate) const REG_TIMER1: u8 = 0x04;
pub(crate) const REG_CSM_KEYSPLIT: u8 = 0x08;
pub(crate) const REG_AM_MULTI: u8 = 0x20; // AM / vibrato / EG type / KSR / multiple
pub(crate) const REG_KSL_TL: u8 = 0x40; // Key scale level / total level
pub(crate) const REG_AR_DR: u8 = 0x60; // Attack rate / decay rate
pub(crate) const REG_SL_RR: u8 = 0x80; // Sustain level / release rate
pub(crate) const REG_FNUM_LOW: u8 = 0xa0;
pub(crate) const REG_KEYON_BLOCK: u8 = 0xb0; // Key on / block / F-Num high bits
pub(crate) const REG_RHYTHM: u8 = 0xbd; // AM depth / vibrato depth / rhythm control
pub(crate) const REG_FB_CONN: u8 = 0xc0; // Feedback / connection
pub(crate) const REG_WAVEFORM: u8 = 0xe0;

pub(crate) const WAVE_SELECT_ENABLE: u8 = 0x20;
pub(crate) const KEY_ON: u8 = 0x20;
pub(crate) const RHYTHM_ENABLE: u8 = 0x20;
pub(crate) const KSL_MASK: u8 = 0xc0;
pub(crate) const TL_MASK: u8 = 0x3f;
pub(crate) const TL_MIN_LEVEL: u8 = 0x3f;
pub(crate) const FNUM_HIGH_MASK: u16 = 0x03;
pub(crate) const BLOCK_SHIFT: u8 = 2;

/// Distance from a channel's modulator slot to its carrier slot.
pub(crate) const CARRIER_OFFSET: u8 = 3;

/// Modulator slot offset for each of the 9 melodic channels.
pub(crate) const OP_TABLE: [u8; 9] = [0x00, 0x01, 0x02, 0x08, 0x09, 0x0a, 0x10, 0x11, 0x12];

/// Single-operator slots of the snare, tom-tom, cymbal and hi-hat.
pub(crate) const DRUM_OP_TABLE: [u8; 4] = [0x14, 0x12, 0x15, 0x11];

pub(crate) const NUM_MELODIC_VOICES: usize = 9;
pub(crate) const NUM_PERCUSSIVE_VOICES: usize = 11;
pub(crate) const BASS_DRUM_CHANNEL: usize = 6;
pub(crate) const SNARE_DRUM_CHANNEL: usize = 7;
pub(crate) const TOM_TOM_CHANNEL: usize = 8;

pub(crate) const MAX_VOLUME: u8 = 0x7f;
pub(crate) const MAX_NOTES: usize = 96;
pub(crate) const SEMITONES: usize = 12;

// Pitch bend
pub(crate) const MID_PITCH: u16 = 0x2000;
pub(crate) const PITCH_STEPS: i32 = 25; // steps within a half-tone
pub(crate) const PITCH_BEND_SCALE: f32 = (0x3fff >> 1) as f32;

// ROL
pub(crate) const ROL_VERSION_MAJOR: u16 = 0;
pub(crate) const ROL_VERSION_MINOR: u16 = 4;
pub(crate) const ROL_HEADER_UNUSED0: usize = 40;
pub(crate) const ROL_HEADER_UNUSED1: usize = 1;
pub(crate) const ROL_HEADER_UNUSED2: usize = 90 + 38 + 15;
pub(crate) const ROL_TRACK_FILLER: usize = 15;
pub(crate) const ROL_NAME_LENGTH: usize = 9;
pub(crate) const ROL_INSTRUMENT_EVENT_FILLER: usize = 3;
pub(crate) const ROL_MAX_TICK_BEAT: u16 = 60;
pub(crate) const ROL_DEFAULT_REFRESH: f32 = 18.2;
pub(crate) const ROL_BANK_FILENAME: &str = "standard.bnk";
pub(crate) const MAX_NOTE_EVENTS: usize = 0x8000;

/// Added to every note number read from a ROL file; a raw 0 becomes silence.
pub(crate) const SILENCE_NOTE: i32 = -12;
pub(crate) const TOM_TOM_NOTE: i32 = 24;
pub(crate) const TOM_TOM_TO_SNARE: i32 = 7; // half-tones between channels 8 and 7
pub(crate) const SNARE_NOTE: i32 = TOM_TOM_NOTE + TOM_TOM_TO_SNARE;

// BNK
pub(crate) const BNK_SIGNATURE_LENGTH: usize = 6;
pub(crate) const BNK_RECORD_LENGTH: usize = 30;

// KSM
pub(crate) const KSM_TRACKS: usize = 16;
pub(crate) const KSM_DRUM_TRACK: usize = 11;
pub(crate) const KSM_INSTRUMENTS: usize = 256;
pub(crate) const KSM_INSTRUMENT_NAME_LENGTH: usize = 20;
pub(crate) const KSM_INSTRUMENT_LENGTH: usize = 11;
pub(crate) const KSM_INSTRUMENT_FILLER: usize = 2;
pub(crate) const KSM_REFRESH: f32 = 240.0;
pub(crate) const KSM_QUANTUM: u32 = 240;
pub(crate) const KSM_MAX_LEVEL: u8 = 63;
pub(crate) const KSM_LEVEL_STEP: u8 = 4;
pub(crate) const KSM_INSTRUMENTS_FILENAME: &str = "insts.dat";

/// Octave of every note in `0..MAX_NOTES`.
pub(crate) const NOTE_OCTAVE: [u8; MAX_NOTES] = note_table(true);

/// Semitone within the octave of every note in `0..MAX_NOTES`.
pub(crate) const NOTE_INDEX: [u8; MAX_NOTES] = note_table(false);

const fn note_table(octave: bool) -> [u8; MAX_NOTES] {
    let mut table = [0; MAX_NOTES];
    let mut i = 0;
    while i < MAX_NOTES {
        table[i] = if octave {
            (i / SEMITONES) as u8
        } else {
            (i % SEMITONES) as u8
        };
        i += 1;
    }
    table
}

/// F-Num for each semitone, one row per pitch bend step.
#[rustfmt::skip]
pub(crate) const FNUM_NOTES: [[u16; SEMITONES]; PITCH_STEPS as usize] = [
    [343, 364, 385, 408, 433, 459, 486, 515, 546, 579, 614, 650],
    [344, 365, 387, 410, 434, 460, 488, 517, 548, 581, 615, 652],
    [345, 365, 387, 410, 435, 461, 489, 518, 549, 582, 617, 653],
    [346, 366, 388, 411, 436, 462, 490, 519, 550, 583, 618, 655],
    [346, 367, 389, 412, 437, 463, 491, 520, 551, 584, 619, 657],
    [347, 368, 390, 413, 438, 464, 492, 522, 553, 586, 621, 658],
    [348, 369, 391, 415, 439, 466, 493, 523, 554, 587, 622, 660],
    [349, 370, 392, 415, 440, 467, 495, 524, 556, 589, 624, 661],
    [350, 371, 393, 416, 441, 468, 496, 525, 557, 590, 625, 663],
    [351, 372, 394, 417, 442, 469, 497, 527, 558, 592, 627, 665],
    [351, 372, 395, 418, 443, 470, 498, 528, 559, 593, 628, 666],
    [352, 373, 396, 419, 444, 471, 499, 529, 561, 594, 630, 668],
    [353, 374, 397, 420, 445, 472, 500, 530, 562, 596, 631, 669],
    [354, 375, 398, 421, 447, 473, 502, 532, 564, 597, 633, 671],
    [355, 376, 398, 422, 448, 474, 503, 533, 565, 599, 634, 672],
    [356, 377, 399, 423, 449, 475, 504, 534, 566, 600, 636, 674],
    [356, 378, 400, 424, 450, 477, 505, 535, 567, 601, 637, 675],
    [357, 379, 401, 425, 451, 478, 506, 537, 569, 603, 639, 677],
    [358, 379, 402, 426, 452, 479, 507, 538, 570, 604, 640, 679],
    [359, 380, 403, 427, 453, 480, 509, 539, 571, 606, 642, 680],
    [360, 381, 404, 428, 454, 481, 510, 540, 572, 607, 643, 682],
    [360, 382, 405, 429, 455, 482, 511, 541, 574, 608, 645, 683],
    [361, 383, 406, 430, 456, 483, 512, 543, 575, 610, 646, 685],
    [362, 384, 407, 431, 457, 484, 513, 544, 577, 611, 648, 687],
    [363, 385, 408, 432, 458, 485, 514, 545, 578, 612, 649, 688],
];

/// Block and F-Num for each KSM pitch index (block in bits 10..13). Index
/// 62 is silent.
#[rustfmt::skip]
pub(crate) const KSM_FREQ: [u16; 63] = [
    0,
    2390, 2411, 2434, 2456, 2480, 2506, 2533, 2562, 2592, 2625, 2659, 2695,
    3414, 3435, 3458, 3480, 3504, 3530, 3557, 3586, 3616, 3649, 3683, 3719,
    4438, 4459, 4482, 4504, 4528, 4554, 4581, 4610, 4640, 4673, 4707, 4743,
    5462, 5483, 5506, 5528, 5552, 5578, 5605, 5634, 5664, 5697, 5731, 5767,
    6486, 6507, 6530, 6552, 6576, 6602, 6629, 6658, 6688, 6721, 6755, 6791,
    7510, 0,
];

#![cfg(feature = "std")]

use oplseq::{ksm, rol, Error, Player, RegisterLog};
use std::fs;
use std::path::PathBuf;

/// A scratch directory removed again on drop.
struct Scratch(PathBuf);

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("oplseq-{}-{}", std::process::id(), name));
        fs::create_dir_all(&dir).unwrap();

        Scratch(dir)
    }

    fn write(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.0.join(name);
        fs::write(&path, data).unwrap();

        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.0).ok();
    }
}

fn push_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_f32(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_name(out: &mut Vec<u8>, name: &str, len: usize) {
    let mut field = vec![0; len];
    field[..name.len()].copy_from_slice(name.as_bytes());
    out.extend_from_slice(&field);
}

/// A melodic ROL song: voice 0 plays `notes` on "piano1", with one volume
/// change and one pitch bend.
fn rol_song(major: i16, notes: &[(i16, i16)]) -> Vec<u8> {
    let mut out = Vec::new();
    push_i16(&mut out, major);
    push_i16(&mut out, 4);
    out.resize(out.len() + 40, 0);
    push_i16(&mut out, 4);
    push_i16(&mut out, 4);
    push_i16(&mut out, 0);
    push_i16(&mut out, 0);
    out.push(0);
    out.push(1);
    out.resize(out.len() + 143, 0);
    push_f32(&mut out, 120.0);

    push_i16(&mut out, 1);
    push_i16(&mut out, 0);
    push_f32(&mut out, 1.0);

    for voice in 0..9 {
        let notes = if voice == 0 { notes } else { &[] };

        out.resize(out.len() + 15, 0);
        push_i16(&mut out, notes.iter().map(|&(_, d)| d).sum());
        for &(note, duration) in notes {
            push_i16(&mut out, note);
            push_i16(&mut out, duration);
        }
        out.resize(out.len() + 15, 0);

        if voice == 0 {
            push_i16(&mut out, 1);
            push_i16(&mut out, 0);
            push_name(&mut out, "piano1", 9);
            out.resize(out.len() + 3, 0);
        } else {
            push_i16(&mut out, 0);
        }
        out.resize(out.len() + 15, 0);

        if voice == 0 {
            push_i16(&mut out, 1);
            push_i16(&mut out, 2);
            push_f32(&mut out, 0.5);
        } else {
            push_i16(&mut out, 0);
        }
        out.resize(out.len() + 15, 0);

        if voice == 0 {
            push_i16(&mut out, 1);
            push_i16(&mut out, 3);
            push_f32(&mut out, 1.5);
        } else {
            push_i16(&mut out, 0);
        }
    }

    out
}

/// A bank holding a single "PIANO1" record.
fn standard_bnk() -> Vec<u8> {
    let mut out = vec![1, 0];
    out.extend_from_slice(b"ADLIB-");
    out.extend_from_slice(&1_u16.to_le_bytes());
    out.extend_from_slice(&1_u16.to_le_bytes());
    out.extend_from_slice(&28_i32.to_le_bytes());
    out.extend_from_slice(&40_i32.to_le_bytes());
    out.resize(28, 0);

    out.extend_from_slice(&0_u16.to_le_bytes());
    out.push(1);
    push_name(&mut out, "PIANO1", 9);

    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&[2, 1, 3, 15, 4, 1, 2, 5, 10, 1, 0, 1, 0]);
    out.extend_from_slice(&[1, 2, 0, 12, 3, 0, 4, 6, 0, 0, 1, 0, 1]);
    out.extend_from_slice(&[0, 0]);

    out
}

/// A melodic KSM song on track 0 (instrument 7, two channels).
fn ksm_song(notes: &[(u32, u32)]) -> Vec<u8> {
    let mut tables = [[0_u8; 16]; 5];
    tables[0][0] = 7;
    tables[1][0] = 240;
    tables[2][0] = 2;
    tables[4][0] = 50;

    let mut out: Vec<u8> = tables.iter().flatten().copied().collect();
    out.extend_from_slice(&(notes.len() as u16).to_le_bytes());
    for &(time, kind_pitch) in notes {
        out.extend_from_slice(&(time << 12 | kind_pitch).to_le_bytes());
    }

    out
}

fn insts_dat() -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..256 {
        push_name(&mut out, &format!("KSM{}", i), 20);
        out.extend((0..11).map(|b| (i + b) as u8));
        out.extend_from_slice(&[0, 0]);
    }

    out
}

/// Play from the start, collecting each tick's writes, until the song ends
/// or `limit` ticks have passed.
fn record<P: Player>(
    player: &mut P,
    log: fn(&mut P) -> &mut RegisterLog,
    limit: usize,
) -> Vec<Vec<(u8, u8)>> {
    player.rewind(0);
    log(player).clear();

    let mut ticks = Vec::new();
    for _ in 0..limit {
        let playing = player.update();
        ticks.push(log(player).take());
        if !playing {
            break;
        }
    }

    ticks
}

fn rol_log(sequencer: &mut rol::Sequencer<RegisterLog>) -> &mut RegisterLog {
    sequencer.opl_mut()
}

fn ksm_log(sequencer: &mut ksm::Sequencer<RegisterLog>) -> &mut RegisterLog {
    sequencer.opl_mut()
}

#[test]
fn rol_plays_from_disk() {
    let scratch = Scratch::new("rol");
    let song = scratch.write("tune.rol", &rol_song(0, &[(60, 2), (0, 2), (62, 4)]));
    scratch.write("standard.bnk", &standard_bnk());

    let mut player = rol::Sequencer::new(RegisterLog::new());
    player.load(&song).unwrap();

    assert_eq!(player.refresh(), 8.0);
    assert_eq!(player.instrument_name(0), "piano1");
    assert_eq!(player.instrument_name(1), "");

    let first = record(&mut player, rol_log, 100);
    // Eight ticks of notes, then the ninth update reports the end
    assert_eq!(first.len(), 9);
    // Instrument program and key on
    assert!(first[0].contains(&(0x20, 0xb1)));
    assert!(first[0].iter().any(|&(reg, value)| reg == 0xb0 && value & 0x20 != 0));

    let second = record(&mut player, rol_log, 100);
    assert_eq!(first, second);
}

#[test]
fn rol_without_bank_stays_unloaded() {
    let scratch = Scratch::new("nobank");
    let song = scratch.write("tune.rol", &rol_song(0, &[(60, 2)]));

    let mut player = rol::Sequencer::new(RegisterLog::new());
    match player.load(&song) {
        Err(Error::MissingBankFile { path, .. }) => {
            assert_eq!(path, scratch.path("standard.bnk"));
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(player.song().is_none());
    assert!(!player.update());
    assert!(player.opl().writes().is_empty());
}

#[test]
fn rol_wrong_version_is_rejected() {
    let scratch = Scratch::new("version");
    let song = scratch.write("tune.rol", &rol_song(1, &[(60, 2)]));
    scratch.write("standard.bnk", &standard_bnk());

    let mut player = rol::Sequencer::new(RegisterLog::new());

    assert!(matches!(
        player.load(&song),
        Err(Error::UnsupportedVersion { major: 1, minor: 4 })
    ));
    assert!(player.song().is_none());
}

#[test]
fn missing_song_is_io_error() {
    let scratch = Scratch::new("nosong");

    let mut player = ksm::Sequencer::new(RegisterLog::new());

    assert!(matches!(
        player.load(&scratch.path("absent.ksm")),
        Err(Error::Io(_))
    ));
}

#[test]
fn ksm_plays_from_disk() {
    let scratch = Scratch::new("ksm");
    let notes = [(4, 0x40 | 13), (4, 0x40 | 25), (10, 13), (12, 25)];
    let song = scratch.write("tune.ksm", &ksm_song(&notes));
    scratch.write("insts.dat", &insts_dat());

    let mut player = ksm::Sequencer::new(RegisterLog::new());
    player.load(&song).unwrap();

    assert_eq!(player.refresh(), 240.0);
    assert_eq!(player.instrument_name(0), "KSM7");
    assert_eq!(player.song().map(|song| song.notes().len()), Some(4));

    let first = record(&mut player, ksm_log, 100);
    // Notes at 4, 10 and 12; the last one ends the song
    assert_eq!(first.len(), 9);
    assert_eq!(first[0].len(), 8);
    assert_eq!(first[6], vec![(0xb0, 0x0d)]);
    assert_eq!(first[8], vec![(0xb1, 0x11)]);

    let second = record(&mut player, ksm_log, 100);
    assert_eq!(first, second);
}

#[test]
fn ksm_without_instruments_stays_unloaded() {
    let scratch = Scratch::new("noinsts");
    let song = scratch.write("tune.ksm", &ksm_song(&[(0, 0x40 | 1)]));

    let mut player = ksm::Sequencer::new(RegisterLog::new());

    assert!(matches!(player.load(&song), Err(Error::MissingBankFile { .. })));
    assert!(!player.update());
}

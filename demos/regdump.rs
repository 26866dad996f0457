#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![forbid(unsafe_code)]

use colored::Colorize;
use error_iter::ErrorIter as _;
use oplseq::{Error as OplseqError, Opl, Player};
use std::{path::Path, process::ExitCode};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing song argument\nUsage: regdump <rol-or-ksm-file> [ticks]")]
    MissingSongFilename,

    #[error("Unknown song type `{0}`, expected .rol or .ksm")]
    UnknownSongType(String),

    #[error("Invalid tick count `{0}`")]
    InvalidTicks(String),

    #[error("Song error")]
    Oplseq(#[from] OplseqError),
}

/// Prints every register write as it happens.
#[derive(Debug, Default)]
struct Printer {
    tick: usize,
}

impl Opl for Printer {
    fn write(&mut self, register: u8, value: u8) {
        println!("{:>6} {:02x} {:02x}", self.tick, register, value);
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match regdump() {
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);

            for cause in e.sources().skip(1) {
                eprintln!("{} {}", "caused by:".bright_red(), cause);
            }

            ExitCode::FAILURE
        }
        Ok(()) => ExitCode::SUCCESS,
    }
}

fn regdump() -> Result<(), Error> {
    let mut args = std::env::args().skip(1);
    let filename = args.next().ok_or(Error::MissingSongFilename)?;
    let limit = match args.next() {
        Some(ticks) => Some(ticks.parse().map_err(|_| Error::InvalidTicks(ticks))?),
        None => None,
    };

    let path = Path::new(&filename);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("rol") => {
            let mut sequencer = oplseq::rol::Sequencer::new(Printer::default());
            sequencer.load(path)?;
            dump(&mut sequencer, limit, |s| &mut s.opl_mut().tick);
        }
        Some("ksm") => {
            let mut sequencer = oplseq::ksm::Sequencer::new(Printer::default());
            sequencer.load(path)?;
            dump(&mut sequencer, limit, |s| &mut s.opl_mut().tick);
        }
        _ => return Err(Error::UnknownSongType(filename)),
    }

    Ok(())
}

/// Play `player` to its end, or for `limit` ticks, keeping the printer's
/// tick label current.
fn dump<P, F>(player: &mut P, limit: Option<usize>, mut tick: F)
where
    P: Player,
    F: FnMut(&mut P) -> &mut usize,
{
    eprintln!("{} {:.2} Hz", "refresh:".green(), player.refresh());

    let mut ticks = 0;
    while limit.map_or(true, |limit| ticks < limit) {
        ticks += 1;
        *tick(player) = ticks;
        if !player.update() {
            break;
        }
    }

    eprintln!("{} {}", "ticks:".green(), ticks);
}

//! Register-exact OPL2 sequencers for AdLib ROL/BNK and KSM songs.
//!
//! A sequencer decodes a song and, once per tick, writes the OPL2 registers
//! that reproduce it into any [`Opl`] sink. Producing audio from those
//! writes is left to an emulator or real hardware.
//!
//! ```rust
//! use oplseq::{Player, RegisterLog};
//!
//! # fn dump(rol: &[u8], bnk: &[u8]) -> Result<(), oplseq::Error> {
//! let song = oplseq::rol::Song::from_slices(rol, bnk)?;
//! let mut sequencer = oplseq::rol::Sequencer::with_song(song, RegisterLog::new());
//! while sequencer.update() {
//!     for (register, value) in sequencer.opl_mut().take() {
//!         println!("{:02x} <- {:02x}", register, value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod consts;
mod encoder;
mod error;
mod opl;
mod player;
mod reader;

pub mod ksm;
pub mod rol;

pub use encoder::Operator;
pub use error::Error;
pub use opl::{Opl, RegisterLog};
pub use player::Player;

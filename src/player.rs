//! The interface a host uses to drive any of the sequencers.

#[cfg(feature = "std")]
use std::path::Path;

#[cfg(feature = "std")]
use crate::error::Error;

/// A song player driven by a host at a fixed tick rate.
///
/// The host calls `update` once every `1 / refresh()` seconds and stops (or
/// loops) when it returns `false`.
pub trait Player {
    /// Load the song at `path` together with its companion instrument file
    /// from the same directory.
    ///
    /// On error the player is left with no song.
    #[cfg(feature = "std")]
    fn load(&mut self, path: &Path) -> Result<(), Error>;

    /// Return to the start of the song and reinitialize the chip.
    fn rewind(&mut self, subsong: usize);

    /// Play one tick. Returns `false` once the song has ended.
    fn update(&mut self) -> bool;

    /// Ticks per second.
    fn refresh(&self) -> f32;

    /// Name of instrument `n`, or an empty string.
    fn instrument_name(&self, n: usize) -> &str;
}

/// Read `path` and the file named `companion` next to it.
#[cfg(feature = "std")]
pub(crate) fn read_with_companion(
    path: &Path,
    companion: &str,
) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let song = std::fs::read(path)?;

    let companion = path.with_file_name(companion);
    let instruments = match std::fs::read(&companion) {
        Ok(data) => data,
        Err(source) => {
            return Err(Error::MissingBankFile {
                path: companion,
                source,
            })
        }
    };

    log::debug!(
        "Read {} ({} bytes) with {} ({} bytes)",
        path.display(),
        song.len(),
        companion.display(),
        instruments.len()
    );

    Ok((song, instruments))
}

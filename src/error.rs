#[cfg(feature = "std")]
use std::path::PathBuf;

#[cfg(feature = "std")]
use thiserror::Error as ThisError;

/// Possible errors while loading a song.
///
/// Every variant is fatal: the player that produced it is left unloaded.
#[derive(Debug)]
#[cfg_attr(feature = "std", derive(ThisError))]
pub enum Error {
    /// The header carries a version tag this crate does not understand.
    #[cfg_attr(feature = "std", error("Unsupported file version {major}.{minor}"))]
    UnsupportedVersion { major: u16, minor: u16 },

    /// The data ended in the middle of a record.
    #[cfg_attr(feature = "std", error("Unexpected end of data at offset {offset}"))]
    Truncated { offset: usize },

    /// A record was complete but its contents cannot be played.
    #[cfg_attr(feature = "std", error("Malformed record: {0}"))]
    MalformedRecord(&'static str),

    /// The song file itself could not be read.
    #[cfg(feature = "std")]
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// The companion instrument file could not be read.
    #[cfg(feature = "std")]
    #[error("Missing instrument bank `{}`", .path.display())]
    MissingBankFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

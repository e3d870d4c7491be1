use taskgate_bus::BusError;
use taskgate_core::{CodecError, RemoteError};

/// Error raised by the gateway's own surface.
///
/// Failures during task processing never show up here — they are converted
/// into task results and replied over the bus. This type covers
/// configuration problems and the poke / file side-channel call sites.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing or invalid configuration, caught before any network call.
    #[error("configuration: {0}")]
    Config(String),

    /// The bus refused an operation.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// A payload could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An HTTP transfer on the file side-channel failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The silo answered an HTTP transfer with a non-2xx status.
    #[error("unexpected http status {0}")]
    HttpStatus(u16),

    /// An upstream gateway service answered with a typed error.
    #[error("gateway service error: {0}")]
    Remote(#[from] RemoteError),
}

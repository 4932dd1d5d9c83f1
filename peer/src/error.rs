use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::net::SocketAddr;

/// Fatal errors raised while setting a session up. Anything that goes wrong
/// once the session is running is logged and dropped instead.
#[derive(Debug)]
pub enum PeerError {
    /// The local UDP endpoint could not be bound or queried.
    Bind {
        addr: String,
        source: io::Error,
    },
    /// Matchmaking handed over more players than a board supports.
    TooManyPlayers { count: usize, max: usize },
    /// Matchmaking handed over too few players to play.
    TooFewPlayers { count: usize, min: usize },
    /// Our own address is missing from the roster.
    NotInRoster { local: SocketAddr },
    /// The roster itself is inconsistent.
    InvalidRoster { reason: String },
    /// Timer settings that would make the failure detector misfire.
    InvalidConfig { reason: String },
    Io(io::Error),
}

impl Display for PeerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerError::Bind { addr, source } => {
                write!(f, "cannot bind local endpoint {}: {}", addr, source)
            }
            PeerError::TooManyPlayers { count, max } => {
                write!(f, "roster has {} players, at most {} are supported", count, max)
            }
            PeerError::TooFewPlayers { count, min } => {
                write!(f, "roster has {} players, at least {} are needed", count, min)
            }
            PeerError::NotInRoster { local } => {
                write!(f, "local address {} is not in the roster", local)
            }
            PeerError::InvalidRoster { reason } => write!(f, "invalid roster: {}", reason),
            PeerError::InvalidConfig { reason } => write!(f, "invalid configuration: {}", reason),
            PeerError::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl Error for PeerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PeerError::Bind { source, .. } => Some(source),
            PeerError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PeerError {
    fn from(e: io::Error) -> Self {
        PeerError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PeerError::TooManyPlayers { count: 7, max: 6 };
        assert_eq!(err.to_string(), "roster has 7 players, at most 6 are supported");

        let local: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let err = PeerError::NotInRoster { local };
        assert!(err.to_string().contains("127.0.0.1:9000"));
    }

    #[test]
    fn test_io_error_source_is_kept() {
        let err: PeerError = io::Error::new(io::ErrorKind::AddrInUse, "busy").into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("busy"));
    }
}

use crate::audio::ChannelSet;

/// Errors that can occur while loading an impulse response
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Extension is not one of the accepted containers, or probing failed
    UnsupportedFormat(String),
    /// File could not be opened or read
    IoFailure(String),
    /// File holds no decodable audio
    EmptyOrCorrupt(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            LoadError::IoFailure(msg) => write!(f, "I/O failure: {}", msg),
            LoadError::EmptyOrCorrupt(msg) => write!(f, "Empty or corrupt audio: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

/// Errors raised while negotiating the bus layout with the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    InvalidBusLayout { input: ChannelSet, output: ChannelSet },
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::InvalidBusLayout { input, output } => write!(
                f,
                "Invalid bus layout: input {:?}, output {:?} (expected matching mono or stereo)",
                input, output
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Errors raised while restoring persisted state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    MalformedState(String),
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::MalformedState(msg) => write!(f, "Malformed state: {}", msg),
        }
    }
}

impl std::error::Error for StateError {}

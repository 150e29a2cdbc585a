pub mod types;

pub use types::{AudioEvent, Command, PreparedEngine};

//! Domain values and entities. No I/O happens here.

pub mod access_level;
pub mod entities;
pub mod error;

pub use access_level::AccessLevel;
pub use error::ValidationError;

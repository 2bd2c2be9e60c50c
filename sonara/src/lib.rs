pub mod error;
pub mod prelude;
/// Canonical RF tensor assembly.
pub mod rf;
/// The blocking acquisition session.
pub mod session;

pub use sonara_core as core;
pub use sonara_driver as driver;

pub use error::SessionError;
pub use rf::RfFrame;
pub use session::{Session, SessionOptions};

//! JSON text frames exchanged with client devices.
//!
//! Client frames are tagged either by `command`, by `type`, or carry a bare
//! `deviceId` for registration. Server frames are always tagged by `type`.
mod request;
mod response;
mod router;

pub use request::*;
pub use response::*;
pub use router::*;

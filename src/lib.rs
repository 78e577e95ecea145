//! Pushes rally pacenote annotation files from a desktop game folder to
//! connected companion devices, and serves the devices' command protocol.
mod catalog;
mod codec;
mod config;
mod constants;
mod errors;
mod handlers;
mod matcher;
mod metrics;
mod network;
mod node;
mod protocol;
mod session;
mod store;
mod sync;
mod watcher;
pub mod utils;

pub use catalog::*;
pub use codec::*;
pub use config::*;
pub use errors::*;
pub use handlers::*;
pub use matcher::*;
pub use metrics::*;
pub use network::*;
pub use node::*;
pub use protocol::*;
pub use session::*;
pub use store::*;
pub use sync::*;
pub use watcher::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;

//! Host-facing layer: settings, content hashing, and the [`Registry`] that
//! routes files to the TV or movie catalog.

pub mod async_util;
pub mod error;
pub mod hasher;
pub mod registry;
pub mod settings;

pub use async_util::{run_with_events, EventReceiver};
pub use error::LibError;
pub use hasher::{fill_hash, hash_file, ContentHash};
pub use registry::{MovieBackend, Registry, SyncEvent, TvBackend};
pub use settings::{settings_path, Settings};

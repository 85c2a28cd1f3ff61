//! Keeping local stores in step with remote catalogs, and resolving media
//! files against them.
//!
//! - [`SyncEngine`] fetches, retries and persists records; one write at a
//!   time per store, coalescing concurrent adds and syncs.
//! - [`entities`] rebuilds series, seasons, episodes and movies from rows.
//! - [`ImageCache`] keeps artwork on disk.
//! - [`Resolver`] turns a file into a known entity, a match, or a list of
//!   candidates.
//! - [`TvCatalog`] and [`MovieCatalog`] tie the above to one provider each.

pub mod engine;
pub mod entities;
pub mod images;
pub mod movie;
pub mod progress;
pub mod record;
pub mod resolver;
pub mod single_flight;
pub mod state;
pub mod tv;

pub use engine::{AddOutcome, SyncEngine, SyncReport};
pub use entities::{Entity, Episode, Movie, Season, Series};
pub use images::ImageCache;
pub use movie::MovieCatalog;
pub use progress::{LogProgress, SilentProgress, SyncProgress};
pub use record::CatalogRecord;
pub use resolver::{Backend, Resolution, Resolver};
pub use single_flight::SingleFlight;
pub use state::EntityState;
pub use tv::TvCatalog;

pub(crate) mod config;
pub(crate) mod file;
pub(crate) mod series;
pub(crate) mod sync;

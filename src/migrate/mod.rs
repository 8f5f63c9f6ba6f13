pub mod album_cache;
pub mod album_index;
pub mod catalog;
pub mod config;
pub mod embed;
pub mod executor;
pub mod identity;
pub mod paths;
pub mod plan;
pub mod resume_log;
#[cfg(test)]
pub mod testing;
pub mod translate;
pub mod util;
pub mod warn;

pub mod cache;
pub mod commands;
pub mod config;
pub mod decompose;
pub mod media;
pub mod patterns;
pub mod resolve;
pub mod source;

pub use cache::LookupCache;
pub use decompose::decompose;
pub use media::{EpisodeCountHint, ParsedMediaInfo};
pub use patterns::{PatternSet, RuleName};
pub use resolve::Resolver;
pub use source::{ExternalTitleRecord, SourceError, TitleSource};

//! Core module - aliases, caching and resolution

pub mod alias;
pub mod cache;
pub mod clock;
pub mod config;
pub mod identity;
pub mod jsonfile;
pub mod project;
pub mod remote;
pub mod resolve;
pub mod sync;

pub use alias::{AliasError, AliasLocation, AliasStore, ResolvedAliasView, Scope, ValidationReport};
pub use cache::{CacheStats, EntityCache, PersistentTier};
pub use config::{CacheSettings, Config, LiveConfig};
pub use identity::{is_canonical_id, EntityKind, KindParseError};
pub use project::{Project, ProjectError, Workspace};
pub use remote::{EntityFilter, Remote, RemoteEntity, RemoteError, SnapshotRemote};
pub use resolve::{Resolution, ResolveError, ResolveOptions, ResolvedBy, Resolver};
pub use sync::{slugify, SyncPlan, SyncSummary};

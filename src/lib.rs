//! # Confluence
//!
//! Merges a fixed set of RSS/Atom/RDF feeds into a single, freshness-
//! ordered, image-annotated feed, emitted as an RSS 2.0 document and a
//! compact JSON projection.
//!
//! ## Architecture
//!
//! ```text
//! Sources → Fetcher (parallel) → Normalizer → Image Resolver ⇄ Cache
//!                                                   ↓
//!                                     Merger → RSS / JSON output
//! ```
//!
//! - [`fetcher`]: bounded-concurrency HTTP retrieval with typed failures
//!   and transient-only retry
//! - [`normalizer`]: RSS/Atom/RDF parsing into canonical [`Article`](domain::Article)s
//! - [`resolver`]: tiered thumbnail resolution (feed metadata → embedded
//!   `<img>` → Open Graph page probe), cache-aware
//! - [`fingerprint`]: per-source change detection that keeps unchanged
//!   sources cheap to re-poll
//! - [`cache`]: JSON-file resolution cache, a hint rather than a source
//!   of truth
//! - [`merger`]: dedup, recency ranking, truncation
//! - [`output`]: RSS 2.0 and JSON document generation

/// Application context and error handling.
pub mod app;

/// Run-to-run resolution cache (articles, image lookups, fingerprints).
pub mod cache;

/// Command-line interface: `run`, `sources`, `clear-cache`.
pub mod cli;

/// TOML configuration: sources, fetch limits, resolver budgets, output.
pub mod config;

/// Core domain model.
pub mod domain;

/// HTTP fetching with timeouts, retry and typed failure taxonomy.
pub mod fetcher;

/// Source fingerprinting for change detection.
pub mod fingerprint;

/// Dedup / rank / truncate over the merged article list.
pub mod merger;

/// Feed parsing and normalization into article drafts.
pub mod normalizer;

/// Output documents: RSS 2.0 feed and JSON projection.
pub mod output;

/// Per-source orchestration: fetch, normalize, resolve, merge.
pub mod pipeline;

/// Tiered image resolution with page-probe fallback.
pub mod resolver;

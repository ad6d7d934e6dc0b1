//! Texto Maestro
//!
//! Plan-gated text rewriting and generation in front of a hosted language model.
//!
//! ## Standalone
//!
//! Run the binary:
//! ```bash
//! texto-maestro-server
//! ```
//!
//! ## Embedded (Axum)
//!
//! When the `server` feature is enabled, this crate can be embedded into a larger Axum app:
//! ```rust,ignore
//! use axum::Router;
//! use texto_maestro::infrastructure::AppConfig;
//! use texto_maestro::server::{build_state_with_pool, router};
//! use sqlx::postgres::PgPoolOptions;
//!
//! let cfg = AppConfig::from_env()?;
//! let pool = PgPoolOptions::new().connect_lazy(&cfg.database_url)?;
//! let state = build_state_with_pool(cfg, pool, true).await?;
//! let app = Router::new().nest("/text", router(state));
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

// Standalone + embedded HTTP server support (Axum).
// Enabled behind the `server` feature so the core library can be used without Axum.
#[cfg(feature = "server")]
pub mod server;

pub use application::{
    PlanResolution, PlanResolver, PlanSource, SessionRegistry, SessionTimings, TextService,
    TextServiceError, UserSession,
};
pub use domain::{
    entitlements_of, ExportFormat, GenerationRequest, HistoryEntry, HistoryKind, Limit,
    PlanEntitlements, PlanTier, QuotaState, RewriteRequest,
};
pub use infrastructure::{
    AppConfig, Clock, FileKeyValueStore, KeyValueStore, LlmClient, PostgresProfileRepository,
    ProfileRepository, SystemClock, TextGenerator,
};

#[cfg(feature = "server")]
pub use server::{build_state_from_env, build_state_with_pool, router, AppState};

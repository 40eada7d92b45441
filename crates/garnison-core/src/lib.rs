//! Core library for garnison, the training center's reporting tool.
//!
//! Data flows from the Strapi API (`api`) through the entity normalizer
//! (`normalize`, `models`) into filtering and grouping (`filter`) or
//! instructor statistics (`stats`), and ends in printable PDF reports
//! (`report`). `auth` and `config` hold what persists between runs.

pub mod api;
pub mod auth;
pub mod config;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod report;
pub mod stats;
pub mod utils;

pub use api::{ApiClient, ApiError, BatchError, BatchReport};
pub use auth::{CredentialStore, Session, SessionData};
pub use config::Config;
pub use filter::{FilterField, FilterSpec, PersonSortColumn};
pub use normalize::Normalize;
pub use report::{render_report, RenderOptions, RenderedReport, ReportError, ReportRequest};
pub use stats::{compute_statistics, Period, StatisticsSnapshot, StatisticsSummary};

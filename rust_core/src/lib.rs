//! Ltpwatch Core - instrument resolution and LTP polling.
//!
//! This module provides:
//! - Schema-agnostic parsing of instrument master tables
//! - Tiered free-text resolution of symbols to provider security ids
//! - Exchange segment normalization
//! - A fixed-interval price poller with retry, change tracking and alert suppression
//! - Message formatting and delivery collaborators (DhanHQ, Telegram)

pub mod alerts;
pub mod clients;
pub mod formatters;
pub mod master;
pub mod matching;
pub mod models;
pub mod poller;
pub mod segments;

pub use alerts::{AlertConfig, AlertPolicy};
pub use formatters::{MessageStyle, NotificationFormatter};
pub use master::{MasterIndex, MasterIndexError, ReferenceTable};
pub use matching::{resolve_queries, Resolution, Resolver, ResolverOptions};
pub use models::{InstrumentKey, MasterRecord, Observation, ResolvedInstrument};
pub use poller::{PollerConfig, PricePoller};

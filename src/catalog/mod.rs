//! Games-catalog reconciliation and pagination engine.
//!
//! Leaves first: [`normalize`] shapes upstream records, [`classify`] decides
//! what an endpoint can do server-side, [`fetch`] plans and executes
//! requests, [`store`] holds the single catalog state and [`projector`]
//! derives the visible page from it.

pub mod categories;
pub mod classify;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod projector;
pub mod session;
pub mod store;

pub use categories::parse_categories;
pub use classify::{EndpointCapabilities, EndpointClassifier, resolve_path};
pub use error::CatalogError;
pub use fetch::{
    DEFAULT_SEARCH_PAGE_SIZE, FetchExecutor, FetchOrchestrator, FetchOutcome, FetchPlan,
    RetryPolicy,
};
pub use normalize::{ListingPayload, NormalizedListing, normalize_game, normalize_listing};
pub use projector::{CatalogView, project};
pub use session::CatalogSession;
pub use store::{CatalogAction, CatalogState, reduce};

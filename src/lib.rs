//! IRP/VRP adaptive large-neighborhood-search engine.
//!
//! `domain` holds the data model and mutable search state (§3-4.6 of the
//! design), `operators` the destroy/repair catalogue (§4.4), `engine` the
//! SA-ALNS outer loop and rolling-horizon driver (§4.7-4.8), and
//! `external` the out-of-scope collaborators (§6).

pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod external;
pub mod operators;
pub mod rng;

//! Shareabouts API service: crowdsourced place data with a family-invalidated
//! response cache and a cursor-paginated activity feed.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;

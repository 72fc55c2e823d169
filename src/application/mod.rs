//! Application services: resource operations and the activity feed.

pub mod activity;
pub mod error;
pub mod repos;
pub mod resources;

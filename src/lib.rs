//! citygraph - city metadata, administrative regions and road-network graphs
//!
//! This library provides shared types and modules for the server and ingest binaries.

pub mod config;
pub mod geocode;
pub mod graph;
pub mod models;
pub mod regions;
pub mod service;
pub mod store;

pub use models::{City, CityView, RegionDescriptor};
pub use regions::{BoundaryRecord, BoundaryTable, ParentMatch};

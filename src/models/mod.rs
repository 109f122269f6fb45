//! Core data models for cities, their properties and administrative regions.

pub mod city;
pub mod region;

pub use city::{City, CityProperty, CityView, GeoPoint, PointView, PropertyView};
pub use region::RegionDescriptor;

//! Key/record store for cities, their properties and centre points, and
//! the boundary table.
//!
//! Records are JSON values in sled trees keyed by big-endian `u64` ids,
//! so iteration follows insertion order.

use std::path::Path;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use thiserror::Error;
use tracing::info;

use crate::models::{City, CityProperty, GeoPoint};
use crate::regions::{BoundaryRecord, BoundaryTable};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),
    #[error("corrupt record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("temporary directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("{kind} {id} not found")]
    Missing { kind: &'static str, id: u64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Values for a new property row
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub id_center: u64,
    pub population: u64,
    pub population_density: Option<f64>,
    pub time_zone: String,
}

#[derive(Clone)]
pub struct CityStore {
    db: Db,
    cities: Tree,
    properties: Tree,
    points: Tree,
    boundaries: Tree,
    // keeps the directory of a temporary store alive
    _temp: Option<std::sync::Arc<tempfile::TempDir>>,
}

impl CityStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        info!("Opening city store at {}", path.as_ref().display());
        Self::from_db(sled::open(path)?, None)
    }

    /// A store in a fresh temporary directory, removed on drop
    pub fn temporary() -> StoreResult<Self> {
        let dir = tempfile::Builder::new().prefix("citygraph-store-").tempdir()?;
        let db = sled::open(dir.path())?;
        Self::from_db(db, Some(std::sync::Arc::new(dir)))
    }

    fn from_db(db: Db, temp: Option<std::sync::Arc<tempfile::TempDir>>) -> StoreResult<Self> {
        Ok(Self {
            cities: db.open_tree("cities")?,
            properties: db.open_tree("properties")?,
            points: db.open_tree("points")?,
            boundaries: db.open_tree("boundaries")?,
            db,
            _temp: temp,
        })
    }

    fn next_id(&self) -> StoreResult<u64> {
        // sled ids start at 0; keep 0 free
        Ok(self.db.generate_id()? + 1)
    }

    pub fn add_point(&self, latitude: f64, longitude: f64) -> StoreResult<u64> {
        let id = self.next_id()?;
        put(&self.points, id, &GeoPoint { id, latitude, longitude })?;
        Ok(id)
    }

    pub fn add_property(&self, property: NewProperty) -> StoreResult<u64> {
        let id = self.next_id()?;
        let row = CityProperty {
            id,
            id_center: property.id_center,
            population: property.population,
            population_density: property.population_density,
            time_zone: property.time_zone,
            time_created: Utc::now(),
        };
        put(&self.properties, id, &row)?;
        Ok(id)
    }

    pub fn add_city(&self, city_name: &str, id_property: u64) -> StoreResult<u64> {
        let id = self.next_id()?;
        let city = City {
            id,
            city_name: city_name.to_string(),
            id_property,
            downloaded: false,
        };
        put(&self.cities, id, &city)?;
        Ok(id)
    }

    pub fn get_city(&self, id: u64) -> StoreResult<Option<City>> {
        get(&self.cities, id)
    }

    pub fn get_property(&self, id: u64) -> StoreResult<Option<CityProperty>> {
        get(&self.properties, id)
    }

    pub fn get_point(&self, id: u64) -> StoreResult<Option<GeoPoint>> {
        get(&self.points, id)
    }

    pub fn find_city_by_name(&self, city_name: &str) -> StoreResult<Option<City>> {
        for city in self.list_cities()? {
            if city.city_name == city_name {
                return Ok(Some(city));
            }
        }
        Ok(None)
    }

    /// All cities in id order
    pub fn list_cities(&self) -> StoreResult<Vec<City>> {
        values(&self.cities)
    }

    pub fn set_downloaded(&self, id: u64, downloaded: bool) -> StoreResult<City> {
        let mut city = self
            .get_city(id)?
            .ok_or(StoreError::Missing { kind: "city", id })?;
        city.downloaded = downloaded;
        put(&self.cities, id, &city)?;
        Ok(city)
    }

    /// Replace the stored boundary table, keeping its row order
    pub fn put_boundaries(&self, table: &BoundaryTable) -> StoreResult<()> {
        self.boundaries.clear()?;
        for (row, record) in table.iter().enumerate() {
            put(&self.boundaries, row as u64, record)?;
        }
        self.boundaries.flush()?;
        info!("Stored {} boundary records", table.len());
        Ok(())
    }

    pub fn load_boundaries(&self) -> StoreResult<BoundaryTable> {
        let records: Vec<BoundaryRecord> = values(&self.boundaries)?;
        Ok(BoundaryTable::new(records))
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn put<T: Serialize>(tree: &Tree, id: u64, value: &T) -> StoreResult<()> {
    tree.insert(id.to_be_bytes(), serde_json::to_vec(value)?)?;
    Ok(())
}

fn get<T: DeserializeOwned>(tree: &Tree, id: u64) -> StoreResult<Option<T>> {
    match tree.get(id.to_be_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn values<T: DeserializeOwned>(tree: &Tree) -> StoreResult<Vec<T>> {
    tree.iter()
        .values()
        .map(|bytes| -> StoreResult<T> { Ok(serde_json::from_slice(&bytes?)?) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};

    fn add_sample_city(store: &CityStore, name: &str) -> u64 {
        let point = store.add_point(56.84, 60.61).unwrap();
        let property = store
            .add_property(NewProperty {
                id_center: point,
                population: 1_493_749,
                population_density: None,
                time_zone: "UTC+5".to_string(),
            })
            .unwrap();
        store.add_city(name, property).unwrap()
    }

    #[test]
    fn test_city_roundtrip() {
        let store = CityStore::temporary().unwrap();
        let id = add_sample_city(&store, "Екатеринбург");

        let city = store.get_city(id).unwrap().unwrap();
        assert_eq!(city.city_name, "Екатеринбург");
        assert!(!city.downloaded);

        let property = store.get_property(city.id_property).unwrap().unwrap();
        assert_eq!(property.population, 1_493_749);

        let point = store.get_point(property.id_center).unwrap().unwrap();
        assert_eq!(point.latitude, 56.84);
    }

    #[test]
    fn test_ids_are_nonzero_and_ordered() {
        let store = CityStore::temporary().unwrap();
        let a = add_sample_city(&store, "A");
        let b = add_sample_city(&store, "B");
        assert!(a > 0);
        assert!(b > a);

        let names: Vec<String> = store
            .list_cities()
            .unwrap()
            .into_iter()
            .map(|c| c.city_name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_find_and_mark_downloaded() {
        let store = CityStore::temporary().unwrap();
        let id = add_sample_city(&store, "Пермь");

        assert!(store.find_city_by_name("Омск").unwrap().is_none());
        assert_eq!(store.find_city_by_name("Пермь").unwrap().unwrap().id, id);

        let city = store.set_downloaded(id, true).unwrap();
        assert!(city.downloaded);
        assert!(store.get_city(id).unwrap().unwrap().downloaded);

        assert!(matches!(
            store.set_downloaded(9999, true),
            Err(StoreError::Missing { id: 9999, .. })
        ));
    }

    #[test]
    fn test_boundaries_keep_row_order() {
        let store = CityStore::temporary().unwrap();
        let square = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
        ]);
        let table: BoundaryTable = [30, 10, 20]
            .into_iter()
            .map(|id| BoundaryRecord {
                id,
                name: format!("r{}", id),
                parents: None,
                admin_level: None,
                geometry: square.clone(),
            })
            .collect();

        store.put_boundaries(&table).unwrap();
        assert_eq!(store.load_boundaries().unwrap(), table);

        store.put_boundaries(&BoundaryTable::default()).unwrap();
        assert!(store.load_boundaries().unwrap().is_empty());
    }
}

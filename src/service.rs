//! CRUD-style service functions behind the HTTP API.

use anyhow::Result;
use tracing::info;

use crate::geocode::Geocoder;
use crate::graph::{GraphDownloader, NetworkSource};
use crate::models::{City, CityView, PropertyView, RegionDescriptor};
use crate::regions::RegionHierarchyResolver;
use crate::store::CityStore;

pub struct CityService<G, N> {
    store: CityStore,
    downloader: GraphDownloader<G, N>,
    regions: RegionHierarchyResolver,
}

impl<G: Geocoder, N: NetworkSource> CityService<G, N> {
    pub fn new(
        store: CityStore,
        downloader: GraphDownloader<G, N>,
        regions: RegionHierarchyResolver,
    ) -> Self {
        Self {
            store,
            downloader,
            regions,
        }
    }

    pub fn store(&self) -> &CityStore {
        &self.store
    }

    /// Resolve a city's property and centre point into its API view
    fn city_view(&self, city: &City) -> Result<CityView> {
        let property = match self.store.get_property(city.id_property)? {
            Some(property) => {
                let center = self.store.get_point(property.id_center)?;
                Some(PropertyView::new(&property, center.as_ref()))
            }
            None => None,
        };
        Ok(CityView::new(city, property))
    }

    /// One page of cities in id order; empty past the end
    pub async fn get_cities(&self, page: usize, per_page: usize) -> Result<Vec<CityView>> {
        let start = page.saturating_mul(per_page);

        self.store
            .list_cities()?
            .iter()
            .skip(start)
            .take(per_page)
            .map(|city| self.city_view(city))
            .collect()
    }

    pub async fn get_city(&self, city_id: u64) -> Result<Option<CityView>> {
        match self.store.get_city(city_id)? {
            Some(city) => Ok(Some(self.city_view(&city)?)),
            None => Ok(None),
        }
    }

    /// Fetch the city's road network (if not already on disk) and record
    /// whether a graph file is available.
    pub async fn download_city(&self, city_id: u64, extension: f64) -> Result<Option<CityView>> {
        let Some(city) = self.store.get_city(city_id)? else {
            return Ok(None);
        };

        let downloaded = self
            .downloader
            .download_info(&city.city_name, extension)
            .await?;
        let city = self.store.set_downloaded(city.id, downloaded)?;

        Ok(Some(self.city_view(&city)?))
    }

    pub async fn delete_city(&self, city_id: u64) -> Result<Option<CityView>> {
        let Some(city) = self.store.get_city(city_id)? else {
            return Ok(None);
        };

        self.downloader.delete_info(&city.city_name)?;
        let city = self.store.set_downloaded(city.id, false)?;

        Ok(Some(self.city_view(&city)?))
    }

    /// Regions `depth` hops below the city's own boundary.
    ///
    /// `Ok(None)` for an unknown city, a depth outside `0..=2`, or a
    /// hierarchy that ends before `depth`.
    pub fn get_regions(&self, city_id: u64, depth: i64) -> Result<Option<Vec<RegionDescriptor>>> {
        let Some(city) = self.store.get_city(city_id)? else {
            return Ok(None);
        };

        let regions = self.regions.resolve(&city.city_name, depth)?;
        if let Some(found) = &regions {
            info!(
                "{}: {} regions at depth {}",
                city.city_name,
                found.len(),
                depth
            );
        }
        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use geo::{polygon, Geometry};

    use super::*;
    use crate::geocode::BoundingBox;
    use crate::graph::testing::{FakeGeocoder, FakeNetwork};
    use crate::graph::GraphStore;
    use crate::regions::{BoundaryRecord, BoundaryTable, ParentMatch};
    use crate::store::NewProperty;

    struct Fixture {
        service: CityService<FakeGeocoder, FakeNetwork>,
        _graphs: tempfile::TempDir,
    }

    fn boundary(id: i64, name: &str, parents: Option<&str>) -> BoundaryRecord {
        BoundaryRecord {
            id,
            name: name.to_string(),
            parents: parents.map(str::to_string),
            admin_level: None,
            geometry: Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
            ]),
        }
    }

    fn add_city(store: &CityStore, name: &str) -> u64 {
        let point = store.add_point(54.19, 37.62).unwrap();
        let property = store
            .add_property(NewProperty {
                id_center: point,
                population: 467_955,
                population_density: Some(2_580.0),
                time_zone: "UTC+3".to_string(),
            })
            .unwrap();
        store.add_city(name, property).unwrap()
    }

    fn fixture() -> Fixture {
        let graphs = tempfile::tempdir().unwrap();
        let bbox = BoundingBox {
            north: 54.3,
            south: 54.1,
            east: 37.7,
            west: 37.5,
        };
        let downloader = GraphDownloader::new(
            FakeGeocoder::knowing("Тула", bbox),
            FakeNetwork::default(),
            GraphStore::new(graphs.path()),
        );
        let table = BoundaryTable::new(vec![
            boundary(1, "Тула", None),
            boundary(2, "Центральный", Some("1")),
            boundary(3, "Пролетарский", Some("1")),
        ]);
        let regions = RegionHierarchyResolver::new(Arc::new(table), ParentMatch::Textual);

        Fixture {
            service: CityService::new(CityStore::temporary().unwrap(), downloader, regions),
            _graphs: graphs,
        }
    }

    #[tokio::test]
    async fn test_pagination() {
        let fx = fixture();
        for name in ["a", "b", "c", "d", "e"] {
            add_city(fx.service.store(), name);
        }

        let page: Vec<String> = fx
            .service
            .get_cities(1, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.city_name)
            .collect();
        assert_eq!(page, vec!["c", "d"]);

        assert_eq!(fx.service.get_cities(2, 2).await.unwrap().len(), 1);
        assert!(fx.service.get_cities(3, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_city_view() {
        let fx = fixture();
        let id = add_city(fx.service.store(), "Тула");

        let view = fx.service.get_city(id).await.unwrap().unwrap();
        let property = view.property.unwrap();
        assert_eq!(property.population, 467_955);
        assert_eq!(property.center.unwrap().longitude, 37.62);

        assert!(fx.service.get_city(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_download_and_delete_persist_flag() {
        let fx = fixture();
        let id = add_city(fx.service.store(), "Тула");

        let view = fx.service.download_city(id, 10.0).await.unwrap().unwrap();
        assert!(view.downloaded);
        assert!(fx.service.store().get_city(id).unwrap().unwrap().downloaded);

        let view = fx.service.delete_city(id).await.unwrap().unwrap();
        assert!(!view.downloaded);
        assert!(!fx.service.store().get_city(id).unwrap().unwrap().downloaded);
    }

    #[tokio::test]
    async fn test_download_unknown_city_name() {
        let fx = fixture();
        let id = add_city(fx.service.store(), "Атлантида");

        let view = fx.service.download_city(id, 0.0).await.unwrap().unwrap();
        assert!(!view.downloaded);
        assert!(fx.service.download_city(id + 100, 0.0).await.unwrap().is_none());
    }

    #[test]
    fn test_get_regions() {
        let fx = fixture();
        let id = add_city(fx.service.store(), "Тула");

        let regions = fx.service.get_regions(id, 1).unwrap().unwrap();
        let names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Центральный", "Пролетарский"]);

        assert!(fx.service.get_regions(id, 2).unwrap().is_none());
        assert!(fx.service.get_regions(id, -1).unwrap().is_none());
        assert!(fx.service.get_regions(id + 100, 0).unwrap().is_none());
    }
}

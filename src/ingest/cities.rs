//! Cities CSV ingest.
//!
//! The source table uses Russian headers: `Город`, `Широта`, `Долгота`,
//! `Население`, `Часовой пояс`, `Федеральный округ`, optionally `Плотность`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::info;

use citygraph::store::{CityStore, NewProperty};

#[derive(Debug, Clone, Deserialize)]
pub struct CityRow {
    #[serde(rename = "Город")]
    pub name: String,
    #[serde(rename = "Широта")]
    pub latitude: f64,
    #[serde(rename = "Долгота")]
    pub longitude: f64,
    #[serde(rename = "Население")]
    pub population: u64,
    #[serde(rename = "Часовой пояс")]
    pub time_zone: String,
    #[serde(rename = "Федеральный округ", default)]
    #[allow(dead_code)]
    pub federal_district: Option<String>,
    #[serde(rename = "Плотность", default)]
    pub population_density: Option<f64>,
}

/// What happened to one CSV row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOutcome {
    pub inserted: bool,
    pub attached: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub inserted: usize,
    pub existing: usize,
    pub attached: usize,
}

impl IngestSummary {
    fn record(&mut self, outcome: RowOutcome) {
        if outcome.inserted {
            self.inserted += 1;
        } else {
            self.existing += 1;
        }
        if outcome.attached {
            self.attached += 1;
        }
    }
}

/// Read all rows; `.gz` files are decompressed
pub fn load_city_rows(path: &Path) -> Result<Vec<CityRow>> {
    info!("Loading cities from {}", path.display());

    let file = File::open(path).context("Failed to open cities file")?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let rows = csv_reader
        .deserialize()
        .collect::<Result<Vec<CityRow>, _>>()
        .context("Invalid cities row")?;

    info!("Read {} city rows", rows.len());
    Ok(rows)
}

/// Insert a city (with its property and centre) unless one with the same
/// name exists, then attach a pre-fetched `{osm_dir}/{name}.osm` graph to
/// cities not yet marked downloaded.
pub fn add_city_row(store: &CityStore, row: &CityRow, osm_dir: &Path) -> Result<RowOutcome> {
    let (city_id, inserted, downloaded) = match store.find_city_by_name(&row.name)? {
        Some(city) => (city.id, false, city.downloaded),
        None => {
            let point_id = store.add_point(row.latitude, row.longitude)?;
            let property_id = store.add_property(NewProperty {
                id_center: point_id,
                population: row.population,
                population_density: row.population_density,
                time_zone: row.time_zone.clone(),
            })?;
            (store.add_city(&row.name, property_id)?, true, false)
        }
    };

    let graph_file = osm_dir.join(format!("{}.osm", row.name));
    let attached = !downloaded && graph_file.is_file();
    if attached {
        store.set_downloaded(city_id, true)?;
        info!("DOWNLOADED: {}", row.name);
    }

    Ok(RowOutcome { inserted, attached })
}

/// Load every row of the cities file into the store
pub fn init_db<F>(
    store: &CityStore,
    rows: &[CityRow],
    osm_dir: &Path,
    mut on_row: F,
) -> Result<IngestSummary>
where
    F: FnMut(&CityRow, RowOutcome),
{
    let mut summary = IngestSummary::default();

    for row in rows {
        let outcome = add_city_row(store, row, osm_dir)
            .with_context(|| format!("Failed to add city {}", row.name))?;
        summary.record(outcome);
        on_row(row, outcome);
    }

    store.flush()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "\
Город,Широта,Долгота,Население,Часовой пояс,Федеральный округ
Абакан,53.72,91.43,165183,UTC+7,Сибирский
Азов,47.11,39.42,82937,UTC+3,Южный
Абакан,53.72,91.43,165183,UTC+7,Сибирский
";

    fn write_csv(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("cities.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_rows() {
        let dir = tempfile::tempdir().unwrap();
        let rows = load_city_rows(&write_csv(dir.path())).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].name, "Азов");
        assert_eq!(rows[1].population, 82937);
        assert_eq!(rows[1].time_zone, "UTC+3");
        assert!(rows[1].population_density.is_none());
    }

    #[test]
    fn test_gzip_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cities.csv.gz");
        let mut encoder = flate2::write::GzEncoder::new(
            File::create(&path).unwrap(),
            flate2::Compression::default(),
        );
        encoder.write_all(CSV.as_bytes()).unwrap();
        encoder.finish().unwrap();

        assert_eq!(load_city_rows(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_init_db_skips_duplicates_and_attaches_graphs() {
        let dir = tempfile::tempdir().unwrap();
        let osm_dir = dir.path().join("cities_osm");
        std::fs::create_dir_all(&osm_dir).unwrap();
        std::fs::write(osm_dir.join("Азов.osm"), "<osm/>").unwrap();

        let store = CityStore::temporary().unwrap();
        let rows = load_city_rows(&write_csv(dir.path())).unwrap();

        let mut seen = 0;
        let summary = init_db(&store, &rows, &osm_dir, |_, _| seen += 1).unwrap();

        assert_eq!(seen, 3);
        assert_eq!(
            summary,
            IngestSummary {
                inserted: 2,
                existing: 1,
                attached: 1,
            }
        );

        let azov = store.find_city_by_name("Азов").unwrap().unwrap();
        assert!(azov.downloaded);
        let abakan = store.find_city_by_name("Абакан").unwrap().unwrap();
        assert!(!abakan.downloaded);

        // a second run finds the graph already attached
        let summary = init_db(&store, &rows, &osm_dir, |_, _| {}).unwrap();
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.attached, 0);
    }
}

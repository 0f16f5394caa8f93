use crate::stations::error::StationIndexError;
use crate::types::bounding_box::BoundingBox;
use crate::types::interval::Interval;
use crate::types::station::Station;
use async_compression::tokio::bufread::GzipDecoder;
use bincode::config::{Configuration, Fixint, LittleEndian};
use chrono::NaiveDate;
use futures_util::TryStreamExt;
use log::info;
use reqwest::Client;
use std::io;
use std::path::Path;
use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::io::StreamReader;

const DATA_URL: &str = "https://bulk.meteostat.net/v2/stations/lite.json.gz";
const BINCODE_CACHE_FILE_NAME: &str = "stations_lite.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Selection criteria applied to the station index.
///
/// All filters are optional and combine conjunctively; the result is
/// always sorted by station id so repeated runs pick the same stations.
#[derive(Debug, Clone, Default)]
pub struct StationFilter {
    /// ISO 3166-1 alpha-2 country code, matched case-insensitively.
    pub region: Option<String>,
    /// Geographical bounding box.
    pub bbox: Option<BoundingBox>,
    /// Maximum number of stations to select.
    pub limit: Option<usize>,
    /// Keep only stations whose reported inventory overlaps a date range.
    pub coverage: Option<Coverage>,
}

/// Inventory requirement: reported data for `interval` overlapping
/// the inclusive `[start, end]` range.
#[derive(Debug, Clone, Copy)]
pub struct Coverage {
    pub interval: Interval,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// In-memory index over the station metadata dump.
///
/// Built once per run from the bincode cache (or the network on a cache
/// miss) and queried with [`StationFilter`]s.
#[derive(Debug)]
pub struct StationIndex {
    rtree: rstar::RTree<Station>,
}

impl StationIndex {
    /// Loads the index, downloading and caching the station dump when the
    /// cache file under `cache_dir` is absent.
    pub async fn new(cache_dir: &Path) -> Result<Self, StationIndexError> {
        let cache_file = cache_dir.join(BINCODE_CACHE_FILE_NAME);

        let stations: Vec<Station>;

        if cache_file.exists() {
            let path_clone = cache_file.clone();
            stations = tokio::task::spawn_blocking(move || Self::get_cached_stations(&path_clone))
                .await??;
            info!("Loaded {} stations from cache", stations.len());
        } else {
            info!("Station cache not found, fetching from {}", DATA_URL);
            stations = Self::fetch_stations().await?;
            Self::cache_stations(stations.clone(), &cache_file).await?;
        }

        Ok(Self::from_stations(stations))
    }

    /// Builds an index directly from station records, bypassing cache and
    /// network. Useful for tests and embedded station lists.
    pub fn from_stations(stations: Vec<Station>) -> Self {
        StationIndex {
            rtree: rstar::RTree::bulk_load(stations),
        }
    }

    fn get_cached_stations(cache_path: &Path) -> Result<Vec<Station>, StationIndexError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| StationIndexError::CacheRead(cache_path.to_path_buf(), e))?;
        let (decoded_stations, _) =
            bincode::serde::decode_from_slice::<Vec<Station>, _>(&bytes, BINCODE_CONFIG).map_err(
                |e| StationIndexError::CacheDecode(cache_path.to_path_buf(), Box::from(e)),
            )?;
        Ok(decoded_stations)
    }

    async fn fetch_stations() -> Result<Vec<Station>, StationIndexError> {
        let client = Client::new();
        let response = client
            .get(DATA_URL)
            .send()
            .await
            .map_err(|e| StationIndexError::NetworkRequest(DATA_URL.to_string(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                if let Some(status) = e.status() {
                    return Err(StationIndexError::HttpStatus {
                        url: DATA_URL.to_string(),
                        status,
                        source: e,
                    });
                } else {
                    return Err(StationIndexError::NetworkRequest(DATA_URL.to_string(), e));
                }
            }
        };
        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let stream_reader = StreamReader::new(stream);
        let gzip_decoder = GzipDecoder::new(BufReader::new(stream_reader));
        let mut decoder_reader = BufReader::new(gzip_decoder);
        let mut decompressed_json = Vec::with_capacity(20_000_000);
        decoder_reader.read_to_end(&mut decompressed_json).await?;

        let stations = tokio::task::spawn_blocking(move || {
            serde_json::from_slice::<Vec<Station>>(&decompressed_json)
                .map_err(StationIndexError::from)
        })
        .await??;
        info!("Parsed {} stations from dump", stations.len());
        Ok(stations)
    }

    async fn cache_stations(
        stations: Vec<Station>,
        cache_path: &Path,
    ) -> Result<(), StationIndexError> {
        let bincode_data = tokio::task::spawn_blocking({
            move || {
                bincode::serde::encode_to_vec(stations, BINCODE_CONFIG)
                    .map_err(|e| StationIndexError::CacheEncode(Box::new(e)))
            }
        })
        .await??;
        tokio::fs::write(&cache_path, &bincode_data)
            .await
            .map_err(|e| StationIndexError::CacheWrite(cache_path.to_path_buf(), e))?;
        info!(
            "Wrote station cache ({} bytes) to {}",
            bincode_data.len(),
            cache_path.display()
        );
        Ok(())
    }

    /// Number of stations in the index.
    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    /// Selects stations matching `filter`, sorted by id, truncated to the
    /// filter's limit.
    ///
    /// A bounding box narrows the candidate set with an R-tree envelope
    /// lookup; the remaining filters are plain predicates.
    pub fn query(&self, filter: &StationFilter) -> Vec<Station> {
        let candidates: Vec<&Station> = match &filter.bbox {
            Some(bbox) => self
                .rtree
                .locate_in_envelope(&bbox.envelope())
                .collect(),
            None => self.rtree.iter().collect(),
        };

        let region = filter
            .region
            .as_ref()
            .map(|r| r.trim().to_ascii_uppercase());

        let mut matched: Vec<Station> = candidates
            .into_iter()
            .filter(|station| match &region {
                Some(code) => station.country.eq_ignore_ascii_case(code),
                None => true,
            })
            .filter(|station| match filter.coverage {
                Some(cov) => station.inventory.covers(cov.interval, cov.start, cov.end),
                None => true,
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::station::{DateRange, Identifiers, Inventory, Location, YearRange};
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn station(id: &str, country: &str, lat: f64, lon: f64) -> Station {
        Station {
            id: id.to_string(),
            country: country.to_string(),
            region: None,
            timezone: None,
            name: HashMap::from([("en".to_string(), format!("Station {id}"))]),
            identifiers: Identifiers {
                national: None,
                wmo: None,
                icao: None,
            },
            location: Location {
                latitude: lat,
                longitude: lon,
                elevation: Some(10),
            },
            inventory: Inventory {
                daily: DateRange {
                    start: Some(date(2000, 1, 1)),
                    end: Some(date(2024, 12, 31)),
                },
                hourly: DateRange {
                    start: Some(date(2000, 1, 1)),
                    end: Some(date(2024, 12, 31)),
                },
                model: DateRange {
                    start: None,
                    end: None,
                },
                monthly: YearRange {
                    start: Some(2000),
                    end: Some(2024),
                },
                normals: YearRange {
                    start: None,
                    end: None,
                },
            },
        }
    }

    fn sample_index() -> StationIndex {
        StationIndex::from_stations(vec![
            station("47108", "KR", 37.57, 126.96),
            station("47133", "KR", 36.37, 127.37),
            station("47184", "KR", 33.51, 126.53),
            station("10637", "DE", 50.05, 8.60),
        ])
    }

    #[test]
    fn region_filter_is_case_insensitive() {
        let index = sample_index();
        let found = index.query(&StationFilter {
            region: Some("kr".to_string()),
            ..Default::default()
        });
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|s| s.country == "KR"));
    }

    #[test]
    fn results_are_sorted_by_id_and_limited() {
        let index = sample_index();
        let found = index.query(&StationFilter {
            region: Some("KR".to_string()),
            limit: Some(2),
            ..Default::default()
        });
        let ids: Vec<&str> = found.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["47108", "47133"]);
    }

    #[test]
    fn bbox_narrows_candidates() {
        let index = sample_index();
        // Mainland box that excludes Jeju (47184) and Germany.
        let bbox = BoundingBox::new(35.0, 39.0, 124.0, 130.0).unwrap();
        let found = index.query(&StationFilter {
            bbox: Some(bbox),
            ..Default::default()
        });
        let ids: Vec<&str> = found.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["47108", "47133"]);
    }

    #[test]
    fn coverage_filter_drops_stations_without_inventory() {
        let mut no_hourly = station("99999", "KR", 36.0, 128.0);
        no_hourly.inventory.hourly = DateRange {
            start: None,
            end: None,
        };
        let index = StationIndex::from_stations(vec![
            station("47108", "KR", 37.57, 126.96),
            no_hourly,
        ]);
        let found = index.query(&StationFilter {
            coverage: Some(Coverage {
                interval: Interval::Hourly,
                start: date(2013, 1, 1),
                end: date(2013, 12, 31),
            }),
            ..Default::default()
        });
        let ids: Vec<&str> = found.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["47108"]);
    }

    #[test]
    fn empty_filter_returns_everything() {
        let index = sample_index();
        assert_eq!(index.query(&StationFilter::default()).len(), index.len());
    }
}

use crate::gazetteer::error::GazetteerError;
use crate::types::city::{GazetteerCity, NearestCity};
use crate::types::coordinate::LatLon;
use async_compression::tokio::bufread::GzipDecoder;
use bincode::config::{Configuration, Fixint, LittleEndian};
use futures_util::TryStreamExt;
use haversine::{distance, Location as HaversineLocation, Units as DistanceUnits};
use log::{debug, info};
use polars::prelude::*;
use reqwest::Client;
use rstar::RTree;
use std::fmt;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio_util::io::StreamReader;

/// The citipy world cities list: `Country,City,Latitude,Longitude`.
pub const DEFAULT_GAZETTEER_URL: &str =
    "https://raw.githubusercontent.com/wingchen/citipy/master/citipy/worldcities.csv";
pub const GAZETTEER_COLUMNS: [&str; 4] = ["country", "city", "latitude", "longitude"];
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Where the gazetteer rows are read from.
///
/// Names ending in `.gz` are gunzipped while reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GazetteerSource {
    /// Downloaded once, then served from the bincode cache.
    Url(String),
    /// Parsed directly on every load, never cached.
    File(PathBuf),
}

impl Default for GazetteerSource {
    fn default() -> Self {
        GazetteerSource::Url(DEFAULT_GAZETTEER_URL.to_string())
    }
}

impl GazetteerSource {
    fn is_gzip(&self) -> bool {
        match self {
            GazetteerSource::Url(url) => url.ends_with(".gz"),
            GazetteerSource::File(path) => path.extension().is_some_and(|ext| ext == "gz"),
        }
    }

    /// File name of the bincode cache for this source, derived from the last path segment.
    pub(crate) fn cache_file_name(&self) -> String {
        let last_segment = match self {
            GazetteerSource::Url(url) => url.rsplit('/').next().unwrap_or_default().to_string(),
            GazetteerSource::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let stem = last_segment
            .trim_end_matches(".gz")
            .trim_end_matches(".csv")
            .to_string();
        if stem.is_empty() {
            "gazetteer.bin".to_string()
        } else {
            format!("{}.bin", stem)
        }
    }
}

impl fmt::Display for GazetteerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GazetteerSource::Url(url) => write!(f, "{}", url),
            GazetteerSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Resolves a coordinate to the nearest known city.
///
/// The city sampler only depends on this trait, so any nearest-neighbour
/// backend (or a test fixture) can stand in for [`Gazetteer`].
pub trait CityLookup {
    /// Returns the nearest city to `location`, or `None` when nothing is indexed.
    fn nearest_city(&self, location: LatLon) -> Option<NearestCity>;
}

/// An R-tree over the gazetteer's city centroids.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    rtree: RTree<GazetteerCity>,
}

impl Gazetteer {
    /// Loads the gazetteer from `source`.
    ///
    /// `cache_dir` is only read for [`GazetteerSource::Url`]; file sources ignore it.
    pub async fn load(source: &GazetteerSource, cache_dir: &Path) -> Result<Self, GazetteerError> {
        let cities = match source {
            GazetteerSource::File(path) => {
                info!("Reading gazetteer from {}", path.display());
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| GazetteerError::FileRead(path.clone(), e))?;
                let csv = if source.is_gzip() {
                    Self::read_all(GzipDecoder::new(BufReader::new(bytes.as_slice()))).await?
                } else {
                    bytes
                };
                Self::parse_blocking(csv, source.to_string()).await?
            }
            GazetteerSource::Url(url) => {
                let cache_file = cache_dir.join(source.cache_file_name());
                if cache_file.exists() {
                    let path_clone = cache_file.clone();
                    tokio::task::spawn_blocking(move || Self::get_cached_cities(&path_clone))
                        .await??
                } else {
                    info!("Gazetteer cache not found. Fetching from URL: {}", url);
                    let csv = Self::fetch_csv(url, source.is_gzip()).await?;
                    let cities = Self::parse_blocking(csv, url.clone()).await?;
                    Self::cache_cities(cities.clone(), cache_dir, &cache_file).await?;
                    cities
                }
            }
        };
        info!("Gazetteer loaded with {} cities", cities.len());
        Ok(Self::from_cities(cities))
    }

    /// Builds a gazetteer from an in-memory list of cities.
    pub fn from_cities(cities: Vec<GazetteerCity>) -> Self {
        Gazetteer {
            rtree: RTree::bulk_load(cities),
        }
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    /// Finds the nearest city to a point, together with its great-circle distance.
    pub fn nearest(&self, latitude: f64, longitude: f64) -> Option<NearestCity> {
        let city = self.rtree.nearest_neighbor(&[latitude, longitude])?;
        let distance_km = distance(
            HaversineLocation {
                latitude,
                longitude,
            },
            HaversineLocation {
                latitude: city.latitude,
                longitude: city.longitude,
            },
            DistanceUnits::Kilometers,
        );
        debug!(
            "Nearest city to ({:.3}, {:.3}) is {} ({:.1} km)",
            latitude, longitude, city.city, distance_km
        );
        Some(NearestCity {
            city: city.clone(),
            distance_km,
        })
    }

    fn get_cached_cities(cache_path: &Path) -> Result<Vec<GazetteerCity>, GazetteerError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| GazetteerError::CacheRead(cache_path.to_path_buf(), e))?;
        let (decoded_cities, _) =
            bincode::serde::decode_from_slice::<Vec<GazetteerCity>, _>(&bytes, BINCODE_CONFIG)
                .map_err(|e| {
                    GazetteerError::CacheDecode(cache_path.to_path_buf(), Box::from(e))
                })?;
        info!(
            "Read {} cached gazetteer cities from {}",
            decoded_cities.len(),
            cache_path.display()
        );
        Ok(decoded_cities)
    }

    async fn fetch_csv(url: &str, gzip: bool) -> Result<Vec<u8>, GazetteerError> {
        let client = Client::new();
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| GazetteerError::NetworkRequest(url.to_string(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    GazetteerError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    GazetteerError::NetworkRequest(url.to_string(), e)
                });
            }
        };
        let stream = response.bytes_stream().map_err(io::Error::other);
        let stream_reader = StreamReader::new(stream);
        let bytes = if gzip {
            Self::read_all(GzipDecoder::new(BufReader::new(stream_reader))).await?
        } else {
            Self::read_all(stream_reader).await?
        };
        info!("Downloaded gazetteer ({} bytes)", bytes.len());
        Ok(bytes)
    }

    async fn read_all(reader: impl AsyncRead + Unpin) -> Result<Vec<u8>, GazetteerError> {
        let mut reader = BufReader::new(reader);
        let mut buffer = Vec::with_capacity(4_000_000);
        reader.read_to_end(&mut buffer).await?;
        Ok(buffer)
    }

    async fn parse_blocking(
        csv: Vec<u8>,
        source_name: String,
    ) -> Result<Vec<GazetteerCity>, GazetteerError> {
        let parse_start = std::time::Instant::now();
        let cities =
            tokio::task::spawn_blocking(move || parse_gazetteer_csv(csv, &source_name)).await??;
        debug!(
            "Parsed {} gazetteer rows in {:?}",
            cities.len(),
            parse_start.elapsed()
        );
        Ok(cities)
    }

    async fn cache_cities(
        cities: Vec<GazetteerCity>,
        cache_dir: &Path,
        cache_path: &Path,
    ) -> Result<(), GazetteerError> {
        tokio::fs::create_dir_all(cache_dir)
            .await
            .map_err(|e| GazetteerError::CacheDirCreation(cache_dir.to_path_buf(), e))?;
        let bincode_data = tokio::task::spawn_blocking(move || {
            bincode::serde::encode_to_vec(cities, BINCODE_CONFIG)
                .map_err(|e| GazetteerError::CacheEncode(Box::new(e)))
        })
        .await??;
        tokio::fs::write(cache_path, &bincode_data)
            .await
            .map_err(|e| GazetteerError::CacheWrite(cache_path.to_path_buf(), e))?;
        info!(
            "Wrote gazetteer cache ({} bytes) to {}",
            bincode_data.len(),
            cache_path.display()
        );
        Ok(())
    }
}

impl CityLookup for Gazetteer {
    fn nearest_city(&self, location: LatLon) -> Option<NearestCity> {
        self.nearest(location.0, location.1)
    }
}

/// Parses `Country,City,Latitude,Longitude` CSV bytes (with a header row).
///
/// Rows with a missing field are skipped.
pub(crate) fn parse_gazetteer_csv(
    csv: Vec<u8>,
    source_name: &str,
) -> Result<Vec<GazetteerCity>, GazetteerError> {
    let csv_err = |e: PolarsError| GazetteerError::CsvParse {
        source_name: source_name.to_string(),
        source: e,
    };

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(csv))
        .finish()
        .map_err(csv_err)?;

    if df.width() != GAZETTEER_COLUMNS.len() {
        return Err(GazetteerError::SchemaMismatch {
            source_name: source_name.to_string(),
            expected: GAZETTEER_COLUMNS.len(),
            found: df.width(),
        });
    }
    df.set_column_names(GAZETTEER_COLUMNS.iter().copied())
        .map_err(csv_err)?;

    let countries = df
        .column("country")
        .and_then(|c| c.cast(&DataType::String))
        .map_err(csv_err)?;
    let names = df
        .column("city")
        .and_then(|c| c.cast(&DataType::String))
        .map_err(csv_err)?;
    let latitudes = df
        .column("latitude")
        .and_then(|c| c.cast(&DataType::Float64))
        .map_err(csv_err)?;
    let longitudes = df
        .column("longitude")
        .and_then(|c| c.cast(&DataType::Float64))
        .map_err(csv_err)?;

    let cities = countries
        .str()
        .map_err(csv_err)?
        .into_iter()
        .zip(names.str().map_err(csv_err)?)
        .zip(latitudes.f64().map_err(csv_err)?)
        .zip(longitudes.f64().map_err(csv_err)?)
        .filter_map(|(((country, city), lat), lon)| {
            Some(GazetteerCity::new(country?, city?, lat?, lon?))
        })
        .collect();
    Ok(cities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::write::GzipEncoder;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const SAMPLE_CSV: &str = "Country,City,Latitude,Longitude
au,sydney,-33.8667,151.2167
au,perth,-31.9333,115.8333
gb,london,51.5142,-0.0931
us,new york,40.7142,-74.0064
cl,punta arenas,-53.15,-70.9167
";

    /// Answers a single HTTP request with `body`, then stops listening.
    async fn serve_once(status_line: &'static str, path: &str, body: Vec<u8>) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/{}", listener.local_addr().unwrap(), path);
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        (url, handle)
    }

    async fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzipEncoder::new(Vec::new());
        encoder.write_all(data).await.unwrap();
        encoder.shutdown().await.unwrap();
        encoder.into_inner()
    }

    fn sample_gazetteer() -> Gazetteer {
        let cities = parse_gazetteer_csv(SAMPLE_CSV.as_bytes().to_vec(), "sample")
            .expect("sample csv parses");
        Gazetteer::from_cities(cities)
    }

    #[test]
    fn test_parse_gazetteer_csv() {
        let cities = parse_gazetteer_csv(SAMPLE_CSV.as_bytes().to_vec(), "sample").unwrap();
        assert_eq!(cities.len(), 5);
        assert_eq!(cities[0], GazetteerCity::new("au", "sydney", -33.8667, 151.2167));
        assert_eq!(cities[3].city, "new york");
    }

    #[test]
    fn test_parse_skips_incomplete_rows() {
        let csv = "Country,City,Latitude,Longitude\nau,sydney,-33.8667,151.2167\nau,,-31.9,115.8\n";
        let cities = parse_gazetteer_csv(csv.as_bytes().to_vec(), "sample").unwrap();
        assert_eq!(cities.len(), 1);
    }

    #[test]
    fn test_parse_rejects_wrong_column_count() {
        let csv = "Country,City,Latitude\nau,sydney,-33.8667\n";
        let result = parse_gazetteer_csv(csv.as_bytes().to_vec(), "broken");
        match result {
            Err(GazetteerError::SchemaMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            }
            other => panic!("Expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_nearest_city() {
        let gazetteer = sample_gazetteer();
        assert_eq!(gazetteer.len(), 5);

        let nearest = gazetteer.nearest(-33.0, 150.0).unwrap();
        assert_eq!(nearest.city.city, "sydney");
        assert!(nearest.distance_km > 0.0 && nearest.distance_km < 250.0);

        let nearest = gazetteer.nearest_city(LatLon(-89.0, -60.0)).unwrap();
        assert_eq!(nearest.city.city, "punta arenas");
    }

    #[test]
    fn test_nearest_on_exact_centroid_has_zero_distance() {
        let gazetteer = sample_gazetteer();
        let nearest = gazetteer.nearest(51.5142, -0.0931).unwrap();
        assert_eq!(nearest.city.city, "london");
        assert!(nearest.distance_km < 1e-6);
    }

    #[test]
    fn test_empty_gazetteer_has_no_nearest() {
        let gazetteer = Gazetteer::from_cities(vec![]);
        assert!(gazetteer.is_empty());
        assert!(gazetteer.nearest(0.0, 0.0).is_none());
    }

    #[test]
    fn test_cache_file_name() {
        assert_eq!(
            GazetteerSource::default().cache_file_name(),
            "worldcities.bin"
        );
        assert_eq!(
            GazetteerSource::Url("https://example.com/cities15000.csv.gz".to_string())
                .cache_file_name(),
            "cities15000.bin"
        );
        assert_eq!(
            GazetteerSource::Url("https://example.com/".to_string()).cache_file_name(),
            "gazetteer.bin"
        );
    }

    #[tokio::test]
    async fn test_load_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let csv_path = dir.path().join("cities.csv");
        tokio::fs::write(&csv_path, SAMPLE_CSV).await?;

        let gazetteer = Gazetteer::load(&GazetteerSource::File(csv_path), dir.path()).await?;
        assert_eq!(gazetteer.len(), 5);
        // File sources are never cached
        assert!(!dir.path().join("cities.bin").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_from_gzipped_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let gz_path = dir.path().join("cities.csv.gz");

        tokio::fs::write(&gz_path, gzip(SAMPLE_CSV.as_bytes()).await).await?;

        let gazetteer = Gazetteer::load(&GazetteerSource::File(gz_path), dir.path()).await?;
        assert_eq!(gazetteer.len(), 5);
        assert_eq!(gazetteer.nearest(40.0, -74.0).unwrap().city.city, "new york");
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let cache_dir = dir.path().join("nested");
        let cache_path = cache_dir.join("worldcities.bin");
        let cities = parse_gazetteer_csv(SAMPLE_CSV.as_bytes().to_vec(), "sample")?;

        Gazetteer::cache_cities(cities.clone(), &cache_dir, &cache_path).await?;
        let cached = Gazetteer::get_cached_cities(&cache_path)?;
        assert_eq!(cached, cities);
        Ok(())
    }

    #[tokio::test]
    async fn test_url_source_served_from_cache() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let source = GazetteerSource::Url("http://127.0.0.1:9/never-fetched.csv".to_string());
        let cities = parse_gazetteer_csv(SAMPLE_CSV.as_bytes().to_vec(), "sample")?;
        let cache_path = dir.path().join(source.cache_file_name());
        Gazetteer::cache_cities(cities, dir.path(), &cache_path).await?;

        // The URL is unreachable, so this only succeeds if the cache is used
        let gazetteer = Gazetteer::load(&source, dir.path()).await?;
        assert_eq!(gazetteer.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_download_writes_cache() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let cache_dir = dir.path().join("cache");
        let (url, server) = serve_once("200 OK", "worldcities.csv", SAMPLE_CSV.as_bytes().to_vec()).await;
        let source = GazetteerSource::Url(url);

        let gazetteer = Gazetteer::load(&source, &cache_dir).await?;
        server.await?;
        assert_eq!(gazetteer.len(), 5);
        let cache_path = cache_dir.join("worldcities.bin");
        assert!(cache_path.exists());
        assert_eq!(Gazetteer::get_cached_cities(&cache_path)?.len(), 5);

        // The server is gone; the second load comes from the cache
        let again = Gazetteer::load(&source, &cache_dir).await?;
        assert_eq!(again.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_download_gunzips_gz_source() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let body = gzip(SAMPLE_CSV.as_bytes()).await;
        let (url, server) = serve_once("200 OK", "cities.csv.gz", body).await;

        let gazetteer = Gazetteer::load(&GazetteerSource::Url(url), dir.path()).await?;
        server.await?;
        assert_eq!(gazetteer.nearest(-53.0, -71.0).unwrap().city.city, "punta arenas");
        assert!(dir.path().join("cities.bin").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_download_http_error_status() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let (url, server) = serve_once("404 Not Found", "missing.csv", b"nope".to_vec()).await;

        let result = Gazetteer::load(&GazetteerSource::Url(url), dir.path()).await;
        server.await?;
        match result {
            Err(GazetteerError::HttpStatus { status, .. }) => assert_eq!(status.as_u16(), 404),
            other => panic!("Expected HttpStatus, got {:?}", other.map(|g| g.len())),
        }
        assert!(!dir.path().join("missing.bin").exists());
        Ok(())
    }
}

//! HTTP access to the OpenWeatherMap current-weather endpoint.

use crate::types::units::Units;
use crate::weather_data::error::WeatherDataError;
use bon::bon;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_WEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can answer "what is the current weather in `city`" with a JSON document.
///
/// The collector is generic over this trait; [`OpenWeatherClient`] is the
/// production implementation.
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    /// Fetches the raw JSON body for `city`.
    ///
    /// An answer the API uses to report a problem (e.g. "city not found") is
    /// still returned as `Ok`: only transport and decoding failures are errors.
    async fn current_weather(&self, city: &str) -> Result<Value, WeatherDataError>;
}

/// A client for `GET {base_url}?appid={key}&units={units}&q={city}`.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    units: Units,
}

#[bon]
impl OpenWeatherClient {
    /// Creates a client.
    ///
    /// # Arguments
    ///
    /// * `.api_key(String)`: **Required.** The OpenWeatherMap API key, sent as `appid`.
    /// * `.base_url(String)`: Optional. Defaults to [`DEFAULT_WEATHER_URL`].
    /// * `.units(Units)`: Optional. Defaults to [`Units::Metric`].
    /// * `.timeout(Duration)`: Optional. Whole-request timeout. Defaults to 10 seconds.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherDataError::ClientBuild`] if the HTTP client cannot be constructed.
    #[builder]
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        units: Option<Units>,
        timeout: Option<Duration>,
    ) -> Result<Self, WeatherDataError> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(WeatherDataError::ClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_WEATHER_URL.to_string()),
            api_key,
            units: units.unwrap_or_default(),
        })
    }

    pub fn units(&self) -> Units {
        self.units
    }
}

impl WeatherSource for OpenWeatherClient {
    async fn current_weather(&self, city: &str) -> Result<Value, WeatherDataError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("appid", self.api_key.as_str()),
                ("units", self.units.query_value()),
                ("q", city),
            ])
            .send()
            .await
            // The URL carries the API key, keep it out of error messages
            .map_err(|e| WeatherDataError::NetworkRequest(city.to_string(), e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            debug!("Weather API answered {} for {}", status, city);
        }

        let body = response
            .text()
            .await
            .map_err(|e| WeatherDataError::ResponseBody(city.to_string(), e.without_url()))?;

        serde_json::from_str(&body).map_err(|e| WeatherDataError::JsonParse {
            city: city.to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves a single HTTP response and hands back the raw request it received.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/data/2.5/weather", listener.local_addr().unwrap());
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
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (url, handle)
    }

    fn client_for(url: String, units: Units) -> OpenWeatherClient {
        OpenWeatherClient::builder()
            .api_key("test-key".to_string())
            .base_url(url)
            .units(units)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let client = OpenWeatherClient::builder()
            .api_key("k".to_string())
            .build()
            .unwrap();
        assert_eq!(client.base_url, DEFAULT_WEATHER_URL);
        assert_eq!(client.units(), Units::Metric);
    }

    #[tokio::test]
    async fn test_request_carries_query_parameters() {
        let (url, server) = serve_once("200 OK", r#"{"dt":1551776400}"#).await;
        let client = client_for(url, Units::Imperial);

        let body = client.current_weather("punta arenas").await.unwrap();
        assert_eq!(body["dt"], 1551776400);

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.starts_with("GET /data/2.5/weather?"));
        assert!(request_line.contains("appid=test-key"));
        assert!(request_line.contains("units=imperial"));
        assert!(request_line.contains("q=punta+arenas"));
    }

    #[tokio::test]
    async fn test_not_found_body_is_returned_not_raised() {
        let (url, server) =
            serve_once("404 Not Found", r#"{"cod":"404","message":"city not found"}"#).await;
        let client = client_for(url, Units::Metric);

        let body = client.current_weather("nowhere").await.unwrap();
        assert_eq!(body["message"], "city not found");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let (url, server) = serve_once("502 Bad Gateway", "<html>oops</html>").await;
        let client = client_for(url, Units::Metric);

        let result = client.current_weather("sydney").await;
        assert!(matches!(result, Err(WeatherDataError::JsonParse { .. })));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_failure_is_an_error() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let client = client_for(url, Units::Metric);
        let result = client.current_weather("sydney").await;
        match result {
            Err(WeatherDataError::NetworkRequest(city, e)) => {
                assert_eq!(city, "sydney");
                assert!(!e.to_string().contains("test-key"));
            }
            other => panic!("Expected NetworkRequest, got {:?}", other),
        }
    }
}

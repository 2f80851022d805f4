use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherDataError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for city '{0}'")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("Failed to read response body for city '{0}'")]
    ResponseBody(String, #[source] reqwest::Error),

    #[error("Response for city '{city}' is not valid JSON")]
    JsonParse {
        city: String,
        #[source]
        source: serde_json::Error,
    },
}

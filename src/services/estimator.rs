use crate::error::GasdeckError;
use crate::models::{GasEstimateSnapshot, TierEstimate};
use crate::units::{self, WEI_PER_GWEI};
use async_trait::async_trait;
use chrono::Utc;
use ethers::types::U256;
use moka::future::Cache;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

#[async_trait]
pub trait GasEstimator: Send + Sync {
    async fn fetch_estimates(&self) -> Result<GasEstimateSnapshot, GasdeckError>;
}

/// Wire shape of the public estimate feed. Prices are quoted in tenths of a
/// gwei and waits in minutes.
#[derive(Debug, Deserialize)]
struct EstimateFeedBody {
    #[serde(rename = "safeLow")]
    safe_low: f64,
    average: f64,
    fast: f64,
    #[serde(rename = "safeLowWait")]
    safe_low_wait: f64,
    #[serde(rename = "avgWait")]
    avg_wait: f64,
    #[serde(rename = "fastWait")]
    fast_wait: f64,
}

/// Fetches tier estimates over HTTP and caches the normalized snapshot for a
/// short TTL so rapid UI refreshes do not hammer the feed.
pub struct HttpGasEstimator {
    client: reqwest::Client,
    endpoint: String,
    cache: Cache<String, GasEstimateSnapshot>,
}

impl HttpGasEstimator {
    pub fn new(
        endpoint: impl Into<String>,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Self, GasdeckError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let cache = Cache::builder().max_capacity(8).time_to_live(ttl).build();
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            cache,
        })
    }

    fn normalize(body: EstimateFeedBody) -> Result<GasEstimateSnapshot, GasdeckError> {
        Ok(GasEstimateSnapshot {
            slow: tier_from_wire(body.safe_low, body.safe_low_wait)?,
            average: tier_from_wire(body.average, body.avg_wait)?,
            fast: tier_from_wire(body.fast, body.fast_wait)?,
            fetched_at: Utc::now(),
        })
    }
}

fn tier_from_wire(price_tenths_gwei: f64, wait_minutes: f64) -> Result<TierEstimate, GasdeckError> {
    if !price_tenths_gwei.is_finite() || price_tenths_gwei < 0.0 {
        return Err(GasdeckError::MalformedEstimate(format!(
            "price {price_tenths_gwei} out of range"
        )));
    }
    // Truncate to whole tenths of a gwei before scaling, matching how the
    // feed's own consumers read these values.
    let tenths = price_tenths_gwei.trunc() as u64;
    let price_wei = U256::from(tenths) * U256::from(WEI_PER_GWEI / 10);
    // The fallible conversion covers NaN and negative waits as well as
    // values past what a Duration can hold.
    let wait = Duration::try_from_secs_f64(wait_minutes * 60.0).map_err(|_| {
        GasdeckError::MalformedEstimate(format!("wait {wait_minutes} out of range"))
    })?;
    Ok(TierEstimate { price_wei, wait })
}

#[async_trait]
impl GasEstimator for HttpGasEstimator {
    async fn fetch_estimates(&self) -> Result<GasEstimateSnapshot, GasdeckError> {
        if let Some(cached) = self.cache.get(&self.endpoint).await {
            debug!("Returning cached gas estimates");
            return Ok(cached);
        }

        let body: EstimateFeedBody = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let snapshot = Self::normalize(body)?;
        self.cache
            .insert(self.endpoint.clone(), snapshot.clone())
            .await;

        info!(
            "Gas estimates: slow={} average={} fast={} gwei",
            units::format_gwei(snapshot.slow.price_wei),
            units::format_gwei(snapshot.average.price_wei),
            units::format_gwei(snapshot.fast.price_wei),
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_BODY: &str = r#"{
        "fast": 100.0,
        "fastest": 200.0,
        "safeLow": 20.0,
        "average": 50.0,
        "block_time": 13.5,
        "blockNum": 9000000,
        "speed": 0.7,
        "safeLowWait": 5.1,
        "avgWait": 1.4,
        "fastWait": 0.5
    }"#;

    fn estimator_for(server: &mockito::ServerGuard, ttl: Duration) -> HttpGasEstimator {
        HttpGasEstimator::new(
            format!("{}/json/ethgasAPI.json", server.url()),
            ttl,
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn parses_and_normalizes_feed_values() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/json/ethgasAPI.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(FEED_BODY)
            .create_async()
            .await;

        let estimator = estimator_for(&server, Duration::from_secs(60));
        let snapshot = estimator.fetch_estimates().await.unwrap();

        assert_eq!(snapshot.slow.price_wei, U256::from(2_000_000_000u64));
        assert_eq!(snapshot.average.price_wei, U256::from(5_000_000_000u64));
        assert_eq!(snapshot.fast.price_wei, U256::from(10_000_000_000u64));
        assert!((snapshot.average.wait.as_secs_f64() - 84.0).abs() < 0.01);
        assert!((snapshot.fast.wait.as_secs_f64() - 30.0).abs() < 0.01);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn second_fetch_within_ttl_is_served_from_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/json/ethgasAPI.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(FEED_BODY)
            .expect(1)
            .create_async()
            .await;

        let estimator = estimator_for(&server, Duration::from_secs(60));
        let first = estimator.fetch_estimates().await.unwrap();
        let second = estimator.fetch_estimates().await.unwrap();

        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/json/ethgasAPI.json")
            .with_status(503)
            .create_async()
            .await;

        let estimator = estimator_for(&server, Duration::from_secs(60));
        let err = estimator.fetch_estimates().await.unwrap_err();
        assert!(matches!(err, GasdeckError::Http(_)));
    }

    #[tokio::test]
    async fn negative_price_is_rejected_as_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/json/ethgasAPI.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"fast":100.0,"safeLow":-1.0,"average":50.0,
                    "safeLowWait":5.1,"avgWait":1.4,"fastWait":0.5}"#,
            )
            .create_async()
            .await;

        let estimator = estimator_for(&server, Duration::from_secs(60));
        let err = estimator.fetch_estimates().await.unwrap_err();
        assert!(matches!(err, GasdeckError::MalformedEstimate(_)));
    }

    #[tokio::test]
    async fn astronomical_wait_is_rejected_as_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/json/ethgasAPI.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"fast":100.0,"safeLow":20.0,"average":50.0,
                    "safeLowWait":5.1,"avgWait":1e300,"fastWait":0.5}"#,
            )
            .create_async()
            .await;

        let estimator = estimator_for(&server, Duration::from_secs(60));
        let err = estimator.fetch_estimates().await.unwrap_err();
        assert!(matches!(err, GasdeckError::MalformedEstimate(_)));
    }

    #[test]
    fn wire_prices_truncate_to_whole_tenths() {
        let tier = tier_from_wire(45.7, 1.0).unwrap();
        assert_eq!(tier.price_wei, U256::from(4_500_000_000u64));
    }

    #[test]
    fn waits_outside_duration_range_are_malformed() {
        assert!(matches!(
            tier_from_wire(50.0, f64::MAX),
            Err(GasdeckError::MalformedEstimate(_))
        ));
        assert!(matches!(
            tier_from_wire(50.0, -1.0),
            Err(GasdeckError::MalformedEstimate(_))
        ));
        assert!(matches!(
            tier_from_wire(50.0, f64::NAN),
            Err(GasdeckError::MalformedEstimate(_))
        ));
    }
}

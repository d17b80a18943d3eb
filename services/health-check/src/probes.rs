//! Probes for the dependencies a deployment waits on.
//!
//! Every probe folds "not reachable yet" into `Ok(false)`. Only configuration problems
//! (a URL that cannot be parsed, a probe compiled out of this build) are returned as errors.

use async_trait::async_trait;
use mlops_resilience::{Probe, ProbeError};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// `GET` against a liveness endpoint; healthy only on `200 OK`.
pub struct HttpProbe {
    target: String,
    url: reqwest::Url,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(target: impl Into<String>, url: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let url = reqwest::Url::parse(url).map_err(|e| ProbeError::Config(format!("invalid url '{url}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;
        Ok(Self { target: target.into(), url, client })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn target(&self) -> &str { &self.target }

    async fn check(&self) -> Result<bool, ProbeError> {
        match self.client.get(self.url.clone()).send().await {
            Ok(resp) => Ok(resp.status() == reqwest::StatusCode::OK),
            Err(e) => {
                debug!(url = %self.url, error = %e, "http probe unreachable");
                Ok(false)
            }
        }
    }
}

/// Opens and closes one Postgres connection.
pub struct PostgresProbe {
    target: String,
    url: String,
    timeout: Duration,
}

impl PostgresProbe {
    pub fn new(target: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        Self { target: target.into(), url: url.into(), timeout }
    }
}

#[async_trait]
impl Probe for PostgresProbe {
    fn target(&self) -> &str { &self.target }

    async fn check(&self) -> Result<bool, ProbeError> { self.connect().await }
}

#[cfg(feature = "postgres")]
impl PostgresProbe {
    async fn connect(&self) -> Result<bool, ProbeError> {
        use sqlx::Connection;
        use std::str::FromStr;

        let options = sqlx::postgres::PgConnectOptions::from_str(&self.url)
            .map_err(|e| ProbeError::Config(format!("invalid database url: {e}")))?;
        match tokio::time::timeout(self.timeout, sqlx::PgConnection::connect_with(&options)).await {
            Ok(Ok(conn)) => {
                if let Err(e) = conn.close().await {
                    debug!(error = %e, "postgres probe close failed");
                }
                Ok(true)
            }
            Ok(Err(e)) => {
                debug!(error = %e, "postgres probe connect failed");
                Ok(false)
            }
            Err(_) => Ok(false),
        }
    }
}

#[cfg(not(feature = "postgres"))]
impl PostgresProbe {
    async fn connect(&self) -> Result<bool, ProbeError> {
        Err(ProbeError::Unsupported("database probe requires the 'postgres' feature".into()))
    }
}

/// Sends `PING` and expects `PONG`.
pub struct RedisProbe {
    target: String,
    url: String,
    timeout: Duration,
}

impl RedisProbe {
    pub fn new(target: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        Self { target: target.into(), url: url.into(), timeout }
    }
}

#[async_trait]
impl Probe for RedisProbe {
    fn target(&self) -> &str { &self.target }

    async fn check(&self) -> Result<bool, ProbeError> { self.ping().await }
}

#[cfg(feature = "redis")]
impl RedisProbe {
    async fn ping(&self) -> Result<bool, ProbeError> {
        let client = redis::Client::open(self.url.as_str())
            .map_err(|e| ProbeError::Config(format!("invalid redis url: {e}")))?;
        let ping = async {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(pong)
        };
        match tokio::time::timeout(self.timeout, ping).await {
            Ok(Ok(pong)) => Ok(pong == "PONG"),
            Ok(Err(e)) => {
                debug!(error = %e, "redis probe failed");
                Ok(false)
            }
            Err(_) => Ok(false),
        }
    }
}

#[cfg(not(feature = "redis"))]
impl RedisProbe {
    async fn ping(&self) -> Result<bool, ProbeError> {
        Err(ProbeError::Unsupported("cache probe requires the 'redis' feature".into()))
    }
}

/// Healthy when every required file exists under `dir`.
pub struct ArtifactProbe {
    target: String,
    dir: PathBuf,
    required: Vec<String>,
}

impl ArtifactProbe {
    pub fn new(target: impl Into<String>, dir: impl Into<PathBuf>, required: Vec<String>) -> Self {
        Self { target: target.into(), dir: dir.into(), required }
    }
}

#[async_trait]
impl Probe for ArtifactProbe {
    fn target(&self) -> &str { &self.target }

    async fn check(&self) -> Result<bool, ProbeError> {
        if self.required.is_empty() {
            return Err(ProbeError::Config("no required artifacts configured".into()));
        }
        for name in &self.required {
            let path = self.dir.join(name);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!(path = %path.display(), "artifact missing");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

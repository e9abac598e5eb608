//! InfluxDB 1.x HTTP 싱크
//!
//! - `prepare`: `SHOW DATABASES`로 대상 데이터베이스를 확인하고 없으면 `CREATE DATABASE`
//! - `write_points`: line protocol을 `/write?db=<db>&precision=s`로 POST
//!
//! 전송 자체가 실패하면 [`StorageError::Connection`](치명적),
//! 서버가 2xx 이외의 상태로 응답하면 [`StorageError::Rejected`]입니다.

use std::time::Duration;

use diagflux_core::config::InfluxConfig;
use diagflux_core::error::{DiagfluxError, StorageError};
use diagflux_core::pipeline::PointSink;
use diagflux_core::types::OutputRecord;
use tracing::{debug, info};

use crate::error::ImportError;

/// InfluxDB HTTP 싱크
pub struct InfluxSink {
    client: reqwest::Client,
    base_url: String,
    database: String,
    credentials: Option<(String, String)>,
}

impl InfluxSink {
    /// 설정으로 싱크를 생성합니다. 연결은 `prepare`에서 처음 시도합니다.
    pub fn new(config: &InfluxConfig) -> Result<Self, ImportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ImportError::Sink {
                sink: "influx".to_owned(),
                source: StorageError::Connection(format!("building HTTP client: {e}")).into(),
            })?;

        let credentials = if config.username.is_empty() {
            None
        } else {
            Some((config.username.clone(), config.password.clone()))
        };

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_owned(),
            database: config.database.clone(),
            credentials,
        })
    }

    /// 대상 데이터베이스 이름
    pub fn database(&self) -> &str {
        &self.database
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }

    /// `/query` 엔드포인트로 InfluxQL을 실행하고 JSON 응답을 반환합니다.
    async fn query(&self, statement: &str) -> Result<serde_json::Value, DiagfluxError> {
        let request = self
            .client
            .post(self.endpoint("query"))
            .form(&[("q", statement)]);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if !status.is_success() {
            return Err(StorageError::Query(format!("{statement}: status {status}: {body}")).into());
        }

        serde_json::from_str(&body)
            .map_err(|e| StorageError::Query(format!("{statement}: invalid response: {e}")).into())
    }
}

/// `SHOW DATABASES` 응답에서 데이터베이스 이름을 추출합니다.
///
/// ```text
/// {"results":[{"series":[{"name":"databases","columns":["name"],"values":[["_internal"],["x"]]}]}]}
/// ```
pub fn database_names(response: &serde_json::Value) -> Vec<String> {
    response["results"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|result| result["series"].as_array())
        .flatten()
        .filter_map(|series| series["values"].as_array())
        .flatten()
        .filter_map(|row| row.get(0).and_then(serde_json::Value::as_str))
        .map(str::to_owned)
        .collect()
}

/// 레코드 배치를 line protocol 본문으로 직렬화합니다.
pub fn encode_batch(records: &[OutputRecord]) -> String {
    records
        .iter()
        .map(OutputRecord::to_line_protocol)
        .collect::<Vec<_>>()
        .join("\n")
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

impl PointSink for InfluxSink {
    fn name(&self) -> &str {
        "influx"
    }

    async fn prepare(&mut self) -> Result<(), DiagfluxError> {
        let response = self.query("SHOW DATABASES").await?;
        let existing = database_names(&response);

        if existing.iter().any(|name| name == &self.database) {
            debug!(database = %self.database, "database exists");
        } else {
            let statement = format!("CREATE DATABASE {}", quote_identifier(&self.database));
            self.query(&statement).await?;
            info!(database = %self.database, "database created");
        }
        Ok(())
    }

    async fn write_points(&mut self, records: &[OutputRecord]) -> Result<(), DiagfluxError> {
        let request = self
            .client
            .post(self.endpoint("write"))
            .query(&[("db", self.database.as_str()), ("precision", "s")])
            .body(encode_batch(records));
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            // 연결 재사용을 위해 본문을 비웁니다.
            let _ = response.bytes().await;
            return Ok(());
        }

        let reason = response.text().await.unwrap_or_default();
        Err(StorageError::Rejected {
            status: status.as_u16(),
            reason: reason.trim().to_owned(),
        }
        .into())
    }

    async fn close(&mut self) -> Result<(), DiagfluxError> {
        debug!(database = %self.database, "influx sink closed");
        Ok(())
    }
}

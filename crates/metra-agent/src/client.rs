use metra_common::model::InvalidMetric;
use metra_common::retry::{retry, RetriesExhausted, RetryPolicy};
use metra_common::{codec, sign, Metric};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// One failed delivery attempt; retried up to the policy's budget.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The metric violates the kind invariant; rejected locally, never
    /// sent.
    #[error("invalid metric: {0}")]
    Invalid(#[from] InvalidMetric),

    #[error("failed to serialize batch: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Terminal failure naming the last underlying cause.
    #[error(transparent)]
    RetriesExhausted(#[from] RetriesExhausted<AttemptError>),
}

/// Transmits metric batches to the collector server.
///
/// Holds no mutable state across calls; safe to share between delivery
/// workers behind an `Arc`.
pub struct DeliveryClient {
    http: reqwest::Client,
    base_url: String,
    sign_key: Option<String>,
    gzip: bool,
    retry: RetryPolicy,
}

impl DeliveryClient {
    pub fn new(
        base_url: String,
        sign_key: Option<String>,
        gzip: bool,
        retry: RetryPolicy,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            sign_key,
            gzip,
            retry,
        })
    }

    /// Sends a whole batch as one `POST /updates`.
    pub async fn send_batch(&self, batch: &[Metric]) -> Result<(), DeliveryError> {
        for metric in batch {
            metric.validate()?;
        }
        let body = serde_json::to_vec(batch)?;
        self.post("/updates", body).await
    }

    /// Sends a single metric as `POST /update`.
    pub async fn send_one(&self, metric: &Metric) -> Result<(), DeliveryError> {
        metric.validate()?;
        let body = serde_json::to_vec(metric)?;
        self.post("/update", body).await
    }

    async fn post(&self, path: &str, body: Vec<u8>) -> Result<(), DeliveryError> {
        let url = format!("{}{}", self.base_url, path);
        // The signature covers the serialized bytes before compression.
        let signature = self.sign_key.as_deref().map(|key| sign::sign(&body, key));
        let payload = if self.gzip {
            codec::compress(&body)
        } else {
            body
        };

        retry(&self.retry, || {
            let mut request = self
                .http
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload.clone());
            if let Some(signature) = &signature {
                request = request.header(sign::SIGNATURE_HEADER, signature.as_str());
            }
            if self.gzip {
                request = request.header(CONTENT_ENCODING, "gzip");
            }

            async move {
                let response = request.send().await.map_err(AttemptError::Transport)?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AttemptError::Status { status, body });
                }
                Ok(())
            }
        })
        .await?;

        Ok(())
    }
}

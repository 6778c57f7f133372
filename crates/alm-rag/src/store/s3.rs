//! S3-compatible object store (MinIO) using path-style requests.
//!
//! Requests are signed with AWS Signature V4 computed locally with `hmac`
//! and `sha2`; no AWS SDK is involved.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use alm_types::StorageSettings;

use super::{ObjectStore, StoreError};

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 of the empty body; every request here is bodiless.
const EMPTY_PAYLOAD_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Connection settings for an [`S3ObjectStore`].
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint URL including scheme, e.g. `http://minio:9000`
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: SecretString,
    pub timeout: Duration,
}

impl S3Config {
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            region: region.into(),
            access_key: access_key.into(),
            secret_key: SecretString::from(secret_key.into()),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_settings(storage: &StorageSettings) -> Result<Self, StoreError> {
        let access_key = storage
            .access_key
            .clone()
            .ok_or_else(|| StoreError::Config("storage.access_key is not set".to_string()))?;
        let secret_key = storage
            .secret_key
            .clone()
            .ok_or_else(|| StoreError::Config("storage.secret_key is not set".to_string()))?;
        Ok(Self::new(&storage.endpoint, &storage.region, access_key, secret_key))
    }

    /// `host[:port]` as it appears in the signed `host` header.
    fn host(&self) -> String {
        self.endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string()
    }
}

/// Read-only S3 client for the index bucket.
pub struct S3ObjectStore {
    client: Client,
    config: S3Config,
    host: String,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;
        let host = config.host();
        Ok(Self {
            client,
            config,
            host,
        })
    }

    fn signed_request(&self, method: Method, bucket: &str, key: Option<&str>) -> Result<RequestBuilder, StoreError> {
        let canonical_uri = canonical_path(bucket, key);
        let url = format!("{}{}", self.config.endpoint, canonical_uri);

        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        // Header names are already in sorted order.
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            self.host, EMPTY_PAYLOAD_SHA256, amz_date
        );
        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method.as_str(),
            canonical_uri,
            canonical_headers,
            signed_headers,
            EMPTY_PAYLOAD_SHA256
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            self.config.secret_key.expose_secret(),
            &date_stamp,
            &self.config.region,
            "s3",
        )?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.config.access_key, credential_scope, signed_headers, signature
        );

        Ok(self
            .client
            .request(method, url)
            .header("Authorization", authorization)
            .header("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256)
            .header("x-amz-date", amz_date))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Response, StoreError> {
        let resp = self
            .signed_request(Method::GET, bucket, Some(key))?
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("GET {bucket}/{key}: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            let body = resp.text().await.unwrap_or_default();
            return Err(not_found_error(&body, bucket, key));
        }
        Err(StoreError::Transport(format!(
            "GET {bucket}/{key} returned HTTP {status}"
        )))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        let resp = self
            .signed_request(Method::HEAD, bucket, None)?
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("HEAD {bucket}: {e}")))?;

        match resp.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StoreError::Transport(format!(
                "HEAD {bucket} returned HTTP {status}"
            ))),
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let resp = self.get(bucket, key).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(format!("reading {bucket}/{key}: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn download_to(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64, StoreError> {
        let mut resp = self.get(bucket, key).await?;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| StoreError::Transport(format!("reading {bucket}/{key}: {e}")))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!(bucket, key, bytes = written, "Downloaded object");
        Ok(written)
    }
}

/// `/<bucket>` or `/<bucket>/<encoded key>`.
fn canonical_path(bucket: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => {
            let encoded = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
            format!("/{}/{}", uri_encode(bucket), encoded)
        }
        None => format!("/{}", uri_encode(bucket)),
    }
}

/// Pick the not-found kind from an S3 error document.
fn not_found_error(body: &str, bucket: &str, key: &str) -> StoreError {
    if body.contains("<Code>NoSuchBucket</Code>") {
        StoreError::NoSuchBucket(bucket.to_string())
    } else {
        StoreError::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StoreError::Config(format!("invalid signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// kSigning = HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")
fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, StoreError> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// RFC 3986 encoding of everything except `A-Z a-z 0-9 - _ . ~`.
fn uri_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => result.push_str(&format!("%{byte:02X}")),
        }
    }
    result
}

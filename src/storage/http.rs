//! Object-storage medium spoken over plain HTTP: GET to read, PUT to
//! overwrite, HEAD to probe. Works against GCS/S3-style object URLs.

use super::medium::Medium;
use crate::core::MediumError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

pub const DEFAULT_ACCESS_TIMEOUT: Duration = Duration::from_secs(10);

/// One object in a remote bucket.
///
/// The `Client` is passed in so a process can share one connection pool
/// between the user and activity stores.
#[derive(Debug, Clone)]
pub struct HttpMedium {
    client: Client,
    url: String,
    timeout: Duration,
    bearer_token: Option<String>,
}

impl HttpMedium {
    pub fn new(client: Client, base_url: &str, object: &str) -> Self {
        Self {
            client,
            url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                object.trim_start_matches('/')
            ),
            timeout: DEFAULT_ACCESS_TIMEOUT,
            bearer_token: None,
        }
    }

    /// Upper bound for each whole read, write, or probe.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let builder = self.client.request(method, &self.url).timeout(self.timeout);
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn http_error(&self, source: reqwest::Error) -> MediumError {
        if source.is_timeout() {
            MediumError::Timeout(self.timeout)
        } else {
            MediumError::Http {
                url: self.url.clone(),
                source,
            }
        }
    }

    fn status_error(&self, status: StatusCode) -> MediumError {
        MediumError::Status {
            url: self.url.clone(),
            status: status.as_u16(),
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, MediumError> {
        builder.send().await.map_err(|err| self.http_error(err))
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, MediumError>
    where
        F: Future<Output = Result<T, MediumError>>,
    {
        timeout(self.timeout, operation)
            .await
            .map_err(|_| MediumError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl Medium for HttpMedium {
    async fn read(&self) -> Result<Vec<u8>, MediumError> {
        self.bounded(async {
            let response = self.send(self.request(Method::GET)).await?;
            if !response.status().is_success() {
                return Err(self.status_error(response.status()));
            }
            let body = response.bytes().await.map_err(|err| self.http_error(err))?;
            Ok(body.to_vec())
        })
        .await
    }

    async fn write(&self, bytes: Vec<u8>) -> Result<(), MediumError> {
        self.bounded(async {
            let request = self
                .request(Method::PUT)
                .header(CONTENT_TYPE, "application/json")
                .body(bytes);
            let response = self.send(request).await?;
            if !response.status().is_success() {
                return Err(self.status_error(response.status()));
            }
            Ok(())
        })
        .await
    }

    async fn exists(&self) -> Result<bool, MediumError> {
        self.bounded(async {
            let response = self.send(self.request(Method::HEAD)).await?;
            match response.status() {
                status if status.is_success() => Ok(true),
                StatusCode::NOT_FOUND => Ok(false),
                status => Err(self.status_error(status)),
            }
        })
        .await
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_joins_base_and_object() {
        let medium = HttpMedium::new(
            Client::new(),
            "https://storage.example.com/goki-db/",
            "/userDB.json",
        );
        assert_eq!(medium.url(), "https://storage.example.com/goki-db/userDB.json");
        assert_eq!(medium.describe(), medium.url());
    }

    #[test]
    fn test_default_timeout() {
        let medium =
            HttpMedium::new(Client::new(), "http://localhost:9000/bucket", "activityDB.json")
                .with_timeout(Duration::from_millis(250));
        assert_eq!(medium.timeout, Duration::from_millis(250));
        assert_eq!(
            HttpMedium::new(Client::new(), "http://localhost:9000/bucket", "a.json").timeout,
            DEFAULT_ACCESS_TIMEOUT
        );
    }
}

//! Pazpar2 HTTP broker implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::BrokerConfig;

use super::{Broker, RawResponse, ShowParams, TransportError};

/// Speaks the Pazpar2 `search.pz2?command=...` protocol over HTTP.
pub struct Pazpar2Broker {
    client: Client,
    config: BrokerConfig,
}

impl Pazpar2Broker {
    /// Create a new broker transport with the given configuration.
    pub fn new(config: BrokerConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Build the URL for one command.
    fn build_url(&self, command: &str, params: &[(&str, &str)]) -> String {
        let base = self.config.url.trim_end_matches('/');
        let separator = if base.contains('?') { '&' } else { '?' };

        let mut url = format!("{}{}command={}", base, separator, command);
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
        url
    }

    async fn get(&self, command: &str, params: &[(&str, &str)]) -> Result<RawResponse, TransportError> {
        let url = self.build_url(command, params);
        debug!(command = command, "Pazpar2 request");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else if e.is_connect() {
                TransportError::ConnectionFailed(e.to_string())
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        // Pazpar2 reports protocol errors as an <error> body with a 4xx status,
        // so those are handed back like any other body.
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Broker for Pazpar2Broker {
    fn name(&self) -> &str {
        "pazpar2"
    }

    async fn create_session(&self) -> Result<RawResponse, TransportError> {
        match &self.config.service {
            Some(service) => self.get("init", &[("service", service.as_str())]).await,
            None => self.get("init", &[]).await,
        }
    }

    async fn ping(&self, session: &str) -> Result<RawResponse, TransportError> {
        self.get("ping", &[("session", session)]).await
    }

    async fn start_search(
        &self,
        session: &str,
        query: &str,
        filter: Option<&str>,
    ) -> Result<RawResponse, TransportError> {
        let mut params = vec![("session", session), ("query", query)];
        if let Some(filter) = filter {
            params.push(("filter", filter));
        }
        self.get("search", &params).await
    }

    async fn poll_stat(&self, session: &str) -> Result<RawResponse, TransportError> {
        self.get("stat", &[("session", session)]).await
    }

    async fn poll_show(
        &self,
        session: &str,
        params: &ShowParams,
    ) -> Result<RawResponse, TransportError> {
        let start = params.start.to_string();
        let num = params.num.to_string();
        let sort = params.sort.to_param();
        self.get(
            "show",
            &[
                ("session", session),
                ("start", start.as_str()),
                ("num", num.as_str()),
                ("sort", sort.as_str()),
            ],
        )
        .await
    }

    async fn poll_termlist(
        &self,
        session: &str,
        facet_names: &[String],
    ) -> Result<RawResponse, TransportError> {
        let names = facet_names.join(",");
        self.get("termlist", &[("session", session), ("name", names.as_str())])
            .await
    }

    async fn fetch_record(
        &self,
        session: &str,
        recid: &str,
        offset: Option<usize>,
    ) -> Result<RawResponse, TransportError> {
        match offset {
            Some(offset) => {
                let offset = offset.to_string();
                self.get(
                    "record",
                    &[("session", session), ("id", recid), ("offset", offset.as_str())],
                )
                .await
            }
            None => {
                self.get("record", &[("session", session), ("id", recid)])
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker(url: &str) -> Pazpar2Broker {
        Pazpar2Broker::new(BrokerConfig {
            url: url.to_string(),
            timeout_secs: 5,
            service: None,
        })
        .unwrap()
    }

    #[test]
    fn test_build_url() {
        let broker = broker("http://localhost:9004/search.pz2");
        let url = broker.build_url("search", &[("session", "123"), ("query", "ti=saint louis")]);
        assert_eq!(
            url,
            "http://localhost:9004/search.pz2?command=search&session=123&query=ti%3Dsaint%20louis"
        );
    }

    #[test]
    fn test_build_url_trailing_slash_and_existing_query() {
        let url = broker("http://localhost:9004/search.pz2/").build_url("init", &[]);
        assert_eq!(url, "http://localhost:9004/search.pz2?command=init");

        let url = broker("http://proxy/pz2?realm=x").build_url("ping", &[("session", "7")]);
        assert_eq!(url, "http://proxy/pz2?realm=x&command=ping&session=7");
    }

    #[test]
    fn test_build_url_encodes_sort_and_names() {
        let broker = broker("http://localhost:9004/search.pz2");
        let url = broker.build_url("termlist", &[("name", "author,subject")]);
        assert!(url.ends_with("name=author%2Csubject"));

        let url = broker.build_url("show", &[("sort", "relevance:0")]);
        assert!(url.ends_with("sort=relevance%3A0"));
    }
}

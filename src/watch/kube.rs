// src/watch/kube.rs

//! Kubernetes API implementation of the watch traits.
//!
//! - Listing a collection returns `metadata.resourceVersion` from the list
//!   envelope.
//! - Watching issues `?watch=true&resourceVersion=<v>` and decodes the
//!   newline-delimited JSON body into [`WatchEvent`]s.
//! - An expired resource version arrives either as an HTTP 410 on connect or
//!   as an `ERROR` event whose `Status.code` is 410. Both become
//!   `PipewatchError::Stale`.

use futures::{Stream, StreamExt};
use reqwest::{Certificate, Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::ClusterSection;
use crate::errors::{PipewatchError, Result};
use crate::watch::event::WatchEvent;
use crate::watch::source::{
    EventSource, EventStream, ResourceRef, ResourceVersionTracker, WatchFuture,
};

const GONE: u16 = 410;

#[derive(Debug, Clone)]
pub struct KubeWatchSource {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl KubeWatchSource {
    /// Build a source from the `[cluster]` config section.
    ///
    /// No request timeout is set: watch responses stay open for as long as
    /// the API server keeps them. `ca_cert` and `token_file` are read once,
    /// here; an inline `token` wins over `token_file`.
    pub fn new(config: &ClusterSection) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path)?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
            debug!(ca_cert = %path.display(), "trusting cluster CA");
        }

        let token = match (&config.token, &config.token_file) {
            (Some(token), _) => Some(token.clone()),
            (None, Some(path)) => Some(std::fs::read_to_string(path)?.trim().to_string()),
            (None, None) => None,
        };

        Ok(Self {
            client: builder.build()?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, resource: &ResourceRef) -> String {
        format!("{}/{}", self.api_url, resource.collection_path())
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

impl ResourceVersionTracker for KubeWatchSource {
    fn list_resource_version<'a>(&'a self, resource: &'a ResourceRef) -> WatchFuture<'a, String> {
        Box::pin(async move {
            let response = self
                .authorized(self.client.get(self.url(resource)))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(PipewatchError::Engine {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: Value = response.json().await?;
            resource_version_of_list(&body)
        })
    }
}

impl EventSource for KubeWatchSource {
    fn watch<'a>(
        &'a self,
        resource: &'a ResourceRef,
        resource_version: &'a str,
    ) -> WatchFuture<'a, EventStream> {
        Box::pin(async move {
            let req = self.client.get(self.url(resource)).query(&[
                ("watch", "true"),
                ("resourceVersion", resource_version),
                ("allowWatchBookmarks", "true"),
            ]);
            let response = self.authorized(req).send().await?;

            let status = response.status();
            if status == StatusCode::GONE {
                return Err(PipewatchError::Stale(format!(
                    "resource version {resource_version} is too old"
                )));
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(PipewatchError::Engine {
                    status: status.as_u16(),
                    message,
                });
            }

            debug!(resource_version, "watch stream opened");

            Ok(watch_events(response.bytes_stream()))
        })
    }
}

/// Split a watch response body into events.
///
/// Lines may span chunks and a chunk may hold several lines. Blank lines are
/// keep-alives and are dropped. A final line without a trailing newline is
/// still decoded. A body error is yielded as-is and does not end the stream
/// on its own.
pub fn watch_events<B, C, E>(body: B) -> EventStream
where
    B: Stream<Item = std::result::Result<C, E>> + Send + 'static,
    C: AsRef<[u8]> + Send + 'static,
    E: Into<PipewatchError> + Send + 'static,
{
    let events = futures::stream::unfold(
        (Box::pin(body), Vec::<u8>::new()),
        |(mut body, mut buf)| async move {
            loop {
                if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Some((decode_watch_line(&line), (body, buf)));
                }

                match body.next().await {
                    Some(Ok(chunk)) => buf.extend_from_slice(chunk.as_ref()),
                    Some(Err(err)) => return Some((Err(err.into()), (body, buf))),
                    None => {
                        if buf.iter().all(u8::is_ascii_whitespace) {
                            return None;
                        }
                        let line = std::mem::take(&mut buf);
                        return Some((decode_watch_line(&line), (body, buf)));
                    }
                }
            }
        },
    );

    Box::pin(events)
}

/// Extract the version token from a list response envelope.
pub fn resource_version_of_list(body: &Value) -> Result<String> {
    body.pointer("/metadata/resourceVersion")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            PipewatchError::Malformed("list response has no metadata.resourceVersion".to_string())
        })
}

/// Decode one line of a watch response.
pub fn decode_watch_line(line: &[u8]) -> Result<WatchEvent> {
    let value: Value = serde_json::from_slice(line)?;

    if value.get("type").and_then(Value::as_str) == Some("ERROR") {
        let object = value.get("object").cloned().unwrap_or(Value::Null);
        let code = object.get("code").and_then(Value::as_u64).unwrap_or(0);
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if code == u64::from(GONE) {
            return Err(PipewatchError::Stale(message));
        }
        return Err(PipewatchError::Engine {
            status: u16::try_from(code).unwrap_or(0),
            message,
        });
    }

    Ok(serde_json::from_value(value)?)
}

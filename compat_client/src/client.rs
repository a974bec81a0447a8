use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use compat_auth::{BearerToken, TokenManager};
use reqwest::{IntoUrl, Method, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};
use url::Url;

use crate::{CatalogApi, Error, Result, VersionInfo};

/// Base URLs of the metadata and blob-store services that host a set of catalogs
///
/// The catalog HRN and resource path are appended as path segments, e.g.
/// `<metadata_url>/<catalog_hrn>/versions/latest`.
#[derive(Debug, Clone)]
pub struct CatalogEndpoints {
    metadata_url: Url,
    blobstore_url: Url,
}

impl CatalogEndpoints {
    pub fn new<M: IntoUrl, B: IntoUrl>(metadata_url: M, blobstore_url: B) -> Result<Self> {
        let metadata_url = metadata_url.into_url().map_err(Error::BaseUrl)?;
        let blobstore_url = blobstore_url.into_url().map_err(Error::BaseUrl)?;
        Ok(Self {
            metadata_url,
            blobstore_url,
        })
    }

    pub fn metadata_url(&self) -> &Url {
        &self.metadata_url
    }

    pub fn blobstore_url(&self) -> &Url {
        &self.blobstore_url
    }
}

/// Build `<base>/<catalog_hrn>/<path...>`, encoding each segment on its own
fn catalog_url(base: &Url, catalog_hrn: &str, path: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::CannotBeABase(base.to_string()))?
        .pop_if_empty()
        .push(catalog_hrn)
        .extend(path);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: i64,
}

#[derive(Debug, Deserialize)]
struct VersionsResponse {
    versions: Vec<VersionInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayerVersionsResponse {
    layer_versions: Vec<LayerVersion>,
}

#[derive(Debug, Deserialize)]
struct LayerVersion {
    layer: String,
    version: i64,
}

#[derive(Debug, Deserialize)]
struct PartitionsResponse {
    partitions: Vec<PartitionRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionRef {
    #[serde(default)]
    layer: Option<String>,
    data_handle: String,
}

/// HTTP implementation of [`CatalogApi`]
///
/// The client holds no per-catalog state; one instance serves every catalog hosted behind the
/// same [`CatalogEndpoints`].
#[derive(Debug, Clone)]
pub struct CatalogClient {
    endpoints: CatalogEndpoints,
    tokens: Arc<TokenManager>,
    http_client: reqwest::Client,
}

impl CatalogClient {
    pub fn new(endpoints: CatalogEndpoints, tokens: Arc<TokenManager>) -> Self {
        Self {
            endpoints,
            tokens,
            http_client: reqwest::Client::new(),
        }
    }

    async fn send_get(&self, url: &Url, token: &BearerToken) -> Result<Response> {
        self.http_client
            .get(url.clone())
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|source| Error::RequestSend {
                method: Method::GET,
                url: url.to_string(),
                source,
            })
    }

    /// Issue a `GET` with the current token, retrying once with a fresh token on `401`
    ///
    /// Anything but `200` after that single retry is an [`Error::Upstream`].
    async fn get_with_token_refresh(&self, catalog_hrn: &str, url: Url) -> Result<Response> {
        let token = self.tokens.get_token().await?;
        let mut resp = self.send_get(&url, &token).await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!(catalog_hrn, %url, "bearer token rejected, refreshing and retrying once");
            self.tokens.invalidate_rejected(&token).await;
            let token = self.tokens.get_token().await?;
            resp = self.send_get(&url, &token).await?;
        }

        match resp.status() {
            StatusCode::OK => Ok(resp),
            status => Err(Error::Upstream {
                catalog_hrn: catalog_hrn.to_string(),
                status,
                body: resp.text().await.map_err(Error::Text)?,
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, catalog_hrn: &str, url: Url) -> Result<T> {
        let url_str = url.to_string();
        self.get_with_token_refresh(catalog_hrn, url)
            .await?
            .json()
            .await
            .map_err(|source| Error::Json {
                url: url_str,
                source,
            })
    }

    /// Like [`get_json`](Self::get_json), for resources addressed by layer name: a `404` means
    /// the catalog has no such layer
    async fn get_layer_json<T: DeserializeOwned>(
        &self,
        catalog_hrn: &str,
        layer: &str,
        url: Url,
    ) -> Result<T> {
        self.get_json(catalog_hrn, url).await.map_err(|e| match e {
            Error::Upstream {
                status: StatusCode::NOT_FOUND,
                ..
            } => Error::LayerNotFound {
                catalog_hrn: catalog_hrn.to_string(),
                layer: layer.to_string(),
            },
            e => e,
        })
    }

    fn metadata_url(&self, catalog_hrn: &str, path: &[&str]) -> Result<Url> {
        catalog_url(&self.endpoints.metadata_url, catalog_hrn, path)
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn latest_version(&self, catalog_hrn: &str) -> Result<i64> {
        let mut url = self.metadata_url(catalog_hrn, &["versions", "latest"])?;
        url.query_pairs_mut().append_pair("startVersion", "0");
        let resp: VersionResponse = self.get_json(catalog_hrn, url).await?;
        debug!(catalog_hrn, version = resp.version, "fetched latest catalog version");
        Ok(resp.version)
    }

    async fn minimum_version(&self, catalog_hrn: &str) -> Result<i64> {
        let url = self.metadata_url(catalog_hrn, &["versions", "minimum"])?;
        let resp: VersionResponse = self.get_json(catalog_hrn, url).await?;
        Ok(resp.version)
    }

    async fn versions(
        &self,
        catalog_hrn: &str,
        start_version: i64,
        end_version: i64,
    ) -> Result<Vec<VersionInfo>> {
        let mut url = self.metadata_url(catalog_hrn, &["versions"])?;
        url.query_pairs_mut()
            .append_pair("startVersion", &start_version.to_string())
            .append_pair("endVersion", &end_version.to_string())
            // annotates every version with the catalogs it was built from
            .append_pair("context", "super");
        let resp: VersionsResponse = self.get_json(catalog_hrn, url).await?;
        debug!(
            catalog_hrn,
            start_version,
            end_version,
            count = resp.versions.len(),
            "fetched catalog version range"
        );
        Ok(resp.versions)
    }

    async fn layer_version(
        &self,
        catalog_hrn: &str,
        catalog_version: i64,
        layer: &str,
    ) -> Result<i64> {
        let mut url = self.metadata_url(catalog_hrn, &["layerVersions"])?;
        url.query_pairs_mut()
            .append_pair("version", &catalog_version.to_string());
        let resp: LayerVersionsResponse = self.get_layer_json(catalog_hrn, layer, url).await?;
        resp.layer_versions
            .into_iter()
            .find(|lv| lv.layer == layer)
            .map(|lv| lv.version)
            .ok_or_else(|| Error::LayerNotFound {
                catalog_hrn: catalog_hrn.to_string(),
                layer: layer.to_string(),
            })
    }

    async fn data_handle(
        &self,
        catalog_hrn: &str,
        layer_version: i64,
        layer: &str,
    ) -> Result<String> {
        let mut url = self.metadata_url(catalog_hrn, &["layers", layer, "partitions"])?;
        url.query_pairs_mut()
            .append_pair("version", &layer_version.to_string());
        let resp: PartitionsResponse = self.get_layer_json(catalog_hrn, layer, url).await?;
        resp.partitions
            .into_iter()
            .find(|p| p.layer.as_deref() == Some(layer))
            .map(|p| p.data_handle)
            .ok_or_else(|| Error::LayerNotFound {
                catalog_hrn: catalog_hrn.to_string(),
                layer: layer.to_string(),
            })
    }

    async fn partition_bytes(
        &self,
        catalog_hrn: &str,
        layer: &str,
        data_handle: &str,
    ) -> Result<Bytes> {
        let url = catalog_url(
            &self.endpoints.blobstore_url,
            catalog_hrn,
            &["layers", layer, "data", data_handle],
        )?;
        let bytes = self
            .get_with_token_refresh(catalog_hrn, url)
            .await?
            .bytes()
            .await
            .map_err(Error::Bytes)?;
        debug!(catalog_hrn, layer, len = bytes.len(), "downloaded partition");
        Ok(bytes)
    }
}

use std::fs::File;
use std::io::{Read, Seek};

use cws_core::{OAuthCredentials, PublishConfig, PublishTarget};
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::StoreError;
use crate::executor::execute;
use crate::item::ItemResource;
use crate::sniff::{self, SNIFF_LEN};
use crate::token::{self, AccessToken, TOKEN_URL};
use crate::transport::{HttpRequest, Method, Transport};

/// Root of the Chrome Web Store API.
pub const API_ROOT: &str = "https://www.googleapis.com";

/// Archives must sniff as one of these content types.
pub const ALLOWED_FILE_TYPES: &[&str] = &[sniff::ZIP];

/// Where the publisher sends its requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEndpoints {
    pub api_root: String,
    pub token_url: String,
}

impl Default for StoreEndpoints {
    fn default() -> Self {
        Self {
            api_root: API_ROOT.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }
}

impl StoreEndpoints {
    /// `{root}/upload/chromewebstore/v1.1/items/{id}`
    pub fn upload_url(&self, extension_id: &str) -> Result<Url, StoreError> {
        self.endpoint(&["upload", "chromewebstore", "v1.1", "items", extension_id])
    }

    /// `{root}/chromewebstore/v1.1/items/{id}/publish?publishTarget={target}`
    pub fn publish_url(&self, extension_id: &str, target: PublishTarget) -> Result<Url, StoreError> {
        let mut url = self.endpoint(&["chromewebstore", "v1.1", "items", extension_id, "publish"])?;
        url.query_pairs_mut()
            .append_pair("publishTarget", target.as_str());
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let invalid = |reason: String| StoreError::InvalidEndpoint {
            url: self.api_root.clone(),
            reason,
        };

        let mut url = Url::parse(&self.api_root).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Responses of a completed upload workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub upload: ItemResource,
    pub publish: Option<ItemResource>,
}

/// Checks that `archive` sniffs as a zip file.
///
/// Only the first 512 bytes are inspected. The reader is rewound to the
/// start before returning, whether or not validation passes.
pub fn validate_archive<R: Read + Seek>(archive: &mut R) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        operation: "sniffing archive",
        source,
    };

    let mut head = Vec::with_capacity(SNIFF_LEN);
    let read = archive.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut head);
    archive.rewind().map_err(io_err)?;
    read.map_err(io_err)?;

    let detected = sniff::detect_content_type(&head);
    debug!("got file with type: {detected}");

    if ALLOWED_FILE_TYPES.contains(&detected) {
        return Ok(());
    }
    Err(StoreError::InvalidFileType {
        detected: detected.to_string(),
    })
}

/// Drives the token → upload → publish sequence against the store API.
#[derive(Debug)]
pub struct Publisher<T> {
    transport: T,
    endpoints: StoreEndpoints,
}

impl<T: Transport> Publisher<T> {
    pub fn new(transport: T) -> Self {
        Self::with_endpoints(transport, StoreEndpoints::default())
    }

    pub fn with_endpoints(transport: T, endpoints: StoreEndpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn refresh_token(&self, credentials: &OAuthCredentials) -> Result<AccessToken, StoreError> {
        token::refresh(&self.transport, &self.endpoints.token_url, credentials)
    }

    /// Uploads the whole archive as the new package of `extension_id`.
    #[instrument(skip(self, archive, token))]
    pub fn upload<R: Read>(
        &self,
        archive: &mut R,
        file_name: &str,
        extension_id: &str,
        token: &AccessToken,
    ) -> Result<ItemResource, StoreError> {
        let mut content = Vec::new();
        archive
            .read_to_end(&mut content)
            .map_err(|source| StoreError::Io {
                operation: "reading archive",
                source,
            })?;

        let url = self.endpoints.upload_url(extension_id)?;

        let request = HttpRequest::new(Method::Put, url)
            .header("Authorization", token.authorization())
            .file_part("file", file_name, content);

        execute(&self.transport, &request, "upload")
    }

    /// Publishes the current package. The target is checked before any request is made.
    pub fn publish(
        &self,
        extension_id: &str,
        target: &str,
        token: &AccessToken,
    ) -> Result<ItemResource, StoreError> {
        let target: PublishTarget = target
            .parse()
            .map_err(|_| StoreError::InvalidPublishTarget(target.to_string()))?;
        self.publish_to(extension_id, target, token)
    }

    #[instrument(skip(self, target, token), fields(publish_target = target.as_str()))]
    pub fn publish_to(
        &self,
        extension_id: &str,
        target: PublishTarget,
        token: &AccessToken,
    ) -> Result<ItemResource, StoreError> {
        let url = self.endpoints.publish_url(extension_id, target)?;

        let request =
            HttpRequest::new(Method::Post, url).header("Authorization", token.authorization());

        execute(&self.transport, &request, "publish")
    }

    /// Validates, uploads and, when requested, publishes the configured archive.
    ///
    /// Stops at the first failure. The access token is fetched once and
    /// shared by the upload and publish calls.
    #[instrument(skip_all, fields(extension_id = %cfg.extension_id))]
    pub fn run(&self, cfg: &PublishConfig) -> Result<PublishOutcome, StoreError> {
        debug!("validate zip file should match allowed mime type");
        let mut archive = File::open(&cfg.zip_path).map_err(|source| StoreError::Io {
            operation: "opening archive",
            source,
        })?;
        validate_archive(&mut archive)?;

        let token = self.refresh_token(&cfg.credentials)?;

        debug!("uploading {}", cfg.zip_path.display());
        let file_name = cfg
            .zip_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let upload = self.upload(&mut archive, &file_name, &cfg.extension_id, &token)?;
        info!(upload_state = %upload.upload_state, "archive uploaded");

        let publish = if cfg.publish {
            debug!("going to publish item immediately");
            let item = self.publish_to(&cfg.extension_id, cfg.target, &token)?;
            info!(publish_target = cfg.target.as_str(), "item published");
            Some(item)
        } else {
            None
        };

        Ok(PublishOutcome { upload, publish })
    }
}

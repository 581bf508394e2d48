pub mod header;
pub mod metadata;
pub mod patch;
pub mod types;

pub use patch::PatchFile;
pub use types::{Header, UriReference, WebrevMetadata, WebrevStats};

use async_trait::async_trait;
use header::{HeaderExtractor, LineSplitter};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

const INDEX_DOCUMENT: &str = "index.html";

#[derive(Debug, Error)]
pub enum WebrevError {
    #[error("Malformed location '{location}': {source}")]
    MalformedLocation {
        location: String,
        #[source]
        source: LocationError,
    },

    #[error("Failed to retrieve {uri}: {source}")]
    RetrievalFailure {
        uri: String,
        #[source]
        source: RetrievalError,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),

    #[error("illegal character {0:?}")]
    IllegalCharacter(char),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    Status(reqwest::StatusCode),

    #[error("local I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl WebrevError {
    fn retrieval(uri: &Url, source: impl Into<RetrievalError>) -> Self {
        WebrevError::RetrievalFailure {
            uri: uri.to_string(),
            source: source.into(),
        }
    }
}

/// Turn a user-supplied webrev location into the base URI that relative
/// links on the index page resolve against.
///
/// A trailing `index.html` is dropped, so `http://host/webrev/index.html`
/// and `http://host/webrev/` sanitize to the same URI.
pub fn sanitize(location: &str) -> Result<Url, WebrevError> {
    let trimmed = location.strip_suffix(INDEX_DOCUMENT).unwrap_or(location);
    Url::parse(trimmed).map_err(|source| WebrevError::MalformedLocation {
        location: location.to_string(),
        source: source.into(),
    })
}

/// Network side of the webrev pipeline.
#[async_trait]
pub trait WebrevClient: Send + Sync {
    /// Download the index page at `uri` and extract its header table.
    async fn fetch_header(&self, uri: &Url) -> Result<Header, WebrevError>;

    /// Download the patch at `uri` into a temporary file.
    async fn fetch_patch(&self, uri: &Url) -> Result<PatchFile, WebrevError>;
}

/// `reqwest` implementation of [`WebrevClient`].
pub struct HttpWebrevClient {
    client: reqwest::Client,
}

impl HttpWebrevClient {
    pub fn new(user_agent: &str) -> Result<Self, WebrevError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(WebrevError::Client)?;
        Ok(Self { client })
    }

    async fn get(&self, uri: &Url) -> Result<reqwest::Response, WebrevError> {
        let response = self
            .client
            .get(uri.clone())
            .send()
            .await
            .map_err(|e| WebrevError::retrieval(uri, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebrevError::retrieval(uri, RetrievalError::Status(status)));
        }
        Ok(response)
    }
}

#[async_trait]
impl WebrevClient for HttpWebrevClient {
    #[instrument(skip(self), fields(uri = %uri))]
    async fn fetch_header(&self, uri: &Url) -> Result<Header, WebrevError> {
        let mut response = self.get(uri).await?;
        let mut splitter = LineSplitter::new();
        let mut extractor = HeaderExtractor::new();

        'body: while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| WebrevError::retrieval(uri, e))?
        {
            for line in splitter.push(&chunk) {
                if !extractor.feed(&line) {
                    break 'body;
                }
            }
        }

        if !extractor.is_done() {
            if let Some(line) = splitter.finish() {
                extractor.feed(&line);
            }
        }

        let header = extractor.finish();
        debug!(fields = header.len(), "extracted webrev header");
        Ok(header)
    }

    #[instrument(skip(self), fields(uri = %uri))]
    async fn fetch_patch(&self, uri: &Url) -> Result<PatchFile, WebrevError> {
        let response = self.get(uri).await?;
        patch::write_body(response)
            .await
            .map_err(|e| WebrevError::retrieval(uri, e))
    }
}

/// Sanitize `location`, download its index page and parse the header.
pub async fn fetch_metadata(
    client: &dyn WebrevClient,
    location: &str,
) -> Result<WebrevMetadata, WebrevError> {
    let source_uri = sanitize(location)?;
    let header = client.fetch_header(&source_uri).await?;
    metadata::parse(&header, &source_uri)
}

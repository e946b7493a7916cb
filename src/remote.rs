use crate::analysis::{ContentAnalysis, DeliveryAnalysis};
use crate::selection::AnalysisKind;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service answered {0}")]
    Status(StatusCode),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Source of pre-computed analysis documents for a rehearsal. `None`
/// means the service has no such document, which is distinct from a
/// document with empty lists.
pub trait AnalysisService {
    fn fetch_delivery(&self, rehearsal_id: &str) -> RemoteResult<Option<DeliveryAnalysis>>;
    fn fetch_content(&self, rehearsal_id: &str) -> RemoteResult<Option<ContentAnalysis>>;
}

/// Workflow record kept by the analysis service; confirming a selection
/// stores the chosen kinds against the rehearsal before navigation.
pub trait WorkflowService {
    fn set_analysis(&self, rehearsal_id: &str, kinds: &[AnalysisKind]) -> RemoteResult<()>;
}

/// Both collaborator roles behind one object, since the analysis service
/// hosts the workflow record too.
pub trait RemoteServices: AnalysisService + WorkflowService {
    fn as_analysis(&self) -> &dyn AnalysisService;
    fn as_workflow(&self) -> &dyn WorkflowService;
}

impl<T: AnalysisService + WorkflowService> RemoteServices for T {
    fn as_analysis(&self) -> &dyn AnalysisService {
        self
    }

    fn as_workflow(&self) -> &dyn WorkflowService {
        self
    }
}

/// Blocking HTTP client for both collaborator roles.
pub struct HttpApi {
    client: Client,
    base_url: String,
}

#[derive(serde::Serialize)]
struct AnalysisSelectionBody<'a> {
    analysis: &'a [AnalysisKind],
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn fetch_document<T: DeserializeOwned>(&self, path: String) -> RemoteResult<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "fetching analysis document");
        let response = self.client.get(&url).send()?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.json()?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(RemoteError::Status(status)),
        }
    }
}

impl AnalysisService for HttpApi {
    fn fetch_delivery(&self, rehearsal_id: &str) -> RemoteResult<Option<DeliveryAnalysis>> {
        self.fetch_document(format!("/rehearsal/{}/delivery", rehearsal_id))
    }

    fn fetch_content(&self, rehearsal_id: &str) -> RemoteResult<Option<ContentAnalysis>> {
        self.fetch_document(format!("/rehearsal/{}/content", rehearsal_id))
    }
}

impl WorkflowService for HttpApi {
    fn set_analysis(&self, rehearsal_id: &str, kinds: &[AnalysisKind]) -> RemoteResult<()> {
        let url = format!("{}/rehearsal/type/{}", self.base_url, rehearsal_id);
        debug!(%url, ?kinds, "updating rehearsal analysis selection");
        let response = self
            .client
            .patch(&url)
            .json(&AnalysisSelectionBody { analysis: kinds })
            .send()?;
        let status = response.status();
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(RemoteError::Status(status))
        }
    }
}

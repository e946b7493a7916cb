use crate::remote::{RemoteError, WorkflowService};
use crate::session::{KvStore, SessionStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Analysis families a user can request for a rehearsal.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AnalysisKind {
    Content,
    Delivery,
}

/// Workflow step confirmation navigates to, derived purely from the
/// selection: content input comes first whenever content is chosen
/// (it also collects the video), otherwise straight to video input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Route {
    ContentInput,
    VideoInput,
}

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("no analysis type selected")]
    NothingSelected,
    #[error("no active rehearsal in the session store")]
    NoActiveRehearsal,
    #[error("workflow update failed: {0}")]
    Workflow(#[from] RemoteError),
}

/// The chosen analysis types for one visit to the selection step.
/// Toggle-only mutation; insertion order is kept because the workflow
/// record stores the selection as an ordered list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    chosen: Vec<AnalysisKind>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, kind: AnalysisKind) {
        if let Some(pos) = self.chosen.iter().position(|&k| k == kind) {
            self.chosen.remove(pos);
        } else {
            self.chosen.push(kind);
        }
    }

    pub fn contains(&self, kind: AnalysisKind) -> bool {
        self.chosen.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }

    pub fn kinds(&self) -> &[AnalysisKind] {
        &self.chosen
    }

    /// Next workflow step, or `None` when nothing is selected and the
    /// confirm control must stay disabled.
    pub fn route(&self) -> Option<Route> {
        if self.contains(AnalysisKind::Content) {
            Some(Route::ContentInput)
        } else if self.contains(AnalysisKind::Delivery) {
            Some(Route::VideoInput)
        } else {
            None
        }
    }

    /// Push the selection into the rehearsal's workflow record and, only
    /// on success, hand back the route to navigate to. Failure keeps the
    /// user on the selection step; confirming again retries.
    pub fn confirm<S: KvStore>(
        &self,
        session: &SessionStore<S>,
        workflow: &dyn WorkflowService,
    ) -> Result<Route, ConfirmError> {
        let route = self.route().ok_or(ConfirmError::NothingSelected)?;
        let rehearsal_id = session
            .get_current_rehearsal()
            .ok_or(ConfirmError::NoActiveRehearsal)?;

        if let Err(err) = workflow.set_analysis(&rehearsal_id, &self.chosen) {
            error!(%err, rehearsal_id, "failed to update rehearsal");
            return Err(err.into());
        }
        Ok(route)
    }
}

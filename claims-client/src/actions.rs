//! View-facing actions.
//!
//! [`ClaimDesk`] is what a view calls when the user acts: it runs the
//! lifecycle and form checks, issues the gateway call and then refetches, so
//! the local copy of a claim is always the backend's latest. Each mutating
//! action has its own [`InFlight`] flag; a second request for the same action
//! while the first is pending is refused instead of sent.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::dashboard::{ClaimScope, DashboardStats, RECENT_CLAIMS, StatusFilter, recent_claims};
use crate::error::{PortalError, Result};
use crate::gateway::PortalApi;
use crate::lifecycle::{self, Decision, TransitionError};
use crate::models::{
    AiServiceHealth, BackendReply, Claim, ClaimDetails, ClaimPage, ClaimQuery, ClaimType,
    Document, DocumentUpload, FraudOutcome, FraudResult, FraudStatistics,
};
use crate::session::Session;
use crate::validation::ClaimForm;

/// Per-action "request pending" flag.
#[derive(Debug, Clone)]
pub struct InFlight {
    action: &'static str,
    busy: Arc<AtomicBool>,
}

/// Held while a request is outstanding; clears the flag on drop.
#[derive(Debug)]
pub struct InFlightTicket {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl InFlight {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn try_begin(&self) -> Option<InFlightTicket> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightTicket {
                busy: self.busy.clone(),
            })
    }

    pub fn begin(&self) -> Result<InFlightTicket> {
        self.try_begin().ok_or_else(|| {
            warn!(action = self.action, "Duplicate request refused");
            PortalError::InFlight(self.action)
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Whether the view that started a request still exists.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// The view went away; later responses are dropped.
    pub fn end(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Applies `value` only while the view is live. Returns whether it was applied.
    pub fn apply_if_live<T>(&self, value: T, apply: impl FnOnce(T)) -> bool {
        if !self.is_live() {
            return false;
        }
        apply(value);
        true
    }

    /// Awaits `request` and yields its output only if the view outlived it.
    pub async fn settle<F: Future>(&self, request: F) -> Option<F::Output> {
        let output = request.await;
        if self.is_live() {
            Some(output)
        } else {
            info!("View closed before the response arrived, discarding it");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent: Vec<Claim>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedClaim {
    pub reply: BackendReply,
    pub uploaded: Vec<String>,
    /// File name and the message of each upload that failed.
    pub failed_uploads: Vec<(String, String)>,
}

/// A write the backend accepted, with the refetch that followed it.
///
/// `latest` failing does not undo `reply`; the write stands either way.
#[derive(Debug)]
pub struct Refetched<T> {
    pub reply: BackendReply,
    pub latest: Result<T>,
}

impl<T> Refetched<T> {
    fn after(action: &'static str, reply: BackendReply, latest: Result<T>) -> Self {
        if let Err(e) = &latest {
            warn!(action, error = %e, "Write applied but refetch failed");
        }
        Self { reply, latest }
    }

    pub fn latest(&self) -> Option<&T> {
        self.latest.as_ref().ok()
    }
}

/// Everything shown when a claim is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimWorkspace {
    pub details: ClaimDetails,
    pub documents: Vec<Document>,
    pub fraud: FraudOutcome,
}

pub struct ClaimDesk {
    api: Arc<dyn PortalApi>,
    session: Session,
    submitting: InFlight,
    deciding: InFlight,
    deleting: InFlight,
    verifying: InFlight,
    assigning: InFlight,
    uploading: InFlight,
    analyzing: InFlight,
}

impl ClaimDesk {
    pub fn new(api: Arc<dyn PortalApi>, session: Session) -> Self {
        Self {
            api,
            session,
            submitting: InFlight::new("claim submission"),
            deciding: InFlight::new("status update"),
            deleting: InFlight::new("claim deletion"),
            verifying: InFlight::new("description verification"),
            assigning: InFlight::new("agent assignment"),
            uploading: InFlight::new("document upload"),
            analyzing: InFlight::new("fraud analysis"),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Claim types for the submission form; the built-in list stands in when
    /// the backend has none or cannot be reached.
    pub async fn claim_types(&self) -> Vec<ClaimType> {
        match self.api.claim_types().await {
            Ok(types) if !types.is_empty() => types,
            Ok(_) => ClaimType::defaults(),
            Err(e) => {
                warn!(error = %e, "Could not load claim types, using built-in list");
                ClaimType::defaults()
            }
        }
    }

    /// The claim list for the signed-in role, narrowed by `filter`.
    pub async fn load_claims(&self, filter: StatusFilter) -> Result<Vec<Claim>> {
        let claims = match ClaimScope::for_role(self.session.role) {
            ClaimScope::Mine => self.api.my_claims().await?,
            ClaimScope::All => {
                let query = ClaimQuery {
                    status: filter.status(),
                    ..ClaimQuery::default()
                };
                self.api.all_claims(&query).await?
            }
        };
        Ok(filter.apply(claims))
    }

    pub async fn claim(&self, id: i64) -> Result<Claim> {
        self.api.claim(id).await
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        let claims = self.load_claims(StatusFilter::All).await?;
        Ok(Dashboard {
            stats: DashboardStats::from_claims(&claims),
            recent: recent_claims(&claims, RECENT_CLAIMS)
                .into_iter()
                .cloned()
                .collect(),
        })
    }

    pub async fn claim_page(&self, query: &ClaimQuery) -> Result<ClaimPage> {
        lifecycle::check_staff(self.session.role, "browse all claims")?;
        self.api.all_claims_paginated(query).await
    }

    /// Creates a claim, then attaches `uploads` to it.
    ///
    /// An upload failure does not undo the claim; it is reported per file.
    pub async fn submit_claim(
        &self,
        form: &ClaimForm,
        uploads: &[DocumentUpload],
    ) -> Result<SubmittedClaim> {
        lifecycle::check_create(self.session.role)?;
        let claim = form.validate()?;
        let _ticket = self.submitting.begin()?;

        let reply = self.api.create_claim(&claim).await?;
        let mut submitted = SubmittedClaim {
            reply,
            uploaded: Vec::new(),
            failed_uploads: Vec::new(),
        };

        if uploads.is_empty() {
            return Ok(submitted);
        }
        let Some(claim_id) = submitted.reply.id() else {
            warn!("Created claim carried no id, documents not uploaded");
            submitted.failed_uploads = uploads
                .iter()
                .map(|u| (u.file_name.clone(), "Claim id unknown".to_string()))
                .collect();
            return Ok(submitted);
        };

        for upload in uploads {
            match self.api.upload_document(claim_id, upload).await {
                Ok(_) => submitted.uploaded.push(upload.file_name.clone()),
                Err(e) => {
                    warn!(claim_id, file_name = %upload.file_name, error = %e, "Upload failed");
                    submitted
                        .failed_uploads
                        .push((upload.file_name.clone(), e.user_message("Upload failed")));
                }
            }
        }
        Ok(submitted)
    }

    /// Approves or rejects `claim` with a response note, then refetches it.
    pub async fn decide(
        &self,
        claim: &Claim,
        decision: Decision,
        note: &str,
    ) -> Result<Refetched<Claim>> {
        let note = lifecycle::check_decision(self.session.role, claim.status, decision, note)?;
        let _ticket = self.deciding.begin()?;
        let reply = self.api.update_claim_status(claim.id, decision, &note).await?;
        info!(claim_id = claim.id, status = %decision.target(), "Decision recorded");
        let latest = self.api.claim(claim.id).await;
        Ok(Refetched::after("decision", reply, latest))
    }

    /// `decide` for a claim known only by id. Role and note are checked
    /// before the claim is fetched.
    pub async fn decide_by_id(
        &self,
        id: i64,
        decision: Decision,
        note: &str,
    ) -> Result<Refetched<Claim>> {
        lifecycle::check_staff(self.session.role, "change claim status")?;
        if note.trim().is_empty() {
            return Err(TransitionError::MissingResponseNote(decision.verb()).into());
        }
        let claim = self.api.claim(id).await?;
        self.decide(&claim, decision, note).await
    }

    /// Deletes a pending claim the customer owns, then refetches their list.
    pub async fn delete_claim(&self, claim: &Claim) -> Result<Refetched<Vec<Claim>>> {
        lifecycle::check_delete(&self.session, claim)?;
        let _ticket = self.deleting.begin()?;
        let reply = self.api.delete_claim(claim.id).await?;
        let latest = self.load_claims(StatusFilter::All).await;
        Ok(Refetched::after("deletion", reply, latest))
    }

    pub async fn verify_description(&self, claim: &Claim) -> Result<Refetched<Claim>> {
        lifecycle::check_verify(self.session.role, claim.description_verified)?;
        let _ticket = self.verifying.begin()?;
        let reply = self.api.verify_description(claim.id).await?;
        let latest = self.api.claim(claim.id).await;
        Ok(Refetched::after("verification", reply, latest))
    }

    pub async fn assign_agent(&self, claim_id: i64, agent_id: i64) -> Result<Refetched<Claim>> {
        lifecycle::check_staff(self.session.role, "assign agents")?;
        let _ticket = self.assigning.begin()?;
        let reply = self.api.assign_agent(claim_id, agent_id).await?;
        let latest = self.api.claim(claim_id).await;
        Ok(Refetched::after("assignment", reply, latest))
    }

    /// Attaches one document, then refetches the claim's documents.
    pub async fn upload_document(
        &self,
        claim_id: i64,
        upload: &DocumentUpload,
    ) -> Result<Refetched<Vec<Document>>> {
        let _ticket = self.uploading.begin()?;
        let reply = self.api.upload_document(claim_id, upload).await?;
        let latest = self.api.list_documents(claim_id).await;
        Ok(Refetched::after("upload", reply, latest))
    }

    pub async fn documents(&self, claim_id: i64) -> Result<Vec<Document>> {
        self.api.list_documents(claim_id).await
    }

    pub async fn run_fraud_analysis(&self, claim_id: i64) -> Result<FraudResult> {
        lifecycle::check_staff(self.session.role, "run fraud analysis")?;
        let _ticket = self.analyzing.begin()?;
        self.api.trigger_fraud_analysis(claim_id).await
    }

    /// Loads a claim with its documents and, for staff, its fraud verdict.
    pub async fn open_workspace(&self, claim_id: i64) -> Result<ClaimWorkspace> {
        let details = self.api.claim_details(claim_id).await?;
        let documents = match self.api.list_documents(claim_id).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(claim_id, error = %e, "Document list unavailable, using claim details");
                details.documents.clone()
            }
        };
        let fraud = if self.session.role.is_staff() {
            self.api.fraud_result(claim_id).await
        } else {
            FraudOutcome::not_analyzed()
        };
        Ok(ClaimWorkspace {
            details,
            documents,
            fraud,
        })
    }

    pub async fn fraud_result(&self, claim_id: i64) -> FraudOutcome {
        self.api.fraud_result(claim_id).await
    }

    pub async fn ai_service_health(&self) -> AiServiceHealth {
        self.api.ai_service_health().await
    }

    pub async fn fraud_statistics(&self) -> Result<FraudStatistics> {
        lifecycle::check_staff(self.session.role, "view fraud statistics")?;
        self.api.fraud_statistics().await
    }

    pub fn document_url(&self, document: &Document) -> Option<String> {
        document
            .stored_file_name()
            .and_then(|name| self.api.document_url(name))
    }
}

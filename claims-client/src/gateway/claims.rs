use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::info;

use super::{ClaimsApi, Gateway, ListShape};
use crate::error::Result;
use crate::lifecycle::Decision;
use crate::models::{
    BackendReply, Claim, ClaimDetails, ClaimPage, ClaimQuery, ClaimType, NewClaim,
};

#[async_trait]
impl ClaimsApi for Gateway {
    async fn claim_types(&self) -> Result<Vec<ClaimType>> {
        self.get_list("/claim-types", "claimTypes").await
    }

    async fn my_claims(&self) -> Result<Vec<Claim>> {
        self.get_list("/claims/my", "claims").await
    }

    async fn all_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>> {
        Ok(self.all_claims_paginated(query).await?.items)
    }

    async fn all_claims_paginated(&self, query: &ClaimQuery) -> Result<ClaimPage> {
        let body = self.call(Method::GET, "/claims", |r| r.query(query)).await?;
        let value = super::parse_body(&body)?;
        let (items, total_items, total_pages, current_page) =
            ListShape::classify(value, "claims").into_page()?;
        Ok(ClaimPage {
            items,
            total_items,
            total_pages,
            current_page,
        })
    }

    async fn claim(&self, id: i64) -> Result<Claim> {
        self.get(&format!("/claims/{id}")).await
    }

    async fn claim_details(&self, id: i64) -> Result<ClaimDetails> {
        self.get(&format!("/claims/{id}/details")).await
    }

    async fn create_claim(&self, claim: &NewClaim) -> Result<BackendReply> {
        let reply = self
            .mutate(Method::POST, "/claims", |r| r.json(claim))
            .await?;
        info!(claim_id = ?reply.id(), amount = claim.amount, "Claim created");
        Ok(reply)
    }

    async fn update_claim_status(
        &self,
        id: i64,
        decision: Decision,
        note: &str,
    ) -> Result<BackendReply> {
        let path = format!("/claims/{id}/{}", decision.endpoint());
        let body = json!({ "response": note });
        let reply = self.mutate(Method::PUT, &path, |r| r.json(&body)).await?;
        info!(claim_id = id, status = %decision.target(), "Claim decided");
        Ok(reply)
    }

    async fn assign_agent(&self, claim_id: i64, agent_id: i64) -> Result<BackendReply> {
        let path = format!("/claims/{claim_id}/assign/{agent_id}");
        let reply = self.mutate(Method::PUT, &path, |r| r).await?;
        info!(claim_id, agent_id, "Agent assigned");
        Ok(reply)
    }

    async fn delete_claim(&self, id: i64) -> Result<BackendReply> {
        let reply = self
            .mutate(Method::DELETE, &format!("/claims/{id}"), |r| r)
            .await?;
        info!(claim_id = id, "Claim deleted");
        Ok(reply)
    }

    async fn verify_description(&self, id: i64) -> Result<BackendReply> {
        let path = format!("/claims/{id}/verify-description");
        self.mutate(Method::PUT, &path, |r| r).await
    }
}

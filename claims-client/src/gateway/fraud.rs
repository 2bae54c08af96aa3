use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{FraudApi, Gateway};
use crate::error::Result;
use crate::models::{AiServiceHealth, FraudOutcome, FraudResult, FraudStatistics};

#[async_trait]
impl FraudApi for Gateway {
    async fn trigger_fraud_analysis(&self, claim_id: i64) -> Result<FraudResult> {
        let reply = self
            .mutate(Method::POST, &format!("/fraud/analyze/{claim_id}"), |r| r)
            .await?;
        let mut result: FraudResult = reply.decode()?;
        // the backend's verdict does not say it was analyzed
        result.analyzed = true;
        result.claim_id.get_or_insert(claim_id);
        info!(
            claim_id,
            image_status = result.image_status.label(),
            fraud_score = result.fraud_score,
            "Fraud analysis completed"
        );
        Ok(result)
    }

    async fn fraud_result(&self, claim_id: i64) -> FraudOutcome {
        let value = match self.get_value(&format!("/fraud/claim/{claim_id}")).await {
            Ok(value) => value,
            Err(e) => {
                debug!(claim_id, error = %e, "No fraud result available");
                return FraudOutcome::not_analyzed();
            }
        };

        if value.get("analyzed").and_then(Value::as_bool) == Some(false) {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(FraudOutcome::NO_ANALYSIS);
            return FraudOutcome::NotAnalyzed {
                message: message.to_string(),
            };
        }

        match serde_json::from_value::<FraudResult>(value) {
            Ok(mut result) => {
                result.analyzed = true;
                result.claim_id.get_or_insert(claim_id);
                FraudOutcome::Analyzed(result)
            }
            Err(e) => {
                warn!(claim_id, error = %e, "Unreadable fraud result");
                FraudOutcome::not_analyzed()
            }
        }
    }

    async fn ai_service_health(&self) -> AiServiceHealth {
        let value = match self.get_value("/fraud/health").await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Fraud service health check failed");
                return AiServiceHealth::unreachable();
            }
        };

        let available = value
            .get("aiServiceAvailable")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let status = value
            .get("status")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown");
        let message = if available {
            AiServiceHealth::CONNECTED
        } else {
            AiServiceHealth::FALLBACK
        };
        AiServiceHealth {
            ai_service_available: available,
            status: status.to_string(),
            message: message.to_string(),
        }
    }

    async fn fraud_statistics(&self) -> Result<FraudStatistics> {
        self.get("/fraud/statistics").await
    }
}

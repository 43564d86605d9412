//! Audit events for patient access

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde_json::json;

use crate::db::{AuditEntry, AuditLog};
use crate::middleware::{Actor, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Read,
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Read => "read",
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

/// Caller identity and correlation id, pulled from request extensions
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub actor: String,
    pub request_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for AuditContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .extensions
            .get::<Actor>()
            .map(|a| a.0.clone())
            .unwrap_or_else(|| "anonymous".to_string());
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(Self { actor, request_id })
    }
}

/// Emits an audit event for every successful access and, with a durable
/// store configured, persists it. Failures never reach the caller.
#[derive(Clone, Default)]
pub struct Auditor {
    log: Option<AuditLog>,
}

impl Auditor {
    pub fn new(log: Option<AuditLog>) -> Self {
        Self { log }
    }

    pub async fn record(
        &self,
        action: AuditAction,
        patient_id: &str,
        version: Option<&str>,
        ctx: &AuditContext,
    ) {
        tracing::info!(
            target: "audit",
            action = action.as_str(),
            resource_type = "Patient",
            patient_id = %patient_id,
            version = version.unwrap_or("-"),
            actor = %ctx.actor,
            request_id = %ctx.request_id,
            "Patient access"
        );

        let Some(log) = &self.log else {
            return;
        };

        let entry = AuditEntry {
            resource_type: "Patient",
            resource_id: patient_id.to_string(),
            action: action.as_str(),
            actor: ctx.actor.clone(),
            details: json!({
                "version": version,
                "requestId": ctx.request_id,
            }),
        };
        if let Err(error) = log.write(&entry).await {
            tracing::error!(
                target: "audit",
                %error,
                patient_id = %patient_id,
                action = action.as_str(),
                "Failed to write audit row"
            );
        }
    }
}

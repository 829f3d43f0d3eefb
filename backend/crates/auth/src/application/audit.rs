//! Security Audit Log
//!
//! One method per event kind on [`AuditLogger`]. Events go to an
//! [`AuditSink`]; the default sink writes one JSON line per event through
//! `tracing` on target `audit`. Events never carry passwords or token values,
//! and a sink failure never changes the outcome of the request.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::AccountId;
use parking_lot::Mutex;
use serde::Serialize;

/// Caller details recorded with every event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl ClientContext {
    /// Rate limiter bucket key
    pub fn rate_limit_key(&self) -> String {
        platform::client::rate_limit_key(self.ip)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    LoginSuccess,
    LoginFailed,
    RefreshSuccess,
    RefreshFailed,
    Logout,
    RateLimitExceeded,
}

impl AuditEventType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "login_success",
            Self::LoginFailed => "login_failed",
            Self::RefreshSuccess => "refresh_success",
            Self::RefreshFailed => "refresh_failed",
            Self::Logout => "logout",
            Self::RateLimitExceeded => "rate_limit_exceeded",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub client_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
}

impl AuditEvent {
    fn new(event_type: AuditEventType, client: &ClientContext, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            account_id: None,
            username: None,
            client_ip: client.rate_limit_key(),
            user_agent: client.user_agent.clone(),
            message: message.into(),
            remember_me: None,
        }
    }

    fn account(mut self, account_id: &AccountId) -> Self {
        self.account_id = Some(account_id.to_string());
        self
    }

    fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }
}

/// Destination of audit events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Writes events as JSON through `tracing` (target `audit`)
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        match serde_json::to_string(event) {
            Ok(line) => {
                tracing::info!(target: "audit", event_type = event.event_type.as_str(), "{line}");
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_type = event.event_type.as_str(),
                    "Failed to serialize audit event"
                );
            }
        }
    }
}

/// Keeps events in memory (tests and local inspection)
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, event_type: AuditEventType) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }
}

#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(Arc::new(TracingAuditSink))
    }
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    fn emit(&self, event: AuditEvent) {
        self.sink.record(&event);
    }

    pub fn login_success(
        &self,
        account_id: &AccountId,
        username: &str,
        client: &ClientContext,
        remember_me: bool,
    ) {
        let mut event = AuditEvent::new(AuditEventType::LoginSuccess, client, "login succeeded")
            .account(account_id)
            .username(username);
        event.remember_me = Some(remember_me);
        self.emit(event);
    }

    pub fn login_failed(&self, username: &str, client: &ClientContext, reason: &str) {
        self.emit(AuditEvent::new(AuditEventType::LoginFailed, client, reason).username(username));
    }

    pub fn refresh_success(&self, account_id: &AccountId, client: &ClientContext) {
        self.emit(
            AuditEvent::new(AuditEventType::RefreshSuccess, client, "access token refreshed")
                .account(account_id),
        );
    }

    pub fn refresh_failed(&self, client: &ClientContext, reason: &str) {
        self.emit(AuditEvent::new(AuditEventType::RefreshFailed, client, reason));
    }

    pub fn logout(&self, account_id: &AccountId, client: &ClientContext) {
        self.emit(
            AuditEvent::new(AuditEventType::Logout, client, "refresh token revoked")
                .account(account_id),
        );
    }

    pub fn rate_limit_exceeded(&self, client: &ClientContext, retry_after_secs: u64) {
        self.emit(AuditEvent::new(
            AuditEventType::RateLimitExceeded,
            client,
            format!("refresh rate limit exceeded, retry after {retry_after_secs}s"),
        ));
    }
}

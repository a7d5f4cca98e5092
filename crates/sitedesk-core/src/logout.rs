//! Logout sequencing.
//!
//! The backend call goes first (it needs the credential attached), bounded by
//! a timeout. The local clear is awaited next, and only then is the redirect
//! returned, so no later gate evaluation can observe the old credential.

use std::future::Future;
use std::time::Duration;

use sitedesk_types::error::FetchError;
use sitedesk_types::session::SessionDecision;

use crate::credential::store::CredentialSlot;
use crate::gate::RouteTable;

/// Port for the backend logout call.
pub trait LogoutTransport: Send + Sync {
    fn logout(&self) -> impl Future<Output = Result<(), FetchError>> + Send;
}

/// How the backend call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutCall {
    Completed,
    Failed(FetchError),
    /// Abandoned after the bounded wait.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub call: LogoutCall,
    pub decision: SessionDecision,
}

/// Log out: backend call (bounded), then local clear, then redirect to login.
pub async fn logout<T, S>(
    transport: &T,
    slot: &S,
    routes: &RouteTable,
    wait: Duration,
) -> LogoutOutcome
where
    T: LogoutTransport,
    S: CredentialSlot,
{
    let call = match tokio::time::timeout(wait, transport.logout()).await {
        Ok(Ok(())) => LogoutCall::Completed,
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "logout call failed, clearing local session anyway");
            LogoutCall::Failed(err)
        }
        Err(_) => {
            tracing::warn!(timeout_ms = wait.as_millis() as u64, "logout call abandoned");
            LogoutCall::TimedOut
        }
    };

    slot.clear_credential().await;

    LogoutOutcome {
        call,
        decision: SessionDecision::DenyRedirect(routes.login_path().to_string()),
    }
}

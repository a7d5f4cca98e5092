//! Per-navigation session gate.
//!
//! Decides from the locally held credential alone whether a navigation may
//! proceed. The check is advisory: the backend re-verifies the credential on
//! every API call, and server-side revocation is not visible here.

use secrecy::ExposeSecret;
use serde::Serialize;

use sitedesk_types::config::ConsoleConfig;
use sitedesk_types::credential::CredentialState;
use sitedesk_types::session::{RouteClass, SessionDecision};

use crate::clock::Clock;
use crate::credential::parser;
use crate::credential::store::CredentialSlot;

/// Route layout the gate classifies paths against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    protected_prefix: String,
    entry_path: String,
    login_path: String,
    protected_home: String,
}

impl RouteTable {
    pub fn new(
        protected_prefix: impl Into<String>,
        entry_path: impl Into<String>,
        login_path: impl Into<String>,
        protected_home: impl Into<String>,
    ) -> Self {
        let prefix: String = protected_prefix.into();
        Self {
            protected_prefix: prefix.trim_end_matches('/').to_string(),
            entry_path: entry_path.into(),
            login_path: login_path.into(),
            protected_home: protected_home.into(),
        }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::new(
            config.protected_prefix.clone(),
            config.entry_path.clone(),
            config.login_path.clone(),
            config.protected_home.clone(),
        )
    }

    /// Classify a navigation target. Query strings and fragments are ignored.
    pub fn classify(&self, path: &str) -> RouteClass {
        let path = path.split(['?', '#']).next().unwrap_or_default();

        if path == self.entry_path {
            return RouteClass::PublicEntry;
        }
        match path.strip_prefix(self.protected_prefix.as_str()) {
            Some("") => RouteClass::Protected,
            Some(rest) if rest.starts_with('/') => RouteClass::Protected,
            _ => RouteClass::Unguarded,
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn protected_home(&self) -> &str {
        &self.protected_home
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_config(&ConsoleConfig::default())
    }
}

/// Decision plus the side effect the gate owes the client store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub decision: SessionDecision,
    pub clear_credential: bool,
}

/// The decision table over `(route class, credential state)`.
pub fn decide(routes: &RouteTable, class: RouteClass, state: &CredentialState) -> Verdict {
    let decision = match (class, state) {
        (RouteClass::Unguarded, _) => {
            return Verdict {
                decision: SessionDecision::Allow,
                clear_credential: false,
            };
        }
        (RouteClass::Protected, CredentialState::Live(_)) => SessionDecision::Allow,
        (RouteClass::Protected, _) => SessionDecision::DenyRedirect(routes.login_path.clone()),
        (RouteClass::PublicEntry, CredentialState::Live(_)) => {
            SessionDecision::AllowRedirect(routes.protected_home.clone())
        }
        (RouteClass::PublicEntry, _) => SessionDecision::Allow,
    };

    Verdict {
        decision,
        clear_credential: state.requires_clear(),
    }
}

/// Everything the gate looked at for one navigation.
#[derive(Debug, Clone, Serialize)]
pub struct GateEvaluation {
    pub path: String,
    pub route: RouteClass,
    /// Credential state label (`absent`, `malformed`, `expired`, `live`).
    pub credential: &'static str,
    /// Expiry of a structurally valid credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub decision: SessionDecision,
    /// Whether the stored credential was cleared by this evaluation.
    pub cleared: bool,
}

/// Session gate. Stateless apart from its route table and clock; every call
/// re-reads both the credential and the time.
pub struct SessionGate<C> {
    routes: RouteTable,
    clock: C,
}

impl<C: Clock> SessionGate<C> {
    pub fn new(routes: RouteTable, clock: C) -> Self {
        Self { routes, clock }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Evaluate a navigation to `path`. Never fails.
    pub async fn evaluate<S: CredentialSlot>(&self, path: &str, slot: &S) -> SessionDecision {
        self.evaluate_detailed(path, slot).await.decision
    }

    /// Evaluate and report what was seen. When the credential is malformed or
    /// expired it is cleared, and the clear has completed before this returns.
    pub async fn evaluate_detailed<S: CredentialSlot>(
        &self,
        path: &str,
        slot: &S,
    ) -> GateEvaluation {
        let route = self.routes.classify(path);
        if route == RouteClass::Unguarded {
            return GateEvaluation {
                path: path.to_string(),
                route,
                credential: "unchecked",
                expires_at: None,
                decision: SessionDecision::Allow,
                cleared: false,
            };
        }

        let raw = slot.credential();
        let state = parser::classify(raw.as_ref().map(|t| t.expose_secret()), self.clock.now_unix());
        let verdict = decide(&self.routes, route, &state);

        if verdict.clear_credential {
            slot.clear_credential().await;
        }

        tracing::debug!(
            path,
            route = %route,
            credential = %state,
            decision = %verdict.decision,
            cleared = verdict.clear_credential,
            "session gate evaluated"
        );

        let expires_at = match &state {
            CredentialState::Live(p) | CredentialState::Expired(p) => Some(p.exp),
            _ => None,
        };

        GateEvaluation {
            path: path.to_string(),
            route,
            credential: state.label(),
            expires_at,
            decision: verdict.decision,
            cleared: verdict.clear_credential,
        }
    }
}

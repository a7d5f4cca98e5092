//! Route classes and the per-navigation session decision.

use serde::{Deserialize, Serialize};

use std::fmt;

/// How the gate treats a navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteClass {
    /// Under the reserved protected prefix.
    Protected,
    /// The public entry (login) page.
    PublicEntry,
    /// Anything else. The gate lets it through untouched.
    Unguarded,
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteClass::Protected => write!(f, "protected"),
            RouteClass::PublicEntry => write!(f, "public-entry"),
            RouteClass::Unguarded => write!(f, "unguarded"),
        }
    }
}

/// Outcome of evaluating the gate for one navigation.
///
/// Computed fresh on every navigation and never cached: the credential's
/// `exp` is relative to the wall clock at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum SessionDecision {
    /// Render the requested page.
    Allow,
    /// Refuse and send the visitor to `target` (the login page).
    DenyRedirect(String),
    /// Authorized, but the requested page is not meant for this visitor;
    /// send them to `target` (the protected home).
    AllowRedirect(String),
}

impl SessionDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, SessionDecision::DenyRedirect(_))
    }

    /// Redirect target, if the decision redirects.
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            SessionDecision::Allow => None,
            SessionDecision::DenyRedirect(target) | SessionDecision::AllowRedirect(target) => {
                Some(target)
            }
        }
    }
}

impl fmt::Display for SessionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionDecision::Allow => write!(f, "allow"),
            SessionDecision::DenyRedirect(target) => write!(f, "deny -> {target}"),
            SessionDecision::AllowRedirect(target) => write!(f, "allow -> {target}"),
        }
    }
}

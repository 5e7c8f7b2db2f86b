use serde::{Deserialize, Serialize};

use super::{Role, UserAccount};

/// Screens a signed-in session can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Application,
    Account,
    Admin,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Application => "application",
            View::Account => "account",
            View::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    Forbidden,
}

impl RouteDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDecision::Allow => "allow",
            RouteDecision::RedirectToLogin => "redirect_to_login",
            RouteDecision::Forbidden => "forbidden",
        }
    }
}

pub fn guard(view: View, user: Option<&UserAccount>) -> RouteDecision {
    match (view, user) {
        (_, None) => RouteDecision::RedirectToLogin,
        (View::Admin, Some(user)) if user.role != Role::Admin => RouteDecision::Forbidden,
        _ => RouteDecision::Allow,
    }
}

//! Role router: which screen a path shows for a given session context.
//!
//! Only two paths exist. Anything else redirects to the root, and the root
//! redirects to the login screen unless the signed-in profile has a role the
//! application knows.

use serde::Serialize;

use crate::auth::SessionContext;
use crate::models::Role;

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Loading,
    Login,
    Cashier,
    Supervisor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteDecision {
    Render { screen: Screen },
    Redirect { to: &'static str },
}

/// Strip the query string, fragment and trailing slashes. Empty becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        ROOT_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// The screen the root path shows for `ctx`.
pub fn home_screen(ctx: &SessionContext) -> Screen {
    match ctx.role() {
        Some(Role::BranchCashier) => Screen::Cashier,
        Some(Role::Supervisor) => Screen::Supervisor,
        Some(Role::Unknown) | None => Screen::Login,
    }
}

pub fn resolve(path: &str, ctx: &SessionContext) -> RouteDecision {
    let path = normalize_path(path);
    if path != ROOT_PATH && path != LOGIN_PATH {
        return RouteDecision::Redirect { to: ROOT_PATH };
    }
    if ctx.is_loading() {
        return RouteDecision::Render {
            screen: Screen::Loading,
        };
    }

    match (path.as_str(), home_screen(ctx)) {
        (LOGIN_PATH, Screen::Login) => RouteDecision::Render {
            screen: Screen::Login,
        },
        (LOGIN_PATH, _) => RouteDecision::Redirect { to: ROOT_PATH },
        (_, Screen::Login) => RouteDecision::Redirect { to: LOGIN_PATH },
        (_, screen) => RouteDecision::Render { screen },
    }
}

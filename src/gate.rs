//! Role Gate: the access-control decision for protected pages.
//!
//! Everything here is a pure function of its inputs. The HTTP middleware and the
//! client session snapshot both call into it.

use crate::models::{NavLink, Profile, Role};

pub const LOGIN_PATH: &str = "/login";

pub const MEMBERS: &[Role] = &[Role::Resident, Role::Admin];
pub const ADMINS: &[Role] = &[Role::Admin];

/// GateDecision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Identity is still resolving: show a neutral waiting state.
    Wait,
    Render,
    Redirect { to: &'static str },
}

impl GateDecision {
    pub fn redirect_target(self) -> Option<&'static str> {
        match self {
            GateDecision::Redirect { to } => Some(to),
            _ => None,
        }
    }
}

/// decide
///
/// While `loading`, always `Wait`. Afterwards `Render` iff a profile exists and its role
/// is in `required`; anything else redirects to the login page.
pub fn decide(required: &[Role], profile: Option<&Profile>, loading: bool) -> GateDecision {
    if loading {
        return GateDecision::Wait;
    }
    match profile {
        Some(p) if required.contains(&p.role) => GateDecision::Render,
        _ => GateDecision::Redirect { to: LOGIN_PATH },
    }
}

const PROTECTED: &[(&str, &[Role])] = &[
    ("/dashboard", MEMBERS),
    ("/complaints", MEMBERS),
    ("/residents", ADMINS),
    ("/finances", ADMINS),
];

/// Roles allowed on a protected page, or `None` for public pages.
///
/// Only the path part of a location counts, compared case-insensitively and without
/// trailing slashes, the same way the client router matches it.
pub fn required_roles(location: &str) -> Option<&'static [Role]> {
    let path = location
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    PROTECTED
        .iter()
        .find(|(page, _)| page.eq_ignore_ascii_case(path))
        .map(|(_, roles)| *roles)
}

/// Gate decision for navigating to `path`. Public pages always render.
pub fn navigate(path: &str, profile: Option<&Profile>, loading: bool) -> GateDecision {
    match required_roles(path) {
        Some(required) => decide(required, profile, loading),
        None => GateDecision::Render,
    }
}

fn links(items: &[(&str, &str)]) -> Vec<NavLink> {
    items
        .iter()
        .map(|(href, label)| NavLink {
            href: (*href).to_string(),
            label: (*label).to_string(),
        })
        .collect()
}

/// Navigation bar entries for the current profile (none = signed out).
pub fn nav_links(profile: Option<&Profile>) -> Vec<NavLink> {
    match profile.map(|p| p.role) {
        None => links(&[
            ("/", "home"),
            ("/notices", "notices"),
            ("/events", "events"),
            ("/contact", "contact"),
        ]),
        Some(Role::Resident) => links(&[
            ("/dashboard", "dashboard"),
            ("/complaints", "complaints"),
            ("/notices", "notices"),
            ("/events", "events"),
        ]),
        Some(Role::Admin) => links(&[
            ("/dashboard", "dashboard"),
            ("/residents", "residents"),
            ("/notices", "notices"),
            ("/complaints", "complaints"),
            ("/events", "events"),
            ("/finances", "finances"),
        ]),
    }
}

pub fn dashboard_heading(role: Role) -> &'static str {
    match role {
        Role::Admin => "Admin Dashboard",
        Role::Resident => "Resident Dashboard",
    }
}

use anyhow::Result;

use crate::access::{Access, AccessController, SessionStorage};

pub const LIST_PREFIX: &str = "#/list/";

/// What a fragment asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Empty fragment or `#/`.
    Dashboard,
    /// `#/list/<id>`, id verbatim.
    List(String),
    /// Anything else. Rendered as the dashboard.
    Unrecognized(String),
}

/// Which view to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Dashboard,
    List(String),
}

impl Route {
    pub fn view(&self) -> View {
        match self {
            Route::List(id) => View::List(id.clone()),
            Route::Dashboard | Route::Unrecognized(_) => View::Dashboard,
        }
    }
}

pub fn resolve(fragment: &str) -> Route {
    if fragment.is_empty() || fragment == "#/" {
        return Route::Dashboard;
    }
    match fragment.strip_prefix(LIST_PREFIX) {
        Some(id) => Route::List(id.to_string()),
        None => Route::Unrecognized(fragment.to_string()),
    }
}

pub fn list_fragment(list_id: &str) -> String {
    format!("{LIST_PREFIX}{list_id}")
}

/// Full link for sharing a list. Without a base the bare fragment is the
/// link (what `docket open` accepts).
pub fn share_link(base_url: Option<&str>, list_id: &str) -> String {
    match base_url {
        Some(base) => format!("{}{}", base.trim_end_matches('#'), list_fragment(list_id)),
        None => list_fragment(list_id),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub route: Route,
    pub view: View,
    pub access: Access,
}

/// Evaluate a fragment and apply its effect on the session's access state.
///
/// The unrecognized-fragment fallback shows the dashboard but, unlike `#/`,
/// does not mark the session as the owner's.
pub fn navigate<S: SessionStorage>(
    access: &mut AccessController<S>,
    fragment: &str,
) -> Result<Navigation> {
    let route = resolve(fragment);
    let state = match &route {
        Route::Dashboard => access.enter_dashboard()?,
        Route::List(_) => access.enter_list()?,
        Route::Unrecognized(_) => access.state(),
    };
    Ok(Navigation {
        view: route.view(),
        route,
        access: state,
    })
}

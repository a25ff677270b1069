use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Home,
    Login,
    Dashboard,
    Quests,
    Calendar,
    Achievements,
    Profile,
}

impl Route {
    pub const ALL: [Self; 7] = [
        Self::Home,
        Self::Login,
        Self::Dashboard,
        Self::Quests,
        Self::Calendar,
        Self::Achievements,
        Self::Profile,
    ];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::Quests => "/quests",
            Route::Calendar => "/calendar",
            Route::Achievements => "/achievements",
            Route::Profile => "/profile",
        }
    }

    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|route| route.path() == normalized)
    }

    #[must_use]
    pub const fn requires_auth(self) -> bool {
        !matches!(self, Route::Home | Route::Login)
    }
}

/// Where navigation to `to` actually lands.
#[must_use]
pub const fn guard(to: Route, authenticated: bool) -> Route {
    if to.requires_auth() && !authenticated {
        Route::Login
    } else {
        to
    }
}

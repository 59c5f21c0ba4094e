//! Client-side session state: token, user, menus, permissions and open tabs

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Path of the home tab, which is always present after a reset
pub const HOME_PATH: &str = "/index";
const HOME_TITLE: &str = "首页";

/// Logged-in user as returned by `/user/login`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    /// Comma-separated role names
    #[serde(default)]
    pub roles: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Remaining fields (account balance and other financial info)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl UserProfile {
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.split(',').map(str::trim).filter(|r| !r.is_empty())
    }
}

/// Entry of the sidebar menu tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    /// Permission code such as `system:user:edit`
    #[serde(default)]
    pub perms: Option<String>,
    #[serde(default)]
    pub children: Vec<MenuItem>,
}

/// An open page tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub title: String,
    /// Route path, unique among open tabs
    pub name: String,
}

impl Tab {
    fn home() -> Self {
        Self {
            title: HOME_TITLE.to_string(),
            name: HOME_PATH.to_string(),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    token: Option<String>,
    current_user: Option<UserProfile>,
    menu_list: Vec<MenuItem>,
    permissions: Vec<String>,
    tabs: Vec<Tab>,
    active_tab: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            token: None,
            current_user: None,
            menu_list: Vec::new(),
            permissions: Vec::new(),
            tabs: vec![Tab::home()],
            active_tab: HOME_PATH.to_string(),
        }
    }
}

/// Shared session store
///
/// Clones share state. Nothing is persisted; a new process starts logged out.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        self.state.write().token = token;
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().token.is_some()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.read().current_user.clone()
    }

    pub fn set_current_user(&self, user: Option<UserProfile>) {
        self.state.write().current_user = user;
    }

    pub fn menu_list(&self) -> Vec<MenuItem> {
        self.state.read().menu_list.clone()
    }

    /// Replace the menu tree; permissions are re-derived from its `perms`
    pub fn set_menu_list(&self, menus: Vec<MenuItem>) {
        let mut permissions = Vec::new();
        collect_perms(&menus, &mut permissions);
        let mut state = self.state.write();
        state.menu_list = menus;
        state.permissions = permissions;
    }

    pub fn permissions(&self) -> Vec<String> {
        self.state.read().permissions.clone()
    }

    pub fn set_permissions(&self, permissions: Vec<String>) {
        self.state.write().permissions = permissions;
    }

    /// Store everything a successful login returns
    pub fn login(&self, token: String, user: UserProfile, menus: Vec<MenuItem>) {
        info!("Session started for {}", user.username);
        self.set_token(Some(token));
        self.set_current_user(Some(user));
        self.set_menu_list(menus);
    }

    pub fn logout(&self) {
        info!("Session ended");
        self.clear();
    }

    /// Reset to the logged-out state, tabs included
    pub fn clear(&self) {
        *self.state.write() = SessionState::default();
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.state.read().tabs.clone()
    }

    pub fn active_tab(&self) -> String {
        self.state.read().active_tab.clone()
    }

    /// Open a tab for `path` unless it is already open, then activate it
    pub fn add_tab(&self, title: &str, path: &str) {
        if path.is_empty() {
            return;
        }
        let mut state = self.state.write();
        if !state.tabs.iter().any(|t| t.name == path) {
            state.tabs.push(Tab {
                title: title.to_string(),
                name: path.to_string(),
            });
        }
        state.active_tab = path.to_string();
    }

    pub fn update_active_tab(&self, path: &str) {
        if !path.is_empty() {
            self.state.write().active_tab = path.to_string();
        }
    }

    /// Close a tab; closing the active tab activates its right neighbour,
    /// or the left one when it was last
    pub fn remove_tab(&self, name: &str) {
        if name.is_empty() {
            return;
        }
        let mut state = self.state.write();
        if state.active_tab == name {
            if let Some(index) = state.tabs.iter().position(|t| t.name == name) {
                let next = state
                    .tabs
                    .get(index + 1)
                    .or_else(|| index.checked_sub(1).and_then(|i| state.tabs.get(i)))
                    .map(|t| t.name.clone());
                if let Some(next) = next {
                    state.active_tab = next;
                }
            }
        }
        state.tabs.retain(|t| t.name != name);
        debug!("Closed tab {}, active {}", name, state.active_tab);
    }

    pub fn reset_tabs(&self) {
        let mut state = self.state.write();
        state.tabs = vec![Tab::home()];
        state.active_tab = HOME_PATH.to_string();
    }

    /// Expiry from the token's `exp` claim; `None` for non-JWT tokens
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.token().as_deref().and_then(jwt_expiry)
    }

    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at().map(|exp| exp <= now).unwrap_or(false)
    }
}

fn collect_perms(menus: &[MenuItem], out: &mut Vec<String>) {
    for menu in menus {
        if let Some(perms) = menu.perms.as_deref() {
            for perm in perms.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                if !out.iter().any(|p| p == perm) {
                    out.push(perm.to_string());
                }
            }
        }
        collect_perms(&menu.children, out);
    }
}

/// Read the `exp` claim without verifying the signature
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let token = token.strip_prefix("Bearer ").unwrap_or(token);
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

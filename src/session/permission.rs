//! Permission and role gates, and the navigation guard

use super::store::SessionStore;

/// Role that is granted every permission
pub const ADMIN_ROLE: &str = "管理员";

/// Login page path
pub const LOGIN_PATH: &str = "/login";

/// Outcome of [`guard`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(String),
}

/// Whether the session holds any of `required`
///
/// Administrators pass every check. For anyone else an empty requirement
/// passes nothing.
pub fn has_permission<S: AsRef<str>>(store: &SessionStore, required: &[S]) -> bool {
    if has_admin_role(store) {
        return true;
    }
    let granted = store.permissions();
    required
        .iter()
        .any(|perm| granted.iter().any(|g| g == perm.as_ref()))
}

/// Whether the current user has any of `required` roles
pub fn has_role<S: AsRef<str>>(store: &SessionStore, required: &[S]) -> bool {
    let Some(user) = store.current_user() else {
        return false;
    };
    required
        .iter()
        .any(|role| user.role_names().any(|r| r == role.as_ref()))
}

fn has_admin_role(store: &SessionStore) -> bool {
    has_role(store, &[ADMIN_ROLE])
}

/// Decide whether navigation to `path` may proceed
///
/// Logged-in users are sent away from the login page; everyone else is sent
/// to it.
pub fn guard(store: &SessionStore, path: &str) -> Navigation {
    let authenticated = store.is_authenticated();
    if path == LOGIN_PATH {
        if authenticated {
            Navigation::Redirect("/".to_string())
        } else {
            Navigation::Proceed
        }
    } else if authenticated {
        Navigation::Proceed
    } else {
        Navigation::Redirect(LOGIN_PATH.to_string())
    }
}

use super::models::Role;
use super::store::SessionState;

// Outcome of evaluating a gate on route render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Render,
    RedirectLogin,
    RedirectHome,
}

/* Access gates.
 * Pure predicates over an already-loaded session snapshot; no network
 * calls happen here. The application must resolve the initial session
 * (load_user) before consulting them, else they see a transient
 * logged-out state.
 */

// Login and registration routes: bounce authenticated users home.
pub fn guest_only(session: &SessionState) -> Gate {
    match session.user {
        Some(_) => Gate::RedirectHome,
        None => Gate::Render,
    }
}

pub fn auth_required(session: &SessionState) -> Gate {
    match session.user {
        Some(_) => Gate::Render,
        None => Gate::RedirectLogin,
    }
}

// Admin routes deny only the basic role; staff and admin are admitted.
pub fn admin_required(session: &SessionState) -> Gate {
    match &session.user {
        None => Gate::RedirectLogin,
        Some(user) if user.role == Role::Basic => Gate::RedirectHome,
        Some(_) => Gate::Render,
    }
}

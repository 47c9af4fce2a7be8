//! Role-based access rules.
//!
//! Every permission check in the API goes through [`authorize`], which looks
//! the request up in [`POLICY`]. Adding a rule means adding a row here, never
//! an ad hoc role comparison inside a handler.

use model::entities::Role;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Team,
    Player,
    User,
    News,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
    ChangeRole,
    /// List the caller's own records.
    ListOwn,
    /// List another user's records.
    ListByUser,
}

/// Which rows a granted role may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Any,
    /// Only rows whose owner is the caller.
    Own,
}

pub struct Rule {
    pub resource: Resource,
    pub action: Action,
    pub grants: &'static [(Role, Scope)],
}

const EVERYONE: &[(Role, Scope)] = &[
    (Role::Admin, Scope::Any),
    (Role::Editor, Scope::Any),
    (Role::User, Scope::Any),
];
const ADMIN: &[(Role, Scope)] = &[(Role::Admin, Scope::Any)];
const STAFF: &[(Role, Scope)] = &[(Role::Admin, Scope::Any), (Role::Editor, Scope::Any)];
const ADMIN_ANY_EDITOR_OWN: &[(Role, Scope)] = &[(Role::Admin, Scope::Any), (Role::Editor, Scope::Own)];

pub const POLICY: &[Rule] = &[
    // Roster mutations are open to every authenticated account
    Rule { resource: Resource::Team, action: Action::Create, grants: EVERYONE },
    Rule { resource: Resource::Team, action: Action::Update, grants: EVERYONE },
    Rule { resource: Resource::Team, action: Action::Delete, grants: EVERYONE },
    Rule { resource: Resource::Player, action: Action::Create, grants: EVERYONE },
    Rule { resource: Resource::Player, action: Action::Update, grants: EVERYONE },
    Rule { resource: Resource::Player, action: Action::Delete, grants: EVERYONE },
    // Account directory
    Rule { resource: Resource::User, action: Action::List, grants: ADMIN },
    Rule { resource: Resource::User, action: Action::Read, grants: ADMIN },
    Rule { resource: Resource::User, action: Action::Create, grants: ADMIN },
    Rule { resource: Resource::User, action: Action::Update, grants: ADMIN },
    Rule { resource: Resource::User, action: Action::Delete, grants: ADMIN },
    Rule { resource: Resource::User, action: Action::ChangeRole, grants: ADMIN },
    // News
    Rule { resource: Resource::News, action: Action::List, grants: EVERYONE },
    Rule { resource: Resource::News, action: Action::Read, grants: EVERYONE },
    Rule { resource: Resource::News, action: Action::Create, grants: STAFF },
    Rule { resource: Resource::News, action: Action::Update, grants: ADMIN_ANY_EDITOR_OWN },
    Rule { resource: Resource::News, action: Action::Delete, grants: ADMIN_ANY_EDITOR_OWN },
    Rule { resource: Resource::News, action: Action::ListOwn, grants: STAFF },
    Rule { resource: Resource::News, action: Action::ListByUser, grants: ADMIN },
];

/// Looks up the scope `role` is granted for `action` on `resource`.
/// `None` means denied; unknown pairs are denied.
pub fn scope_for(role: Role, resource: Resource, action: Action) -> Option<Scope> {
    POLICY
        .iter()
        .find(|rule| rule.resource == resource && rule.action == action)
        .and_then(|rule| rule.grants.iter().find(|(granted, _)| *granted == role))
        .map(|(_, scope)| *scope)
}

/// Fails with `FORBIDDEN` unless `role` may perform `action` on `resource`.
pub fn authorize(role: Role, resource: Resource, action: Action) -> Result<Scope, AppError> {
    scope_for(role, resource, action).ok_or_else(|| {
        AppError::Forbidden(format!(
            "Role '{}' is not allowed to {:?} {:?}",
            role, action, resource
        ))
    })
}

/// Like [`authorize`], and additionally enforces [`Scope::Own`] against the
/// row's owner.
pub fn authorize_owned(
    role: Role,
    caller_id: i32,
    resource: Resource,
    action: Action,
    owner_id: i32,
) -> Result<(), AppError> {
    match authorize(role, resource, action)? {
        Scope::Any => Ok(()),
        Scope::Own if owner_id == caller_id => Ok(()),
        Scope::Own => Err(AppError::Forbidden(format!(
            "You can only {:?} your own {:?} items",
            action, resource
        ))),
    }
}

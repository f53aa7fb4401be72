//! # Role-Based Access Control
//!
//! Decides whether an authenticated actor may perform an action, from a
//! static role → permission table loaded once at process start.
//!
//! ## Evaluation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    has_permission(actor, "inventory.delete")            │
//! │                                                                         │
//! │  actor.role ──► None? ─────────────────────────────────► DENY          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RoleTable lookup ──► unknown role? ───────────────────► DENY          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  role.permissions contains id? ────────────────────────► ALLOW         │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  AccessPolicy::LevelInherited and a lower-level role                   │
//! │  grants it? ───────────────────────────────────────────► ALLOW         │
//! │       │ otherwise                                                       │
//! │       ▼                                                                 │
//! │     DENY                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every check fails closed and returns a plain `bool`. Only
//! [`Authorizer::ensure_permission`] turns a denial into an error, for
//! callers that want `?` propagation.
//!
//! ## Role Levels
//! Each role carries a privilege level. Under [`AccessPolicy::Explicit`]
//! (the default) the level is informational and only used for sorting;
//! every role's permission set is complete on its own. Under
//! [`AccessPolicy::LevelInherited`] a role additionally grants everything
//! granted by roles with a strictly lower level.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::validate_permission_id;

// =============================================================================
// Well-known Role Ids
// =============================================================================

pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_VIEWER: &str = "viewer";

// =============================================================================
// Permission
// =============================================================================

/// A named capability of the form `resource.action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Permission {
    /// Full identifier, e.g. `inventory.delete`.
    pub id: String,
    /// Part before the dot.
    pub resource: String,
    /// Part after the dot.
    pub action: String,
    pub description: String,
}

impl Permission {
    /// Builds a permission from its identifier.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::rbac::Permission;
    ///
    /// let p = Permission::parse("inventory.view", "View inventory").unwrap();
    /// assert_eq!(p.resource, "inventory");
    /// assert_eq!(p.action, "view");
    /// assert!(Permission::parse("inventory", "").is_err());
    /// ```
    pub fn parse(id: &str, description: impl Into<String>) -> Result<Self, ValidationError> {
        validate_permission_id(id)?;
        // validate_permission_id guarantees exactly one dot
        let (resource, action) = id.split_once('.').unwrap_or((id, ""));

        Ok(Permission {
            id: id.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            description: description.into(),
        })
    }
}

// =============================================================================
// Role
// =============================================================================

/// A role with a privilege level and an explicit permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Role {
    pub id: String,
    pub name: String,
    /// Higher is more privileged.
    pub level: u32,
    pub permissions: BTreeSet<String>,
}

impl Role {
    /// Creates a role from a list of permission ids.
    pub fn new<I, S>(id: impl Into<String>, name: impl Into<String>, level: u32, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Role {
            id: id.into(),
            name: name.into(),
            level,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this role's own permission set contains `permission_id`.
    #[inline]
    pub fn grants(&self, permission_id: &str) -> bool {
        self.permissions.contains(permission_id)
    }
}

// =============================================================================
// Access Policy
// =============================================================================

/// How role levels take part in permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Level is informational; a role grants exactly its own permissions.
    #[default]
    Explicit,
    /// A role also grants every permission of every lower-level role.
    LevelInherited,
}

impl std::fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessPolicy::Explicit => write!(f, "explicit"),
            AccessPolicy::LevelInherited => write!(f, "level_inherited"),
        }
    }
}

impl std::str::FromStr for AccessPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "explicit" => Ok(AccessPolicy::Explicit),
            "level_inherited" | "inherited" | "level" => Ok(AccessPolicy::LevelInherited),
            other => Err(ValidationError::InvalidFormat {
                field: "access_policy".to_string(),
                reason: format!("unknown policy '{}', expected explicit or level_inherited", other),
            }),
        }
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The identity behind a session.
///
/// An actor without a role is unauthenticated and is denied everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
}

impl Actor {
    /// Creates an authenticated actor holding `role`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Actor {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: Some(role.into()),
        }
    }

    /// The signed-out actor.
    pub fn anonymous() -> Self {
        Actor {
            id: String::new(),
            name: String::new(),
            email: String::new(),
            role: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.role.is_some()
    }
}

// =============================================================================
// Role Table
// =============================================================================

/// Serialized form of a role table, as stored in a JSON document.
///
/// ```json
/// {
///   "permissions": [{ "id": "inventory.view", "description": "View items" }],
///   "roles": [{ "id": "viewer", "name": "Viewer", "level": 20,
///               "permissions": ["inventory.view"] }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoleTableDocument {
    pub permissions: Vec<PermissionEntry>,
    pub roles: Vec<Role>,
}

/// One permission declaration in a [`RoleTableDocument`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PermissionEntry {
    pub id: String,
    #[serde(default)]
    pub description: String,
}

/// The immutable permission catalogue and role definitions.
///
/// ## Invariants
/// - Every permission id is of the form `resource.action`
/// - Role ids and role levels are unique
/// - Every permission a role grants is declared in the catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    permissions: BTreeMap<String, Permission>,
    roles: BTreeMap<String, Role>,
}

impl RoleTable {
    /// Builds a table, checking the invariants above.
    pub fn new(permissions: Vec<Permission>, roles: Vec<Role>) -> CoreResult<Self> {
        let mut catalogue = BTreeMap::new();
        for permission in permissions {
            validate_permission_id(&permission.id)?;
            if catalogue.contains_key(&permission.id) {
                return Err(ValidationError::Duplicate {
                    field: "permission".to_string(),
                    value: permission.id,
                }
                .into());
            }
            catalogue.insert(permission.id.clone(), permission);
        }

        let mut by_id = BTreeMap::new();
        let mut levels = HashSet::new();
        for role in roles {
            if role.id.trim().is_empty() {
                return Err(CoreError::InvalidRoleTable("role id is empty".to_string()));
            }
            if !levels.insert(role.level) {
                return Err(CoreError::InvalidRoleTable(format!(
                    "level {} is used by more than one role",
                    role.level
                )));
            }
            if let Some(unknown) = role.permissions.iter().find(|p| !catalogue.contains_key(*p)) {
                return Err(CoreError::InvalidRoleTable(format!(
                    "role {} grants undeclared permission {}",
                    role.id, unknown
                )));
            }
            if by_id.contains_key(&role.id) {
                return Err(ValidationError::Duplicate {
                    field: "role".to_string(),
                    value: role.id,
                }
                .into());
            }
            by_id.insert(role.id.clone(), role);
        }

        Ok(RoleTable {
            permissions: catalogue,
            roles: by_id,
        })
    }

    /// Parses and validates a JSON role table document.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let doc: RoleTableDocument = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidRoleTable(e.to_string()))?;
        Self::from_document(doc)
    }

    /// Validates a deserialized document.
    pub fn from_document(doc: RoleTableDocument) -> CoreResult<Self> {
        let permissions = doc
            .permissions
            .into_iter()
            .map(|entry| Permission::parse(&entry.id, entry.description))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(permissions, doc.roles)
    }

    /// Converts the table back to its document form.
    pub fn to_document(&self) -> RoleTableDocument {
        RoleTableDocument {
            permissions: self
                .permissions
                .values()
                .map(|p| PermissionEntry {
                    id: p.id.clone(),
                    description: p.description.clone(),
                })
                .collect(),
            roles: self.roles_by_level().into_iter().cloned().collect(),
        }
    }

    /// Looks up a role by id.
    pub fn role(&self, id: &str) -> Option<&Role> {
        self.roles.get(id)
    }

    /// Looks up a permission by id.
    pub fn permission(&self, id: &str) -> Option<&Permission> {
        self.permissions.get(id)
    }

    /// All declared permissions, sorted by id.
    pub fn permissions(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.values()
    }

    /// Roles sorted from most to least privileged.
    pub fn roles_by_level(&self) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self.roles.values().collect();
        roles.sort_by(|a, b| b.level.cmp(&a.level));
        roles
    }

    /// Roles strictly below `level`.
    fn roles_below(&self, level: u32) -> impl Iterator<Item = &Role> {
        self.roles.values().filter(move |r| r.level < level)
    }
}

/// The built-in five-tier table.
///
/// | role        | level | grants                                        |
/// |-------------|-------|-----------------------------------------------|
/// | super_admin | 100   | everything                                    |
/// | admin       | 80    | everything except `settings.edit`             |
/// | manager     | 60    | day-to-day operations, no deletes             |
/// | editor      | 40    | content and sales, no creation of catalog     |
/// | viewer      | 20    | read-only dashboards                          |
impl Default for RoleTable {
    fn default() -> Self {
        let permissions: Vec<Permission> = DEFAULT_PERMISSIONS
            .iter()
            .filter_map(|(id, description)| Permission::parse(id, *description).ok())
            .collect();

        let all: Vec<&str> = DEFAULT_PERMISSIONS.iter().map(|(id, _)| *id).collect();

        let roles = vec![
            Role::new(ROLE_SUPER_ADMIN, "Super Admin", 100, all.iter().copied()),
            Role::new(
                ROLE_ADMIN,
                "Admin",
                80,
                all.iter().copied().filter(|p| *p != "settings.edit"),
            ),
            Role::new(ROLE_MANAGER, "Manager", 60, MANAGER_PERMISSIONS.iter().copied()),
            Role::new(ROLE_EDITOR, "Editor", 40, EDITOR_PERMISSIONS.iter().copied()),
            Role::new(ROLE_VIEWER, "Viewer", 20, VIEWER_PERMISSIONS.iter().copied()),
        ];

        let mut by_id = BTreeMap::new();
        for role in roles {
            by_id.insert(role.id.clone(), role);
        }

        RoleTable {
            permissions: permissions.into_iter().map(|p| (p.id.clone(), p)).collect(),
            roles: by_id,
        }
    }
}

const DEFAULT_PERMISSIONS: &[(&str, &str)] = &[
    ("dashboard.view", "View the dashboard overview"),
    ("inventory.view", "View inventory items"),
    ("inventory.create", "Add inventory items"),
    ("inventory.edit", "Edit inventory items"),
    ("inventory.delete", "Delete inventory items"),
    ("pos.view", "Open the point of sale"),
    ("pos.create", "Ring up transactions"),
    ("pos.refund", "Refund transactions"),
    ("newsletter.view", "View newsletter campaigns"),
    ("newsletter.create", "Draft newsletter campaigns"),
    ("newsletter.send", "Send newsletter campaigns"),
    ("newsletter.delete", "Delete newsletter campaigns"),
    ("tournaments.view", "View tournaments"),
    ("tournaments.create", "Create tournaments"),
    ("tournaments.edit", "Edit tournaments"),
    ("tournaments.delete", "Delete tournaments"),
    ("players.view", "View players"),
    ("players.create", "Register players"),
    ("players.edit", "Edit players"),
    ("players.delete", "Remove players"),
    ("users.view", "View back-office users"),
    ("users.create", "Invite back-office users"),
    ("users.edit", "Change user roles"),
    ("users.delete", "Remove back-office users"),
    ("settings.view", "View settings"),
    ("settings.edit", "Change settings"),
];

const MANAGER_PERMISSIONS: &[&str] = &[
    "dashboard.view",
    "inventory.view",
    "inventory.create",
    "inventory.edit",
    "pos.view",
    "pos.create",
    "pos.refund",
    "newsletter.view",
    "newsletter.create",
    "newsletter.send",
    "tournaments.view",
    "tournaments.create",
    "tournaments.edit",
    "players.view",
    "players.create",
    "players.edit",
    "users.view",
];

const EDITOR_PERMISSIONS: &[&str] = &[
    "dashboard.view",
    "inventory.view",
    "inventory.edit",
    "pos.view",
    "pos.create",
    "newsletter.view",
    "newsletter.create",
    "tournaments.view",
    "tournaments.edit",
    "players.view",
    "players.edit",
];

const VIEWER_PERMISSIONS: &[&str] = &[
    "dashboard.view",
    "inventory.view",
    "tournaments.view",
    "newsletter.view",
];

// =============================================================================
// Authorizer
// =============================================================================

/// Evaluates permission checks against a shared [`RoleTable`].
///
/// Cloning is cheap; the table is behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Authorizer {
    table: Arc<RoleTable>,
    policy: AccessPolicy,
}

impl Authorizer {
    pub fn new(table: RoleTable, policy: AccessPolicy) -> Self {
        Authorizer {
            table: Arc::new(table),
            policy,
        }
    }

    pub fn table(&self) -> &RoleTable {
        &self.table
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Returns the actor's role, or `None` when signed out or unknown.
    pub fn resolve_role(&self, actor: &Actor) -> Option<&Role> {
        actor.role.as_deref().and_then(|id| self.table.role(id))
    }

    /// Exact match on the actor's role id.
    pub fn has_role(&self, actor: &Actor, role_id: &str) -> bool {
        actor.role.as_deref() == Some(role_id)
    }

    /// Whether the actor's role grants `permission_id`.
    ///
    /// ## Example
    /// ```rust
    /// use keystone_core::rbac::{AccessPolicy, Actor, Authorizer, RoleTable};
    ///
    /// let auth = Authorizer::new(RoleTable::default(), AccessPolicy::Explicit);
    /// let viewer = Actor::new("u1", "Vic", "vic@example.com", "viewer");
    ///
    /// assert!(auth.has_permission(&viewer, "inventory.view"));
    /// assert!(!auth.has_permission(&viewer, "inventory.delete"));
    /// assert!(!auth.has_permission(&Actor::anonymous(), "dashboard.view"));
    /// ```
    pub fn has_permission(&self, actor: &Actor, permission_id: &str) -> bool {
        let Some(role) = self.resolve_role(actor) else {
            return false;
        };

        if role.grants(permission_id) {
            return true;
        }

        match self.policy {
            AccessPolicy::Explicit => false,
            AccessPolicy::LevelInherited => self
                .table
                .roles_below(role.level)
                .any(|lower| lower.grants(permission_id)),
        }
    }

    /// True if at least one id passes [`Self::has_permission`].
    pub fn has_any_permission<S: AsRef<str>>(&self, actor: &Actor, permission_ids: &[S]) -> bool {
        permission_ids
            .iter()
            .any(|p| self.has_permission(actor, p.as_ref()))
    }

    /// True only if every id passes [`Self::has_permission`].
    ///
    /// An actor without a resolvable role is denied even for an empty list.
    pub fn has_all_permissions<S: AsRef<str>>(&self, actor: &Actor, permission_ids: &[S]) -> bool {
        if self.resolve_role(actor).is_none() {
            return false;
        }
        permission_ids
            .iter()
            .all(|p| self.has_permission(actor, p.as_ref()))
    }

    /// `Ok(())` when allowed, `CoreError::Unauthorized` otherwise.
    pub fn ensure_permission(&self, actor: &Actor, permission_id: &str) -> CoreResult<()> {
        if self.has_permission(actor, permission_id) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized {
                permission: permission_id.to_string(),
            })
        }
    }

    /// Every permission the actor holds under the current policy, sorted.
    ///
    /// Used to build navigation menus.
    pub fn permissions_for(&self, actor: &Actor) -> Vec<String> {
        self.table
            .permissions()
            .filter(|p| self.has_permission(actor, &p.id))
            .map(|p| p.id.clone())
            .collect()
    }
}

impl Default for Authorizer {
    fn default() -> Self {
        Authorizer::new(RoleTable::default(), AccessPolicy::default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: &str) -> Actor {
        Actor::new("u1", "Test User", "user@example.com", role)
    }

    #[test]
    fn test_default_table_has_five_tiers() {
        let table = RoleTable::default();
        let ids: Vec<&str> = table.roles_by_level().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["super_admin", "admin", "manager", "editor", "viewer"]);
        assert_eq!(table.permissions().count(), DEFAULT_PERMISSIONS.len());
    }

    #[test]
    fn test_default_table_passes_validation() {
        let table = RoleTable::default();
        let rebuilt = RoleTable::from_document(table.to_document()).unwrap();
        assert_eq!(rebuilt, table);
    }

    #[test]
    fn test_has_permission_matches_role_sets() {
        let auth = Authorizer::default();
        for role in auth.table().roles_by_level() {
            let actor = actor(&role.id);
            for permission in auth.table().permissions() {
                assert_eq!(
                    auth.has_permission(&actor, &permission.id),
                    role.grants(&permission.id),
                    "role {} / permission {}",
                    role.id,
                    permission.id
                );
            }
        }
    }

    #[test]
    fn test_viewer_scenario() {
        let auth = Authorizer::default();
        let viewer = actor("viewer");

        assert!(!auth.has_permission(&viewer, "inventory.delete"));
        assert!(auth.has_any_permission(&viewer, &["inventory.delete", "inventory.view"]));
        assert!(!auth.has_all_permissions(&viewer, &["inventory.delete", "inventory.view"]));
        assert_eq!(
            auth.permissions_for(&viewer),
            vec![
                "dashboard.view",
                "inventory.view",
                "newsletter.view",
                "tournaments.view"
            ]
        );
    }

    #[test]
    fn test_fails_closed() {
        let auth = Authorizer::default();

        let anonymous = Actor::anonymous();
        assert!(!anonymous.is_authenticated());
        assert!(!auth.has_permission(&anonymous, "dashboard.view"));
        assert!(auth.resolve_role(&anonymous).is_none());

        let ghost = actor("intern");
        assert!(!auth.has_permission(&ghost, "dashboard.view"));
        assert!(!auth.has_any_permission(&ghost, &["dashboard.view"]));
        assert!(!auth.has_all_permissions::<&str>(&ghost, &[]));
        assert!(auth.resolve_role(&ghost).is_none());
        assert!(auth.permissions_for(&ghost).is_empty());
    }

    #[test]
    fn test_empty_lists() {
        let auth = Authorizer::default();
        let admin = actor("admin");
        assert!(!auth.has_any_permission::<&str>(&admin, &[]));
        assert!(auth.has_all_permissions::<&str>(&admin, &[]));
    }

    #[test]
    fn test_has_role_is_exact_match() {
        let auth = Authorizer::default();
        let admin = actor("admin");
        assert!(auth.has_role(&admin, "admin"));
        assert!(!auth.has_role(&admin, "super_admin"));
        assert!(!auth.has_role(&admin, "Admin"));
        assert!(!auth.has_role(&Actor::anonymous(), "admin"));
    }

    #[test]
    fn test_explicit_policy_ignores_levels() {
        let auth = Authorizer::default();
        // admin outranks everyone except super_admin but lacks settings.edit
        assert!(!auth.has_permission(&actor("admin"), "settings.edit"));
        // manager outranks editor, yet both lack inventory.delete
        assert!(!auth.has_permission(&actor("manager"), "inventory.delete"));
    }

    #[test]
    fn test_level_inherited_policy() {
        let table = RoleTable::new(
            vec![
                Permission::parse("reports.view", "").unwrap(),
                Permission::parse("reports.export", "").unwrap(),
                Permission::parse("reports.delete", "").unwrap(),
            ],
            vec![
                Role::new("lead", "Lead", 30, ["reports.delete"]),
                Role::new("analyst", "Analyst", 20, ["reports.export"]),
                Role::new("reader", "Reader", 10, ["reports.view"]),
            ],
        )
        .unwrap();

        let explicit = Authorizer::new(table.clone(), AccessPolicy::Explicit);
        let inherited = Authorizer::new(table, AccessPolicy::LevelInherited);
        let lead = actor("lead");
        let reader = actor("reader");

        assert!(!explicit.has_permission(&lead, "reports.view"));
        assert!(inherited.has_permission(&lead, "reports.view"));
        assert!(inherited.has_permission(&lead, "reports.export"));
        assert!(!inherited.has_permission(&reader, "reports.export"));
        assert_eq!(inherited.permissions_for(&lead).len(), 3);
    }

    #[test]
    fn test_ensure_permission() {
        let auth = Authorizer::default();
        assert!(auth.ensure_permission(&actor("editor"), "pos.create").is_ok());

        let err = auth
            .ensure_permission(&actor("viewer"), "pos.create")
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::Unauthorized {
                permission: "pos.create".to_string()
            }
        );
    }

    #[test]
    fn test_role_table_from_json() {
        let json = r#"{
            "permissions": [
                { "id": "inventory.view", "description": "View items" },
                { "id": "inventory.edit" }
            ],
            "roles": [
                { "id": "clerk", "name": "Clerk", "level": 10,
                  "permissions": ["inventory.view"] }
            ]
        }"#;

        let table = RoleTable::from_json(json).unwrap();
        assert!(table.role("clerk").unwrap().grants("inventory.view"));
        assert_eq!(table.permission("inventory.edit").unwrap().action, "edit");
    }

    #[test]
    fn test_role_table_rejects_inconsistent_documents() {
        let undeclared = r#"{
            "permissions": [{ "id": "inventory.view" }],
            "roles": [{ "id": "clerk", "name": "Clerk", "level": 10,
                        "permissions": ["inventory.delete"] }]
        }"#;
        assert!(matches!(
            RoleTable::from_json(undeclared),
            Err(CoreError::InvalidRoleTable(_))
        ));

        let bad_id = r#"{ "permissions": [{ "id": "inventory" }], "roles": [] }"#;
        assert!(matches!(
            RoleTable::from_json(bad_id),
            Err(CoreError::Validation(_))
        ));

        let same_level = r#"{
            "permissions": [],
            "roles": [
                { "id": "a", "name": "A", "level": 10, "permissions": [] },
                { "id": "b", "name": "B", "level": 10, "permissions": [] }
            ]
        }"#;
        assert!(RoleTable::from_json(same_level).is_err());

        assert!(RoleTable::from_json("not json").is_err());
    }

    #[test]
    fn test_access_policy_parsing() {
        assert_eq!("explicit".parse::<AccessPolicy>().unwrap(), AccessPolicy::Explicit);
        assert_eq!(
            "level_inherited".parse::<AccessPolicy>().unwrap(),
            AccessPolicy::LevelInherited
        );
        assert!("sometimes".parse::<AccessPolicy>().is_err());
    }

    #[test]
    fn test_role_table_types_have_bindings() {
        let role = Role::decl();
        assert!(role.contains("level: number"));
        assert!(role.contains("permissions: Array<string>"));

        let document = RoleTableDocument::decl();
        assert!(document.contains("roles: Array<Role>"));
        assert!(document.contains("permissions: Array<PermissionEntry>"));
    }
}

//! ZainMart navigation
//!
//! Pure functions over the static menu tree and the caller's roles:
//! - `menu`: the declarative menu and the role filter
//! - `sidebar`: projection of a filtered menu into sidebar items
//! - `access`: path-prefix route guard and landing-page selection

pub mod access;
pub mod menu;
pub mod sidebar;

pub use access::{AccessPolicy, RoleAccessRule, RouteDecision, authorize, can_access_path, default_path_for_role, is_public_route};
pub use menu::{MenuNode, default_menu, filter_menu_by_roles, has_any_role};
pub use sidebar::{SidebarItem, to_sidebar_items};

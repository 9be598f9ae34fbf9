//! Tables of the legacy media catalogue.

pub mod comments;
pub mod roles;
pub mod roles_users;
pub mod users;

pub use comments::Comment;
pub use roles::{Role, RoleR};
pub use roles_users::{RolesUser, RolesUserR};
pub use users::{User, UserR};

pub mod permissions;
pub mod roles;

pub use permissions::{InvalidPermissionCategory, Permission, PermissionCategory, PermissionRegistry};
pub use roles::{default_roles, Role, RoleName};

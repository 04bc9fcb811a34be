/// Router Module Index
///
/// Routes are split by who may call them. Access is enforced at the module level by
/// role-gate layers in `create_router`, never inside individual handlers.

/// Anonymous access: auth entry points and public content.
pub mod public;

/// Any signed-in member (`resident` or `admin`).
pub mod members;

/// `admin` only, nested under `/admin`.
pub mod admin;

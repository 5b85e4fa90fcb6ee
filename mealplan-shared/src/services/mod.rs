/// Domain services
///
/// Each service owns a pool handle (and, where mutations are gated, the shared
/// permission matrix). Services are cheap to clone and are built per request from
/// `AppState`.
///
/// - `membership`: groups, joining/leaving, moderation, roles
/// - `invites`: invite link lifecycle
/// - `meals`: meal CRUD, flags, preferences and cooks
/// - `sync`: incremental sync scopes
/// - `users`: caller profile

pub mod invites;
pub mod meals;
pub mod membership;
pub mod sync;
pub mod users;

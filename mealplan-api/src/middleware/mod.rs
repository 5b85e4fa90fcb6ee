/// Middleware modules for the API server
///
/// Authentication lives in `app` (it needs `AppState`); this module holds the
/// state-free layers.

pub mod security;

/// Middleware modules for the API server
///
/// Session checks live in `app` because they need the application state;
/// this module holds the state-free layers.
///
/// - `security`: Security response headers

pub mod security;

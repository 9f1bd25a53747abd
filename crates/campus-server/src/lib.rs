//! Campus Server — request authorization gate, auth routes and the
//! background session sweeper.

pub mod config;
pub mod error;
pub mod gate;
pub mod headers;
pub mod policy;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod sweeper;
pub mod validation;

use axum::{Router, middleware};
use surrealdb::Connection;

pub use config::{AccessPolicyConfig, RateLimitConfig, ServerConfig};
pub use gate::Identity;
pub use state::AppState;

/// Build the application: auth routes plus `pages`, all behind the
/// request gate.
pub fn app<C: Connection>(state: AppState<C>, pages: Router<AppState<C>>) -> Router {
    routes::routes()
        .merge(pages)
        .fallback(routes::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::access_gate::<C>,
        ))
        .with_state(state)
}

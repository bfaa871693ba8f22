//! CertPath API: a single Lambda serving every HTTP route.
//!
//! The router resolves the caller from API Gateway authorizer claims or a
//! bearer token and dispatches to one handler per route. Handlers talk to
//! DynamoDB, Cognito and Bedrock only through the traits held in [`AppState`].

pub mod handlers;
pub mod plan;
pub mod recommend;
pub mod router;
pub mod state;

pub use router::handler;
pub use state::AppState;

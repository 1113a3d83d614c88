pub mod client;
pub mod errors;
pub mod mock_clerk;
pub mod models;
pub mod service;
pub mod session;
pub mod webhook;

pub use client::LiveClerkClient;
pub use errors::ClerkError;
pub use mock_clerk::MockClerkService;
pub use models::ClerkUserData;
pub use service::ClerkService;
pub use session::{SessionClaims, SessionVerifier};
pub use webhook::{ClerkWebhookVerifier, IdentityEvent};

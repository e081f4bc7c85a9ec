//! Authentication core.
//!
//! - **Identity verification**: Google ID tokens and Facebook access tokens
//!   are checked with the issuing provider ([`providers`]).
//! - **Federated login**: a verified identity resolves to a local account,
//!   provisioned with the default role on first login ([`FederatedLogin`]).
//! - **Session tokens**: HS256 JWTs carrying user id, username and roles
//!   ([`SessionTokenCodec`]).
//! - **Current principal**: an explicit [`AuthContext`] extracted per request.
//!
//! ## Usage
//!
//! ```ignore
//! let principal = federated.login_with_provider(Provider::Google, &id_token).await?;
//! let token = codec.generate(&principal)?;
//!
//! // later, in a handler
//! async fn handler(ctx: AuthContext) -> AuthResult<String> {
//!     Ok(ctx.current_user_id()?.to_string())
//! }
//! ```

mod context;
mod error;
mod extractor;
mod federation;
pub mod jwks;
mod password;
pub mod providers;
mod token;

pub use context::{AuthContext, Principal};
pub use error::{AuthError, AuthResult};
pub use extractor::{Authenticated, bearer_token};
pub use federation::FederatedLogin;
pub use jwks::{DEFAULT_CACHE_TTL_SECONDS, JwksCache, JwksCacheError};
pub use password::{PasswordLogin, hash_password, random_password_hash, verify_password};
pub use providers::{IdentityPayload, IdentityVerifier, Provider};
pub use token::{SessionClaims, SessionTokenCodec};

pub mod credential;
pub mod firebase;
pub mod local;
pub mod session;

pub use credential::{CredentialProvider, StaticCredentialProvider};
pub use firebase::FirebaseIdentityBackend;
pub use local::LocalIdentityBackend;
pub use session::{AuthError, AuthSession, IdentityBackend, SignedInUser, TokenGrant};

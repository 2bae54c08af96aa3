pub mod actions;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod session;
pub mod storage;
pub mod validation;

// Re-export commonly used types
pub use actions::{
    ClaimDesk, ClaimWorkspace, Dashboard, InFlight, Liveness, Refetched, SubmittedClaim,
};
pub use config::{ConfigError, PortalConfig};
pub use dashboard::{ClaimScope, DashboardStats, StatusFilter};
pub use error::{PortalError, Result};
pub use gateway::{ClaimsApi, DocumentsApi, FraudApi, Gateway, PortalApi};
pub use guard::{Access, decide, decide_route};
pub use lifecycle::{ClaimStatus, Decision, TransitionError};
pub use models::{
    AiServiceHealth, BackendReply, Claim, ClaimDetails, ClaimPage, ClaimQuery, ClaimType,
    Document, DocumentUpload, FraudOutcome, FraudResult, FraudStatistics, ImageStatus, Role,
};
pub use routes::Route;
pub use session::{AuthApi, AuthOutcome, Session, SessionSnapshot, SessionStore, UserIdentity};
pub use storage::{FileTokenStore, InMemoryTokenStore, TokenStore};
pub use validation::{ClaimForm, Registration, RegistrationForm, ValidationError};

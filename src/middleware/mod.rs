pub mod identity;
pub mod observe;
pub mod origin;
pub mod request_id;
pub mod response;

pub use identity::{extract_credential, identity_bootstrap_middleware, BootstrapOutcome, IdentityBootstrap};
pub use observe::{response_observer_middleware, ResponseOutcome, StatusCapture};
pub use origin::{cors_layer, evaluate, origin_guard_middleware, OriginDecision, OriginPolicy, OriginReason};
pub use request_id::{
    assign_request_id, request_id_middleware, RequestId, RequestIdGenerator, UuidGenerator, REQUEST_ID_HEADER,
};
pub use response::ApiResponse;

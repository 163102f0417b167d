pub mod authorization;
pub mod call_plan;
pub mod fees;
pub mod pipeline;
pub mod session;
pub mod signature;
pub mod submitter;

pub use authorization::{AuthorizationDocument, AuthorizationRequest, SignedAuthorization};
pub use call_plan::CallPlan;
pub use pipeline::{
    AccountPipeline, Clock, FixedClock, PipelineObserver, PipelineState, SentTransaction,
    SystemClock,
};
pub use session::{AccountSession, ChainIdentity, FrozenAccount, SessionSnapshot};
pub use submitter::DelegatedSubmitter;

mod idle;
mod session;

pub use idle::IdleEvent;
pub use session::{session_key, Approval, ApprovalStatus, Screenshot, Session, SessionState};

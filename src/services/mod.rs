mod auth;
mod backend;
mod judge;
mod leetcode;

pub use auth::{restore_session, AuthClient, Session, SessionStore, SignUpOutcome};
pub use backend::{AnalysisService, Backend, ProblemService};
pub use judge::JudgeClient;
pub use leetcode::{fetch_question, slug_from_input, LeetCodeQuestion, ProxyClient};

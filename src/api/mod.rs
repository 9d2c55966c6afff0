pub mod client;
pub mod messages;

pub use client::{HttpInterviewApi, InterviewApi};
pub use messages::{ChatRequest, ChatResponse, CompleteRequest, CompleteResponse, JoinResponse};

// Generation workflow: submit a prompt, poll the long-running operation, resolve a clip
pub mod generation;
pub mod retry;

pub use generation::GenerationWorkflow;
pub use retry::RetryPolicy;

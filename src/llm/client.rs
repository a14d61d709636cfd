//! LlmClient trait: the Model interface consumed by the Runner/Planner

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// The Model interface: a synchronous (from the caller's perspective) chat
/// function taking a message list plus a tool spec list and returning
/// either a textual response or a set of tool-call descriptors.
///
/// Non-streaming by design: the Runner never needs partial tokens, only the
/// final [`CompletionResponse`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Scripted-response test double, exposed unconditionally (not `#[cfg(test)]`)
/// so integration tests under `tests/` can depend on it too.
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use tracing::debug;

    /// Scripted-response test double for [`LlmClient`].
    ///
    /// Each call to `complete` pops the next response off a queue; calling
    /// past the end of the queue is a test bug and returns
    /// [`LlmError::InvalidResponse`] rather than panicking, so a misbehaving
    /// Runner surfaces as a normal task failure instead of aborting the test
    /// process.
    pub struct MockLlmClient {
        responses: Mutex<Vec<CompletionResponse>>,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        /// `responses` is consumed front-to-back; reverse order internally
        /// so popping from the back of the `Vec` is O(1).
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self { responses: Mutex::new(responses), calls: Mutex::new(Vec::new()) }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.calls.lock().unwrap().push(request);
            let mut responses = self.responses.lock().unwrap();
            match responses.pop() {
                Some(resp) => Ok(resp),
                None => {
                    debug!("MockLlmClient::complete: no more scripted responses");
                    Err(LlmError::InvalidResponse("MockLlmClient exhausted".to_string()))
                }
            }
        }
    }

}

use async_trait::async_trait;

/// Question/answer service about the deployed contracts
#[async_trait]
pub trait ContractAssistant: Send + Sync {
    /// Answer `question`. Failures are reported as answer text, never as errors.
    async fn ask(&self, question: &str) -> String;

    fn is_enabled(&self) -> bool {
        true
    }
}

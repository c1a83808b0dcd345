use anyhow::Result;
use async_trait::async_trait;

use super::Provider;

/// Answers every prompt with the prompt itself. Lets a chain be exercised
/// end to end without network access or API keys.
pub struct Echo;

#[async_trait]
impl Provider for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        Ok(Some(prompt.to_string()))
    }
}

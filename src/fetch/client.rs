use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport used by the dataset loader for `http(s)` locators.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

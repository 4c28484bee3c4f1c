//! Built-in step executors

mod ai;
mod http;
mod script;
mod scraping;
mod template;
mod transform;

use std::sync::Arc;
use std::time::Duration;

pub use ai::AiExecutor;
pub use http::{HttpExecutor, HttpMethod};
pub use script::{ScriptExecutor, ScriptLanguage, ScriptRuntime};
pub use scraping::{parse_url_list, ScrapingExecutor};
pub use template::TemplateRenderer;
pub use transform::{TextMode, TransformExecutor};

use crate::domain::ai::AiClient;
use crate::domain::executor::ExecutorRegistry;
use crate::domain::prompt::PromptCompiler;
use crate::domain::scraping::ScrapingClient;
use crate::domain::standard::StandardRepository;

/// Collaborators needed by the built-in executors
#[derive(Clone)]
pub struct BuiltinExecutors {
    pub ai_client: Arc<dyn AiClient>,
    pub scraping_client: Arc<dyn ScrapingClient>,
    pub standards: Arc<dyn StandardRepository>,
    pub compiler: PromptCompiler,
    pub default_model: String,
    pub script_runtime: ScriptRuntime,
    pub http_timeout: Duration,
}

impl std::fmt::Debug for BuiltinExecutors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinExecutors")
            .field("default_model", &self.default_model)
            .field("script_runtime", &self.script_runtime)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}

impl BuiltinExecutors {
    /// Registers the ai, scraping, script, http and transform executors
    pub async fn register_all(self, registry: &ExecutorRegistry) {
        let renderer = Arc::new(TemplateRenderer::new(self.compiler, self.standards));

        registry
            .register(Arc::new(AiExecutor::new(
                self.ai_client,
                renderer.clone(),
                self.default_model,
            )))
            .await;
        registry
            .register(Arc::new(ScrapingExecutor::new(self.scraping_client)))
            .await;
        registry
            .register(Arc::new(ScriptExecutor::new(self.script_runtime)))
            .await;
        registry
            .register(Arc::new(HttpExecutor::new(renderer.clone(), self.http_timeout)))
            .await;
        registry
            .register(Arc::new(TransformExecutor::new(renderer)))
            .await;
    }
}

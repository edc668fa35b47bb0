//! Agent 构建器：按配置装配 LLM、推理、缓存、摘要器并创建 PageAgent
//!
//! 未显式提供的组件从 AppConfig 构建；测试中可逐个替换为脚本化实现。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::agent::PageAgent;
use crate::cache::{FileTaskCache, InMemoryTaskCache, NoopTaskCache, TaskCache};
use crate::config::AppConfig;
use crate::core::AgentError;
use crate::inference::{Inference, LlmInference};
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::{LlmSummarizer, Summarizer};
use crate::page::Page;
use crate::task::PageTaskExecutor;

pub struct PageAgentBuilder {
    config: AppConfig,
    page: Option<Arc<dyn Page>>,
    inference: Option<Arc<dyn Inference>>,
    cache: Option<Arc<dyn TaskCache>>,
    llm: Option<Arc<dyn LlmClient>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    cancel: Option<CancellationToken>,
    max_replans: Option<usize>,
}

impl PageAgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            page: None,
            inference: None,
            cache: None,
            llm: None,
            summarizer: None,
            cancel: None,
            max_replans: None,
        }
    }

    pub fn with_page(mut self, page: Arc<dyn Page>) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_inference(mut self, inference: Arc<dyn Inference>) -> Self {
        self.inference = Some(inference);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn TaskCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 推理与摘要共用的 LLM 客户端
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_max_replans(mut self, max_replans: usize) -> Self {
        self.max_replans = Some(max_replans);
        self
    }

    /// 按 [llm] 段创建客户端：provider = openai 且有 API Key 时用 OpenAI 兼容端点，否则用 Mock
    pub fn build_llm(&self) -> Arc<dyn LlmClient> {
        let llm = &self.config.llm;
        if llm.provider == "openai" {
            match self.config.resolve_api_key() {
                Some(key) => {
                    tracing::info!(model = %llm.model, "using OpenAI-compatible LLM");
                    return Arc::new(OpenAiClient::new(
                        llm.base_url.as_deref(),
                        &llm.model,
                        &key,
                        llm.timeouts.request,
                    ));
                }
                None => tracing::warn!("provider is openai but no API key is set, falling back to mock LLM"),
            }
        }
        Arc::new(MockLlmClient::new())
    }

    /// 按 [cache] 段创建缓存：关闭时为空缓存，配置了 path 时为文件缓存，否则为进程内缓存
    pub fn build_cache(&self) -> Result<Arc<dyn TaskCache>, AgentError> {
        let cache = &self.config.cache;
        if !cache.enabled {
            return Ok(Arc::new(NoopTaskCache));
        }
        match &cache.path {
            Some(path) => {
                let cache_id = cache
                    .cache_id
                    .clone()
                    .unwrap_or_else(|| self.config.agent.group_name.clone());
                let file = FileTaskCache::open(path, cache_id)
                    .map_err(|e| AgentError::ConfigError(format!("cache file {}: {}", path.display(), e)))?;
                Ok(Arc::new(file))
            }
            None => Ok(Arc::new(InMemoryTaskCache::new())),
        }
    }

    pub async fn build(self) -> Result<PageAgent, AgentError> {
        let page = self
            .page
            .clone()
            .ok_or_else(|| AgentError::ConfigError("page is required".to_string()))?;
        let llm = match &self.llm {
            Some(llm) => Arc::clone(llm),
            None => self.build_llm(),
        };
        let inference: Arc<dyn Inference> = match &self.inference {
            Some(inference) => Arc::clone(inference),
            None => Arc::new(LlmInference::new(Arc::clone(&llm))),
        };
        let cache = match &self.cache {
            Some(cache) => Arc::clone(cache),
            None => self.build_cache()?,
        };
        let summarizer: Option<Arc<dyn Summarizer>> = match &self.summarizer {
            Some(s) => Some(Arc::clone(s)),
            None if self.config.context.ai_summaries => {
                Some(Arc::new(LlmSummarizer::new(llm)) as Arc<dyn Summarizer>)
            }
            None => None,
        };

        let mut tasks = PageTaskExecutor::new(Arc::clone(&page), Arc::clone(&inference), Arc::clone(&cache))
            .with_cache_enabled(self.config.cache.enabled);
        if let Some(token) = self.cancel.clone() {
            tasks = tasks.with_cancel(token);
        }
        if let Some(max) = self.max_replans {
            tasks = tasks.with_max_replans(max);
        }

        let agent = PageAgent::new(page, inference, cache, summarizer, &self.config)
            .await
            .with_task_executor(tasks);
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{PageSnapshot, StaticPage};

    #[tokio::test]
    async fn test_build_requires_page() {
        let err = PageAgentBuilder::new(AppConfig::default()).build().await.err().unwrap();
        assert!(matches!(err, AgentError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_build_file_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.cache.path = Some(dir.path().join("cache.json"));
        let builder = PageAgentBuilder::new(config)
            .with_page(Arc::new(StaticPage::new(PageSnapshot::default())));
        assert!(builder.build_cache().is_ok());
        assert!(builder.build().await.is_ok());
    }

    #[tokio::test]
    async fn test_context_enabled_starts_run() {
        let config = AppConfig::default()
            .with_context_enabled(true)
            .with_group_name("checkout flow");
        let agent = PageAgentBuilder::new(config)
            .with_page(Arc::new(StaticPage::new(PageSnapshot::default())))
            .build()
            .await
            .unwrap();
        let snapshot = agent.context_snapshot().await.unwrap();
        assert_eq!(snapshot.current_run.unwrap().name, "checkout flow");
    }
}

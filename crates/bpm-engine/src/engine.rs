//! Process engine facade

use crate::config::EngineConfig;
use crate::error::ConfigResult;
use crate::job_executor::JobExecutor;
use crate::services::{
    AuthorizationService, ManagementService, RepositoryService, RuntimeService, ServiceContext,
    TaskService,
};
use bpm_command::{CommandExecutor, CommandSettings, JobHandler, JobHandlerRegistry};
use bpm_correlation::{CorrelationHandler, DefaultCorrelationHandler};
use bpm_store::InMemoryStore;
use bpm_suspension::SuspensionJobHandler;
use bpm_types::Authentication;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// An assembled engine.
///
/// Services are handed out per subject; `None` runs their commands
/// unauthenticated, which bypasses permission checks.
pub struct ProcessEngine {
    config: EngineConfig,
    executor: CommandExecutor,
    correlation_handler: Arc<dyn CorrelationHandler>,
    store: Arc<InMemoryStore>,
    job_executor: Arc<JobExecutor>,
}

impl ProcessEngine {
    pub fn builder() -> ProcessEngineBuilder {
        ProcessEngineBuilder::default()
    }

    /// Build an engine from a TOML file; a missing file yields defaults
    pub fn from_config_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::builder().config(EngineConfig::load(path)?).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn command_executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Backing store, for seeding and inspection
    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    pub fn job_executor(&self) -> &Arc<JobExecutor> {
        &self.job_executor
    }

    pub fn runtime_service(&self, authentication: Option<&Authentication>) -> RuntimeService<'_> {
        RuntimeService::new(self.context(authentication), self.correlation_handler.clone())
    }

    pub fn repository_service(&self, authentication: Option<&Authentication>) -> RepositoryService<'_> {
        RepositoryService::new(self.context(authentication))
    }

    pub fn management_service(&self, authentication: Option<&Authentication>) -> ManagementService<'_> {
        ManagementService::new(self.context(authentication))
    }

    pub fn task_service(&self, authentication: Option<&Authentication>) -> TaskService<'_> {
        TaskService::new(self.context(authentication))
    }

    pub fn authorization_service(
        &self,
        authentication: Option<&Authentication>,
    ) -> AuthorizationService<'_> {
        AuthorizationService::new(self.context(authentication))
    }

    /// Start background job acquisition if it is enabled in the configuration
    pub async fn start(&self) -> Option<JoinHandle<()>> {
        if !self.config.job_executor.enabled {
            return None;
        }
        Some(self.job_executor.clone().start().await)
    }

    pub async fn shutdown(&self) {
        self.job_executor.stop().await;
        info!("Process engine shut down");
    }

    fn context(&self, authentication: Option<&Authentication>) -> ServiceContext<'_> {
        ServiceContext::new(&self.executor, authentication.cloned())
    }
}

impl std::fmt::Debug for ProcessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEngine")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Wires configuration, storage and handlers into a [`ProcessEngine`].
#[derive(Default)]
pub struct ProcessEngineBuilder {
    config: EngineConfig,
    store: Option<Arc<InMemoryStore>>,
    job_handlers: Vec<Arc<dyn JobHandler>>,
    correlation_handler: Option<Arc<dyn CorrelationHandler>>,
}

impl ProcessEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Turn permission enforcement on or off
    pub fn authorization_enabled(mut self, enabled: bool) -> Self {
        self.config.authorization.enabled = enabled;
        self
    }

    pub fn store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register an extra deferred-job handler
    pub fn job_handler(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.job_handlers.push(handler);
        self
    }

    pub fn correlation_handler(mut self, handler: Arc<dyn CorrelationHandler>) -> Self {
        self.correlation_handler = Some(handler);
        self
    }

    /// Validate the configuration and assemble the engine
    pub fn build(self) -> ConfigResult<ProcessEngine> {
        self.config.validate()?;
        let store = self.store.unwrap_or_else(InMemoryStore::shared);

        let job_handlers = SuspensionJobHandler::all()
            .into_iter()
            .chain(self.job_handlers)
            .fold(JobHandlerRegistry::new(), JobHandlerRegistry::with_handler);

        let settings = CommandSettings {
            authorization_enabled: self.config.authorization.enabled,
        };
        let executor = CommandExecutor::new(Arc::new(store.engine_services(settings, job_handlers)));
        let job_executor = Arc::new(JobExecutor::new(
            executor.clone(),
            self.config.job_executor.clone(),
        ));

        info!(
            authorization_enabled = settings.authorization_enabled,
            job_handlers = ?executor.services().job_handlers.handler_types(),
            "Process engine built"
        );

        Ok(ProcessEngine {
            config: self.config,
            executor,
            correlation_handler: self
                .correlation_handler
                .unwrap_or_else(|| Arc::new(DefaultCorrelationHandler)),
            store,
            job_executor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_registers_suspension_handlers() {
        let engine = ProcessEngine::builder().build().unwrap();
        let types = engine.command_executor().services().job_handlers.handler_types();
        assert_eq!(types.len(), 8);
        assert!(types.contains(&"suspend-processdefinition"));
    }

    #[test]
    fn test_authorization_flag_reaches_commands() {
        let engine = ProcessEngine::builder().authorization_enabled(true).build().unwrap();
        assert!(engine.command_executor().services().settings.authorization_enabled);
        assert!(engine.config().authorization.enabled);
    }

    #[test]
    fn test_missing_config_file_builds_defaults() {
        let engine = ProcessEngine::from_config_file("/nonexistent/bpm-engine.toml").unwrap();
        assert_eq!(engine.config(), &EngineConfig::default());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.job_executor.max_jobs_per_acquisition = 0;

        let err = ProcessEngine::builder().config(config).build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert_eq!(
            err.to_string(),
            "Invalid configuration: job_executor.max_jobs_per_acquisition must be at least 1"
        );
    }

    #[tokio::test]
    async fn test_start_is_noop_when_job_executor_disabled() {
        let engine = ProcessEngine::builder().build().unwrap();
        assert!(engine.start().await.is_none());
        assert!(!engine.job_executor().is_running().await);
    }
}

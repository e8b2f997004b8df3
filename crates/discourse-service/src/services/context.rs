//! Service context - dependency container for services
//!
//! Holds the store ports, token service, ID generator, and timing
//! configuration needed by the services. Built once at startup and passed
//! by reference; there is no ambient global state.

use std::sync::Arc;
use std::time::Duration;

use discourse_common::{PresenceConfig, SessionTokenService};
use discourse_core::{GroupStore, PresenceStore, Snowflake, SnowflakeGenerator};

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    presence_store: Arc<dyn PresenceStore>,
    group_store: Arc<dyn GroupStore>,
    session_tokens: Arc<SessionTokenService>,
    snowflake_generator: Arc<SnowflakeGenerator>,
    presence: PresenceConfig,
    sign_out_timeout: Duration,
}

impl ServiceContext {
    /// Start building a context
    #[must_use]
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    /// Get the presence store
    pub fn presence_store(&self) -> &Arc<dyn PresenceStore> {
        &self.presence_store
    }

    /// Get the group store
    pub fn group_store(&self) -> &Arc<dyn GroupStore> {
        &self.group_store
    }

    /// Get the session token service
    pub fn session_tokens(&self) -> &SessionTokenService {
        self.session_tokens.as_ref()
    }

    /// Get the presence timing configuration
    pub fn presence_config(&self) -> &PresenceConfig {
        &self.presence
    }

    /// Bounded wait applied to the offline write during sign-out
    pub fn sign_out_timeout(&self) -> Duration {
        self.sign_out_timeout
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("presence", &self.presence)
            .field("sign_out_timeout", &self.sign_out_timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for creating a ServiceContext
pub struct ServiceContextBuilder {
    presence_store: Option<Arc<dyn PresenceStore>>,
    group_store: Option<Arc<dyn GroupStore>>,
    session_tokens: Option<Arc<SessionTokenService>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    presence: PresenceConfig,
    sign_out_timeout: Duration,
}

impl ServiceContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            presence_store: None,
            group_store: None,
            session_tokens: None,
            snowflake_generator: None,
            presence: PresenceConfig::default(),
            sign_out_timeout: Duration::from_secs(2),
        }
    }

    pub fn presence_store(mut self, store: Arc<dyn PresenceStore>) -> Self {
        self.presence_store = Some(store);
        self
    }

    pub fn group_store(mut self, store: Arc<dyn GroupStore>) -> Self {
        self.group_store = Some(store);
        self
    }

    pub fn session_tokens(mut self, service: Arc<SessionTokenService>) -> Self {
        self.session_tokens = Some(service);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    pub fn presence_config(mut self, config: PresenceConfig) -> Self {
        self.presence = config;
        self
    }

    pub fn sign_out_timeout(mut self, timeout: Duration) -> Self {
        self.sign_out_timeout = timeout;
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns a validation error if a required dependency is missing or the
    /// presence timing configuration is inconsistent
    pub fn build(self) -> super::error::ServiceResult<ServiceContext> {
        use super::error::ServiceError;

        self.presence
            .validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        Ok(ServiceContext {
            presence_store: self
                .presence_store
                .ok_or_else(|| ServiceError::validation("presence_store is required"))?,
            group_store: self
                .group_store
                .ok_or_else(|| ServiceError::validation("group_store is required"))?,
            session_tokens: self
                .session_tokens
                .ok_or_else(|| ServiceError::validation("session_tokens is required"))?,
            snowflake_generator: self
                .snowflake_generator
                .unwrap_or_else(|| Arc::new(SnowflakeGenerator::default())),
            presence: self.presence,
            sign_out_timeout: self.sign_out_timeout,
        })
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

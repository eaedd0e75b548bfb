//! Request-to-derivative pipeline
//!
//! parse -> validate -> cache lookup -> (hit) respond
//!                                   -> (miss) load origin -> transform -> persist -> respond
//!
//! Request errors are raised before the blob store is touched. Store errors
//! are never treated as a miss. In redirect mode a hit is a presence check
//! only; the stored body is never downloaded.

mod cache;
mod origin;
mod persist;
mod response;
mod single_flight;

pub use cache::CacheResolver;
pub use origin::OriginLoader;
pub use persist::Persister;
pub use response::{Outcome, ResponseBody, ResponseBuilder, ResponseEnvelope, TriggerResponse};
pub use single_flight::{FlightGuard, SingleFlight};

use crate::error::log_error;
use derivia_core::{
    Config, DerivativeError, DerivativeKey, RequestPath, ResponseMode, ValidationPolicy,
};
use derivia_processing::TransformEngine;
use derivia_storage::BlobStore;
use std::sync::Arc;
use std::time::Instant;

pub struct DerivativePipeline {
    policy: ValidationPolicy,
    cache: CacheResolver,
    origin: OriginLoader,
    engine: TransformEngine,
    persister: Persister,
    responder: ResponseBuilder,
    single_flight: Option<SingleFlight>,
    redirect: bool,
}

impl DerivativePipeline {
    pub fn new(config: &Config, store: Arc<dyn BlobStore>) -> Self {
        Self::with_engine(config, store, TransformEngine::new(config))
    }

    pub fn with_engine(config: &Config, store: Arc<dyn BlobStore>, engine: TransformEngine) -> Self {
        Self {
            policy: ValidationPolicy::new(config),
            cache: CacheResolver::new(store.clone()),
            origin: OriginLoader::new(config, store.clone()),
            engine,
            persister: Persister::new(config, store),
            responder: ResponseBuilder::new(config),
            single_flight: config.single_flight().then(SingleFlight::new),
            redirect: config.response_mode() == ResponseMode::RedirectToStored,
        }
    }

    /// Name of the configured shadow post-effect
    pub fn post_effect_name(&self) -> &'static str {
        self.engine.post_effect_name()
    }

    /// Run one request to completion. Never fails: errors become envelopes.
    pub async fn handle(&self, raw_path: &str) -> ResponseEnvelope {
        let start = Instant::now();
        match self.run(raw_path).await {
            Ok((key, outcome)) => {
                let hit = outcome.is_cache_hit();
                let envelope = self.responder.success(&key, outcome);
                tracing::info!(
                    key = %key,
                    cache_hit = hit,
                    status = envelope.status_code,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Derivative served"
                );
                envelope
            }
            Err(e) => {
                log_error(&e, raw_path);
                self.responder.error(&e)
            }
        }
    }

    pub async fn run(&self, raw_path: &str) -> Result<(DerivativeKey, Outcome), DerivativeError> {
        let path = RequestPath::parse(raw_path)?;
        let spec = self.policy.validate(&path)?;
        let key = path.derivative_key();

        if let Some(hit) = self.cached(&key).await? {
            return Ok((key, hit));
        }

        let _flight = match &self.single_flight {
            Some(flights) => {
                let guard = flights.acquire(key.as_str()).await;
                // Another request may have finished this key while we waited.
                if let Some(hit) = self.cached(&key).await? {
                    return Ok((key, hit));
                }
                Some(guard)
            }
            None => None,
        };

        let origin = self.origin.load(&path.origin_key()).await?;
        let data = self.engine.transform(&origin, &spec).await?;
        self.persister
            .store(&key, data.clone(), &origin.content_type)
            .await?;

        Ok((
            key,
            Outcome::Created {
                data,
                content_type: origin.content_type,
            },
        ))
    }

    async fn cached(&self, key: &DerivativeKey) -> Result<Option<Outcome>, DerivativeError> {
        if self.redirect {
            return Ok(self.cache.exists(key).await?.then_some(Outcome::Present));
        }
        Ok(self.cache.lookup(key).await?.map(Outcome::Hit))
    }
}

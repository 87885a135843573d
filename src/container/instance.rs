//! # Backing Instance
//!
//! Owned handle for one provisioned instance. The handle is the only owner of
//! the running container until teardown, and teardown happens exactly once:
//!
//! - [`BackingInstance::teardown`] terminates through the runtime; later calls are no-ops
//! - dropping an instance that was never torn down releases the container
//!   through the runtime handle's drop path

use tracing::{debug, info, warn};

use super::{ContainerRuntime, ImageRef, MountSpec, RunningContainer, StartRequest};
use crate::error::FixtureResult;

#[derive(Debug)]
pub struct BackingInstance {
    engine: String,
    image: ImageRef,
    mounts: Vec<MountSpec>,
    id: String,
    host: String,
    port: u16,
    container: Option<Box<dyn RunningContainer>>,
}

impl BackingInstance {
    /// Start an instance through `runtime`
    ///
    /// `host_override` replaces the host reported by the runtime. The
    /// returned coordinates are not guaranteed reachable yet.
    pub async fn provision(
        runtime: &dyn ContainerRuntime,
        request: StartRequest,
        host_override: Option<&str>,
    ) -> FixtureResult<Self> {
        let engine = request.engine.clone();
        let image = request.image.clone();
        let mounts = request.mounts.clone();

        let container = runtime.start(request).await?;
        let host = host_override.unwrap_or(container.host()).to_string();

        debug!(
            engine = %engine,
            container_id = %container.id(),
            host = %host,
            port = container.port(),
            "Backing instance provisioned"
        );

        Ok(Self {
            engine,
            image,
            mounts,
            id: container.id().to_string(),
            host,
            port: container.port(),
            container: Some(container),
        })
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn mounts(&self) -> &[MountSpec] {
        &self.mounts
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_terminated(&self) -> bool {
        self.container.is_none()
    }

    /// Terminate the instance; idempotent
    pub async fn teardown(&mut self) -> FixtureResult<()> {
        let Some(container) = self.container.take() else {
            return Ok(());
        };

        info!(engine = %self.engine, container_id = %self.id, "Tearing down backing instance");
        container.terminate().await
    }
}

impl Drop for BackingInstance {
    fn drop(&mut self) {
        if let Some(container) = self.container.take() {
            warn!(
                engine = %self.engine,
                container_id = %self.id,
                "Backing instance dropped without teardown, releasing container"
            );
            drop(container);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ImageRef;
    use crate::test_helpers::FakeRuntime;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn request() -> StartRequest {
        StartRequest {
            engine: "fake".to_string(),
            image: ImageRef::new("fake-datastore", "1"),
            env: BTreeMap::new(),
            mounts: vec![MountSpec::Tmpfs {
                target: "/var/lib/fake".to_string(),
            }],
            exposed_port: 14330,
            ready_message: None,
            startup_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_provision_reports_runtime_coordinates() {
        let runtime = FakeRuntime::new();
        let mut instance = BackingInstance::provision(&runtime, request(), None)
            .await
            .unwrap();

        assert_eq!(instance.id(), "fake-0000");
        assert_eq!(instance.host(), "127.0.0.1");
        assert_eq!(instance.port(), 40_000);
        assert_eq!(instance.engine(), "fake");
        assert_eq!(instance.mounts().len(), 1);
        assert_eq!(instance.image().to_string(), "fake-datastore:1");

        instance.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_host_override() {
        let runtime = FakeRuntime::new();
        let mut instance = BackingInstance::provision(&runtime, request(), Some("db.internal"))
            .await
            .unwrap();

        assert_eq!(instance.host(), "db.internal");
        instance.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let runtime = FakeRuntime::new();
        let mut instance = BackingInstance::provision(&runtime, request(), None)
            .await
            .unwrap();

        instance.teardown().await.unwrap();
        instance.teardown().await.unwrap();
        assert!(instance.is_terminated());
        drop(instance);

        let record = runtime.record("fake-0000").unwrap();
        assert_eq!(record.terminations, 1);
        assert!(!record.dropped);
    }

    #[tokio::test]
    async fn test_failed_terminate_is_not_retried() {
        let runtime = FakeRuntime::new();
        runtime.fail_terminate_with("no such container");
        let mut instance = BackingInstance::provision(&runtime, request(), None)
            .await
            .unwrap();

        assert!(matches!(
            instance.teardown().await,
            Err(crate::error::FixtureError::Teardown { .. })
        ));
        instance.teardown().await.unwrap();
        assert_eq!(runtime.record("fake-0000").unwrap().releases(), 1);
    }
}

//! # Docker Runtime
//!
//! [`ContainerRuntime`] backed by testcontainers. Containers are started from a
//! `GenericImage`; dropping a handle without terminating it still removes the
//! container through testcontainers' own drop path.

use async_trait::async_trait;
use std::fmt;
use testcontainers::core::{IntoContainerPort, Mount, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest, GenericImage, ImageExt};
use tracing::{debug, info};

use super::{ContainerRuntime, LogStream, MountSpec, RunningContainer, StartRequest};
use crate::error::{FixtureError, FixtureResult};

/// Runtime talking to the local Docker daemon
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerRuntime;

impl DockerRuntime {
    pub fn new() -> Self {
        Self
    }

    fn container_request(request: &StartRequest) -> ContainerRequest<GenericImage> {
        let mut image = GenericImage::new(request.image.name.clone(), request.image.tag.clone())
            .with_exposed_port(request.exposed_port.tcp());

        if let Some(ready) = &request.ready_message {
            image = image.with_wait_for(match ready.stream {
                LogStream::Stdout => WaitFor::message_on_stdout(ready.text.clone()),
                LogStream::Stderr => WaitFor::message_on_stderr(ready.text.clone()),
            });
        }

        let base: ContainerRequest<GenericImage> =
            image.with_startup_timeout(request.startup_timeout);

        let with_env = request
            .env
            .iter()
            .fold(base, |req, (key, value)| req.with_env_var(key, value));

        request.mounts.iter().fold(with_env, |req, mount| {
            req.with_mount(match mount {
                MountSpec::Tmpfs { target } => Mount::tmpfs_mount(target.clone()),
                MountSpec::Bind { source, target } => {
                    Mount::bind_mount(source.clone(), target.clone())
                }
            })
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn start(&self, request: StartRequest) -> FixtureResult<Box<dyn RunningContainer>> {
        let image = request.image.to_string();
        let provision_error = |e: testcontainers::TestcontainersError| {
            FixtureError::provision(request.engine.clone(), image.clone(), e)
        };

        debug!(
            engine = %request.engine,
            image = %image,
            exposed_port = request.exposed_port,
            mounts = request.mounts.len(),
            "Starting container"
        );

        let container = Self::container_request(&request)
            .start()
            .await
            .map_err(provision_error)?;

        let host = container
            .get_host()
            .await
            .map_err(provision_error)?
            .to_string();
        let port = container
            .get_host_port_ipv4(request.exposed_port.tcp())
            .await
            .map_err(provision_error)?;
        let id = container.id().to_string();

        info!(
            engine = %request.engine,
            image = %image,
            container_id = %id,
            host = %host,
            port,
            "Container started"
        );

        Ok(Box::new(DockerContainer {
            id,
            host,
            port,
            inner: container,
        }))
    }
}

struct DockerContainer {
    id: String,
    host: String,
    port: u16,
    inner: ContainerAsync<GenericImage>,
}

impl fmt::Debug for DockerContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerContainer")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RunningContainer for DockerContainer {
    fn id(&self) -> &str {
        &self.id
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn terminate(self: Box<Self>) -> FixtureResult<()> {
        let id = self.id.clone();
        self.inner
            .rm()
            .await
            .map_err(|e| FixtureError::teardown(id, e))
    }
}

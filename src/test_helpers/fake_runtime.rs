//! # Fake Container Runtime
//!
//! In-process [`ContainerRuntime`] that records every start request and counts
//! terminations per container, including releases through `Drop`. Used to
//! check teardown guarantees without Docker.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::container::{ContainerRuntime, RunningContainer, StartRequest};
use crate::error::{FixtureError, FixtureResult};

const FAKE_HOST: &str = "127.0.0.1";
const FIRST_FAKE_PORT: u16 = 40_000;

/// How one fake container ended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Explicit `terminate` calls
    pub terminations: u32,
    /// Released by dropping the handle without terminating
    pub dropped: bool,
}

impl ContainerRecord {
    /// Total number of times the instance was released
    pub fn releases(&self) -> u32 {
        self.terminations + u32::from(self.dropped)
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    requests: Vec<StartRequest>,
    containers: BTreeMap<String, ContainerRecord>,
    fail_start: Option<String>,
    fail_terminate: Option<String>,
}

/// Runtime handing out fake containers on sequential ports
#[derive(Debug, Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<RuntimeState>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent `start` fails with `reason`
    pub fn failing_start(reason: impl Into<String>) -> Self {
        let runtime = Self::new();
        runtime.state.lock().fail_start = Some(reason.into());
        runtime
    }

    /// Every subsequent `terminate` fails with `reason` (the release is still counted)
    pub fn fail_terminate_with(&self, reason: impl Into<String>) {
        self.state.lock().fail_terminate = Some(reason.into());
    }

    pub fn requests(&self) -> Vec<StartRequest> {
        self.state.lock().requests.clone()
    }

    pub fn containers(&self) -> BTreeMap<String, ContainerRecord> {
        self.state.lock().containers.clone()
    }

    pub fn record(&self, id: &str) -> Option<ContainerRecord> {
        self.state.lock().containers.get(id).cloned()
    }

    /// Containers not yet released
    pub fn running(&self) -> usize {
        self.state
            .lock()
            .containers
            .values()
            .filter(|record| record.releases() == 0)
            .count()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn start(&self, request: StartRequest) -> FixtureResult<Box<dyn RunningContainer>> {
        let mut state = self.state.lock();
        let image = request.image.to_string();
        let engine = request.engine.clone();
        state.requests.push(request);

        if let Some(reason) = &state.fail_start {
            return Err(FixtureError::provision(engine, image, reason));
        }

        let index = state.containers.len();
        let id = format!("fake-{index:04}");
        state
            .containers
            .insert(id.clone(), ContainerRecord::default());

        Ok(Box::new(FakeContainer {
            id,
            port: FIRST_FAKE_PORT + index as u16,
            terminated: false,
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct FakeContainer {
    id: String,
    port: u16,
    terminated: bool,
    state: Arc<Mutex<RuntimeState>>,
}

#[async_trait]
impl RunningContainer for FakeContainer {
    fn id(&self) -> &str {
        &self.id
    }

    fn host(&self) -> &str {
        FAKE_HOST
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn terminate(self: Box<Self>) -> FixtureResult<()> {
        let mut this = self;
        this.terminated = true;
        let mut state = this.state.lock();
        if let Some(record) = state.containers.get_mut(&this.id) {
            record.terminations += 1;
        }
        let failure = state.fail_terminate.clone();
        drop(state);

        match failure {
            Some(reason) => Err(FixtureError::teardown(this.id.clone(), reason)),
            None => Ok(()),
        }
    }
}

impl Drop for FakeContainer {
    fn drop(&mut self) {
        if self.terminated {
            return;
        }
        if let Some(record) = self.state.lock().containers.get_mut(&self.id) {
            record.dropped = true;
        }
    }
}

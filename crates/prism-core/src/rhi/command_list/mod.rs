// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The state-diffing command list.
//!
//! A [`CommandList`] records into one exclusively owned
//! [`RhiDeviceContext`]. Before every state change it asks the diff oracle
//! (the live device state, or its own [`BoundState`] when live queries are not
//! available) what is bound, and only issues the backend call when the
//! requested value differs. Every issued change is counted on the profiler.

mod binding;
mod draw;
mod render_pass;
mod timestamp;

pub use self::binding::{TextureAccess, TextureBinding};
pub use self::timestamp::{gpu_memory_used_mb, MemoryQuerySupport};

use crate::rhi::bound_state::BoundState;
use crate::rhi::common::StateQueryMode;
use crate::rhi::context::RhiContext;
use crate::rhi::error::RhiError;
use crate::rhi::pipeline_state::PipelineState;
use crate::rhi::resource::Semaphore;
use crate::rhi::settings::RhiSettings;
use crate::rhi::traits::{RhiCounter, RhiDevice, RhiDeviceContext, RhiProfiler, TimeBlockId};
use std::sync::{Arc, Weak};

/// Lifecycle of a command list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandListState {
    /// Ready for `begin`.
    Idle,
    /// Accepting passes, bindings and draws.
    Recording,
    /// Recording finished, ready for `submit`.
    Ended,
    /// Handed to the GPU. `reset` makes it reusable.
    Submitted,
}

/// The profiler scopes and marker opened for the current pass.
#[derive(Debug, Default)]
struct OpenTimeBlock {
    cpu: Option<TimeBlockId>,
    gpu: Option<TimeBlockId>,
    marker: bool,
}

/// Records render passes, bindings and draws, emitting only the state changes
/// that are actually needed.
///
/// A command list has exactly one owner at a time and is not shared between
/// threads while recording; it holds only weak references to the device,
/// profiler and context it was created from.
pub struct CommandList {
    name: String,
    state: CommandListState,
    context: Weak<RhiContext>,
    profiler: Option<Weak<dyn RhiProfiler>>,
    settings: RhiSettings,
    device_context: Box<dyn RhiDeviceContext>,
    pipeline_state: Option<Arc<PipelineState>>,
    bound: BoundState,
    time_block: Option<OpenTimeBlock>,
}

impl CommandList {
    pub(crate) fn new(
        name: &str,
        context: Weak<RhiContext>,
        device_context: Box<dyn RhiDeviceContext>,
    ) -> Self {
        let (profiler, settings) = match context.upgrade() {
            Some(ctx) => (ctx.profiler().map(Arc::downgrade), ctx.settings()),
            None => (None, RhiSettings::default()),
        };
        Self {
            name: name.to_owned(),
            state: CommandListState::Idle,
            context,
            profiler,
            settings,
            device_context,
            pipeline_state: None,
            bound: BoundState::default(),
            time_block: None,
        }
    }

    /// The debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The lifecycle state.
    pub fn state(&self) -> CommandListState {
        self.state
    }

    /// The pipeline state of the active pass.
    pub fn pipeline_state(&self) -> Option<&Arc<PipelineState>> {
        self.pipeline_state.as_ref()
    }

    /// What this list has bound so far.
    pub fn bound_state(&self) -> &BoundState {
        &self.bound
    }

    /// The settings snapshot taken at the last `begin`.
    pub fn settings(&self) -> &RhiSettings {
        &self.settings
    }

    /// The device context, for backend-specific extensions.
    ///
    /// State changed through it is invisible to the bound-state cache; it is
    /// only picked up when the diff oracle queries live state.
    pub fn device_context(&mut self) -> &mut dyn RhiDeviceContext {
        self.device_context.as_mut()
    }

    /// The diff oracle in effect: live only if both the settings and the backend allow it.
    pub fn state_query_mode(&self) -> StateQueryMode {
        match (
            self.settings.state_query_mode,
            self.device_context.state_query_mode(),
        ) {
            (StateQueryMode::Live, StateQueryMode::Live) => StateQueryMode::Live,
            _ => StateQueryMode::CacheOnly,
        }
    }

    /// Idle to Recording. Takes a fresh snapshot of the context settings.
    pub fn begin(&mut self) -> Result<(), RhiError> {
        self.require_state("begin", CommandListState::Idle)?;
        if let Some(ctx) = self.context.upgrade() {
            self.settings = ctx.settings();
        }
        self.state = CommandListState::Recording;
        Ok(())
    }

    /// Recording to Ended. Closes a pass that was left open.
    pub fn end(&mut self) -> Result<(), RhiError> {
        self.require_state("end", CommandListState::Recording)?;
        if self.pipeline_state.is_some() {
            log::warn!(
                "Command list '{}' ended with an open render pass, closing it",
                self.name
            );
            self.close_pass();
        }
        self.state = CommandListState::Ended;
        Ok(())
    }

    /// Ended to Submitted. The GPU waits on `wait` before executing the list.
    pub fn submit(&mut self, wait: Option<&Semaphore>) -> Result<(), RhiError> {
        self.require_state("submit", CommandListState::Ended)?;
        if let Err(err) = self.device_context.submit(wait.map(Semaphore::handle)) {
            log::error!("Failed to submit command list '{}': {err}", self.name);
            return Err(err.into());
        }
        self.state = CommandListState::Submitted;
        Ok(())
    }

    /// Any state to Idle. Forgets the bound state and the current pipeline.
    pub fn reset(&mut self) {
        self.close_time_block();
        self.pipeline_state = None;
        self.bound.reset();
        self.state = CommandListState::Idle;
    }

    fn require_state(
        &self,
        operation: &'static str,
        expected: CommandListState,
    ) -> Result<(), RhiError> {
        if self.state == expected {
            return Ok(());
        }
        if self.settings.strict_state_machine {
            log::error!(
                "'{operation}' on command list '{}' requires {expected:?}, but it is {:?}",
                self.name,
                self.state
            );
            return Err(RhiError::InvalidState {
                operation,
                state: self.state,
            });
        }
        log::warn!(
            "'{operation}' on command list '{}' called while {:?}, expected {expected:?}",
            self.name,
            self.state
        );
        Ok(())
    }

    fn require_recording(&self, operation: &'static str) -> Result<(), RhiError> {
        self.require_state(operation, CommandListState::Recording)
    }

    fn is_live(&self) -> bool {
        self.state_query_mode() == StateQueryMode::Live
    }

    fn count(&self, counter: RhiCounter) {
        if let Some(profiler) = self.profiler.as_ref().and_then(Weak::upgrade) {
            profiler.increment(counter);
        }
    }

    fn device(&self) -> Result<Arc<dyn RhiDevice>, RhiError> {
        self.context
            .upgrade()
            .map(|ctx| Arc::clone(ctx.device()))
            .ok_or(RhiError::DeviceLost)
    }

    fn precondition(&self, message: String) -> RhiError {
        log::error!("Command list '{}': {message}", self.name);
        RhiError::Precondition(message)
    }
}

impl std::fmt::Debug for CommandList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandList")
            .field("name", &self.name)
            .field("state", &self.state)
            .field(
                "pass",
                &self.pipeline_state.as_ref().and_then(|p| p.name()),
            )
            .finish()
    }
}

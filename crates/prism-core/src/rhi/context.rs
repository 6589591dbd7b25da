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

//! The shared renderer context command lists are created from.

use crate::rhi::command_list::CommandList;
use crate::rhi::error::RhiError;
use crate::rhi::settings::RhiSettings;
use crate::rhi::traits::{GlobalShaderResources, RhiDevice, RhiProfiler};
use std::sync::{Arc, PoisonError, RwLock};

/// Owns the device, the profiler and the global settings.
///
/// Command lists hold only weak references to it and must not outlive it.
pub struct RhiContext {
    device: Arc<dyn RhiDevice>,
    profiler: Option<Arc<dyn RhiProfiler>>,
    settings: RwLock<RhiSettings>,
    global_resources: RwLock<Option<Arc<dyn GlobalShaderResources>>>,
}

impl RhiContext {
    /// Creates a context without a profiler.
    pub fn new(device: Arc<dyn RhiDevice>, settings: RhiSettings) -> Self {
        Self {
            device,
            profiler: None,
            settings: RwLock::new(settings),
            global_resources: RwLock::new(None),
        }
    }

    /// Attaches a profiler.
    pub fn with_profiler(mut self, profiler: Arc<dyn RhiProfiler>) -> Self {
        self.profiler = Some(profiler);
        self
    }

    /// The device.
    pub fn device(&self) -> &Arc<dyn RhiDevice> {
        &self.device
    }

    /// The profiler, if one is attached.
    pub fn profiler(&self) -> Option<&Arc<dyn RhiProfiler>> {
        self.profiler.as_ref()
    }

    /// A snapshot of the current settings.
    pub fn settings(&self) -> RhiSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Modifies the settings in place.
    pub fn update_settings(&self, update: impl FnOnce(&mut RhiSettings)) {
        let mut settings = self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        update(&mut settings);
    }

    /// Installs the hook that binds renderer-wide resources at the start of every pass.
    pub fn set_global_shader_resources(&self, resources: Option<Arc<dyn GlobalShaderResources>>) {
        *self
            .global_resources
            .write()
            .unwrap_or_else(PoisonError::into_inner) = resources;
    }

    /// The installed global resource hook.
    pub fn global_shader_resources(&self) -> Option<Arc<dyn GlobalShaderResources>> {
        self.global_resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Creates a command list recording through a fresh device context.
    pub fn create_command_list(self: &Arc<Self>, name: &str) -> Result<CommandList, RhiError> {
        let device_context = self.device.create_context()?;
        Ok(CommandList::new(name, Arc::downgrade(self), device_context))
    }
}

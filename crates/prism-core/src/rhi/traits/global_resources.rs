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

use crate::rhi::command_list::CommandList;
use crate::rhi::error::RhiError;

/// Binds the renderer-wide resources every pass expects, such as frame
/// constants and common samplers.
///
/// Invoked by the command list at the end of every successful
/// `begin_render_pass`, after the pass's own state and clears.
pub trait GlobalShaderResources: Send + Sync {
    /// Binds the resources through the regular binding calls of `cmd`.
    fn bind(&self, cmd: &mut CommandList) -> Result<(), RhiError>;
}

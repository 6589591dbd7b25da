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

//! The render hardware interface: resource objects, pipeline state, the
//! bound-state cache and the state-diffing command list, plus the contracts
//! a graphics backend implements.

pub mod bound_state;
pub mod clear;
pub mod command_list;
pub mod common;
pub mod context;
pub mod error;
pub mod pipeline_state;
pub mod query;
pub mod resource;
pub mod settings;
pub mod traits;

pub use self::bound_state::BoundState;
pub use self::clear::{ClearFlags, ClearValue, TextureClear};
pub use self::command_list::{CommandList, CommandListState, TextureAccess, TextureBinding};
pub use self::common::*;
pub use self::context::RhiContext;
pub use self::error::{PipelineStateError, QueryError, ResourceError, RhiError};
pub use self::pipeline_state::PipelineState;
pub use self::settings::{RhiSettings, SettingsError};

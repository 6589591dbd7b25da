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

//! The renderer's resource factory: render targets, constant buffers,
//! fixed-function state sets and samplers, created and re-created as the
//! resolution or options change.

mod constants;
mod factory;
mod globals;
mod render_targets;

pub use self::constants::*;
pub use self::factory::*;
pub use self::globals::*;
pub use self::render_targets::*;

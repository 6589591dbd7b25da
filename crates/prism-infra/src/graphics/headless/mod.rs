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

//! The headless reference backend.
//!
//! [`HeadlessDevice`] creates every resource as a plain handle and tracks
//! which ones are alive. Each [`HeadlessContext`] keeps the live pipeline
//! state a real device context would, and appends every call it receives to a
//! [`DeviceCall`] log that tests and tools can inspect.

mod call;
mod context;
mod device;

pub use self::call::DeviceCall;
pub use self::context::HeadlessContext;
pub use self::device::{HeadlessConfig, HeadlessDevice, ObjectKind};

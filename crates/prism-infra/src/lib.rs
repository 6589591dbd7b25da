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

//! Concrete implementations of the Prism RHI contracts.
//!
//! * [`graphics::headless`]: an in-memory backend that keeps live device
//!   state and records every call it receives.
//! * [`telemetry::MetricsProfiler`]: an [`RhiProfiler`](prism_core::rhi::traits::RhiProfiler)
//!   publishing into a `prism-telemetry` registry.
//! * [`imaging::mipmaps`]: CPU mip-chain generation on a worker pool.

#![warn(missing_docs)]

pub mod graphics;
pub mod imaging;
pub mod telemetry;

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

//! Defines the hierarchy of error types for the RHI.

use crate::rhi::command_list::CommandListState;
use std::fmt;
use std::time::Duration;

/// The reason a [`PipelineState`](crate::rhi::pipeline_state::PipelineState) is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStateError {
    /// A compute pipeline also sets a vertex or pixel shader.
    ComputeWithGraphicsShader,
    /// A compute pipeline also sets render targets.
    ComputeWithRenderTargets,
    /// A graphics pipeline has neither a vertex nor a pixel shader.
    MissingShader,
    /// A graphics pipeline has no blend state.
    MissingBlendState,
    /// A graphics pipeline has no depth-stencil state.
    MissingDepthStencilState,
    /// A graphics pipeline has no rasterizer state.
    MissingRasterizerState,
    /// A graphics pipeline leaves the primitive topology unknown.
    UnknownTopology,
    /// A graphics pipeline has neither a swapchain nor any texture render target.
    MissingRenderTargets,
    /// A graphics pipeline sets both a swapchain and color texture targets.
    ConflictingRenderTargets,
}

impl fmt::Display for PipelineStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStateError::ComputeWithGraphicsShader => {
                write!(f, "A compute pipeline cannot carry vertex or pixel shaders")
            }
            PipelineStateError::ComputeWithRenderTargets => {
                write!(f, "A compute pipeline cannot carry render targets")
            }
            PipelineStateError::MissingShader => {
                write!(f, "A graphics pipeline needs a vertex or a pixel shader")
            }
            PipelineStateError::MissingBlendState => write!(f, "Missing blend state"),
            PipelineStateError::MissingDepthStencilState => {
                write!(f, "Missing depth-stencil state")
            }
            PipelineStateError::MissingRasterizerState => write!(f, "Missing rasterizer state"),
            PipelineStateError::UnknownTopology => write!(f, "Primitive topology is unknown"),
            PipelineStateError::MissingRenderTargets => {
                write!(f, "No swapchain or texture render target is set")
            }
            PipelineStateError::ConflictingRenderTargets => {
                write!(f, "Both a swapchain and color texture targets are set")
            }
        }
    }
}

impl std::error::Error for PipelineStateError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The descriptor asks for something the resource kind cannot provide.
    InvalidDescriptor(String),
    /// The resource has no backend object behind it.
    NotBacked(String),
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// The device that owns the resource no longer exists.
    DeviceLost,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::InvalidDescriptor(msg) => write!(f, "Invalid resource descriptor: {msg}"),
            ResourceError::NotBacked(name) => {
                write!(f, "Resource '{name}' has no backend object")
            }
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::DeviceLost => write!(f, "The owning device is gone"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// An error related to GPU queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The backend refused to create a query object.
    CreationFailed(String),
    /// The query result did not become available in time.
    Timeout(Duration),
    /// The wait was cancelled through its token.
    Cancelled,
    /// The query object is not of the kind the operation expects.
    WrongKind,
    /// The adapter does not support this query.
    Unsupported,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::CreationFailed(msg) => write!(f, "Failed to create GPU query: {msg}"),
            QueryError::Timeout(waited) => {
                write!(f, "GPU query result not available after {waited:?}")
            }
            QueryError::Cancelled => write!(f, "GPU query wait was cancelled"),
            QueryError::WrongKind => write!(f, "GPU query is of the wrong kind"),
            QueryError::Unsupported => write!(f, "GPU query is not supported by the adapter"),
        }
    }
}

impl std::error::Error for QueryError {}

/// The top-level error returned by command-list operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RhiError {
    /// The operation is not allowed in the command list's current state.
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the command list was in.
        state: CommandListState,
    },
    /// The pipeline state passed to `begin_render_pass` was rejected.
    InvalidPipelineState(PipelineStateError),
    /// A caller contract was violated (null resource, mismatched blit, ...).
    Precondition(String),
    /// A texture was requested for sampled access while still bound for storage access.
    ResourceHazard {
        /// Name of the offending texture.
        texture: String,
    },
    /// More texture views were requested than a single bind supports.
    TooManyViews {
        /// How many views the call would bind.
        requested: usize,
        /// The supported maximum.
        max: usize,
    },
    /// The operation needs an active render pass.
    NoActivePass,
    /// The device behind the command list was dropped.
    DeviceLost,
    /// A resource-level failure.
    Resource(ResourceError),
    /// A query-level failure.
    Query(QueryError),
}

impl fmt::Display for RhiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RhiError::InvalidState { operation, state } => {
                write!(f, "'{operation}' is not valid while the command list is {state:?}")
            }
            RhiError::InvalidPipelineState(err) => write!(f, "Invalid pipeline state: {err}"),
            RhiError::Precondition(msg) => write!(f, "Precondition violated: {msg}"),
            RhiError::ResourceHazard { texture } => write!(
                f,
                "Texture '{texture}' is bound for storage access and cannot be sampled"
            ),
            RhiError::TooManyViews { requested, max } => {
                write!(f, "Cannot bind {requested} texture views, the maximum is {max}")
            }
            RhiError::NoActivePass => write!(f, "No render pass is active"),
            RhiError::DeviceLost => write!(f, "The device is gone"),
            RhiError::Resource(err) => write!(f, "Resource error: {err}"),
            RhiError::Query(err) => write!(f, "Query error: {err}"),
        }
    }
}

impl std::error::Error for RhiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RhiError::InvalidPipelineState(err) => Some(err),
            RhiError::Resource(err) => Some(err),
            RhiError::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PipelineStateError> for RhiError {
    fn from(err: PipelineStateError) -> Self {
        RhiError::InvalidPipelineState(err)
    }
}

impl From<ResourceError> for RhiError {
    fn from(err: ResourceError) -> Self {
        RhiError::Resource(err)
    }
}

impl From<QueryError> for RhiError {
    fn from(err: QueryError) -> Self {
        RhiError::Query(err)
    }
}

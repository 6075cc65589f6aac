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

//! The OpenGL / OpenGL ES render system.
//!
//! [`GlRenderSystem`] is the façade. It routes every state change through
//! the [`StateCache`] of the current context, which mirrors driver state and
//! drops redundant calls before they reach the [`GlDriver`].

pub mod capabilities;
pub mod context;
pub mod conversions;
pub mod driver;
pub mod enums;
pub mod fixed_function;
pub mod options;
pub mod state_cache;
pub mod stereo;
pub mod system;
pub mod targets;

pub use self::capabilities::{detect_capabilities, parse_version, CapabilityProbe, ProbeOptions};
pub use self::context::ContextManager;
pub use self::conversions::IntoGl;
pub use self::driver::{driver_error_from_code, ContextProvider, GlDriver};
pub use self::fixed_function::FixedFunctionState;
pub use self::state_cache::{CacheLimits, ClipPlaneState, StateCache, TextureBinding};
pub use self::stereo::{DrawBuffer, StereoAction, StereoRenderer};
pub use self::system::{FrameOutcome, GlRenderSystem};
pub use self::targets::{RenderTargetEntry, RenderTargetRegistry};

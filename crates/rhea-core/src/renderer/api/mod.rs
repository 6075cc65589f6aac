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

//! Backend-agnostic data types consumed by the [`RenderSystem`] trait.
//!
//! [`RenderSystem`]: crate::renderer::RenderSystem

pub mod capabilities;
pub mod config;
pub mod operation;
pub mod pipeline;
pub mod program;
pub mod state;
pub mod stats;
pub mod target;
pub mod texture;

pub use self::capabilities::*;
pub use self::config::*;
pub use self::operation::*;
pub use self::pipeline::*;
pub use self::program::*;
pub use self::state::*;
pub use self::stats::*;
pub use self::target::*;
pub use self::texture::*;

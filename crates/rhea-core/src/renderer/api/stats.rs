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

//! Per-frame statistics.

/// Counters for a single rendered frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// A sequential counter for rendered frames.
    pub frame_number: u64,
    /// Draw calls issued.
    pub draw_calls: u32,
    /// Primitives submitted, over all instances.
    pub primitives_rendered: u32,
    /// Vertices submitted.
    pub vertices_rendered: u32,
    /// State changes suppressed by the state cache.
    pub elided_state_changes: u64,
    /// Context switches performed.
    pub context_switches: u32,
}

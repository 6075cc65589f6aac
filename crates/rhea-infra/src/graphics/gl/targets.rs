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

//! The registry of render targets and the contexts they render with.

use std::collections::BTreeMap;

use rhea_core::renderer::{ContextId, RenderError, RenderTargetDesc, RenderTargetId};

/// A registered render target.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetEntry {
    /// How the target was described at creation.
    pub desc: RenderTargetDesc,
    /// The context the target renders with.
    pub context: ContextId,
    /// Whether the target created (and must destroy) that context.
    pub owns_context: bool,
}

/// Assigns ids to render targets and remembers their contexts.
#[derive(Debug)]
pub struct RenderTargetRegistry {
    next_id: u32,
    targets: BTreeMap<RenderTargetId, RenderTargetEntry>,
}

impl Default for RenderTargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTargetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            targets: BTreeMap::new(),
        }
    }

    /// The id the next registration will receive.
    pub fn next_id(&self) -> RenderTargetId {
        RenderTargetId(self.next_id)
    }

    /// Registers a target. Names must be unique.
    pub fn register(
        &mut self,
        desc: RenderTargetDesc,
        context: ContextId,
        owns_context: bool,
    ) -> Result<RenderTargetId, RenderError> {
        if self.find_by_name(&desc.name).is_some() {
            return Err(RenderError::InvalidState(format!(
                "a render target named '{}' already exists",
                desc.name
            )));
        }
        let id = RenderTargetId(self.next_id);
        self.next_id += 1;
        log::debug!(
            "Registered {id} '{}' ({}x{}) on {context}.",
            desc.name,
            desc.width,
            desc.height
        );
        self.targets.insert(
            id,
            RenderTargetEntry {
                desc,
                context,
                owns_context,
            },
        );
        Ok(id)
    }

    /// Removes a target, returning its entry so the caller can release the
    /// context.
    pub fn remove(&mut self, id: RenderTargetId) -> Option<RenderTargetEntry> {
        self.targets.remove(&id)
    }

    /// Looks up a target.
    pub fn get(&self, id: RenderTargetId) -> Option<&RenderTargetEntry> {
        self.targets.get(&id)
    }

    /// Looks up a target by name.
    pub fn find_by_name(&self, name: &str) -> Option<RenderTargetId> {
        self.targets
            .iter()
            .find(|(_, entry)| entry.desc.name == name)
            .map(|(id, _)| *id)
    }

    /// Targets rendering with `context`, in creation order.
    pub fn targets_for_context(&self, context: ContextId) -> Vec<RenderTargetId> {
        self.targets
            .iter()
            .filter(|(_, entry)| entry.context == context)
            .map(|(id, _)| *id)
            .collect()
    }

    /// All targets, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (RenderTargetId, &RenderTargetEntry)> {
        self.targets.iter().map(|(id, entry)| (*id, entry))
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no target is registered.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

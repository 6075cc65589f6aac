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

//! A `ContextProvider` that hands out context ids and records what was asked
//! of it.

use std::any::Any;
use std::collections::HashSet;

use rhea_core::renderer::{ContextId, DriverError, RenderTargetDesc};

use crate::graphics::gl::ContextProvider;

/// One recorded context-system event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    /// A context was created for the named target.
    Created {
        /// The new context.
        context: ContextId,
        /// Name of the window it was created for.
        target: String,
        /// The context it shares objects with.
        shared_with: Option<ContextId>,
    },
    /// A context was made current.
    MadeCurrent(ContextId),
    /// The current context was released.
    Released,
    /// A context was destroyed.
    Destroyed(ContextId),
    /// Buffers of a context were swapped.
    Swapped(ContextId),
}

/// A context provider with no window system behind it.
#[derive(Debug, Clone)]
pub struct HeadlessContextProvider {
    next_id: u32,
    live: HashSet<ContextId>,
    current: Option<ContextId>,
    events: Vec<ContextEvent>,
    extensions: String,
    stereo: bool,
    fail_next_make_current: bool,
}

impl Default for HeadlessContextProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessContextProvider {
    /// Creates a provider with a typical EGL extension string and no stereo.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            live: HashSet::new(),
            current: None,
            events: Vec::new(),
            extensions: "EGL_KHR_image EGL_KHR_image_base EGL_KHR_image_pixmap \
                         EGL_KHR_lock_surface EGL_KHR_fence_sync"
                .to_string(),
            stereo: false,
            fail_next_make_current: false,
        }
    }

    /// Reports quad-buffer stereo support.
    pub fn with_stereo(mut self, stereo: bool) -> Self {
        self.stereo = stereo;
        self
    }

    /// Replaces the extension string.
    pub fn with_extensions(mut self, extensions: &str) -> Self {
        self.extensions = extensions.to_string();
        self
    }

    /// Makes the next `make_current` fail.
    pub fn fail_next_make_current(&mut self) {
        self.fail_next_make_current = true;
    }

    /// The context current on the (single) thread.
    pub fn current(&self) -> Option<ContextId> {
        self.current
    }

    /// Whether a context exists and has not been destroyed.
    pub fn is_live(&self, context: ContextId) -> bool {
        self.live.contains(&context)
    }

    /// All events recorded so far.
    pub fn events(&self) -> &[ContextEvent] {
        &self.events
    }

    /// Clears the event log.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl ContextProvider for HeadlessContextProvider {
    fn create_context(
        &mut self,
        desc: &RenderTargetDesc,
        share_with: Option<ContextId>,
    ) -> Result<ContextId, DriverError> {
        if let Some(shared) = share_with {
            if !self.live.contains(&shared) {
                return Err(DriverError::ContextCreationFailed(format!(
                    "cannot share with destroyed {shared}"
                )));
            }
        }
        let context = ContextId(self.next_id);
        self.next_id += 1;
        self.live.insert(context);
        self.events.push(ContextEvent::Created {
            context,
            target: desc.name.clone(),
            shared_with: share_with,
        });
        Ok(context)
    }

    fn destroy_context(&mut self, context: ContextId) {
        if self.current == Some(context) {
            log::warn!("Destroying {context} while it is current.");
            self.current = None;
        }
        self.live.remove(&context);
        self.events.push(ContextEvent::Destroyed(context));
    }

    fn make_current(&mut self, context: ContextId) -> Result<(), DriverError> {
        if std::mem::take(&mut self.fail_next_make_current) {
            return Err(DriverError::MakeCurrentFailed(format!(
                "eglMakeCurrent failed for {context}"
            )));
        }
        if !self.live.contains(&context) {
            return Err(DriverError::MakeCurrentFailed(format!(
                "{context} does not exist"
            )));
        }
        self.current = Some(context);
        self.events.push(ContextEvent::MadeCurrent(context));
        Ok(())
    }

    fn release_current(&mut self) {
        self.current = None;
        self.events.push(ContextEvent::Released);
    }

    fn swap_buffers(&mut self, context: ContextId) -> Result<(), DriverError> {
        if !self.live.contains(&context) {
            return Err(DriverError::ContextLost);
        }
        self.events.push(ContextEvent::Swapped(context));
        Ok(())
    }

    fn extension_string(&self) -> String {
        self.extensions.clone()
    }

    fn supports_stereo(&self) -> bool {
        self.stereo
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

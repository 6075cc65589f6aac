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

//! Tracks GL contexts, which one is current, and the state cache of each.

use std::collections::HashMap;

use rhea_core::renderer::{ContextId, RenderError, RenderTargetId};

use super::driver::ContextProvider;
use super::state_cache::{CacheLimits, StateCache};

#[derive(Debug, Clone, Copy)]
struct ContextEntry {
    owner: RenderTargetId,
    activated: bool,
}

/// Owns one [`StateCache`] per registered context and performs switches.
#[derive(Debug, Default)]
pub struct ContextManager {
    limits: CacheLimits,
    contexts: HashMap<ContextId, ContextEntry>,
    caches: HashMap<ContextId, StateCache>,
    current: Option<ContextId>,
    main: Option<ContextId>,
}

impl ContextManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the limits used for caches created from now on.
    pub fn set_limits(&mut self, limits: CacheLimits) {
        self.limits = limits;
    }

    /// Registers a context owned by `target`. The first context registered
    /// becomes the main context.
    pub fn register_context(&mut self, target: RenderTargetId, context: ContextId) {
        if self.contexts.contains_key(&context) {
            log::warn!("{context} is already registered; ignoring.");
            return;
        }
        self.contexts.insert(
            context,
            ContextEntry {
                owner: target,
                activated: false,
            },
        );
        self.caches.insert(context, StateCache::new(self.limits));
        if self.main.is_none() {
            log::info!("{context} registered as the main context (owner {target}).");
            self.main = Some(context);
        } else {
            log::debug!("{context} registered (owner {target}).");
        }
    }

    /// Records that `context` was made current outside the manager, as
    /// during the initial capability probe.
    ///
    /// ## Returns
    /// `true` if this is the context's first activation.
    pub fn adopt_current(&mut self, context: ContextId) -> Result<bool, RenderError> {
        let entry = self.contexts.get_mut(&context).ok_or_else(|| {
            RenderError::InvalidState(format!("{context} is not registered"))
        })?;
        let first = !std::mem::replace(&mut entry.activated, true);
        if let Some(cache) = self.caches.get_mut(&context) {
            cache.invalidate();
        }
        self.current = Some(context);
        Ok(first)
    }

    /// Makes `context` current. A no-op when it already is.
    ///
    /// ## Returns
    /// `true` if this is the context's first activation; the caller then
    /// runs one-time initialisation.
    pub fn switch_context(
        &mut self,
        context: ContextId,
        provider: &mut dyn ContextProvider,
    ) -> Result<bool, RenderError> {
        if self.current == Some(context) {
            return Ok(false);
        }
        if !self.contexts.contains_key(&context) {
            log::warn!("Refusing to switch to unregistered {context}.");
            return Err(RenderError::InvalidState(format!(
                "{context} is not registered"
            )));
        }
        if let Some(previous) = self.current.take() {
            log::debug!("Switching context {previous} -> {context}.");
            provider.release_current();
        }
        provider.make_current(context)?;
        self.adopt_current(context)
    }

    /// The context that takes over when `context` goes away: the main
    /// context for a secondary one, otherwise the current context or the
    /// lowest remaining id.
    pub fn successor_of(&self, context: ContextId) -> Option<ContextId> {
        if self.main != Some(context) {
            return self.main;
        }
        self.current
            .filter(|c| *c != context)
            .or_else(|| self.contexts.keys().copied().filter(|c| *c != context).min())
    }

    /// Unregisters a context and drops its cache.
    ///
    /// If it is current, its successor is made current first. Unregistering
    /// the main context promotes the successor to main; only when no other
    /// context remains is nothing left current.
    pub fn unregister_context(
        &mut self,
        context: ContextId,
        provider: &mut dyn ContextProvider,
    ) -> Result<(), RenderError> {
        if !self.contexts.contains_key(&context) {
            log::warn!("Unregistering unknown {context}; ignoring.");
            return Ok(());
        }
        let successor = self.successor_of(context);
        if self.current == Some(context) {
            match successor {
                Some(next) => {
                    self.switch_context(next, provider)?;
                }
                None => {
                    provider.release_current();
                    self.current = None;
                    log::info!("Last {context} unregistered; no context is current.");
                }
            }
        }
        self.contexts.remove(&context);
        self.caches.remove(&context);
        if self.main == Some(context) {
            self.main = successor;
            if let Some(main) = successor {
                log::info!("{main} promoted to main context after {context} was unregistered.");
            }
        }
        log::debug!("{context} unregistered.");
        Ok(())
    }

    /// The current context.
    pub fn current(&self) -> Option<ContextId> {
        self.current
    }

    /// The main context.
    pub fn main(&self) -> Option<ContextId> {
        self.main
    }

    /// The target that owns a context.
    pub fn owner(&self, context: ContextId) -> Option<RenderTargetId> {
        self.contexts.get(&context).map(|e| e.owner)
    }

    /// Whether a context is registered.
    pub fn is_registered(&self, context: ContextId) -> bool {
        self.contexts.contains_key(&context)
    }

    /// The cache of a context.
    pub fn cache(&self, context: ContextId) -> Option<&StateCache> {
        self.caches.get(&context)
    }

    /// The cache of the current context.
    pub fn current_cache(&self) -> Option<&StateCache> {
        self.current.and_then(|c| self.caches.get(&c))
    }

    /// The cache of the current context, mutably.
    pub fn current_cache_mut(&mut self) -> Option<&mut StateCache> {
        let current = self.current?;
        self.caches.get_mut(&current)
    }

    /// Registered contexts, in no particular order.
    pub fn contexts(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.contexts.keys().copied()
    }

    /// Driver calls elided so far, summed over every live cache.
    pub fn total_elided_calls(&self) -> u64 {
        self.caches.values().map(StateCache::elided_calls).sum()
    }

    /// Replaces every cache with an empty one built from new limits.
    ///
    /// Used after the driver recreated its contexts and the limits were
    /// probed again.
    pub fn rebuild_caches(&mut self, limits: CacheLimits) {
        self.limits = limits;
        for cache in self.caches.values_mut() {
            *cache = StateCache::new(limits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{ContextEvent, HeadlessContextProvider};
    use rhea_core::renderer::RenderTargetDesc;

    fn two_contexts() -> (HeadlessContextProvider, ContextManager, ContextId, ContextId) {
        let mut provider = HeadlessContextProvider::new();
        let a = provider
            .create_context(&RenderTargetDesc::window("a", 64, 64, false), None)
            .unwrap();
        let b = provider
            .create_context(&RenderTargetDesc::window("b", 64, 64, false), Some(a))
            .unwrap();
        let mut manager = ContextManager::new();
        manager.register_context(RenderTargetId(1), a);
        manager.register_context(RenderTargetId(2), b);
        (provider, manager, a, b)
    }

    #[test]
    fn first_registered_is_main() {
        let (_, manager, a, _) = two_contexts();
        assert_eq!(manager.main(), Some(a));
        assert_eq!(manager.current(), None);
    }

    #[test]
    fn switch_reports_first_activation_once() {
        let (mut provider, mut manager, a, b) = two_contexts();
        assert!(manager.switch_context(a, &mut provider).unwrap());
        assert!(manager.switch_context(b, &mut provider).unwrap());
        assert!(!manager.switch_context(a, &mut provider).unwrap());
        assert_eq!(provider.current(), Some(a));
    }

    #[test]
    fn switch_to_current_is_noop() {
        let (mut provider, mut manager, a, _) = two_contexts();
        manager.switch_context(a, &mut provider).unwrap();
        provider.clear_events();
        assert!(!manager.switch_context(a, &mut provider).unwrap());
        assert!(provider.events().is_empty());
    }

    #[test]
    fn unregistering_current_secondary_switches_to_main() {
        let (mut provider, mut manager, a, b) = two_contexts();
        manager.switch_context(b, &mut provider).unwrap();
        manager.unregister_context(b, &mut provider).unwrap();
        assert_eq!(manager.current(), Some(a));
        assert!(manager.cache(b).is_none());
        assert!(provider.events().contains(&ContextEvent::MadeCurrent(a)));
    }

    #[test]
    fn unregistering_the_last_context_leaves_nothing_current() {
        let (mut provider, mut manager, a, b) = two_contexts();
        manager.switch_context(a, &mut provider).unwrap();
        manager.unregister_context(b, &mut provider).unwrap();
        manager.unregister_context(a, &mut provider).unwrap();
        assert_eq!(manager.current(), None);
        assert_eq!(manager.main(), None);
        assert_eq!(provider.current(), None);
    }

    #[test]
    fn unregistering_current_main_hands_over_to_a_remaining_context() {
        let (mut provider, mut manager, a, b) = two_contexts();
        manager.switch_context(a, &mut provider).unwrap();
        manager.unregister_context(a, &mut provider).unwrap();
        assert_eq!(manager.current(), Some(b));
        assert_eq!(manager.main(), Some(b));
        assert_eq!(provider.current(), Some(b));
    }

    #[test]
    fn unregistering_main_keeps_a_current_secondary() {
        let (mut provider, mut manager, a, b) = two_contexts();
        manager.switch_context(b, &mut provider).unwrap();
        provider.clear_events();
        manager.unregister_context(a, &mut provider).unwrap();
        assert_eq!(manager.current(), Some(b));
        assert_eq!(manager.main(), Some(b));
        assert_eq!(provider.current(), Some(b));
        assert!(provider.events().is_empty(), "the current context must stay bound");
    }

    #[test]
    fn failed_make_current_is_fatal() {
        let (mut provider, mut manager, a, _) = two_contexts();
        provider.fail_next_make_current();
        let err = manager.switch_context(a, &mut provider).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(manager.current(), None);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Chain-of-responsibility dispatch for resolve/load hooks
//!
//! A [`HookChain`] holds an ordered list of hooks for one operation kind.
//! Dispatching walks the list in order: each hook either returns a result
//! (terminating the chain) or calls [`Next::call`] to delegate to the rest
//! of the chain, possibly with mutated arguments. Past the end of the list,
//! delegation reaches the terminal function the caller supplied for this
//! invocation; the chain never bakes a default in at build time.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::Result;

/// One participant in a hook chain.
///
/// `target` is the primary argument (a specifier or URL), `context` carries
/// per-operation metadata, and `next` is the remainder of the chain. A hook
/// that never touches `next` fully handles the request; a hook that calls
/// `next.call(..)` delegates, and observes the delegated result only after
/// every downstream suspension has resolved.
#[async_trait]
pub trait Hook<C, O>: Send + Sync
where
    C: Send + 'static,
    O: Send + 'static,
{
    /// Handle or delegate one request.
    async fn call(&self, target: String, context: C, next: Next<'_, C, O>) -> Result<O>;
}

/// Terminal function supplied by the caller at dispatch time.
///
/// Same two-argument shape as a hook, without the trailing `next`.
pub trait Terminal<C, O>: Send + Sync {
    /// Produce the default result for a request no hook handled.
    fn call<'a>(&'a self, target: String, context: C) -> BoxFuture<'a, Result<O>>;
}

/// Adapter turning an async closure into a [`Terminal`].
pub struct TerminalFn<F>(F);

/// Wraps an async function as a [`Terminal`].
pub fn terminal_fn<C, O, F, Fut>(f: F) -> TerminalFn<F>
where
    C: Send + 'static,
    O: Send + 'static,
    F: Fn(String, C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    TerminalFn(f)
}

impl<C, O, F, Fut> Terminal<C, O> for TerminalFn<F>
where
    C: Send + 'static,
    O: Send + 'static,
    F: Fn(String, C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    fn call<'a>(&'a self, target: String, context: C) -> BoxFuture<'a, Result<O>> {
        Box::pin((self.0)(target, context))
    }
}

/// The remaining suffix of a hook chain, handed to each hook as its
/// delegation capability.
///
/// Dispatch is index-driven over a shared slice rather than built from
/// recursively constructed closures: each delegation narrows the slice by
/// one and the terminal travels alongside.
pub struct Next<'a, C, O> {
    hooks: &'a [Arc<dyn Hook<C, O>>],
    terminal: &'a dyn Terminal<C, O>,
}

impl<C, O> Clone for Next<'_, C, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, O> Copy for Next<'_, C, O> {}

impl<'a, C, O> Next<'a, C, O>
where
    C: Send + 'static,
    O: Send + 'static,
{
    /// Delegate to the rest of the chain.
    ///
    /// Runs the next hook if one remains, otherwise the terminal. Errors
    /// propagate to the dispatch caller unmodified.
    pub fn call(self, target: impl Into<String>, context: C) -> BoxFuture<'a, Result<O>> {
        let target = target.into();
        match self.hooks.split_first() {
            Some((head, rest)) => head.call(
                target,
                context,
                Next {
                    hooks: rest,
                    terminal: self.terminal,
                },
            ),
            None => self.terminal.call(target, context),
        }
    }
}

/// An ordered, composed hook chain for one operation kind.
pub struct HookChain<C, O> {
    hooks: Vec<Arc<dyn Hook<C, O>>>,
}

impl<C, O> HookChain<C, O>
where
    C: Send + 'static,
    O: Send + 'static,
{
    /// Compose a chain from hooks in invocation order.
    pub fn new(hooks: Vec<Arc<dyn Hook<C, O>>>) -> Self {
        Self { hooks }
    }

    /// Number of hooks in the chain.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the chain has no hooks at all.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run the chain for one request.
    ///
    /// An empty chain behaves exactly as `terminal(target, context)`. The
    /// chain itself performs no I/O and raises no errors of its own.
    pub fn dispatch<'a>(
        &'a self,
        target: impl Into<String>,
        context: C,
        terminal: &'a dyn Terminal<C, O>,
    ) -> BoxFuture<'a, Result<O>> {
        Next {
            hooks: &self.hooks,
            terminal,
        }
        .call(target, context)
    }
}

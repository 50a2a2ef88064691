//! Per-request context attached to events.
//!
//! A [`Scope`] collects breadcrumbs, tags and extra data.  Each future run
//! through [`scoped`] (and each closure run through [`with_scope`]) gets a
//! scope of its own, seeded with a copy of the surrounding one, so
//! concurrent requests never see each other's breadcrumbs.  Code running
//! outside of such a block uses a per-thread scope.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;

use serde_json::Value;

use crate::protocol::{Breadcrumb, Event, Map, Values};

tokio::task_local! {
    static TASK_SCOPE: RefCell<Scope>;
}

thread_local! {
    static THREAD_SCOPE: RefCell<Scope> = RefCell::new(Scope::default());
}

/// Holds contextual data for the current scope.
///
/// The scope is routinely updated by the log relay, which records a
/// breadcrumb for every log record it sees.  Tags and extra data can be
/// set through [`configure_scope`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    pub(crate) breadcrumbs: VecDeque<Breadcrumb>,
    pub(crate) tags: Map<String, String>,
    pub(crate) extra: Map<String, Value>,
}

impl Scope {
    /// Sets a tag to a specific value.
    pub fn set_tag<V: ToString>(&mut self, key: &str, value: V) {
        self.tags.insert(key.to_string(), value.to_string());
    }

    /// Removes a tag.
    pub fn remove_tag(&mut self, key: &str) {
        self.tags.remove(key);
    }

    /// Sets a extra to a specific value.
    pub fn set_extra(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_string(), value);
    }

    /// Removes a extra.
    pub fn remove_extra(&mut self, key: &str) {
        self.extra.remove(key);
    }

    /// Records a breadcrumb, keeping at most `max_breadcrumbs`.
    pub fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb, max_breadcrumbs: usize) {
        if max_breadcrumbs == 0 {
            return;
        }
        self.breadcrumbs.push_back(breadcrumb);
        while self.breadcrumbs.len() > max_breadcrumbs {
            self.breadcrumbs.pop_front();
        }
    }

    /// Returns the recorded breadcrumbs, oldest first.
    pub fn breadcrumbs(&self) -> impl Iterator<Item = &Breadcrumb> {
        self.breadcrumbs.iter()
    }

    /// Deletes current breadcrumbs from the scope.
    pub fn clear_breadcrumbs(&mut self) {
        self.breadcrumbs.clear();
    }

    /// Applies the contained scoped data to fill an event.
    pub fn apply_to_event(&self, event: &mut Event) {
        if event.breadcrumbs.is_empty() {
            event.breadcrumbs = Values::from(self.breadcrumbs.iter().cloned().collect::<Vec<_>>());
        }
        for (key, value) in &self.tags {
            event
                .tags
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        for (key, value) in &self.extra {
            event
                .extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// Invokes a function with the current scope.
///
/// Returns `None` if the scope is unavailable, which happens when it is
/// already borrowed further up the stack or during thread teardown.
pub(crate) fn with_current<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut Scope) -> R,
{
    if TASK_SCOPE.try_with(|_| ()).is_ok() {
        TASK_SCOPE
            .try_with(|cell| cell.try_borrow_mut().ok().map(|mut scope| f(&mut *scope)))
            .ok()
            .flatten()
    } else {
        THREAD_SCOPE
            .try_with(|cell| cell.try_borrow_mut().ok().map(|mut scope| f(&mut *scope)))
            .ok()
            .flatten()
    }
}

fn fork_current() -> RefCell<Scope> {
    RefCell::new(with_current(|scope| scope.clone()).unwrap_or_default())
}

/// Invokes a function that can modify the current scope.
///
/// The function is passed a mutable reference to the current scope and
/// can make modifications to it.  If the scope is unavailable, the
/// function is not called and `R::default()` is returned.
///
/// # Examples
///
/// ```
/// sentry_host::configure_scope(|scope| {
///     scope.set_tag("request_id", "6b5d1c4");
/// });
/// ```
pub fn configure_scope<F, R>(f: F) -> R
where
    R: Default,
    F: FnOnce(&mut Scope) -> R,
{
    with_current(f).unwrap_or_default()
}

/// Runs a future with a scope of its own.
///
/// Breadcrumbs and settings made while the future runs stay inside it.
/// Hosts wrap every request in this so that an event carries only the
/// breadcrumbs of the request that produced it.
pub fn scoped<F: Future>(future: F) -> impl Future<Output = F::Output> {
    TASK_SCOPE.scope(fork_current(), future)
}

/// Temporarily pushes a scope for a single call.
pub fn with_scope<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    TASK_SCOPE.sync_scope(fork_current(), f)
}

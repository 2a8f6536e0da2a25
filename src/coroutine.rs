// The MIT License (MIT)

// Copyright (c) 2015 Rustcc Developers

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! The generic, typed coroutine handle and the type-erased swap machinery
//! underneath it (`gcoroutine.c`'s `coroutine_swap`/`g_coroutine_resume`/
//! `g_coroutine_yield`).

use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::Ordering;

use crate::backend::{self, Action, BoxedFunc, Handle};
use crate::error::{ContractError, CoroutineError, ResumeResult};
use crate::options::Options;

/// A stackful, cooperatively-scheduled coroutine that exchanges values of
/// type `T` with its resumer on every transfer of control.
///
/// Cloning a `Coroutine` increments its reference count (`g_coroutine_ref`);
/// dropping the last clone frees its stack and backing record
/// (`g_coroutine_unref`). A coroutine that has run to completion keeps its
/// `caller` set forever, so it is never resumable again even if a clone
/// outlives it (see `resumable`).
pub struct Coroutine<T: Send + 'static> {
    handle: Handle,
    _marker: PhantomData<fn(T) -> T>,
}

unsafe impl<T: Send + 'static> Send for Coroutine<T> {}

impl<T: Send + 'static> Coroutine<T> {
    /// Spawn with default options (a one megabyte stack, no name).
    pub fn spawn<F>(body: F) -> Coroutine<T>
    where
        F: FnOnce(T) -> T + Send + 'static,
    {
        Coroutine::with_options(&Options::default(), body)
    }

    pub fn with_options<F>(options: &Options, body: F) -> Coroutine<T>
    where
        F: FnOnce(T) -> T + Send + 'static,
    {
        let boxed: BoxedFunc = Box::new(move |data: *mut ()| {
            let input: T = *unsafe { Box::from_raw(data as *mut T) };
            let output = body(input);
            Box::into_raw(Box::new(output)) as *mut ()
        });

        let handle = backend::backend_new(options.stack_size, boxed);
        log::debug!(
            "coroutine {:?} spawned ({}, stack {} bytes)",
            handle,
            options.name.as_deref().unwrap_or("<unnamed>"),
            options.stack_size,
        );
        Coroutine { handle, _marker: PhantomData }
    }

    /// A coroutine is resumable iff nobody is currently resuming it and it
    /// hasn't already run to completion.
    pub fn resumable(&self) -> bool {
        unsafe { (*self.handle).caller.get().is_null() }
    }

    /// Enter (or re-enter) the coroutine, handing it `data`. Blocks until the
    /// coroutine yields or returns.
    ///
    /// Resuming a coroutine that isn't resumable is a contract violation
    /// it is logged and `data` is handed straight
    /// back instead of performing a transfer.
    pub fn resume(&self, data: T) -> ResumeResult<T> {
        if !self.resumable() {
            log::warn!("{}", ContractError::NotResumable);
            return Ok(data);
        }

        let boxed = Box::into_raw(Box::new(data)) as *mut ();
        let (action, out) = raw_resume(self.handle, boxed);
        let value: T = *unsafe { Box::from_raw(out as *mut T) };

        match action {
            Action::Yield => Ok(value),
            Action::Terminate => match unsafe { (*self.handle).panic_payload.take() } {
                Some(payload) => Err(CoroutineError::Panicked(payload)),
                None => Ok(value),
            },
        }
    }
}

impl<T: Send + 'static> Clone for Coroutine<T> {
    fn clone(&self) -> Self {
        unsafe { (*self.handle).ref_count.fetch_add(1, Ordering::SeqCst) };
        Coroutine { handle: self.handle, _marker: PhantomData }
    }
}

impl<T: Send + 'static> Drop for Coroutine<T> {
    fn drop(&mut self) {
        unref_raw(self.handle);
    }
}

/// Yield `data` back to the caller of the currently-executing coroutine's
/// last `resume()`, blocking until it is resumed again, then returns
/// whatever the next `resume()` call supplies.
///
/// Calling this outside of a coroutine is a contract violation: it is
/// logged and `data` is returned unchanged.
pub fn yield_now<T: Send + 'static>(data: T) -> T {
    let boxed = Box::into_raw(Box::new(data)) as *mut ();
    let out = raw_yield(boxed);
    *unsafe { Box::from_raw(out as *mut T) }
}

/// True if the calling thread is currently executing inside a coroutine
/// body (as opposed to a plain thread, or the implicit per-thread leader
/// record a back-end lazily attaches the first time it resumes anything).
pub fn in_coroutine() -> bool {
    backend::backend_in_coroutine()
}

/// Shared swap machinery behind both `resume()` and `yield_now()`
/// (`coroutine_swap` in `gcoroutine.c`). Writes `data` into `to`'s own data
/// slot, transfers control to it, and once it hands control back, drains
/// the resume queue `to` may have populated on itself in the meantime
/// (scheduled waiters are resumed here, on whichever stack regains control,
/// rather than by `to` itself — this is what keeps a chain of
/// lock releases from growing the native stack without bound).
fn coroutine_swap(to: Handle, data: *mut ()) -> (Action, *mut ()) {
    unsafe { (*to).data.set(data) };
    backend::backend_switch(to);
    drain_resume_queue(to);

    let action = unsafe { (*to).last_action.get() };
    match action {
        Action::Yield => {
            let me = backend::backend_self();
            let out = unsafe { (*me).data.get() };
            (Action::Yield, out)
        }
        Action::Terminate => {
            let out = unsafe { (*to).data.get() };
            unref_raw(to);
            (Action::Terminate, out)
        }
    }
}

/// Type-erased `g_coroutine_resume`. `handle` need not have run yet.
pub(crate) fn raw_resume(handle: Handle, data: *mut ()) -> (Action, *mut ()) {
    if unsafe { !(*handle).caller.get().is_null() } {
        log::warn!("{}", ContractError::NotResumable);
        return (Action::Yield, data);
    }

    let caller = backend::backend_self();
    unsafe { (*handle).caller.set(caller) };

    // The first entry into a not-yet-started coroutine also takes the
    // implicit self-reference its trampoline holds while running (see each
    // back-end's trampoline); ref_count starts at 1 for the owner's handle.
    coroutine_swap(handle, data)
}

/// Type-erased `g_coroutine_yield`. Must be called from inside a coroutine.
pub(crate) fn raw_yield(data: *mut ()) -> *mut () {
    if !backend::backend_in_coroutine() {
        log::warn!("{}", ContractError::NotInCoroutine);
        return data;
    }

    let me = backend::backend_self();
    let to = unsafe { (*me).caller.get() };
    unsafe {
        (*me).caller.set(ptr::null_mut());
        (*me).last_action.set(Action::Yield);
    }

    let (_action, out) = coroutine_swap(to, data);
    out
}

/// Push `target` onto the currently-running coroutine's (or leader's) own
/// resume queue, to be drained the next time control returns to whoever
/// resumed it. Used by `CoQueue::schedule`.
pub(crate) fn schedule_for_resume(target: Handle) {
    let me = backend::backend_self();
    unsafe { (*me).resume_queue.borrow_mut().push_back(target) };
}

fn drain_resume_queue(handle: Handle) {
    let queued: Vec<Handle> = {
        let mut q = unsafe { (*handle).resume_queue.borrow_mut() };
        q.drain(..).collect()
    };
    for target in queued {
        raw_resume(target, ptr::null_mut());
    }
}

pub(crate) fn unref_raw(handle: Handle) {
    let header = unsafe { &*handle };
    if header.ref_count.fetch_sub(1, Ordering::SeqCst) == 1 {
        if !header.resume_queue.borrow().is_empty() {
            log::warn!("{}", ContractError::ResumeQueueNotEmpty);
        }
        backend::backend_free(handle);
    }
}

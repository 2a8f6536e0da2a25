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

//! The five-operation back-end interface (`new`/`free`/`switch`/`self`/
//! `in_coroutine`) and the header every back-end's coroutine record shares.
//!
//! Exactly one back-end is compiled in; selection is a `cfg`/feature choice,
//! never a runtime vtable.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;

#[cfg(not(windows))]
pub mod stackswap;

pub mod thread;

#[cfg(windows)]
pub mod fiber;

/// Tag carried across a context switch. Nonzero so both values survive a
/// `setjmp`-style "returns twice" primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub(crate) enum Action {
    Yield = 1,
    Terminate = 2,
}

/// The boxed user body: a single opaque argument in, a single opaque result
/// out.
pub(crate) type BoxedFunc = Box<dyn FnOnce(*mut ()) -> *mut ()>;

/// Fields every back-end's coroutine record must carry at a fixed, leading
/// offset. Rust has no C-style struct
/// inheritance, so each back-end embeds `CoreHeader` as the first field of
/// its own `#[repr(C)]` record and this module's functions cast between
/// `Handle` and the back-end's concrete type by pointer, never by value.
#[repr(C)]
pub(crate) struct CoreHeader {
    pub ref_count: AtomicUsize,
    pub func: Cell<Option<BoxedFunc>>,
    pub data: Cell<*mut ()>,
    pub caller: Cell<Handle>,
    pub resume_queue: RefCell<VecDeque<Handle>>,
    /// Set by a coroutine on itself immediately before it relinquishes
    /// control (an explicit yield, or the trampoline's post-return hand
    /// back), and read by whoever regains control off the *target's*
    /// header to learn why. `backend_switch` itself only moves control;
    /// it carries no return value.
    pub last_action: Cell<Action>,
    /// True for a real, user-spawned coroutine. False for the implicit
    /// per-thread "leader" record a back-end lazily attaches to an
    /// ordinary thread the first time it calls `resume()`, so that
    /// thread has something switchable to wait on too (`self()` is
    /// never null, but `in_coroutine()` is false for it). This is the
    /// discriminator `backend_switch` reads off the *target* handle to
    /// decide whether it's switching to a leader or a real coroutine,
    /// rather than comparing pointers against a cached leader handle.
    pub is_leader: bool,
    /// A body panic caught at the trampoline, re-thrown as a
    /// `CoroutineError::Panicked` on the resumer's side. Panics must never
    /// unwind across a raw context switch.
    pub panic_payload: Cell<Option<Box<dyn Any + Send + 'static>>>,
}

impl CoreHeader {
    pub fn new(is_leader: bool) -> CoreHeader {
        CoreHeader {
            ref_count: AtomicUsize::new(1),
            func: Cell::new(None),
            data: Cell::new(std::ptr::null_mut()),
            caller: Cell::new(std::ptr::null_mut()),
            resume_queue: RefCell::new(VecDeque::new()),
            last_action: Cell::new(Action::Yield),
            is_leader,
            panic_payload: Cell::new(None),
        }
    }
}

/// Opaque coroutine handle as seen by the core runtime: a pointer to the
/// leading `CoreHeader` of whichever back-end record was actually allocated.
pub(crate) type Handle = *mut CoreHeader;

// Back-end selection. The thread-per-coroutine back-end is opted into via the
// `backend-thread` feature (it works everywhere, but pays for every switch
// with a mutex + condvar handshake); otherwise the native back-end for the
// platform is used: fibers on Windows, the POSIX stack-swap back-end
// everywhere else.
#[cfg(feature = "backend-thread")]
pub(crate) use self::thread::{backend_free, backend_in_coroutine, backend_new, backend_self, backend_switch};

#[cfg(all(not(feature = "backend-thread"), windows))]
pub(crate) use self::fiber::{backend_free, backend_in_coroutine, backend_new, backend_self, backend_switch};

#[cfg(all(not(feature = "backend-thread"), not(windows)))]
pub(crate) use self::stackswap::{backend_free, backend_in_coroutine, backend_new, backend_self, backend_switch};

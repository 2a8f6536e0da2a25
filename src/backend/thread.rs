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

//! Thread-per-coroutine back-end: one dedicated OS thread per coroutine,
//! control handed off with a mutex + condvar rendezvous per record. Works on
//! any target `std::thread` supports, at the cost of a real context switch
//! (and a full stack allocation) per coroutine. Grounded in
//! `gcoroutine-gthread.c`'s `runnable`/`GCond` handoff and its lazily
//! attached leader record for ordinary threads — here a `LEADER`
//! thread-local holding its own `RawThread`, never the same slot a real
//! coroutine's record lives in, so it's reclaimed by ordinary `Drop` with no
//! discriminator flag needed.
//!
//! The OS thread itself is spawned lazily, on first resume, rather than at
//! `backend_new` time: a coroutine that is created and then dropped without
//! ever being resumed has no thread to join or abandon.

use std::cell::Cell;
use std::panic;
use std::ptr;
use std::sync::atomic::Ordering;
use std::sync::{Condvar, Mutex};
use std::thread;

use super::{Action, BoxedFunc, CoreHeader, Handle};

/// Baton a single thread waits on: "should I run right now".
struct Waiter {
    runnable: Mutex<bool>,
    cond: Condvar,
}

impl Waiter {
    fn new() -> Waiter {
        Waiter { runnable: Mutex::new(false), cond: Condvar::new() }
    }

    fn wake(&self) {
        let mut runnable = self.runnable.lock().unwrap();
        *runnable = true;
        self.cond.notify_one();
    }

    fn wait(&self) {
        let mut runnable = self.runnable.lock().unwrap();
        while !*runnable {
            runnable = self.cond.wait(runnable).unwrap();
        }
        *runnable = false;
    }
}

#[repr(C)]
struct RawThread {
    header: CoreHeader,
    waiter: Waiter,
    started: Cell<bool>,
    join: Cell<Option<thread::JoinHandle<()>>>,
    stack_size: Cell<usize>,
}

/// Lets the spawned thread closure smuggle a raw pointer across the `Send`
/// boundary; the pointee is heap-owned by the handle itself and only ever
/// touched by the one thread running it plus `backend_switch`/`backend_free`
/// callers who only read `CoreHeader`-level fields via volatile-free Cells.
struct SendPtr(usize);
unsafe impl Send for SendPtr {}

thread_local! {
    static CURRENT: Cell<Handle> = Cell::new(ptr::null_mut());
    static LEADER: Box<RawThread> = Box::new(RawThread {
        header: CoreHeader::new(true),
        waiter: Waiter::new(),
        started: Cell::new(true),
        join: Cell::new(None),
        stack_size: Cell::new(crate::stack::DEFAULT_STACK_SIZE),
    });
}

fn as_raw(handle: Handle) -> *const RawThread {
    handle as *const RawThread
}

fn waiter_of(handle: Handle) -> &'static Waiter {
    unsafe { &(*as_raw(handle)).waiter }
}

pub(crate) fn backend_new(stack_size: usize, body: BoxedFunc) -> Handle {
    let raw = Box::new(RawThread {
        header: CoreHeader::new(false),
        waiter: Waiter::new(),
        started: Cell::new(false),
        join: Cell::new(None),
        stack_size: Cell::new(stack_size),
    });
    let ptr = Box::into_raw(raw);
    let handle = ptr as Handle;
    unsafe { (*handle).func.set(Some(body)) };
    handle
}

fn ensure_started(handle: Handle) {
    let raw = handle as *mut RawThread;
    if unsafe { (*raw).started.get() } {
        return;
    }
    unsafe { (*raw).started.set(true) };

    let stack_size = unsafe { (*raw).stack_size.get() };
    let send_ptr = SendPtr(raw as usize);
    let spawned = thread::Builder::new()
        .stack_size(stack_size)
        .spawn(move || {
            let raw = send_ptr.0 as *mut RawThread;
            let handle = raw as Handle;
            CURRENT.with(|c| c.set(handle));

            // Block until our first resume().
            unsafe { &(*raw).waiter }.wait();

            let header = unsafe { &*handle };
            header.ref_count.fetch_add(1, Ordering::SeqCst);
            let data = header.data.get();
            let body = header.func.take().expect("coroutine body missing at trampoline entry");

            let result = panic::catch_unwind(panic::AssertUnwindSafe(|| body(data)));
            match result {
                Ok(out) => header.data.set(out),
                Err(payload) => header.panic_payload.set(Some(payload)),
            }
            header.last_action.set(Action::Terminate);

            let caller = header.caller.get();
            wake_caller(caller);
        })
        .expect("failed to spawn coroutine thread");

    unsafe { (*raw).join.set(Some(spawned)) };
}

fn wake_caller(caller: Handle) {
    if caller.is_null() {
        LEADER.with(|leader| leader.waiter.wake());
    } else {
        waiter_of(caller).wake();
    }
}

pub(crate) fn backend_free(handle: Handle) {
    // A coroutine is only ever freed once its implicit and owner references
    // are both gone; if it ran at all, its thread has already woken its
    // caller with GCOROUTINE_TERMINATE and is on its way out, so joining
    // here is a brief wait, not a hang. If it never started, there is no
    // thread to join.
    unsafe {
        let raw = Box::from_raw(handle as *mut RawThread);
        if let Some(join) = raw.join.take() {
            let _ = join.join();
        }
    }
}

pub(crate) fn backend_switch(target: Handle) {
    log::debug!("swapping contexts");
    // The OS thread backing `target` is its native stack; `stack_size` was
    // stashed on the record at `backend_new` time and is handed to
    // `thread::Builder` here, the first (and only) time it actually starts.
    ensure_started(target);
    waiter_of(target).wake();

    let me = CURRENT.with(|c| c.get());
    if me.is_null() {
        LEADER.with(|leader| leader.waiter.wait());
    } else {
        waiter_of(me).wait();
    }
}

pub(crate) fn backend_self() -> Handle {
    let current = CURRENT.with(|c| c.get());
    if !current.is_null() {
        return current;
    }
    LEADER.with(|leader| &leader.header as *const CoreHeader as Handle)
}

pub(crate) fn backend_in_coroutine() -> bool {
    !CURRENT.with(|c| c.get()).is_null()
}

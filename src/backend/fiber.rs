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

//! Native fiber back-end for Windows, grounded in `gcoroutine-winfiber.c`.
//! A fiber's start routine gets its `lpParameter` back directly, so unlike
//! the POSIX back-end the trampoline doesn't need to read the thread-local
//! "current" slot to find its own handle — only to publish it for later
//! `self()`/`in_coroutine()` calls.
//!
//! No `winapi`/`windows-sys` dependency: the four entry points this back-end
//! needs are declared here directly rather than pulled in through a crate
//! whose surface we'd use a sliver of.

use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::panic;
use std::ptr;
use std::sync::atomic::Ordering;

use super::{Action, BoxedFunc, CoreHeader, Handle};

#[allow(non_snake_case)]
extern "system" {
    fn ConvertThreadToFiber(lpParameter: *mut c_void) -> *mut c_void;
    fn CreateFiber(
        dwStackSize: usize,
        lpStartAddress: extern "system" fn(*mut c_void),
        lpParameter: *mut c_void,
    ) -> *mut c_void;
    fn SwitchToFiber(lpFiber: *mut c_void);
    fn DeleteFiber(lpFiber: *mut c_void);
}

#[repr(C)]
struct RawFiber {
    header: CoreHeader,
    fiber: Cell<*mut c_void>,
}

thread_local! {
    static CURRENT: Cell<Handle> = Cell::new(ptr::null_mut());
    static LEADER_FIBER: Cell<*mut c_void> = Cell::new(ptr::null_mut());
    static LEADER_HEADER: RefCell<Option<Box<CoreHeader>>> = RefCell::new(None);
}

fn fiber_of(handle: Handle) -> *mut c_void {
    unsafe { (*(handle as *mut RawFiber)).fiber.get() }
}

fn leader_handle() -> Handle {
    LEADER_HEADER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(Box::new(CoreHeader::new(true)));
        }
        slot.as_deref().unwrap() as *const CoreHeader as Handle
    })
}

fn ensure_leader_fiber() {
    LEADER_FIBER.with(|f| {
        if f.get().is_null() {
            let converted = unsafe { ConvertThreadToFiber(ptr::null_mut()) };
            f.set(converted);
        }
    });
}

extern "system" fn trampoline(param: *mut c_void) {
    let handle = param as Handle;
    CURRENT.with(|c| c.set(handle));

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

    loop {
        let caller = header.caller.get();
        backend_switch(caller);
    }
}

pub(crate) fn backend_new(stack_size: usize, body: BoxedFunc) -> Handle {
    let raw = Box::new(RawFiber { header: CoreHeader::new(false), fiber: Cell::new(ptr::null_mut()) });
    let ptr = Box::into_raw(raw);
    let handle = ptr as Handle;
    unsafe { (*handle).func.set(Some(body)) };

    let fiber = unsafe { CreateFiber(stack_size, trampoline, ptr as *mut c_void) };
    unsafe { (*ptr).fiber.set(fiber) };
    handle
}

pub(crate) fn backend_free(handle: Handle) {
    unsafe {
        let raw = Box::from_raw(handle as *mut RawFiber);
        DeleteFiber(raw.fiber.get());
    }
}

pub(crate) fn backend_switch(target: Handle) {
    log::debug!("swapping contexts");
    ensure_leader_fiber();
    let target_is_leader = unsafe { (*target).is_leader };

    let target_fiber = if target_is_leader { LEADER_FIBER.with(|f| f.get()) } else { fiber_of(target) };
    CURRENT.with(|c| c.set(if target_is_leader { ptr::null_mut() } else { target }));
    unsafe {
        SwitchToFiber(target_fiber);
    }
}

pub(crate) fn backend_self() -> Handle {
    let current = CURRENT.with(|c| c.get());
    if !current.is_null() {
        return current;
    }
    leader_handle()
}

pub(crate) fn backend_in_coroutine() -> bool {
    !CURRENT.with(|c| c.get()).is_null()
}

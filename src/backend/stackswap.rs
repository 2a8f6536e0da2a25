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

//! POSIX stack-swap back-end: every coroutine on a given OS thread shares
//! that one thread, switching stacks with `swapcontext`. A new coroutine's
//! context is primed once with `getcontext`/`makecontext`; every switch
//! after that, including the very first, goes through `swapcontext`.
//!
//! Grounded in `gcoroutine-ucontext.c`'s bootstrap dance, simplified by
//! dropping its `sigsetjmp`/`siglongjmp` fast path: that path exists in the
//! original purely to dodge a `swapcontext` syscall on the hot path, it
//! changes no observable behavior, and hand-declaring `sigjmp_buf`'s
//! platform-specific layout is not a risk worth taking here (see DESIGN.md).

use std::cell::{Cell, RefCell, UnsafeCell};
use std::mem;
use std::panic;
use std::ptr;
use std::sync::atomic::Ordering;

use crate::stack::{Stack, StackPool};

use super::{Action, BoxedFunc, CoreHeader, Handle};

#[repr(C)]
struct RawContext {
    header: CoreHeader,
    ctx: UnsafeCell<libc::ucontext_t>,
    stack: RefCell<Option<Stack>>,
}

thread_local! {
    static CURRENT: Cell<Handle> = Cell::new(ptr::null_mut());
    static POOL: RefCell<StackPool> = RefCell::new(StackPool::new());
    static LEADER_CTX: UnsafeCell<libc::ucontext_t> = UnsafeCell::new(unsafe { mem::zeroed() });
    static LEADER_HEADER: RefCell<Option<Box<CoreHeader>>> = RefCell::new(None);
}

fn ctx_of(handle: Handle) -> *mut libc::ucontext_t {
    unsafe { (*(handle as *mut RawContext)).ctx.get() }
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

extern "C" fn trampoline() -> ! {
    let handle = CURRENT.with(|c| c.get());
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
    let stack = POOL.with(|p| p.borrow_mut().take_stack(stack_size));

    let raw = Box::new(RawContext {
        header: CoreHeader::new(false),
        ctx: UnsafeCell::new(unsafe { mem::zeroed() }),
        stack: RefCell::new(None),
    });
    let ptr = Box::into_raw(raw);
    let handle = ptr as Handle;
    unsafe { (*handle).func.set(Some(body)) };

    unsafe {
        let ctx = (*ptr).ctx.get();
        libc::getcontext(ctx);
        (*ctx).uc_stack.ss_sp = stack.start() as *mut libc::c_void;
        (*ctx).uc_stack.ss_size = stack.end() as usize - stack.start() as usize;
        (*ctx).uc_stack.ss_flags = 0;
        (*ctx).uc_link = ptr::null_mut();
        libc::makecontext(ctx, trampoline as extern "C" fn(), 0);
    }
    *unsafe { &(*ptr).stack }.borrow_mut() = Some(stack);

    handle
}

pub(crate) fn backend_free(handle: Handle) {
    unsafe {
        let raw = Box::from_raw(handle as *mut RawContext);
        if let Some(stack) = raw.stack.into_inner() {
            POOL.with(|p| p.borrow_mut().give_stack(stack));
        }
    }
}

pub(crate) fn backend_switch(target: Handle) {
    log::debug!("swapping contexts");
    let target_is_leader = unsafe { (*target).is_leader };

    let me = CURRENT.with(|c| c.get());
    let my_ctx = if me.is_null() { LEADER_CTX.with(|c| c.get()) } else { ctx_of(me) };
    let target_ctx = if target_is_leader { LEADER_CTX.with(|c| c.get()) } else { ctx_of(target) };

    CURRENT.with(|c| c.set(if target_is_leader { ptr::null_mut() } else { target }));
    unsafe {
        libc::swapcontext(my_ctx, target_ctx);
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

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

//! Crate-level lifecycle, nesting, yield, and reference-counting tests,
//! colocated in a single top-level `tests` module rather than split per
//! source file.

use std::cell::RefCell;
use std::rc::Rc;

use crate::coroutine::{in_coroutine, yield_now, Coroutine};
use crate::test_support::SendWrap;

/// Setting a flag from inside a body and freeing the handle afterward
/// leaves the flag set — the resume actually ran the body.
#[test]
fn lifecycle_sets_flag_and_frees_cleanly() {
    let done = Rc::new(RefCell::new(false));
    let captured = SendWrap(done.clone());
    let coro = Coroutine::spawn(move |_: ()| {
        *captured.0.borrow_mut() = true;
    });

    coro.resume(()).unwrap();
    drop(coro); // unref

    assert!(*done.borrow());
}

/// `unref` before the first `resume` frees the coroutine without ever
/// running its body.
#[test]
fn unref_before_first_resume_never_runs_body() {
    let ran = Rc::new(RefCell::new(false));
    let captured = SendWrap(ran.clone());
    let coro = Coroutine::spawn(move |_: ()| {
        *captured.0.borrow_mut() = true;
    });

    drop(coro);
    assert!(!*ran.borrow());
}

/// The body yields `0, 1, 2, 3, 4` in order, then returns `5` having set
/// `done`.
#[test]
fn resume_yield_round_trip_in_order() {
    let done = Rc::new(RefCell::new(false));
    let captured = SendWrap(done.clone());
    let coro = Coroutine::spawn(move |_: i32| {
        for i in 0..5 {
            yield_now(i);
        }
        *captured.0.borrow_mut() = true;
        5
    });

    let mut seen = Vec::new();
    let mut last = coro.resume(0).unwrap();
    seen.push(last);
    while !*done.borrow() {
        last = coro.resume(last).unwrap();
        seen.push(last);
    }

    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    assert!(*done.borrow());
    assert!(!coro.resumable());
}

/// A coroutine recursively creates and resumes itself up to `max = 128`
/// levels deep, incrementing `n_enter` before recursing and `n_return`
/// after. Final `n_enter == n_return == 128`.
const NESTING_DEPTH: u32 = 128;

fn recurse_nested(depth: u32, n_enter: Rc<RefCell<u32>>, n_return: Rc<RefCell<u32>>) {
    *n_enter.borrow_mut() += 1;
    if depth + 1 < NESTING_DEPTH {
        let captured = SendWrap((depth + 1, n_enter.clone(), n_return.clone()));
        let child = Coroutine::spawn(move |_: ()| {
            let (depth, n_enter, n_return) = captured.0;
            recurse_nested(depth, n_enter, n_return);
        });
        child.resume(()).unwrap();
    }
    *n_return.borrow_mut() += 1;
}

#[test]
fn nesting_128_levels_balances_enter_and_return() {
    let n_enter = Rc::new(RefCell::new(0u32));
    let n_return = Rc::new(RefCell::new(0u32));

    let captured = SendWrap((0u32, n_enter.clone(), n_return.clone()));
    let root = Coroutine::spawn(move |_: ()| {
        let (depth, n_enter, n_return) = captured.0;
        recurse_nested(depth, n_enter, n_return);
    });
    root.resume(()).unwrap();

    assert_eq!(*n_enter.borrow(), NESTING_DEPTH);
    assert_eq!(*n_return.borrow(), NESTING_DEPTH);
}

/// Outside any coroutine, `in_coroutine()` is false. Inside a body, it is
/// true, and reverts to false once control yields back out.
#[test]
fn in_coroutine_reflects_execution_context() {
    assert!(!in_coroutine());

    let observed = Rc::new(RefCell::new(false));
    let captured = SendWrap(observed.clone());
    let coro = Coroutine::spawn(move |_: ()| {
        *captured.0.borrow_mut() = in_coroutine();
        yield_now(());
    });

    coro.resume(()).unwrap();
    assert!(*observed.borrow());
    assert!(!in_coroutine());
}

/// A coroutine that has terminated is never resumable again, even though a
/// clone of the handle outlives it.
#[test]
fn terminated_coroutine_is_not_resumable_even_if_cloned() {
    let coro = Coroutine::spawn(|n: i32| n);
    let clone = coro.clone();

    assert!(coro.resumable());
    coro.resume(1).unwrap();

    assert!(!coro.resumable());
    assert!(!clone.resumable());
}

/// `unref` while the body is mid-execution (suspended on a yield) does not
/// free the coroutine — the trampoline's own implicit reference keeps it
/// alive until the body actually returns.
#[test]
fn unref_while_suspended_does_not_free() {
    let dropped = Rc::new(RefCell::new(false));
    let captured = SendWrap(dropped.clone());

    struct DropFlag(Rc<RefCell<bool>>);
    impl Drop for DropFlag {
        fn drop(&mut self) {
            *self.0.borrow_mut() = true;
        }
    }

    let coro = Coroutine::spawn(move |_: ()| {
        let flag = DropFlag(captured.0);
        yield_now(());
        drop(flag);
    });

    coro.resume(()).unwrap(); // suspended inside the body, flag alive
    drop(coro); // owner's reference gone; trampoline's own keeps it alive

    // Nothing ever resumes the body again, so it never reaches its own
    // `drop(flag)` line — the point being only that dropping the owner's
    // handle didn't free the coroutine (and run the body's destructors)
    // out from under the suspended stack.
    assert!(!*dropped.borrow());
}

/// A coroutine created on thread `T` only ever runs on `T`. One coroutine per
/// available core, each spawned and resumed entirely within its own OS
/// thread — every thread must observe `in_coroutine()` flip from false to
/// true and back on its own, and every coroutine's body must see exactly the
/// index its own thread gave it.
#[test]
fn independent_coroutines_across_os_threads() {
    let n = num_cpus::get().max(2);

    let handles: Vec<_> = (0..n)
        .map(|i| {
            std::thread::spawn(move || {
                assert!(!in_coroutine());
                let coro = Coroutine::spawn(move |_: ()| {
                    assert!(in_coroutine());
                    i
                });
                let result = coro.resume(()).unwrap();
                assert!(!in_coroutine());
                result
            })
        })
        .collect();

    let mut results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    results.sort_unstable();
    assert_eq!(results, (0..n).collect::<Vec<_>>());
}

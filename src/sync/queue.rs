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

//! `CoQueue`: a FIFO of suspended coroutines (`GCoQueue`/`g_co_queue_*` in
//! `gcoroutine.c`). The foundation `CoMutex` and `CoRWLock` are built on.
//!
//! A queue is only ever touched by coroutines resident on the same OS
//! thread, so it needs no internal locking of its own —
//! a `RefCell` is enough.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::marker::PhantomData;

use crate::backend::{self, Handle};
use crate::coroutine;
use crate::error::ContractError;

/// FIFO of coroutines waiting on some condition, exchanging values of type
/// `T` with whoever eventually wakes them.
///
/// `CoMutex` and `CoRWLock` both use `CoQueue<()>`, since the data exchanged
/// while blocked on a lock carries no information (any
/// non-null datum returned is a programming error").
pub struct CoQueue<T: Send + 'static> {
    waiters: RefCell<VecDeque<Handle>>,
    _marker: PhantomData<T>,
}

impl<T: Send + 'static> CoQueue<T> {
    pub fn new() -> CoQueue<T> {
        CoQueue { waiters: RefCell::new(VecDeque::new()), _marker: PhantomData }
    }

    /// Append the calling coroutine to the queue, then yield `data` to its
    /// caller. Returns whatever data the coroutine that eventually wakes it
    /// (via `schedule` or `resume_head`) supplies.
    ///
    /// Must be called from inside a coroutine; calling it from a plain
    /// thread is a contract violation that is logged and
    /// returns `data` unchanged without enqueuing anything.
    pub fn yield_to_queue(&self, data: T) -> T {
        if !coroutine::in_coroutine() {
            log::warn!("{}", ContractError::NotInCoroutine);
            return data;
        }
        let me = backend::backend_self();
        self.waiters.borrow_mut().push_back(me);
        coroutine::yield_now(data)
    }

    /// Move up to `n` waiters (or all of them, if `n == -1`) from the head
    /// of this queue into the *calling* coroutine's resume queue, to be
    /// resumed the next time it yields or returns. Returns the count
    /// actually moved.
    ///
    /// `n < -1` is a contract violation: logged,
    /// nothing is moved, `0` is returned.
    pub fn schedule(&self, n: i64) -> i64 {
        if n < -1 {
            log::warn!("{}", ContractError::InvalidScheduleCount);
            return 0;
        }

        let mut waiters = self.waiters.borrow_mut();
        let take = if n == -1 { waiters.len() } else { (n as usize).min(waiters.len()) };

        let mut moved = 0i64;
        for _ in 0..take {
            if let Some(target) = waiters.pop_front() {
                coroutine::schedule_for_resume(target);
                moved += 1;
            }
        }
        moved
    }

    /// Pop the head of the queue and resume it directly with `data`,
    /// returning whatever it produces. Callable from outside a coroutine
    /// (unlike `yield_to_queue`/`schedule`), since it performs the resume
    /// itself rather than deferring it.
    ///
    /// If the queue is empty, `data` is returned unchanged and nothing
    /// happens.
    pub fn resume_head(&self, data: T) -> T {
        let head = self.waiters.borrow_mut().pop_front();
        let target = match head {
            Some(h) => h,
            None => return data,
        };

        let boxed = Box::into_raw(Box::new(data)) as *mut ();
        let (_action, out) = coroutine::raw_resume(target, boxed);
        *unsafe { Box::from_raw(out as *mut T) }
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.borrow().is_empty()
    }
}

impl<T: Send + 'static> Default for CoQueue<T> {
    fn default() -> CoQueue<T> {
        CoQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::CoQueue;
    use crate::coroutine::Coroutine;
    use crate::test_support::SendWrap;

    #[test]
    fn schedule_wakes_queued_waiter_in_order() {
        let queue: Rc<CoQueue<()>> = Rc::new(CoQueue::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let captured = SendWrap((queue.clone(), log.clone()));
        let waiter = Coroutine::spawn(move |_: ()| {
            let (q1, l1) = &captured.0;
            l1.borrow_mut().push("before-wait");
            q1.yield_to_queue(());
            l1.borrow_mut().push("after-wait");
        });

        // Park the waiter on the queue.
        waiter.resume(()).unwrap();
        assert_eq!(*log.borrow(), vec!["before-wait"]);
        assert!(!queue.is_empty());

        // A second coroutine schedules it, then yields (runs to completion,
        // which triggers the drain identically).
        let captured = SendWrap(queue.clone());
        let scheduler = Coroutine::spawn(move |_: ()| {
            let moved = captured.0.schedule(1);
            assert_eq!(moved, 1);
        });
        scheduler.resume(()).unwrap();

        assert_eq!(*log.borrow(), vec!["before-wait", "after-wait"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn resume_head_wakes_the_waiter_directly_with_given_data() {
        let queue: Rc<CoQueue<i32>> = Rc::new(CoQueue::new());
        let captured = SendWrap(queue.clone());
        let coro = Coroutine::spawn(move |n: i32| captured.0.yield_to_queue(n + 1));

        let first = coro.resume(1).unwrap();
        assert_eq!(first, 2);
        assert!(!queue.is_empty());

        // `resume_head` performs the resume itself rather than deferring it
        // through a `schedule`; the waiter's body sees 99 and returns it.
        let produced = queue.resume_head(99);
        assert_eq!(produced, 99);
        assert!(queue.is_empty());
    }

    #[test]
    fn schedule_all_with_negative_one() {
        let queue: Rc<CoQueue<()>> = Rc::new(CoQueue::new());
        let count = Rc::new(RefCell::new(0));

        let mut waiters = Vec::new();
        for _ in 0..3 {
            let captured = SendWrap((queue.clone(), count.clone()));
            let coro = Coroutine::spawn(move |_: ()| {
                let (q, c) = &captured.0;
                q.yield_to_queue(());
                *c.borrow_mut() += 1;
            });
            coro.resume(()).unwrap();
            waiters.push(coro);
        }
        assert_eq!(*count.borrow(), 0);

        let captured = SendWrap(queue.clone());
        let scheduler = Coroutine::spawn(move |_: ()| {
            let moved = captured.0.schedule(-1);
            assert_eq!(moved, 3);
        });
        scheduler.resume(()).unwrap();

        assert_eq!(*count.borrow(), 3);
        assert!(queue.is_empty());
    }
}

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

//! `CoMutex`: a cooperative binary lock built on `CoQueue`
//! (`g_co_mutex_*` in `gcoroutine.c`).

use std::cell::Cell;

use crate::error::ContractError;
use crate::sync::queue::CoQueue;

/// A binary lock for coroutines. Strictly non-reentrant: locking twice from
/// the same coroutine deadlocks, exactly as `g_co_mutex_lock` does — the
/// caller is responsible for not doing that.
pub struct CoMutex {
    queue: CoQueue<()>,
    locked: Cell<bool>,
}

impl CoMutex {
    pub fn new() -> CoMutex {
        CoMutex { queue: CoQueue::new(), locked: Cell::new(false) }
    }

    /// Block (by yielding to the wait queue) until the lock is free, then
    /// take it. The loop around `yield_to_queue` guards against spurious
    /// wakeups, matching `g_co_mutex_lock`'s `while (mutex->locked)`.
    pub fn lock(&self) {
        while self.locked.get() {
            self.queue.yield_to_queue(());
        }
        self.locked.set(true);
    }

    /// Release the lock and wake exactly one FIFO waiter, if any.
    ///
    /// Unlocking a mutex that isn't locked is a contract violation (section
    /// 7): logged, no-op.
    pub fn unlock(&self) {
        if !self.locked.get() {
            log::warn!("{}", ContractError::NotLocked);
            return;
        }
        self.locked.set(false);
        self.queue.schedule(1);
    }
}

impl Default for CoMutex {
    fn default() -> CoMutex {
        CoMutex::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::CoMutex;
    use crate::coroutine::Coroutine;
    use crate::test_support::SendWrap;

    /// Three coroutines prepared in order A, B, C each do `lock; yield;
    /// unlock`. A acquires immediately; B and C queue. Resuming A's unlock
    /// path hands the lock to B; resuming B's hands it to C. A sequence
    /// counter must advance through exactly the 4 checkpoints the mutex
    /// ordering scenario below describes.
    #[test]
    fn fifo_ordering_across_three_waiters() {
        let mutex = Rc::new(CoMutex::new());
        let seq = Rc::new(RefCell::new(Vec::new()));

        let mut coros = Vec::new();
        for name in ["A", "B", "C"] {
            let captured = SendWrap((mutex.clone(), seq.clone(), name));
            let coro = Coroutine::spawn(move |_: ()| {
                let (m, s, name) = &captured.0;
                m.lock();
                s.borrow_mut().push(format!("{name}-acquired"));
                crate::coroutine::yield_now(());
                m.unlock();
                s.borrow_mut().push(format!("{name}-released"));
            });
            coros.push(coro);
        }

        // A acquires on its first resume; B and C queue behind it.
        coros[0].resume(()).unwrap();
        coros[1].resume(()).unwrap();
        coros[2].resume(()).unwrap();
        assert_eq!(*seq.borrow(), vec!["A-acquired"]);

        // A releases -> schedules B (deferred to A's own next yield/return,
        // which is immediate here since A's body has nothing left to do).
        coros[0].resume(()).unwrap();
        assert_eq!(*seq.borrow(), vec!["A-acquired", "A-released", "B-acquired"]);

        // B releases -> schedules C.
        coros[1].resume(()).unwrap();
        assert_eq!(
            *seq.borrow(),
            vec!["A-acquired", "A-released", "B-acquired", "B-released", "C-acquired"]
        );

        // C releases; no one left queued.
        coros[2].resume(()).unwrap();
        assert_eq!(
            *seq.borrow(),
            vec![
                "A-acquired", "A-released", "B-acquired", "B-released", "C-acquired", "C-released"
            ]
        );
    }

    #[test]
    fn unlock_without_lock_is_logged_not_fatal() {
        let _ = env_logger::try_init();
        let mutex = CoMutex::new();
        mutex.unlock(); // must not panic
        assert!(!mutex.locked.get());
    }
}

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

//! `CoRWLock`: a cooperative multi-reader/single-writer lock built on
//! `CoQueue` (`g_co_rw_lock_*` in `gcoroutine.c`).

use std::cell::Cell;

use crate::error::ContractError;
use crate::sync::queue::CoQueue;

/// Invariant: never `writer && reader > 0` at the same time. Pure FIFO on
/// the underlying queue — no reader or writer preference.
pub struct CoRWLock {
    queue: CoQueue<()>,
    reader: Cell<i64>,
    writer: Cell<bool>,
}

impl CoRWLock {
    pub fn new() -> CoRWLock {
        CoRWLock { queue: CoQueue::new(), reader: Cell::new(0), writer: Cell::new(false) }
    }

    /// Recursive: repeatable by the same coroutine and concurrently by
    /// others, as long as no writer holds the lock.
    pub fn reader_lock(&self) {
        while self.writer.get() {
            self.queue.yield_to_queue(());
        }
        self.reader.set(self.reader.get() + 1);
    }

    /// Releasing the last reader wakes exactly one FIFO waiter — typically
    /// the front writer, if one is queued, but a queued reader woken this
    /// way simply proceeds too (`writer` is false), which is acceptable.
    ///
    /// Called with no outstanding reader is a contract violation: logged,
    /// no-op.
    pub fn reader_unlock(&self) {
        let count = self.reader.get();
        if count == 0 {
            log::warn!("{}", ContractError::ReaderUnderflow);
            return;
        }
        self.reader.set(count - 1);
        if count - 1 == 0 {
            self.queue.schedule(1);
        }
    }

    pub fn writer_lock(&self) {
        while self.writer.get() || self.reader.get() > 0 {
            self.queue.yield_to_queue(());
        }
        self.writer.set(true);
    }

    /// Wakes *all* waiters (`schedule(-1)`): the writer case can't know in
    /// advance how many readers are queued behind it, so it wakes everyone
    /// and lets each re-check the invariant itself.
    ///
    /// Called without holding the write lock is a contract violation:
    /// logged, no-op.
    pub fn writer_unlock(&self) {
        if !self.writer.get() {
            log::warn!("{}", ContractError::NotWriteLocked);
            return;
        }
        self.writer.set(false);
        self.queue.schedule(-1);
    }
}

impl Default for CoRWLock {
    fn default() -> CoRWLock {
        CoRWLock::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::CoRWLock;
    use crate::coroutine::Coroutine;
    use crate::test_support::SendWrap;

    /// A writer holds the lock; two readers enqueue behind it. Releasing
    /// the writer wakes both (schedule(-1)), and a subsequent writer waits
    /// until both readers release.
    #[test]
    fn writer_then_two_readers_then_writer() {
        let lock = Rc::new(CoRWLock::new());
        let seq = Rc::new(RefCell::new(0u32));

        let captured = SendWrap((lock.clone(), seq.clone()));
        let writer = Coroutine::spawn(move |_: ()| {
            let (l, s) = &captured.0;
            l.writer_lock();
            *s.borrow_mut() = 1;
            crate::coroutine::yield_now(());
            l.writer_unlock();
        });
        writer.resume(()).unwrap();
        assert_eq!(*seq.borrow(), 1);

        let mut readers = Vec::new();
        for _ in 0..2 {
            let captured = SendWrap((lock.clone(), seq.clone()));
            let reader = Coroutine::spawn(move |_: ()| {
                let (l, s) = &captured.0;
                l.reader_lock();
                *s.borrow_mut() += 1;
                l.reader_unlock();
            });
            reader.resume(()).unwrap();
            readers.push(reader);
        }
        // Both readers are parked behind the writer.
        assert_eq!(*seq.borrow(), 1);

        // Writer releases: schedule(-1) wakes both readers (deferred to the
        // writer's own next suspension point, which is immediate here).
        writer.resume(()).unwrap();
        assert_eq!(*seq.borrow(), 3);

        // A second writer queues until both readers have released — they
        // already have by the time it asks, so it proceeds immediately.
        let captured = SendWrap((lock.clone(), seq.clone()));
        let writer2 = Coroutine::spawn(move |_: ()| {
            let (l, s) = &captured.0;
            l.writer_lock();
            *s.borrow_mut() = 4;
            l.writer_unlock();
        });
        writer2.resume(()).unwrap();
        assert_eq!(*seq.borrow(), 4);
    }

    #[test]
    fn reader_unlock_without_reader_is_logged_not_fatal() {
        let _ = env_logger::try_init();
        let lock = CoRWLock::new();
        lock.reader_unlock(); // must not panic
        assert_eq!(lock.reader.get(), 0);
    }

    #[test]
    fn writer_unlock_without_writer_is_logged_not_fatal() {
        let _ = env_logger::try_init();
        let lock = CoRWLock::new();
        lock.writer_unlock(); // must not panic
        assert!(!lock.writer.get());
    }
}

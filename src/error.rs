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

use std::any::Any;
use std::fmt;

/// A contract the caller violated: resuming a coroutine that isn't
/// resumable, yielding outside of coroutine context, and the like.
///
/// These are never fatal. The offending call logs a warning (see the
/// `log` crate usage throughout this crate) and returns a sentinel instead
/// of performing the requested transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractError {
    /// `resume()` was called on a coroutine whose `caller` is already set.
    NotResumable,
    /// `yield_now()` was called from a thread that is not inside a coroutine.
    NotInCoroutine,
    /// `unref()` dropped the last reference while the resume queue was
    /// still non-empty.
    ResumeQueueNotEmpty,
    /// `CoMutex::unlock()` was called on a mutex that isn't locked.
    NotLocked,
    /// `CoRWLock` unlock called without the matching lock held.
    NotWriteLocked,
    ReaderUnderflow,
    /// `CoQueue::schedule(n)` was called with `n < -1`.
    InvalidScheduleCount,
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match *self {
            ContractError::NotResumable => "coroutine is not resumable (already running or nested)",
            ContractError::NotInCoroutine => "not running inside a coroutine",
            ContractError::ResumeQueueNotEmpty => "unref() of a coroutine with a non-empty resume queue",
            ContractError::NotLocked => "unlock() of a mutex that is not locked",
            ContractError::NotWriteLocked => "writer_unlock() without a held write lock",
            ContractError::ReaderUnderflow => "reader_unlock() with no outstanding reader",
            ContractError::InvalidScheduleCount => "schedule(n) called with n < -1",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ContractError {}

/// The outcome of resuming a coroutine whose body may have panicked.
#[derive(Debug)]
pub enum CoroutineError {
    /// The body panicked; the payload is the one `std::panic::catch_unwind`
    /// captured, re-surfaced on the resumer's side. `gcoroutine.c` has no
    /// equivalent, since C has no unwinding to catch.
    Panicked(Box<dyn Any + Send + 'static>),
}

impl fmt::Display for CoroutineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "coroutine body panicked")
    }
}

impl std::error::Error for CoroutineError {}

pub type ResumeResult<T> = Result<T, CoroutineError>;

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

//! Stackful, cooperative coroutines with coroutine-aware synchronization
//! primitives, ported from GLib's `gcoroutine.c`/`gcoroutine-ucontext.c`/
//! `gcoroutine-gthread.c`/`gcoroutine-winfiber.c`.
//!
//! A [`Coroutine<T>`] is a lightweight execution context with its own
//! stack, running inside the OS thread that created it. Control transfer
//! between coroutines is always explicit — [`Coroutine::resume`] to enter
//! one, [`yield_now`] to hand control back — never preemptive. Three
//! interchangeable back-ends implement the actual context switch (see the
//! `backend` module); none of that detail is visible from here.
//!
//! ```
//! use corowl::Coroutine;
//!
//! let coro = Coroutine::spawn(|n: i32| {
//!     let n = corowl::yield_now(n + 1);
//!     n * 2
//! });
//!
//! assert_eq!(coro.resume(1).unwrap(), 2); // first yield_now's argument
//! assert_eq!(coro.resume(10).unwrap(), 20); // body's return value
//! ```
//!
//! `sync` builds a FIFO wait queue, a binary mutex, and a multi-reader/
//! single-writer lock on top of the core runtime, all purely cooperative —
//! none of it touches a back-end directly.

mod backend;
pub mod coroutine;
pub mod error;
mod options;
pub mod stack;
pub mod sync;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod tests;

pub use crate::coroutine::{in_coroutine, yield_now, Coroutine};
pub use crate::error::{ContractError, CoroutineError, ResumeResult};
pub use crate::options::{Builder, Options};

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

//! Stack allocation for the stack-swap backend.
//!
//! A coroutine's stack is a fixed-size region of memory the context switch
//! primitive points the stack pointer into. On platforms that support it we
//! guard the low page against overflow with `mprotect`; elsewhere we fall
//! back to a plain heap allocation.

pub use self::pool::StackPool;

#[cfg(unix)]
pub use self::protected::Stack;

#[cfg(not(unix))]
pub use self::standard::Stack;

pub mod pool;

#[cfg(unix)]
pub mod protected;

#[cfg(not(unix))]
pub mod standard;

/// One megabyte, the stack size `gcoroutine-ucontext.c` allocates per coroutine.
pub const DEFAULT_STACK_SIZE: usize = 1 << 20;

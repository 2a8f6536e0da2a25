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

use std::fmt;

/// Plain heap-allocated stack for targets without `mprotect`/`VirtualProtect`.
///
/// No guard page: an overflow here corrupts adjacent memory instead of
/// faulting. Only used when the platform gives us no better option.
pub struct Stack {
    buf: Vec<u8>,
    min_size: usize,
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Stack {{ min_size: {} }}", self.min_size)
    }
}

impl Stack {
    pub fn new(size: usize) -> Stack {
        Stack { buf: vec![0u8; size], min_size: size }
    }

    pub fn start(&self) -> *const u8 {
        self.buf.as_ptr()
    }

    pub fn end(&self) -> *const u8 {
        unsafe { self.buf.as_ptr().add(self.buf.len()) }
    }

    #[inline(always)]
    pub fn min_size(&self) -> usize {
        self.min_size
    }
}

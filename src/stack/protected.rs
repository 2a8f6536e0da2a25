// Copyright 2013 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
//
// The MIT License (MIT)

// Copyright (c) 2015 Rustcc Developers

//  Permission is hereby granted, free of charge, to any person obtaining a
//  copy of this software and associated documentation files (the "Software"),
//  to deal in the Software without restriction, including without limitation
//  the rights to use, copy, modify, merge, publish, distribute, sublicense,
//  and/or sell copies of the Software, and to permit persons to whom the
//  Software is furnished to do so, subject to the following conditions:
//
//  The above copyright notice and this permission notice shall be included in
//  all copies or substantial portions of the Software.
//
//  THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
//  OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//  FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//  AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//  LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
//  FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
//  DEALINGS IN THE SOFTWARE.

use std::fmt;
use std::ptr;

fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

/// A coroutine's stack, backed by an anonymous `mmap` with a guarded low page.
///
/// The guard page is `mprotect`'d to `PROT_NONE` so a stack overflow faults
/// instead of silently corrupting whatever memory follows.
pub struct Stack {
    ptr: *mut libc::c_void,
    len: usize,
    min_size: usize,
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Stack {{ ptr: {:?}, min_size: {} }}", self.ptr, self.min_size)
    }
}

unsafe impl Send for Stack {}

impl Stack {
    /// Allocate a new stack of at least `size` bytes, rounded up to a whole
    /// number of pages plus one guard page.
    pub fn new(size: usize) -> Stack {
        let page = page_size();
        let len = round_up(size, page) + page;

        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            // Resource exhaustion: abort. The public API has no recoverable
            // path for a failed stack allocation.
            abort_on_oom("mmap");
        }

        if !protect_guard_page(ptr, page) {
            abort_on_oom("mprotect");
        }

        Stack { ptr, len, min_size: size }
    }

    /// Point to the low end of the allocated stack (the guard page).
    pub fn start(&self) -> *const u8 {
        self.ptr as *const u8
    }

    /// Point one byte beyond the high end of the allocated stack; this is
    /// where a stack pointer begins, since the stack grows downward.
    pub fn end(&self) -> *const u8 {
        unsafe { (self.ptr as *const u8).add(self.len) }
    }

    /// The size requested at construction (not including the guard page).
    #[inline(always)]
    pub fn min_size(&self) -> usize {
        self.min_size
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr, self.len);
        }
    }
}

#[cfg(unix)]
fn protect_guard_page(base: *mut libc::c_void, page: usize) -> bool {
    // The stack grows from high to low addresses, so the first page of the
    // mapping is the one a deep call chain will hit first.
    unsafe { libc::mprotect(base, page, libc::PROT_NONE) == 0 }
}

fn round_up(n: usize, multiple: usize) -> usize {
    if n % multiple == 0 {
        n
    } else {
        n + (multiple - n % multiple)
    }
}

fn abort_on_oom(what: &str) -> ! {
    log::error!("stack allocation failed: {} returned an error", what);
    std::process::abort();
}

#[cfg(test)]
mod tests {
    use super::Stack;

    #[test]
    fn stack_bounds_are_well_ordered() {
        let s = Stack::new(64 * 1024);
        assert!(s.start() < s.end());
        assert!(s.min_size() >= 64 * 1024);
    }
}

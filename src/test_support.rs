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

//! Test-only helper for smuggling `!Send` shared state (an `Rc`, typically)
//! into a coroutine body. `Coroutine::spawn` requires `F: Send` uniformly
//! because the thread-per-coroutine backend really does move the body to
//! another OS thread; the stack-swap and fiber backends never do, so the
//! bound is overly strict for them but cannot be relaxed per-backend in a
//! single generic signature. Same idea as `backend::thread::SendPtr`, scoped
//! to tests: we know by construction that at most one coroutine touches the
//! wrapped value at a time.

#![cfg(test)]

pub(crate) struct SendWrap<T>(pub T);

unsafe impl<T> Send for SendWrap<T> {}

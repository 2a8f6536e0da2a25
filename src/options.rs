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

//! Coroutine spawn options, and the `Builder` that assembles them.

use crate::coroutine::Coroutine;
use crate::stack::DEFAULT_STACK_SIZE;

/// Per-coroutine configuration: how big a stack to give it, and a name used
/// only for diagnostics (log lines, panic messages).
#[derive(Debug, Clone)]
pub struct Options {
    pub stack_size: usize,
    pub name: Option<String>,
}

impl Default for Options {
    fn default() -> Options {
        Options { stack_size: DEFAULT_STACK_SIZE, name: None }
    }
}

/// Builds a set of `Options` and spawns a `Coroutine` from them.
///
/// ```
/// use corowl::Builder;
///
/// let coro = Builder::new()
///     .name("worker".to_string())
///     .stack_size(64 * 1024)
///     .spawn(|n: i32| n + 1);
///
/// assert_eq!(coro.resume(41).unwrap(), 42);
/// ```
pub struct Builder {
    opts: Options,
}

impl Builder {
    pub fn new() -> Builder {
        Builder { opts: Options::default() }
    }

    /// Name the coroutine-to-be. Used for identification in log lines only.
    pub fn name(mut self, name: String) -> Builder {
        self.opts.name = Some(name);
        self
    }

    /// Set the size, in bytes, of the stack given to the new coroutine.
    pub fn stack_size(mut self, size: usize) -> Builder {
        self.opts.stack_size = size;
        self
    }

    /// Spawn a coroutine with the accumulated options.
    pub fn spawn<T, F>(self, body: F) -> Coroutine<T>
    where
        T: Send + 'static,
        F: FnOnce(T) -> T + Send + 'static,
    {
        Coroutine::with_options(&self.opts, body)
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Builder;

    #[test]
    fn builder_spawns_with_given_options() {
        let coro = Builder::new().name("t".to_string()).stack_size(128 * 1024).spawn(|n: i32| n * 2);
        assert_eq!(coro.resume(21).unwrap(), 42);
    }
}

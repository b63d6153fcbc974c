//! Kernel log output.
//!
//! The console itself lives outside the core. Boot code installs a sink with
//! [`set_sink`]; until then, host test builds print to stdout and bare-metal
//! builds drop the output.

use core::fmt::{self, Write};
use spin::Mutex;

static SINK: Mutex<Option<&'static mut (dyn Write + Send)>> = Mutex::new(None);

/// Route all kernel output to `sink`, replacing any previous one.
pub fn set_sink(sink: &'static mut (dyn Write + Send)) {
    *SINK.lock() = Some(sink);
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    let mut sink = SINK.lock();
    match sink.as_mut() {
        Some(out) => {
            let _ = out.write_fmt(args);
        }
        None => fallback(args),
    }
}

#[cfg(test)]
fn fallback(args: fmt::Arguments) {
    std::print!("{}", args);
}

#[cfg(not(test))]
fn fallback(_args: fmt::Arguments) {}

#[macro_export]
macro_rules! println {
    () => {
        $crate::logging::_print(format_args!("\n"))
    };
    ($($arg:tt)*) => {{
        $crate::logging::_print(format_args!("{}\n", format_args!($($arg)*)));
    }};
}

/// Debug-level kernel log, compiled out of release builds.
#[macro_export]
macro_rules! klog {
    ($($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        $crate::println!($($arg)*);
    }};
}

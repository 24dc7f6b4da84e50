//! Terminal output with colored module prefixes.
//!
//! ```ignore
//! log!("posts"; "loaded {} posts", count);
//! ```

use colored::Colorize;

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

pub fn log(module: &str, message: &str) {
    println!("{} {}", format!("[{}]", module).cyan().bold(), message);
}

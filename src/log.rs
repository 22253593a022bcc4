//! A leveled, zero-cost-when-disabled tracing hook over grammar construction and parse attempts.
//!
//! A caller threads a `Log<()>` level through the call it wants visibility into, and the gated
//! `println!`s below (compiled out entirely in release builds via `cfg(debug_assertions)`) report
//! as much detail as that level asks for.

use std::fmt::{Debug, Display, Formatter};

use crate::location::Location;
use crate::symbol::{ParseletID, TokenID};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Ascending verbosity levels for grammar/parse tracing.
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

impl<T: Display> Display for Log<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Log::None => Ok(()),
            Log::Default(s) | Log::Success(s) | Log::Result(s) | Log::Verbose(s) => {
                write!(f, "{}", s)
            }
        }
    }
}

impl<T> Log<T> {
    /// Numeric ordering of verbosity, so `self.order() >= Log::Success(()).order()` reads as "at
    /// least this chatty".
    pub fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}

impl Log<()> {
    /// Traces a successful token registration at [Log::Success] or above.
    pub fn log_token_registered(&self, token_id: &TokenID) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Success(()).order() {
            println!("[{}; TokenRegistered]: {} at {}", self, token_id.name, token_id.location);
        }
        #[cfg(not(debug_assertions))]
        let _ = token_id;
    }

    /// Traces a parselet registration at [Log::Default] or above.
    pub fn log_parselet_registered(&self, parselet_id: &ParseletID) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Default(()).order() {
            println!(
                "[{}; ParseletRegistered]: {} ({:?}) at {}",
                self, parselet_id.name, parselet_id.kind, parselet_id.location
            );
        }
        #[cfg(not(debug_assertions))]
        let _ = parselet_id;
    }

    /// Traces a parselet invocation attempt at [Log::Verbose].
    pub fn log_parselet_attempt(&self, parselet_id: &ParseletID, location: &Location) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Verbose(()).order() {
            println!("[{}; ParseletAttempt]: {} at {}", self, parselet_id.name, location);
        }
        #[cfg(not(debug_assertions))]
        let _ = (parselet_id, location);
    }

    /// Traces a parselet invocation result at [Log::Result] or above.
    pub fn log_parselet_result<T: Debug>(&self, parselet_id: &ParseletID, succeeded: bool, value: Option<&T>) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Result(()).order() {
            if succeeded {
                println!("[{}; ParseletSuccess]: {} -> {:?}", self, parselet_id.name, value);
            } else {
                println!("[{}; ParseletFailure]: {}", self, parselet_id.name);
            }
        }
        #[cfg(not(debug_assertions))]
        let _ = (parselet_id, succeeded, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_monotonic_with_verbosity() {
        assert!(Log::None.order() < Log::Default(()).order());
        assert!(Log::Default(()).order() < Log::Success(()).order());
        assert!(Log::Success(()).order() < Log::Result(()).order());
        assert!(Log::Result(()).order() < Log::Verbose(()).order());
    }

    #[test]
    fn display_writes_inner_value_only() {
        assert_eq!(format!("{}", Log::Success("tag")), "tag");
        assert_eq!(format!("{}", Log::None::<&str>), "");
    }
}

/*!
 * Signals Module
 * Typed UNIX signals for process control
 */

pub mod types;

pub use types::{Signal, SignalError, SignalResult};

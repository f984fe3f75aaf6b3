//! Platform Seams
//!
//! Traits for the OS services the pipeline depends on: batch input injection,
//! system cursor swapping, raw-motion registration and async key state. The
//! Windows implementations live in `platform::windows`; tests and non-Windows
//! builds use the null implementations.

use crate::inject::InjectEvent;
use thiserror::Error;

#[cfg(target_os = "windows")]
pub mod windows;

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("os injection reported {sent}/{requested} events sent")]
    Partial { sent: usize, requested: usize },
    #[error("os injection failed: {0}")]
    Os(String),
}

/// Sends a batch of synthesized events to the OS input stream.
///
/// A single call must preserve the order of `batch`; the injector worker is
/// the only caller, so total injected order equals enqueue order.
pub trait Injector: Send + Sync {
    fn inject_batch(&self, batch: &[InjectEvent]) -> Result<(), InjectError>;
}

/// Swaps the system cursor while scrolling and reports its position.
pub trait CursorHost: Send + Sync {
    fn change_vertical(&self);
    fn change_horizontal(&self);
    fn restore(&self);
    /// Current pointer position, used when a keyboard trigger starts a
    /// scroll session without a mouse event to anchor it.
    fn position(&self) -> (i32, i32) {
        (0, 0)
    }
}

/// Registers/unregisters the raw pointer-delta source around scroll mode.
pub trait MotionSource: Send + Sync {
    fn register(&self);
    fn unregister(&self);
}

/// Async key state queries used by the checker chains.
pub trait KeyState: Send + Sync {
    fn is_down(&self, vk: u16) -> bool;
}

/// No-op injector; drops every batch.
#[derive(Debug, Default)]
pub struct NullInjector;

impl Injector for NullInjector {
    fn inject_batch(&self, _batch: &[InjectEvent]) -> Result<(), InjectError> {
        Ok(())
    }
}

/// No-op cursor host.
#[derive(Debug, Default)]
pub struct NullCursorHost;

impl CursorHost for NullCursorHost {
    fn change_vertical(&self) {}
    fn change_horizontal(&self) {}
    fn restore(&self) {}
}

/// No-op motion source.
#[derive(Debug, Default)]
pub struct NullMotionSource;

impl MotionSource for NullMotionSource {
    fn register(&self) {}
    fn unregister(&self) {}
}

/// Key state that reports every key released.
#[derive(Debug, Default)]
pub struct NullKeyState;

impl KeyState for NullKeyState {
    fn is_down(&self, _vk: u16) -> bool {
        false
    }
}

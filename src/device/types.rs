// Capability traits injected into the automation runner
use super::error::DeviceResult;
use crate::automation::types::ActionKind;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
}

/// Source of full-resolution screenshots.
pub trait ScreenCapture: Send + Sync {
    /// Grab the whole screen synchronously with respect to the caller.
    /// Any error aborts the current run.
    fn capture_screen(&self) -> impl Future<Output = DeviceResult<DynamicImage>> + Send;
}

/// Cursor movement and button synthesis.
pub trait MouseInput: Send + Sync {
    /// Move to `(x, y)` and perform a click-style action.
    ///
    /// Only called with the single and double click kinds; long-press kinds
    /// go through [`MouseInput::press`].
    fn move_and_click(
        &self,
        x: i32,
        y: i32,
        action: ActionKind,
    ) -> impl Future<Output = DeviceResult<()>> + Send;

    /// Move to `(x, y)` and push `button` down without releasing it.
    fn press(
        &self,
        x: i32,
        y: i32,
        button: MouseButton,
    ) -> impl Future<Output = DeviceResult<()>> + Send;

    /// Let go of a button previously held by [`MouseInput::press`].
    fn release(&self, button: MouseButton) -> impl Future<Output = DeviceResult<()>> + Send;

    /// Current cursor position, used to notice the user dragging away from a held press.
    /// `None` means the backend cannot report it and away-detection is skipped.
    fn cursor_position(&self) -> impl Future<Output = DeviceResult<Option<(i32, i32)>>> + Send {
        async { Ok(None) }
    }
}

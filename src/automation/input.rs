//! Mouse and keyboard input injection.
//!
//! The dispatcher only sees [`InputDriver`]. On Windows it is backed by
//! `SendInput`, which simulates hardware-level input the game client
//! accepts (window messages are ignored by it).

use anyhow::{bail, Result};
use std::time::Duration;

/// Input-injection collaborator. Coordinates are absolute screen pixels.
pub trait InputDriver: Send + Sync {
    fn move_to(&self, x: i32, y: i32, duration: Duration) -> Result<()>;
    fn click(&self) -> Result<()>;
    fn double_click(&self) -> Result<()>;
    /// Left button down.
    fn press(&self) -> Result<()>;
    /// Left button up.
    fn release(&self) -> Result<()>;
    fn key_press(&self, key: &str) -> Result<()>;
}

/// Maps a key name to a Windows virtual-key code.
///
/// Single letters and digits map to themselves; a few named keys and
/// F1-F12 are recognized case-insensitively.
pub fn virtual_key_code(key: &str) -> Option<u16> {
    let key = key.trim();
    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c
            .is_ascii_alphanumeric()
            .then(|| c.to_ascii_uppercase() as u16);
    }

    let lower = key.to_ascii_lowercase();
    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u16>().ok()) {
        return (1..=12).contains(&n).then(|| 0x70 + n - 1);
    }
    match lower.as_str() {
        "space" => Some(0x20),
        "enter" | "return" => Some(0x0D),
        "esc" | "escape" => Some(0x1B),
        "tab" => Some(0x09),
        "backspace" => Some(0x08),
        "shift" => Some(0x10),
        "ctrl" | "control" => Some(0x11),
        "alt" => Some(0x12),
        _ => None,
    }
}

/// Driver for platforms without input injection. Every call fails.
#[derive(Debug, Default)]
pub struct UnsupportedInput;

impl InputDriver for UnsupportedInput {
    fn move_to(&self, x: i32, y: i32, _duration: Duration) -> Result<()> {
        bail!("Input injection is not supported on this platform (move to {}, {})", x, y)
    }
    fn click(&self) -> Result<()> {
        bail!("Input injection is not supported on this platform")
    }
    fn double_click(&self) -> Result<()> {
        bail!("Input injection is not supported on this platform")
    }
    fn press(&self) -> Result<()> {
        bail!("Input injection is not supported on this platform")
    }
    fn release(&self) -> Result<()> {
        bail!("Input injection is not supported on this platform")
    }
    fn key_press(&self, key: &str) -> Result<()> {
        bail!("Input injection is not supported on this platform (key {})", key)
    }
}

#[cfg(windows)]
pub use send_input::SendInputDriver;

#[cfg(windows)]
mod send_input {
    use anyhow::{anyhow, Result};
    use std::thread;
    use std::time::Duration;

    use windows::Win32::Foundation::POINT;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
        KEYEVENTF_KEYUP, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEEVENTF_MOVE, MOUSE_EVENT_FLAGS, MOUSEINPUT, VIRTUAL_KEY,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetCursorPos, GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN,
    };

    use super::{virtual_key_code, InputDriver};

    /// Interpolation step for cursor movement.
    const MOVE_STEP: Duration = Duration::from_millis(10);
    /// Gap between the two clicks of a double click.
    const DOUBLE_CLICK_GAP: Duration = Duration::from_millis(50);

    /// `SendInput`-backed driver. Moves the real cursor.
    pub struct SendInputDriver {
        key_delay: Duration,
    }

    impl SendInputDriver {
        pub fn new(key_delay: Duration) -> Self {
            Self { key_delay }
        }

        /// Normalizes screen pixels to the 0-65535 range `MOUSEEVENTF_ABSOLUTE` expects.
        fn normalize(x: i32, y: i32) -> (i32, i32) {
            let screen_width = unsafe { GetSystemMetrics(SM_CXSCREEN) }.max(1);
            let screen_height = unsafe { GetSystemMetrics(SM_CYSCREEN) }.max(1);
            (
                ((x as i64 * 65535) / screen_width as i64) as i32,
                ((y as i64 * 65535) / screen_height as i64) as i32,
            )
        }

        fn send(inputs: &[INPUT]) -> Result<()> {
            let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
            if sent as usize != inputs.len() {
                return Err(anyhow!("SendInput sent {} of {} inputs", sent, inputs.len()));
            }
            Ok(())
        }

        fn mouse(flags: MOUSE_EVENT_FLAGS, dx: i32, dy: i32) -> INPUT {
            INPUT {
                r#type: INPUT_MOUSE,
                Anonymous: INPUT_0 {
                    mi: MOUSEINPUT {
                        dx,
                        dy,
                        dwFlags: flags,
                        ..Default::default()
                    },
                },
            }
        }

        fn key(vk: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
            INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: VIRTUAL_KEY(vk),
                        dwFlags: flags,
                        ..Default::default()
                    },
                },
            }
        }

        fn move_absolute(x: i32, y: i32) -> Result<()> {
            let (nx, ny) = Self::normalize(x, y);
            Self::send(&[Self::mouse(MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE, nx, ny)])
        }

        fn button(flags: MOUSE_EVENT_FLAGS) -> Result<()> {
            Self::send(&[Self::mouse(flags, 0, 0)])
        }
    }

    impl InputDriver for SendInputDriver {
        fn move_to(&self, x: i32, y: i32, duration: Duration) -> Result<()> {
            let mut start = POINT::default();
            unsafe { GetCursorPos(&mut start)? };

            let steps = (duration.as_millis() / MOVE_STEP.as_millis()).max(1) as i32;
            for step in 1..=steps {
                let px = start.x + (x - start.x) * step / steps;
                let py = start.y + (y - start.y) * step / steps;
                Self::move_absolute(px, py)?;
                if step < steps {
                    thread::sleep(MOVE_STEP);
                }
            }
            Ok(())
        }

        fn click(&self) -> Result<()> {
            self.press()?;
            self.release()
        }

        fn double_click(&self) -> Result<()> {
            self.click()?;
            thread::sleep(DOUBLE_CLICK_GAP);
            self.click()
        }

        fn press(&self) -> Result<()> {
            Self::button(MOUSEEVENTF_LEFTDOWN)
        }

        fn release(&self) -> Result<()> {
            Self::button(MOUSEEVENTF_LEFTUP)
        }

        fn key_press(&self, key: &str) -> Result<()> {
            let vk = virtual_key_code(key).ok_or_else(|| anyhow!("Unknown key: {}", key))?;
            Self::send(&[Self::key(vk, KEYBD_EVENT_FLAGS(0))])?;
            thread::sleep(self.key_delay);
            Self::send(&[Self::key(vk, KEYEVENTF_KEYUP)])
        }
    }
}

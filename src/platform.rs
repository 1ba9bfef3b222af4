//! Platform wiring: picks the capture and input backends for this OS and
//! builds the OCR and text-generation clients from config.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::automation::config::AgentConfig;
use crate::automation::Collaborators;
use crate::decision::OllamaGenerator;
use crate::ocr::TesseractRecognizer;

/// Builds the production collaborators.
///
/// Fails if Tesseract cannot be located or the HTTP client cannot be built.
pub fn default_collaborators(config: &AgentConfig) -> Result<Collaborators> {
    let recognizer =
        TesseractRecognizer::new(&config.ocr).context("Failed to set up Tesseract OCR")?;
    let generator =
        OllamaGenerator::new(&config.generator).context("Failed to set up the text generator")?;

    Ok(Collaborators {
        capturer: native::capturer(),
        recognizer: Arc::new(recognizer),
        generator: Arc::new(generator),
        input: native::input(config),
    })
}

/// Makes screen coordinates physical pixels on high-DPI displays.
pub fn enable_dpi_awareness() {
    native::enable_dpi_awareness();
}

#[cfg(windows)]
mod native {
    use std::sync::Arc;
    use std::time::Duration;

    use windows::Win32::UI::HiDpi::{
        SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    };

    use crate::automation::config::AgentConfig;
    use crate::automation::input::SendInputDriver;
    use crate::automation::InputDriver;
    use crate::capture::screen::GdiCapturer;
    use crate::capture::ScreenCapturer;

    pub fn capturer() -> Arc<dyn ScreenCapturer> {
        Arc::new(GdiCapturer)
    }

    pub fn input(config: &AgentConfig) -> Arc<dyn InputDriver> {
        Arc::new(SendInputDriver::new(Duration::from_millis(
            config.actions.key_delay_ms,
        )))
    }

    pub fn enable_dpi_awareness() {
        if let Err(e) =
            unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) }
        {
            tracing::warn!("Failed to enable per-monitor DPI awareness: {}", e);
        }
    }
}

#[cfg(not(windows))]
mod native {
    use std::sync::Arc;

    use crate::automation::config::AgentConfig;
    use crate::automation::input::UnsupportedInput;
    use crate::automation::InputDriver;
    use crate::capture::screen::UnsupportedCapturer;
    use crate::capture::ScreenCapturer;

    pub fn capturer() -> Arc<dyn ScreenCapturer> {
        tracing::warn!("Screen capture is not supported on this platform");
        Arc::new(UnsupportedCapturer)
    }

    pub fn input(_config: &AgentConfig) -> Arc<dyn InputDriver> {
        tracing::warn!("Input injection is not supported on this platform");
        Arc::new(UnsupportedInput)
    }

    pub fn enable_dpi_awareness() {}
}

//! Process-wide debug settings, read once from the environment.

use std::path::PathBuf;

use once_cell::sync::OnceCell;

#[derive(Debug, Clone)]
pub struct DebugSettings {
    /// Draw OCR regions and cells for every processed page.
    pub visualize_ocr: bool,
    pub profile_pipeline_timings: bool,
    pub debug_output_path: PathBuf,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            visualize_ocr: false,
            profile_pipeline_timings: false,
            debug_output_path: PathBuf::from("debug"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub debug: DebugSettings,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false)
        };
        let defaults = DebugSettings::default();
        Self {
            debug: DebugSettings {
                visualize_ocr: flag("FOLIO_VISUALIZE_OCR"),
                profile_pipeline_timings: flag("FOLIO_PROFILE_TIMINGS"),
                debug_output_path: lookup("FOLIO_DEBUG_OUTPUT_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.debug_output_path),
            },
        }
    }
}

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// The process-wide settings; read from the environment on first use
/// unless [`init`] ran before.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(Settings::from_env)
}

/// Installs `settings` for the process. Fails, handing them back, once the
/// settings were already read or installed.
pub fn init(settings: Settings) -> Result<(), Settings> {
    SETTINGS.set(settings)
}

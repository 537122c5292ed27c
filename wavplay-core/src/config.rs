//! Playback configuration

/// Options for a playback run, passed explicitly into the CLI entry
/// point rather than read from ambient state.
#[derive(Debug, Clone)]
pub struct PlayConfig {
    /// Audio host to render through, by backend name (`alsa`, `jack`,
    /// `coreaudio`, ...). `None` selects the platform default.
    pub manufacturer: Option<String>,
    /// Print per-file format details.
    pub verbose: bool,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            manufacturer: None,
            verbose: true,
        }
    }
}

impl PlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manufacturer(mut self, manufacturer: Option<String>) -> Self {
        self.manufacturer = manufacturer;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

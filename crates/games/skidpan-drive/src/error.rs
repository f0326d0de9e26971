/// Setup-time failures. Gameplay outcomes never surface as errors.
#[derive(Debug)]
pub enum DriveError {
    /// A tuning or world parameter is outside its legal range.
    InvalidConfig(String),
    /// A TOML config document could not be parsed.
    ConfigParse(String),
    /// Raw terrain pixels do not match the declared dimensions.
    MaskSize { expected: usize, actual: usize },
    /// The terrain image could not be opened or decoded.
    Image(String),
}

impl std::fmt::Display for DriveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(m) => write!(f, "invalid config: {m}"),
            Self::ConfigParse(m) => write!(f, "failed to parse config: {m}"),
            Self::MaskSize { expected, actual } => {
                write!(
                    f,
                    "terrain mask expects {expected} bytes of RGBA data, got {actual}"
                )
            },
            Self::Image(m) => write!(f, "failed to load terrain image: {m}"),
        }
    }
}

impl std::error::Error for DriveError {}

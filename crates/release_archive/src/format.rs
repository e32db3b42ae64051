//! Release asset format detection

/// How a downloaded release asset has to be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
    /// Anything else, used as the binary itself
    RawBinary,
}

impl AssetFormat {
    /// Detect the asset format from its filename
    pub fn detect_from_filename(filename: &str) -> Self {
        let filename = filename.to_lowercase();
        if Self::TarGz
            .extensions()
            .iter()
            .any(|extension| filename.ends_with(extension))
        {
            return Self::TarGz;
        }
        Self::RawBinary
    }

    /// Get the file extensions recognized for this format
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::TarGz => &[".tar.gz", ".tgz"],
            Self::RawBinary => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostArch {
    X86,
    X64,
    Arm64,
}

/// Processor architecture the operating system reports for this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProcessor {
    pub reported: String,
    pub arch: HostArch,
}

impl HostProcessor {
    /// Read the host architecture from the Windows environment.
    ///
    /// A 32-bit process on a 64-bit OS sees `PROCESSOR_ARCHITEW6432`, which
    /// takes precedence. Elsewhere the compile target is used.
    #[must_use]
    pub fn detect() -> Self {
        let reported = ["PROCESSOR_ARCHITEW6432", "PROCESSOR_ARCHITECTURE"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| std::env::consts::ARCH.to_string());
        Self::from_reported(&reported)
    }

    #[must_use]
    pub fn from_reported(reported: &str) -> Self {
        let normalized = reported.trim().to_ascii_lowercase();
        let arch = match normalized.as_str() {
            "amd64" | "x86_64" | "x64" | "ia64" | "em64t" => HostArch::X64,
            value if value.contains("arm") || value == "aarch64" => HostArch::Arm64,
            _ => HostArch::X86,
        };
        Self {
            reported: reported.trim().to_string(),
            arch,
        }
    }

    #[must_use]
    pub fn is_arm(&self) -> bool {
        self.arch == HostArch::Arm64
    }
}

use std::io::Read;
use std::path::Path;

use nvmw_backend::{Architecture, NodeVersion};
use nvmw_platform::{HostArch, HostProcessor};

/// PE headers of the Node.js executables sit well inside this window.
const HEADER_SCAN_LIMIT: u64 = 400;

/// `PE\0\0` followed by the COFF machine type, most specific first.
const PE_MARKERS: [(&[u8], Architecture); 3] = [
    (&[0x50, 0x45, 0x00, 0x00, 0x64, 0xAA], Architecture::Arm64),
    (&[0x50, 0x45, 0x00, 0x00, 0x64, 0x86], Architecture::X64),
    (&[0x50, 0x45, 0x00, 0x00, 0x4C], Architecture::X86),
];

/// Classify an executable from its PE header.
///
/// Returns `None` when the file is unreadable or carries no known marker.
#[must_use]
pub fn detect_executable(path: &Path) -> Option<Architecture> {
    let file = std::fs::File::open(path).ok()?;
    let mut header = Vec::new();
    file.take(HEADER_SCAN_LIMIT)
        .read_to_end(&mut header)
        .ok()?;

    PE_MARKERS.iter().find_map(|(marker, arch)| {
        header
            .windows(marker.len())
            .any(|window| window == *marker)
            .then_some(*arch)
    })
}

#[must_use]
pub fn host_architecture(host: &HostProcessor) -> Architecture {
    match host.arch {
        HostArch::X86 => Architecture::X86,
        HostArch::X64 => Architecture::X64,
        HostArch::Arm64 => Architecture::Arm64,
    }
}

/// Best-effort normalization of an architecture token.
///
/// An ARM host always gets arm64 builds. An empty token falls back to the
/// host; any unrecognized token means 32-bit.
#[must_use]
pub fn validate(token: &str, host: &HostProcessor) -> Architecture {
    if host.is_arm() {
        return Architecture::Arm64;
    }
    let token = token.trim();
    if token.is_empty() {
        return host_architecture(host);
    }
    Architecture::from_token(token).unwrap_or(Architecture::X86)
}

/// Whether the Node.js distribution publishes a build of `version` for `arch`.
#[must_use]
pub fn is_available(version: &NodeVersion, arch: Architecture) -> bool {
    match arch {
        Architecture::X86 => true,
        Architecture::X64 => !(version.major == 0 && version.minor < 8),
        Architecture::Arm64 => version.major > 19 || (version.major == 19 && version.minor >= 9),
    }
}

#[cfg(test)]
pub(crate) fn fake_executable(arch: Architecture) -> Vec<u8> {
    let machine: &[u8] = match arch {
        Architecture::X86 => &[0x4C, 0x01],
        Architecture::X64 => &[0x64, 0x86],
        Architecture::Arm64 => &[0x64, 0xAA],
    };
    let mut bytes = b"MZ".to_vec();
    bytes.resize(0x80, 0);
    bytes.extend_from_slice(b"PE\0\0");
    bytes.extend_from_slice(machine);
    bytes.resize(1024, 0);
    bytes
}

#[cfg(test)]
mod tests {
    use nvmw_backend::{Architecture, NodeVersion};
    use nvmw_platform::HostProcessor;

    use super::{detect_executable, fake_executable, is_available, validate};

    #[test]
    fn detects_each_machine_type() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        for arch in Architecture::ALL {
            let path = temp.path().join(format!("node-{arch}.exe"));
            std::fs::write(&path, fake_executable(arch)).expect("executable should be written");
            assert_eq!(detect_executable(&path), Some(arch));
        }
    }

    #[test]
    fn marker_past_scan_limit_is_unknown() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("node.exe");
        let mut bytes = vec![0_u8; 512];
        bytes.extend_from_slice(&[0x50, 0x45, 0x00, 0x00, 0x64, 0x86]);
        std::fs::write(&path, bytes).expect("executable should be written");

        assert_eq!(detect_executable(&path), None);
    }

    #[test]
    fn missing_file_is_unknown() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        assert_eq!(detect_executable(&temp.path().join("absent.exe")), None);
    }

    #[test]
    fn validate_uses_exact_tokens() {
        let host = HostProcessor::from_reported("AMD64");
        assert_eq!(validate("64", &host), Architecture::X64);
        assert_eq!(validate("32", &host), Architecture::X86);
        assert_eq!(validate("arm64", &host), Architecture::Arm64);
        assert_eq!(validate("x64", &host), Architecture::X86);
        assert_eq!(validate("", &host), Architecture::X64);
    }

    #[test]
    fn arm_host_always_validates_to_arm64() {
        let host = HostProcessor::from_reported("ARM64");
        assert_eq!(validate("64", &host), Architecture::Arm64);
        assert_eq!(validate("", &host), Architecture::Arm64);
    }

    #[test]
    fn availability_follows_release_history() {
        assert!(!is_available(&NodeVersion::new(0, 6, 21), Architecture::X64));
        assert!(is_available(&NodeVersion::new(0, 8, 0), Architecture::X64));
        assert!(!is_available(&NodeVersion::new(19, 8, 1), Architecture::Arm64));
        assert!(is_available(&NodeVersion::new(19, 9, 0), Architecture::Arm64));
        assert!(is_available(&NodeVersion::new(20, 0, 0), Architecture::Arm64));
        assert!(is_available(&NodeVersion::new(0, 1, 14), Architecture::X86));
    }
}

use nix::sys::utsname::uname;
use serde::Serialize;

/// Name, version and host of the decoder that produced an output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeMetadata {
    pub name: String,
    pub version: String,
    pub system_os: String,
    pub arch: String,
}

impl RuntimeMetadata {
    pub fn new() -> Self {
        let name = env!("CARGO_PKG_NAME").to_owned();
        let version = env!("CARGO_PKG_VERSION").to_owned();
        match uname() {
            Ok(utsname) => RuntimeMetadata {
                name,
                version,
                arch: utsname.machine().to_string_lossy().into_owned(),
                system_os: format!(
                    "{} {}",
                    utsname.sysname().to_string_lossy(),
                    utsname.release().to_string_lossy(),
                ),
            },
            Err(_) => RuntimeMetadata {
                name,
                version,
                arch: std::env::consts::ARCH.to_string(),
                system_os: std::env::consts::OS.to_string(),
            },
        }
    }

    /// `name version`, as recorded in pcapng section headers.
    pub fn package(&self) -> String {
        format!("{} {}", self.name, self.version)
    }
}

impl Default for RuntimeMetadata {
    fn default() -> Self {
        Self::new()
    }
}

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Generates a plain enum with a string name per variant,
/// plus `as_str`, `Display` and a case-insensitive `FromStr`.
macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($s) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(Error::InvalidValue {
                    kind: $kind,
                    value: s.to_owned(),
                })
            }
        }
    };
}

named_enum!(
    /// Whether an executable is already installed at a site or must be staged there.
    TcType, "transformation type", {
        Installed => "installed",
        Stageable => "stageable",
    }
);

named_enum!(
    /// Machine architecture.
    Arch, "architecture", {
        X86 => "x86",
        X8664 => "x86_64",
        Ppc => "ppc",
        Ppc64 => "ppc_64",
        Ia64 => "ia64",
        Sparcv7 => "sparcv7",
        Sparcv9 => "sparcv9",
        Amd64 => "amd64",
    }
);

named_enum!(
    /// Operating system.
    Os, "operating system", {
        Linux => "linux",
        Sunos => "sunos",
        Aix => "aix",
        Macosx => "macosx",
        Windows => "windows",
    }
);

/// Platform an executable is built for.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SysInfo {
    pub arch: Arch,
    pub os: Os,
}

impl Default for SysInfo {
    fn default() -> Self {
        Self {
            arch: Arch::X8664,
            os: Os::Linux,
        }
    }
}

impl fmt::Display for SysInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.arch, self.os)
    }
}

impl FromStr for SysInfo {
    type Err = Error;
    /// Parses `arch::os`, e.g. `x86_64::linux`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (arch, os) = s.split_once("::").ok_or_else(|| Error::InvalidValue {
            kind: "system info",
            value: s.to_owned(),
        })?;
        Ok(Self {
            arch: arch.parse()?,
            os: os.parse()?,
        })
    }
}

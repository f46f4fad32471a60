//! Orden de versiones de productor (`MAJOR.MINOR.PATCH[-pre][+build]`).
//!
//! Sigue la precedencia semver: núcleo numérico, una versión con pre-release
//! es menor que la misma versión sin él, y los identificadores de pre-release
//! se comparan campo a campo (numéricos antes que alfanuméricos). La metadata
//! de build no participa en la comparación.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PreId {
    Numeric(u64),
    Alpha(String),
}

impl Ord for PreId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PreId::Numeric(a), PreId::Numeric(b)) => a.cmp(b),
            (PreId::Numeric(_), PreId::Alpha(_)) => Ordering::Less,
            (PreId::Alpha(_), PreId::Numeric(_)) => Ordering::Greater,
            (PreId::Alpha(a), PreId::Alpha(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for PreId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pre: Vec<PreId>,
}

impl ProducerVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch, pre: Vec::new() }
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

impl Ord for ProducerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
                                            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                                                (true, true) => Ordering::Equal,
                                                (true, false) => Ordering::Greater,
                                                (false, true) => Ordering::Less,
                                                (false, false) => self.pre.cmp(&other.pre),
                                            })
    }
}

impl PartialOrd for ProducerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for ProducerVersion {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        let s = s.strip_prefix('=').unwrap_or(s);
        let s = s.strip_prefix('v').unwrap_or(s);
        let s = s.split_once('+').map_or(s, |(core, _build)| core);
        let (core, pre) = match s.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (s, None),
        };

        let mut parts = core.split('.');
        let mut next = |label: &str| -> Result<u64, String> {
            let part = parts.next().ok_or_else(|| format!("missing {label} component"))?;
            numeric(part).ok_or_else(|| format!("{label} component {part:?} is not a number"))?
                         .map_err(|_| format!("{label} component {part:?} has a leading zero or overflows"))
        };
        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;
        if parts.next().is_some() {
            return Err("too many version components".into());
        }

        let pre = match pre {
            None => Vec::new(),
            Some(pre) => pre.split('.')
                            .map(|id| {
                                if id.is_empty() {
                                    return Err("empty pre-release identifier".to_string());
                                }
                                if !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
                                    return Err(format!("pre-release identifier {id:?} has invalid characters"));
                                }
                                match numeric(id) {
                                    Some(Ok(n)) => Ok(PreId::Numeric(n)),
                                    Some(Err(())) => {
                                        Err(format!("pre-release identifier {id:?} has a leading zero"))
                                    }
                                    None => Ok(PreId::Alpha(id.to_string())),
                                }
                            })
                            .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(Self { major, minor, patch, pre })
    }
}

/// Identificador numérico semver: sólo dígitos, sin ceros a la izquierda.
/// `None` si no es numérico; `Some(Err(()))` si tiene cero inicial o desborda.
fn numeric(part: &str) -> Option<Result<u64, ()>> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return Some(Err(()));
    }
    Some(part.parse::<u64>().map_err(|_| ()))
}

impl fmt::Display for ProducerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        for (i, id) in self.pre.iter().enumerate() {
            f.write_str(if i == 0 { "-" } else { "." })?;
            match id {
                PreId::Numeric(n) => write!(f, "{n}")?,
                PreId::Alpha(s) => f.write_str(s)?,
            }
        }
        Ok(())
    }
}

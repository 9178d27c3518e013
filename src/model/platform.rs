//! Target platforms and platform-availability sets.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A target platform for which native description documents exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Platform {
    Linux,
    Windows,
    Macos,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Linux, Platform::Windows, Platform::Macos];

    pub fn name(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::Macos => "macos",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Platform::Linux => 1,
            Platform::Windows => 2,
            Platform::Macos => 4,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            "macos" => Ok(Platform::Macos),
            other => Err(format!(
                "unknown platform: {}. Use linux, windows or macos",
                other
            )),
        }
    }
}

/// A set of platforms, rendered as a comma list in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Platforms(u8);

impl Platforms {
    pub const fn empty() -> Self {
        Platforms(0)
    }

    pub fn all() -> Self {
        Platform::ALL.into_iter().collect()
    }

    pub fn single(platform: Platform) -> Self {
        Platforms(platform.bit())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, platform: Platform) -> bool {
        self.0 & platform.bit() != 0
    }

    pub fn insert(&mut self, platform: Platform) {
        self.0 |= platform.bit();
    }

    pub fn union(self, other: Platforms) -> Platforms {
        Platforms(self.0 | other.0)
    }

    pub fn intersection(self, other: Platforms) -> Platforms {
        Platforms(self.0 & other.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Platform> {
        Platform::ALL.into_iter().filter(move |p| self.contains(*p))
    }
}

impl FromIterator<Platform> for Platforms {
    fn from_iter<I: IntoIterator<Item = Platform>>(iter: I) -> Self {
        let mut set = Platforms::empty();
        for p in iter {
            set.insert(p);
        }
        set
    }
}

impl fmt::Display for Platforms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Platform::name).collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for Platforms {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Platform::from_str)
            .collect()
    }
}

impl Serialize for Platforms {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(Platform::name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_canonical_order() {
        let set: Platforms = [Platform::Macos, Platform::Linux].into_iter().collect();
        assert_eq!(set.to_string(), "linux,macos");
        assert_eq!(Platforms::all().to_string(), "linux,windows,macos");
        assert_eq!(Platforms::empty().to_string(), "");
    }

    #[test]
    fn parse_comma_list() {
        let set: Platforms = "windows, linux".parse().unwrap();
        assert!(set.contains(Platform::Linux));
        assert!(set.contains(Platform::Windows));
        assert!(!set.contains(Platform::Macos));
        assert_eq!(set.len(), 2);
        assert!("".parse::<Platforms>().unwrap().is_empty());
        assert!("linux,beos".parse::<Platforms>().is_err());
    }

    #[test]
    fn union_and_intersection() {
        let a = Platforms::single(Platform::Linux);
        let b = Platforms::single(Platform::Windows);
        assert_eq!(a.union(b).len(), 2);
        assert!(a.intersection(b).is_empty());
    }
}

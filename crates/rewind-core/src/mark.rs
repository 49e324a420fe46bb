use std::fmt;

use serde::{Deserialize, Serialize};

/// Position in the compensation log.
///
/// Marks only compare for equality and ordering. A mark taken before an
/// append is less than or equal to the mark of the appended record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Mark(u64);

impl Mark {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_strictly_greater() {
        let mark = Mark::new(41);
        assert!(mark.next() > mark);
        assert_eq!(mark.next().value(), 42);
    }

    #[test]
    fn serializes_as_bare_number() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&Mark::new(7))?, "7");
        let mark: Mark = serde_json::from_str("7")?;
        assert_eq!(mark, Mark::new(7));
        Ok(())
    }

    #[test]
    fn displays_with_hash_prefix() {
        assert_eq!(Mark::ZERO.to_string(), "#0");
    }
}

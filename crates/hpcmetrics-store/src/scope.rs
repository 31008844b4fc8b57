// SPDX-License-Identifier: Apache-2.0

//! The node hierarchy scopes at which a metric sample can be recorded.

use std::fmt;

/// Level in the node hierarchy at which a metric was recorded.
///
/// Ordered coarsest to finest; [`Scope::rank`] gives the position used by the `max-scope`
/// fallback rule in scoped reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// The whole compute node.
    Node,
    /// A CPU socket within the node.
    Socket,
    /// A NUMA memory domain within the node.
    MemoryDomain,
    /// An accelerator device (e.g. GPU) attached to the node.
    Accelerator,
    /// A physical core within a socket.
    Core,
    /// A hardware thread within a core.
    HwThread,
}

impl Scope {
    /// Coarseness rank; lower is coarser. Used to decide which side of a `read_scoped` request
    /// must aggregate children and which can read directly.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Scope::Node => 0,
            Scope::Socket => 1,
            Scope::MemoryDomain => 2,
            Scope::Accelerator => 3,
            Scope::Core => 4,
            Scope::HwThread => 5,
        }
    }

    /// The coarser of `self` and `other`, per the `max-scope` fallback rule: when a request
    /// cannot be served at the finer of two scopes on a given branch, it falls back to whichever
    /// is actually available, which is always the coarser of the two.
    #[must_use]
    pub fn coarser(self, other: Scope) -> Scope {
        if self.rank() <= other.rank() {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Node => "node",
            Scope::Socket => "socket",
            Scope::MemoryDomain => "memoryDomain",
            Scope::Accelerator => "accelerator",
            Scope::Core => "core",
            Scope::HwThread => "hwthread",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Scope::Node),
            "socket" => Ok(Scope::Socket),
            "memoryDomain" => Ok(Scope::MemoryDomain),
            "accelerator" => Ok(Scope::Accelerator),
            "core" => Ok(Scope::Core),
            "hwthread" => Ok(Scope::HwThread),
            other => Err(UnknownScope(other.to_owned())),
        }
    }
}

/// Returned when a scope string does not match any recognised [`Scope`] variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown scope: {0}")]
pub struct UnknownScope(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_is_coarsest() {
        assert!(Scope::Node.rank() < Scope::Socket.rank());
        assert!(Scope::Socket.rank() < Scope::HwThread.rank());
    }

    #[test]
    fn coarser_picks_lower_rank() {
        assert_eq!(Scope::Node.coarser(Scope::HwThread), Scope::Node);
        assert_eq!(Scope::Socket.coarser(Scope::Core), Scope::Socket);
    }

    #[test]
    fn round_trips_through_display_and_from_str() {
        for scope in [
            Scope::Node,
            Scope::Socket,
            Scope::MemoryDomain,
            Scope::Accelerator,
            Scope::Core,
            Scope::HwThread,
        ] {
            let rendered = scope.to_string();
            assert_eq!(rendered.parse::<Scope>().expect("valid scope"), scope);
        }
    }
}

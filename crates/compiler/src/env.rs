//! Identifier-to-slot environment
//!
//! Maps source identifiers to signed frame slots relative to the frame
//! pointer. A positive slot is a local `let`-binding; a negative slot
//! is a parameter, capture, or the self-closure.
//! `push` always allocates into the positive range; negative slots are
//! only ever introduced via [`Env::from_list`], which seeds a lambda
//! or function body's parameter/capture layout.

use fdl_core::{Operand, Reg};

/// Address of frame slot `slot`: positive slots sit below `ebp`,
/// negative slots sit above it. Both cases collapse to one formula:
/// `[ebp - 4*slot]`.
pub fn slot_address(slot: i32) -> Operand {
    Operand::RegOffset(Reg::Ebp, -4 * slot)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    /// Insertion-ordered; `lookup` scans from the end so the most
    /// recent binding for a shadowed name wins.
    bindings: Vec<(String, i32)>,
}

impl Env {
    pub fn empty() -> Self {
        Env::default()
    }

    /// Build an environment directly from `(id, slot)` pairs, in the
    /// order given. Used to seed parameter slots (`-3, -4, ...`), the
    /// self-closure slot (`-2`), and capture slots (`1, 2, ...`).
    pub fn from_list<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, i32)>,
    {
        Env {
            bindings: pairs.into_iter().collect(),
        }
    }

    /// Allocate the next unused positive slot for `id`, returning the
    /// slot and the extended environment. The current environment is
    /// left untouched.
    pub fn push(&self, id: &str) -> (i32, Env) {
        let slot = self.env_max() + 1;
        let mut bindings = self.bindings.clone();
        bindings.push((id.to_string(), slot));
        (slot, Env { bindings })
    }

    /// The most recent binding for `id`, if any.
    pub fn lookup(&self, id: &str) -> Option<i32> {
        self.bindings
            .iter()
            .rev()
            .find(|(name, _)| name == id)
            .map(|(_, slot)| *slot)
    }

    /// The maximum positive slot assigned anywhere in this environment,
    /// i.e. the frame size a closure prologue must reserve before
    /// local temporaries.
    pub fn env_max(&self) -> i32 {
        self.bindings
            .iter()
            .map(|(_, slot)| *slot)
            .filter(|slot| *slot > 0)
            .max()
            .unwrap_or(0)
    }
}

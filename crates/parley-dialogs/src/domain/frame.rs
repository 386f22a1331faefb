//! Stack frame model.
//!
//! Positions in a `DialogStack` count from the bottom: position 0 is the
//! oldest frame and the active frame sits at `len() - 1`. Counting from the
//! bottom keeps a `StateLocation` valid while frames above it come and go.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a command frame finds the memory it shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stack", content = "position", rename_all = "camelCase")]
pub enum StateLocation {
    /// A position in the same stack as the inheriting frame.
    Local(usize),
    /// A position in the enclosing context's stack.
    Parent(usize),
}

/// One running dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogFrame {
    /// Registry key of the running dialog.
    pub id: String,
    /// Private memory, absent when the frame shares an ancestor's memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Map<String, Value>>,
    /// Location of the memory this frame shares, if it owns none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<StateLocation>,
    /// Nested stack hosted by this frame when it runs a container dialog.
    #[serde(default, skip_serializing_if = "DialogStack::is_empty")]
    pub children: DialogStack,
}

impl DialogFrame {
    /// Creates a frame that owns an empty private map.
    #[must_use]
    pub fn owning(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Some(Map::new()),
            inherits: None,
            children: DialogStack::new(),
        }
    }

    /// Creates a frame that shares the memory found at `location`.
    #[must_use]
    pub fn inheriting(id: impl Into<String>, location: StateLocation) -> Self {
        Self {
            id: id.into(),
            state: None,
            inherits: Some(location),
            children: DialogStack::new(),
        }
    }
}

/// An ordered stack of frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogStack {
    frames: Vec<DialogFrame>,
}

impl DialogStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Number of frames on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if no dialog is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The frame on top of the stack.
    #[must_use]
    pub fn active(&self) -> Option<&DialogFrame> {
        self.frames.last()
    }

    /// Mutable access to the frame on top of the stack.
    pub fn active_mut(&mut self) -> Option<&mut DialogFrame> {
        self.frames.last_mut()
    }

    /// The frame at a bottom-up position.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&DialogFrame> {
        self.frames.get(position)
    }

    /// Mutable access to the frame at a bottom-up position.
    pub fn get_mut(&mut self, position: usize) -> Option<&mut DialogFrame> {
        self.frames.get_mut(position)
    }

    /// Pushes a frame, making it active.
    pub fn push(&mut self, frame: DialogFrame) {
        self.frames.push(frame);
    }

    /// Removes and returns the active frame.
    pub fn pop(&mut self) -> Option<DialogFrame> {
        self.frames.pop()
    }

    /// Drops every frame above the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }

    /// Iterates frames most-recent-first.
    pub fn iter(&self) -> impl Iterator<Item = &DialogFrame> {
        self.frames.iter().rev()
    }

    /// Dialog ids, most-recent-first.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|frame| frame.id.as_str()).collect()
    }
}

impl FromIterator<DialogFrame> for DialogStack {
    /// Builds a stack bottom-up: the last frame yielded becomes active.
    fn from_iter<I: IntoIterator<Item = DialogFrame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

/// Address of a frame within a chain of nested stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameAddress {
    /// Nesting level; 0 is the root stack.
    pub level: usize,
    /// Bottom-up position within that level's stack.
    pub position: usize,
}

/// Finds the frame whose memory is shared by a frame at `level` that
/// inherits from `location`.
///
/// `chain[0]` is the root stack and `chain[n]` the stack hosted by the
/// active frame of `chain[n - 1]`. The walk starts at the addressed frame
/// and steps toward the bottom of its stack; the first frame owning a map
/// wins. On a miss it continues in the enclosing stack from its active
/// frame, the container hosting the level just searched. If no frame in
/// the chain owns a map, the addressed frame itself is returned so the
/// caller can allocate there.
///
/// Returns `None` when `location` no longer addresses a frame.
#[must_use]
pub fn locate_state(
    chain: &[&DialogStack],
    level: usize,
    location: StateLocation,
) -> Option<FrameAddress> {
    let target = match location {
        StateLocation::Local(position) => FrameAddress { level, position },
        StateLocation::Parent(position) => FrameAddress {
            level: level.checked_sub(1)?,
            position,
        },
    };
    chain.get(target.level)?.get(target.position)?;

    let mut current = target;
    loop {
        let stack = chain[current.level];
        let owner = (0..=current.position)
            .rev()
            .find(|&position| stack.get(position).is_some_and(|f| f.state.is_some()));
        if let Some(position) = owner {
            return Some(FrameAddress {
                level: current.level,
                position,
            });
        }
        let Some(enclosing) = current.level.checked_sub(1) else {
            return Some(target);
        };
        let Some(container) = chain[enclosing].len().checked_sub(1) else {
            return Some(target);
        };
        current = FrameAddress {
            level: enclosing,
            position: container,
        };
    }
}

//! Discrete action sets.

use serde::{Deserialize, Serialize};

/// A single discrete action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Idle,
    Left,
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    LongPass,
    HighPass,
    ShortPass,
    Shot,
    Sprint,
    ReleaseDirection,
    ReleaseSprint,
    Sliding,
    Dribble,
    ReleaseDribble,
    /// Let the built-in AI pick the action.
    BuiltinAi,
}

/// Actions available on the default action set, in index order.
pub const DEFAULT_ACTION_SET: &[Action] = &[
    Action::Idle,
    Action::Left,
    Action::TopLeft,
    Action::Top,
    Action::TopRight,
    Action::Right,
    Action::BottomRight,
    Action::Bottom,
    Action::BottomLeft,
    Action::LongPass,
    Action::HighPass,
    Action::ShortPass,
    Action::Shot,
    Action::Sprint,
    Action::ReleaseDirection,
    Action::ReleaseSprint,
    Action::Sliding,
    Action::Dribble,
    Action::ReleaseDribble,
];

/// The default set extended with `BuiltinAi`.
pub const V2_ACTION_SET: &[Action] = &[
    Action::Idle,
    Action::Left,
    Action::TopLeft,
    Action::Top,
    Action::TopRight,
    Action::Right,
    Action::BottomRight,
    Action::Bottom,
    Action::BottomLeft,
    Action::LongPass,
    Action::HighPass,
    Action::ShortPass,
    Action::Shot,
    Action::Sprint,
    Action::ReleaseDirection,
    Action::ReleaseSprint,
    Action::Sliding,
    Action::Dribble,
    Action::ReleaseDribble,
    Action::BuiltinAi,
];

/// Look up a named action set.
#[must_use]
pub fn action_set(name: &str) -> Option<&'static [Action]> {
    match name {
        "default" => Some(DEFAULT_ACTION_SET),
        "v2" => Some(V2_ACTION_SET),
        _ => None,
    }
}

/// A discrete action space `[0, n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    pub n: u32,
}

impl ActionSpace {
    #[must_use]
    pub const fn new(n: u32) -> Self {
        Self { n }
    }

    /// Space spanned by an action set.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn of(actions: &[Action]) -> Self {
        Self::new(actions.len() as u32)
    }

    /// Returns the action index if it lies within the space.
    #[must_use]
    pub fn index(&self, action: i64) -> Option<u32> {
        u32::try_from(action).ok().filter(|a| *a < self.n)
    }

    #[must_use]
    pub fn contains(&self, action: i64) -> bool {
        self.index(action).is_some()
    }
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self::of(DEFAULT_ACTION_SET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_space() {
        let space = ActionSpace::default();
        assert_eq!(space.n, 19);
        assert!(space.contains(0));
        assert!(space.contains(18));
        assert!(!space.contains(19));
        assert!(!space.contains(-1));
        assert_eq!(space.index(12), Some(12));
        assert_eq!(DEFAULT_ACTION_SET[12], Action::Shot);
    }

    #[test]
    fn test_named_sets() {
        assert_eq!(action_set("default").map(<[Action]>::len), Some(19));
        assert_eq!(action_set("v2").map(<[Action]>::len), Some(20));
        assert_eq!(action_set("full"), None);
        assert_eq!(V2_ACTION_SET.last(), Some(&Action::BuiltinAi));
    }

    #[test]
    fn test_out_of_u32_range() {
        let space = ActionSpace::new(4);
        assert!(!space.contains(i64::from(u32::MAX) + 1));
        assert!(!space.contains(i64::MIN));
    }
}

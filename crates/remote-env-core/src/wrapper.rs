//! Configuration surface needed by environment wrappers.

/// The subset of environment configuration wrappers are allowed to query.
pub trait WrapperConfig {
    /// Whether observations are mirrored when the controlled team switches sides.
    fn enable_sides_swap(&self) -> bool;

    /// Number of players controlled by the agent.
    fn number_of_players_agent_controls(&self) -> usize;
}

/// Wrapper configuration of a remote session: one controlled player, sides
/// swapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteWrapperConfig;

impl WrapperConfig for RemoteWrapperConfig {
    fn enable_sides_swap(&self) -> bool {
        true
    }

    fn number_of_players_agent_controls(&self) -> usize {
        1
    }
}

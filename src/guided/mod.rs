pub mod player;

pub use player::{GuidedPlayer, PlayerStatus};

pub mod pod;
pub mod player;
pub mod game;
pub mod deletion;

pub use pod::*;
pub use player::*;
pub use game::*;
pub use deletion::*;

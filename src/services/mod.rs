pub mod deletion;
pub mod health;
pub mod recording;
pub mod roundup;
pub mod stats;

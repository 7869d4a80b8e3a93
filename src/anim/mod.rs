pub mod idle;
pub mod pose;
pub mod session;
pub mod speech;


pub use pose::{blend, Pose};
pub use session::{AvatarSession, AvatarState};

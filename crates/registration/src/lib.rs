pub mod batch;
pub mod challenge;
pub mod identity;
pub mod session;
pub mod state;

#[cfg(test)]
mod testutil;

pub use batch::{BatchScheduler, SessionRunner};
pub use challenge::ChallengeWaiter;
pub use identity::IdentityGenerator;
pub use session::{LiveSessionRunner, RegistrationSession, SessionConfig, SessionDeps};
pub use state::SessionState;

use tracing::debug;

/// States of one registration attempt, in flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    ObtainMailbox,
    FillBasicInfo,
    SubmitBasicInfo,
    FillPassword,
    SubmitPassword,
    AwaitChallenge,
    SubmitPostChallenge,
    AwaitCode,
    SubmitCode,
    VerifyOutcome,
    Done,
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Init => "init",
            SessionState::ObtainMailbox => "obtain-mailbox",
            SessionState::FillBasicInfo => "fill-basic-info",
            SessionState::SubmitBasicInfo => "submit-basic-info",
            SessionState::FillPassword => "fill-password",
            SessionState::SubmitPassword => "submit-password",
            SessionState::AwaitChallenge => "await-challenge",
            SessionState::SubmitPostChallenge => "submit-post-challenge",
            SessionState::AwaitCode => "await-code",
            SessionState::SubmitCode => "submit-code",
            SessionState::VerifyOutcome => "verify-outcome",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Current state plus the visited history, for failure details and logs.
#[derive(Debug)]
pub struct SessionTrace {
    current: SessionState,
    history: Vec<SessionState>,
}

impl SessionTrace {
    pub fn new() -> Self {
        Self {
            current: SessionState::Init,
            history: vec![SessionState::Init],
        }
    }

    pub fn set(&mut self, state: SessionState) {
        debug!(from = %self.current, to = %state, "session transition");
        self.current = state;
        self.history.push(state);
    }

    pub fn current(&self) -> SessionState {
        self.current
    }

    pub fn history(&self) -> &[SessionState] {
        &self.history
    }
}

impl Default for SessionTrace {
    fn default() -> Self {
        Self::new()
    }
}

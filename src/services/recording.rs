use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use crate::database::models::{Game, GameOutcome, NewGame, Pod, PodPlayer};
use crate::utils::logging::log_workflow_transition;

/// Smallest number of players that makes up a game.
pub const MIN_PARTICIPANTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    #[error("pod {0} was not found")]
    PodNotFound(i64),
    #[error("pod {0} is not one of your pods")]
    PodNotOffered(i64),
    #[error("pod '{pod}' needs at least two players, it has {players}")]
    RosterTooSmall { pod: String, players: usize },
    #[error("player {0} is not a member of this pod")]
    UnknownPlayer(i64),
    #[error("player {0} was selected twice")]
    DuplicateParticipant(i64),
    #[error("a game needs at least two participants, {selected} selected")]
    TooFewParticipants { selected: usize },
    #[error("a game can only have one winner")]
    MultipleWinners,
    #[error("a game needs a winner unless it ended in a draw")]
    NoWinner,
    #[error("every participant needs an outcome")]
    OutcomesIncomplete,
    #[error("player {0} is not a participant in this game")]
    NotAParticipant(i64),
    #[error("a player cannot eliminate themselves")]
    SelfElimination,
    #[error("player {0} has already been eliminated")]
    AlreadyEliminated(i64),
    #[error("the winner cannot be eliminated")]
    WinnerEliminated,
    #[error("player {0} drew and cannot have been eliminated")]
    DrawEliminated(i64),
    #[error("that action is not available while {0}")]
    UnexpectedInput(&'static str),
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("invalid game: {0}")]
    Invalid(#[from] RecordingError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A pod together with its players.
#[derive(Debug, Clone, PartialEq)]
pub struct PodRoster {
    pub pod: Pod,
    pub players: Vec<PodPlayer>,
}

impl PodRoster {
    pub async fn load(pool: &SqlitePool, pod_id: i64) -> Result<Option<Self>, sqlx::Error> {
        let Some(pod) = Pod::find_by_id(pool, pod_id).await? else {
            return Ok(None);
        };
        let players = PodPlayer::find_by_pod(pool, pod_id).await?;
        Ok(Some(Self { pod, players }))
    }

    pub fn player(&self, pods_player_id: i64) -> Option<&PodPlayer> {
        self.players.iter().find(|p| p.pods_player_id == pods_player_id)
    }
}

/// A finished game has exactly one winner, or none when at least one player drew.
fn check_outcomes(outcomes: &[GameOutcome]) -> Result<(), RecordingError> {
    let wins = outcomes.iter().filter(|o| **o == GameOutcome::Win).count();
    if wins > 1 {
        return Err(RecordingError::MultipleWinners);
    }
    if wins == 0 && !outcomes.contains(&GameOutcome::Draw) {
        return Err(RecordingError::NoWinner);
    }
    Ok(())
}

/// The game being assembled by a recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameDraft {
    pub pod: Pod,
    /// In selection order
    pub participants: Vec<PodPlayer>,
    /// Aligned with `participants`; shorter while outcomes are still being assigned
    pub outcomes: Vec<GameOutcome>,
    /// `(eliminator_id, eliminated_id)` pairs
    pub eliminations: Vec<(i64, i64)>,
}

impl GameDraft {
    pub fn new(pod: Pod, participants: Vec<PodPlayer>) -> Self {
        Self {
            pod,
            participants,
            outcomes: Vec::new(),
            eliminations: Vec::new(),
        }
    }

    pub fn participant(&self, pods_player_id: i64) -> Option<&PodPlayer> {
        self.participants
            .iter()
            .find(|p| p.pods_player_id == pods_player_id)
    }

    pub fn outcome_of(&self, pods_player_id: i64) -> Option<GameOutcome> {
        self.participants
            .iter()
            .position(|p| p.pods_player_id == pods_player_id)
            .and_then(|index| self.outcomes.get(index).copied())
    }

    pub fn winner(&self) -> Option<&PodPlayer> {
        self.participants
            .iter()
            .zip(&self.outcomes)
            .find(|(_, outcome)| **outcome == GameOutcome::Win)
            .map(|(player, _)| player)
    }

    /// The participant whose outcome is asked for next.
    pub fn awaiting_outcome(&self) -> Option<&PodPlayer> {
        self.participants.get(self.outcomes.len())
    }

    pub fn is_eliminated(&self, pods_player_id: i64) -> bool {
        self.eliminations
            .iter()
            .any(|(_, eliminated)| *eliminated == pods_player_id)
    }

    pub fn eliminated_by(&self, eliminator_id: i64) -> Vec<&PodPlayer> {
        self.eliminations
            .iter()
            .filter(|(eliminator, _)| *eliminator == eliminator_id)
            .filter_map(|(_, eliminated)| self.participant(*eliminated))
            .collect()
    }

    /// Checks an elimination against the draft without recording it.
    pub fn check_elimination(&self, eliminator_id: i64, eliminated_id: i64) -> Result<(), RecordingError> {
        if self.participant(eliminator_id).is_none() {
            return Err(RecordingError::NotAParticipant(eliminator_id));
        }
        if self.participant(eliminated_id).is_none() {
            return Err(RecordingError::NotAParticipant(eliminated_id));
        }
        if eliminator_id == eliminated_id {
            return Err(RecordingError::SelfElimination);
        }
        match self.outcome_of(eliminated_id) {
            Some(GameOutcome::Win) => return Err(RecordingError::WinnerEliminated),
            Some(GameOutcome::Draw) => return Err(RecordingError::DrawEliminated(eliminated_id)),
            _ => {}
        }
        if self.is_eliminated(eliminated_id) {
            return Err(RecordingError::AlreadyEliminated(eliminated_id));
        }
        Ok(())
    }

    /// Validates the whole draft before it is committed.
    pub fn validate(&self) -> Result<(), RecordingError> {
        if self.participants.len() < MIN_PARTICIPANTS {
            return Err(RecordingError::TooFewParticipants {
                selected: self.participants.len(),
            });
        }

        for (index, player) in self.participants.iter().enumerate() {
            if player.pod_id != self.pod.pod_id {
                return Err(RecordingError::UnknownPlayer(player.pods_player_id));
            }
            if self.participants[..index]
                .iter()
                .any(|p| p.pods_player_id == player.pods_player_id)
            {
                return Err(RecordingError::DuplicateParticipant(player.pods_player_id));
            }
        }

        if self.outcomes.len() != self.participants.len() {
            return Err(RecordingError::OutcomesIncomplete);
        }
        check_outcomes(&self.outcomes)?;

        let mut seen = GameDraft::new(self.pod.clone(), self.participants.clone());
        seen.outcomes = self.outcomes.clone();
        for (eliminator, eliminated) in &self.eliminations {
            seen.check_elimination(*eliminator, *eliminated)?;
            seen.eliminations.push((*eliminator, *eliminated));
        }

        Ok(())
    }

    pub fn to_new_game(&self, created_at: DateTime<Utc>) -> NewGame {
        NewGame {
            pod_id: self.pod.pod_id,
            created_at,
            results: self
                .participants
                .iter()
                .zip(&self.outcomes)
                .map(|(player, outcome)| (player.pods_player_id, *outcome))
                .collect(),
            eliminations: self.eliminations.clone(),
        }
    }

    /// Plain-text summary shown before confirming.
    pub fn summary(&self) -> String {
        let mut text = format!("Pod: {}\n", self.pod.name);
        for (index, player) in self.participants.iter().enumerate() {
            match self.outcomes.get(index) {
                Some(outcome) => text.push_str(&format!("{} {} ({})\n", outcome.emoji(), player.name, outcome)),
                None => text.push_str(&format!("❔ {}\n", player.name)),
            }
        }

        if !self.eliminations.is_empty() {
            text.push_str("Eliminations:\n");
            for (eliminator, eliminated) in &self.eliminations {
                let name = |id: i64| {
                    self.participant(id)
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| id.to_string())
                };
                text.push_str(&format!("⚔️ {} eliminated {}\n", name(*eliminator), name(*eliminated)));
            }
        }

        text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordingState {
    SelectPod {
        choices: Vec<Pod>,
    },
    SelectParticipants {
        roster: PodRoster,
        selected: Vec<i64>,
    },
    AssignOutcomes {
        draft: GameDraft,
    },
    RecordEliminations {
        draft: GameDraft,
        /// Index into `draft.participants`
        eliminator: usize,
    },
    Confirm {
        draft: GameDraft,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordingInput {
    /// A pod was picked; `roster` is `None` when it could not be loaded.
    Pod { pod_id: i64, roster: Option<PodRoster> },
    TogglePlayer(i64),
    ResetPlayers,
    DoneSelecting,
    Outcome(GameOutcome),
    Eliminate(i64),
    ResetEliminations,
    NextEliminator,
    SkipEliminations,
    Confirm,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: RecordingState,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Advanced(Transition),
    /// The input was refused; the state is unchanged and its prompt repeated.
    Rejected {
        error: RecordingError,
        transition: Transition,
    },
    Commit(GameDraft),
    Cancelled,
}

fn advance(state: RecordingState) -> Step {
    Step::Advanced(state.into_transition())
}

fn reject(state: RecordingState, error: RecordingError) -> Step {
    Step::Rejected {
        error,
        transition: state.into_transition(),
    }
}

impl RecordingState {
    pub fn name(&self) -> &'static str {
        match self {
            RecordingState::SelectPod { .. } => "selecting a pod",
            RecordingState::SelectParticipants { .. } => "selecting participants",
            RecordingState::AssignOutcomes { .. } => "assigning outcomes",
            RecordingState::RecordEliminations { .. } => "recording eliminations",
            RecordingState::Confirm { .. } => "confirming",
        }
    }

    pub fn draft(&self) -> Option<&GameDraft> {
        match self {
            RecordingState::AssignOutcomes { draft }
            | RecordingState::RecordEliminations { draft, .. }
            | RecordingState::Confirm { draft } => Some(draft),
            _ => None,
        }
    }

    pub fn pod_id(&self) -> Option<i64> {
        match self {
            RecordingState::SelectPod { .. } => None,
            RecordingState::SelectParticipants { roster, .. } => Some(roster.pod.pod_id),
            other => other.draft().map(|d| d.pod.pod_id),
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            RecordingState::SelectPod { .. } => "Select the pod this game was played in:".to_string(),
            RecordingState::SelectParticipants { roster, selected } => {
                let names: Vec<&str> = selected
                    .iter()
                    .filter_map(|id| roster.player(*id))
                    .map(|p| p.name.as_str())
                    .collect();
                if names.is_empty() {
                    "Select players to add to the game:".to_string()
                } else {
                    format!("Select players to add to the game:\nSelected: {}", names.join(", "))
                }
            }
            RecordingState::AssignOutcomes { draft } => match draft.awaiting_outcome() {
                Some(player) => format!("Select outcome for {}:", player.name),
                None => "All outcomes assigned.".to_string(),
            },
            RecordingState::RecordEliminations { draft, eliminator } => {
                let Some(player) = draft.participants.get(*eliminator) else {
                    return "No more eliminations to record.".to_string();
                };
                let victims: Vec<&str> = draft
                    .eliminated_by(player.pods_player_id)
                    .into_iter()
                    .map(|p| p.name.as_str())
                    .collect();
                if victims.is_empty() {
                    format!("Select players eliminated by {}:", player.name)
                } else {
                    format!(
                        "Select players eliminated by {}:\nEliminated so far: {}",
                        player.name,
                        victims.join(", ")
                    )
                }
            }
            RecordingState::Confirm { draft } => format!(
                "Game summary:\n{}\nType 'confirm' to save the game or 'cancel' to discard it.",
                draft.summary()
            ),
        }
    }

    pub fn into_transition(self) -> Transition {
        let prompt = self.prompt();
        Transition { state: self, prompt }
    }

    /// Feeds one input into the workflow.
    pub fn apply(self, input: RecordingInput) -> Step {
        use RecordingInput as In;

        match (self, input) {
            (_, In::Cancel) => Step::Cancelled,

            (RecordingState::SelectPod { choices }, In::Pod { pod_id, roster }) => {
                if !choices.iter().any(|p| p.pod_id == pod_id) {
                    return reject(RecordingState::SelectPod { choices }, RecordingError::PodNotOffered(pod_id));
                }
                let Some(roster) = roster.filter(|r| r.pod.pod_id == pod_id) else {
                    return reject(RecordingState::SelectPod { choices }, RecordingError::PodNotFound(pod_id));
                };
                if roster.players.len() < MIN_PARTICIPANTS {
                    let error = RecordingError::RosterTooSmall {
                        pod: roster.pod.name.clone(),
                        players: roster.players.len(),
                    };
                    return reject(RecordingState::SelectPod { choices }, error);
                }
                advance(RecordingState::SelectParticipants {
                    roster,
                    selected: Vec::new(),
                })
            }

            (RecordingState::SelectParticipants { roster, mut selected }, In::TogglePlayer(player_id)) => {
                if roster.player(player_id).is_none() {
                    return reject(
                        RecordingState::SelectParticipants { roster, selected },
                        RecordingError::UnknownPlayer(player_id),
                    );
                }
                match selected.iter().position(|id| *id == player_id) {
                    Some(index) => {
                        selected.remove(index);
                    }
                    None => selected.push(player_id),
                }
                advance(RecordingState::SelectParticipants { roster, selected })
            }

            (RecordingState::SelectParticipants { roster, .. }, In::ResetPlayers) => {
                advance(RecordingState::SelectParticipants {
                    roster,
                    selected: Vec::new(),
                })
            }

            (RecordingState::SelectParticipants { roster, selected }, In::DoneSelecting) => {
                if selected.len() < MIN_PARTICIPANTS {
                    let error = RecordingError::TooFewParticipants { selected: selected.len() };
                    return reject(RecordingState::SelectParticipants { roster, selected }, error);
                }
                let participants = selected
                    .iter()
                    .filter_map(|id| roster.player(*id).cloned())
                    .collect();
                advance(RecordingState::AssignOutcomes {
                    draft: GameDraft::new(roster.pod, participants),
                })
            }

            (RecordingState::AssignOutcomes { mut draft }, In::Outcome(outcome)) => {
                if draft.awaiting_outcome().is_none() {
                    return reject(
                        RecordingState::AssignOutcomes { draft },
                        RecordingError::UnexpectedInput("assigning outcomes"),
                    );
                }
                if outcome == GameOutcome::Win && draft.winner().is_some() {
                    return reject(RecordingState::AssignOutcomes { draft }, RecordingError::MultipleWinners);
                }
                draft.outcomes.push(outcome);
                if draft.awaiting_outcome().is_none() {
                    if let Err(error) = check_outcomes(&draft.outcomes) {
                        draft.outcomes.pop();
                        return reject(RecordingState::AssignOutcomes { draft }, error);
                    }
                }
                if draft.awaiting_outcome().is_some() {
                    advance(RecordingState::AssignOutcomes { draft })
                } else {
                    advance(RecordingState::RecordEliminations { draft, eliminator: 0 })
                }
            }

            (RecordingState::RecordEliminations { mut draft, eliminator }, In::Eliminate(eliminated_id)) => {
                let Some(eliminator_id) = draft.participants.get(eliminator).map(|p| p.pods_player_id) else {
                    return advance(RecordingState::Confirm { draft });
                };
                if let Err(error) = draft.check_elimination(eliminator_id, eliminated_id) {
                    return reject(RecordingState::RecordEliminations { draft, eliminator }, error);
                }
                draft.eliminations.push((eliminator_id, eliminated_id));
                advance(RecordingState::RecordEliminations { draft, eliminator })
            }

            (RecordingState::RecordEliminations { mut draft, eliminator }, In::ResetEliminations) => {
                if let Some(eliminator_id) = draft.participants.get(eliminator).map(|p| p.pods_player_id) {
                    draft.eliminations.retain(|(by, _)| *by != eliminator_id);
                }
                advance(RecordingState::RecordEliminations { draft, eliminator })
            }

            (RecordingState::RecordEliminations { draft, eliminator }, In::NextEliminator) => {
                let next = eliminator + 1;
                if next < draft.participants.len() {
                    advance(RecordingState::RecordEliminations { draft, eliminator: next })
                } else {
                    advance(RecordingState::Confirm { draft })
                }
            }

            (RecordingState::RecordEliminations { draft, .. }, In::SkipEliminations) => {
                advance(RecordingState::Confirm { draft })
            }

            (RecordingState::Confirm { draft }, In::Confirm) => match draft.validate() {
                Ok(()) => Step::Commit(draft),
                Err(error) => reject(RecordingState::Confirm { draft }, error),
            },

            (state, _) => {
                let error = RecordingError::UnexpectedInput(state.name());
                reject(state, error)
            }
        }
    }
}

/// Writes a confirmed draft as a single transaction.
pub async fn commit(
    pool: &SqlitePool,
    draft: &GameDraft,
    now: DateTime<Utc>,
) -> Result<Game, CommitError> {
    draft.validate()?;
    let game = Game::record(pool, &draft.to_new_game(now)).await?;
    Ok(game)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat_id: i64,
    pub user_id: u64,
}

#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub state: RecordingState,
    pub last_activity: DateTime<Utc>,
}

/// In-flight recording workflows keyed by chat and user.
#[derive(Clone)]
pub struct RecordingSessions {
    sessions: Arc<DashMap<SessionKey, RecordingSession>>,
    timeout: Duration,
}

impl RecordingSessions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            timeout,
        }
    }

    fn is_expired(&self, session: &RecordingSession, now: DateTime<Utc>) -> bool {
        (now - session.last_activity)
            .to_std()
            .map(|idle| idle > self.timeout)
            .unwrap_or(false)
    }

    /// Stores a fresh session, replacing any earlier one for the same key.
    pub fn start(&self, key: SessionKey, state: RecordingState, now: DateTime<Utc>) -> bool {
        log_workflow_transition(key.chat_id, key.user_id, "idle", state.name());
        self.sessions
            .insert(
                key,
                RecordingSession {
                    state,
                    last_activity: now,
                },
            )
            .is_some()
    }

    pub fn active(&self, key: SessionKey, now: DateTime<Utc>) -> Option<RecordingState> {
        {
            let session = self.sessions.get(&key)?;
            if !self.is_expired(&session, now) {
                return Some(session.state.clone());
            }
        }
        self.sessions.remove(&key);
        log_workflow_transition(key.chat_id, key.user_id, "expired", "idle");
        None
    }

    /// Applies an input to the session for `key`, or returns `None` when there is none.
    ///
    /// A `Commit` step leaves the session in `Confirm` until [`finish`](Self::finish) is called.
    pub fn apply(&self, key: SessionKey, input: RecordingInput, now: DateTime<Utc>) -> Option<Step> {
        let (_, session) = self.sessions.remove(&key)?;
        if self.is_expired(&session, now) {
            log_workflow_transition(key.chat_id, key.user_id, "expired", "idle");
            return None;
        }

        let from = session.state.name();
        let step = session.state.apply(input);
        match &step {
            Step::Advanced(transition) | Step::Rejected { transition, .. } => {
                log_workflow_transition(key.chat_id, key.user_id, from, transition.state.name());
                self.sessions.insert(
                    key,
                    RecordingSession {
                        state: transition.state.clone(),
                        last_activity: now,
                    },
                );
            }
            Step::Commit(draft) => {
                log_workflow_transition(key.chat_id, key.user_id, from, "committing");
                self.sessions.insert(
                    key,
                    RecordingSession {
                        state: RecordingState::Confirm { draft: draft.clone() },
                        last_activity: now,
                    },
                );
            }
            Step::Cancelled => {
                log_workflow_transition(key.chat_id, key.user_id, from, "cancelled");
            }
        }
        Some(step)
    }

    pub fn finish(&self, key: SessionKey) -> bool {
        self.sessions.remove(&key).is_some()
    }

    /// Drops sessions idle for longer than the timeout, returning how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !self.is_expired(session, now));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

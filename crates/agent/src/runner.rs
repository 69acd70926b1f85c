//! Turn orchestration.
//!
//! One turn moves through
//! `AwaitingInput → Coordinating → Responded → WritingBack → AwaitingInput`,
//! publishing each phase change on the event bus:
//!
//! 1. fetch or create the session
//! 2. run the coordinator over the stored history plus the new message
//! 3. append the new messages and the state delta in one store call
//! 4. run the after-turn hooks against the updated session

use chrono::Utc;
use fitcoach_core::agent::Agent;
use fitcoach_core::error::Result;
use fitcoach_core::event::{DomainEvent, EventBus, TurnPhase};
use fitcoach_core::message::{Conversation, Message};
use fitcoach_core::session::{SessionKey, SessionStore, TurnState};
use fitcoach_core::tool::ToolContext;
use std::sync::Arc;
use tracing::{info, warn};
use crate::fitness::{DIET_SLOT, WEEKLY_WORKOUT_SLOT, WORKOUT_SLOT};
use crate::hooks::AfterTurnHook;
use crate::llm_agent::LlmAgent;

/// What one turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The coordinator's final answer
    pub reply: String,

    /// Set when the workout planner ran during this turn
    pub workout_plan: Option<String>,

    /// Set when the diet planner ran during this turn
    pub diet_plan: Option<String>,

    /// Set when the workout planner saved a new or changed week
    pub weekly_workout_plan: Option<String>,
}

pub struct Runner {
    app_name: String,
    coordinator: Arc<LlmAgent>,
    sessions: Arc<dyn SessionStore>,
    hooks: Vec<Arc<dyn AfterTurnHook>>,
    events: Arc<EventBus>,
}

impl Runner {
    pub fn new(
        app_name: impl Into<String>,
        coordinator: Arc<LlmAgent>,
        sessions: Arc<dyn SessionStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            coordinator,
            sessions,
            hooks: Vec::new(),
            events,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn AfterTurnHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn coordinator_name(&self) -> &str {
        self.coordinator.name()
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    fn phase(&self, session_id: &str, phase: TurnPhase) {
        self.events.publish(DomainEvent::phase(session_id, phase));
    }

    /// Run one user message through the coordinator and persist the result.
    pub async fn run_turn(&self, user_id: &str, session_id: &str, text: &str) -> Result<TurnOutcome> {
        self.phase(session_id, TurnPhase::Coordinating);
        let result = self.coordinate(user_id, session_id, text).await;
        if let Err(e) = &result {
            warn!(session = session_id, error = %e, "Turn failed");
            self.events.publish(DomainEvent::ErrorOccurred {
                context: format!("turn {}/{user_id}/{session_id}", self.app_name),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
        self.phase(session_id, TurnPhase::AwaitingInput);
        result
    }

    async fn coordinate(&self, user_id: &str, session_id: &str, text: &str) -> Result<TurnOutcome> {
        let key = SessionKey::new(&self.app_name, user_id, session_id);
        let mut session = self.sessions.get_or_create(&key).await?;

        let turn = Arc::new(TurnState::new(session.state.clone()));
        let ctx = ToolContext::new(
            &self.app_name,
            user_id,
            session_id,
            turn.clone(),
            self.events.clone(),
        );

        let mut conversation = Conversation::from_messages(session.events.clone());
        let start = conversation.len();
        conversation.push(Message::user(text).with_author("user"));

        let reply = self.coordinator.run_conversation(&mut conversation, &ctx).await?;
        self.phase(session_id, TurnPhase::Responded);

        let new_events = conversation.messages.split_off(start);
        let delta = turn.delta();
        let event_count = new_events.len();
        self.sessions.append(&mut session, new_events, delta.clone()).await?;

        info!(
            session = %key,
            events = event_count,
            slots = delta.len(),
            "Turn persisted"
        );

        self.phase(session_id, TurnPhase::WritingBack);
        for hook in &self.hooks {
            hook.after_turn(&session, &ctx).await?;
        }

        let slot = |name: &str| delta.get(name).and_then(|v| v.as_str()).map(str::to_string);
        Ok(TurnOutcome {
            reply,
            workout_plan: slot(WORKOUT_SLOT),
            diet_plan: slot(DIET_SLOT),
            weekly_workout_plan: slot(WEEKLY_WORKOUT_SLOT),
        })
    }
}

//! Handler registry: which conversational role speaks in each state.
//!
//! The terminal state has an explicit `Terminal` route — there is no
//! nullable "no handler" map entry to forget about.

use std::collections::HashMap;

use haven_types::SessionState;
use serde::{Deserialize, Serialize};

/// Conversational role that produces the response for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    /// Welcome, consent, and triage intake.
    Greeter,
    /// The supportive listening loop.
    Empathy,
    /// Dedicated risk check-in.
    RiskAssessor,
    /// Resource lookup and presentation.
    ResourceGuide,
    /// Handoff messaging while a transfer runs.
    Escalation,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentRole::Greeter => "greeter",
            AgentRole::Empathy => "empathy",
            AgentRole::RiskAssessor => "risk-assessor",
            AgentRole::ResourceGuide => "resource-guide",
            AgentRole::Escalation => "escalation",
        };
        write!(f, "{}", s)
    }
}

/// Where a state routes: to an agent role, or nowhere (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Agent(AgentRole),
    Terminal,
}

/// State → route table.
pub struct HandlerRegistry {
    routes: HashMap<SessionState, Route>,
}

impl HandlerRegistry {
    /// The standard routing: greeter through intake, empathy in the loop,
    /// specialists for their states, terminal for `Close`.
    pub fn standard() -> Self {
        let mut routes = HashMap::new();
        routes.insert(SessionState::Init, Route::Agent(AgentRole::Greeter));
        routes.insert(SessionState::Consented, Route::Agent(AgentRole::Greeter));
        routes.insert(SessionState::Triage, Route::Agent(AgentRole::Greeter));
        routes.insert(SessionState::SupportLoop, Route::Agent(AgentRole::Empathy));
        routes.insert(SessionState::RiskCheck, Route::Agent(AgentRole::RiskAssessor));
        routes.insert(
            SessionState::Resources,
            Route::Agent(AgentRole::ResourceGuide),
        );
        routes.insert(SessionState::Escalate, Route::Agent(AgentRole::Escalation));
        routes.insert(SessionState::Close, Route::Terminal);
        Self { routes }
    }

    /// Override the route for a state.
    pub fn set(&mut self, state: SessionState, route: Route) {
        self.routes.insert(state, route);
    }

    /// Route for a state. Unmapped states are terminal.
    pub fn route(&self, state: SessionState) -> Route {
        self.routes.get(&state).copied().unwrap_or(Route::Terminal)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

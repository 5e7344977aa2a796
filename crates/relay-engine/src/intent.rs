//! Intent derivation from raw signals.
//!
//! A signal encodes its meaning twice: in the semantic label (`id`)
//! and in the position transition (`previous` -> `target`). Both
//! encodings are derived independently and must agree, and the
//! buy/sell action must match the side the intent implies. Any
//! disagreement yields no action; a silent skip beats a wrong trade.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::warn;

use relay_core::{Intent, PositionSide, Signal};

/// Why a signal produced no intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoopReason {
    /// The id label is not a recognized alias.
    UnknownLabel,
    /// The position transition maps to no action (e.g. flat -> flat).
    NoTransition,
    /// Label-derived and transition-derived intents disagree.
    CandidateMismatch,
    /// The action field does not match the intent's side.
    ActionMismatch,
}

impl std::fmt::Display for NoopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLabel => write!(f, "unrecognized signal label"),
            Self::NoTransition => write!(f, "position transition maps to no action"),
            Self::CandidateMismatch => write!(f, "signal label and transition disagree"),
            Self::ActionMismatch => write!(f, "signal action does not match intent side"),
        }
    }
}

/// Result of intent derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derived {
    Intent(Intent),
    Noop(NoopReason),
}

impl Derived {
    pub fn intent(&self) -> Option<Intent> {
        match self {
            Self::Intent(intent) => Some(*intent),
            Self::Noop(_) => None,
        }
    }
}

/// Recognized id label aliases.
///
/// Strategies emit a handful of spellings for the same four events;
/// anything outside this table is unknown, never guessed.
static LABEL_ALIASES: Lazy<HashMap<&'static str, Intent>> = Lazy::new(|| {
    HashMap::from([
        ("open_long", Intent::OpenLong),
        ("long_entry", Intent::OpenLong),
        ("enter_long", Intent::OpenLong),
        ("open_short", Intent::OpenShort),
        ("short_entry", Intent::OpenShort),
        ("enter_short", Intent::OpenShort),
        ("close_long", Intent::CloseLong),
        ("long_exit", Intent::CloseLong),
        ("exit_long", Intent::CloseLong),
        ("close_short", Intent::CloseShort),
        ("short_exit", Intent::CloseShort),
        ("exit_short", Intent::CloseShort),
    ])
});

/// Candidate intent from the id label.
fn from_label(id: &str) -> Option<Intent> {
    LABEL_ALIASES.get(id.trim().to_lowercase().as_str()).copied()
}

/// Candidate intent from the position transition.
fn from_transition(target: PositionSide, previous: PositionSide) -> Option<Intent> {
    match (target, previous) {
        (PositionSide::Flat, PositionSide::Long) => Some(Intent::CloseLong),
        (PositionSide::Flat, PositionSide::Short) => Some(Intent::CloseShort),
        (PositionSide::Long, prev) if prev != PositionSide::Long => Some(Intent::OpenLong),
        (PositionSide::Short, prev) if prev != PositionSide::Short => Some(Intent::OpenShort),
        _ => None,
    }
}

/// Derive the single unambiguous intent for a signal, or a noop.
pub fn derive_intent(signal: &Signal) -> Derived {
    let Some(label_intent) = from_label(&signal.id) else {
        warn!(
            id = %signal.id,
            "Unrecognized signal label, no action taken"
        );
        return Derived::Noop(NoopReason::UnknownLabel);
    };

    let Some(transition_intent) =
        from_transition(signal.target_position, signal.previous_position)
    else {
        warn!(
            id = %signal.id,
            target = %signal.target_position,
            previous = %signal.previous_position,
            "Signal transition maps to no action"
        );
        return Derived::Noop(NoopReason::NoTransition);
    };

    if label_intent != transition_intent {
        warn!(
            id = %signal.id,
            label_intent = %label_intent,
            transition_intent = %transition_intent,
            "Signal label and transition disagree, no action taken"
        );
        return Derived::Noop(NoopReason::CandidateMismatch);
    }

    if signal.action.side() != label_intent.side() {
        warn!(
            id = %signal.id,
            action = %signal.action,
            expected = %label_intent.side(),
            "Signal action does not match intent side, no action taken"
        );
        return Derived::Noop(NoopReason::ActionMismatch);
    }

    Derived::Intent(label_intent)
}

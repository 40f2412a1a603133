use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSpan {
    pub game_id: Option<String>,
    pub game_name: Option<String>,
    pub start_at: NaiveDateTime,
}

/// Category-span state of a single channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SpanState {
    #[default]
    NoSpan,
    Open(OpenSpan),
}

/// Storage work required to move a channel to its next span state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanTransition {
    Unchanged,
    /// Open a first span for a channel that has none.
    Open { start_at: NaiveDateTime },
    /// Close the open span and start the next one at the same instant,
    /// never earlier than the open span's start.
    Switch {
        close_at: NaiveDateTime,
        start_at: NaiveDateTime,
    },
}

impl SpanState {
    pub fn from_open(open: Option<&OpenSpan>) -> Self {
        match open {
            Some(span) => Self::Open(span.clone()),
            None => Self::NoSpan,
        }
    }

    /// Category changes are never backdated: `start_hint` only seeds a
    /// channel's first span.
    pub fn touch(
        &self,
        game_id: Option<&str>,
        start_hint: Option<NaiveDateTime>,
        now: NaiveDateTime,
    ) -> SpanTransition {
        match self {
            Self::NoSpan => SpanTransition::Open {
                start_at: start_hint.unwrap_or(now),
            },
            Self::Open(open) if open.game_id.as_deref() == game_id => SpanTransition::Unchanged,
            Self::Open(open) => {
                let close_at = now.max(open.start_at);
                SpanTransition::Switch {
                    close_at,
                    start_at: close_at,
                }
            }
        }
    }
}

//! Stateless pagination/filter callback protocol
//!
//! Search result pages carry inline buttons whose payloads encode the next
//! requested action as `action_filter_query`. No session is kept server
//! side: the current page number is recovered by parsing the page marker out
//! of the previously rendered message text, and the freshly rendered page
//! becomes the state for the next interaction. Losing all process state
//! between two button presses is therefore harmless.
//!
//! The page marker is a versioned contract between this module and
//! [`crate::telegram::render`]: v1 is the Chinese wording the renderer
//! emits, v2 is an English variant accepted for forward compatibility.
//! Renderer changes must keep at least one recognized marker intact.

use lazy_regex::regex;
use thiserror::Error;

/// Actions a result-page button can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// The inert page indicator between prev/next
    Current,
    /// Previous page, same filter and query
    Prev,
    /// Next page, same filter and query
    Next,
    /// Switch filter, back to page 1
    Filter,
}

impl CallbackAction {
    pub fn as_str(self) -> &'static str {
        match self {
            CallbackAction::Current => "current",
            CallbackAction::Prev => "prev",
            CallbackAction::Next => "next",
            CallbackAction::Filter => "filter",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "current" => Some(CallbackAction::Current),
            "prev" => Some(CallbackAction::Prev),
            "next" => Some(CallbackAction::Next),
            "filter" => Some(CallbackAction::Filter),
            _ => None,
        }
    }
}

/// What a decoded callback asks the handler to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedAction {
    /// Acknowledge the tap and change nothing (the page-indicator button)
    Acknowledge,
    /// Re-run the search with these parameters and re-render in place
    Search { query: String, filter: String, page: i64 },
}

/// Decode failures. All of these are user-facing: they surface as a short
/// callback answer, never as a crash or a retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload did not match the `action_filter_query` grammar
    #[error("malformed callback payload: {0}")]
    MalformedPayload(String),

    /// Payload had the right shape but an unknown action
    #[error("unknown callback action: {0}")]
    UnknownAction(String),

    /// No recognized page marker in the rendered message text
    #[error("rendered message carries no recognizable page state")]
    UnparseableState,

    /// `prev` pressed while already on page 1
    #[error("already on the first page")]
    AlreadyFirstPage,

    /// `next` pressed while already on the last page
    #[error("already on the last page")]
    AlreadyLastPage,
}

impl DecodeError {
    /// Short answer text shown to the user who pressed the button.
    pub fn user_message(&self) -> &'static str {
        match self {
            DecodeError::AlreadyFirstPage => "已经是第一页了",
            DecodeError::AlreadyLastPage => "已经是最后一页了",
            DecodeError::UnparseableState => "页面状态已失效，请重新搜索",
            DecodeError::MalformedPayload(_) | DecodeError::UnknownAction(_) => "操作失败",
        }
    }
}

/// Encodes a button payload. The query may itself contain `_`; decoding
/// splits on the first two separators only, so the payload stays unambiguous.
pub fn encode(action: CallbackAction, filter: &str, query: &str) -> String {
    match action {
        CallbackAction::Current => "current".to_string(),
        _ => format!("{}_{}_{}", action.as_str(), filter, query),
    }
}

/// Extracts `(current page, total pages)` from rendered message text,
/// trying each versioned page marker in order. Group 1 is the current page,
/// group 2 the total page count.
pub fn extract_page_state(rendered_text: &str) -> Option<(i64, i64)> {
    let page_markers = [
        // v1: what render::search_page produces today
        regex!(r"\(第 (\d+) 页 / 共 (\d+) 页\)"),
        // v2: accepted so a future latinized rendering stays decodable
        regex!(r"\(page (\d+) of (\d+)\)"),
    ];
    for marker in page_markers {
        if let Some(caps) = marker.captures(rendered_text) {
            let page = caps.get(1)?.as_str().parse().ok()?;
            let total = caps.get(2)?.as_str().parse().ok()?;
            return Some((page, total));
        }
    }
    None
}

/// Decodes a callback payload against the rendered text it arrived on.
///
/// The rendered text is the only source of prior pagination state; the
/// payload itself carries only the action, filter and query.
pub fn decode(payload: &str, rendered_text: &str) -> Result<DecodedAction, DecodeError> {
    let mut parts = payload.splitn(3, '_');
    let action_str = parts
        .next()
        .ok_or_else(|| DecodeError::MalformedPayload(payload.to_string()))?;
    let action = CallbackAction::parse(action_str).ok_or_else(|| DecodeError::UnknownAction(action_str.to_string()))?;

    if action == CallbackAction::Current {
        return Ok(DecodedAction::Acknowledge);
    }

    let filter = parts.next();
    let query = parts.next();
    let (Some(filter), Some(query)) = (filter, query) else {
        return Err(DecodeError::MalformedPayload(payload.to_string()));
    };

    let (page, total) = extract_page_state(rendered_text).ok_or(DecodeError::UnparseableState)?;

    let page = match action {
        CallbackAction::Filter => 1,
        CallbackAction::Prev => {
            if page <= 1 {
                return Err(DecodeError::AlreadyFirstPage);
            }
            page - 1
        }
        CallbackAction::Next => {
            if page >= total {
                return Err(DecodeError::AlreadyLastPage);
            }
            page + 1
        }
        CallbackAction::Current => unreachable!("handled above"),
    };

    Ok(DecodedAction::Search {
        query: query.to_string(),
        filter: filter.to_string(),
        page,
    })
}

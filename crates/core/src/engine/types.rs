use thiserror::Error;
use tokio::sync::oneshot;

use crate::catalog::{ItemId, SortDirection, SortKey};
use crate::discover::{DiscoverPage, FetchError};

/// Errors returned by [`EngineHandle`](super::EngineHandle) calls.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("Engine is not running")]
    Closed,
}

/// Commands processed by the engine loop, in arrival order.
#[derive(Debug)]
pub(crate) enum EngineCommand {
    SetFilter {
        sort_key: SortKey,
        direction: SortDirection,
        reply: oneshot::Sender<()>,
    },
    /// Replies whether a fetch was issued.
    LoadNextPage { reply: oneshot::Sender<bool> },
    /// Replies the new favorite flag, `None` for an unknown ID.
    ToggleFavorite {
        id: ItemId,
        reply: oneshot::Sender<Option<bool>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchKind {
    Restart,
    NextPage,
}

impl FetchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restart => "restart",
            Self::NextPage => "next_page",
        }
    }
}

/// A finished fetch on its way back to the engine loop.
#[derive(Debug)]
pub(crate) struct FetchOutcome {
    pub epoch: u64,
    pub kind: FetchKind,
    pub page: u32,
    pub result: Result<DiscoverPage, FetchError>,
}

// Conversation session
// The single owner of everything the screen knows: messages, trip details,
// the page cursor and the draft. Fetch results are only ever applied here.

use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

use super::accumulator::append_page;
use super::compose::Composer;
use super::loader::ConversationLoader;
use super::ChatError;
use crate::models::{ChatPage, ConversationMetadata, Message};

/// Proof that a load was started, handed back together with its result.
/// A ticket is spent by [`ChatSession::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    page: u32,
    generation: u64,
}

impl LoadTicket {
    pub fn page(&self) -> u32 {
        self.page
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
}

/// What happened to a fetch result handed to [`ChatSession::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// These pages were appended, in this order
    Applied { pages: Vec<u32>, new_messages: usize },
    /// Held back until every lower page has been applied
    Buffered { page: u32 },
    /// Load failed; nothing changed
    Failed(ChatError),
    /// Result belongs to a torn-down session, or its ticket was already
    /// spent, and was dropped
    Stale,
}

#[derive(Debug)]
pub struct ChatSession {
    messages: Vec<Message>,
    metadata: ConversationMetadata,
    metadata_pinned: bool,
    start_page: u32,
    next_to_apply: u32,
    highest_requested: Option<u32>,
    in_flight: BTreeSet<u32>,
    buffered: BTreeMap<u32, ChatPage>,
    failed_pages: BTreeSet<u32>,
    last_error: Option<ChatError>,
    exhausted: bool,
    generation: u64,
    torn_down: bool,
    composer: Composer,
}

impl ChatSession {
    pub fn new(start_page: u32) -> Self {
        ChatSession {
            messages: Vec::new(),
            metadata: ConversationMetadata::default(),
            metadata_pinned: false,
            start_page,
            next_to_apply: start_page,
            highest_requested: None,
            in_flight: BTreeSet::new(),
            buffered: BTreeMap::new(),
            failed_pages: BTreeSet::new(),
            last_error: None,
            exhausted: false,
            generation: 0,
            torn_down: false,
            composer: Composer::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn metadata(&self) -> &ConversationMetadata {
        &self.metadata
    }

    pub fn state(&self) -> LoadState {
        if self.in_flight.is_empty() {
            LoadState::Idle
        } else {
            LoadState::Loading
        }
    }

    pub fn last_error(&self) -> Option<&ChatError> {
        self.last_error.as_ref()
    }

    /// True once a page came back empty
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Highest page index requested so far
    pub fn current_page(&self) -> Option<u32> {
        self.highest_requested
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// Submit the draft. Only clears it; the conversation is not touched.
    pub fn submit_draft(&mut self) -> Option<String> {
        self.composer.submit()
    }

    /// Start loading `page`.
    ///
    /// Returns `None` when the page is already in flight, already applied or
    /// waiting to be applied, or the session has been torn down.
    pub fn begin_load(&mut self, page: u32) -> Option<LoadTicket> {
        if self.torn_down {
            debug!("Ignoring load of page {} on a torn-down session", page);
            return None;
        }
        if page < self.next_to_apply || self.buffered.contains_key(&page) {
            debug!("Page {} already loaded", page);
            return None;
        }
        if !self.in_flight.insert(page) {
            debug!("Page {} already in flight", page);
            return None;
        }
        self.failed_pages.remove(&page);

        self.highest_requested = Some(self.highest_requested.map_or(page, |h| h.max(page)));
        debug!("Loading page {} (generation {})", page, self.generation);
        Some(LoadTicket {
            page,
            generation: self.generation,
        })
    }

    /// Initial load when the screen comes up
    pub fn mount(&mut self) -> Option<LoadTicket> {
        info!("Mounting conversation at page {}", self.start_page);
        self.begin_load(self.start_page)
    }

    /// Request the page after the last one asked for.
    ///
    /// The lowest failed page is asked for again first. Refused while
    /// another request is running or once the history is exhausted.
    pub fn load_next_page(&mut self) -> Option<LoadTicket> {
        if !self.in_flight.is_empty() {
            debug!("Next page refused: request already running");
            return None;
        }
        if let Some(page) = self.failed_pages.first().copied() {
            return self.retry_page(page);
        }
        if self.exhausted {
            debug!("Next page refused: no more history");
            return None;
        }

        let next = self.highest_requested.map_or(self.start_page, |h| h.saturating_add(1));
        self.begin_load(next)
    }

    /// Re-request the lowest page whose last load failed.
    ///
    /// Pages above it stay buffered until it arrives, so it goes first.
    pub fn retry(&mut self) -> Option<LoadTicket> {
        let page = self.failed_pages.first().copied()?;
        self.retry_page(page)
    }

    /// Pages whose last load failed and that have not been asked for again
    pub fn failed_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.failed_pages.iter().copied()
    }

    fn retry_page(&mut self, page: u32) -> Option<LoadTicket> {
        let ticket = self.begin_load(page)?;
        info!("Retrying page {}", page);
        if self.failed_pages.is_empty() {
            self.last_error = None;
        }
        Some(ticket)
    }

    /// Hand a finished load back to the session
    pub fn apply(
        &mut self,
        ticket: LoadTicket,
        result: std::result::Result<ChatPage, ChatError>,
    ) -> ApplyOutcome {
        if self.torn_down || ticket.generation != self.generation {
            debug!("Discarding stale result for page {}", ticket.page);
            return ApplyOutcome::Stale;
        }
        if !self.in_flight.remove(&ticket.page) {
            debug!("Discarding result for page {}: ticket already spent", ticket.page);
            return ApplyOutcome::Stale;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to load page {}: {}", ticket.page, e);
                self.failed_pages.insert(ticket.page);
                self.last_error = Some(e.clone());
                return ApplyOutcome::Failed(e);
            }
        };

        if self.failed_pages.is_empty() {
            self.last_error = None;
        }
        self.buffered.insert(ticket.page, page);

        let before = self.messages.len();
        let mut applied = Vec::new();
        while let Some(page) = self.buffered.remove(&self.next_to_apply) {
            self.apply_page(self.next_to_apply, page);
            applied.push(self.next_to_apply);
            self.next_to_apply += 1;
        }

        if applied.is_empty() {
            debug!("Holding page {} until page {} arrives", ticket.page, self.next_to_apply);
            return ApplyOutcome::Buffered { page: ticket.page };
        }
        ApplyOutcome::Applied {
            pages: applied,
            new_messages: self.messages.len() - before,
        }
    }

    fn apply_page(&mut self, index: u32, page: ChatPage) {
        if !self.metadata_pinned {
            info!(
                "Conversation: {} ({} -> {})",
                page.metadata.display_name, page.metadata.origin, page.metadata.destination
            );
            self.metadata = page.metadata;
            self.metadata_pinned = true;
        }
        if page.messages.is_empty() {
            info!("Page {} is empty; no more history", index);
            self.exhausted = true;
        }
        self.messages = append_page(std::mem::take(&mut self.messages), &page.messages);
    }

    /// Drop the session's claim on every outstanding load
    pub fn teardown(&mut self) {
        info!("Tearing down session with {} request(s) outstanding", self.in_flight.len());
        self.generation += 1;
        self.torn_down = true;
        self.in_flight.clear();
        self.buffered.clear();
    }
}

/// Start, perform and apply one load in sequence.
///
/// Returns `None` when the session refused to start the load.
pub async fn fetch_and_apply<L>(session: &mut ChatSession, loader: &L, page: u32) -> Option<ApplyOutcome>
where
    L: ConversationLoader + ?Sized,
{
    let ticket = session.begin_load(page)?;
    let result = loader.load_page(page).await;
    Some(session.apply(ticket, result))
}

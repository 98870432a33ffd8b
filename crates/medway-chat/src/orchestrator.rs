//! Conversation orchestrator: central coordinator for flows, location,
//! analysis, and the reactive facility search.
//!
//! Every user turn is classified, routed through the pure decision table,
//! and executed against the consolidated conversation state. All state
//! mutations that follow an awaited collaborator call re-check the session
//! guard first; a full reset is the only cancellation primitive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use medway_core::config::MedwayConfig;
use medway_core::events::{DomainEvent, EventBus};
use medway_core::session::{SessionGuard, SessionToken};
use medway_core::types::{Document, DocumentState, Flow, Intent, Stage, Turn, TurnKind, Urgency};
use medway_files::UploadTracker;
use medway_location::{AcquireOutcome, LocationAcquirer, LocationMachine, LocationSnapshot, ManualPick};
use medway_providers::{
    ChatAction, ClassifiedIntent, ContextualChat, FileStore, Geocoder, IntentClassifier,
    MedicationAnalyzer, PlacesSearch, Positioning, TriageAnalyzer, UserInput,
};

use crate::decision::{decide, effective_query, Route, RouteSignals};
use crate::error::ConversationError;
use crate::search::{plan, InFlightLatch};
use crate::state::ConversationState;
use crate::transcript::TranscriptStore;

/// Static capability overview shown for a chat turn before any flow exists.
const CAPABILITY_OVERVIEW: &str = "Puedo ayudarte a evaluar tus s\u{00ed}ntomas, buscar \
    informaci\u{00f3}n sobre medicamentos o encontrar centros de salud y farmacias \
    cercanas. Cu\u{00e9}ntame qu\u{00e9} necesitas.";

/// Alert emitted alongside an emergency triage result.
const EMERGENCY_ALERT: &str = "Tus s\u{00ed}ntomas podr\u{00ed}an indicar una emergencia. \
    Busca atenci\u{00f3}n m\u{00e9}dica inmediata o llama al 106.";

const UNSUPPORTED_POSITIONING: &str = "Tu dispositivo no permite obtener la ubicaci\u{00f3}n \
    autom\u{00e1}ticamente. Puedes elegirla manualmente.";

const UPLOAD_FAILED: &str = "No se pudo subir el archivo. Int\u{00e9}ntalo de nuevo.";

fn location_ack(place_name: &str) -> String {
    format!("Perfecto, buscaremos cerca de {}.", place_name)
}

fn triage_ack(specialty: &str) -> String {
    format!(
        "Seg\u{00fa}n tus s\u{00ed}ntomas, te recomiendo consultar {}.",
        specialty
    )
}

const PHARMACY_ACK: &str = "Encontr\u{00e9} informaci\u{00f3}n sobre los medicamentos que \
    mencionaste.";

/// External collaborators the orchestrator is wired with.
#[derive(Clone)]
pub struct ProviderSet {
    pub classifier: Arc<dyn IntentClassifier>,
    pub triage: Arc<dyn TriageAnalyzer>,
    pub medication: Arc<dyn MedicationAnalyzer>,
    pub chat: Arc<dyn ContextualChat>,
    pub geocoder: Arc<dyn Geocoder>,
    pub positioning: Arc<dyn Positioning>,
    pub places: Arc<dyn PlacesSearch>,
    pub files: Arc<dyn FileStore>,
}

/// Central coordinator for one conversation session.
pub struct ConversationOrchestrator {
    config: MedwayConfig,
    guard: Arc<SessionGuard>,
    state: Mutex<ConversationState>,
    transcript: TranscriptStore,
    location: Arc<LocationMachine>,
    acquirer: LocationAcquirer,
    uploads: UploadTracker,
    classifier: Arc<dyn IntentClassifier>,
    triage_analyzer: Arc<dyn TriageAnalyzer>,
    medication_analyzer: Arc<dyn MedicationAnalyzer>,
    chat: Arc<dyn ContextualChat>,
    places: Arc<dyn PlacesSearch>,
    events: EventBus,
    latch: InFlightLatch,
    typing: AtomicBool,
}

impl ConversationOrchestrator {
    pub fn new(config: MedwayConfig, providers: ProviderSet) -> Self {
        let guard = Arc::new(SessionGuard::new());
        let location = Arc::new(LocationMachine::new());
        let acquirer = LocationAcquirer::new(
            Arc::clone(&location),
            Arc::clone(&providers.positioning),
            Arc::clone(&providers.geocoder),
            Arc::clone(&guard),
            Duration::from_secs(config.location.position_timeout_secs),
        );
        let uploads = UploadTracker::new(Arc::clone(&providers.files));

        Self {
            config,
            guard,
            state: Mutex::new(ConversationState::default()),
            transcript: TranscriptStore::new(),
            location,
            acquirer,
            uploads,
            classifier: providers.classifier,
            triage_analyzer: providers.triage,
            medication_analyzer: providers.medication,
            chat: providers.chat,
            places: providers.places,
            events: EventBus::default(),
            latch: InFlightLatch::new(),
            typing: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // Public API
    // =========================================================================

    /// Handle a typed user message.
    pub async fn handle_text(&self, text: &str) -> Result<(), ConversationError> {
        if text.is_empty() {
            return Err(ConversationError::EmptyMessage);
        }
        let max = self.config.chat.max_message_length;
        if text.len() > max {
            return Err(ConversationError::MessageTooLong(max));
        }
        self.handle_turn(UserInput::Text(text.to_string())).await;
        Ok(())
    }

    /// Handle a voice user message; the classifier transcribes it.
    pub async fn handle_voice(&self, mime: &str, data: Vec<u8>) -> Result<(), ConversationError> {
        self.handle_turn(UserInput::Voice {
            mime: mime.to_string(),
            data,
        })
        .await;
        Ok(())
    }

    /// Run the automatic location acquisition path, emitting outcome turns.
    pub async fn request_device_location(&self) {
        match self.acquirer.acquire().await {
            AcquireOutcome::Unsupported => {
                self.say(UNSUPPORTED_POSITIONING);
            }
            AcquireOutcome::Failed(kind) => {
                self.say(kind.message());
                self.events.publish(DomainEvent::LocationFailed {
                    reason: format!("{:?}", kind),
                });
            }
            AcquireOutcome::Resolved(snapshot) => {
                if let Some(name) = &snapshot.place_name {
                    self.say(location_ack(name));
                    self.events.publish(DomainEvent::LocationResolved {
                        place_name: name.clone(),
                    });
                }
                self.advance_after_location();
                self.maybe_search().await;
            }
            AcquireOutcome::Superseded => {}
        }
    }

    /// Record the region step of the manual cascade and prompt for a province.
    pub fn pick_region(&self, region: &str) {
        self.with_state(|st| {
            st.pending_region = Some(region.to_string());
            st.stage = Stage::ProvinceSelect;
        });
        self.prompt(TurnKind::ProvincePick);
    }

    /// Record the province step of the manual cascade and prompt for a district.
    pub fn pick_province(&self, province: &str) {
        self.with_state(|st| {
            st.pending_province = Some(province.to_string());
            st.stage = Stage::DistrictSelect;
        });
        self.prompt(TurnKind::DistrictPick);
    }

    /// Complete the manual cascade: commits the location and advances to
    /// the results stage.
    pub async fn pick_district(&self, district: &str) {
        let (region, province) = self.with_state(|st| {
            (
                st.pending_region.take().unwrap_or_default(),
                st.pending_province.take().unwrap_or_default(),
            )
        });
        let pick = ManualPick::Cascade {
            region,
            province,
            district: district.to_string(),
        };
        self.commit_manual_pick(&pick).await;
    }

    /// Single flat-list location pick.
    pub async fn select_location(&self, label: &str) {
        let pick = ManualPick::Single(label.to_string());
        self.commit_manual_pick(&pick).await;
    }

    /// Upload a file; failure is surfaced as a turn and swallowed.
    pub async fn attach_file(&self, name: &str, bytes: &[u8]) -> Option<Document> {
        match self.uploads.upload(name, bytes).await {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(error = %e, name, "Upload failed");
                self.say(UPLOAD_FAILED);
                None
            }
        }
    }

    /// Delete an uploaded file; failure is logged and swallowed.
    pub async fn remove_file(&self, id: Uuid) {
        if let Err(e) = self.uploads.delete(id).await {
            tracing::warn!(error = %e, %id, "Delete failed");
        }
    }

    /// Full session reset: bumps the guard generation (invalidating every
    /// in-flight completion) and clears all state synchronously.
    pub fn reset(&self) {
        let token = self.guard.new_session();
        self.with_state(|st| st.clear());
        self.transcript.clear();
        self.location.reset();
        self.uploads.clear();
        self.latch.finish();
        self.typing.store(false, Ordering::SeqCst);
        self.events.publish(DomainEvent::SessionReset {
            generation: token.value(),
        });
        tracing::info!(generation = token.value(), "Session reset");
    }

    /// Mark whether the consumer is looking at the results surface; search
    /// completions that land while it is not raise a notification.
    pub fn set_viewing_results(&self, viewing: bool) {
        self.with_state(|st| st.viewing_results = viewing);
    }

    // ---- Accessors ----

    pub fn state(&self) -> ConversationState {
        self.state.lock().expect("state mutex poisoned").clone()
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.transcript.turns()
    }

    pub fn location_snapshot(&self) -> LocationSnapshot {
        self.location.snapshot()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    pub fn is_typing(&self) -> bool {
        self.typing.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    // =========================================================================
    // Turn handling
    // =========================================================================

    async fn handle_turn(&self, input: UserInput) {
        self.typing.store(true, Ordering::SeqCst);
        let token = self.guard.current();

        if let Some(text) = input.text() {
            self.push_user(text);
        }

        // Always classify, even mid-results, so the user can escape a
        // stuck context.
        let classified = match self.classifier.classify(&input).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "Classification failed; turn abandoned");
                self.typing.store(false, Ordering::SeqCst);
                return;
            }
        };
        if !self.guard.is_current(token) {
            self.typing.store(false, Ordering::SeqCst);
            return;
        }

        // Voice turns become visible as their transcription.
        if input.text().is_none() && !classified.transcription.is_empty() {
            self.push_user(&classified.transcription);
        }

        let signals = self.with_state(|st| RouteSignals {
            intent: classified.intent,
            classifier_emergency: classified.is_emergency,
            active_flow: st.flow,
            stage: st.stage,
            last_urgency: st.last_urgency(),
        });

        match decide(&signals) {
            Route::FlowChange { forced } => {
                if forced {
                    tracing::info!("Pharmacy override broke emergency triage context");
                }
                self.execute_flow_change(token, &classified).await;
            }
            Route::Contextual => {
                self.contextual_turn(token).await;
            }
        }

        self.typing.store(false, Ordering::SeqCst);
        self.maybe_search().await;
    }

    async fn execute_flow_change(&self, token: SessionToken, classified: &ClassifiedIntent) {
        let new_flow = match classified.intent.flow() {
            Some(flow) => flow,
            None => {
                // Chat intent routed here because the flow is mid-stage or
                // the classifier flagged an emergency. At the very start
                // this is the capability overview; later it falls through
                // to the contextual path.
                if self.with_state(|st| st.stage) == Stage::Initial {
                    self.say(CAPABILITY_OVERVIEW);
                } else {
                    self.contextual_turn(token).await;
                }
                return;
            }
        };

        let extracted = if classified.query.is_empty() {
            classified.transcription.clone()
        } else {
            classified.query.clone()
        };

        let old_flow = self.with_state(|st| st.flow);
        let query = self.with_state(|st| {
            effective_query(
                new_flow,
                st.flow,
                classified.is_emergency,
                st.triage.is_some(),
                &st.query,
                &extracted,
            )
        });

        if new_flow != old_flow {
            self.with_state(|st| {
                st.clear_other_flow_results(new_flow);
                st.places.clear();
                // Leaving a flow abandons its results surface. Entering the
                // first flow leaves no surface behind, so the viewing flag
                // set by the consumer stays.
                if old_flow != Flow::None {
                    st.viewing_results = false;
                }
            });
            self.events.publish(DomainEvent::FlowChanged {
                from: old_flow,
                to: new_flow,
            });
        }
        self.with_state(|st| {
            st.flow = new_flow;
            st.query = query.clone();
        });

        if let Some(place) = &classified.detected_location {
            self.location.commit_known(place);
            self.say(location_ack(place));
            self.events.publish(DomainEvent::LocationResolved {
                place_name: place.clone(),
            });
        }

        match new_flow {
            Flow::Triage => self.run_triage(token, &query).await,
            Flow::Pharmacy => self.run_pharmacy(token, &query).await,
            Flow::Directory => {
                // No analysis: the literal query goes straight to results.
                self.with_state(|st| st.stage = Stage::Results);
            }
            Flow::None => unreachable!("intent.flow() never yields Flow::None"),
        }
    }

    async fn run_triage(&self, token: SessionToken, query: &str) {
        let analysis = match self.triage_analyzer.analyze(query).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, "Triage analysis failed; step abandoned");
                return;
            }
        };
        if !self.guard.is_current(token) {
            return;
        }

        let emergency = analysis.urgency == Urgency::Emergency;
        let specialty = analysis.specialty.clone();
        self.with_state(|st| st.triage = Some(analysis));
        self.say(triage_ack(&specialty));

        if emergency {
            self.say(EMERGENCY_ALERT);
            self.events.publish(DomainEvent::EmergencyDetected {
                specialty,
                urgency: Urgency::Emergency,
            });
            self.with_state(|st| st.stage = Stage::Results);
        } else if self.location.snapshot().is_usable() {
            self.with_state(|st| st.stage = Stage::Results);
        } else {
            self.prompt(TurnKind::RegionPick);
            self.with_state(|st| st.stage = Stage::RegionSelect);
        }
    }

    async fn run_pharmacy(&self, token: SessionToken, query: &str) {
        let medications = match self.medication_analyzer.analyze(query).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "Medication analysis failed; step abandoned");
                return;
            }
        };
        if !self.guard.is_current(token) {
            return;
        }

        self.with_state(|st| st.medications = Some(medications));
        self.say(PHARMACY_ACK);

        if self.location.snapshot().is_usable() {
            self.with_state(|st| st.stage = Stage::Results);
        } else {
            self.prompt(TurnKind::RegionPick);
            self.with_state(|st| st.stage = Stage::RegionSelect);
        }
    }

    async fn contextual_turn(&self, token: SessionToken) {
        let history = self
            .transcript
            .context_messages(self.config.chat.context_turns);
        let attached: Vec<Document> = self
            .uploads
            .documents()
            .into_iter()
            .filter(|d| d.state == DocumentState::Active)
            .collect();

        let reply = match self.chat.respond(&history, &attached).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Contextual chat failed; turn abandoned");
                return;
            }
        };
        if !self.guard.is_current(token) {
            return;
        }

        self.say(&reply.text);

        if reply.action == Some(ChatAction::SearchMaps) {
            self.with_state(|st| {
                if let Some(query) = &reply.query {
                    if !query.is_empty() {
                        st.query = query.clone();
                    }
                }
                st.stage = Stage::Results;
            });
            if !self.location.snapshot().is_usable() {
                self.prompt(TurnKind::LocationPrompt);
            }
        }
    }

    // =========================================================================
    // Reactive search
    // =========================================================================

    /// Re-evaluate the search rule against the current state and fire at
    /// most one outstanding request.
    pub async fn maybe_search(&self) {
        let search_plan = {
            let st = self.state.lock().expect("state mutex poisoned");
            plan(
                &st,
                &self.location.snapshot(),
                &self.config.search,
                &self.config.location.default_city,
            )
        };
        let Some(search_plan) = search_plan else {
            return;
        };
        if !self.latch.try_begin() {
            return;
        }

        let token = self.guard.current();
        self.events.publish(DomainEvent::SearchStarted {
            query: search_plan.query.clone(),
        });

        let result = self
            .places
            .search(
                &search_plan.query,
                &search_plan.place_name,
                search_plan.coordinates,
                search_plan.flow,
            )
            .await;
        self.latch.finish();

        if !self.guard.is_current(token) {
            tracing::debug!("Stale search result dropped");
            return;
        }

        match result {
            Ok(mut places) => {
                places.truncate(self.config.search.max_results);
                let (count, background) = self.with_state(|st| {
                    st.places = places;
                    (st.places.len(), !st.viewing_results)
                });
                self.events.publish(DomainEvent::SearchCompleted {
                    result_count: count,
                    background,
                });
            }
            Err(e) => {
                // Stay in the current stage; the user can retry.
                tracing::warn!(error = %e, "Facility search failed");
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn commit_manual_pick(&self, pick: &ManualPick) {
        self.location.select_manual(pick);
        let label = pick.label();
        self.say(location_ack(&label));
        self.events
            .publish(DomainEvent::LocationResolved { place_name: label });
        self.advance_after_location();
        self.maybe_search().await;
    }

    /// A location arriving while a flow waits on one completes the
    /// location-collection stages.
    fn advance_after_location(&self) {
        self.with_state(|st| {
            if st.stage > Stage::Initial && st.stage < Stage::Results {
                st.stage = Stage::Results;
            }
        });
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ConversationState) -> R) -> R {
        let mut st = self.state.lock().expect("state mutex poisoned");
        f(&mut st)
    }

    fn push_user(&self, text: &str) {
        let turn = self.transcript.push_user(text);
        self.events.publish(DomainEvent::TurnAppended {
            turn_id: turn.id,
            author: turn.author,
        });
    }

    fn say(&self, text: impl Into<String>) {
        let turn = self.transcript.push_system(text);
        self.events.publish(DomainEvent::TurnAppended {
            turn_id: turn.id,
            author: turn.author,
        });
    }

    fn prompt(&self, kind: TurnKind) {
        let turn = self.transcript.push_prompt(kind);
        self.events.publish(DomainEvent::TurnAppended {
            turn_id: turn.id,
            author: turn.author,
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Scripted stub collaborators for development and tests.
//!
//! Each stub pops pre-loaded responses from a queue (or returns a fixed
//! value) and can be given an artificial response delay, which tests use
//! to interleave completions with resets and later turns. Stubs record
//! their calls so tests can assert on dispatch behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use medway_core::types::{
    Coordinates, Document, DocumentState, Flow, Intent, MedicationInfo, PlaceRecord,
    TriageAnalysis, Urgency,
};
use medway_core::{MedwayError, Result};

use crate::traits::{
    ContextualChat, FileStore, Geocoder, IntentClassifier, MedicationAnalyzer, PlacesSearch,
    Positioning, TriageAnalyzer,
};
use crate::types::{ChatMessage, ChatReply, ClassifiedIntent, UserInput};

async fn apply_delay(delay: &Mutex<Option<Duration>>) {
    let pause = *delay.lock().expect("delay mutex poisoned");
    if let Some(pause) = pause {
        tokio::time::sleep(pause).await;
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Intent classifier that replays a queue of scripted classifications.
#[derive(Default)]
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Result<ClassifiedIntent>>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful classification.
    pub fn push(&self, classified: ClassifiedIntent) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Ok(classified));
    }

    /// Queue a classifier failure.
    pub fn push_failure(&self, message: &str) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Err(MedwayError::Classifier(message.to_string())));
    }

    /// Delay every subsequent response by `pause`.
    pub fn set_delay(&self, pause: Duration) {
        *self.delay.lock().expect("delay mutex poisoned") = Some(pause);
    }
}

#[async_trait]
impl IntentClassifier for ScriptedClassifier {
    async fn classify(&self, input: &UserInput) -> Result<ClassifiedIntent> {
        apply_delay(&self.delay).await;
        let next = self
            .script
            .lock()
            .expect("script mutex poisoned")
            .pop_front();
        match next {
            Some(result) => result,
            // Unscripted turns fall through as chat so ad-hoc REPL input works.
            None => Ok(ClassifiedIntent {
                intent: Intent::Chat,
                query: input.text().unwrap_or_default().to_string(),
                transcription: input.text().unwrap_or_default().to_string(),
                is_emergency: false,
                detected_location: None,
            }),
        }
    }
}

/// Build a plain text classification with the given intent and query.
pub fn classified(intent: Intent, query: &str) -> ClassifiedIntent {
    ClassifiedIntent {
        intent,
        query: query.to_string(),
        transcription: query.to_string(),
        is_emergency: false,
        detected_location: None,
    }
}

// =============================================================================
// Analyzers
// =============================================================================

/// Triage analyzer replaying scripted analyses.
#[derive(Default)]
pub struct ScriptedTriage {
    script: Mutex<VecDeque<Result<TriageAnalysis>>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTriage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, analysis: TriageAnalysis) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Ok(analysis));
    }

    pub fn push_failure(&self, message: &str) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Err(MedwayError::Analysis(message.to_string())));
    }

    pub fn set_delay(&self, pause: Duration) {
        *self.delay.lock().expect("delay mutex poisoned") = Some(pause);
    }

    /// Queries received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl TriageAnalyzer for ScriptedTriage {
    async fn analyze(&self, query: &str) -> Result<TriageAnalysis> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(query.to_string());
        apply_delay(&self.delay).await;
        self.script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(MedwayError::Analysis("triage script exhausted".to_string())))
    }
}

/// Build a triage analysis with the given specialty and urgency.
pub fn triage_analysis(specialty: &str, urgency: Urgency) -> TriageAnalysis {
    TriageAnalysis {
        specialty: specialty.to_string(),
        urgency,
        urgency_explanation: String::new(),
        detected_symptoms: vec![],
        advice: vec![],
        confidence: 0.9,
    }
}

/// Medication analyzer replaying scripted results.
#[derive(Default)]
pub struct ScriptedMedication {
    script: Mutex<VecDeque<Result<Vec<MedicationInfo>>>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedMedication {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, medications: Vec<MedicationInfo>) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Ok(medications));
    }

    pub fn push_failure(&self, message: &str) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Err(MedwayError::Analysis(message.to_string())));
    }

    pub fn set_delay(&self, pause: Duration) {
        *self.delay.lock().expect("delay mutex poisoned") = Some(pause);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl MedicationAnalyzer for ScriptedMedication {
    async fn analyze(&self, query: &str) -> Result<Vec<MedicationInfo>> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(query.to_string());
        apply_delay(&self.delay).await;
        self.script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(MedwayError::Analysis(
                    "medication script exhausted".to_string(),
                ))
            })
    }
}

/// Build a medication record with the given name.
pub fn medication(name: &str) -> MedicationInfo {
    MedicationInfo {
        name: name.to_string(),
        description: String::new(),
        dosage: String::new(),
        warnings: vec![],
        requires_prescription: false,
    }
}

// =============================================================================
// Contextual chat
// =============================================================================

/// Contextual-chat collaborator replaying scripted replies.
#[derive(Default)]
pub struct ScriptedChat {
    script: Mutex<VecDeque<Result<ChatReply>>>,
    delay: Mutex<Option<Duration>>,
    histories: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: ChatReply) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Ok(reply));
    }

    pub fn push_failure(&self, message: &str) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Err(MedwayError::Chat(message.to_string())));
    }

    pub fn set_delay(&self, pause: Duration) {
        *self.delay.lock().expect("delay mutex poisoned") = Some(pause);
    }

    /// The history passed to each call, in call order.
    pub fn histories(&self) -> Vec<Vec<ChatMessage>> {
        self.histories
            .lock()
            .expect("histories mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl ContextualChat for ScriptedChat {
    async fn respond(&self, history: &[ChatMessage], _attached: &[Document]) -> Result<ChatReply> {
        self.histories
            .lock()
            .expect("histories mutex poisoned")
            .push(history.to_vec());
        apply_delay(&self.delay).await;
        self.script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Ok(ChatReply {
                    text: "Entendido.".to_string(),
                    action: None,
                    query: None,
                })
            })
    }
}

/// Build a plain chat reply with no action.
pub fn chat_reply(text: &str) -> ChatReply {
    ChatReply {
        text: text.to_string(),
        action: None,
        query: None,
    }
}

// =============================================================================
// Geocoder & positioning
// =============================================================================

/// Geocoder that always resolves to a fixed place name, or always fails.
pub struct FixedGeocoder {
    result: std::result::Result<String, String>,
    delay: Mutex<Option<Duration>>,
}

impl FixedGeocoder {
    pub fn new(place_name: &str) -> Self {
        Self {
            result: Ok(place_name.to_string()),
            delay: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            delay: Mutex::new(None),
        }
    }

    pub fn set_delay(&self, pause: Duration) {
        *self.delay.lock().expect("delay mutex poisoned") = Some(pause);
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn reverse_geocode(&self, _coordinates: Coordinates) -> Result<String> {
        apply_delay(&self.delay).await;
        match &self.result {
            Ok(name) => Ok(name.clone()),
            Err(message) => Err(MedwayError::Geocode(message.clone())),
        }
    }
}

/// Positioning stub: unsupported, a fixed position, or a scripted failure.
pub struct StubPositioning {
    supported: bool,
    result: std::result::Result<Coordinates, PositionFailure>,
    delay: Mutex<Option<Duration>>,
}

/// How a stubbed position request fails.
#[derive(Clone, Copy, Debug)]
pub enum PositionFailure {
    PermissionDenied,
    Unavailable,
    Unsupported,
    /// Never completes; callers hit their own timeout.
    Hang,
}

impl StubPositioning {
    /// Platform without positioning capability. `current_position` still
    /// answers, with the unsupported error, in case a caller skips the
    /// capability check.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            result: Err(PositionFailure::Unsupported),
            delay: Mutex::new(None),
        }
    }

    /// Always returns the given coordinates.
    pub fn fixed(coordinates: Coordinates) -> Self {
        Self {
            supported: true,
            result: Ok(coordinates),
            delay: Mutex::new(None),
        }
    }

    /// Always fails with the given failure mode.
    pub fn failing(failure: PositionFailure) -> Self {
        Self {
            supported: true,
            result: Err(failure),
            delay: Mutex::new(None),
        }
    }

    pub fn set_delay(&self, pause: Duration) {
        *self.delay.lock().expect("delay mutex poisoned") = Some(pause);
    }
}

#[async_trait]
impl Positioning for StubPositioning {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn current_position(&self) -> Result<Coordinates> {
        apply_delay(&self.delay).await;
        match self.result {
            Ok(coordinates) => Ok(coordinates),
            Err(PositionFailure::PermissionDenied) => Err(MedwayError::LocationPermissionDenied),
            Err(PositionFailure::Unavailable) => {
                Err(MedwayError::Location("position unavailable".to_string()))
            }
            Err(PositionFailure::Unsupported) => Err(MedwayError::PositioningUnsupported),
            Err(PositionFailure::Hang) => {
                futures_pending().await;
                unreachable!("pending future completed")
            }
        }
    }
}

/// A future that never resolves.
async fn futures_pending() {
    std::future::pending::<()>().await;
}

// =============================================================================
// Places search
// =============================================================================

/// One recorded places-search dispatch.
#[derive(Clone, Debug)]
pub struct RecordedSearch {
    pub query: String,
    pub place_name: String,
    pub coordinates: Option<Coordinates>,
    pub flow: Flow,
}

/// Places search replaying scripted result sets and recording every call.
#[derive(Default)]
pub struct ScriptedPlaces {
    script: Mutex<VecDeque<Result<Vec<PlaceRecord>>>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<RecordedSearch>>,
}

impl ScriptedPlaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, places: Vec<PlaceRecord>) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Ok(places));
    }

    pub fn push_failure(&self, message: &str) {
        self.script
            .lock()
            .expect("script mutex poisoned")
            .push_back(Err(MedwayError::Search(message.to_string())));
    }

    pub fn set_delay(&self, pause: Duration) {
        *self.delay.lock().expect("delay mutex poisoned") = Some(pause);
    }

    pub fn calls(&self) -> Vec<RecordedSearch> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl PlacesSearch for ScriptedPlaces {
    async fn search(
        &self,
        query: &str,
        place_name: &str,
        coordinates: Option<Coordinates>,
        flow: Flow,
    ) -> Result<Vec<PlaceRecord>> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(RecordedSearch {
                query: query.to_string(),
                place_name: place_name.to_string(),
                coordinates,
                flow,
            });
        apply_delay(&self.delay).await;
        self.script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(vec![]))
    }
}

/// Build a place record with the given name.
pub fn place(name: &str) -> PlaceRecord {
    PlaceRecord {
        name: name.to_string(),
        address: String::new(),
        phone: None,
        rating: None,
        open_now: None,
    }
}

// =============================================================================
// File store
// =============================================================================

/// In-memory file store whose documents settle from Processing to Active
/// after a configurable number of `list_active` polls.
pub struct MemoryFileStore {
    docs: Mutex<Vec<Document>>,
    settle_after_polls: AtomicUsize,
    fail_uploads: bool,
}

impl Default for MemoryFileStore {
    fn default() -> Self {
        Self::new(1)
    }
}

impl MemoryFileStore {
    /// Documents become Active after `settle_after_polls` status polls.
    pub fn new(settle_after_polls: usize) -> Self {
        Self {
            docs: Mutex::new(Vec::new()),
            settle_after_polls: AtomicUsize::new(settle_after_polls),
            fail_uploads: false,
        }
    }

    /// A store whose uploads always fail.
    pub fn failing() -> Self {
        Self {
            docs: Mutex::new(Vec::new()),
            settle_after_polls: AtomicUsize::new(0),
            fail_uploads: true,
        }
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn upload(&self, name: &str, _bytes: &[u8]) -> Result<Document> {
        if self.fail_uploads {
            return Err(MedwayError::Files("upload rejected".to_string()));
        }
        let doc = Document {
            id: Uuid::new_v4(),
            name: name.to_string(),
            state: DocumentState::Processing,
        };
        self.docs
            .lock()
            .expect("docs mutex poisoned")
            .push(doc.clone());
        Ok(doc)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut docs = self.docs.lock().expect("docs mutex poisoned");
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Err(MedwayError::Files(format!("document not found: {}", id)));
        }
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Document>> {
        let remaining = self.settle_after_polls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.settle_after_polls.store(remaining - 1, Ordering::SeqCst);
        }
        let mut docs = self.docs.lock().expect("docs mutex poisoned");
        if remaining <= 1 {
            for doc in docs.iter_mut() {
                if doc.state == DocumentState::Processing {
                    doc.state = DocumentState::Active;
                }
            }
        }
        Ok(docs.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Classifier ----

    #[tokio::test]
    async fn test_scripted_classifier_replays_in_order() {
        let classifier = ScriptedClassifier::new();
        classifier.push(classified(Intent::Triage, "fiebre"));
        classifier.push(classified(Intent::Pharmacy, "paracetamol"));

        let input = UserInput::Text("x".to_string());
        let first = classifier.classify(&input).await.unwrap();
        assert_eq!(first.intent, Intent::Triage);
        let second = classifier.classify(&input).await.unwrap();
        assert_eq!(second.intent, Intent::Pharmacy);
    }

    #[tokio::test]
    async fn test_scripted_classifier_failure() {
        let classifier = ScriptedClassifier::new();
        classifier.push_failure("model offline");
        let input = UserInput::Text("x".to_string());
        let result = classifier.classify(&input).await;
        assert!(matches!(result, Err(MedwayError::Classifier(_))));
    }

    #[tokio::test]
    async fn test_scripted_classifier_exhausted_falls_back_to_chat() {
        let classifier = ScriptedClassifier::new();
        let input = UserInput::Text("hola".to_string());
        let result = classifier.classify(&input).await.unwrap();
        assert_eq!(result.intent, Intent::Chat);
        assert_eq!(result.query, "hola");
    }

    // ---- Analyzers record calls ----

    #[tokio::test]
    async fn test_scripted_triage_records_queries() {
        let triage = ScriptedTriage::new();
        triage.push(triage_analysis("Medicina Interna", Urgency::Low));
        triage.analyze("dolor de cabeza").await.unwrap();
        assert_eq!(triage.calls(), vec!["dolor de cabeza".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_medication_exhausted_errors() {
        let meds = ScriptedMedication::new();
        let result = meds.analyze("ibuprofeno").await;
        assert!(matches!(result, Err(MedwayError::Analysis(_))));
    }

    // ---- Positioning ----

    #[tokio::test]
    async fn test_stub_positioning_fixed() {
        let pos = StubPositioning::fixed(Coordinates {
            lat: -12.05,
            lng: -77.04,
        });
        assert!(pos.is_supported());
        let coords = pos.current_position().await.unwrap();
        assert_eq!(coords.lat, -12.05);
    }

    #[tokio::test]
    async fn test_stub_positioning_permission_denied() {
        let pos = StubPositioning::failing(PositionFailure::PermissionDenied);
        let result = pos.current_position().await;
        assert!(matches!(result, Err(MedwayError::LocationPermissionDenied)));
    }

    #[test]
    fn test_stub_positioning_unsupported() {
        let pos = StubPositioning::unsupported();
        assert!(!pos.is_supported());
    }

    // ---- Places ----

    #[tokio::test]
    async fn test_scripted_places_records_calls() {
        let places = ScriptedPlaces::new();
        places.push(vec![place("Clinica Santa Rosa")]);
        let results = places
            .search("cardiologia", "San Isidro", None, Flow::Triage)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        let calls = places.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query, "cardiologia");
        assert_eq!(calls[0].flow, Flow::Triage);
    }

    // ---- File store ----

    #[tokio::test]
    async fn test_memory_file_store_settles() {
        let store = MemoryFileStore::new(2);
        let doc = store.upload("receta.pdf", b"data").await.unwrap();
        assert_eq!(doc.state, DocumentState::Processing);

        // First poll: still processing
        let docs = store.list_active().await.unwrap();
        assert!(docs[0].is_pending());

        // Second poll: settled
        let docs = store.list_active().await.unwrap();
        assert_eq!(docs[0].state, DocumentState::Active);
    }

    #[tokio::test]
    async fn test_memory_file_store_delete() {
        let store = MemoryFileStore::new(0);
        let doc = store.upload("a.pdf", b"x").await.unwrap();
        store.delete(doc.id).await.unwrap();
        assert!(store.list_active().await.unwrap().is_empty());

        let result = store.delete(doc.id).await;
        assert!(matches!(result, Err(MedwayError::Files(_))));
    }

    #[tokio::test]
    async fn test_failing_file_store() {
        let store = MemoryFileStore::failing();
        let result = store.upload("a.pdf", b"x").await;
        assert!(matches!(result, Err(MedwayError::Files(_))));
    }
}

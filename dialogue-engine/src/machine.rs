//! The dialogue state machine.
//!
//! Pure over its inputs apart from the extraction call: the caller owns
//! persistence, re-reads the owner's stored location every turn, and
//! appends the turn transcript from the returned outcome.

use std::sync::Arc;

use tracing::debug;

use crate::extractor::InfoExtractor;
use crate::intent::{Intent, IntentLexicon};
use crate::merge::merge_extracted;
use crate::types::{
    CollectedData, DialogueState, FinalPayload, GeoPoint, Provenance,
};

/// Per-turn input: the user message, an explicit location payload carried
/// by this turn (map pin), and the freshest stored location of the bound
/// user, if any.
#[derive(Debug, Default, Clone)]
pub struct TurnContext {
    pub message: String,
    pub location_override: Option<GeoPoint>,
    pub user_location: Option<GeoPoint>,
}

/// What one turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub next_state: DialogueState,
    pub reply: String,
    pub find_loc: bool,
    pub finished: bool,
    pub provenance: Provenance,
    pub final_payload: Option<FinalPayload>,
}

impl TurnOutcome {
    fn stay(state: DialogueState, reply: String, provenance: Provenance) -> Self {
        Self {
            next_state: state,
            reply,
            find_loc: false,
            finished: false,
            provenance,
            final_payload: None,
        }
    }
}

/// Drives the intake protocol over accumulated session data.
pub struct DialogueStateMachine {
    extractor: Arc<dyn InfoExtractor>,
    lexicon: IntentLexicon,
}

impl DialogueStateMachine {
    pub fn new(extractor: Arc<dyn InfoExtractor>) -> Self {
        Self { extractor, lexicon: IntentLexicon::default() }
    }

    pub fn with_lexicon(mut self, lexicon: IntentLexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    /// Advance one turn. Mutates `collected` in place; the caller persists
    /// it together with the outcome.
    pub async fn advance(
        &self,
        state: DialogueState,
        collected: &mut CollectedData,
        ctx: &TurnContext,
    ) -> TurnOutcome {
        apply_incoming_location(collected, ctx);

        let outcome = match state {
            DialogueState::Init | DialogueState::CollectBasicInfo => {
                self.collect_basic_info(collected, ctx).await
            }
            DialogueState::CheckHistory => self.check_history(collected, ctx).await,
            DialogueState::CheckLocation => self.check_location(collected, ctx),
            DialogueState::Confirm => self.confirm(collected, ctx),
            DialogueState::Done => TurnOutcome {
                next_state: DialogueState::Done,
                reply: messages::SESSION_CLOSED.to_string(),
                find_loc: false,
                finished: true,
                provenance: Provenance::None,
                final_payload: None,
            },
        };

        debug!(
            from = state.as_str(),
            to = outcome.next_state.as_str(),
            find_loc = outcome.find_loc,
            finished = outcome.finished,
            "dialogue turn"
        );
        outcome
    }

    async fn collect_basic_info(
        &self,
        collected: &mut CollectedData,
        ctx: &TurnContext,
    ) -> TurnOutcome {
        let (extracted, provenance) = self.extractor.extract(&ctx.message).await;
        merge_extracted(collected, &extracted);

        let mut missing = missing_fields(collected);

        if missing.is_empty() && collected.has_symptoms() {
            let reply = messages::basic_info_confirmed(collected);
            return TurnOutcome {
                next_state: DialogueState::CheckHistory,
                reply,
                find_loc: false,
                finished: false,
                provenance,
                final_payload: None,
            };
        }

        let has_any_info =
            collected.age.is_some() || collected.gender.is_some() || collected.has_symptoms();
        if has_any_info {
            // Symptoms are mandatory before moving on, even when the
            // extractor did not flag them as missing.
            if !collected.has_symptoms() && !missing.contains(&messages::FIELD_SYMPTOMS) {
                missing.push(messages::FIELD_SYMPTOMS);
            }
            TurnOutcome::stay(
                DialogueState::CollectBasicInfo,
                messages::ask_missing(&missing),
                provenance,
            )
        } else {
            TurnOutcome::stay(
                DialogueState::CollectBasicInfo,
                messages::ONBOARDING.to_string(),
                provenance,
            )
        }
    }

    async fn check_history(&self, collected: &mut CollectedData, ctx: &TurnContext) -> TurnOutcome {
        let mut provenance = Provenance::None;

        if self.lexicon.classify(&ctx.message) == Intent::Deny {
            // "No pre-existing conditions": skip extraction entirely.
        } else {
            let (extracted, used) = self.extractor.extract(&ctx.message).await;
            provenance = used;
            let history_found = extracted.history.is_some();
            merge_extracted(collected, &extracted);

            // The extractor missed it but the user typed something
            // substantial: keep the raw message as history.
            if !history_found
                && ctx.message.trim().chars().count() > 5
                && !self.lexicon.is_acknowledgement(&ctx.message)
            {
                collected.history = Some(ctx.message.trim().to_string());
            }
        }

        if let Some(user_location) = &ctx.user_location {
            set_user_location(collected, user_location);
        }

        let reply = messages::confirm_location(collected.location.as_deref());
        TurnOutcome {
            next_state: DialogueState::CheckLocation,
            reply,
            find_loc: false,
            finished: false,
            provenance,
            final_payload: None,
        }
    }

    fn check_location(&self, collected: &mut CollectedData, ctx: &TurnContext) -> TurnOutcome {
        // Catch a location updated outside the chat since the last turn.
        if let Some(user_location) = &ctx.user_location {
            if user_location.label.is_some() && user_location.label != collected.location {
                set_user_location(collected, user_location);
            }
        }

        let affirmed = self.lexicon.classify(&ctx.message) == Intent::Affirm;
        if affirmed || ctx.location_override.is_some() {
            TurnOutcome {
                next_state: DialogueState::Confirm,
                reply: messages::full_summary(collected),
                find_loc: false,
                finished: false,
                provenance: Provenance::None,
                final_payload: None,
            }
        } else {
            TurnOutcome {
                next_state: DialogueState::CheckLocation,
                reply: messages::PICK_ON_MAP.to_string(),
                find_loc: true,
                finished: false,
                provenance: Provenance::None,
                final_payload: None,
            }
        }
    }

    fn confirm(&self, collected: &mut CollectedData, ctx: &TurnContext) -> TurnOutcome {
        if self.lexicon.wants_search(&ctx.message) {
            TurnOutcome {
                next_state: DialogueState::Done,
                reply: messages::SEARCHING.to_string(),
                find_loc: false,
                finished: true,
                provenance: Provenance::None,
                final_payload: Some(FinalPayload::from_collected(collected)),
            }
        } else {
            TurnOutcome::stay(
                DialogueState::Confirm,
                messages::SAY_YES_TO_SEARCH.to_string(),
                Provenance::None,
            )
        }
    }
}

/// Required-field labels still missing from the collected data.
fn missing_fields(collected: &CollectedData) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if collected.age.is_none() {
        missing.push(messages::FIELD_AGE);
    }
    if collected.gender.is_none() {
        missing.push(messages::FIELD_GENDER);
    }
    if !collected.has_symptoms() {
        missing.push(messages::FIELD_SYMPTOMS);
    }
    missing
}

/// Turn-start location reconciliation: an explicit payload always wins;
/// otherwise an empty collected location is seeded from the user's stored
/// location.
fn apply_incoming_location(collected: &mut CollectedData, ctx: &TurnContext) {
    if let Some(point) = &ctx.location_override {
        collected.set_location(point);
    } else if collected.location.is_none() {
        if let Some(point) = &ctx.user_location {
            set_user_location(collected, point);
        }
    }
}

fn set_user_location(collected: &mut CollectedData, point: &GeoPoint) {
    collected.latitude = Some(point.latitude);
    collected.longitude = Some(point.longitude);
    collected.location =
        Some(point.label.clone().unwrap_or_else(|| "기본 위치".to_string()));
}

/// Korean reply templates, kept together so tone edits stay in one place.
pub mod messages {
    use crate::types::CollectedData;

    pub const FIELD_AGE: &str = "나이";
    pub const FIELD_GENDER: &str = "성별";
    pub const FIELD_SYMPTOMS: &str = "증상";

    pub const ONBOARDING: &str = "안녕하세요! 응급 의료 챗봇입니다.\n\
        빠른 안내를 위해 **환자분의 나이, 성별, 그리고 구체적인 증상**을 자세히 말씀해 주세요.\n\
        (예: 30대 남성이고 배가 쥐어짜듯이 아파요)";

    pub const PICK_ON_MAP: &str = "지도에서 정확한 위치를 선택해 주세요.";

    pub const SEARCHING: &str = "최적의 응급실을 찾는 중입니다. 잠시만 기다려 주세요...";

    pub const SAY_YES_TO_SEARCH: &str = "검색하시려면 '네'라고 말씀해 주세요.";

    pub const SESSION_CLOSED: &str = "이미 종료된 상담입니다. 새로운 상담을 시작해 주세요.";

    const NO_LOCATION: &str = "위치 정보 없음";
    const NONE_MARKER: &str = "없음";

    fn symptoms_line(collected: &CollectedData) -> String {
        collected.symptoms.iter().cloned().collect::<Vec<_>>().join(", ")
    }

    pub fn basic_info_confirmed(collected: &CollectedData) -> String {
        format!(
            "기본 정보가 확인되었습니다.\n\
             - 환자: {} {}\n\
             - 증상: {}\n\n\
             혹시 **기저질환(고혈압, 당뇨 등)**이나 **특이사항(임신, 음주, 수술이력)**이 있으신가요?",
            collected.age.as_deref().unwrap_or(""),
            collected.gender.as_deref().unwrap_or(""),
            symptoms_line(collected),
        )
    }

    pub fn ask_missing(missing: &[&str]) -> String {
        format!(
            "네, 알겠습니다. 정확한 안내를 위해 **{}** 정보를 더 말씀해 주시겠어요?",
            missing.join(", ")
        )
    }

    pub fn confirm_location(location: Option<&str>) -> String {
        format!(
            "정보를 모두 수집했습니다.\n현재 위치가 **'{}'** 맞으신가요?",
            location.unwrap_or(NO_LOCATION)
        )
    }

    pub fn full_summary(collected: &CollectedData) -> String {
        format!(
            "모든 정보를 확인했습니다.\n\n\
             - 환자: {} {}\n\
             - 증상: {}\n\
             - 위치: {}\n\
             - 병력/특이사항: {} / {}\n\n\
             이대로 응급실 검색을 시작할까요?",
            collected.age.as_deref().unwrap_or(""),
            collected.gender.as_deref().unwrap_or(""),
            symptoms_line(collected),
            collected.location.as_deref().unwrap_or(NO_LOCATION),
            collected.history.as_deref().unwrap_or(NONE_MARKER),
            collected.special_note.as_deref().unwrap_or(NONE_MARKER),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::types::ExtractedRecord;

    /// Scripted extractor: pops one canned response per call and counts
    /// how often the backend was reached.
    struct ScriptedExtractor {
        responses: Mutex<VecDeque<(ExtractedRecord, Provenance)>>,
        calls: AtomicUsize,
    }

    impl ScriptedExtractor {
        fn new(responses: Vec<(ExtractedRecord, Provenance)>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn empty() -> Arc<Self> {
            Self::new(Vec::new())
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InfoExtractor for ScriptedExtractor {
        async fn extract(&self, _text: &str) -> (ExtractedRecord, Provenance) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((ExtractedRecord::default(), Provenance::Error))
        }
    }

    fn turn(message: &str) -> TurnContext {
        TurnContext { message: message.to_string(), ..TurnContext::default() }
    }

    fn record(
        age: Option<&str>,
        gender: Option<&str>,
        symptoms: &[&str],
    ) -> ExtractedRecord {
        ExtractedRecord {
            age: age.map(str::to_string),
            gender: gender.map(str::to_string),
            symptoms: symptoms.iter().map(|s| (*s).to_string()).collect(),
            ..ExtractedRecord::default()
        }
    }

    #[tokio::test]
    async fn incremental_fields_reach_check_history_only_when_complete() {
        let extractor = ScriptedExtractor::new(vec![
            (record(Some("30-40"), None, &[]), Provenance::Cpu),
            (record(None, Some("남성"), &[]), Provenance::Cpu),
            (record(None, None, &["두통"]), Provenance::Cpu),
        ]);
        let machine = DialogueStateMachine::new(extractor);
        let mut collected = CollectedData::default();

        let first = machine
            .advance(DialogueState::CollectBasicInfo, &mut collected, &turn("30대요"))
            .await;
        assert_eq!(first.next_state, DialogueState::CollectBasicInfo);
        assert!(first.reply.contains(messages::FIELD_GENDER));
        assert!(first.reply.contains(messages::FIELD_SYMPTOMS));

        let second = machine
            .advance(DialogueState::CollectBasicInfo, &mut collected, &turn("남자입니다"))
            .await;
        assert_eq!(second.next_state, DialogueState::CollectBasicInfo);
        assert!(second.reply.contains(messages::FIELD_SYMPTOMS));

        let third = machine
            .advance(DialogueState::CollectBasicInfo, &mut collected, &turn("머리가 아파요"))
            .await;
        assert_eq!(third.next_state, DialogueState::CheckHistory);
    }

    #[tokio::test]
    async fn first_contact_without_info_gets_onboarding_prompt() {
        let machine = DialogueStateMachine::new(ScriptedExtractor::new(vec![(
            ExtractedRecord::default(),
            Provenance::None,
        )]));
        let mut collected = CollectedData::default();

        let outcome = machine
            .advance(DialogueState::Init, &mut collected, &turn("안녕"))
            .await;
        assert_eq!(outcome.next_state, DialogueState::CollectBasicInfo);
        assert_eq!(outcome.reply, messages::ONBOARDING);
    }

    #[tokio::test]
    async fn complete_utterance_jumps_to_check_history() {
        let machine = DialogueStateMachine::new(ScriptedExtractor::new(vec![(
            record(Some("30-40"), Some("남성"), &["배 극심한통증"]),
            Provenance::Cpu,
        )]));
        let mut collected = CollectedData::default();

        let outcome = machine
            .advance(
                DialogueState::CollectBasicInfo,
                &mut collected,
                &turn("30대 남성이고 배가 쥐어짜듯이 아파요"),
            )
            .await;

        assert_eq!(outcome.next_state, DialogueState::CheckHistory);
        assert!(outcome.reply.contains("30-40"));
        assert!(outcome.reply.contains("남성"));
        assert!(outcome.reply.contains("배 극심한통증"));
        assert_eq!(outcome.provenance, Provenance::Cpu);
    }

    #[tokio::test]
    async fn history_denial_skips_extraction_entirely() {
        let extractor = ScriptedExtractor::empty();
        let machine = DialogueStateMachine::new(extractor.clone());
        let mut collected = CollectedData::default();

        let outcome = machine
            .advance(DialogueState::CheckHistory, &mut collected, &turn("없어"))
            .await;

        assert_eq!(extractor.call_count(), 0);
        assert!(collected.history.is_none());
        assert_eq!(outcome.next_state, DialogueState::CheckLocation);
        assert_eq!(outcome.provenance, Provenance::None);
    }

    #[tokio::test]
    async fn substantial_history_message_is_kept_verbatim_when_extraction_misses() {
        let machine = DialogueStateMachine::new(ScriptedExtractor::new(vec![(
            ExtractedRecord::default(),
            Provenance::Cpu,
        )]));
        let mut collected = CollectedData::default();

        let outcome = machine
            .advance(
                DialogueState::CheckHistory,
                &mut collected,
                &turn("당뇨가 좀 있습니다"),
            )
            .await;

        assert_eq!(collected.history.as_deref(), Some("당뇨가 좀 있습니다"));
        assert_eq!(outcome.next_state, DialogueState::CheckLocation);
    }

    #[tokio::test]
    async fn check_history_reads_back_the_stored_location() {
        let machine = DialogueStateMachine::new(ScriptedExtractor::empty());
        let mut collected = CollectedData::default();
        let ctx = TurnContext {
            message: "없어".to_string(),
            location_override: None,
            user_location: Some(GeoPoint {
                latitude: 37.5,
                longitude: 127.0,
                label: Some("서울역".to_string()),
            }),
        };

        let outcome = machine
            .advance(DialogueState::CheckHistory, &mut collected, &ctx)
            .await;

        assert_eq!(collected.location.as_deref(), Some("서울역"));
        assert!(outcome.reply.contains("서울역"));
    }

    #[tokio::test]
    async fn non_affirmative_location_reply_raises_find_loc() {
        let machine = DialogueStateMachine::new(ScriptedExtractor::empty());
        let mut collected = CollectedData {
            location: Some("서울역".to_string()),
            latitude: Some(37.5),
            longitude: Some(127.0),
            ..CollectedData::default()
        };

        let outcome = machine
            .advance(DialogueState::CheckLocation, &mut collected, &turn("아니 다른 곳인데"))
            .await;

        assert!(outcome.find_loc);
        assert_eq!(outcome.next_state, DialogueState::CheckLocation);
        assert_eq!(outcome.reply, messages::PICK_ON_MAP);
    }

    #[tokio::test]
    async fn location_affirmation_moves_to_confirm_with_summary() {
        let machine = DialogueStateMachine::new(ScriptedExtractor::empty());
        let mut collected = CollectedData {
            age: Some("30-40".to_string()),
            gender: Some("남성".to_string()),
            location: Some("서울역".to_string()),
            latitude: Some(37.5),
            longitude: Some(127.0),
            ..CollectedData::default()
        };
        collected.symptoms.insert("두통".to_string());

        let outcome = machine
            .advance(DialogueState::CheckLocation, &mut collected, &turn("네 맞아요"))
            .await;

        assert_eq!(outcome.next_state, DialogueState::Confirm);
        assert!(outcome.reply.contains("서울역"));
        assert!(outcome.reply.contains("두통"));
    }

    #[tokio::test]
    async fn explicit_location_payload_counts_as_affirmation() {
        let machine = DialogueStateMachine::new(ScriptedExtractor::empty());
        let mut collected = CollectedData::default();
        let ctx = TurnContext {
            message: "여기로 할게".to_string(),
            location_override: Some(GeoPoint {
                latitude: 35.1,
                longitude: 129.0,
                label: Some("부산역".to_string()),
            }),
            user_location: None,
        };

        let outcome = machine
            .advance(DialogueState::CheckLocation, &mut collected, &ctx)
            .await;

        assert_eq!(outcome.next_state, DialogueState::Confirm);
        assert_eq!(collected.location.as_deref(), Some("부산역"));
    }

    #[tokio::test]
    async fn confirm_start_token_finishes_with_payload() {
        let machine = DialogueStateMachine::new(ScriptedExtractor::empty());
        let mut collected = CollectedData {
            age: Some("30-40".to_string()),
            gender: Some("남성".to_string()),
            latitude: Some(37.5),
            longitude: Some(127.0),
            location: Some("서울역".to_string()),
            ..CollectedData::default()
        };
        collected.symptoms.insert("두통".to_string());

        let outcome = machine
            .advance(DialogueState::Confirm, &mut collected, &turn("네 검색해줘"))
            .await;

        assert_eq!(outcome.next_state, DialogueState::Done);
        assert!(outcome.finished);
        let payload = outcome.final_payload.expect("payload on finish");
        assert_eq!(payload.symptom, vec!["두통".to_string()]);
        assert_eq!(payload.gender, "M");
        assert_eq!(payload.latitude, Some(37.5));
        assert_eq!(payload.longitude, Some(127.0));
        assert!(payload.is_self);
    }

    #[tokio::test]
    async fn confirm_without_start_token_reasks() {
        let machine = DialogueStateMachine::new(ScriptedExtractor::empty());
        let mut collected = CollectedData::default();

        let outcome = machine
            .advance(DialogueState::Confirm, &mut collected, &turn("조금만 기다려봐"))
            .await;

        assert_eq!(outcome.next_state, DialogueState::Confirm);
        assert!(!outcome.finished);
        assert_eq!(outcome.reply, messages::SAY_YES_TO_SEARCH);
    }

    #[tokio::test]
    async fn missing_gender_normalizes_to_unknown_in_payload() {
        let machine = DialogueStateMachine::new(ScriptedExtractor::empty());
        let mut collected = CollectedData::default();
        collected.symptoms.insert("두통".to_string());

        let outcome = machine
            .advance(DialogueState::Confirm, &mut collected, &turn("시작"))
            .await;

        let payload = outcome.final_payload.expect("payload on finish");
        assert_eq!(payload.gender, "U");
    }

    #[tokio::test]
    async fn done_state_stays_terminal() {
        let extractor = ScriptedExtractor::empty();
        let machine = DialogueStateMachine::new(extractor.clone());
        let mut collected = CollectedData::default();

        let outcome = machine
            .advance(DialogueState::Done, &mut collected, &turn("다시 시작"))
            .await;

        assert_eq!(outcome.next_state, DialogueState::Done);
        assert!(outcome.finished);
        assert!(outcome.final_payload.is_none());
        assert_eq!(extractor.call_count(), 0);
    }
}

//! Session lifecycle integration tests.
//!
//! Drives the start / send / status / end handlers against a case file on
//! disk, an in-memory session store and mocked providers, and checks that
//! the reaper ends abandoned sessions.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::watch;

use osce_simulator::adapters::ai::MockAIProvider;
use osce_simulator::adapters::case::FileCaseRepository;
use osce_simulator::adapters::session::InMemorySessionStore;
use osce_simulator::application::{
    EndSessionCommand, EndSessionHandler, EngineConfig, EngineProviders, EngineState,
    GetSessionStatusHandler, GetSessionStatusQuery, SendMessageCommand, SendMessageError,
    SendMessageHandler, SessionReaper, SessionReaperConfig, SessionStore, SessionStoreError,
    StartSessionCommand, StartSessionError, StartSessionHandler,
};
use osce_simulator::domain::case::PersonaKind;
use osce_simulator::domain::conversation::TurnRole;
use osce_simulator::domain::foundation::{CaseId, StudentId};
use osce_simulator::ports::{CaseLoadError, CaseRepository, TokenUsage};

// =============================================================================
// Test Infrastructure
// =============================================================================

const FEVER_CASE_YAML: &str = r#"
case_id: peds-fever-01
title: "เด็กมีไข้ 2 วัน"
persona_kind: guardian
simulator:
  name: "คุณมาลี"
  relationship: "มารดา"
  emotional_state: "กังวล"
patient:
  name: "ด.ช. ภูมิ"
  age: "3 ปี"
  sex: "ชาย"
scenario:
  chief_complaint: "ไข้สูง 2 วัน"
  present_illness: "ไข้สูงลอย กินยาลดไข้แล้วไม่ลง"
fallback_questions:
  question_limit_type: single
  questions:
    - text: "ลูกจะเป็นอะไรมากมั๊ยคะ"
    - text: "ต้องนอนโรงพยาบาลไหมคะ"
"#;

const CHEST_PAIN_CASE_JSON: &str = r#"{
    "case_id": "chest-pain-02",
    "title": "Chest pain",
    "persona_kind": "patient",
    "simulator": {"name": "คุณสมชาย", "sex": "ชาย", "age": "58"},
    "fallback_questions": null
}"#;

struct Harness {
    _dir: TempDir,
    cases: Arc<dyn CaseRepository>,
    sessions: Arc<InMemorySessionStore>,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("peds-fever-01.yaml"), FEVER_CASE_YAML).unwrap();
        std::fs::write(dir.path().join("chest-pain-02.json"), CHEST_PAIN_CASE_JSON).unwrap();
        std::fs::write(dir.path().join("README.txt"), "not a case").unwrap();
        Self {
            cases: Arc::new(FileCaseRepository::new(dir.path())),
            sessions: Arc::new(InMemorySessionStore::new()),
            _dir: dir,
        }
    }

    fn start_handler(&self, mock: &MockAIProvider) -> StartSessionHandler {
        StartSessionHandler::new(
            self.cases.clone(),
            self.sessions.clone(),
            EngineProviders::shared(Arc::new(mock.clone())),
            EngineConfig::default(),
        )
    }
}

fn case_id(id: &str) -> CaseId {
    CaseId::new(id).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn lists_cases_from_directory() {
    let harness = Harness::new();

    let ids = harness.cases.list().await.unwrap();

    assert_eq!(ids, vec![case_id("chest-pain-02"), case_id("peds-fever-01")]);
}

#[tokio::test]
async fn full_session_round_trip() {
    let harness = Harness::new();
    let mock = MockAIProvider::new()
        .with_response_usage("[]", TokenUsage::new(50, 2))
        .with_response_usage("เป็นไข้มาสองวันแล้วค่ะ", TokenUsage::new(400, 20))
        .with_response_usage("[1]", TokenUsage::new(50, 2))
        .with_response_usage("หมอคิดว่าเป็นอะไรคะ", TokenUsage::new(420, 25));

    let started = harness
        .start_handler(&mock)
        .handle(StartSessionCommand {
            case_id: case_id("peds-fever-01"),
            student_id: Some(StudentId::new("student-42").unwrap()),
        })
        .await
        .unwrap();
    assert_eq!(started.persona_kind, PersonaKind::Guardian);
    assert_eq!(started.fallback_question_count, 2);
    assert_eq!(harness.sessions.count().await, 1);

    let send = SendMessageHandler::new(harness.sessions.clone());
    let first = send
        .handle(SendMessageCommand {
            session_id: started.session_id,
            utterance: "อาการเป็นมาตั้งแต่เมื่อไหร่ครับ".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(first.reply.text, "เป็นไข้มาสองวันแล้วค่ะ");
    assert_eq!(first.asked_count, 0);
    assert_eq!(first.remaining_count, 2);

    let second = send
        .handle(SendMessageCommand {
            session_id: started.session_id,
            utterance: "ลูกจะเป็นอะไรมากไหม".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(second.asked_count, 1);
    assert_eq!(second.remaining_count, 1);
    assert_eq!(second.usage, TokenUsage::new(820, 45));

    let status = GetSessionStatusHandler::new(harness.sessions.clone())
        .handle(GetSessionStatusQuery {
            session_id: started.session_id,
        })
        .await
        .unwrap();
    assert_eq!(status.state, EngineState::Active);
    assert_eq!(status.turn_count, 2);
    assert_eq!(status.student_id, Some(StudentId::new("student-42").unwrap()));
    assert!(!status.last_activity.is_before(&status.started_at));

    let ended = EndSessionHandler::new(harness.sessions.clone())
        .handle(EndSessionCommand {
            session_id: started.session_id,
        })
        .await
        .unwrap();
    assert_eq!(ended.turn_count, 2);
    assert_eq!(ended.usage, TokenUsage::new(820, 45));
    assert_eq!(ended.auxiliary_usage, TokenUsage::new(100, 4));
    assert_eq!(ended.asked_questions, vec!["ลูกจะเป็นอะไรมากมั๊ยคะ".to_string()]);
    assert_eq!(ended.transcript.len(), 4);
    assert_eq!(ended.transcript[0].role, TurnRole::User);
    assert_eq!(harness.sessions.count().await, 0);
}

#[tokio::test]
async fn ended_session_rejects_further_messages() {
    let harness = Harness::new();
    let mock = MockAIProvider::new();
    let started = harness
        .start_handler(&mock)
        .handle(StartSessionCommand {
            case_id: case_id("chest-pain-02"),
            student_id: None,
        })
        .await
        .unwrap();
    let end = EndSessionHandler::new(harness.sessions.clone());

    end.handle(EndSessionCommand {
        session_id: started.session_id,
    })
    .await
    .unwrap();

    let result = SendMessageHandler::new(harness.sessions.clone())
        .handle(SendMessageCommand {
            session_id: started.session_id,
            utterance: "เจ็บหน้าอกตรงไหนครับ".to_string(),
        })
        .await;
    assert!(matches!(
        result,
        Err(SendMessageError::Store(SessionStoreError::NotFound(_)))
    ));

    let again = end
        .handle(EndSessionCommand {
            session_id: started.session_id,
        })
        .await;
    assert!(matches!(again, Err(SessionStoreError::NotFound(_))));
}

#[tokio::test]
async fn blank_utterance_is_rejected_without_provider_calls() {
    let harness = Harness::new();
    let mock = MockAIProvider::new();
    let started = harness
        .start_handler(&mock)
        .handle(StartSessionCommand {
            case_id: case_id("chest-pain-02"),
            student_id: None,
        })
        .await
        .unwrap();

    let result = SendMessageHandler::new(harness.sessions.clone())
        .handle(SendMessageCommand {
            session_id: started.session_id,
            utterance: "   ".to_string(),
        })
        .await;

    assert!(matches!(result, Err(SendMessageError::EmptyMessage)));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn unknown_case_fails_to_start() {
    let harness = Harness::new();
    let mock = MockAIProvider::new();

    let result = harness
        .start_handler(&mock)
        .handle(StartSessionCommand {
            case_id: case_id("missing-case"),
            student_id: None,
        })
        .await;

    assert!(matches!(
        result,
        Err(StartSessionError::CaseLoad(CaseLoadError::NotFound(_)))
    ));
    assert_eq!(harness.sessions.count().await, 0);
}

#[tokio::test]
async fn reaper_ends_abandoned_session() {
    let harness = Harness::new();
    let mock = MockAIProvider::new().with_response("สวัสดีครับ");
    let started = harness
        .start_handler(&mock)
        .handle(StartSessionCommand {
            case_id: case_id("chest-pain-02"),
            student_id: None,
        })
        .await
        .unwrap();
    let entry = harness.sessions.get(started.session_id).await.unwrap();

    let reaper = SessionReaper::with_config(
        harness.sessions.clone(),
        SessionReaperConfig::default()
            .with_inactivity_timeout(Duration::from_millis(1))
            .with_sweep_interval(Duration::from_millis(5)),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move { reaper.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();
    task.await.unwrap();

    assert_eq!(harness.sessions.count().await, 0);
    assert_eq!(entry.engine.lock().await.state(), EngineState::Ended);

    let result = SendMessageHandler::new(harness.sessions.clone())
        .handle(SendMessageCommand {
            session_id: started.session_id,
            utterance: "ยังอยู่ไหมครับ".to_string(),
        })
        .await;
    assert!(matches!(
        result,
        Err(SendMessageError::Store(SessionStoreError::NotFound(_)))
    ));
}

#[tokio::test]
async fn concurrent_messages_to_one_session_are_serialized() {
    let harness = Harness::new();
    let mock = MockAIProvider::new()
        .with_response("เจ็บตรงกลางอกครับ")
        .with_response("เป็นมาประมาณชั่วโมงหนึ่งครับ")
        .with_delay(Duration::from_millis(30));
    let started = harness
        .start_handler(&mock)
        .handle(StartSessionCommand {
            case_id: case_id("chest-pain-02"),
            student_id: None,
        })
        .await
        .unwrap();
    let send = SendMessageHandler::new(harness.sessions.clone());

    let (first, second) = tokio::join!(
        send.handle(SendMessageCommand {
            session_id: started.session_id,
            utterance: "เจ็บตรงไหนครับ".to_string(),
        }),
        send.handle(SendMessageCommand {
            session_id: started.session_id,
            utterance: "เป็นมานานแค่ไหนครับ".to_string(),
        }),
    );
    first.unwrap();
    second.unwrap();

    let ended = EndSessionHandler::new(harness.sessions.clone())
        .handle(EndSessionCommand {
            session_id: started.session_id,
        })
        .await
        .unwrap();
    let roles: Vec<TurnRole> = ended.transcript.iter().map(|turn| turn.role).collect();
    assert_eq!(
        roles,
        vec![TurnRole::User, TurnRole::Assistant, TurnRole::User, TurnRole::Assistant]
    );
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn reply_survives_session_ended_mid_turn() {
    let harness = Harness::new();
    let mock = MockAIProvider::new()
        .with_response("เจ็บแน่น ๆ ตรงกลางอกครับ")
        .with_delay(Duration::from_millis(100));
    let started = harness
        .start_handler(&mock)
        .handle(StartSessionCommand {
            case_id: case_id("chest-pain-02"),
            student_id: None,
        })
        .await
        .unwrap();
    let send = SendMessageHandler::new(harness.sessions.clone());
    let end = EndSessionHandler::new(harness.sessions.clone());

    let (sent, ended) = tokio::join!(
        send.handle(SendMessageCommand {
            session_id: started.session_id,
            utterance: "เจ็บหน้าอกแบบไหนครับ".to_string(),
        }),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            end.handle(EndSessionCommand {
                session_id: started.session_id,
            })
            .await
        },
    );

    let sent = sent.unwrap();
    assert_eq!(sent.reply.text, "เจ็บแน่น ๆ ตรงกลางอกครับ");
    assert!(!sent.reply.degraded);

    let ended = ended.unwrap();
    assert_eq!(ended.turn_count, 1);
    assert_eq!(ended.transcript.len(), 2);
    assert_eq!(ended.transcript[1].role, TurnRole::Assistant);
    assert_eq!(harness.sessions.count().await, 0);
}

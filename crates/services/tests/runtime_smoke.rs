use std::sync::Arc;
use std::time::Duration;

use exam_core::model::{ExamId, OptionId, QuestionId};
use exam_core::time::fixed_clock;
use services::sessions::{Key, KeyPress};
use services::{
    AppServices, HostCommand, MockQuestionSource, OpenOutcome, SessionConfig, SessionIntent,
    spawn_session,
};

#[tokio::test(start_paused = true)]
async fn draft_mirrors_answers_after_autosave_interval() {
    let services = AppServices::in_memory(fixed_clock(), SessionConfig::default())
        .with_question_source(Arc::new(MockQuestionSource::new().with_seed(5)));
    let exam = ExamId::new("informatika-2024").unwrap();
    let (host, outcome) = services.open_exam(&exam).await.unwrap();
    assert_eq!(outcome, OpenOutcome::Fresh);

    let handle = spawn_session(host);
    handle
        .send(HostCommand::Key(KeyPress::new(Key::Character('a'))))
        .await
        .unwrap();
    handle
        .send(HostCommand::Intent(SessionIntent::GoTo(4)))
        .await
        .unwrap();
    handle
        .send(HostCommand::Key(KeyPress::new(Key::Character('D'))))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;

    let draft = services.drafts().load(&exam).await.unwrap();
    assert_eq!(draft.answers.len(), 2);
    assert_eq!(draft.answers.get(&QuestionId::new(1)), Some(&OptionId::new("a")));
    assert_eq!(draft.answers.get(&QuestionId::new(5)), Some(&OptionId::new("d")));

    let host = handle.shutdown().await.unwrap();
    assert_eq!(
        &draft.answers,
        host.controller().session().unwrap().answers()
    );
}

#[tokio::test(start_paused = true)]
async fn submit_command_publishes_result_and_clears_draft() {
    let services = AppServices::in_memory(fixed_clock(), SessionConfig::default());
    let exam = ExamId::new("kemija-2024").unwrap();
    let (host, _) = services.open_exam(&exam).await.unwrap();
    let handle = spawn_session(host);
    let mut view = handle.view();

    handle
        .send(HostCommand::Intent(SessionIntent::Answer(OptionId::new("b"))))
        .await
        .unwrap();
    handle.send(HostCommand::Autosave).await.unwrap();
    handle
        .send(HostCommand::Intent(SessionIntent::Submit))
        .await
        .unwrap();

    let submitted = view
        .wait_for(|v| v.result.is_some())
        .await
        .unwrap()
        .clone();
    assert_eq!(submitted.result.unwrap().answers().len(), 1);
    assert!(!submitted.warn_on_unload);
    assert!(services.drafts().load(&exam).await.is_none());
}

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use podium::analysis::{BodyLanguageAnalysis, DeliveryAnalysis, Observation};
use podium::feedback::FeedbackTree;
use podium::player::{PlaybackController, Player, PlayerError};
use podium::runtime::{FixedTicker, Runner, TestEventSource, UiEvent};
use podium::selection::{AnalysisKind, Route, Selection};
use podium::session::{MemoryKvStore, SessionStore};

#[derive(Clone, Default)]
struct CountingPlayer {
    seeks: Arc<Mutex<Vec<u32>>>,
    plays: Arc<Mutex<u32>>,
}

impl Player for CountingPlayer {
    fn seek(&mut self, seconds: u32) -> Result<(), PlayerError> {
        self.seeks.lock().unwrap().push(seconds);
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        *self.plays.lock().unwrap() += 1;
        Ok(())
    }
}

fn delivery_doc() -> DeliveryAnalysis {
    DeliveryAnalysis {
        filler_words: None,
        speech_rate_wpm: None,
        body_language_analysis: BodyLanguageAnalysis {
            pros: vec![Observation {
                timestamp: "1:02, 1:15".into(),
                description: "open stance".into(),
            }],
            cons: vec![],
        },
    }
}

// Headless review flow using the internal runtime, the projected tree and
// a fake player, without a TTY: move focus once, activate, and verify the
// player got exactly one seek+play with the normalized seconds.
#[test]
fn headless_review_flow_seeks_the_player() {
    let delivery = delivery_doc();
    let tree = FeedbackTree::project(Some(&delivery), None);
    let controls = tree.controls();
    assert_eq!(controls.len(), 2);

    let player = CountingPlayer::default();
    let seeks = player.seeks.clone();
    let plays = player.plays.clone();
    let mut controller = PlaybackController::new();
    controller.attach(Box::new(player));

    let (tx, rx) = mpsc::channel();
    let es = TestEventSource::new(rx);
    let ticker = FixedTicker::new(Duration::from_millis(5));
    let runner = Runner::new(es, ticker);

    tx.send(UiEvent::Key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE)))
        .unwrap();
    tx.send(UiEvent::Key(KeyEvent::new(
        KeyCode::Enter,
        KeyModifiers::NONE,
    )))
    .unwrap();

    let mut focused = 0usize;
    let mut activated = false;
    for _ in 0..100u32 {
        match runner.step() {
            UiEvent::Key(key) => match key.code {
                KeyCode::Down => focused = (focused + 1).min(controls.len() - 1),
                KeyCode::Enter => {
                    if let Some(seconds) = controls[focused].seconds {
                        controller.seek_and_play(seconds);
                    }
                    activated = true;
                }
                _ => {}
            },
            UiEvent::Tick => {
                if activated {
                    break;
                }
            }
            _ => {}
        }
    }

    assert!(activated, "activation event should have been processed");
    assert_eq!(*seeks.lock().unwrap(), vec![75]);
    assert_eq!(*plays.lock().unwrap(), 1);
}

// Same flow with no player attached: activation must be a silent no-op.
#[test]
fn headless_activation_without_player_is_inert() {
    let delivery = delivery_doc();
    let tree = FeedbackTree::project(Some(&delivery), None);
    let mut controller = PlaybackController::new();

    for control in tree.controls() {
        if let Some(seconds) = control.seconds {
            controller.seek_and_play(seconds);
        }
    }
    assert!(!controller.is_attached());
}

// Selection + session + workflow wired together with an in-memory store
// and a fake workflow endpoint.
#[test]
fn headless_selection_confirm_routes_to_content_step() {
    use podium::remote::{RemoteResult, WorkflowService};
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeWorkflow {
        calls: RefCell<Vec<(String, Vec<AnalysisKind>)>>,
    }

    impl WorkflowService for FakeWorkflow {
        fn set_analysis(&self, rehearsal_id: &str, kinds: &[AnalysisKind]) -> RemoteResult<()> {
            self.calls
                .borrow_mut()
                .push((rehearsal_id.to_string(), kinds.to_vec()));
            Ok(())
        }
    }

    let mut session = SessionStore::new(MemoryKvStore::default());
    session.add_speech("sp-1");
    session.add_rehearsal("rh-1");

    let mut selection = Selection::new();
    selection.toggle(AnalysisKind::Delivery);
    selection.toggle(AnalysisKind::Content);

    let workflow = FakeWorkflow::default();
    let route = selection.confirm(&session, &workflow).unwrap();

    assert_eq!(route, Route::ContentInput);
    assert_eq!(
        *workflow.calls.borrow(),
        vec![(
            "rh-1".to_string(),
            vec![AnalysisKind::Delivery, AnalysisKind::Content]
        )]
    );
}

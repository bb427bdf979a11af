use std::{
    path::PathBuf,
    sync::{
        mpsc,
        Arc,
    },
    thread,
};

use tokio::runtime::Runtime;
use tracing::debug;

use super::TaskResult;
use crate::{
    anki::{
        browse_query,
        last_added_note,
    },
    core::{
        AnkimorphError,
        AppContext,
    },
    mining,
    notes::{
        FetchRequest,
        FieldNameConfig,
        Note,
    },
    pitch::ReadingTokenizer,
    playback::PlaybackArbiter,
    sources::SourceSet,
};

/// Runs slow work off the UI thread and hands results back through a channel
/// drained once per tick.
pub struct TaskManager {
    runtime: Arc<Runtime>,
    receiver: mpsc::Receiver<TaskResult>,
    sender: mpsc::Sender<TaskResult>,
}

impl TaskManager {
    pub fn new() -> Result<Self, AnkimorphError> {
        let runtime = Arc::new(Runtime::new()?);

        let (sender, receiver) = mpsc::channel();

        Ok(Self { runtime, receiver, sender })
    }

    pub fn poll_results(&mut self) -> Vec<TaskResult> {
        let mut results = Vec::new();

        while let Ok(result) = self.receiver.try_recv() {
            results.push(result);
        }

        results
    }

    fn task_context(&self) -> (mpsc::Sender<TaskResult>, Arc<Runtime>) {
        (self.sender.clone(), self.runtime.clone())
    }

    /// Runs a request issued by the note collection. The ticket travels back
    /// with the result.
    pub fn fetch(&self, sources: SourceSet, request: FetchRequest) {
        let (sender, runtime) = self.task_context();

        debug!("Fetching {:?} [{}, {}] for {:?}", request.ticket.kind, request.start, request.end, request.query);
        runtime.spawn(async move {
            let result = sources.fetch(request.target, &request.query, request.start, request.end).await;
            let _ = sender.send(TaskResult::Fetch { ticket: request.ticket, result });
        });
    }

    pub fn mine(&self, context: AppContext, note: Note) {
        let (sender, runtime) = self.task_context();

        runtime.spawn(async move {
            let result = mining::mine_to_last_card(
                context.anki.as_ref(),
                &context.client,
                &note,
                &context.names,
                &context.media_dir,
            )
            .await;
            let _ = sender.send(TaskResult::Mined(result));
        });
    }

    pub fn mark_known(&self, context: AppContext, note: Note) {
        let (sender, runtime) = self.task_context();

        runtime.spawn(async move {
            let result = mining::mark_known(context.anki.as_ref(), &note, &context.names).await;
            let _ = sender.send(TaskResult::MarkedKnown { note_id: note.id, result });
        });
    }

    pub fn delete(&self, context: AppContext, note: Note) {
        let (sender, runtime) = self.task_context();

        runtime.spawn(async move {
            let result = mining::delete_note(context.anki.as_ref(), &note).await;
            let _ = sender.send(TaskResult::Deleted { key: note.key().clone(), result });
        });
    }

    /// Opens the Anki browser on one note.
    pub fn browse(&self, context: AppContext, note_id: i64) {
        let (sender, runtime) = self.task_context();

        runtime.spawn(async move {
            let result = context.anki.gui_browse(&browse_query(note_id)).await;
            let _ = sender.send(TaskResult::Browsed(result));
        });
    }

    pub fn browse_last_added(&self, context: AppContext) {
        let (sender, runtime) = self.task_context();

        runtime.spawn(async move {
            let result = async {
                let newest = last_added_note(context.anki.as_ref()).await?;
                context.anki.gui_browse(&browse_query(newest.note_id)).await
            }
            .await;
            let _ = sender.send(TaskResult::Browsed(result));
        });
    }

    /// Opening a clip may download and probe it, so it runs on its own thread.
    pub fn play(&self, arbiter: Arc<PlaybackArbiter>, note: Note, names: Arc<FieldNameConfig>) {
        let (sender, _) = self.task_context();

        thread::spawn(move || {
            let result = arbiter.play(&note, &names);
            let _ = sender.send(TaskResult::Played(result));
        });
    }

    pub fn load_image(&self, note: Note, names: Arc<FieldNameConfig>, media_dir: PathBuf) {
        let (sender, runtime) = self.task_context();

        runtime.spawn_blocking(move || {
            let result = note.load_image(&names, &media_dir);
            let _ = sender.send(TaskResult::ImageLoaded { key: note.key().clone(), result });
        });
    }

    pub fn load_tokenizer(&self, dict_dir: PathBuf) {
        let (sender, _) = self.task_context();

        thread::spawn(move || {
            let _ = sender.send(TaskResult::LoadingMessage("Loading tokenizer...".to_string()));

            let sender_clone = sender.clone();
            let progress_callback = Box::new(move |message: String| {
                let _ = sender_clone.send(TaskResult::LoadingMessage(message));
            });

            let result = ReadingTokenizer::load(&dict_dir, Some(progress_callback)).map(Arc::new);
            let _ = sender.send(TaskResult::TokenizerLoaded(result));
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::{
        Duration,
        Instant,
    };

    use super::*;
    use crate::{
        anki::{
            testing::{
                Call,
                MemoryAnki,
            },
            AnkiApi,
        },
        config::Settings,
        notes::PagedNoteCollection,
    };

    fn wait_for(manager: &mut TaskManager, count: usize) -> Vec<TaskResult> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut results = Vec::new();
        while results.len() < count && Instant::now() < deadline {
            results.extend(manager.poll_results());
            thread::sleep(Duration::from_millis(10));
        }
        results
    }

    fn context(anki: Arc<MemoryAnki>) -> AppContext {
        let api: Arc<dyn AnkiApi> = anki;
        AppContext::new(Settings::default(), api, PathBuf::from("/media")).unwrap()
    }

    #[test]
    fn test_fetch_result_carries_ticket() {
        let anki = Arc::new(MemoryAnki::with_notes(vec![
            MemoryAnki::note(1, &[("Expression", "一")], &[]),
            MemoryAnki::note(2, &[("Expression", "二")], &[]),
        ]));
        let context = context(anki);
        let mut manager = TaskManager::new().unwrap();
        let mut collection = PagedNoteCollection::new(10);

        let request = collection.reload("deck:x");
        manager.fetch(context.sources.clone(), request);

        let results = wait_for(&mut manager, 1);
        match results.into_iter().next() {
            Some(TaskResult::Fetch { ticket, result }) => {
                collection.apply(ticket, result);
                assert_eq!(collection.len(), 2);
            }
            other => panic!("Expected a fetch result, got {:?}", other),
        }
    }

    #[test]
    fn test_write_tasks_report_back() {
        let anki = Arc::new(MemoryAnki::with_notes(vec![MemoryAnki::note(7, &[("Expression", "猫")], &[])]));
        let context = context(anki.clone());
        let note = Note::from_anki(MemoryAnki::note(7, &[("Expression", "猫")], &[]));
        let mut manager = TaskManager::new().unwrap();

        manager.mark_known(context.clone(), note.clone());
        let results = wait_for(&mut manager, 1);
        assert!(matches!(results[0], TaskResult::MarkedKnown { note_id: 7, result: Ok(true) }));

        manager.browse(context.clone(), 7);
        let results = wait_for(&mut manager, 1);
        assert!(matches!(results[0], TaskResult::Browsed(Ok(()))));

        manager.delete(context, note);
        let results = wait_for(&mut manager, 1);
        assert!(matches!(&results[0], TaskResult::Deleted { result: Ok(true), .. }));

        assert_eq!(
            anki.writes(),
            vec![Call::AddTags(7, "am-known-manually".to_string()), Call::DeleteNotes(vec![7])]
        );
    }

    #[test]
    fn test_mining_without_media_reports_error() {
        let anki = Arc::new(MemoryAnki::with_notes(Vec::new()));
        let context = context(anki);
        let note = Note::from_anki(MemoryAnki::note(7, &[("Expression", "猫")], &[]));
        let mut manager = TaskManager::new().unwrap();

        manager.mine(context, note);
        let results = wait_for(&mut manager, 1);
        assert!(matches!(results[0], TaskResult::Mined(Err(AnkimorphError::MissingMedia(_)))));
    }
}

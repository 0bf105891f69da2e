//! Undo/redo engine for a single frame's annotations.
//!
//! [`CommandEngine`] owns the [`AnnotationStore`] of the displayed frame and is
//! the only path through which it changes. Executed commands go on the `done`
//! stack; undo moves them to `undone`, redo moves them back. Issuing a new
//! command discards `undone`.
//!
//! Observers are told about every successful transition. The engine itself
//! knows nothing about files; the host persists from an observer or after
//! each call.

use crate::annotation::Annotation;
use crate::command::Command;
use crate::error::Result;
use crate::store::AnnotationStore;

// ============================================================================
// History
// ============================================================================

/// Configuration for the undo history.
#[derive(Debug, Clone, Default)]
pub struct UndoConfig {
    /// Maximum number of commands kept on the `done` stack. `None` keeps
    /// everything, which preserves the full undo/redo round trip.
    pub max_history: Option<usize>,
}

/// The undo/redo history.
///
/// Maintains two stacks:
/// - `done`: commands that can be undone (most recent at the end)
/// - `undone`: commands that can be redone (most recent at the end)
#[derive(Debug, Clone, Default)]
pub struct History {
    done: Vec<Command>,
    undone: Vec<Command>,
    config: UndoConfig,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Record an executed command. Clears the redo stack.
    pub fn push(&mut self, command: Command) {
        log::debug!("📝 Undo: pushed '{}'", command.description());
        self.done.push(command);
        self.undone.clear();
        self.trim();
    }

    /// The command `undo` would reverse.
    fn next_undo(&mut self) -> Option<&mut Command> {
        self.done.last_mut()
    }

    /// The command `redo` would re-execute.
    fn next_redo(&mut self) -> Option<&mut Command> {
        self.undone.last_mut()
    }

    /// Move the top of `done` to `undone`.
    fn commit_undo(&mut self) {
        if let Some(cmd) = self.done.pop() {
            log::debug!("⏪ Undo: '{}'", cmd.description());
            self.undone.push(cmd);
        }
    }

    /// Move the top of `undone` back to `done`.
    fn commit_redo(&mut self) {
        if let Some(cmd) = self.undone.pop() {
            log::debug!("⏩ Redo: '{}'", cmd.description());
            self.done.push(cmd);
            self.trim();
        }
    }

    fn trim(&mut self) {
        if let Some(max) = self.config.max_history {
            if self.done.len() > max {
                let excess = self.done.len() - max;
                self.done.drain(..excess);
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Get the description of the command that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.done.last().map(|c| c.description())
    }

    /// Get the description of the command that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.undone.last().map(|c| c.description())
    }

    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
        log::debug!("🗑️ Undo history cleared");
    }

    pub fn undo_count(&self) -> usize {
        self.done.len()
    }

    pub fn redo_count(&self) -> usize {
        self.undone.len()
    }
}

// ============================================================================
// Observers
// ============================================================================

/// Which transition produced a [`StoreEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Executed,
    Undone,
    Redone,
    /// The store was replaced wholesale (frame load).
    Reset,
}

/// Notification sent after every successful engine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub kind: ChangeKind,
    /// Description of the command involved (empty for resets).
    pub description: String,
    /// Number of annotations after the change.
    pub len: usize,
}

/// Receives store change notifications.
pub trait StoreObserver {
    fn on_change(&mut self, event: &StoreEvent, store: &AnnotationStore);
}

impl<F> StoreObserver for F
where
    F: FnMut(&StoreEvent, &AnnotationStore),
{
    fn on_change(&mut self, event: &StoreEvent, store: &AnnotationStore) {
        self(event, store)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Applies commands to the current frame's store and tracks their history.
#[derive(Default)]
pub struct CommandEngine {
    store: AnnotationStore,
    history: History,
    observers: Vec<Box<dyn StoreObserver>>,
}

impl std::fmt::Debug for CommandEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEngine")
            .field("store", &self.store)
            .field("history", &self.history)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CommandEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            history: History::with_config(config),
            ..Default::default()
        }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.store.as_slice()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Register an observer. Observers are called in registration order.
    pub fn subscribe(&mut self, observer: impl StoreObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Execute a command and record it.
    ///
    /// On failure the store is unchanged, nothing is recorded and the redo
    /// stack survives.
    pub fn execute(&mut self, mut command: Command) -> Result<StoreEvent> {
        command.execute(&mut self.store)?;
        let event = self.event(ChangeKind::Executed, command.description());
        self.history.push(command);
        self.notify(&event);
        Ok(event)
    }

    /// Undo the most recent command. `Ok(None)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<StoreEvent>> {
        let Some(command) = self.history.next_undo() else {
            return Ok(None);
        };
        command.undo(&mut self.store)?;
        let description = command.description();
        self.history.commit_undo();

        let event = self.event(ChangeKind::Undone, description);
        self.notify(&event);
        Ok(Some(event))
    }

    /// Re-execute the most recently undone command. `Ok(None)` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Result<Option<StoreEvent>> {
        let Some(command) = self.history.next_redo() else {
            return Ok(None);
        };
        command.execute(&mut self.store)?;
        let description = command.description();
        self.history.commit_redo();

        let event = self.event(ChangeKind::Redone, description);
        self.notify(&event);
        Ok(Some(event))
    }

    /// Replace the store contents (a new frame was loaded) and clear history.
    pub fn reset(&mut self, annotations: Vec<Annotation>) -> StoreEvent {
        self.store = AnnotationStore::from_vec(annotations);
        self.history.clear();
        let event = self.event(ChangeKind::Reset, String::new());
        self.notify(&event);
        event
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.history.redo_description()
    }

    fn event(&self, kind: ChangeKind, description: String) -> StoreEvent {
        StoreEvent {
            kind,
            description,
            len: self.store.len(),
        }
    }

    fn notify(&mut self, event: &StoreEvent) {
        for observer in &mut self.observers {
            observer.on_change(event, &self.store);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::AnnotationError;

    fn a() -> Annotation {
        Annotation::rectangle(0.1, 0.1, 0.3, 0.3).with_text("A")
    }

    fn b() -> Annotation {
        Annotation::circle(0.5, 0.5, 0.6, 0.5)
    }

    #[test]
    fn test_round_trip_law() {
        let mut engine = CommandEngine::new();
        engine.reset(vec![a()]);
        let initial = engine.store().clone();

        let commands = vec![
            Command::add(b(), None),
            Command::add(Annotation::point(0.2, 0.8), Some(0)),
            Command::modify(1, a().with_text("A'")),
            Command::batch_add(vec![b(), a(), b()], Some(1)),
            Command::delete(Some(2)),
            Command::batch_delete(2, None),
            Command::delete_all(),
            Command::batch_add(vec![a(), b()], None),
        ];

        let mut snapshots = vec![initial.clone()];
        for cmd in commands.iter().cloned() {
            engine.execute(cmd).unwrap();
            snapshots.push(engine.store().clone());
        }
        let n = commands.len();

        for i in (0..n).rev() {
            engine.undo().unwrap();
            assert_eq!(engine.store(), &snapshots[i]);
        }
        assert_eq!(engine.store(), &initial);
        assert!(!engine.can_undo());

        for i in 1..=n {
            engine.redo().unwrap();
            assert_eq!(engine.store(), &snapshots[i]);
        }
        assert!(!engine.can_redo());
    }

    #[test]
    fn test_new_command_after_undo_discards_redo() {
        let mut engine = CommandEngine::new();
        engine.execute(Command::add(a(), None)).unwrap();
        engine.execute(Command::add(b(), None)).unwrap();
        engine.undo().unwrap();
        assert!(engine.can_redo());

        engine.execute(Command::add(Annotation::point(0.0, 0.0), None)).unwrap();
        assert!(!engine.can_redo());
        assert_eq!(engine.redo(), Ok(None));
    }

    #[test]
    fn test_delete_undo_restores_exact_value() {
        let mut engine = CommandEngine::new();
        engine.reset(vec![a()]);
        engine.execute(Command::delete(Some(0))).unwrap();
        assert!(engine.store().is_empty());

        engine.undo().unwrap();
        assert_eq!(engine.annotations(), &[a()]);

        engine.execute(Command::add(b(), None)).unwrap();
        assert!(!engine.can_redo());
        assert_eq!(engine.annotations(), &[a(), b()]);
    }

    #[test]
    fn test_empty_history_is_silent() {
        let mut engine = CommandEngine::new();
        assert_eq!(engine.undo(), Ok(None));
        assert_eq!(engine.redo(), Ok(None));
    }

    #[test]
    fn test_failed_execute_records_nothing() {
        let mut engine = CommandEngine::new();
        engine.execute(Command::add(a(), None)).unwrap();
        engine.undo().unwrap();

        let err = engine.execute(Command::delete(Some(4))).unwrap_err();
        assert_eq!(err, AnnotationError::OutOfRange { index: 4, len: 0 });
        assert!(!engine.can_undo());
        assert!(engine.can_redo());
    }

    #[test]
    fn test_max_history_drops_oldest() {
        let mut engine = CommandEngine::with_config(UndoConfig {
            max_history: Some(2),
        });
        for _ in 0..4 {
            engine.execute(Command::add(a(), None)).unwrap();
        }
        assert_eq!(engine.history().undo_count(), 2);
        engine.undo().unwrap();
        engine.undo().unwrap();
        assert_eq!(engine.undo(), Ok(None));
        assert_eq!(engine.store().len(), 2);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut engine = CommandEngine::new();
        engine.execute(Command::add(a(), None)).unwrap();
        engine.reset(vec![b(), b()]);
        assert!(!engine.can_undo());
        assert_eq!(engine.store().len(), 2);
    }

    #[test]
    fn test_observers_see_every_transition() {
        let events: Rc<RefCell<Vec<StoreEvent>>> = Rc::default();
        let sink = Rc::clone(&events);

        let mut engine = CommandEngine::new();
        engine.subscribe(move |event: &StoreEvent, _: &AnnotationStore| {
            sink.borrow_mut().push(event.clone());
        });

        engine.execute(Command::add(a(), None)).unwrap();
        engine.undo().unwrap();
        engine.redo().unwrap();
        engine.reset(Vec::new());
        let _ = engine.execute(Command::delete(Some(3)));

        let kinds: Vec<ChangeKind> = events.borrow().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Executed,
                ChangeKind::Undone,
                ChangeKind::Redone,
                ChangeKind::Reset
            ]
        );
        assert_eq!(events.borrow()[0].description, "Add rectangle");
        assert_eq!(events.borrow()[1].len, 0);
    }

    #[test]
    fn test_descriptions_follow_stacks() {
        let mut engine = CommandEngine::new();
        engine.execute(Command::batch_add(vec![a(), b()], None)).unwrap();
        assert_eq!(engine.undo_description().as_deref(), Some("Add 2 annotations"));
        engine.undo().unwrap();
        assert_eq!(engine.redo_description().as_deref(), Some("Add 2 annotations"));
        assert_eq!(engine.undo_description(), None);
    }
}

//! Undo/redo history.
//!
//! Each recorded transaction becomes one [`UndoStep`] holding the inverses of its steps.
//! Consecutive steps sharing a group id are undone and redone together, so a transaction
//! marked [`HistoryMode::AppendToLast`] (such as an attribute correction following an edit)
//! never needs its own undo.

use crate::error::TransformError;
use crate::state::{EditorState, Selection};
use crate::transform::{HistoryMode, Step, Transaction};

/// History configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of recorded steps.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 1000 }
    }
}

#[derive(Debug, Clone)]
struct UndoStep {
    group_id: usize,
    /// Inverse steps, in the order the original steps were applied.
    inverted: Vec<Step>,
    selection_before: Selection,
}

/// Linear undo/redo history of document transactions.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<UndoStep>,
    redo_stack: Vec<UndoStep>,
    max_depth: usize,
    next_group_id: usize,
}

impl History {
    /// Create an empty history.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: config.max_depth.max(1),
            next_group_id: 0,
        }
    }

    /// Whether there is anything to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether there is anything to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undo groups.
    pub fn undo_depth(&self) -> usize {
        count_groups(&self.undo_stack)
    }

    /// Number of redo groups.
    pub fn redo_depth(&self) -> usize {
        count_groups(&self.redo_stack)
    }

    /// Record a dispatched transaction according to its history mode.
    pub fn record(&mut self, tr: &Transaction, selection_before: Selection) {
        if !tr.doc_changed() {
            return;
        }
        let group_id = match tr.history_mode() {
            HistoryMode::Skip => return,
            HistoryMode::AppendToLast => match self.undo_stack.last() {
                Some(last) => last.group_id,
                None => self.take_group_id(),
            },
            HistoryMode::NewGroup => self.take_group_id(),
        };

        self.redo_stack.clear();
        self.push_undo(UndoStep {
            group_id,
            inverted: tr.inverted_steps().to_vec(),
            selection_before,
        });
    }

    /// Build the transaction undoing the most recent group and move that group to the redo
    /// stack. Returns `None` when there is nothing to undo.
    pub fn undo(&mut self, state: &EditorState) -> Result<Option<Transaction>, TransformError> {
        let Some(steps) = pop_group(&mut self.undo_stack) else {
            return Ok(None);
        };
        match replay(state, &steps) {
            Ok((tr, redo)) => {
                self.redo_stack.push(redo);
                Ok(Some(tr))
            }
            Err(err) => {
                self.undo_stack.extend(steps.into_iter().rev());
                Err(err)
            }
        }
    }

    /// Build the transaction redoing the most recently undone group.
    pub fn redo(&mut self, state: &EditorState) -> Result<Option<Transaction>, TransformError> {
        let Some(steps) = pop_group(&mut self.redo_stack) else {
            return Ok(None);
        };
        match replay(state, &steps) {
            Ok((tr, undo)) => {
                self.push_undo(undo);
                Ok(Some(tr))
            }
            Err(err) => {
                self.redo_stack.extend(steps.into_iter().rev());
                Err(err)
            }
        }
    }

    fn push_undo(&mut self, step: UndoStep) {
        if self.undo_stack.len() >= self.max_depth {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(step);
    }

    fn take_group_id(&mut self) -> usize {
        let id = self.next_group_id;
        self.next_group_id = self.next_group_id.wrapping_add(1);
        id
    }
}

/// Pop every step of the topmost group, most recent first.
fn pop_group(stack: &mut Vec<UndoStep>) -> Option<Vec<UndoStep>> {
    let last_group_id = stack.last().map(|s| s.group_id)?;
    let mut steps = Vec::new();
    while let Some(step) = stack.last() {
        if step.group_id != last_group_id {
            break;
        }
        steps.extend(stack.pop());
    }
    Some(steps)
}

fn count_groups(stack: &[UndoStep]) -> usize {
    stack
        .windows(2)
        .filter(|pair| pair[0].group_id != pair[1].group_id)
        .count()
        + usize::from(!stack.is_empty())
}

/// Apply the inverse steps of `steps` (most recent first) and capture the opposite entry.
fn replay(
    state: &EditorState,
    steps: &[UndoStep],
) -> Result<(Transaction, UndoStep), TransformError> {
    let mut tr = state.tr();
    tr.set_history_mode(HistoryMode::Skip);
    for step in steps {
        for inverse in step.inverted.iter().rev() {
            tr.step(inverse.clone())?;
        }
    }
    let selection_before = steps
        .last()
        .map(|s| s.selection_before)
        .unwrap_or_else(|| state.selection());
    tr.set_selection(selection_before.clamp(tr.doc().content_size()));

    let group_id = steps.first().map(|s| s.group_id).unwrap_or_default();
    let opposite = UndoStep {
        group_id,
        inverted: tr.inverted_steps().to_vec(),
        selection_before: state.selection(),
    };
    Ok((tr, opposite))
}

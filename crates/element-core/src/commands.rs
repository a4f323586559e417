//! Structural element commands.
//!
//! [`for_position`] binds the five structural commands (remove, move up/down, move to
//! top/bottom) to the element node starting at a position. Every command runs in two modes:
//!
//! - dry run (`dispatch == None`): reports whether the command currently applies, never edits,
//! - execute (`dispatch == Some(..)`): builds one transaction and hands it to `dispatch`.
//!
//! Both modes build the same transaction, so execute mode is a no-op exactly when the dry run
//! reports `false`.
//!
//! # Example
//!
//! ```rust
//! use element_core::{EditorState, Node, Schema, SchemaSpec, commands};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(Schema::new(SchemaSpec::basic()).unwrap());
//! let para = |t: &str| Node::branch("paragraph", Default::default(), vec![Node::text(t)]);
//! let doc = Node::branch("doc", Default::default(), vec![para("a"), para("b")]);
//! let state = EditorState::new(schema, doc);
//!
//! let first = commands::for_position(0);
//! assert!(!first.move_up(&state, None));
//! assert!(first.move_down(&state, None));
//!
//! let mut dispatched = Vec::new();
//! first.move_down(&state, Some(&mut |tr| dispatched.push(tr)));
//! let next = state.apply(&dispatched[0]).unwrap();
//! assert_eq!(next.doc().text_content(), "ba");
//! ```

use crate::model::Node;
use crate::state::EditorState;
use crate::transform::{Transaction, can_join};

/// A structural command on one element node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementCommand {
    /// Delete the node, joining the blocks around the gap when possible.
    Remove,
    /// Swap with the preceding sibling.
    MoveUp,
    /// Swap with the following sibling.
    MoveDown,
    /// Move before every sibling.
    MoveTop,
    /// Move after every sibling.
    MoveBottom,
}

impl ElementCommand {
    /// All commands, in menu order.
    pub const ALL: [ElementCommand; 5] = [
        ElementCommand::Remove,
        ElementCommand::MoveUp,
        ElementCommand::MoveDown,
        ElementCommand::MoveTop,
        ElementCommand::MoveBottom,
    ];
}

/// Which commands currently apply to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandAvailability {
    /// [`ElementCommand::Remove`].
    pub remove: bool,
    /// [`ElementCommand::MoveUp`].
    pub move_up: bool,
    /// [`ElementCommand::MoveDown`].
    pub move_down: bool,
    /// [`ElementCommand::MoveTop`].
    pub move_top: bool,
    /// [`ElementCommand::MoveBottom`].
    pub move_bottom: bool,
}

/// Receives the transaction built by a command in execute mode.
pub type Dispatch<'a> = Option<&'a mut dyn FnMut(Transaction)>;

/// Commands bound to the node starting at `pos`.
pub fn for_position(pos: usize) -> ElementCommands {
    ElementCommands { pos }
}

/// The structural commands for one node position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementCommands {
    pos: usize,
}

impl ElementCommands {
    /// Position the commands are bound to.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Remove the node.
    pub fn remove(&self, state: &EditorState, dispatch: Dispatch<'_>) -> bool {
        self.run(ElementCommand::Remove, state, dispatch)
    }

    /// Swap the node with its preceding sibling.
    pub fn move_up(&self, state: &EditorState, dispatch: Dispatch<'_>) -> bool {
        self.run(ElementCommand::MoveUp, state, dispatch)
    }

    /// Swap the node with its following sibling.
    pub fn move_down(&self, state: &EditorState, dispatch: Dispatch<'_>) -> bool {
        self.run(ElementCommand::MoveDown, state, dispatch)
    }

    /// Move the node before all its siblings.
    pub fn move_top(&self, state: &EditorState, dispatch: Dispatch<'_>) -> bool {
        self.run(ElementCommand::MoveTop, state, dispatch)
    }

    /// Move the node after all its siblings.
    pub fn move_bottom(&self, state: &EditorState, dispatch: Dispatch<'_>) -> bool {
        self.run(ElementCommand::MoveBottom, state, dispatch)
    }

    /// Run a command. Returns whether it applies; dispatches only in execute mode.
    pub fn run(&self, command: ElementCommand, state: &EditorState, dispatch: Dispatch<'_>) -> bool {
        let Some(tr) = self.transaction(command, state) else {
            return false;
        };
        if let Some(dispatch) = dispatch {
            tracing::debug!(pos = self.pos, ?command, "running element command");
            dispatch(tr);
        }
        true
    }

    /// Dry-run every command.
    pub fn availability(&self, state: &EditorState) -> CommandAvailability {
        let check = |command| self.transaction(command, state).is_some();
        CommandAvailability {
            remove: check(ElementCommand::Remove),
            move_up: check(ElementCommand::MoveUp),
            move_down: check(ElementCommand::MoveDown),
            move_top: check(ElementCommand::MoveTop),
            move_bottom: check(ElementCommand::MoveBottom),
        }
    }

    /// Build the command's transaction, or `None` when it does not apply.
    fn transaction(&self, command: ElementCommand, state: &EditorState) -> Option<Transaction> {
        let pos = self.pos;
        let resolved = state.doc().resolve(pos).ok()?;
        let node = resolved.node_after()?;
        if node.is_text() {
            return None;
        }
        let parent = resolved.parent();
        let index = resolved.index();
        let start = resolved.start(resolved.depth());
        let end = pos + node.node_size();
        let siblings = parent.content();

        let mut tr = state.tr();
        match command {
            ElementCommand::Remove => {
                tr.delete(pos, end).ok()?;
                if can_join(tr.doc(), tr.schema(), pos) {
                    tr.join(pos).ok()?;
                }
            }
            ElementCommand::MoveUp => {
                let prev = siblings.get(index.checked_sub(1)?)?;
                let from = pos - prev.node_size();
                tr.replace_with(from, end, vec![node.clone(), prev.clone()])
                    .ok()?;
            }
            ElementCommand::MoveDown => {
                let next = siblings.get(index + 1)?;
                let to = end + next.node_size();
                tr.replace_with(pos, to, vec![next.clone(), node.clone()])
                    .ok()?;
            }
            ElementCommand::MoveTop => {
                if index == 0 {
                    return None;
                }
                let mut content = vec![node.clone()];
                content.extend(siblings[..index].iter().cloned());
                tr.replace_with(start, end, content).ok()?;
            }
            ElementCommand::MoveBottom => {
                if index + 1 >= siblings.len() {
                    return None;
                }
                let mut content: Vec<Node> = siblings[index + 1..].to_vec();
                content.push(node.clone());
                tr.replace_with(pos, start + parent.content_size(), content)
                    .ok()?;
            }
        }
        tr.doc_changed().then_some(tr)
    }
}

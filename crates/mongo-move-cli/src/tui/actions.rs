//! Key binding hints shown in the footer and the help overlay.

use mongo_move::{Focus, Stage};

/// A key and what it does in the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyHint {
    pub keys: &'static str,
    pub description: &'static str,
}

const fn hint(keys: &'static str, description: &'static str) -> KeyHint {
    KeyHint { keys, description }
}

const MOVE: KeyHint = hint("↑/↓", "move");
const PAGE: KeyHint = hint("←/→", "page");
const SELECT: KeyHint = hint("space", "select");
const FILTER: KeyHint = hint("/", "filter");
const QUIT: KeyHint = hint("q", "quit");
const HELP: KeyHint = hint("?", "help");

/// Hints for the given stage and focus.
pub fn hints(stage: Stage, focus: Focus, filtering: bool) -> Vec<KeyHint> {
    if filtering {
        return vec![
            hint("type", "filter"),
            hint("enter", "keep filter"),
            hint("esc", "clear filter"),
            MOVE,
        ];
    }

    let mut hints = match stage {
        Stage::ChoosingSourceDb | Stage::ChoosingTargetDb => vec![MOVE, PAGE, SELECT, FILTER],
        Stage::LoadingCollections => Vec::new(),
        Stage::MappingCollections => {
            let mut hints = vec![MOVE, PAGE, SELECT, FILTER];
            if focus == Focus::TargetList {
                hints.push(hint("esc", "back out of pick"));
            } else {
                hints.push(hint("tab", "review mappings"));
            }
            hints
        }
        Stage::ReviewingMappings => vec![
            MOVE,
            PAGE,
            hint("del/d", "delete mapping"),
            hint("tab", "add more"),
            hint("enter/s", "start copy"),
        ],
        Stage::CopyingInProgress => Vec::new(),
        Stage::Complete => vec![hint("r", "restart")],
    };
    hints.push(HELP);
    hints.push(QUIT);
    hints
}

/// Every binding, for the help overlay.
pub fn all() -> Vec<KeyHint> {
    vec![
        hint("↑/↓ k/j", "Move the highlighted row"),
        hint("←/→ h/l", "Previous / next page"),
        hint("space", "Select the highlighted row"),
        hint("/", "Filter the focused table"),
        hint("esc", "Clear filter or back out of a pending pick"),
        hint("tab", "Toggle mapping review"),
        hint("enter/s", "Start copying"),
        hint("del/d", "Delete the highlighted mapping"),
        hint("u/i", "Fewer / more rows per page"),
        hint("r", "Restart after completion"),
        hint("?", "Toggle this help"),
        hint("q/ctrl+c", "Quit"),
    ]
}

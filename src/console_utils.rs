//! Helper functions for dealing with the terminal

use crate::state::PresentationEffect;
use console::{Term, set_colors_enabled, set_colors_enabled_stderr};
use log::debug;
use strum_macros::{Display, EnumString};

/// Whether the output to the terminal should be colored
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Default)]
#[strum(serialize_all = "snake_case")]
pub enum ColorOutputPolicy {
    /// Automatically enable color if printing to a TTY, otherwise disable color
    #[default]
    Auto,
    /// Force plaintext output
    Off,
    /// Force color output
    On,
}

impl ColorOutputPolicy {
    /// Whether colors are forced one way or the other, `None` if it's up to the terminal.
    fn forced(self) -> Option<bool> {
        match self {
            ColorOutputPolicy::Auto => None,
            ColorOutputPolicy::On => Some(true),
            ColorOutputPolicy::Off => Some(false),
        }
    }
}

/// Set terminal color settings based on the output policy.
pub fn set_term_colors(setting: ColorOutputPolicy) {
    let Some(colors_enabled) = setting.forced() else {
        return;
    };
    set_colors_enabled(colors_enabled);
    set_colors_enabled_stderr(colors_enabled);
}

/// Apply the side effects of a frame to the terminal.
///
/// This is a no-op unless `term` is attached to a TTY, so piping the output somewhere doesn't
/// get escape sequences mixed into it.
pub fn apply_effect(term: &Term, effect: &PresentationEffect) {
    if !term.is_term() {
        return;
    }
    debug!("Setting terminal title to {:?}", effect.title());
    term.set_title(effect.title());
}

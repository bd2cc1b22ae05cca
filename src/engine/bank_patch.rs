//! Button handling and bank/patch selection.
//!
//! A single push button drives a two-level menu:
//!
//! - at bank level a short press toggles the previewed bank, a long press
//!   commits it and drops into patch level on its first patch;
//! - at patch level a short press advances to the next patch, a long press
//!   returns to bank level without touching the audio.
//!
//! Only commits produce a [`SelectionEvent::PatchCommitted`], which is what
//! re-arms the transition fade on the audio side.

use std::fmt;

use crate::engine::constants::{BUTTON_DEBOUNCE_MS, BUTTON_LONG_PRESS_MS, PATCHES_PER_BANK};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bank {
    /// Reverb bank.
    #[default]
    A,
    /// Delay bank.
    B,
}

impl Bank {
    pub fn index(self) -> usize {
        match self {
            Bank::A => 0,
            Bank::B => 1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Bank::A => Bank::B,
            Bank::B => Bank::A,
        }
    }

    pub fn is_delay(self) -> bool {
        self == Bank::B
    }

    pub fn letter(self) -> char {
        match self {
            Bank::A => 'A',
            Bank::B => 'B',
        }
    }

    /// Short title shown on the bank menu.
    pub fn title(self) -> &'static str {
        match self {
            Bank::A => "A: Revb",
            Bank::B => "B: Dely",
        }
    }
}

/// A `(bank, index)` pair naming one of the eight patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PatchId {
    bank: Bank,
    index: u8,
}

impl PatchId {
    /// Index wraps modulo the bank size.
    pub fn new(bank: Bank, index: usize) -> Self {
        Self {
            bank,
            index: (index % PATCHES_PER_BANK) as u8,
        }
    }

    pub fn bank(self) -> Bank {
        self.bank
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Flat position in `0..NUM_PATCHES`, bank-major.
    pub fn slot(self) -> usize {
        self.bank.index() * PATCHES_PER_BANK + self.index()
    }

    /// Next patch in the same bank.
    pub fn next(self) -> Self {
        Self::new(self.bank, self.index() + 1)
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.bank.letter(), self.index() + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiLevel {
    /// Choosing between banks.
    Bank,
    /// Cycling patches of the committed bank.
    #[default]
    Patch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    /// Released before the long-press threshold.
    ShortPress,
    /// Held past the long-press threshold. Fires once, while still held.
    LongPress,
}

/// Debounced short/long press detector polled at control rate.
#[derive(Debug, Clone, Default)]
pub struct ButtonDebouncer {
    raw_last: bool,
    last_raw_change_ms: u64,
    stable: bool,
    press_start_ms: u64,
    long_fired: bool,
}

impl ButtonDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the debounced button is currently down.
    pub fn is_held(&self) -> bool {
        self.stable
    }

    /// Feed the raw contact level sampled at `now_ms`.
    ///
    /// The raw level must stay unchanged for `BUTTON_DEBOUNCE_MS` before it is
    /// accepted as a new stable state.
    pub fn update(&mut self, raw_pressed: bool, now_ms: u64) -> Option<ButtonEvent> {
        if raw_pressed != self.raw_last {
            self.raw_last = raw_pressed;
            self.last_raw_change_ms = now_ms;
        }

        let settled = now_ms.saturating_sub(self.last_raw_change_ms) >= BUTTON_DEBOUNCE_MS;
        if settled && self.stable != raw_pressed {
            self.stable = raw_pressed;
            if raw_pressed {
                self.press_start_ms = now_ms;
                self.long_fired = false;
                return Some(ButtonEvent::Pressed);
            }
            if !self.long_fired {
                return Some(ButtonEvent::ShortPress);
            }
            return None;
        }

        if self.stable
            && !self.long_fired
            && now_ms.saturating_sub(self.press_start_ms) >= BUTTON_LONG_PRESS_MS
        {
            self.long_fired = true;
            return Some(ButtonEvent::LongPress);
        }

        None
    }
}

/// What a button gesture did to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Bank level: the previewed bank changed. No audio change.
    PreviewToggled { preview: Bank },
    /// A new patch is active; the DSP must reset and fade in.
    PatchCommitted(PatchId),
    /// Patch level left for bank level. No audio change.
    BankMenuOpened { preview: Bank },
}

#[derive(Debug, Clone)]
pub struct BankPatchStateMachine {
    level: UiLevel,
    active: PatchId,
    preview: Bank,
    button: ButtonDebouncer,
    last_interaction_ms: u64,
}

impl BankPatchStateMachine {
    /// Starts at patch level on A1, previewing bank A.
    pub fn new(now_ms: u64) -> Self {
        Self {
            level: UiLevel::Patch,
            active: PatchId::default(),
            preview: Bank::A,
            button: ButtonDebouncer::new(),
            last_interaction_ms: now_ms,
        }
    }

    pub fn level(&self) -> UiLevel {
        self.level
    }

    pub fn active(&self) -> PatchId {
        self.active
    }

    pub fn preview(&self) -> Bank {
        self.preview
    }

    pub fn button_held(&self) -> bool {
        self.button.is_held()
    }

    pub fn last_interaction_ms(&self) -> u64 {
        self.last_interaction_ms
    }

    /// Record user activity that did not come from the button.
    pub fn note_interaction(&mut self, now_ms: u64) {
        self.last_interaction_ms = self.last_interaction_ms.max(now_ms);
    }

    /// Poll the raw button level and apply any resulting gesture.
    pub fn update(&mut self, raw_pressed: bool, now_ms: u64) -> Option<SelectionEvent> {
        let event = self.button.update(raw_pressed, now_ms)?;
        self.apply(event, now_ms)
    }

    /// Apply a debounced gesture directly.
    pub fn apply(&mut self, event: ButtonEvent, now_ms: u64) -> Option<SelectionEvent> {
        self.note_interaction(now_ms);

        match (event, self.level) {
            (ButtonEvent::Pressed, _) => None,
            (ButtonEvent::ShortPress, UiLevel::Bank) => {
                self.preview = self.preview.toggled();
                Some(SelectionEvent::PreviewToggled {
                    preview: self.preview,
                })
            }
            (ButtonEvent::ShortPress, UiLevel::Patch) => {
                self.active = self.active.next();
                Some(SelectionEvent::PatchCommitted(self.active))
            }
            (ButtonEvent::LongPress, UiLevel::Bank) => {
                self.active = PatchId::new(self.preview, 0);
                self.level = UiLevel::Patch;
                Some(SelectionEvent::PatchCommitted(self.active))
            }
            (ButtonEvent::LongPress, UiLevel::Patch) => {
                self.preview = self.active.bank();
                self.level = UiLevel::Bank;
                Some(SelectionEvent::BankMenuOpened {
                    preview: self.preview,
                })
            }
        }
    }
}

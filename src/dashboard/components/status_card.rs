//! Status card component for displaying status information

use egui::{Color32, RichText, Vec2};

use crate::dashboard::theme::{card, ThemeColors};
use crate::job::Phase;

/// A card displaying one labelled value
pub struct StatusCard {
    pub title: String,
    pub value: String,
    pub status: CardStatus,
}

/// Status types for cards
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CardStatus {
    Idle,
    Running,
    Done,
    Error,
}

impl CardStatus {
    pub fn color(&self) -> Color32 {
        match self {
            CardStatus::Idle => ThemeColors::TEXT_MUTED,
            CardStatus::Running => ThemeColors::ACCENT_WARNING,
            CardStatus::Done => ThemeColors::ACCENT_SUCCESS,
            CardStatus::Error => ThemeColors::ACCENT_ERROR,
        }
    }

    /// Card status for a job phase (`None` before any update)
    pub fn for_phase(phase: Option<&Phase>, busy: bool) -> Self {
        match phase {
            Some(Phase::Done) => CardStatus::Done,
            Some(Phase::Error) => CardStatus::Error,
            Some(_) if busy => CardStatus::Running,
            None if busy => CardStatus::Running,
            _ => CardStatus::Idle,
        }
    }
}

impl StatusCard {
    pub fn new(title: impl Into<String>, value: impl Into<String>, status: CardStatus) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            status,
        }
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        card().show(ui, |ui| {
            ui.set_min_width(170.0);

            ui.horizontal(|ui| {
                let dot = ui.cursor().left_top() + Vec2::new(6.0, 10.0);
                ui.painter().circle_filled(dot, 4.0, self.status.color());
                ui.add_space(16.0);

                ui.vertical(|ui| {
                    ui.label(
                        RichText::new(&self.title)
                            .size(12.0)
                            .color(ThemeColors::TEXT_MUTED),
                    );
                    ui.add_space(4.0);
                    ui.add(
                        egui::Label::new(
                            RichText::new(&self.value)
                                .size(16.0)
                                .color(ThemeColors::TEXT_PRIMARY)
                                .strong(),
                        )
                        .truncate(),
                    );
                });
            });
        });
    }
}

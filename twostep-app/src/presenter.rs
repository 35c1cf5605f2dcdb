use tracing::{debug, info};
use twostep_core::{DisplayMapping, Presenter, Side, Stage};

/// Presenter that narrates the screen through the log.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    pub shown_layouts: usize,
    pub warnings: usize,
    last_counter: Option<i64>,
}

impl Presenter for ConsolePresenter {
    fn present_layout(&mut self, stage: Stage, mapping: &DisplayMapping) {
        self.shown_layouts += 1;
        debug!(
            ?stage,
            left = mapping.option_at(Side::Left),
            right = mapping.option_at(Side::Right),
            "layout"
        );
    }

    fn show_banner(&mut self, text: Option<&str>) {
        if let Some(text) = text {
            info!(banner = text);
        }
    }

    fn preview_rewards(&mut self, rewards: [i64; 2]) {
        debug!(left = rewards[0], right = rewards[1], "reward preview");
    }

    fn present_feedback(&mut self, side: Side, outcome: i64) {
        debug!(side = side.label(), outcome, "feedback");
    }

    fn present_missed_warning(&mut self, message: &str) {
        self.warnings += 1;
        info!(warning = message);
    }

    fn update_counter(&mut self, block_total: i64, visible: bool) {
        if visible && self.last_counter != Some(block_total) {
            debug!(block_total, "gem counter");
        }
        self.last_counter = Some(block_total);
    }

    fn clear(&mut self) {}
}

//! Stage progress for provisioning runs.
//!
//! One spinner per stage, with a line per finished item printed above it.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use provision::{
    MembershipOutcome, NaturalKey, ProgressCallback, ProvisioningOutcome, ResourceKind, Stage,
    StageReport,
};
use std::time::Duration;

use crate::render;
use crate::ui;

pub struct StageProgress {
    bar: Option<ProgressBar>,
    visible: bool,
    step: usize,
}

impl StageProgress {
    /// Progress that draws spinners and item lines
    pub fn new() -> Self {
        Self::with_visibility(true)
    }

    /// Progress that draws nothing, for `--json` and `--quiet`
    pub fn hidden() -> Self {
        Self::with_visibility(false)
    }

    fn with_visibility(visible: bool) -> Self {
        Self {
            bar: None,
            visible,
            step: 0,
        }
    }

    fn spinner(&self, stage: Stage, count: usize) -> ProgressBar {
        let bar = if self.visible {
            ProgressBar::new(count as u64)
        } else {
            ProgressBar::with_draw_target(Some(count as u64), ProgressDrawTarget::hidden())
        };
        let style =
            ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_prefix(stage.label());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    fn line(&self, text: &str) {
        if !self.visible {
            return;
        }
        match &self.bar {
            Some(bar) => bar.suspend(|| println!("{text}")),
            None => println!("{text}"),
        }
    }
}

impl ProgressCallback for StageProgress {
    fn on_stage_start(&mut self, stage: Stage, count: usize) {
        self.step += 1;
        if self.visible {
            println!();
            ui::step(self.step, Stage::ORDER.len(), stage.label());
        }
        self.bar = Some(self.spinner(stage, count));
    }

    fn on_item_start(&mut self, kind: ResourceKind, key: &NaturalKey) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{kind} {}", ui::truncate(&key.to_string(), 40)));
        }
    }

    fn on_item_complete(&mut self, outcome: &ProvisioningOutcome) {
        self.line(&render::outcome_line(outcome));
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_membership(&mut self, outcome: &MembershipOutcome) {
        self.line(&render::membership_line(outcome));
    }

    fn on_stage_complete(&mut self, report: &StageReport) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        if self.visible {
            ui::dim(&render::counts_line(&report.counts));
        }
    }
}

impl Drop for StageProgress {
    fn drop(&mut self) {
        // An aborted run never completes its stage
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
